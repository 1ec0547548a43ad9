// THEORY:
// The `parallel_pipeline` compresses several independent images at once. Region
// discovery itself stays single-threaded; the parallelism is strictly between runs.
//
// Key architectural principles:
// 1.  **Nothing Shared but the Config**: Each job loads its own `Image`, and the
//     compressor builds a fresh `ClaimedMask`, finder and `SimilarityCache` for it.
//     The only shared state is the read-only `ImageCompressor` and the cancel flag.
// 2.  **Blocking Work off the Runtime**: Segmentation is CPU-bound and has no await
//     points, so every job runs on `spawn_blocking`. A semaphore sized to the CPU
//     count (or an explicit job count) bounds how many run at once.
// 3.  **Order Preserved**: Results come back in input order via `join_all`,
//     regardless of which job finishes first.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use log::{debug, info};
use tokio::sync::Semaphore;

use crate::core_modules::image_grid::Image;
use crate::core_modules::progress::LogProgress;
use crate::error::{Error, Result};
use crate::pipeline::{CompressionResult, CompressorConfig, ImageCompressor};

/// The outcome of one file in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub input: PathBuf,
    pub result: Result<(Image, CompressionResult)>,
}

pub struct BatchCompressor {
    compressor: Arc<ImageCompressor>,
    semaphore: Arc<Semaphore>,
    cancel: Arc<AtomicBool>,
    workers: usize,
}

impl BatchCompressor {
    /// `workers` defaults to the number of logical CPUs.
    pub fn new(config: CompressorConfig, workers: Option<usize>) -> Result<Self> {
        let compressor = ImageCompressor::new(config)?;
        let workers = workers.unwrap_or_else(num_cpus::get).max(1);
        info!("Batch compressor using {} workers", workers);
        Ok(Self {
            compressor: Arc::new(compressor),
            semaphore: Arc::new(Semaphore::new(workers)),
            cancel: Arc::new(AtomicBool::new(false)),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn compressor(&self) -> &ImageCompressor {
        &self.compressor
    }

    /// Setting the returned flag stops every running and pending job at its
    /// next pixel scan.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Loads and compresses every file, returning outcomes in input order.
    pub async fn compress_files(&self, inputs: Vec<PathBuf>) -> Vec<BatchOutcome> {
        let jobs = inputs.into_iter().map(|input| async move {
            let path = input.clone();
            let result = self
                .run_blocking(move |compressor, cancel| {
                    compressor.compress_file(&path, &mut LogProgress, Some(cancel))
                })
                .await;
            BatchOutcome { input, result }
        });
        join_all(jobs).await
    }

    /// Compresses images that are already in memory, in input order.
    pub async fn compress_images(&self, images: Vec<Image>) -> Vec<Result<CompressionResult>> {
        let jobs = images.into_iter().map(|image| {
            self.run_blocking(move |compressor, cancel| compressor.compress(&image, &mut LogProgress, Some(cancel)))
        });
        join_all(jobs).await
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&ImageCompressor, &AtomicBool) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::Worker(e.to_string()))?;
        let compressor = Arc::clone(&self.compressor);
        let cancel = Arc::clone(&self.cancel);

        debug!("Worker permit acquired, {} left", self.semaphore.available_permits());
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job(&compressor, &cancel)
        });
        handle.await.map_err(|e| Error::Worker(e.to_string()))?
    }
}
