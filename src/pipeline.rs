// THEORY:
// The `pipeline` module is the top-level API of the compressor. It wires the core
// modules into one call: validate the configuration, build a finder for the image,
// segment, reconstruct, and hand back everything a caller might want to report.
// Nothing here makes region decisions; it only sequences the stages and keeps the
// statistics and progress collaborators informed.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use log::info;

use crate::core_modules::image_grid::Image;
use crate::core_modules::mean_shift::DEFAULT_SPATIAL_BANDWIDTH;
use crate::core_modules::progress::ProgressObserver;
use crate::core_modules::reconstruction::{reconstruct, QualityReport};
use crate::core_modules::region_finder::{build_finder, FinderSettings};
use crate::core_modules::segmenter::Segmenter;
use crate::core_modules::stats::CompressionStats;
use crate::core_modules::utils::image_helper::image_helper::{self, MetadataReport};
use crate::error::{ConfigError, Result};

// Re-export key data structures for the public API.
pub use crate::core_modules::region::{CompressedImage, Region, RegionColor};
pub use crate::core_modules::region_finder::FinderKind;
pub use crate::core_modules::segmenter::{SegmentationAnomaly, SegmentationOutcome};

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;
const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for the ImageCompressor, checked once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressorConfig {
    /// Minimum similarity for a pixel to join a region, in [0, 1].
    pub similarity_threshold: f64,
    /// Upper bound on region size. `None` picks a per-finder default from the
    /// image's pixel count.
    pub max_region_size: Option<usize>,
    pub finder: FinderKind,
    /// Variance-adaptive thresholds. Only the adaptive finder reads this.
    pub adaptive_mode: bool,
    /// Mean-shift spatial bandwidth, as a fraction of the larger image dimension.
    pub spatial_bandwidth: f64,
    /// Minimum time between two `on_region` progress notifications.
    pub progress_interval: Duration,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_region_size: None,
            finder: FinderKind::default(),
            adaptive_mode: true,
            spatial_bandwidth: DEFAULT_SPATIAL_BANDWIDTH,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl CompressorConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let threshold = self.similarity_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        if self.max_region_size == Some(0) {
            return Err(ConfigError::ZeroMaxRegionSize);
        }
        if !self.spatial_bandwidth.is_finite() || self.spatial_bandwidth <= 0.0 {
            return Err(ConfigError::InvalidSpatialBandwidth(self.spatial_bandwidth));
        }
        Ok(())
    }

    pub fn finder_settings(&self) -> FinderSettings {
        FinderSettings {
            similarity_threshold: self.similarity_threshold,
            max_region_size: self.max_region_size,
            adaptive_mode: self.adaptive_mode,
            spatial_bandwidth: self.spatial_bandwidth,
        }
    }
}

/// The output of one compression run.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub compressed: CompressedImage,
    pub reconstructed: Image,
    pub stats: CompressionStats,
    pub anomalies: Vec<SegmentationAnomaly>,
    pub rejected_pixels: usize,
}

impl CompressionResult {
    pub fn quality(&self, source: &Image) -> QualityReport {
        QualityReport::measure(source, &self.compressed, &self.reconstructed)
    }
}

/// The main, top-level struct for the compressor.
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    config: CompressorConfig,
}

impl ImageCompressor {
    pub fn new(config: CompressorConfig) -> Result<Self> {
        config.validate()?;
        info!("Initialized compressor with {} algorithm", config.finder);
        Ok(Self { config })
    }

    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Segments `image` without reconstructing it.
    pub fn segment(
        &self,
        image: &Image,
        observer: &mut dyn ProgressObserver,
        cancel: Option<&AtomicBool>,
    ) -> Result<(SegmentationOutcome, CompressionStats)> {
        let mut stats = CompressionStats::start(image.width(), image.height());
        let mut finder = build_finder(self.config.finder, image, &self.config.finder_settings());
        let interval = self.config.progress_interval;
        let mut last_update: Option<Instant> = None;

        observer.on_start(stats.total_pixels());

        // Stage 1: Region discovery
        let outcome = Segmenter::new(image).segment(finder.as_mut(), cancel, |region, _| {
            stats.record_region(region.len());
            let now = Instant::now();
            if last_update.is_none_or(|last| now.duration_since(last) >= interval) {
                last_update = Some(now);
                observer.on_region(region.len(), &stats.summary());
            }
        })?;

        stats.finish();
        observer.on_finish(&stats.summary());
        Ok((outcome, stats))
    }

    /// Segments and reconstructs `image`.
    pub fn compress(
        &self,
        image: &Image,
        observer: &mut dyn ProgressObserver,
        cancel: Option<&AtomicBool>,
    ) -> Result<CompressionResult> {
        let (outcome, stats) = self.segment(image, observer, cancel)?;

        // Stage 2: Reconstruction
        let reconstructed = reconstruct(&outcome.compressed)?;

        Ok(CompressionResult {
            compressed: outcome.compressed,
            reconstructed,
            stats,
            anomalies: outcome.anomalies,
            rejected_pixels: outcome.rejected_pixels,
        })
    }

    /// Loads `path` and compresses it. The source image is returned alongside
    /// the result for quality measurement.
    pub fn compress_file(
        &self,
        path: &Path,
        observer: &mut dyn ProgressObserver,
        cancel: Option<&AtomicBool>,
    ) -> Result<(Image, CompressionResult)> {
        let image = image_helper::load(path)?;
        let result = self.compress(&image, observer, cancel)?;
        Ok((image, result))
    }

    /// Saves the reconstruction to `output` and writes its metadata report.
    pub fn save(&self, result: &CompressionResult, output: &Path) -> Result<()> {
        image_helper::save(&result.reconstructed, output)?;
        image_helper::write_metadata(output, &self.metadata(result))?;
        Ok(())
    }

    pub fn metadata(&self, result: &CompressionResult) -> MetadataReport {
        MetadataReport {
            finder: self.config.finder,
            similarity_threshold: self.config.similarity_threshold,
            adaptive_mode: self.config.adaptive_mode,
            width: result.compressed.width,
            height: result.compressed.height,
            regions: result.compressed.region_count(),
            elapsed: result.stats.elapsed(),
            processing_rate: result.stats.processing_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color::color::Color;
    use crate::core_modules::progress::NoProgress;
    use crate::core_modules::stats::StatsSummary;
    use crate::error::Error;

    #[derive(Default)]
    struct Recorder {
        started: Option<usize>,
        regions: usize,
        finished: Option<StatsSummary>,
    }

    impl ProgressObserver for Recorder {
        fn on_start(&mut self, total_pixels: usize) {
            self.started = Some(total_pixels);
        }

        fn on_region(&mut self, _region_size: usize, _summary: &StatsSummary) {
            self.regions += 1;
        }

        fn on_finish(&mut self, summary: &StatsSummary) {
            self.finished = Some(*summary);
        }
    }

    #[test]
    fn rejects_bad_configuration_at_construction() {
        for threshold in [-0.1, 1.1, f64::NAN] {
            let config = CompressorConfig {
                similarity_threshold: threshold,
                ..CompressorConfig::default()
            };
            assert!(matches!(
                ImageCompressor::new(config),
                Err(Error::Config(ConfigError::ThresholdOutOfRange(_)))
            ));
        }

        let zero_cap = CompressorConfig {
            max_region_size: Some(0),
            ..CompressorConfig::default()
        };
        assert!(matches!(
            ImageCompressor::new(zero_cap),
            Err(Error::Config(ConfigError::ZeroMaxRegionSize))
        ));

        let no_bandwidth = CompressorConfig {
            spatial_bandwidth: 0.0,
            ..CompressorConfig::default()
        };
        assert!(matches!(
            ImageCompressor::new(no_bandwidth),
            Err(Error::Config(ConfigError::InvalidSpatialBandwidth(_)))
        ));
    }

    #[test]
    fn boundary_thresholds_are_accepted() {
        for threshold in [0.0, 1.0] {
            let config = CompressorConfig {
                similarity_threshold: threshold,
                ..CompressorConfig::default()
            };
            assert!(ImageCompressor::new(config).is_ok());
        }
    }

    #[test]
    fn compress_reports_to_the_observer() {
        let image = Image::new(4, 4, vec![Color::new(10, 20, 30); 16]).expect("valid grid");
        let compressor = ImageCompressor::new(CompressorConfig::default()).expect("valid config");
        let mut recorder = Recorder::default();

        let result = compressor.compress(&image, &mut recorder, None).expect("compresses");

        assert_eq!(result.compressed.region_count(), 1);
        assert_eq!(result.reconstructed, image);
        assert_eq!(recorder.started, Some(16));
        assert_eq!(recorder.regions, 1);
        let finished = recorder.finished.expect("final update");
        assert_eq!(finished.progress, 1.0);
        assert_eq!(finished.total_regions, 1);
    }

    #[test]
    fn progress_is_throttled_to_the_interval() {
        let pixels = (0..64).map(|i| Color::new((i * 4) as u8, 0, 0)).collect();
        let image = Image::new(8, 8, pixels).expect("valid grid");
        let config = CompressorConfig {
            similarity_threshold: 1.0,
            finder: FinderKind::FloodFill,
            progress_interval: Duration::from_secs(3_600),
            ..CompressorConfig::default()
        };
        let compressor = ImageCompressor::new(config).expect("valid config");
        let mut recorder = Recorder::default();

        let result = compressor.compress(&image, &mut recorder, None).expect("compresses");
        assert_eq!(result.compressed.region_count(), 64);
        assert_eq!(recorder.regions, 1);
        assert!(recorder.finished.is_some());
    }

    #[test]
    fn cancelled_run_returns_cancelled() {
        let image = Image::new(3, 3, vec![Color::default(); 9]).expect("valid grid");
        let compressor = ImageCompressor::new(CompressorConfig::default()).expect("valid config");
        let cancel = AtomicBool::new(true);

        let result = compressor.compress(&image, &mut NoProgress, Some(&cancel));
        assert!(matches!(result, Err(Error::Cancelled { regions: 0, .. })));
    }
}
