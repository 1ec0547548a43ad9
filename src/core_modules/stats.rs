// THEORY:
// `CompressionStats` is the bookkeeping side of a run. It never influences which
// pixels end up in which region; it only listens to finalised regions and turns
// them into the numbers a user wants to see: progress, rate, ETA, and estimated
// sizes before and after compression.
//
// Key architectural principles:
// 1.  **Event Driven**: The only input is `record_region`, called once per
//     finalised region. Every other figure is derived from the recorded sizes and
//     the clock, so the tracker tolerates being fed zero or many regions.
// 2.  **Snapshot for Observers**: Progress observers receive a `StatsSummary`, a
//     cheap copy of the current figures, instead of a reference into the tracker.
// 3.  **Size Estimates, Not Encodings**: Byte counts model a naive representation:
//     3 bytes per source pixel, and 3 bytes of colour plus 4 bytes per pixel
//     coordinate for the region list. They exist for comparison only.

use std::fmt;
use std::time::{Duration, Instant};

/// Bytes per RGB pixel in the uncompressed estimate.
const BYTES_PER_PIXEL: u64 = 3;
/// Bytes per region colour in the compressed estimate.
const BYTES_PER_REGION_COLOR: u64 = 3;
/// Bytes per stored pixel coordinate in the compressed estimate.
const BYTES_PER_COORDINATE: u64 = 4;

#[derive(Debug, Clone)]
pub struct CompressionStats {
    width: usize,
    height: usize,
    started: Instant,
    finished: Option<Instant>,
    processed_pixels: usize,
    region_sizes: Vec<usize>,
}

/// A point-in-time copy of the figures a progress observer needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSummary {
    pub progress: f64,
    pub elapsed: Duration,
    pub estimated_remaining: Duration,
    pub processing_rate: f64,
    pub compression_ratio: f64,
    pub total_pixels: usize,
    pub processed_pixels: usize,
    pub total_regions: usize,
}

impl CompressionStats {
    /// Starts the clock for a `width` x `height` image.
    pub fn start(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            started: Instant::now(),
            finished: None,
            processed_pixels: 0,
            region_sizes: Vec::new(),
        }
    }

    pub fn record_region(&mut self, size: usize) {
        self.region_sizes.push(size);
        self.processed_pixels += size;
    }

    /// Stops the clock. Later calls keep the first finish time.
    pub fn finish(&mut self) {
        self.finished.get_or_insert_with(Instant::now);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn total_pixels(&self) -> usize {
        self.width * self.height
    }

    pub fn processed_pixels(&self) -> usize {
        self.processed_pixels
    }

    pub fn total_regions(&self) -> usize {
        self.region_sizes.len()
    }

    pub fn region_sizes(&self) -> &[usize] {
        &self.region_sizes
    }

    pub fn elapsed(&self) -> Duration {
        let end = self.finished.unwrap_or_else(Instant::now);
        end.duration_since(self.started)
    }

    /// Fraction of pixels claimed so far, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.total_pixels() == 0 {
            return 0.0;
        }
        (self.processed_pixels as f64 / self.total_pixels() as f64).min(1.0)
    }

    /// Pixels per second since the run started.
    pub fn processing_rate(&self) -> f64 {
        let seconds = self.elapsed().as_secs_f64();
        if seconds <= 0.0 {
            return 0.0;
        }
        self.processed_pixels as f64 / seconds
    }

    pub fn estimated_remaining(&self) -> Duration {
        let progress = self.progress();
        if progress >= 1.0 {
            return Duration::ZERO;
        }
        let elapsed = self.elapsed().as_secs_f64();
        let remaining = elapsed / progress.max(0.001) - elapsed;
        Duration::from_secs_f64(remaining.max(0.0))
    }

    /// Source pixels per region.
    pub fn compression_ratio(&self) -> f64 {
        self.total_pixels() as f64 / self.total_regions().max(1) as f64
    }

    pub fn largest_region(&self) -> usize {
        self.region_sizes.iter().copied().max().unwrap_or(0)
    }

    pub fn smallest_region(&self) -> usize {
        self.region_sizes.iter().copied().min().unwrap_or(0)
    }

    pub fn average_region_size(&self) -> f64 {
        if self.region_sizes.is_empty() {
            return 0.0;
        }
        self.processed_pixels as f64 / self.region_sizes.len() as f64
    }

    pub fn bytes_original(&self) -> u64 {
        self.total_pixels() as u64 * BYTES_PER_PIXEL
    }

    pub fn bytes_compressed(&self) -> u64 {
        let pixels: u64 = self.region_sizes.iter().map(|&size| size as u64).sum();
        self.total_regions() as u64 * BYTES_PER_REGION_COLOR + BYTES_PER_COORDINATE * pixels
    }

    pub fn byte_ratio(&self) -> f64 {
        self.bytes_original() as f64 / self.bytes_compressed().max(1) as f64
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            progress: self.progress(),
            elapsed: self.elapsed(),
            estimated_remaining: self.estimated_remaining(),
            processing_rate: self.processing_rate(),
            compression_ratio: self.compression_ratio(),
            total_pixels: self.total_pixels(),
            processed_pixels: self.processed_pixels,
            total_regions: self.total_regions(),
        }
    }
}

/// "1.25 seconds", "3 minutes, 4.00 seconds" or "1 hours, 2 minutes, 3.00 seconds".
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    if total < 60.0 {
        return format!("{total:.2} seconds");
    }
    let whole = elapsed.as_secs();
    let seconds = total - (whole - whole % 60) as f64;
    let minutes = (whole / 60) % 60;
    let hours = whole / 3600;
    if hours == 0 {
        format!("{minutes} minutes, {seconds:.2} seconds")
    } else {
        format!("{hours} hours, {minutes} minutes, {seconds:.2} seconds")
    }
}

/// "512 bytes", "1.50 KB" or "2.00 MB".
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} bytes")
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}

impl fmt::Display for CompressionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        let thin = "-".repeat(60);
        let original = self.bytes_original();
        let compressed = self.bytes_compressed();
        let saved = original as i64 - compressed as i64;
        let saved_percent = (1.0 - 1.0 / self.byte_ratio()) * 100.0;
        let saved_text = if saved >= 0 {
            format_bytes(saved as u64)
        } else {
            format!("-{}", format_bytes(saved.unsigned_abs()))
        };

        writeln!(f, "{rule}")?;
        writeln!(f, "{:^60}", "COMPRESSION REPORT")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total time:          {}", format_elapsed(self.elapsed()))?;
        writeln!(f, "Processing rate:     {:.0} pixels/second", self.processing_rate())?;
        writeln!(
            f,
            "Image dimensions:    {}x{} = {} pixels",
            self.width,
            self.height,
            self.total_pixels()
        )?;
        writeln!(f, "Regions identified:  {}", self.total_regions())?;
        writeln!(f, "Compression ratio:   {:.2}:1", self.compression_ratio())?;
        writeln!(f, "Data size ratio:     {:.2}:1", self.byte_ratio())?;
        writeln!(f, "{thin}")?;
        writeln!(f, "Original size:       {}", format_bytes(original))?;
        writeln!(f, "Compressed size:     {}", format_bytes(compressed))?;
        writeln!(f, "Space saved:         {saved_text} ({saved_percent:.1}%)")?;
        writeln!(f, "{thin}")?;
        writeln!(f, "Largest region:      {} pixels", self.largest_region())?;
        writeln!(f, "Smallest region:     {} pixels", self.smallest_region())?;
        writeln!(f, "Average region size: {:.2} pixels", self.average_region_size())?;
        write!(f, "{rule}")
    }
}
