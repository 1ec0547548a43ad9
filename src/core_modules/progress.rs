// THEORY:
// Progress reporting is an optional listener on a compression run. The compressor
// pushes `StatsSummary` snapshots into a `ProgressObserver`; what happens to them
// (a log line, a console bar, nothing at all) is up to the observer.
//
// Key architectural principles:
// 1.  **No-Op Defaults**: Every trait method has an empty default body. An observer
//     may be called zero or many times and must never change the result of a run.
// 2.  **Throttling Lives Upstream**: The compressor decides how often `on_region` is
//     delivered. `ConsoleProgress` adds its own redraw limit on top so that a fast
//     producer cannot flood the terminal.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use log::info;

use crate::core_modules::stats::StatsSummary;

/// Width of the console progress bar, in cells.
const BAR_WIDTH: usize = 50;
/// Minimum time between two console redraws.
const REDRAW_INTERVAL: Duration = Duration::from_millis(200);

pub trait ProgressObserver {
    fn on_start(&mut self, _total_pixels: usize) {}

    fn on_region(&mut self, _region_size: usize, _summary: &StatsSummary) {}

    fn on_finish(&mut self, _summary: &StatsSummary) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Reports progress through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_start(&mut self, total_pixels: usize) {
        info!("Starting compression of {} pixels", total_pixels);
    }

    fn on_region(&mut self, _region_size: usize, summary: &StatsSummary) {
        info!(
            "Progress: {:.1}% - {}/{} pixels, {} regions, {:.0} px/sec, {:.1} sec elapsed",
            summary.progress * 100.0,
            summary.processed_pixels,
            summary.total_pixels,
            summary.total_regions,
            summary.processing_rate,
            summary.elapsed.as_secs_f64()
        );
    }

    fn on_finish(&mut self, summary: &StatsSummary) {
        info!(
            "Compression complete: {:.2}:1 ratio, {} regions, {:.2} seconds",
            summary.compression_ratio,
            summary.total_regions,
            summary.elapsed.as_secs_f64()
        );
    }
}

/// Draws a single-line progress bar on a terminal stream.
pub struct ConsoleProgress<W: Write> {
    out: W,
    description: String,
    last_draw: Option<Instant>,
}

impl ConsoleProgress<io::Stderr> {
    pub fn stderr(description: impl Into<String>) -> Self {
        Self::new(io::stderr(), description)
    }
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W, description: impl Into<String>) -> Self {
        Self {
            out,
            description: description.into(),
            last_draw: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, summary: &StatsSummary, force: bool) {
        let now = Instant::now();
        if !force && self.last_draw.is_some_and(|last| now.duration_since(last) < REDRAW_INTERVAL) {
            return;
        }
        self.last_draw = Some(now);

        let line = render_bar(&self.description, summary);
        // A broken terminal must not abort the run.
        let _ = write!(self.out, "\r{line}");
        if summary.progress >= 1.0 {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
    }
}

impl<W: Write> ProgressObserver for ConsoleProgress<W> {
    fn on_start(&mut self, total_pixels: usize) {
        let summary = StatsSummary {
            progress: 0.0,
            elapsed: Duration::ZERO,
            estimated_remaining: Duration::ZERO,
            processing_rate: 0.0,
            compression_ratio: 0.0,
            total_pixels,
            processed_pixels: 0,
            total_regions: 0,
        };
        self.draw(&summary, true);
    }

    fn on_region(&mut self, _region_size: usize, summary: &StatsSummary) {
        self.draw(summary, false);
    }

    fn on_finish(&mut self, summary: &StatsSummary) {
        self.draw(summary, true);
    }
}

/// `Compressing: [#####.....]  50.00% | 1.2s elapsed | ETA: 1.2s | 1000 px/sec | 12 regions`
pub fn render_bar(description: &str, summary: &StatsSummary) -> String {
    let progress = summary.progress.clamp(0.0, 1.0);
    let filled = (BAR_WIDTH as f64 * progress) as usize;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled));
    let eta = if progress >= 1.0 {
        "Complete".to_string()
    } else {
        format_short(summary.estimated_remaining)
    };

    format!(
        "{description}: [{bar}] {:6.2}% | {} elapsed | ETA: {eta} | {:.0} px/sec | {} regions",
        progress * 100.0,
        format_short(summary.elapsed),
        summary.processing_rate,
        summary.total_regions
    )
}

/// "4.2s", "3m 4s", "1h 2m 3s" or "1d 2h 3m".
pub fn format_short(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
