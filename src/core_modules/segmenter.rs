// THEORY:
// The `Segmenter` is the orchestrator of a compression run, the way the grid manager
// orchestrates its chunk analyzers. It owns the `ClaimedMask`, walks the image, asks
// the active `RegionFinder` for one region per unclaimed seed, and folds the answers
// into an ordered region list.
//
// Key architectural principles:
// 1.  **Fixed Raster Order**: Seeds are visited row by row, left to right. Together
//     with deterministic finders this makes every run reproducible.
// 2.  **Sole Writer of Claims**: Finders only read the mask. The segmenter marks
//     pixels as claimed once a region is finalised, and nothing else ever does.
// 3.  **Untrusted Finder Output**: Whatever a finder returns is re-checked before it
//     is claimed. Out-of-range, duplicate, or already-claimed pixels are dropped and
//     counted in `rejected_pixels`. A healthy finder always leaves that count at 0.
// 4.  **Skip, Don't Abort**: A finder error for one seed is logged, recorded as a
//     `SegmentationAnomaly`, and the scan continues with the next pixel. The pixels
//     it left unclaimed surface later as incomplete coverage.
// 5.  **Coarse Cancellation**: An optional flag is polled between pixel scans, so a
//     cancelled run stops within one region's worth of work.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::core_modules::image_grid::{ClaimedMask, Image, Point};
use crate::core_modules::region::{CompressedImage, Region};
use crate::core_modules::region_finder::RegionFinder;
use crate::error::{Error, FinderError, Result};

/// A seed the finder could not turn into a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationAnomaly {
    pub seed: Point,
    pub error: FinderError,
}

/// Everything a segmentation pass produced.
#[derive(Debug, Clone)]
pub struct SegmentationOutcome {
    pub compressed: CompressedImage,
    pub anomalies: Vec<SegmentationAnomaly>,
    /// Pixels returned by the finder that failed the post-condition check.
    pub rejected_pixels: usize,
}

impl SegmentationOutcome {
    /// True when every pixel is covered and the finder never misbehaved.
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
            && self.rejected_pixels == 0
            && self.compressed.covered_pixels() == self.compressed.pixel_count()
    }
}

pub struct Segmenter<'a> {
    image: &'a Image,
    claimed: ClaimedMask,
    regions: Vec<Region>,
    anomalies: Vec<SegmentationAnomaly>,
    rejected_pixels: usize,
}

impl<'a> Segmenter<'a> {
    pub fn new(image: &'a Image) -> Self {
        Self {
            image,
            claimed: ClaimedMask::for_image(image),
            regions: Vec::new(),
            anomalies: Vec::new(),
            rejected_pixels: 0,
        }
    }

    /// Runs the full raster scan. `on_region` is called once per finalised
    /// region, together with the number of pixels claimed so far.
    pub fn segment<F>(
        mut self,
        finder: &mut dyn RegionFinder,
        cancel: Option<&AtomicBool>,
        mut on_region: F,
    ) -> Result<SegmentationOutcome>
    where
        F: FnMut(&Region, usize),
    {
        info!(
            "Segmenting {}x{} image with {} (max region size {})",
            self.image.width(),
            self.image.height(),
            finder.kind(),
            finder.max_region_size()
        );

        for y in 0..self.image.height() {
            for x in 0..self.image.width() {
                if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                    return Err(Error::Cancelled {
                        processed_pixels: self.claimed.claimed_count(),
                        regions: self.regions.len(),
                    });
                }

                let seed = Point::new(x, y);
                if self.claimed.is_claimed(seed) {
                    continue;
                }

                if let Some(region) = self.grow(finder, seed) {
                    on_region(&region, self.claimed.claimed_count());
                    self.regions.push(region);
                }
            }
        }

        if self.rejected_pixels > 0 {
            warn!("Finder returned {} pixels that had to be discarded", self.rejected_pixels);
        }
        info!(
            "Segmentation finished: {} regions, {} anomalies",
            self.regions.len(),
            self.anomalies.len()
        );

        Ok(SegmentationOutcome {
            compressed: CompressedImage {
                width: self.image.width(),
                height: self.image.height(),
                regions: self.regions,
            },
            anomalies: self.anomalies,
            rejected_pixels: self.rejected_pixels,
        })
    }

    /// Asks the finder for one region and finalises it.
    fn grow(&mut self, finder: &mut dyn RegionFinder, seed: Point) -> Option<Region> {
        let candidates = match finder.find_region(seed, &self.claimed) {
            Ok(candidates) => candidates,
            Err(error) => {
                self.record_anomaly(seed, error);
                return None;
            }
        };

        let offered = candidates.len();
        let mut accepted = Vec::with_capacity(offered);
        for point in candidates {
            if accepted.len() >= finder.max_region_size() {
                break;
            }
            // `claim` refuses out-of-range and already-claimed points, which also
            // catches duplicates within this region.
            if self.claimed.claim(point) {
                accepted.push(point);
            }
        }
        self.rejected_pixels += offered - accepted.len();

        if accepted.is_empty() {
            self.record_anomaly(seed, FinderError::EmptyRegion(seed));
            return None;
        }

        let region = Region::new(self.regions.len() as u64, accepted, self.image)?;
        debug!(
            "Region {} seeded at ({}, {}): {} pixels, colour {:?}",
            region.id,
            seed.x,
            seed.y,
            region.len(),
            region.color
        );
        Some(region)
    }

    fn record_anomaly(&mut self, seed: Point, error: FinderError) {
        warn!("Skipping seed ({}, {}): {}", seed.x, seed.y, error);
        self.anomalies.push(SegmentationAnomaly { seed, error });
    }
}
