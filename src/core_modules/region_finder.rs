// THEORY:
// The `region_finder` module defines the seam between the segmentation driver and the
// interchangeable region-growing strategies.
//
// Key architectural principles:
// 1.  **One Question, Many Answers**: Every strategy answers the same question: "given
//     this unclaimed seed and the pixels already taken, which pixels belong with it?"
//     The `RegionFinder` trait captures exactly that, so the driver never needs to
//     know which strategy is running.
// 2.  **Read-Only View of Claims**: Finders receive the `ClaimedMask` by shared
//     reference. They keep their own per-call membership set for the region being
//     grown; only the driver marks pixels as claimed once a region is finalised.
// 3.  **Per-Run State**: A finder is built once per compression run. It borrows the
//     run's `Image` and owns the run's `SimilarityCache`, so nothing leaks between
//     runs and concurrent runs never share mutable state.
// 4.  **Recoverable Anomalies**: A finder that cannot handle a seed returns a
//     `FinderError` rather than panicking. The driver logs it and moves on.

use std::fmt;
use std::str::FromStr;

use crate::core_modules::adaptive_grower::AdaptiveRegionGrower;
use crate::core_modules::flood_fill::FloodFill;
use crate::core_modules::image_grid::{ClaimedMask, Image, Point};
use crate::core_modules::mean_shift::MeanShiftGrower;
use crate::core_modules::similarity_cache::SimilarityCache;
use crate::error::{ConfigError, FinderError};

/// Smallest default region cap, so tiny images are not forced into single pixels.
const MIN_DEFAULT_REGION_SIZE: usize = 256;

/// The available region-growing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FinderKind {
    /// Breadth-first, 4-connected, seed-anchored, uniform threshold.
    FloodFill,
    /// Best-first, 8-connected, seed-anchored, variance-adaptive threshold.
    #[default]
    Adaptive,
    /// Breadth-first, 8-connected, anchored to the running mean colour.
    MeanShift,
}

impl FinderKind {
    pub const ALL: [FinderKind; 3] = [FinderKind::FloodFill, FinderKind::Adaptive, FinderKind::MeanShift];

    pub fn name(self) -> &'static str {
        match self {
            FinderKind::FloodFill => "flood-fill",
            FinderKind::Adaptive => "adaptive",
            FinderKind::MeanShift => "mean-shift",
        }
    }

    /// The region cap used when none is configured: a fraction of the pixel
    /// count, bounded above per strategy and below by `MIN_DEFAULT_REGION_SIZE`
    /// (or the whole image, if smaller).
    pub fn default_max_region_size(self, pixel_count: usize) -> usize {
        let (ceiling, divisor) = match self {
            FinderKind::FloodFill => (10_000, 20),
            FinderKind::Adaptive | FinderKind::MeanShift => (20_000, 10),
        };
        let floor = pixel_count.min(MIN_DEFAULT_REGION_SIZE).max(1);
        (pixel_count / divisor).clamp(floor, ceiling)
    }
}

impl fmt::Display for FinderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FinderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flood-fill" | "floodfill" | "flood_fill" | "flood" => Ok(FinderKind::FloodFill),
            "adaptive" => Ok(FinderKind::Adaptive),
            "mean-shift" | "meanshift" | "mean_shift" => Ok(FinderKind::MeanShift),
            _ => Err(ConfigError::UnknownFinder(s.to_string())),
        }
    }
}

/// Strategy parameters shared by all finders. Validated upstream by
/// `CompressorConfig::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderSettings {
    pub similarity_threshold: f64,
    pub max_region_size: Option<usize>,
    pub adaptive_mode: bool,
    pub spatial_bandwidth: f64,
}

/// A strategy that grows one region from one seed.
pub trait RegionFinder {
    /// Returns the region grown from `seed`, seed first, in discovery order.
    /// The result never contains claimed pixels or duplicates and never
    /// exceeds `max_region_size`.
    fn find_region(&mut self, seed: Point, claimed: &ClaimedMask) -> Result<Vec<Point>, FinderError>;

    fn kind(&self) -> FinderKind;

    fn max_region_size(&self) -> usize;
}

/// Builds the finder for `kind` over `image`, with a fresh similarity cache.
pub fn build_finder<'a>(
    kind: FinderKind,
    image: &'a Image,
    settings: &FinderSettings,
) -> Box<dyn RegionFinder + 'a> {
    let max_region_size = settings
        .max_region_size
        .unwrap_or_else(|| kind.default_max_region_size(image.pixel_count()));
    let cache = SimilarityCache::new();

    match kind {
        FinderKind::FloodFill => Box::new(FloodFill::new(
            image,
            settings.similarity_threshold,
            max_region_size,
            cache,
        )),
        FinderKind::Adaptive => Box::new(AdaptiveRegionGrower::new(
            image,
            settings.similarity_threshold,
            max_region_size,
            settings.adaptive_mode,
            cache,
        )),
        FinderKind::MeanShift => Box::new(MeanShiftGrower::new(
            image,
            1.0 - settings.similarity_threshold,
            settings.spatial_bandwidth,
            max_region_size,
        )),
    }
}

/// Rejects seeds a finder cannot start from.
pub(crate) fn check_seed(image: &Image, claimed: &ClaimedMask, seed: Point) -> Result<(), FinderError> {
    if claimed.width() != image.width() || claimed.height() != image.height() {
        return Err(FinderError::MaskMismatch {
            mask_width: claimed.width(),
            mask_height: claimed.height(),
            width: image.width(),
            height: image.height(),
        });
    }
    if !image.contains(seed) {
        return Err(FinderError::SeedOutOfBounds {
            seed,
            width: image.width(),
            height: image.height(),
        });
    }
    if claimed.is_claimed(seed) {
        return Err(FinderError::SeedClaimed(seed));
    }
    Ok(())
}
