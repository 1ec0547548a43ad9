//! Error types for the compressor.
//!
//! Errors are grouped the same way the run can fail: bad configuration is caught
//! at construction, bad input before any region discovery, and finder anomalies
//! are recorded per seed without aborting the run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core_modules::image_grid::Point;

/// Top-level error returned by the compressor API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error("{unclaimed} of {total} pixels are not covered by any region")]
    IncompleteCoverage { unclaimed: usize, total: usize },

    #[error("compression cancelled after {regions} regions ({processed_pixels} pixels)")]
    Cancelled { processed_pixels: usize, regions: usize },

    #[error("Failed to save image '{path}': {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write report '{path}': {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("batch worker failed: {0}")]
    Worker(String),
}

/// Configuration rejected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("similarity threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("unknown region finder '{0}' (expected flood-fill, adaptive or mean-shift)")]
    UnknownFinder(String),

    #[error("maximum region size must be positive")]
    ZeroMaxRegionSize,

    #[error("spatial bandwidth must be a positive finite number, got {0}")]
    InvalidSpatialBandwidth(f64),
}

/// The image source could not supply a rectangular, fully populated grid.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to load image '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image has zero area ({width}x{height})")]
    Empty { width: usize, height: usize },

    #[error("unsupported channel count {0} (expected 3 or 4)")]
    UnsupportedChannels(usize),

    #[error("buffer holds {actual} values but {width}x{height} needs {expected}")]
    NotRectangular {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
}

/// A region finder could not produce a region for one seed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinderError {
    #[error("seed {seed:?} lies outside the {width}x{height} image")]
    SeedOutOfBounds { seed: Point, width: usize, height: usize },

    #[error("seed {0:?} is already claimed")]
    SeedClaimed(Point),

    #[error("finder returned no usable pixels for seed {0:?}")]
    EmptyRegion(Point),

    #[error("claimed mask is {mask_width}x{mask_height} but the image is {width}x{height}")]
    MaskMismatch {
        mask_width: usize,
        mask_height: usize,
        width: usize,
        height: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
