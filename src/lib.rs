// THEORY:
// This file is the main entry point for the `region_compress` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the command-line front end
// in `main.rs`).
//
// The primary goal is to export the `ImageCompressor` and its associated data
// structures (`CompressorConfig`, `CompressionResult`, etc.) as the clean,
// high-level interface for the whole compressor. The region-growing engine lives
// in `core_modules`; it stays public so that finders, the segmenter and the colour
// metric can be used and tested on their own.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use error::{ConfigError, Error, FinderError, InputError, Result};
pub use parallel_pipeline::{BatchCompressor, BatchOutcome};
pub use pipeline::{CompressionResult, CompressorConfig, FinderKind, ImageCompressor};
