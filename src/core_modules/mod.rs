pub mod adaptive_grower;
pub mod color;
pub mod color_metric;
pub mod flood_fill;
pub mod image_grid;
pub mod mean_shift;
pub mod progress;
pub mod reconstruction;
pub mod region;
pub mod region_finder;
pub mod segmenter;
pub mod similarity_cache;
pub mod stats;
pub mod utils;
