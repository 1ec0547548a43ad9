// THEORY:
// The `region` module defines the compressed representation of an image. A `Region`
// is a finalised, connected group of pixels that will be painted with a single colour;
// a `CompressedImage` is the ordered list of those regions plus the grid dimensions.
//
// Key architectural principles:
// 1.  **Discovery Order is Kept**: `Region::pixels` lists points in the order the
//     finder discovered them, seed first. Nothing downstream re-sorts it, so two runs
//     with the same configuration produce byte-identical output.
// 2.  **One Colour per Region**: The `RegionColor` is the channel-wise mean of the
//     source colours, truncated toward zero. It is computed once, when the region is
//     finalised, and never updated.
// 3.  **Stateless Data Container**: Like `Color`, a `Region` knows nothing about how
//     it was found. The finders produce bare point lists; the segmentation driver
//     turns them into `Region`s.

use crate::core_modules::color::color::{Color, RGB_CHANNELS};
use crate::core_modules::image_grid::{Image, Point};

/// The mean colour assigned to every pixel of a region.
pub type RegionColor = Color;

/// A finalised region: its pixels and the single colour that replaces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Sequential identifier within one compression run, in raster order of seeds.
    pub id: u64,
    /// Pixels in discovery order. The first entry is the seed.
    pub pixels: Vec<Point>,
    /// Truncated channel-wise mean of the source colours of `pixels`.
    pub color: RegionColor,
    /// Top-left and bottom-right corners of the box enclosing all pixels.
    pub bounding_box: (Point, Point),
}

impl Region {
    /// Builds a region from a non-empty list of in-bounds pixels. Returns `None`
    /// for an empty list.
    pub fn new(id: u64, pixels: Vec<Point>, image: &Image) -> Option<Self> {
        let color = mean_color(image, &pixels)?;
        let bounding_box = bounding_box(&pixels)?;
        Some(Self {
            id,
            pixels,
            color,
            bounding_box,
        })
    }

    pub fn seed(&self) -> Point {
        self.pixels[0]
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Channel-wise mean of the colours at `pixels`, truncated to integers.
pub fn mean_color(image: &Image, pixels: &[Point]) -> Option<RegionColor> {
    if pixels.is_empty() {
        return None;
    }

    let mut sums = [0u64; RGB_CHANNELS];
    for &point in pixels {
        for (sum, channel) in sums.iter_mut().zip(image.color_at(point).channels()) {
            *sum += channel as u64;
        }
    }

    let count = pixels.len() as u64;
    let [red, green, blue] = sums.map(|sum| (sum / count) as u8);
    Some(Color::new(red, green, blue))
}

fn bounding_box(pixels: &[Point]) -> Option<(Point, Point)> {
    let first = *pixels.first()?;
    let mut min = first;
    let mut max = first;
    for point in &pixels[1..] {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }
    Some((min, max))
}

/// The logical output of a compression run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub width: usize,
    pub height: usize,
    pub regions: Vec<Region>,
}

impl CompressedImage {
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Sum of all region sizes. Equals `pixel_count` after a complete run.
    pub fn covered_pixels(&self) -> usize {
        self.regions.iter().map(Region::len).sum()
    }

    pub fn average_region_size(&self) -> f64 {
        if self.regions.is_empty() {
            return 0.0;
        }
        self.covered_pixels() as f64 / self.regions.len() as f64
    }
}
