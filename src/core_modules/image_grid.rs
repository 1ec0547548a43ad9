// THEORY:
// The `image_grid` module holds the two dense grids every compression run is built
// on: the read-only `Image` of source colours and the `ClaimedMask` that records
// which pixels already belong to a finalised region.
//
// Key architectural principles:
// 1.  **Validated at the Door**: An `Image` can only be constructed from a buffer
//     that is rectangular and fully populated. Once built, every coordinate inside
//     `[0, width) x [0, height)` has a colour, so the finders never deal with holes.
// 2.  **Row-Major Storage**: Both grids are flat `Vec`s indexed `y * width + x`, the
//     same layout as the frame buffers the pixels come from.
// 3.  **Monotonic Claims**: A `ClaimedMask` cell only ever goes from `false` to
//     `true`. Claiming is crate-private: region finders may read the mask, but only
//     the segmentation driver writes to it after a region is finalised.

use image::{DynamicImage, RgbImage};

use crate::core_modules::color::color::{Byte, Color, RGB_CHANNELS};
use crate::error::InputError;

/// A pixel location on the image grid. Identifies a place, not a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Which neighbours count as adjacent during region growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Up, down, left, right.
    Four,
    /// The four cardinal neighbours plus the diagonals.
    Eight,
}

impl Connectivity {
    // Cardinal offsets first, then diagonals, so 8-connected traversal visits the
    // same cardinal neighbours in the same order as 4-connected traversal.
    const OFFSETS: [(isize, isize); 8] = [
        (0, -1),
        (0, 1),
        (-1, 0),
        (1, 0),
        (-1, -1),
        (-1, 1),
        (1, -1),
        (1, 1),
    ];

    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &Self::OFFSETS[..4],
            Connectivity::Eight => &Self::OFFSETS[..],
        }
    }
}

/// A dense, read-only grid of RGB colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Image {
    /// Wraps a row-major colour buffer, rejecting empty or ragged grids.
    pub fn new(width: usize, height: usize, pixels: Vec<Color>) -> Result<Self, InputError> {
        if width == 0 || height == 0 {
            return Err(InputError::Empty { width, height });
        }
        let expected = width * height;
        if pixels.len() != expected {
            return Err(InputError::NotRectangular {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds an image from an interleaved RGB or RGBA byte buffer.
    /// Alpha, when present, is dropped.
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        bytes: &[Byte],
    ) -> Result<Self, InputError> {
        if channels != 3 && channels != 4 {
            return Err(InputError::UnsupportedChannels(channels));
        }
        if width == 0 || height == 0 {
            return Err(InputError::Empty { width, height });
        }
        let expected = width * height * channels;
        if bytes.len() != expected {
            return Err(InputError::NotRectangular {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes.chunks_exact(channels).map(Color::from).collect();
        Self::new(width, height, pixels)
    }

    /// Converts any decoded image to 8-bit RGB.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self, InputError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_raw(width as usize, height as usize, RGB_CHANNELS, rgb.as_raw())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x < self.width && point.y < self.height
    }

    /// Colour at (x, y). Panics if the coordinate is outside the grid; callers
    /// check with `contains` or iterate `neighbors`.
    pub fn color(&self, x: usize, y: usize) -> Color {
        self.pixels[y * self.width + x]
    }

    pub fn color_at(&self, point: Point) -> Color {
        self.color(point.x, point.y)
    }

    /// In-bounds neighbours of `point`, cardinal directions first.
    pub fn neighbors(&self, point: Point, connectivity: Connectivity) -> impl Iterator<Item = Point> + '_ {
        connectivity.offsets().iter().filter_map(move |&(dx, dy)| {
            let nx = point.x.checked_add_signed(dx)?;
            let ny = point.y.checked_add_signed(dy)?;
            let neighbor = Point::new(nx, ny);
            self.contains(neighbor).then_some(neighbor)
        })
    }

    /// Colours of every pixel within `radius` of (x, y), clipped to the grid.
    pub fn window(&self, x: usize, y: usize, radius: usize) -> Vec<Color> {
        let x_min = x.saturating_sub(radius);
        let x_max = (x + radius).min(self.width - 1);
        let y_min = y.saturating_sub(radius);
        let y_max = (y + radius).min(self.height - 1);

        let mut colors = Vec::with_capacity((x_max - x_min + 1) * (y_max - y_min + 1));
        for wy in y_min..=y_max {
            for wx in x_min..=x_max {
                colors.push(self.color(wx, wy));
            }
        }
        colors
    }

    /// Copies the grid into an `image` buffer for encoding.
    pub fn to_rgb_image(&self) -> RgbImage {
        let bytes: Vec<u8> = self.pixels.iter().flat_map(|c| c.channels()).collect();
        // The buffer length is width * height * 3 by construction.
        RgbImage::from_raw(self.width as u32, self.height as u32, bytes)
            .unwrap_or_else(|| RgbImage::new(self.width as u32, self.height as u32))
    }
}

/// Tracks which pixels already belong to a finalised region.
#[derive(Debug, Clone)]
pub struct ClaimedMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
    claimed: usize,
}

impl ClaimedMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
            claimed: 0,
        }
    }

    pub fn for_image(image: &Image) -> Self {
        Self::new(image.width(), image.height())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x < self.width && point.y < self.height
    }

    /// Out-of-range points report `false`; they can never be claimed.
    pub fn is_claimed(&self, point: Point) -> bool {
        self.contains(point) && self.cells[point.y * self.width + point.x]
    }

    /// Marks `point` as claimed. Returns `false` if it was out of range or
    /// already claimed, leaving the mask untouched.
    pub(crate) fn claim(&mut self, point: Point) -> bool {
        if !self.contains(point) {
            return false;
        }
        let cell = &mut self.cells[point.y * self.width + point.x];
        if *cell {
            return false;
        }
        *cell = true;
        self.claimed += 1;
        true
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed
    }

    pub fn unclaimed_count(&self) -> usize {
        self.cells.len() - self.claimed
    }

    pub fn is_complete(&self) -> bool {
        self.claimed == self.cells.len()
    }
}
