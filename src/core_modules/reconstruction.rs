// THEORY:
// Reconstruction turns a `CompressedImage` back into a dense `Image` by painting every
// region with its stored colour. It is the inverse view of segmentation and the only
// place a region list becomes pixels again.
//
// Key architectural principles:
// 1.  **Checked Writes**: Every coordinate is bounds-checked before it is written.
//     A point outside the grid is skipped and counted rather than panicking.
// 2.  **Coverage is Asserted, Not Assumed**: Each output cell starts empty. If any
//     cell is still empty after all regions are painted, reconstruction fails with
//     `IncompleteCoverage` instead of returning an image with zeroed holes.
// 3.  **Quality is a Separate Concern**: `QualityReport` compares source and
//     reconstruction after the fact using the colour metric helpers. It never
//     influences the region list.

use log::warn;

use crate::core_modules::color::color::Color;
use crate::core_modules::color_metric::color_metric::{distance, edge_strength, variance_in_region};
use crate::core_modules::image_grid::Image;
use crate::core_modules::region::CompressedImage;
use crate::error::{Error, Result};

/// Paints each region with its colour. Fails if any pixel is left uncovered.
pub fn reconstruct(compressed: &CompressedImage) -> Result<Image> {
    let width = compressed.width;
    let height = compressed.height;
    let mut cells: Vec<Option<Color>> = vec![None; width * height];
    let mut out_of_bounds = 0usize;

    for region in &compressed.regions {
        for point in &region.pixels {
            if point.x >= width || point.y >= height {
                out_of_bounds += 1;
                continue;
            }
            cells[point.y * width + point.x] = Some(region.color);
        }
    }

    if out_of_bounds > 0 {
        warn!("Skipped {} region pixels outside the {}x{} grid", out_of_bounds, width, height);
    }

    let unclaimed = cells.iter().filter(|cell| cell.is_none()).count();
    if unclaimed > 0 {
        return Err(Error::IncompleteCoverage {
            unclaimed,
            total: cells.len(),
        });
    }

    let pixels = cells.into_iter().flatten().collect();
    Ok(Image::new(width, height, pixels)?)
}

/// How closely a reconstruction resembles its source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityReport {
    /// Mean perceptual colour distance per pixel, in normalised units.
    pub mean_color_error: f64,
    /// Mean normalised colour variance of the source pixels inside each region.
    pub mean_region_variance: f64,
    /// Summed edge strength of the reconstruction divided by that of the source.
    /// 1.0 when the source has no edges.
    pub edge_retention: f64,
}

impl QualityReport {
    /// Compares `source` with `reconstructed`. Both must have the dimensions
    /// recorded in `compressed`.
    pub fn measure(source: &Image, compressed: &CompressedImage, reconstructed: &Image) -> Self {
        let pixel_count = source.pixel_count().max(1) as f64;
        let total_error: f64 = source
            .pixels()
            .iter()
            .zip(reconstructed.pixels())
            .map(|(original, painted)| distance(original.normalized(), painted.normalized(), true))
            .sum();

        let mean_region_variance = if compressed.regions.is_empty() {
            0.0
        } else {
            let total: f64 = compressed
                .regions
                .iter()
                .map(|region| {
                    let colors: Vec<Color> = region
                        .pixels
                        .iter()
                        .filter(|point| source.contains(**point))
                        .map(|point| source.color_at(*point))
                        .collect();
                    variance_in_region(&colors)
                })
                .sum();
            total / compressed.regions.len() as f64
        };

        let source_edges = total_edge_strength(source);
        let edge_retention = if source_edges > 0.0 {
            total_edge_strength(reconstructed) / source_edges
        } else {
            1.0
        };

        Self {
            mean_color_error: total_error / pixel_count,
            mean_region_variance,
            edge_retention,
        }
    }
}

fn total_edge_strength(image: &Image) -> f64 {
    let mut total = 0.0;
    for y in 0..image.height() {
        for x in 0..image.width() {
            total += edge_strength(image, x, y);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::image_grid::Point;
    use crate::core_modules::region::Region;

    fn split_image() -> (Image, CompressedImage) {
        let pixels = vec![
            Color::new(10, 10, 10),
            Color::new(12, 12, 12),
            Color::new(200, 0, 0),
            Color::new(202, 0, 0),
        ];
        let image = Image::new(2, 2, pixels).expect("valid grid");
        let top = Region::new(0, vec![Point::new(0, 0), Point::new(1, 0)], &image).expect("non-empty");
        let bottom = Region::new(1, vec![Point::new(0, 1), Point::new(1, 1)], &image).expect("non-empty");
        let compressed = CompressedImage {
            width: 2,
            height: 2,
            regions: vec![top, bottom],
        };
        (image, compressed)
    }

    #[test]
    fn paints_each_region_with_its_colour() {
        let (_, compressed) = split_image();
        let image = reconstruct(&compressed).expect("full coverage");
        assert_eq!(
            image.pixels(),
            &[
                Color::new(11, 11, 11),
                Color::new(11, 11, 11),
                Color::new(201, 0, 0),
                Color::new(201, 0, 0),
            ]
        );
    }

    #[test]
    fn missing_pixels_are_an_error() {
        let (_, mut compressed) = split_image();
        compressed.regions.pop();
        assert!(matches!(
            reconstruct(&compressed),
            Err(Error::IncompleteCoverage { unclaimed: 2, total: 4 })
        ));
    }

    #[test]
    fn out_of_range_points_are_skipped() {
        let (_, mut compressed) = split_image();
        compressed.regions[0].pixels.push(Point::new(5, 5));
        let image = reconstruct(&compressed).expect("full coverage");
        assert_eq!(image.pixel_count(), 4);
    }

    #[test]
    fn lossless_reconstruction_scores_perfectly() {
        let image = Image::new(3, 3, vec![Color::new(40, 50, 60); 9]).expect("valid grid");
        let pixels = (0..3).flat_map(|y| (0..3).map(move |x| Point::new(x, y))).collect();
        let region = Region::new(0, pixels, &image).expect("non-empty");
        let compressed = CompressedImage {
            width: 3,
            height: 3,
            regions: vec![region],
        };
        let reconstructed = reconstruct(&compressed).expect("full coverage");

        let report = QualityReport::measure(&image, &compressed, &reconstructed);
        assert_eq!(report.mean_color_error, 0.0);
        assert_eq!(report.mean_region_variance, 0.0);
        assert_eq!(report.edge_retention, 1.0);
    }

    #[test]
    fn averaging_introduces_measurable_error() {
        let (image, compressed) = split_image();
        let reconstructed = reconstruct(&compressed).expect("full coverage");
        let report = QualityReport::measure(&image, &compressed, &reconstructed);
        assert!(report.mean_color_error > 0.0);
        assert!(report.mean_region_variance > 0.0);
    }
}
