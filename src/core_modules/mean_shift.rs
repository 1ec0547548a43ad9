// THEORY:
// The `MeanShiftGrower` grows a region around a moving target. Where `FloodFill` and
// the adaptive grower compare every candidate against the seed, this finder compares
// against the running mean colour of everything accepted so far, and adds a penalty
// for straying too far from the seed in space.
//
// Algorithm:
// 1.  **Breadth-First, 8-Connected**: Pixels are expanded in acceptance order from a
//     FIFO queue, diagonals included.
// 2.  **Combined Score**: A candidate is accepted when
//         colour_distance(candidate, mean) / colour_bandwidth
//       + spatial_distance(candidate, seed) / spatial_bandwidth  < 1
//     Colours are normalised to [0, 1] per channel; spatial distance is divided by
//     the larger image dimension. Both bandwidths are fractions of their ranges.
// 3.  **Drifting Centroid**: On acceptance, the mean is updated incrementally
//     (mean * n + colour) / (n + 1). The region's reference colour drifts smoothly
//     as it absorbs flat areas, which lets it follow soft gradients.
// 4.  **Spatial Floor**: The spatial bandwidth never confines a region to fewer than
//     `MIN_SPATIAL_RADIUS` pixels around its seed, so small images still merge.

use std::collections::{HashSet, VecDeque};

use crate::core_modules::color::color::RGB_CHANNELS;
use crate::core_modules::color_metric::color_metric::distance;
use crate::core_modules::image_grid::{ClaimedMask, Connectivity, Image, Point};
use crate::core_modules::region_finder::{check_seed, FinderKind, RegionFinder};
use crate::error::FinderError;

/// Default spatial bandwidth, as a fraction of the larger image dimension.
pub const DEFAULT_SPATIAL_BANDWIDTH: f64 = 0.05;
/// A region may always reach this many pixels from its seed.
pub const MIN_SPATIAL_RADIUS: f64 = 8.0;

pub struct MeanShiftGrower<'a> {
    image: &'a Image,
    color_bandwidth: f64,
    spatial_bandwidth: f64,
    spatial_scale: f64,
    max_region_size: usize,
}

impl<'a> MeanShiftGrower<'a> {
    pub fn new(image: &'a Image, color_bandwidth: f64, spatial_bandwidth: f64, max_region_size: usize) -> Self {
        let spatial_scale = image.width().max(image.height()) as f64;
        Self {
            image,
            color_bandwidth: color_bandwidth.max(0.0),
            spatial_bandwidth: spatial_bandwidth.max(MIN_SPATIAL_RADIUS / spatial_scale),
            spatial_scale,
            max_region_size: max_region_size.max(1),
        }
    }

    /// The spatial bandwidth after the minimum-radius floor is applied.
    pub fn effective_spatial_bandwidth(&self) -> f64 {
        self.spatial_bandwidth
    }

    fn color_term(&self, color_distance: f64) -> f64 {
        if self.color_bandwidth > 0.0 {
            color_distance / self.color_bandwidth
        } else if color_distance == 0.0 {
            // Zero bandwidth still admits exact matches.
            0.0
        } else {
            f64::INFINITY
        }
    }

    fn spatial_term(&self, seed: Point, candidate: Point) -> f64 {
        let dx = (candidate.x as f64 - seed.x as f64) / self.spatial_scale;
        let dy = (candidate.y as f64 - seed.y as f64) / self.spatial_scale;
        (dx * dx + dy * dy).sqrt() / self.spatial_bandwidth
    }
}

impl RegionFinder for MeanShiftGrower<'_> {
    fn find_region(&mut self, seed: Point, claimed: &ClaimedMask) -> Result<Vec<Point>, FinderError> {
        check_seed(self.image, claimed, seed)?;

        let mut mean: [f64; RGB_CHANNELS] = self.image.color_at(seed).normalized();
        let mut accepted = 1.0f64;
        let mut members: HashSet<Point> = HashSet::from([seed]);
        let mut region = vec![seed];
        let mut queue = VecDeque::from([seed]);

        'grow: while let Some(current) = queue.pop_front() {
            for neighbor in self.image.neighbors(current, Connectivity::Eight) {
                if region.len() >= self.max_region_size {
                    break 'grow;
                }
                if members.contains(&neighbor) || claimed.is_claimed(neighbor) {
                    continue;
                }

                let color = self.image.color_at(neighbor).normalized();
                let score = self.color_term(distance(color, mean, false)) + self.spatial_term(seed, neighbor);
                if score >= 1.0 {
                    continue;
                }

                members.insert(neighbor);
                region.push(neighbor);
                queue.push_back(neighbor);

                for (channel, value) in mean.iter_mut().zip(color) {
                    *channel = (*channel * accepted + value) / (accepted + 1.0);
                }
                accepted += 1.0;
            }
        }

        Ok(region)
    }

    fn kind(&self) -> FinderKind {
        FinderKind::MeanShift
    }

    fn max_region_size(&self) -> usize {
        self.max_region_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color::color::Color;

    fn gray_row(values: &[u8]) -> Image {
        let pixels = values.iter().map(|&v| Color::new(v, v, v)).collect();
        Image::new(values.len(), 1, pixels).expect("valid grid")
    }

    #[test]
    fn spatial_floor_applies_to_small_images() {
        let image = Image::new(4, 4, vec![Color::default(); 16]).expect("valid grid");
        let grower = MeanShiftGrower::new(&image, 0.1, DEFAULT_SPATIAL_BANDWIDTH, 100);
        assert_eq!(grower.effective_spatial_bandwidth(), 2.0);

        let large = Image::new(400, 1, vec![Color::default(); 400]).expect("valid grid");
        let grower = MeanShiftGrower::new(&large, 0.1, DEFAULT_SPATIAL_BANDWIDTH, 100);
        assert_eq!(grower.effective_spatial_bandwidth(), DEFAULT_SPATIAL_BANDWIDTH);
    }

    #[test]
    fn spatial_term_limits_reach_on_large_images() {
        // 400 px wide, bandwidth 0.05 => 20 px reach from the seed.
        let image = Image::new(400, 1, vec![Color::new(7, 7, 7); 400]).expect("valid grid");
        let mask = ClaimedMask::for_image(&image);
        let mut grower = MeanShiftGrower::new(&image, 0.1, DEFAULT_SPATIAL_BANDWIDTH, 1_000);

        let region = grower.find_region(Point::new(0, 0), &mask).expect("valid seed");
        assert_eq!(region.len(), 20);
        assert_eq!(region.last(), Some(&Point::new(19, 0)));
    }

    #[test]
    fn running_mean_lets_region_follow_a_gradient() {
        // Each pixel is 4 levels brighter than the last. The last pixel is 28 levels
        // from the seed, outside the colour bandwidth, but only 16 from the mean.
        let values: Vec<u8> = (0..8).map(|i| 100 + 4 * i).collect();
        let image = gray_row(&values);
        let mask = ClaimedMask::for_image(&image);
        let mut grower = MeanShiftGrower::new(&image, 0.13, 10.0, 100);

        let region = grower.find_region(Point::new(0, 0), &mask).expect("valid seed");
        assert_eq!(region.len(), 8);
    }

    #[test]
    fn zero_colour_bandwidth_admits_only_exact_matches() {
        let image = gray_row(&[50, 50, 51, 50]);
        let mask = ClaimedMask::for_image(&image);
        let mut grower = MeanShiftGrower::new(&image, 0.0, 1.0, 100);

        let region = grower.find_region(Point::new(0, 0), &mask).expect("valid seed");
        assert_eq!(region, vec![Point::new(0, 0), Point::new(1, 0)]);
    }

    #[test]
    fn respects_cap_and_claims() {
        let image = Image::new(5, 5, vec![Color::new(1, 2, 3); 25]).expect("valid grid");
        let mut mask = ClaimedMask::for_image(&image);
        mask.claim(Point::new(1, 0));
        let mut grower = MeanShiftGrower::new(&image, 0.5, 1.0, 4);

        let region = grower.find_region(Point::new(0, 0), &mask).expect("valid seed");
        assert_eq!(region.len(), 4);
        assert!(!region.contains(&Point::new(1, 0)));
    }
}
