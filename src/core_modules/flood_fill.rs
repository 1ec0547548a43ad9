// THEORY:
// `FloodFill` is the simplest and cheapest region finder: a breadth-first search that
// starts at the seed and walks its 4-connected neighbours.
//
// Algorithm:
// 1.  **Seed Anchoring**: Every candidate is compared against the seed's colour, never
//     against the pixel it was reached from. A region therefore cannot creep along a
//     slow gradient far away from where it started.
// 2.  **Uniform Threshold**: A neighbour joins iff it is not claimed, not already in
//     the region, and `similarity(seed, neighbour) >= threshold`.
// 3.  **FIFO Expansion**: Accepted neighbours are queued and expanded in the order
//     they were accepted, so the region grows in rings around the seed.
// 4.  **Size Cap**: Growth stops the moment the region reaches `max_region_size`,
//     even in the middle of expanding one pixel's neighbours.

use std::collections::{HashSet, VecDeque};

use crate::core_modules::color::color::Color;
use crate::core_modules::image_grid::{ClaimedMask, Connectivity, Image, Point};
use crate::core_modules::region_finder::{check_seed, FinderKind, RegionFinder};
use crate::core_modules::similarity_cache::SimilarityCache;
use crate::error::FinderError;

pub struct FloodFill<'a> {
    image: &'a Image,
    threshold: f64,
    max_region_size: usize,
    cache: SimilarityCache,
}

impl<'a> FloodFill<'a> {
    pub fn new(image: &'a Image, threshold: f64, max_region_size: usize, cache: SimilarityCache) -> Self {
        Self {
            image,
            threshold,
            max_region_size: max_region_size.max(1),
            cache,
        }
    }

    pub fn cache(&self) -> &SimilarityCache {
        &self.cache
    }

    fn accepts(&mut self, seed_color: Color, candidate: Point) -> bool {
        let candidate_color = self.image.color_at(candidate);
        self.cache.similarity(seed_color, candidate_color) >= self.threshold
    }
}

impl RegionFinder for FloodFill<'_> {
    fn find_region(&mut self, seed: Point, claimed: &ClaimedMask) -> Result<Vec<Point>, FinderError> {
        check_seed(self.image, claimed, seed)?;

        let image = self.image;
        let seed_color = image.color_at(seed);
        let mut members: HashSet<Point> = HashSet::from([seed]);
        let mut region = vec![seed];
        let mut queue = VecDeque::from([seed]);

        'grow: while let Some(current) = queue.pop_front() {
            for neighbor in image.neighbors(current, Connectivity::Four) {
                if region.len() >= self.max_region_size {
                    break 'grow;
                }
                if members.contains(&neighbor) || claimed.is_claimed(neighbor) {
                    continue;
                }
                if self.accepts(seed_color, neighbor) {
                    members.insert(neighbor);
                    region.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(region)
    }

    fn kind(&self) -> FinderKind {
        FinderKind::FloodFill
    }

    fn max_region_size(&self) -> usize {
        self.max_region_size
    }
}
