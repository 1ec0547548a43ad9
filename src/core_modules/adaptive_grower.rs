// THEORY:
// The `AdaptiveRegionGrower` is a best-first region finder. Instead of expanding in
// rings like `FloodFill`, it always expands the most promising candidate next, and it
// adapts how strict it is to the texture around each pixel.
//
// Algorithm:
// 1.  **Best-First Frontier**: Candidates wait in a priority queue ordered by
//     ascending `1 - similarity`. Equal priorities pop in insertion order, so the
//     traversal is fully deterministic. A candidate may be queued more than once;
//     stale copies are discarded when popped.
// 2.  **Adaptive Threshold**: Around any pixel we sample a radius-3 window and take
//     the mean per-channel variance (normalised to [0, 1]). Flat areas relax the
//     threshold by up to 30% of the remaining headroom; textured areas keep it close
//     to the base so that edges and detail survive:
//         factor    = min(1, variance * 2)
//         threshold = base + (1 - base) * (1 - factor) * 0.3
//     With adaptive mode off, the base threshold is used everywhere.
// 3.  **Dual-Reference Acceptance**: After a pixel is committed, each of its
//     8-connected neighbours is queued if its similarity to either the seed or the
//     committed pixel reaches 80% of the commit threshold. This loose pre-filter
//     keeps the frontier small. Committing, however, always requires similarity to
//     the *seed* to reach the full threshold, evaluated as the stricter of the
//     seed's and the candidate's adaptive thresholds. The region can follow a
//     gradient only as far as the seed colour allows.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::core_modules::color_metric::color_metric::{variance_in_region, Similarity};
use crate::core_modules::image_grid::{ClaimedMask, Connectivity, Image, Point};
use crate::core_modules::region_finder::{check_seed, FinderKind, RegionFinder};
use crate::core_modules::similarity_cache::SimilarityCache;
use crate::error::FinderError;

/// Radius of the window sampled for local variance.
pub const VARIANCE_RADIUS: usize = 3;
/// Fraction of the threshold headroom released on perfectly flat areas.
const FLAT_RELAXATION: f64 = 0.3;
/// Queue pre-filter, as a fraction of the commit threshold.
const QUEUE_FACTOR: f64 = 0.8;

/// A frontier entry. Lower `priority` pops first; ties pop in `sequence` order.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    priority: f64,
    sequence: u64,
    point: Point,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // `BinaryHeap` is a max-heap, so both keys are reversed.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Priority queue with insertion-order tie-breaking.
#[derive(Default)]
struct Frontier {
    heap: BinaryHeap<Candidate>,
    next_sequence: u64,
}

impl Frontier {
    fn push(&mut self, point: Point, similarity: Similarity) {
        self.heap.push(Candidate {
            priority: 1.0 - similarity,
            sequence: self.next_sequence,
            point,
        });
        self.next_sequence += 1;
    }

    fn pop(&mut self) -> Option<Point> {
        self.heap.pop().map(|candidate| candidate.point)
    }
}

pub struct AdaptiveRegionGrower<'a> {
    image: &'a Image,
    base_threshold: f64,
    max_region_size: usize,
    adaptive_mode: bool,
    cache: SimilarityCache,
    /// Lazily computed adaptive threshold per pixel, row-major.
    local_thresholds: Vec<Option<f64>>,
}

impl<'a> AdaptiveRegionGrower<'a> {
    pub fn new(
        image: &'a Image,
        base_threshold: f64,
        max_region_size: usize,
        adaptive_mode: bool,
        cache: SimilarityCache,
    ) -> Self {
        let local_thresholds = if adaptive_mode {
            vec![None; image.pixel_count()]
        } else {
            Vec::new()
        };
        Self {
            image,
            base_threshold,
            max_region_size: max_region_size.max(1),
            adaptive_mode,
            cache,
            local_thresholds,
        }
    }

    /// The threshold to use at `point`: variance-adjusted in adaptive mode,
    /// the base threshold otherwise. Always within [base, 1].
    pub fn adaptive_threshold(&mut self, point: Point) -> f64 {
        if !self.adaptive_mode {
            return self.base_threshold;
        }
        let index = point.y * self.image.width() + point.x;
        if let Some(threshold) = self.local_thresholds[index] {
            return threshold;
        }

        let window = self.image.window(point.x, point.y, VARIANCE_RADIUS);
        let variance = variance_in_region(&window);
        let variance_factor = (variance * 2.0).min(1.0);
        let threshold =
            self.base_threshold + (1.0 - self.base_threshold) * (1.0 - variance_factor) * FLAT_RELAXATION;

        self.local_thresholds[index] = Some(threshold);
        threshold
    }

    pub fn cache(&self) -> &SimilarityCache {
        &self.cache
    }
}

impl RegionFinder for AdaptiveRegionGrower<'_> {
    fn find_region(&mut self, seed: Point, claimed: &ClaimedMask) -> Result<Vec<Point>, FinderError> {
        check_seed(self.image, claimed, seed)?;

        let image = self.image;
        let seed_color = image.color_at(seed);
        let mut members: HashSet<Point> = HashSet::from([seed]);
        let mut region = vec![seed];
        let mut frontier = Frontier::default();

        for neighbor in image.neighbors(seed, Connectivity::Eight) {
            if claimed.is_claimed(neighbor) {
                continue;
            }
            let similarity = self.cache.similarity(seed_color, image.color_at(neighbor));
            frontier.push(neighbor, similarity);
        }

        let seed_threshold = self.adaptive_threshold(seed);

        while region.len() < self.max_region_size {
            let Some(current) = frontier.pop() else {
                break;
            };
            if members.contains(&current) || claimed.is_claimed(current) {
                continue;
            }

            let current_color = image.color_at(current);
            let similarity_to_seed = self.cache.similarity(seed_color, current_color);
            let threshold = if self.adaptive_mode {
                seed_threshold.min(self.adaptive_threshold(current))
            } else {
                self.base_threshold
            };

            if similarity_to_seed < threshold {
                continue;
            }

            members.insert(current);
            region.push(current);

            for neighbor in image.neighbors(current, Connectivity::Eight) {
                if members.contains(&neighbor) || claimed.is_claimed(neighbor) {
                    continue;
                }
                let neighbor_color = image.color_at(neighbor);
                let best = self
                    .cache
                    .similarity(seed_color, neighbor_color)
                    .max(self.cache.similarity(current_color, neighbor_color));
                if best >= threshold * QUEUE_FACTOR {
                    frontier.push(neighbor, best);
                }
            }
        }

        Ok(region)
    }

    fn kind(&self) -> FinderKind {
        FinderKind::Adaptive
    }

    fn max_region_size(&self) -> usize {
        self.max_region_size
    }
}
