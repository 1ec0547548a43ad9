// THEORY:
// The `SimilarityCache` memoises `similarity` for colour pairs. Real images repeat the
// same handful of colours across large areas, so the same pairs are compared again
// and again while regions grow.
//
// The cache is an explicit, owned component: one instance per region finder, which
// in turn lives for exactly one compression run. It is never shared across runs and
// never evicted. Keys are the unordered colour pair, stored with the smaller colour
// first, because similarity is symmetric.

use std::collections::HashMap;

use crate::core_modules::color::color::Color;
use crate::core_modules::color_metric::color_metric::{similarity, Similarity};

#[derive(Debug, Default, Clone)]
pub struct SimilarityCache {
    entries: HashMap<(Color, Color), Similarity>,
    hits: u64,
    misses: u64,
}

impl SimilarityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Similarity of `first` and `second`, computed once per unordered pair.
    pub fn similarity(&mut self, first: Color, second: Color) -> Similarity {
        let key = if first <= second { (first, second) } else { (second, first) };
        if let Some(&cached) = self.entries.get(&key) {
            self.hits += 1;
            return cached;
        }
        self.misses += 1;
        let value = similarity(key.0, key.1);
        self.entries.insert(key, value);
        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
