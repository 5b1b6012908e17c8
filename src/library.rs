//! ═══════════════════════════════════════════════════════════════════════════════
//! LIBRARY — Random Neighbor Pools
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! A library is a random subset of manifold anchors. Cross-map skill is
//! measured as a function of library size: that growth curve is the whole
//! point of CCM.
//!
//! The random source is always passed in. Nothing here reads a global RNG.
//! ═══════════════════════════════════════════════════════════════════════════════

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CcmError, CcmResult};

/// A set of anchor indices, sorted ascending, no duplicates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    indices: Vec<usize>,
}

impl Library {
    /// Build from arbitrary anchors (sorted and deduplicated)
    pub fn new(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    /// The whole index domain as a single library
    pub fn full(valid_indices: &[usize]) -> Self {
        Self::new(valid_indices.to_vec())
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, anchor: usize) -> bool {
        self.indices.binary_search(&anchor).is_ok()
    }
}

/// Draw `count` independent libraries of `library_size` anchors each,
/// uniformly without replacement from `valid_indices`.
pub fn sample_libraries<R: Rng + ?Sized>(
    valid_indices: &[usize],
    library_size: usize,
    count: usize,
    rng: &mut R,
) -> CcmResult<Vec<Library>> {
    if library_size == 0 || library_size > valid_indices.len() {
        return Err(CcmError::InvalidLibrarySize {
            size: library_size,
            available: valid_indices.len(),
        });
    }
    if count == 0 {
        return Err(CcmError::InvalidParameter(
            "library count must be at least 1".to_string(),
        ));
    }

    (0..count)
        .map(|_| sample_library(valid_indices, library_size, rng))
        .collect()
}

/// Draw a single library; the building block of `sample_libraries`
pub fn sample_library<R: Rng + ?Sized>(
    valid_indices: &[usize],
    library_size: usize,
    rng: &mut R,
) -> CcmResult<Library> {
    if library_size == 0 || library_size > valid_indices.len() {
        return Err(CcmError::InvalidLibrarySize {
            size: library_size,
            available: valid_indices.len(),
        });
    }
    let picks = index::sample(rng, valid_indices.len(), library_size);
    Ok(Library::new(
        picks.into_iter().map(|i| valid_indices[i]).collect(),
    ))
}

/// Default library-size ladder: `steps` sizes spread evenly from `min` to
/// `max` inclusive, rounded, deduplicated, ascending.
///
/// Empty when `max < min` or `max == 0`.
pub fn default_ladder(min: usize, max: usize, steps: usize) -> Vec<usize> {
    let min = min.max(1);
    if max < min {
        return Vec::new();
    }
    if steps <= 1 || max == min {
        return vec![max];
    }

    let span = (max - min) as f64;
    let mut sizes: Vec<usize> = (0..steps)
        .map(|i| min + (span * i as f64 / (steps - 1) as f64).round() as usize)
        .collect();
    sizes.dedup();
    sizes
}
