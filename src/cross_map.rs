//! ═══════════════════════════════════════════════════════════════════════════════
//! CROSS MAP — Simplex Reconstruction of One Series From Another's Manifold
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! For each prediction point t:
//!   1. find the E+1 nearest neighbors of the driver vector v(t) inside the
//!      library (never t itself),
//!   2. weight them by w_i ∝ exp(-d_i / d_1),
//!   3. estimate the TARGET at t as Σ w_i · target[t_i].
//!
//! The neighbors are chosen in the driver's geometry but the values are read
//! from the target series at the neighbors' own time indices. If the target's
//! dynamics are encoded in the driver's attractor, those borrowed values land
//! close to the truth, and they land closer as the library fills in.
//! ═══════════════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};

use crate::embedding::Manifold;
use crate::error::{CcmError, CcmResult};
use crate::library::Library;
use crate::neighbors::{BruteForce, Neighbor, NeighborQuery, NeighborSearch};

/// Reconstructed target value at one anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossMapEstimate {
    /// Anchor time index
    pub anchor: usize,
    /// Cross-mapped estimate of target[anchor]
    pub estimate: f64,
    /// Observed target[anchor]
    pub observed: f64,
}

/// Estimates for one library plus the points that could not be estimated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossMapOutcome {
    /// Successful estimates, in prediction order
    pub estimates: Vec<CrossMapEstimate>,
    /// Anchors excluded for lack of neighbors
    pub excluded: Vec<usize>,
}

/// Simplex-style weights for neighbors sorted by ascending distance.
///
/// `w_i = exp(-d_i / d_1)` when the nearest distance is positive. When the
/// nearest distance is zero, every neighbor at distance zero gets weight 1
/// and the rest 0. Normalized to sum to 1.
pub fn neighbor_weights(neighbors: &[Neighbor]) -> Vec<f64> {
    let Some(nearest) = neighbors.first() else {
        return Vec::new();
    };
    let d1 = nearest.distance;

    let raw: Vec<f64> = if d1 > 0.0 {
        neighbors.iter().map(|n| (-n.distance / d1).exp()).collect()
    } else {
        neighbors
            .iter()
            .map(|n| if n.distance == 0.0 { 1.0 } else { 0.0 })
            .collect()
    };

    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Weighted nearest-neighbor cross mapper
#[derive(Debug, Clone)]
pub struct CrossMapper<S = BruteForce> {
    search: S,
    exclusion_radius: usize,
}

impl Default for CrossMapper<BruteForce> {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossMapper<BruteForce> {
    pub fn new() -> Self {
        Self {
            search: BruteForce,
            exclusion_radius: 0,
        }
    }
}

impl<S: NeighborSearch> CrossMapper<S> {
    /// Use a different neighbor search strategy
    pub fn with_search<T: NeighborSearch>(self, search: T) -> CrossMapper<T> {
        CrossMapper {
            search,
            exclusion_radius: self.exclusion_radius,
        }
    }

    /// Skip neighbors within `radius` time steps of the prediction point
    pub fn with_exclusion_radius(mut self, radius: usize) -> Self {
        self.exclusion_radius = radius;
        self
    }

    pub fn exclusion_radius(&self) -> usize {
        self.exclusion_radius
    }

    /// Estimate the target at every anchor of `library`, using only the other
    /// library points as neighbors.
    pub fn cross_map(
        &self,
        driver: &Manifold,
        target: &[f64],
        library: &Library,
        dim: usize,
    ) -> CcmResult<CrossMapOutcome> {
        self.cross_map_at(driver, target, library, dim, library.indices().iter().copied())
    }

    /// Estimate the target at arbitrary prediction anchors, drawing
    /// neighbors from `library` only.
    pub fn cross_map_at<I>(
        &self,
        driver: &Manifold,
        target: &[f64],
        library: &Library,
        dim: usize,
        predictions: I,
    ) -> CcmResult<CrossMapOutcome>
    where
        I: IntoIterator<Item = usize>,
    {
        if dim != driver.dim() {
            return Err(CcmError::InvalidParameter(format!(
                "embedding dimension {} does not match manifold dimension {}",
                dim,
                driver.dim()
            )));
        }
        if target.len() != driver.series_len() {
            return Err(CcmError::LengthMismatch {
                x_len: driver.series_len(),
                y_len: target.len(),
            });
        }
        if let Some(&bad) = library.indices().iter().find(|&&a| !driver.contains(a)) {
            return Err(CcmError::InvalidParameter(format!(
                "library anchor {} is outside the manifold",
                bad
            )));
        }

        let k = dim + 1;
        let mut outcome = CrossMapOutcome::default();

        for anchor in predictions {
            let query = NeighborQuery {
                anchor,
                candidates: library.indices(),
                k,
                exclusion_radius: self.exclusion_radius,
            };

            let neighbors = match self.search.nearest(driver, &query) {
                Ok(neighbors) => neighbors,
                Err(CcmError::InsufficientNeighbors { .. }) => {
                    outcome.excluded.push(anchor);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let estimate = neighbor_weights(&neighbors)
                .iter()
                .zip(&neighbors)
                .map(|(w, n)| w * target[n.anchor])
                .sum();

            outcome.estimates.push(CrossMapEstimate {
                anchor,
                estimate,
                observed: target[anchor],
            });
        }

        Ok(outcome)
    }
}
