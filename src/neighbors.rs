//! ═══════════════════════════════════════════════════════════════════════════════
//! NEIGHBORS — k-Nearest-Neighbor Search on a Shadow Manifold
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Small-k queries repeated once per prediction point per library. At the
//! library sizes CCM works with (tens to a few hundred points) a linear scan
//! beats building any index, so `BruteForce` is the default. A spatial index
//! only has to implement `NeighborSearch` to drop in.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::embedding::Manifold;
use crate::error::{CcmError, CcmResult};
use crate::stats::float_cmp;

/// One neighbor of a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Anchor time index of the neighbor
    pub anchor: usize,
    /// Euclidean distance to the query vector
    pub distance: f64,
}

/// Which candidates a query may use
#[derive(Debug, Clone, Copy)]
pub struct NeighborQuery<'a> {
    /// Anchor of the query vector
    pub anchor: usize,
    /// Candidate anchors (the library), ascending
    pub candidates: &'a [usize],
    /// Number of neighbors wanted
    pub k: usize,
    /// Candidates with |u - anchor| <= radius are skipped (0 = only the anchor itself)
    pub exclusion_radius: usize,
}

impl NeighborQuery<'_> {
    /// Is `candidate` admissible for this query?
    #[inline]
    pub fn admits(&self, candidate: usize) -> bool {
        candidate != self.anchor && candidate.abs_diff(self.anchor) > self.exclusion_radius
    }
}

/// k-nearest-neighbor search strategy
pub trait NeighborSearch: Send + Sync {
    /// The `k` nearest admissible candidates, ascending by distance, ties by
    /// ascending anchor. Fails with `InsufficientNeighbors` when fewer than
    /// `k` candidates are admissible.
    fn nearest(&self, manifold: &Manifold, query: &NeighborQuery<'_>) -> CcmResult<Vec<Neighbor>>;
}

/// Linear scan over the candidate list
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForce;

impl NeighborSearch for BruteForce {
    fn nearest(&self, manifold: &Manifold, query: &NeighborQuery<'_>) -> CcmResult<Vec<Neighbor>> {
        let origin = manifold.point(query.anchor).ok_or_else(|| {
            CcmError::InvalidParameter(format!(
                "anchor {} is outside the manifold",
                query.anchor
            ))
        })?;

        let mut scored: Vec<(f64, usize)> = query
            .candidates
            .iter()
            .copied()
            .filter(|&u| query.admits(u) && manifold.contains(u))
            .map(|u| (manifold.distance_sq(origin, u), u))
            .collect();

        if scored.len() < query.k {
            return Err(CcmError::InsufficientNeighbors {
                anchor: query.anchor,
                candidates: scored.len(),
                required: query.k,
            });
        }

        let by_distance = |a: &(f64, usize), b: &(f64, usize)| {
            float_cmp(&a.0, &b.0).then(a.1.cmp(&b.1))
        };
        if query.k < scored.len() {
            scored.select_nth_unstable_by(query.k - 1, by_distance);
            scored.truncate(query.k);
        }
        scored.sort_unstable_by(by_distance);

        Ok(scored
            .into_iter()
            .map(|(d2, anchor)| Neighbor {
                anchor,
                distance: d2.sqrt(),
            })
            .collect())
    }
}
