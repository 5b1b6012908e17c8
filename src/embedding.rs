//! ═══════════════════════════════════════════════════════════════════════════════
//! EMBEDDING — Time-Delay Shadow Manifolds
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Reconstructs a shadow manifold from a scalar series:
//!
//!   v(t) = (s[t], s[t-τ], s[t-2τ], …, s[t-(E-1)τ])     for t ≥ (E-1)·τ
//!
//! By Takens' theorem the cloud of v(t) is diffeomorphic to the attractor of
//! the system that produced s, which is what makes cross mapping possible.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::error::{CcmError, CcmResult};

/// One delay vector, tagged with the time index it is anchored at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingVector<'a> {
    /// Anchor time index t
    pub anchor: usize,
    /// Coordinates (s[t], s[t-τ], …), length E
    pub coords: &'a [f64],
}

/// All valid delay vectors of one series. Read-only after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    /// Embedding dimension E
    dim: usize,
    /// Lag τ
    tau: usize,
    /// Length of the source series
    series_len: usize,
    /// Flattened coordinates, stride `dim`, one row per valid anchor
    coords: Vec<f64>,
}

/// Shortest series that yields at least one delay vector
pub fn required_length(dim: usize, tau: usize) -> usize {
    (dim.saturating_sub(1)) * tau + 1
}

/// Build the shadow manifold of `series` for dimension `dim` and lag `tau`
pub fn embed(series: &[f64], dim: usize, tau: usize) -> CcmResult<Manifold> {
    if dim < 2 {
        return Err(CcmError::InvalidParameter(format!(
            "embedding dimension must be at least 2, got {}",
            dim
        )));
    }
    if tau < 1 {
        return Err(CcmError::InvalidParameter(
            "lag tau must be at least 1".to_string(),
        ));
    }

    let required = required_length(dim, tau);
    if series.len() < required {
        return Err(CcmError::InsufficientData {
            len: series.len(),
            required,
        });
    }

    let first = (dim - 1) * tau;
    let mut coords = Vec::with_capacity((series.len() - first) * dim);
    for t in first..series.len() {
        for lag in 0..dim {
            coords.push(series[t - lag * tau]);
        }
    }

    Ok(Manifold {
        dim,
        tau,
        series_len: series.len(),
        coords,
    })
}

impl Manifold {
    /// Embedding dimension E
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Lag τ
    pub fn tau(&self) -> usize {
        self.tau
    }

    /// Length of the series this manifold was built from
    pub fn series_len(&self) -> usize {
        self.series_len
    }

    /// First valid anchor, (E-1)·τ
    pub fn first_anchor(&self) -> usize {
        (self.dim - 1) * self.tau
    }

    /// Number of delay vectors
    pub fn len(&self) -> usize {
        self.coords.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Is `anchor` a valid anchor of this manifold?
    pub fn contains(&self, anchor: usize) -> bool {
        anchor >= self.first_anchor() && anchor < self.series_len
    }

    /// Coordinates of the vector anchored at `anchor`
    pub fn point(&self, anchor: usize) -> Option<&[f64]> {
        if !self.contains(anchor) {
            return None;
        }
        let row = anchor - self.first_anchor();
        Some(&self.coords[row * self.dim..(row + 1) * self.dim])
    }

    /// Valid anchor indices, ascending
    pub fn anchors(&self) -> std::ops::Range<usize> {
        self.first_anchor()..self.series_len
    }

    /// Valid anchor indices as an owned vector (the sampler's index domain)
    pub fn valid_indices(&self) -> Vec<usize> {
        self.anchors().collect()
    }

    /// Iterate delay vectors in anchor order
    pub fn iter(&self) -> impl Iterator<Item = EmbeddingVector<'_>> + '_ {
        let first = self.first_anchor();
        self.coords
            .chunks_exact(self.dim)
            .enumerate()
            .map(move |(row, coords)| EmbeddingVector {
                anchor: first + row,
                coords,
            })
    }

    /// Squared Euclidean distance between two anchored vectors.
    /// Both anchors must be valid.
    pub(crate) fn distance_sq(&self, a: &[f64], anchor: usize) -> f64 {
        let row = anchor - self.first_anchor();
        let b = &self.coords[row * self.dim..(row + 1) * self.dim];
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}
