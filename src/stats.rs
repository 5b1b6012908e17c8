//! ═══════════════════════════════════════════════════════════════════════════════
//! STATS — Statistical Primitives for Cross-Map Scoring
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Core statistical tools:
//! - Pearson correlation between cross-map estimates and observations
//! - Skill accumulation across random libraries (Welford, NaN-aware)
//! - Least-squares line fit for trend policies
//!
//! Degenerate inputs produce NaN, never a panic or an error: a constant
//! estimate vector is a statistical outcome, not a fault.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::cmp::Ordering;

use crate::cross_map::CrossMapEstimate;

/// Total-ish ordering for floats (NaN compares equal)
pub fn float_cmp(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CORRELATION — Pearson ρ
// ═══════════════════════════════════════════════════════════════════════════════

fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        Some(&first) => values.iter().all(|&v| v == first),
        None => true,
    }
}

/// Pearson correlation coefficient.
///
/// NaN when lengths differ, fewer than two pairs remain, either vector is
/// constant, or any value is non-finite. Clamped to [-1, 1].
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }
    if is_constant(x) || is_constant(y) {
        return f64::NAN;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if !(var_x > 0.0 && var_y > 0.0) {
        return f64::NAN;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        f64::NAN
    }
}

/// Cross-map skill: correlation between estimates and the observed target
/// values at the same anchors. Excluded points never reach this function,
/// so both vectors are already paired.
pub fn score(estimates: &[CrossMapEstimate]) -> f64 {
    let (predicted, observed): (Vec<f64>, Vec<f64>) =
        estimates.iter().map(|e| (e.estimate, e.observed)).unzip();
    pearson(&predicted, &observed)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SKILL ACCUMULATOR — Welford's online mean/variance, NaN-aware
// ═══════════════════════════════════════════════════════════════════════════════

/// Accumulates per-library correlations for one library size.
/// NaN samples are counted but excluded from the moments.
#[derive(Debug, Clone, Default)]
pub struct SkillAccumulator {
    count: u64,
    nan_count: u64,
    mean: f64,
    m2: f64, // Sum of squared deviations
}

impl SkillAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one library's correlation
    pub fn update(&mut self, sample: f64) {
        if !sample.is_finite() {
            self.nan_count += 1;
            return;
        }
        self.count += 1;
        let delta = sample - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = sample - self.mean;
        self.m2 += delta * delta2;
    }

    /// Mean of the finite samples, NaN when there are none
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.mean
        }
    }

    /// Sample standard deviation (Bessel corrected), NaN below two samples
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }

    /// Finite samples seen
    pub fn count(&self) -> u64 {
        self.count
    }

    /// NaN samples seen
    pub fn nan_count(&self) -> u64 {
        self.nan_count
    }
}

impl FromIterator<f64> for SkillAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        for sample in iter {
            acc.update(sample);
        }
        acc
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LINE FIT — Ordinary least squares
// ═══════════════════════════════════════════════════════════════════════════════

/// Least-squares fit y = a + b·x, returns (slope, r_squared).
/// (0, 0) when fewer than two points or x has no spread.
pub fn linear_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    if n < 2 {
        return (0.0, 0.0);
    }

    let nf = n as f64;
    let x_mean = x[..n].iter().sum::<f64>() / nf;
    let y_mean = y[..n].iter().sum::<f64>() / nf;

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    for (&xi, &yi) in x[..n].iter().zip(&y[..n]) {
        ss_xy += (xi - x_mean) * (yi - y_mean);
        ss_xx += (xi - x_mean).powi(2);
        ss_yy += (yi - y_mean).powi(2);
    }

    if ss_xx <= 0.0 {
        return (0.0, 0.0);
    }

    let slope = ss_xy / ss_xx;
    let r_squared = if ss_yy > 0.0 {
        (ss_xy.powi(2) / (ss_xx * ss_yy)).min(1.0)
    } else {
        0.0
    };

    (slope, r_squared)
}
