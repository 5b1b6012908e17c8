//! ═══════════════════════════════════════════════════════════════════════════════
//! CONVERGENCE — Does Cross-Map Skill Grow With the Library?
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Per library size, the correlations of the random libraries are averaged
//! (NaN samples dropped). The resulting curve is handed to a
//! `ConvergencePolicy`, a swappable predicate. The default is a two-sided
//! endpoint check:
//!
//!   last − first > θ   AND   no point falls more than θ below the running max
//!
//! It is a heuristic, not a hypothesis test. With few samples per size it
//! reacts to noise; raise `num_samples` or θ when that matters.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CcmError, CcmResult};
use crate::stats::{linear_fit, SkillAccumulator};

/// NaN <-> null for JSON, which has no NaN literal
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERGENCE SERIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Averaged skill at one library size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    /// Library size L
    pub library_size: usize,
    /// Mean correlation over the finite samples (NaN if none were finite)
    #[serde(with = "nan_as_null")]
    pub correlation: f64,
    /// Sample standard deviation of the per-library correlations
    #[serde(with = "nan_as_null")]
    pub std_dev: f64,
    /// Libraries that produced a finite correlation
    pub samples: u64,
    /// Libraries whose correlation was NaN
    pub nan_samples: u64,
}

impl ConvergencePoint {
    /// Average a batch of per-library correlations
    pub fn from_samples(library_size: usize, samples: &[f64]) -> Self {
        let acc: SkillAccumulator = samples.iter().copied().collect();
        Self {
            library_size,
            correlation: acc.mean(),
            std_dev: acc.std_dev(),
            samples: acc.count(),
            nan_samples: acc.nan_count(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.correlation.is_finite()
    }
}

/// (library size, averaged correlation) pairs, strictly ascending in size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ConvergencePoint>", into = "Vec<ConvergencePoint>")]
pub struct ConvergenceSeries {
    points: Vec<ConvergencePoint>,
}

impl ConvergenceSeries {
    /// Fails unless sizes are strictly ascending
    pub fn new(points: Vec<ConvergencePoint>) -> CcmResult<Self> {
        if let Some(w) = points
            .windows(2)
            .find(|w| w[0].library_size >= w[1].library_size)
        {
            return Err(CcmError::InvalidParameter(format!(
                "library sizes must be strictly ascending, got {} then {}",
                w[0].library_size, w[1].library_size
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ConvergencePoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConvergencePoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn library_sizes(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.library_size).collect()
    }

    pub fn correlations(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.correlation).collect()
    }

    /// Points with a finite averaged correlation
    pub fn finite(&self) -> impl Iterator<Item = &ConvergencePoint> + '_ {
        self.points.iter().filter(|p| p.is_finite())
    }

    /// Correlation at the smallest library size with a finite value
    pub fn first_finite(&self) -> Option<&ConvergencePoint> {
        self.finite().next()
    }

    /// Correlation at the largest library size with a finite value
    pub fn last_finite(&self) -> Option<&ConvergencePoint> {
        self.finite().last()
    }

    /// last_finite − first_finite, None with fewer than two finite points
    pub fn span(&self) -> Option<f64> {
        let first = self.first_finite()?;
        let last = self.last_finite()?;
        if first.library_size == last.library_size {
            return None;
        }
        Some(last.correlation - first.correlation)
    }
}

impl TryFrom<Vec<ConvergencePoint>> for ConvergenceSeries {
    type Error = CcmError;

    fn try_from(points: Vec<ConvergencePoint>) -> CcmResult<Self> {
        Self::new(points)
    }
}

impl From<ConvergenceSeries> for Vec<ConvergencePoint> {
    fn from(series: ConvergenceSeries) -> Self {
        series.points
    }
}

impl<'a> IntoIterator for &'a ConvergenceSeries {
    type Item = &'a ConvergencePoint;
    type IntoIter = std::slice::Iter<'a, ConvergencePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POLICIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Decides whether a convergence curve counts as convergent.
/// NaN points must never be what tips a curve into "convergent".
pub trait ConvergencePolicy: fmt::Debug + Send + Sync {
    /// Short name for reports
    fn name(&self) -> &'static str;

    fn is_convergent(&self, series: &ConvergenceSeries) -> bool;
}

/// Endpoint rise beyond θ, with no drawdown beyond θ from the running max
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonotonicTrend {
    pub threshold: f64,
}

impl MonotonicTrend {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl ConvergencePolicy for MonotonicTrend {
    fn name(&self) -> &'static str {
        "monotonic"
    }

    fn is_convergent(&self, series: &ConvergenceSeries) -> bool {
        let Some(span) = series.span() else {
            return false;
        };
        if span <= self.threshold {
            return false;
        }

        let mut running_max = f64::NEG_INFINITY;
        for point in series.finite() {
            running_max = running_max.max(point.correlation);
            if running_max - point.correlation > self.threshold {
                return false;
            }
        }
        true
    }
}

/// Least-squares rise of correlation over the normalized library-size axis
/// (smallest size → 0, largest → 1) must exceed θ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeTrend {
    pub threshold: f64,
}

impl SlopeTrend {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl ConvergencePolicy for SlopeTrend {
    fn name(&self) -> &'static str {
        "slope"
    }

    fn is_convergent(&self, series: &ConvergenceSeries) -> bool {
        let (Some(first), Some(last)) = (series.first_finite(), series.last_finite()) else {
            return false;
        };
        if first.library_size == last.library_size {
            return false;
        }

        let lo = first.library_size as f64;
        let range = last.library_size as f64 - lo;
        let (x, y): (Vec<f64>, Vec<f64>) = series
            .finite()
            .map(|p| ((p.library_size as f64 - lo) / range, p.correlation))
            .unzip();

        let (slope, _) = linear_fit(&x, &y);
        slope > self.threshold
    }
}

/// Serializable policy selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceCriterion {
    #[default]
    Monotonic,
    Slope,
}

impl ConvergenceCriterion {
    pub fn into_policy(self, threshold: f64) -> Box<dyn ConvergencePolicy> {
        match self {
            ConvergenceCriterion::Monotonic => Box::new(MonotonicTrend::new(threshold)),
            ConvergenceCriterion::Slope => Box::new(SlopeTrend::new(threshold)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Averages per-size samples and applies a policy
#[derive(Debug)]
pub struct ConvergenceEvaluator {
    policy: Box<dyn ConvergencePolicy>,
}

impl ConvergenceEvaluator {
    pub fn new(policy: Box<dyn ConvergencePolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &dyn ConvergencePolicy {
        self.policy.as_ref()
    }

    /// `per_size_scores`: (library size, per-library correlations), ascending
    pub fn evaluate(
        &self,
        per_size_scores: &[(usize, Vec<f64>)],
    ) -> CcmResult<(ConvergenceSeries, bool)> {
        let points = per_size_scores
            .iter()
            .map(|(size, samples)| ConvergencePoint::from_samples(*size, samples))
            .collect();
        let series = ConvergenceSeries::new(points)?;
        let convergent = self.policy.is_convergent(&series);
        Ok((series, convergent))
    }
}

impl Default for ConvergenceEvaluator {
    fn default() -> Self {
        Self::new(Box::new(MonotonicTrend::new(crate::config::DEFAULT_CONVERGENCE_THRESHOLD)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(usize, f64)]) -> ConvergenceSeries {
        ConvergenceSeries::new(
            values
                .iter()
                .map(|&(size, r)| ConvergencePoint::from_samples(size, &[r]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_unsorted_sizes() {
        let p = |s| ConvergencePoint::from_samples(s, &[0.5]);
        assert!(ConvergenceSeries::new(vec![p(10), p(10)]).is_err());
        assert!(ConvergenceSeries::new(vec![p(20), p(10)]).is_err());
        assert!(ConvergenceSeries::new(vec![p(10), p(20)]).is_ok());
    }

    #[test]
    fn test_monotonic_rising() {
        let s = series(&[(10, 0.1), (50, 0.3), (100, 0.5), (200, 0.6)]);
        assert!(MonotonicTrend::new(0.1).is_convergent(&s));
        assert!(!MonotonicTrend::new(0.6).is_convergent(&s));
    }

    #[test]
    fn test_monotonic_flat_is_not_convergent() {
        let s = series(&[(10, 0.40), (50, 0.42), (100, 0.41), (200, 0.45)]);
        assert!(!MonotonicTrend::new(0.1).is_convergent(&s));
    }

    #[test]
    fn test_monotonic_drawdown_breaks_trend() {
        // Rises overall, but dips 0.3 below the running max mid-way
        let s = series(&[(10, 0.1), (50, 0.6), (100, 0.3), (200, 0.7)]);
        assert!(!MonotonicTrend::new(0.1).is_convergent(&s));
        // A dip within θ is tolerated
        let s = series(&[(10, 0.1), (50, 0.6), (100, 0.55), (200, 0.7)]);
        assert!(MonotonicTrend::new(0.1).is_convergent(&s));
    }

    #[test]
    fn test_nan_points_never_assert_convergence() {
        let s = series(&[(10, f64::NAN), (50, f64::NAN)]);
        assert!(!MonotonicTrend::new(0.05).is_convergent(&s));
        assert!(!SlopeTrend::new(0.05).is_convergent(&s));

        // NaN at the end is skipped; the finite curve decides
        let s = series(&[(10, 0.1), (50, 0.5), (100, f64::NAN)]);
        assert!((s.span().unwrap() - 0.4).abs() < 1e-12);
        assert!(MonotonicTrend::new(0.1).is_convergent(&s));

        let s = series(&[(10, 0.2), (50, f64::NAN)]);
        assert_eq!(s.span(), None);
        assert!(!MonotonicTrend::new(0.0).is_convergent(&s));
    }

    #[test]
    fn test_slope_trend() {
        let rising = series(&[(10, 0.1), (50, 0.3), (100, 0.5), (200, 0.7)]);
        assert!(SlopeTrend::new(0.1).is_convergent(&rising));

        let falling = series(&[(10, 0.7), (50, 0.5), (100, 0.3), (200, 0.1)]);
        assert!(!SlopeTrend::new(0.1).is_convergent(&falling));
    }

    #[test]
    fn test_evaluator_averages_and_keeps_nan_sizes() {
        let evaluator = ConvergenceEvaluator::new(Box::new(MonotonicTrend::new(0.1)));
        let scores = vec![
            (10, vec![0.1, 0.3, f64::NAN]),
            (20, vec![f64::NAN, f64::NAN]),
            (40, vec![0.6, 0.8]),
        ];
        let (s, convergent) = evaluator.evaluate(&scores).unwrap();

        assert_eq!(s.library_sizes(), vec![10, 20, 40]);
        assert!((s.points()[0].correlation - 0.2).abs() < 1e-12);
        assert_eq!(s.points()[0].nan_samples, 1);
        assert!(s.points()[1].correlation.is_nan());
        assert_eq!(s.points()[1].samples, 0);
        assert!((s.points()[2].correlation - 0.7).abs() < 1e-12);
        assert!(convergent);
    }

    #[test]
    fn test_series_json_nan_as_null() {
        let s = series(&[(10, f64::NAN), (20, 0.5)]);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"correlation\":null"));

        let back: ConvergenceSeries = serde_json::from_str(&json).unwrap();
        assert!(back.points()[0].correlation.is_nan());
        assert_eq!(back.points()[1].correlation, 0.5);
    }

    #[test]
    fn test_criterion_selects_policy() {
        assert_eq!(ConvergenceCriterion::Monotonic.into_policy(0.1).name(), "monotonic");
        assert_eq!(ConvergenceCriterion::Slope.into_policy(0.1).name(), "slope");
    }
}
