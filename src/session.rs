//! ═══════════════════════════════════════════════════════════════════════════════
//! SESSION — Bidirectional CCM Orchestration
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! A session validates the input pair once, embeds both series once, fixes
//! the library-size ladder and the base seed, and is immutable afterwards.
//! Every run reads it through `&self`.
//!
//! Work unit = (library size, sample index). Each unit draws its own library
//! from a ChaCha8 stream seeded by mixing the base seed with
//! (manifold, target, library size, sample). Units are independent, so they
//! run on the rayon pool; results are collected in unit order, which keeps
//! the averaged curve bit-identical between parallel and sequential runs.
//! ═══════════════════════════════════════════════════════════════════════════════

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::config::{CcmOptions, PredictionSet};
use crate::convergence::ConvergenceEvaluator;
use crate::cross_map::CrossMapper;
use crate::embedding::{embed, required_length, Manifold};
use crate::error::{CcmError, CcmResult};
use crate::library::{default_ladder, sample_library};
use crate::report::{BidirectionalResult, DirectionalResult, SkippedSize, Variable};
use crate::stats;

/// Outcome of one (library size, sample) unit
#[derive(Debug, Clone, Copy)]
struct UnitOutcome {
    correlation: f64,
    excluded: usize,
}

/// A validated, embedded pair of series ready to be cross-mapped
#[derive(Debug)]
pub struct Session {
    x: Vec<f64>,
    y: Vec<f64>,
    manifold_x: Manifold,
    manifold_y: Manifold,
    options: CcmOptions,
    library_sizes: Vec<usize>,
    skipped: Vec<SkippedSize>,
    seed: u64,
    mapper: CrossMapper,
    evaluator: ConvergenceEvaluator,
}

/// Shortest series a session accepts: one manifold point plus E+1 neighbors
pub fn minimum_series_length(dim: usize, tau: usize) -> usize {
    required_length(dim, tau) + dim + 1
}

fn check_finite(series: &[f64], name: char) -> CcmResult<()> {
    match series.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(CcmError::NonFiniteValue {
            series: name,
            index,
        }),
        None => Ok(()),
    }
}

/// SplitMix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of one work unit's sub-stream
fn unit_seed(
    base: u64,
    manifold: Variable,
    target: Variable,
    library_size: usize,
    sample: usize,
) -> u64 {
    let direction = (manifold.tag() << 1) | target.tag();
    let mut h = mix(base);
    h = mix(h ^ direction);
    h = mix(h ^ library_size as u64);
    mix(h ^ sample as u64)
}

impl Session {
    /// Validate inputs and build both manifolds. Fails fast on malformed
    /// input; invalid library sizes are recorded and skipped.
    pub fn new(x: &[f64], y: &[f64], options: CcmOptions) -> CcmResult<Self> {
        options.validate()?;

        if x.len() != y.len() {
            return Err(CcmError::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        check_finite(x, 'x')?;
        check_finite(y, 'y')?;

        let dim = options.embedding_dim;
        let required = minimum_series_length(dim, options.tau);
        if x.len() < required {
            return Err(CcmError::InsufficientData {
                len: x.len(),
                required,
            });
        }

        let manifold_x = embed(x, dim, options.tau)?;
        let manifold_y = embed(y, dim, options.tau)?;
        let available = manifold_x.len();

        let (library_sizes, skipped) = match &options.library_sizes {
            Some(requested) => resolve_sizes(requested, available),
            None => (
                default_ladder(dim + 2, available, options.ladder_steps),
                Vec::new(),
            ),
        };
        for s in &skipped {
            warn!(library_size = s.library_size, reason = %s.reason, "skipping library size");
        }
        if library_sizes.is_empty() {
            return Err(CcmError::EmptySweep);
        }

        let seed = options
            .random_seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        let mapper = CrossMapper::new().with_exclusion_radius(options.exclusion_radius);
        let evaluator =
            ConvergenceEvaluator::new(options.criterion.into_policy(options.convergence_threshold));

        debug!(
            len = x.len(),
            manifold_points = available,
            sizes = ?library_sizes,
            seed,
            "session created"
        );

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            manifold_x,
            manifold_y,
            options,
            library_sizes,
            skipped,
            seed,
            mapper,
            evaluator,
        })
    }

    pub fn options(&self) -> &CcmOptions {
        &self.options
    }

    /// Library sizes that will be run, ascending
    pub fn library_sizes(&self) -> &[usize] {
        &self.library_sizes
    }

    /// Requested sizes that were rejected at creation
    pub fn skipped(&self) -> &[SkippedSize] {
        &self.skipped
    }

    /// Base seed of the sub-streams
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Series length
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn series(&self, which: Variable) -> &[f64] {
        match which {
            Variable::X => &self.x,
            Variable::Y => &self.y,
        }
    }

    pub fn manifold(&self, which: Variable) -> &Manifold {
        match which {
            Variable::X => &self.manifold_x,
            Variable::Y => &self.manifold_y,
        }
    }

    /// Both directions. `x_causes_y` estimates X from Y's manifold,
    /// `y_causes_x` estimates Y from X's manifold.
    pub fn run_bidirectional(&self) -> CcmResult<BidirectionalResult> {
        let x_causes_y = self.run_directional(Variable::Y, Variable::X)?;
        let y_causes_x = self.run_directional(Variable::X, Variable::Y)?;
        Ok(BidirectionalResult {
            x_causes_y,
            y_causes_x,
            seed: self.seed,
        })
    }

    /// Estimate `target` from the shadow manifold of `manifold`, sweeping
    /// every library size with per-unit seeded sub-streams.
    pub fn run_directional(
        &self,
        manifold: Variable,
        target: Variable,
    ) -> CcmResult<DirectionalResult> {
        let span = info_span!("ccm_direction", manifold = %manifold, target = %target);
        let _enter = span.enter();

        let valid = self.manifold(manifold).valid_indices();
        let samples = self.options.num_samples;
        let units: Vec<(usize, usize)> = self
            .library_sizes
            .iter()
            .flat_map(|&size| (0..samples).map(move |sample| (size, sample)))
            .collect();

        let run_unit = |&(size, sample): &(usize, usize)| {
            let seed = unit_seed(self.seed, manifold, target, size, sample);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            self.run_unit(manifold, target, &valid, size, &mut rng)
        };

        let outcomes: Vec<UnitOutcome> = if self.options.parallel {
            units.par_iter().map(run_unit).collect::<CcmResult<_>>()?
        } else {
            units.iter().map(run_unit).collect::<CcmResult<_>>()?
        };

        self.assemble(manifold, target, &outcomes)
    }

    /// Sequential variant drawing every library from one caller-supplied
    /// generator, in ascending size then sample order.
    pub fn run_directional_with_rng<R: Rng + ?Sized>(
        &self,
        manifold: Variable,
        target: Variable,
        rng: &mut R,
    ) -> CcmResult<DirectionalResult> {
        let span = info_span!("ccm_direction", manifold = %manifold, target = %target);
        let _enter = span.enter();

        let valid = self.manifold(manifold).valid_indices();
        let mut outcomes = Vec::with_capacity(self.library_sizes.len() * self.options.num_samples);
        for &size in &self.library_sizes {
            for _ in 0..self.options.num_samples {
                outcomes.push(self.run_unit(manifold, target, &valid, size, rng)?);
            }
        }

        self.assemble(manifold, target, &outcomes)
    }

    /// Draw one library, cross-map, score
    fn run_unit<R: Rng + ?Sized>(
        &self,
        manifold: Variable,
        target: Variable,
        valid: &[usize],
        size: usize,
        rng: &mut R,
    ) -> CcmResult<UnitOutcome> {
        let driver = self.manifold(manifold);
        let target_series = self.series(target);
        let dim = self.options.embedding_dim;
        let library = sample_library(valid, size, rng)?;

        let outcome = match self.options.prediction_set {
            PredictionSet::Library => self.mapper.cross_map(driver, target_series, &library, dim)?,
            PredictionSet::Manifold => {
                self.mapper
                    .cross_map_at(driver, target_series, &library, dim, driver.anchors())?
            }
        };

        Ok(UnitOutcome {
            correlation: stats::score(&outcome.estimates),
            excluded: outcome.excluded.len(),
        })
    }

    /// Group unit outcomes per size (they arrive size-major) and evaluate
    fn assemble(
        &self,
        manifold: Variable,
        target: Variable,
        outcomes: &[UnitOutcome],
    ) -> CcmResult<DirectionalResult> {
        let samples = self.options.num_samples;
        let per_size: Vec<(usize, Vec<f64>)> = self
            .library_sizes
            .iter()
            .zip(outcomes.chunks(samples))
            .map(|(&size, chunk)| {
                let excluded: usize = chunk.iter().map(|u| u.excluded).sum();
                let correlations: Vec<f64> = chunk.iter().map(|u| u.correlation).collect();
                debug!(library_size = size, excluded, "library size done");
                (size, correlations)
            })
            .collect();

        let (results, convergent) = self.evaluator.evaluate(&per_size)?;
        for point in results.iter().filter(|p| !p.is_finite()) {
            warn!(
                library_size = point.library_size,
                "every sample was degenerate; averaged correlation is NaN"
            );
        }

        let result = DirectionalResult {
            manifold,
            target,
            results,
            convergent,
            policy: self.evaluator.policy().name().to_string(),
            skipped: self.skipped.clone(),
        };
        info!(
            direction = %result.label(),
            convergent,
            final_rho = result.final_correlation().unwrap_or(f64::NAN),
            "cross-map sweep finished"
        );
        Ok(result)
    }
}

/// Sort and dedup requested sizes; split into runnable and skipped
fn resolve_sizes(requested: &[usize], available: usize) -> (Vec<usize>, Vec<SkippedSize>) {
    let mut sorted = requested.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut valid = Vec::with_capacity(sorted.len());
    let mut skipped = Vec::new();
    for size in sorted {
        if size == 0 || size > available {
            skipped.push(SkippedSize {
                library_size: size,
                reason: CcmError::InvalidLibrarySize { size, available }.to_string(),
            });
        } else {
            valid.push(size);
        }
    }
    (valid, skipped)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate and embed a pair of series
pub fn create_session(x: &[f64], y: &[f64], options: CcmOptions) -> CcmResult<Session> {
    Session::new(x, y, options)
}

/// Both causal directions of a session
pub fn run_bidirectional(session: &Session) -> CcmResult<BidirectionalResult> {
    session.run_bidirectional()
}

/// One direction: estimate `target` from `driver`'s shadow manifold
pub fn run_directional(
    session: &Session,
    driver: Variable,
    target: Variable,
) -> CcmResult<DirectionalResult> {
    session.run_directional(driver, target)
}

/// Create a session and run both directions
pub fn run(x: &[f64], y: &[f64], options: CcmOptions) -> CcmResult<BidirectionalResult> {
    create_session(x, y, options)?.run_bidirectional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::sine;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.37).sin() + i as f64 * 0.01).collect()
    }

    #[test]
    fn test_length_mismatch_fails_fast() {
        let err = Session::new(&ramp(50), &ramp(49), CcmOptions::default()).unwrap_err();
        assert_eq!(err, CcmError::LengthMismatch { x_len: 50, y_len: 49 });
    }

    #[test]
    fn test_short_series_fails_fast() {
        // E = 3, tau = 1: 3 + 4 = 7 points minimum
        assert_eq!(minimum_series_length(3, 1), 7);
        let err = Session::new(&ramp(6), &ramp(6), CcmOptions::default()).unwrap_err();
        assert_eq!(err, CcmError::InsufficientData { len: 6, required: 7 });
        assert!(Session::new(&ramp(7), &ramp(7), CcmOptions::default()).is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut y = ramp(30);
        y[12] = f64::NAN;
        let err = Session::new(&ramp(30), &y, CcmOptions::default()).unwrap_err();
        assert_eq!(err, CcmError::NonFiniteValue { series: 'y', index: 12 });
    }

    #[test]
    fn test_invalid_sizes_are_skipped_not_fatal() {
        let options = CcmOptions::default().with_library_sizes(vec![50, 0, 10, 500, 10]);
        let session = Session::new(&ramp(100), &ramp(100), options).unwrap();

        assert_eq!(session.library_sizes(), &[10, 50]);
        let skipped: Vec<usize> = session.skipped().iter().map(|s| s.library_size).collect();
        assert_eq!(skipped, vec![0, 500]);
    }

    #[test]
    fn test_all_sizes_invalid_is_empty_sweep() {
        let options = CcmOptions::default().with_library_sizes(vec![1000]);
        let err = Session::new(&ramp(100), &ramp(100), options).unwrap_err();
        assert_eq!(err, CcmError::EmptySweep);
    }

    #[test]
    fn test_default_ladder_spans_manifold() {
        let session = Session::new(&ramp(200), &ramp(200), CcmOptions::default()).unwrap();
        let sizes = session.library_sizes();
        assert_eq!(sizes.first(), Some(&5));
        assert_eq!(sizes.last(), Some(&198));
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unit_seeds_differ() {
        let a = unit_seed(1, Variable::X, Variable::Y, 10, 0);
        assert_ne!(a, unit_seed(1, Variable::X, Variable::Y, 10, 1));
        assert_ne!(a, unit_seed(1, Variable::X, Variable::Y, 20, 0));
        assert_ne!(a, unit_seed(1, Variable::Y, Variable::X, 10, 0));
        assert_ne!(a, unit_seed(2, Variable::X, Variable::Y, 10, 0));
        assert_eq!(a, unit_seed(1, Variable::X, Variable::Y, 10, 0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let x = sine(150, 23.0, 0.0);
        let y = sine(150, 23.0, 1.0);
        let options = CcmOptions::default()
            .with_library_sizes(vec![10, 40, 100])
            .with_num_samples(6)
            .with_seed(17);

        let par = Session::new(&x, &y, options.clone().with_parallel(true))
            .unwrap()
            .run_bidirectional()
            .unwrap();
        let seq = Session::new(&x, &y, options.with_parallel(false))
            .unwrap()
            .run_bidirectional()
            .unwrap();

        assert_eq!(par.x_causes_y.results.correlations(), seq.x_causes_y.results.correlations());
        assert_eq!(par.y_causes_x.results.correlations(), seq.y_causes_x.results.correlations());
    }

    #[test]
    fn test_explicit_rng_is_reproducible() {
        let x = sine(120, 17.0, 0.0);
        let options = CcmOptions::default()
            .with_library_sizes(vec![10, 60])
            .with_num_samples(4);
        let session = Session::new(&x, &x, options).unwrap();

        let a = session
            .run_directional_with_rng(Variable::X, Variable::X, &mut ChaCha8Rng::seed_from_u64(5))
            .unwrap();
        let b = session
            .run_directional_with_rng(Variable::X, Variable::X, &mut ChaCha8Rng::seed_from_u64(5))
            .unwrap();
        assert_eq!(a.results.correlations(), b.results.correlations());
    }

    #[test]
    fn test_directional_labels() {
        let x = sine(80, 13.0, 0.0);
        let y = sine(80, 13.0, 0.5);
        let options = CcmOptions::default()
            .with_library_sizes(vec![20, 70])
            .with_num_samples(3)
            .with_seed(1);
        let result = run(&x, &y, options).unwrap();

        assert_eq!(result.x_causes_y.manifold, Variable::Y);
        assert_eq!(result.x_causes_y.target, Variable::X);
        assert_eq!(result.y_causes_x.manifold, Variable::X);
        assert_eq!(result.y_causes_x.target, Variable::Y);
        assert_eq!(result.x_causes_y.label(), "X causes Y");
        assert_eq!(result.seed, 1);
    }
}
