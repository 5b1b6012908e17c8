//! Session API Tests - Public surface, error paths, options

use std::io::Write;

use ccm::config::CcmConfig;
use ccm::synthetic::{coupled_logistic, sine, LogisticParams};
use ccm::{
    create_session, run_bidirectional, run_directional, CausalVerdict, CcmError, CcmOptions,
    ConvergenceCriterion, PredictionSet, Variable,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn forced_pair() -> (Vec<f64>, Vec<f64>) {
    coupled_logistic(300, &LogisticParams::y_drives_x(0.1), 2)
}

/// S1: Malformed input is rejected before any computation
#[test]
fn session_rejects_malformed_input() {
    let (x, y) = forced_pair();

    assert_eq!(
        create_session(&x[..100], &y, CcmOptions::default()).unwrap_err(),
        CcmError::LengthMismatch { x_len: 100, y_len: 300 }
    );

    let err = create_session(&x, &y, CcmOptions::default().with_embedding_dim(1)).unwrap_err();
    assert!(matches!(err, CcmError::InvalidParameter(_)));
    assert!(err.is_fatal());

    let mut bad = x.clone();
    bad[40] = f64::INFINITY;
    assert_eq!(
        create_session(&bad, &y, CcmOptions::default()).unwrap_err(),
        CcmError::NonFiniteValue { series: 'x', index: 40 }
    );
}

/// S2: An invalid size is skipped and reported; the rest of the sweep runs
#[test]
fn session_skips_oversized_library() {
    let (x, y) = forced_pair();
    let options = CcmOptions::default()
        .with_library_sizes(vec![20, 100, 5_000])
        .with_num_samples(5)
        .with_seed(8);
    let session = create_session(&x, &y, options).unwrap();
    let result = run_bidirectional(&session).unwrap();

    assert_eq!(result.y_causes_x.results.library_sizes(), vec![20, 100]);
    assert_eq!(result.y_causes_x.skipped.len(), 1);
    assert_eq!(result.y_causes_x.skipped[0].library_size, 5_000);
    assert!(result.y_causes_x.skipped[0].reason.contains("5000"));
}

/// S3: Unseeded sessions report the seed they drew, and it reproduces the run
#[test]
fn session_reports_drawn_seed() {
    let (x, y) = forced_pair();
    let options = CcmOptions::default()
        .with_library_sizes(vec![20, 150])
        .with_num_samples(4);

    let first = create_session(&x, &y, options.clone()).unwrap();
    let result = run_bidirectional(&first).unwrap();
    assert_eq!(result.seed, first.seed());

    let replay = create_session(&x, &y, options.with_seed(result.seed)).unwrap();
    assert_eq!(run_bidirectional(&replay).unwrap(), result);
}

/// S4: Directional runs name their manifold and target
#[test]
fn session_directional_matches_bidirectional() {
    let (x, y) = forced_pair();
    let options = CcmOptions::default()
        .with_library_sizes(vec![30, 120])
        .with_num_samples(5)
        .with_seed(21);
    let session = create_session(&x, &y, options).unwrap();

    let both = run_bidirectional(&session).unwrap();
    let single = run_directional(&session, Variable::X, Variable::Y).unwrap();
    assert_eq!(single, both.y_causes_x);
    assert_eq!(single.label(), "Y causes X");
}

/// S5: Explicit generator mode is sequential and reproducible
#[test]
fn session_explicit_rng() {
    let (x, y) = forced_pair();
    let options = CcmOptions::default()
        .with_library_sizes(vec![20, 200])
        .with_num_samples(6);
    let session = create_session(&x, &y, options).unwrap();

    let mut a = ChaCha8Rng::seed_from_u64(1);
    let mut b = ChaCha8Rng::seed_from_u64(1);
    let ra = session.run_directional_with_rng(Variable::X, Variable::Y, &mut a).unwrap();
    let rb = session.run_directional_with_rng(Variable::X, Variable::Y, &mut b).unwrap();
    assert_eq!(ra.results, rb.results);
}

/// S6: Leave-one-out prediction and a Theiler window still give finite skill
#[test]
fn session_prediction_set_and_exclusion_radius() {
    let s = sine(300, 29.0, 0.3);
    let options = CcmOptions::default()
        .with_library_sizes(vec![40, 200])
        .with_num_samples(5)
        .with_seed(5)
        .with_prediction_set(PredictionSet::Library)
        .with_exclusion_radius(2);
    let session = create_session(&s, &s, options).unwrap();
    let result = session.run_directional(Variable::X, Variable::X).unwrap();

    for point in &result.results {
        assert!(point.correlation > 0.9, "L={} rho={}", point.library_size, point.correlation);
    }
}

/// S7: The slope criterion is selectable and named in the result
#[test]
fn session_slope_criterion() {
    let (x, y) = forced_pair();
    let options = CcmOptions::default()
        .with_library_sizes(vec![10, 50, 100, 200, 290])
        .with_num_samples(10)
        .with_seed(3)
        .with_criterion(ConvergenceCriterion::Slope);
    let result = ccm::run(&x, &y, options).unwrap();

    assert_eq!(result.y_causes_x.policy, "slope");
    assert!(result.y_causes_x.convergent, "{}", result.y_causes_x);
    assert!(matches!(
        result.verdict(),
        CausalVerdict::YDrivesX | CausalVerdict::Bidirectional
    ));
}

/// S8: Results survive a JSON round trip
#[test]
fn session_result_json_round_trip() {
    let (x, y) = forced_pair();
    let options = CcmOptions::default()
        .with_library_sizes(vec![20, 100])
        .with_num_samples(3)
        .with_seed(4);
    let result = ccm::run(&x, &y, options).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let back: ccm::BidirectionalResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.seed, result.seed);
    assert_eq!(back.y_causes_x.convergent, result.y_causes_x.convergent);
    assert_eq!(back.y_causes_x.results.library_sizes(), vec![20, 100]);
    for (a, b) in back
        .x_causes_y
        .results
        .correlations()
        .iter()
        .zip(result.x_causes_y.results.correlations())
    {
        assert!((a - b).abs() < 1e-12);
    }
}

/// S9: A JSON config file feeds the session options
#[test]
fn session_options_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"analysis": {{
            "embedding_dim": 2, "num_samples": 4, "library_sizes": [15, 60], "random_seed": 12
        }}}}"#
    )
    .unwrap();

    let config = CcmConfig::load(Some(file.path())).unwrap();
    let (x, y) = forced_pair();
    let session = create_session(&x, &y, config.analysis).unwrap();

    assert_eq!(session.options().embedding_dim, 2);
    assert_eq!(session.library_sizes(), &[15, 60]);
    assert_eq!(session.seed(), 12);
    assert_eq!(session.manifold(Variable::X).len(), 299);
}
