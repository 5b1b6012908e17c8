//! ═══════════════════════════════════════════════════════════════════════════════
//! CCM — Convergent Cross Mapping
//! ═══════════════════════════════════════════════════════════════════════════════
//! Causal inference between two time series from their reconstructed state
//! spaces. If X forces Y, Y's shadow manifold carries X's signature, and
//! estimates of X made from it improve as the library grows.
//! ═══════════════════════════════════════════════════════════════════════════════

// Clippy configuration - intentional style choices for scientific code
#![allow(clippy::too_many_arguments)] // Scientific functions often need many parameters
#![allow(clippy::needless_range_loop)] // Indexed loops clearer for matrix math
#![allow(clippy::doc_lazy_continuation)]

// ═══════════════════════════════════════════════════════════════════════════════
// FOUNDATION — errors, statistics, settings
// ═══════════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;
pub mod logging;
pub mod stats;

pub use error::{CcmError, CcmResult};

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE — embed, sample, search, estimate, evaluate
// ═══════════════════════════════════════════════════════════════════════════════

pub mod convergence;
pub mod cross_map;
pub mod embedding;
pub mod library;
pub mod neighbors;

// ═══════════════════════════════════════════════════════════════════════════════
// ORCHESTRATION — sessions and results
// ═══════════════════════════════════════════════════════════════════════════════

pub mod report;
pub mod session;

pub use config::{CcmConfig, CcmOptions, PredictionSet};
pub use convergence::{
    ConvergenceCriterion, ConvergencePoint, ConvergencePolicy, ConvergenceSeries, MonotonicTrend,
    SlopeTrend,
};
pub use report::{BidirectionalResult, CausalVerdict, DirectionalResult, SkippedSize, Variable};
pub use session::{create_session, run, run_bidirectional, run_directional, Session};

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTHETIC — Reference Systems for Demos and Tests
// ═══════════════════════════════════════════════════════════════════════════════

pub mod synthetic;
