//! ═══════════════════════════════════════════════════════════════════════════════
//! CONFIG — Analysis Options and Logging Settings
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Precedence (lowest to highest):
//!   1. Programmatic defaults
//!   2. JSON file (optional, `--config`)
//!   3. Environment variables, `CCM_` prefix, `__` for nesting
//!      e.g. `CCM_ANALYSIS__EMBEDDING_DIM=4`, `CCM_LOGGING__LEVEL=debug`
//! ═══════════════════════════════════════════════════════════════════════════════

use std::path::Path;

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::convergence::ConvergenceCriterion;
use crate::error::{CcmError, CcmResult};

pub const DEFAULT_EMBEDDING_DIM: usize = 3;
pub const DEFAULT_TAU: usize = 1;
pub const DEFAULT_NUM_SAMPLES: usize = 25;
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.2;
pub const DEFAULT_LADDER_STEPS: usize = 10;

/// Where cross-map estimates are evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSet {
    /// Every valid manifold point; neighbors still come from the library only
    #[default]
    Manifold,
    /// Only the anchors of the drawn library (leave-one-out inside the library)
    Library,
}

/// Options for one CCM session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcmOptions {
    /// Embedding dimension E (≥ 2)
    pub embedding_dim: usize,

    /// Lag τ (≥ 1)
    pub tau: usize,

    /// Random libraries drawn per library size (≥ 1)
    pub num_samples: usize,

    /// Library sizes to sweep; default ladder when absent
    pub library_sizes: Option<Vec<usize>>,

    /// Threshold θ of the convergence policy
    pub convergence_threshold: f64,

    /// Base seed; drawn from the OS-seeded thread RNG when absent
    pub random_seed: Option<u64>,

    /// Theiler window: neighbors closer than this in time are skipped
    pub exclusion_radius: usize,

    /// Points at which skill is measured
    pub prediction_set: PredictionSet,

    /// Convergence policy
    pub criterion: ConvergenceCriterion,

    /// Number of rungs in the default library-size ladder
    pub ladder_steps: usize,

    /// Run the sweep on the rayon pool
    pub parallel: bool,
}

impl Default for CcmOptions {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            tau: DEFAULT_TAU,
            num_samples: DEFAULT_NUM_SAMPLES,
            library_sizes: None,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            random_seed: None,
            exclusion_radius: 0,
            prediction_set: PredictionSet::default(),
            criterion: ConvergenceCriterion::default(),
            ladder_steps: DEFAULT_LADDER_STEPS,
            parallel: true,
        }
    }
}

impl CcmOptions {
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn with_tau(mut self, tau: usize) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    pub fn with_library_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.library_sizes = Some(sizes);
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_exclusion_radius(mut self, radius: usize) -> Self {
        self.exclusion_radius = radius;
        self
    }

    pub fn with_prediction_set(mut self, set: PredictionSet) -> Self {
        self.prediction_set = set;
        self
    }

    pub fn with_criterion(mut self, criterion: ConvergenceCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Range checks that do not depend on the data
    pub fn validate(&self) -> CcmResult<()> {
        if self.embedding_dim < 2 {
            return Err(CcmError::InvalidParameter(format!(
                "embedding_dim must be at least 2, got {}",
                self.embedding_dim
            )));
        }
        if self.tau < 1 {
            return Err(CcmError::InvalidParameter(
                "tau must be at least 1".to_string(),
            ));
        }
        if self.num_samples < 1 {
            return Err(CcmError::InvalidParameter(
                "num_samples must be at least 1".to_string(),
            ));
        }
        if !(self.convergence_threshold.is_finite() && self.convergence_threshold >= 0.0) {
            return Err(CcmError::InvalidParameter(format!(
                "convergence_threshold must be finite and non-negative, got {}",
                self.convergence_threshold
            )));
        }
        if self.ladder_steps < 1 {
            return Err(CcmError::InvalidParameter(
                "ladder_steps must be at least 1".to_string(),
            ));
        }
        if matches!(&self.library_sizes, Some(sizes) if sizes.is_empty()) {
            return Err(CcmError::InvalidParameter(
                "library_sizes, when given, must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOGGING SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl LogConfig {
    pub fn validate(&self) -> CcmResult<()> {
        if !LOG_LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(CcmError::Config(format!(
                "invalid log level '{}': must be one of {}",
                self.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOP-LEVEL CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcmConfig {
    pub analysis: CcmOptions,
    pub logging: LogConfig,
}

impl CcmConfig {
    /// Defaults, then the optional JSON file, then `CCM_*` environment
    pub fn load(path: Option<&Path>) -> CcmResult<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(CcmConfig::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(CcmError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Json::file(path));
        }
        let config: CcmConfig = figment
            .merge(Env::prefixed("CCM_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CcmResult<()> {
        self.analysis.validate()?;
        self.logging.validate()
    }
}
