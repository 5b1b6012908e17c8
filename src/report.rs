//! ═══════════════════════════════════════════════════════════════════════════════
//! REPORT — Structured Results of a CCM Sweep
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Naming follows the usual CCM reading: "X causes Y" is supported when X can
//! be recovered from Y's shadow manifold, because a driven system carries
//! the driver's signature in its own dynamics. Every directional result also
//! states which series supplied the manifold and which was estimated.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::convergence::ConvergenceSeries;

/// One of the two input series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    X,
    Y,
}

impl Variable {
    pub fn other(self) -> Self {
        match self {
            Variable::X => Variable::Y,
            Variable::Y => Variable::X,
        }
    }

    pub(crate) fn tag(self) -> u64 {
        match self {
            Variable::X => 0,
            Variable::Y => 1,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::X => write!(f, "X"),
            Variable::Y => write!(f, "Y"),
        }
    }
}

/// A requested library size that was not run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSize {
    pub library_size: usize,
    pub reason: String,
}

/// Result for one causal direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalResult {
    /// Series whose shadow manifold supplied the neighbors
    pub manifold: Variable,
    /// Series that was estimated
    pub target: Variable,
    /// Averaged skill per library size, ascending
    pub results: ConvergenceSeries,
    /// Verdict of the convergence policy
    pub convergent: bool,
    /// Name of the policy that produced the verdict
    pub policy: String,
    /// Requested sizes that were invalid for this manifold
    pub skipped: Vec<SkippedSize>,
}

impl DirectionalResult {
    /// Causal hypothesis this result speaks to, e.g. "X causes Y"
    pub fn label(&self) -> String {
        format!("{} causes {}", self.target, self.manifold)
    }

    /// Correlation at the largest finite library size
    pub fn final_correlation(&self) -> Option<f64> {
        self.results.last_finite().map(|p| p.correlation)
    }

    /// Rise from the smallest to the largest finite library size
    pub fn span(&self) -> Option<f64> {
        self.results.span()
    }
}

impl fmt::Display for DirectionalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} (xmap {} from M_{}): {}",
            self.label(),
            self.target,
            self.manifold,
            if self.convergent { "CONVERGENT" } else { "not convergent" }
        )?;
        writeln!(f, "{:>10} | {:>8} | {:>8} | {:>7}", "L", "rho", "sd", "nan")?;
        for point in &self.results {
            writeln!(
                f,
                "{:>10} | {:>8.4} | {:>8.4} | {:>7}",
                point.library_size, point.correlation, point.std_dev, point.nan_samples
            )?;
        }
        for skipped in &self.skipped {
            writeln!(f, "  skipped L={}: {}", skipped.library_size, skipped.reason)?;
        }
        Ok(())
    }
}

/// What the two verdicts say together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CausalVerdict {
    /// Both directions converge (mutual coupling, or strong forcing / synchrony)
    Bidirectional,
    XDrivesY,
    YDrivesX,
    NoCoupling,
}

impl CausalVerdict {
    pub fn from_flags(x_causes_y: bool, y_causes_x: bool) -> Self {
        match (x_causes_y, y_causes_x) {
            (true, true) => CausalVerdict::Bidirectional,
            (true, false) => CausalVerdict::XDrivesY,
            (false, true) => CausalVerdict::YDrivesX,
            (false, false) => CausalVerdict::NoCoupling,
        }
    }

    pub fn interpretation(&self) -> &'static str {
        match self {
            CausalVerdict::Bidirectional => {
                "Both directions converge: mutual coupling or synchrony"
            }
            CausalVerdict::XDrivesY => "X drives Y",
            CausalVerdict::YDrivesX => "Y drives X",
            CausalVerdict::NoCoupling => "No convergent cross-map skill in either direction",
        }
    }
}

/// Both directions of one session. Field names follow the causal reading;
/// each result's `manifold` and `target` say which series played which role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidirectionalResult {
    pub x_causes_y: DirectionalResult,
    pub y_causes_x: DirectionalResult,
    /// Base seed the libraries were drawn from; rerun with it to reproduce
    pub seed: u64,
}

impl BidirectionalResult {
    pub fn verdict(&self) -> CausalVerdict {
        CausalVerdict::from_flags(self.x_causes_y.convergent, self.y_causes_x.convergent)
    }
}

impl fmt::Display for BidirectionalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.x_causes_y)?;
        writeln!(f, "{}", self.y_causes_x)?;
        writeln!(f, "verdict: {} (seed {})", self.verdict().interpretation(), self.seed)
    }
}
