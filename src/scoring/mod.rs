//! Health scoring
//!
//! Each metric maps to an independent 0-100 sub-score; the total is their
//! weighted sum.
//!
//! # Penalties
//!
//! ```text
//! complexity  per function over threshold T: min((c - T) / T × 20, 20)
//! deps        per stale/outdated dependency:  min(days / max_days × 15, 15)
//! boundaries  10 per violation
//! dead code   5 per unreferenced function
//! coverage    always 100 until a coverage source exists
//! ```
//!
//! Sub-scores are clamped to [0, 100] and the total is rounded to one
//! decimal. A [`Scorer`] remembers its last total so consecutive calls
//! report a delta; give each session its own scorer.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ProjectConfig, Thresholds, Weights};
use crate::deps::DEFAULT_MAX_STALE_DAYS;
use crate::models::AnalysisResults;

/// Threshold used when `max_complexity` is configured as 0.
pub const DEFAULT_MAX_COMPLEXITY: u32 = 15;

const MAX_FUNCTION_PENALTY: f64 = 20.0;
const MAX_DEPENDENCY_PENALTY: f64 = 15.0;
const VIOLATION_PENALTY: f64 = 10.0;
const DEAD_FUNCTION_PENALTY: f64 = 5.0;

/// Sub-scores, weighted total and change since the previous call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub total: f64,
    pub complexity: f64,
    pub deps: f64,
    pub boundaries: f64,
    pub dead_code: f64,
    pub coverage: f64,
    /// `total` minus the previous total, 0 on the first call
    pub delta: f64,
}

/// Score aggregator with the previous total as its only state.
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: Weights,
    thresholds: Thresholds,
    previous: Option<f64>,
}

impl Scorer {
    pub fn new(weights: Weights, thresholds: Thresholds) -> Self {
        Self {
            weights,
            thresholds,
            previous: None,
        }
    }

    pub fn from_config(config: &ProjectConfig) -> Self {
        Self::new(config.weights, config.thresholds)
    }

    /// Last total computed by this scorer.
    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    /// Score `results` and remember the total for the next delta.
    pub fn calculate(&mut self, results: &AnalysisResults) -> HealthScore {
        let complexity = complexity_score(results, self.thresholds.max_complexity);
        let deps = deps_score(results, self.thresholds.max_stale_days);
        let boundaries = clamp(100.0 - results.violations.len() as f64 * VIOLATION_PENALTY);
        let dead_code = clamp(100.0 - results.dead_code.len() as f64 * DEAD_FUNCTION_PENALTY);
        let coverage = 100.0;

        let total = weighted_total(&self.weights, complexity, deps, boundaries, dead_code, coverage);
        let delta = self.previous.map(|prev| total - prev).unwrap_or(0.0);
        self.previous = Some(total);

        debug!(
            "Score {:.1} (complexity={:.1}, deps={:.1}, boundaries={:.1}, dead_code={:.1}, delta={:+.1})",
            total, complexity, deps, boundaries, dead_code, delta
        );

        HealthScore {
            total,
            complexity,
            deps,
            boundaries,
            dead_code,
            coverage,
            delta,
        }
    }
}

/// Weighted sum of sub-scores, rounded to one decimal (half away from zero).
pub fn weighted_total(
    weights: &Weights,
    complexity: f64,
    deps: f64,
    boundaries: f64,
    dead_code: f64,
    coverage: f64,
) -> f64 {
    let raw = complexity * weights.complexity
        + deps * weights.deps
        + boundaries * weights.boundaries
        + dead_code * weights.dead_code
        + coverage * weights.coverage;
    (raw * 10.0).round() / 10.0
}

fn complexity_score(results: &AnalysisResults, max_complexity: u32) -> f64 {
    let threshold = if max_complexity == 0 {
        DEFAULT_MAX_COMPLEXITY
    } else {
        max_complexity
    } as f64;

    let penalty: f64 = results
        .complexity
        .iter()
        .filter(|f| f.complexity as f64 > threshold)
        .map(|f| ((f.complexity as f64 - threshold) / threshold * MAX_FUNCTION_PENALTY).min(MAX_FUNCTION_PENALTY))
        .sum();
    clamp(100.0 - penalty)
}

fn deps_score(results: &AnalysisResults, max_stale_days: i64) -> f64 {
    let max_days = if max_stale_days <= 0 {
        DEFAULT_MAX_STALE_DAYS
    } else {
        max_stale_days
    } as f64;

    let penalty: f64 = results
        .dependencies
        .iter()
        .filter(|d| d.status.is_behind())
        .map(|d| (d.stale_days as f64 / max_days * MAX_DEPENDENCY_PENALTY).min(MAX_DEPENDENCY_PENALTY))
        .sum();
    clamp(100.0 - penalty)
}

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}
