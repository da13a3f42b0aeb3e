//! Training progress logging.
//!
//! Messages are emitted as `tracing` events with structured fields, gated by
//! a [`Verbosity`] level so that library users who install a subscriber but
//! do not want per-iteration output can keep training quiet.

use super::Phase;

/// How much training output to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Only warnings (e.g. a tree that did not converge).
    Warning,
    /// Phase boundaries and per-iteration summaries.
    Info,
    /// Per-epoch and per-split details.
    Debug,
}

/// Structured logger carried by a training context.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    label: String,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            label: String::from("main"),
        }
    }

    /// Same verbosity, different tree label (e.g. `"member 2"`).
    pub fn labelled(&self, label: impl Into<String>) -> Self {
        Self {
            verbosity: self.verbosity,
            label: label.into(),
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::Silent && self.verbosity >= level
    }

    pub fn start_phase(&self, phase: Phase) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(tree = %self.label, %phase, "phase started");
        }
    }

    pub fn finish_phase(&self, phase: Phase, rmse: f64) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(tree = %self.label, %phase, rmse, "phase finished");
        }
    }

    pub fn log_iteration(&self, iteration: usize, rmse: f64, leaves: usize, splits: usize) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(tree = %self.label, iteration, rmse, leaves, splits, "growth iteration");
        }
    }

    pub fn log_epoch(&self, epoch: usize, rmse: f64, max_change: f64) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(tree = %self.label, epoch, rmse, max_change, "epoch");
        }
    }

    pub fn log_split(&self, leaf: u32, mse: f64, threshold: f64, op: &'static str) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!(tree = %self.label, leaf, mse, threshold, op, "split");
        }
    }

    pub fn log_noise(&self, mean_variance: f64, samples: usize) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(mean_variance, samples, "noise variance estimated");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled(Verbosity::Warning) {
            tracing::warn!(tree = %self.label, "{message}");
        }
    }
}
