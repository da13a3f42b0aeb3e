//! High-level fitting API.
//!
//! - [`FitConfig`]: validated configuration built with a fluent builder
//! - [`Fitter`]: runs the whole pipeline and returns a [`FittedModel`]
//! - [`spawn_fit`]: the same pipeline as a cancellable background task

mod background;
mod config;
mod fitter;

pub use background::{spawn_fit, FitHandle};
pub use config::{ConfigError, FitConfig, PhaseParams};
pub use fitter::{FitError, FitReport, FittedModel, Fitter, MemberReport};
