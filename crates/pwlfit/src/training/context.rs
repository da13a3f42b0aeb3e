//! Per-tree training context.
//!
//! Everything a training call needs besides the tree and its data travels in
//! a [`TrainingContext`]: the random stream, the logger, the progress sender
//! and the cancellation token. Each concurrently trained tree owns its own
//! context, so no training state is shared between threads.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::logger::TrainingLogger;

/// Random generator used throughout training.
pub type TrainRng = Xoshiro256PlusPlus;

/// Stage of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    LinearRegression,
    NoiseEstimation,
    Approximation,
    Average,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::LinearRegression => "linear regression",
            Phase::NoiseEstimation => "noise estimation",
            Phase::Approximation => "approximation",
            Phase::Average => "average tree",
        };
        f.write_str(name)
    }
}

/// Progress event sent while fitting.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStarted { phase: Phase },
    Iteration {
        phase: Phase,
        member: Option<usize>,
        iteration: usize,
        rmse: f64,
        leaves: usize,
    },
    MemberFinished { member: usize, rmse: f64, leaves: usize },
    PhaseFinished { phase: Phase },
}

/// Cooperative cancellation flag, shared between a fit and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// State owned by one training call.
#[derive(Debug)]
pub struct TrainingContext {
    pub rng: TrainRng,
    pub logger: TrainingLogger,
    seed: u64,
    phase: Phase,
    member: Option<usize>,
    progress: Option<Sender<Progress>>,
    cancel: CancelToken,
}

impl TrainingContext {
    pub fn new(seed: u64, logger: TrainingLogger) -> Self {
        Self {
            rng: TrainRng::seed_from_u64(seed),
            logger,
            seed,
            phase: Phase::LinearRegression,
            member: None,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Sender<Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// A child context with an independent random stream.
    ///
    /// The stream is seeded from this context's seed and `stream`, so the same
    /// base seed always reproduces the same children regardless of the order in
    /// which they run.
    pub fn fork(&self, stream: u64, label: impl Into<String>) -> Self {
        let seed = self
            .seed
            .wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Self {
            rng: TrainRng::seed_from_u64(seed),
            logger: self.logger.labelled(label),
            seed,
            phase: self.phase,
            member: self.member,
            progress: self.progress.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// A forked context for ensemble member `member`.
    pub fn for_member(&self, member: usize) -> Self {
        let mut ctx = self.fork(member as u64, format!("member {member}"));
        ctx.member = Some(member);
        ctx
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    #[inline]
    pub fn member(&self) -> Option<usize> {
        self.member
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[inline]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Send a progress event. A disconnected receiver is ignored.
    pub fn report(&self, event: Progress) {
        if let Some(progress) = &self.progress {
            let _ = progress.send(event);
        }
    }
}
