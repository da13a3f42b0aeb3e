//! Fitting as a background task.
//!
//! [`spawn_fit`] runs [`Fitter::fit_with`] on the rayon pool and hands back a
//! [`FitHandle`] with the progress stream, the completion channel and the
//! cancellation token.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use super::fitter::{FitError, FittedModel, Fitter};
use crate::data::Dataset;
use crate::training::{CancelToken, Progress};

/// Handle to a running background fit.
#[derive(Debug)]
pub struct FitHandle {
    progress: Receiver<Progress>,
    result: Receiver<Result<FittedModel, FitError>>,
    cancel: CancelToken,
}

/// Start fitting `dataset` on the rayon pool.
///
/// The progress stream ends when the fit finishes, so iterating
/// [`FitHandle::progress`] to the end and then calling [`FitHandle::wait`]
/// never blocks on an unfinished fit.
pub fn spawn_fit(fitter: Fitter, dataset: Dataset) -> FitHandle {
    let (progress_tx, progress_rx) = mpsc::channel();
    let (result_tx, result_rx) = mpsc::sync_channel(1);
    let cancel = CancelToken::new();
    let token = cancel.clone();

    rayon::spawn(move || {
        let result = fitter.fit_with(&dataset, Some(progress_tx), token);
        if result_tx.send(result).is_err() {
            tracing::debug!("background fit finished after its handle was dropped");
        }
    });

    FitHandle {
        progress: progress_rx,
        result: result_rx,
        cancel,
    }
}

impl FitHandle {
    /// Progress events, in the order they were produced.
    #[inline]
    pub fn progress(&self) -> &Receiver<Progress> {
        &self.progress
    }

    /// Ask the fit to stop at the next growth iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[inline]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// The result, if the fit has finished.
    ///
    /// Returns the result at most once; afterwards the task is gone and this
    /// reports [`FitError::WorkerLost`].
    pub fn try_result(&self) -> Option<Result<FittedModel, FitError>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(FitError::WorkerLost)),
        }
    }

    /// Block until the fit finishes.
    pub fn wait(self) -> Result<FittedModel, FitError> {
        self.result.recv().unwrap_or(Err(FitError::WorkerLost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Partition, PartitionRole};
    use crate::model::{FitConfig, PhaseParams};
    use crate::training::Phase;

    fn dataset() -> Dataset {
        let rows: Vec<[f64; 2]> = (0..40)
            .map(|i| {
                let x = i as f64 / 39.0;
                [x, (x - 0.5).abs()]
            })
            .collect();
        Dataset::new(Partition::from_rows(&rows, PartitionRole::Train).unwrap())
    }

    fn fitter() -> Fitter {
        let config = FitConfig::builder()
            .n_trees(1)
            .n_threads(1)
            .train_average(false)
            .linear(PhaseParams {
                max_iterations: 5,
                ..PhaseParams::linear()
            })
            .overtrain(PhaseParams {
                max_iterations: 4,
                ..PhaseParams::overtrain()
            })
            .approximation(PhaseParams {
                max_iterations: 4,
                ..PhaseParams::approximation()
            })
            .build()
            .unwrap();
        Fitter::new(config)
    }

    #[test]
    fn reports_progress_and_completes() {
        let handle = spawn_fit(fitter(), dataset());
        let events: Vec<Progress> = handle.progress().iter().collect();
        let model = handle.wait().unwrap();

        assert_eq!(events.first(), Some(&Progress::PhaseStarted { phase: Phase::LinearRegression }));
        assert_eq!(events.last(), Some(&Progress::PhaseFinished { phase: Phase::Approximation }));
        assert!(events
            .iter()
            .any(|e| matches!(e, Progress::MemberFinished { member: 0, .. })));
        assert_eq!(model.ensemble().len(), 1);
    }

    #[test]
    fn cancelled_before_start() {
        let handle = spawn_fit(fitter(), dataset());
        handle.cancel();
        // Either the fit saw the token or it was already past every check.
        match handle.wait() {
            Err(err) => assert_eq!(err, FitError::Cancelled),
            Ok(model) => assert_eq!(model.ensemble().len(), 1),
        }
    }

    #[test]
    fn try_result_eventually_yields() {
        let handle = spawn_fit(fitter(), dataset());
        for _ in handle.progress().iter() {}
        let result = loop {
            if let Some(result) = handle.try_result() {
                break result;
            }
            std::thread::yield_now();
        };
        assert!(result.is_ok());
        assert_eq!(handle.try_result().map(|r| r.unwrap_err()), Some(FitError::WorkerLost));
    }
}
