//! Run-state machine and the operator controls that drive it.
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running | Paused | Idle -> Cancelled   (terminal, irreversible)
//! Running -> Completed                   (terminal)
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use detention_shared::{DetentionError, DetentionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    #[display("idle")]
    Idle,
    #[display("running")]
    Running,
    #[display("paused")]
    Paused,
    #[display("cancelled")]
    Cancelled,
    #[display("completed")]
    Completed,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// Shared handle for pausing, resuming and cancelling a run
#[derive(Debug, Clone)]
pub struct BatchController {
    state: watch::Sender<BatchState>,
    cancel: CancellationToken,
}

impl Default for BatchController {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchController {
    pub fn new() -> Self {
        let (state, _) = watch::channel(BatchState::Idle);
        Self {
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> BatchState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchState> {
        self.state.subscribe()
    }

    /// Token cancelled together with the run; handed to approval waits
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn transition(&self, from: &[BatchState], to: BatchState) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if from.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            info!(state = %to, "Batch state changed");
        }
        changed
    }

    /// Idle -> Running; any other starting state is an error
    pub fn begin(&self) -> DetentionResult<()> {
        if self.transition(&[BatchState::Idle], BatchState::Running) {
            Ok(())
        } else {
            Err(DetentionError::State(format!(
                "cannot start a run while {}",
                self.state()
            )))
        }
    }

    /// No-op unless running
    pub fn pause(&self) -> bool {
        self.transition(&[BatchState::Running], BatchState::Paused)
    }

    /// No-op unless paused
    pub fn resume(&self) -> bool {
        self.transition(&[BatchState::Paused], BatchState::Running)
    }

    /// Valid from any non-terminal state
    pub fn cancel(&self) -> bool {
        let cancelled = self.transition(
            &[BatchState::Idle, BatchState::Running, BatchState::Paused],
            BatchState::Cancelled,
        );
        if cancelled {
            self.cancel.cancel();
        }
        cancelled
    }

    pub(crate) fn complete(&self) -> bool {
        self.transition(&[BatchState::Running], BatchState::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == BatchState::Cancelled
    }

    /// Block while paused; `Err(Cancelled)` once the run is cancelled
    pub async fn wait_while_paused(&self, poll_interval: Duration) -> DetentionResult<()> {
        let mut receiver = self.state.subscribe();
        loop {
            let state = *receiver.borrow_and_update();
            match state {
                BatchState::Cancelled => return Err(DetentionError::Cancelled),
                BatchState::Paused => {
                    tokio::select! {
                        changed = receiver.changed() => {
                            if changed.is_err() {
                                return Err(DetentionError::Cancelled);
                            }
                        }
                        () = tokio::time::sleep(poll_interval) => {}
                    }
                }
                _ => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_transitions() {
        let controller = BatchController::new();
        assert!(!controller.pause());
        assert!(!controller.resume());

        controller.begin().unwrap();
        assert!(controller.begin().is_err());
        assert!(!controller.resume());
        assert!(controller.pause());
        assert!(!controller.pause());
        assert_eq!(controller.state(), BatchState::Paused);
        assert!(controller.resume());

        assert!(controller.cancel());
        assert!(controller.cancellation_token().is_cancelled());
        assert!(!controller.cancel());
        assert!(!controller.resume());
        assert!(!controller.complete());
        assert!(controller.state().is_terminal());
    }

    #[test]
    fn test_cancel_from_idle() {
        let controller = BatchController::new();
        assert!(controller.cancel());
        assert!(controller.begin().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_while_paused_until_resumed() {
        let controller = Arc::new(BatchController::new());
        controller.begin().unwrap();
        controller.pause();

        let waiter = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                controller
                    .wait_while_paused(Duration::from_millis(500))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!waiter.is_finished());

        controller.resume();
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_while_paused_observes_cancel() {
        let controller = Arc::new(BatchController::new());
        controller.begin().unwrap();
        controller.pause();

        let waiter = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                controller
                    .wait_while_paused(Duration::from_millis(500))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.cancel();

        assert!(matches!(
            waiter.await.unwrap(),
            Err(DetentionError::Cancelled)
        ));
    }
}
