//! Recurring liveness task.
//!
//! The task is cancelled cooperatively through a [`CancellationToken`] rather
//! than aborted: a tick may itself end the session, and aborting the task from
//! inside its own tick would drop the teardown half way through.

use std::{future::Future, time::Duration};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What the loop does after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tick {
    Continue,
    Stop,
}

pub(crate) struct HeartbeatHandle {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Spawns a loop calling `tick` every `period`, first after one full period.
    ///
    /// Returns `None` for a zero period or when no tokio runtime is available.
    pub(crate) fn spawn<F, Fut>(generation: u64, period: Duration, mut tick: F) -> Option<Self>
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send + 'static,
    {
        if period.is_zero() {
            warn!(generation, "Heartbeat period is zero, heartbeat not started");
            return None;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime available, heartbeat not started");
            return None;
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }

                if tick(cancelled.clone()).await == Tick::Stop {
                    break;
                }
            }

            debug!(generation, "heartbeat loop exited");
        });

        Some(Self {
            generation,
            token,
            task,
        })
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signals the loop to stop. Any in-flight tick observes the token.
    pub(crate) fn cancel(self) {
        self.token.cancel();
        debug!(
            generation = self.generation,
            finished = self.task.is_finished(),
            "heartbeat cancelled"
        );
    }
}
