//! Consumer lifecycle supervision.
//!
//! The consume loop runs for the lifetime of the process. The supervisor is
//! an explicit state machine — connected, backoff, reconnecting — around the
//! router's `run` future, with an injectable backoff policy. The default is a
//! fixed delay and an unbounded retry count: these are small internal
//! services, and steady-state simplicity beats adaptive backoff here.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::router::EventRouter;

/// Delay policy between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay for every attempt.
    Fixed(Duration),
}

impl BackoffPolicy {
    pub fn delay(&self, _attempt: u32) -> Duration {
        match self {
            BackoffPolicy::Fixed(delay) => *delay,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed(Duration::from_secs(5))
    }
}

/// Observable supervisor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Connected,
    Backoff,
    Reconnecting,
}

/// Owns one router and keeps its consume loop alive forever.
pub struct ConsumerSupervisor {
    router: EventRouter,
    policy: BackoffPolicy,
}

impl ConsumerSupervisor {
    pub fn new(router: EventRouter) -> Self {
        Self {
            router,
            policy: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Spawn the supervision loop as an independent task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let queue = self.router.queue_name().to_string();
            let mut state = ConsumerState::Reconnecting;
            let mut attempt: u32 = 0;

            loop {
                info!(queue = %queue, state = ?state, attempt, "starting consume loop");
                state = ConsumerState::Connected;
                debug!(queue = %queue, state = ?state, "consume loop entered");

                match self.router.run().await {
                    Ok(()) => {
                        // Stream ended without an error (e.g. broker closed
                        // the consumer); treat it like a connection loss.
                        warn!(queue = %queue, "consumer stream ended");
                    }
                    Err(e) => {
                        error!(queue = %queue, error = %e, "consumer failed");
                    }
                }

                attempt += 1;
                state = ConsumerState::Backoff;
                let delay = self.policy.delay(attempt);
                info!(
                    queue = %queue,
                    state = ?state,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "backing off before reconnect"
                );
                tokio::time::sleep(delay).await;
                state = ConsumerState::Reconnecting;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_is_constant_across_attempts() {
        let policy = BackoffPolicy::Fixed(Duration::from_secs(5));
        for attempt in [1, 2, 10, 1_000] {
            assert_eq!(policy.delay(attempt), Duration::from_secs(5));
        }
    }

    #[test]
    fn default_policy_is_five_seconds() {
        assert_eq!(
            BackoffPolicy::default(),
            BackoffPolicy::Fixed(Duration::from_secs(5))
        );
    }
}
