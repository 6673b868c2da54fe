//! Status poller
//!
//! Repeatedly describes a resource until it reaches a terminal status or the
//! policy's ceiling is hit. The delay between polls is fixed: provisioning
//! takes minutes, so backoff would only delay noticing completion.

use pipewright_client::ClientError;
use pipewright_core::domain::status::{LifecycleStatus, StatusReport};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;

/// When a poll gives up without a terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCeiling {
    /// Poll until terminal or cancelled
    Unbounded,
    /// Give up after this many status fetches
    Attempts(u32),
    /// Give up once this much wall-clock time has passed
    Elapsed(Duration),
}

/// Polling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub ceiling: PollCeiling,
    /// Consecutive transient errors tolerated before failing
    pub transient_retries: u32,
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            ceiling: PollCeiling::Unbounded,
            transient_retries: 3,
        }
    }

    pub fn attempts(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            ceiling: PollCeiling::Attempts(max_attempts),
            transient_retries: 3,
        }
    }

    pub fn elapsed(interval: Duration, max_elapsed: Duration) -> Self {
        Self {
            interval,
            ceiling: PollCeiling::Elapsed(max_elapsed),
            transient_retries: 3,
        }
    }

    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }
}

/// Statuses that stop a poll, split by meaning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalStates<S> {
    pub success: Vec<S>,
    pub failure: Vec<S>,
}

impl<S: LifecycleStatus> TerminalStates<S> {
    /// The terminal sets declared by the status type
    pub fn of() -> Self {
        Self {
            success: S::SUCCESS.to_vec(),
            failure: S::FAILURE.to_vec(),
        }
    }

    pub fn contains(&self, status: &S) -> bool {
        self.is_success(status) || self.is_failure(status)
    }

    pub fn is_success(&self, status: &S) -> bool {
        self.success.contains(status)
    }

    pub fn is_failure(&self, status: &S) -> bool {
        self.failure.contains(status)
    }
}

impl<S: LifecycleStatus> Default for TerminalStates<S> {
    fn default() -> Self {
        Self::of()
    }
}

/// Result of a completed poll
#[derive(Debug, Clone)]
pub enum PollOutcome<T> {
    /// A terminal status was observed; holds that description
    Terminal(T),
    /// The ceiling was reached first; the resource may still settle later
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        last: Option<T>,
    },
}

/// Why a poll stopped without an outcome
#[derive(Debug, Error)]
pub enum PollError {
    #[error("wait cancelled")]
    Cancelled,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Bounded, cancellable polling primitive
#[derive(Debug, Clone)]
pub struct StatusPoller {
    policy: PollPolicy,
    cancel: CancelToken,
}

impl StatusPoller {
    pub fn new(policy: PollPolicy, cancel: CancelToken) -> Self {
        Self { policy, cancel }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Same poller with a different policy, sharing the cancellation token
    pub fn with_policy(&self, policy: PollPolicy) -> Self {
        Self {
            policy,
            cancel: self.cancel.clone(),
        }
    }

    /// Polls `fetch` until a terminal status, the ceiling, or cancellation
    ///
    /// # Arguments
    /// * `label` - Resource name used in progress logs
    /// * `terminal` - Statuses that stop polling
    /// * `fetch` - Describes the resource once
    pub async fn poll<T, F, Fut>(
        &self,
        label: &str,
        terminal: &TerminalStates<T::Status>,
        mut fetch: F,
    ) -> Result<PollOutcome<T>, PollError>
    where
        T: StatusReport,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;
        let mut last: Option<T> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            attempts += 1;

            match fetch().await {
                Ok(description) => {
                    consecutive_errors = 0;
                    let status = description.status();
                    info!(
                        "{}: {} (attempt {}, {}s elapsed)",
                        label,
                        status,
                        attempts,
                        started.elapsed().as_secs()
                    );

                    if terminal.contains(&status) {
                        return Ok(PollOutcome::Terminal(description));
                    }
                    last = Some(description);
                }
                Err(e) if e.is_transient() && consecutive_errors < self.policy.transient_retries => {
                    consecutive_errors += 1;
                    warn!(
                        "{}: transient error ({}/{}): {}",
                        label, consecutive_errors, self.policy.transient_retries, e
                    );
                }
                Err(e) => return Err(PollError::Client(e)),
            }

            let elapsed = started.elapsed();
            let wait = match self.policy.ceiling {
                PollCeiling::Unbounded => self.policy.interval,
                PollCeiling::Attempts(max) => {
                    if attempts >= max {
                        return Ok(Self::timed_out(label, attempts, elapsed, last));
                    }
                    self.policy.interval
                }
                PollCeiling::Elapsed(max) => {
                    if elapsed >= max {
                        return Ok(Self::timed_out(label, attempts, elapsed, last));
                    }
                    self.policy.interval.min(max - elapsed)
                }
            };

            debug!("{}: next poll in {:?}", label, wait);
            self.sleep(wait).await?;
        }
    }

    /// Runs a one-shot call, retrying retryable failures a bounded number
    /// of times at the policy's fixed interval
    pub async fn retry_transient<R, F, Fut>(&self, label: &str, mut op: F) -> Result<R, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, ClientError>>,
    {
        let mut failures: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && failures < self.policy.transient_retries => {
                    failures += 1;
                    warn!(
                        "{}: retrying after transient error ({}/{}): {}",
                        label, failures, self.policy.transient_retries, e
                    );
                    self.sleep(self.policy.interval).await?;
                }
                Err(e) => return Err(PollError::Client(e)),
            }
        }
    }

    fn timed_out<T>(label: &str, attempts: u32, elapsed: Duration, last: Option<T>) -> PollOutcome<T> {
        warn!(
            "{}: no terminal status after {} attempt(s) in {}s",
            label,
            attempts,
            elapsed.as_secs()
        );
        PollOutcome::TimedOut {
            attempts,
            elapsed,
            last,
        }
    }

    async fn sleep(&self, duration: Duration) -> Result<(), PollError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(PollError::Cancelled),
        }
    }
}
