//! Reconnection scheduler: backoff policy and retry state machine.
//!
//! ```text
//! Idle ──(unexpected close)──▶ RetryPending ──(timer fires)──▶ Idle ──▶ new attempt
//!  ▲                                                              │
//!  └──────────────────────────(open succeeds)─────────────────────┘
//!
//! any ──(teardown)──▶ Stopped            any ──(max attempts)──▶ GaveUp
//! ```
//!
//! The scheduler never sleeps itself. It hands out delays and the
//! connection task waits them out, so the state machine can be tested
//! without timers.

use std::time::Duration;

/// Rule that maps the number of consecutive failures to a retry delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay before every attempt.
    Fixed {
        /// Delay before each attempt.
        delay: Duration,
    },
    /// Delay grows by `step` per failure, capped at `max`.
    Linear {
        /// Delay before the first retry.
        initial: Duration,
        /// Increment added per consecutive failure.
        step: Duration,
        /// Upper bound.
        max: Duration,
    },
    /// Delay doubles per failure, capped at `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound.
        max: Duration,
    },
}

impl BackoffPolicy {
    /// Delay before the first retry when nothing else is configured.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(3000);

    /// Upper bound for growing policies when nothing else is configured.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

    /// Returns the delay before retry number `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay } => delay,
            Self::Linear { initial, step, max } => initial
                .saturating_add(step.saturating_mul(attempt))
                .min(max),
            Self::Exponential { initial, max } => {
                let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }

    /// Builds a policy from its textual strategy name and parameters.
    ///
    /// Recognized strategies are `fixed`, `linear` and `exponential`
    /// (case-insensitive). Returns `None` for anything else.
    #[must_use]
    pub fn from_parts(strategy: &str, delay: Duration, step: Duration, max: Duration) -> Option<Self> {
        match strategy.to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed { delay }),
            "linear" => Some(Self::Linear {
                initial: delay,
                step,
                max: max.max(delay),
            }),
            "exponential" => Some(Self::Exponential {
                initial: delay,
                max: max.max(delay),
            }),
            _ => None,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Exponential {
            initial: Self::DEFAULT_DELAY,
            max: Self::DEFAULT_MAX_DELAY,
        }
    }
}

/// State of the reconnection scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No retry pending.
    Idle,
    /// A retry is scheduled after `delay`.
    RetryPending {
        /// 1-based number of the pending attempt within the current outage.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// Torn down intentionally; terminal.
    Stopped,
    /// Consecutive failures reached the configured cap; terminal.
    GaveUp {
        /// Number of failed attempts.
        failures: u32,
    },
}

/// Retry state machine driven by the connection task.
#[derive(Debug, Clone)]
pub struct ReconnectScheduler {
    policy: BackoffPolicy,
    max_attempts: Option<u32>,
    failures: u32,
    state: SchedulerState,
}

impl ReconnectScheduler {
    /// Creates an idle scheduler. `max_attempts = None` retries forever.
    #[must_use]
    pub fn new(policy: BackoffPolicy, max_attempts: Option<u32>) -> Self {
        Self {
            policy,
            max_attempts,
            failures: 0,
            state: SchedulerState::Idle,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Returns the number of consecutive failures in the current outage.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Returns `true` once the scheduler will never schedule again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SchedulerState::Stopped | SchedulerState::GaveUp { .. }
        )
    }

    /// Records an unexpected close (or failed open) and returns the delay
    /// to wait before the next attempt.
    ///
    /// Returns `None` when no retry should happen: the scheduler is
    /// stopped, already gave up, already has a retry pending, or has just
    /// hit `max_attempts`.
    pub fn on_unexpected_close(&mut self) -> Option<Duration> {
        match self.state {
            SchedulerState::Stopped
            | SchedulerState::GaveUp { .. }
            | SchedulerState::RetryPending { .. } => None,
            SchedulerState::Idle => {
                if let Some(max) = self.max_attempts
                    && self.failures >= max
                {
                    self.state = SchedulerState::GaveUp {
                        failures: self.failures,
                    };
                    return None;
                }
                let delay = self.policy.delay_for(self.failures);
                self.failures = self.failures.saturating_add(1);
                self.state = SchedulerState::RetryPending {
                    attempt: self.failures,
                    delay,
                };
                Some(delay)
            }
        }
    }

    /// Records that the retry timer fired. Returns `true` if an attempt
    /// should now be made.
    pub fn on_timer_fired(&mut self) -> bool {
        if matches!(self.state, SchedulerState::RetryPending { .. }) {
            self.state = SchedulerState::Idle;
            true
        } else {
            false
        }
    }

    /// Records a successful open: clears the failure count.
    pub fn on_open(&mut self) {
        if !self.is_terminal() {
            self.failures = 0;
            self.state = SchedulerState::Idle;
        }
    }

    /// Records an intentional teardown. Terminal.
    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
    }
}
