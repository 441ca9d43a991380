//! Fixed-interval polling until a resource reaches one of a set of states.
//!
//! # Design
//! Each attempt sleeps first and then fetches, so there is no immediate
//! check on entry. Elapsed time is counted as `attempts * interval` rather
//! than read from a clock, which keeps the outcome a pure function of the
//! fetch sequence. The sleep is behind `Sleeper` so tests run instantly.
//!
//! ```text
//! Polling --state in targets--> Matched
//!    |  \--fetch error-------> FetchFailed
//!    \--attempts*interval >= timeout--> TimedOut
//! ```

use std::time::Duration;

use crate::error::{Error, Result};

/// Shortest interval a `Poller` will use. A zero interval would never
/// accumulate elapsed time and so never time out.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Blocks the calling thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// `Sleeper` backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Where the wait loop stands after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Matched,
    TimedOut,
    FetchFailed,
}

#[derive(Debug, Clone)]
pub struct Poller<S = ThreadSleeper> {
    interval: Duration,
    timeout: Duration,
    sleeper: S,
}

impl Poller<ThreadSleeper> {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self::with_sleeper(interval, timeout, ThreadSleeper)
    }
}

impl<S: Sleeper> Poller<S> {
    /// `interval` is raised to `MIN_INTERVAL` if shorter.
    pub fn with_sleeper(interval: Duration, timeout: Duration, sleeper: S) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            timeout,
            sleeper,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// State after a successful fetch on attempt number `attempts`.
    pub fn transition(&self, attempts: u32, matched: bool) -> PollState {
        if matched {
            PollState::Matched
        } else if self.interval * attempts >= self.timeout {
            PollState::TimedOut
        } else {
            PollState::Polling
        }
    }

    /// Fetch until `state_of` reports one of `targets`.
    ///
    /// A fetch error ends the wait immediately with that error.
    pub fn wait<R, T, F, G>(&self, resource_id: &str, targets: &[T], mut fetch: F, state_of: G) -> Result<R>
    where
        T: AsRef<str>,
        F: FnMut() -> Result<R>,
        G: Fn(&R) -> &str,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            self.sleeper.sleep(self.interval);

            let resource = match fetch() {
                Ok(resource) => resource,
                Err(err) => {
                    tracing::debug!(
                        resource_id,
                        attempts,
                        state = ?PollState::FetchFailed,
                        error = %err,
                        "state fetch failed"
                    );
                    return Err(err);
                }
            };

            let current = state_of(&resource);
            let matched = targets.iter().any(|t| t.as_ref() == current);
            match self.transition(attempts, matched) {
                PollState::Matched => {
                    tracing::debug!(resource_id, attempts, state = current, "wait state reached");
                    return Ok(resource);
                }
                PollState::TimedOut => {
                    tracing::warn!(
                        resource_id,
                        attempts,
                        state = current,
                        timeout_secs = self.timeout.as_secs(),
                        "gave up waiting for state change"
                    );
                    return Err(Error::WaitTimeout {
                        uuid: resource_id.to_string(),
                        states: targets.iter().map(|t| t.as_ref().to_string()).collect(),
                    });
                }
                PollState::Polling | PollState::FetchFailed => {
                    tracing::trace!(resource_id, attempts, state = current, "still waiting");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Cell<Duration>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.set(self.slept.get() + duration);
        }
    }

    fn scripted(states: &[&str]) -> RefCell<std::vec::IntoIter<String>> {
        let v: Vec<String> = states.iter().map(|s| s.to_string()).collect();
        RefCell::new(v.into_iter())
    }

    #[test]
    fn matches_on_second_fetch() {
        let sleeper = RecordingSleeper::default();
        let poller = Poller::with_sleeper(Duration::from_secs(3), Duration::from_secs(7), &sleeper);
        let script = scripted(&["stopping", "stopped"]);
        let fetches = Cell::new(0);

        let state = poller
            .wait(
                "srv-1",
                &["stopped"],
                || {
                    fetches.set(fetches.get() + 1);
                    Ok(script.borrow_mut().next().unwrap())
                },
                |s: &String| s.as_str(),
            )
            .unwrap();

        assert_eq!(state, "stopped");
        assert_eq!(fetches.get(), 2);
        assert!(sleeper.slept.get() >= Duration::from_secs(6));
    }

    #[test]
    fn times_out_after_budget() {
        let sleeper = RecordingSleeper::default();
        let poller = Poller::with_sleeper(Duration::from_secs(3), Duration::from_secs(5), &sleeper);
        let fetches = Cell::new(0);

        let err = poller
            .wait(
                "srv-1",
                &["stopped"],
                || {
                    fetches.set(fetches.get() + 1);
                    Ok("stopping".to_string())
                },
                |s: &String| s.as_str(),
            )
            .unwrap_err();

        assert_eq!(fetches.get(), 2);
        assert_eq!(sleeper.slept.get(), Duration::from_secs(6));
        match err {
            Error::WaitTimeout { uuid, states } => {
                assert_eq!(uuid, "srv-1");
                assert_eq!(states, vec!["stopped".to_string()]);
            }
            other => panic!("expected WaitTimeout, got {other:?}"),
        }
    }

    #[test]
    fn fetch_error_aborts_without_retry() {
        let sleeper = RecordingSleeper::default();
        let poller = Poller::with_sleeper(Duration::from_secs(3), Duration::from_secs(60), &sleeper);
        let fetches = Cell::new(0);

        let err = poller
            .wait(
                "srv-1",
                &["stopped"],
                || -> Result<String> {
                    fetches.set(fetches.get() + 1);
                    Err(Error::Http {
                        status: 500,
                        status_text: "Internal Server Error".to_string(),
                        body: Vec::new(),
                    })
                },
                |s: &String| s.as_str(),
            )
            .unwrap_err();

        assert_eq!(fetches.get(), 1);
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn sleeps_before_first_fetch() {
        let sleeper = RecordingSleeper::default();
        let poller = Poller::with_sleeper(Duration::from_secs(3), Duration::from_secs(60), &sleeper);

        poller
            .wait(
                "srv-1",
                &["started", "stopped"],
                || {
                    assert_eq!(sleeper.slept.get(), Duration::from_secs(3));
                    Ok("started".to_string())
                },
                |s: &String| s.as_str(),
            )
            .unwrap();
    }

    #[test]
    fn zero_interval_still_times_out() {
        let sleeper = RecordingSleeper::default();
        let poller = Poller::with_sleeper(Duration::ZERO, Duration::from_millis(10), &sleeper);
        let fetches = Cell::new(0);

        let err = poller
            .wait(
                "srv-1",
                &["stopped"],
                || {
                    fetches.set(fetches.get() + 1);
                    Ok("stopping".to_string())
                },
                |s: &String| s.as_str(),
            )
            .unwrap_err();

        assert!(matches!(err, Error::WaitTimeout { .. }));
        assert_eq!(poller.interval(), MIN_INTERVAL);
        assert_eq!(fetches.get(), 10);
        assert_eq!(sleeper.slept.get(), Duration::from_millis(10));
    }

    #[test]
    fn transition_table() {
        let poller = Poller::with_sleeper(Duration::from_secs(3), Duration::from_secs(6), ThreadSleeper);
        assert_eq!(poller.transition(1, true), PollState::Matched);
        assert_eq!(poller.transition(1, false), PollState::Polling);
        assert_eq!(poller.transition(2, false), PollState::TimedOut);
        assert_eq!(poller.transition(5, true), PollState::Matched);
    }
}
