/// Bounded-time state polling
/// Re-evaluates a predicate on a fixed tick until it succeeds or a deadline passes.
use std::fmt;
use std::time::{Duration, Instant};

/// Polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Overall deadline measured from the start of polling
    pub timeout: Duration,
    /// Delay between predicate evaluations
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            timeout: Duration::from_secs(3),
            interval: Duration::from_millis(200),
        }
    }
}

impl PollSettings {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// The deadline passed before the predicate succeeded
#[derive(Debug)]
pub struct PollTimeout<E> {
    pub timeout: Duration,
    pub elapsed: Duration,
    /// Error from the most recent predicate evaluation, if it ran at all
    pub last_error: Option<E>,
}

impl<E: fmt::Display> fmt::Display for PollTimeout<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to reach expected state within {:?} (elapsed {:?})",
            self.timeout, self.elapsed
        )?;
        if let Some(err) = &self.last_error {
            write!(f, ": {}", err)?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for PollTimeout<E> {}

/// Evaluate `predicate` once per interval tick until it returns `Ok`.
///
/// The first evaluation happens one interval after the call, not immediately.
/// When the deadline is due no later than the next tick the deadline wins,
/// so a predicate that never succeeds returns after `timeout` and before
/// `timeout + interval`. The value of the successful evaluation is returned
/// as-is.
pub fn poll_until<T, E, F>(settings: PollSettings, mut predicate: F) -> Result<T, PollTimeout<E>>
where
    F: FnMut() -> Result<T, E>,
{
    let interval = settings.interval.max(Duration::from_millis(1));
    let start = Instant::now();
    // A timeout past the clock's range means no deadline
    let deadline = start.checked_add(settings.timeout);
    let mut next_tick = start.checked_add(interval);
    let mut last_error = None;

    loop {
        let tick = match (next_tick, deadline) {
            (Some(tick), Some(deadline)) if tick < deadline => tick,
            (Some(tick), None) => tick,
            _ => {
                if let Some(deadline) = deadline {
                    std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                }
                return Err(PollTimeout {
                    timeout: settings.timeout,
                    elapsed: start.elapsed(),
                    last_error,
                });
            }
        };

        std::thread::sleep(tick.saturating_duration_since(Instant::now()));

        match predicate() {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }

        // Ticks missed while the predicate ran are dropped, not queued.
        let now = Instant::now();
        next_tick = tick.checked_add(interval);
        while let Some(late) = next_tick.filter(|t| *t <= now) {
            next_tick = late.checked_add(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn default_budget_is_three_seconds_at_200ms() {
        let settings = PollSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.interval, Duration::from_millis(200));
    }

    #[test]
    fn returns_value_of_successful_evaluation() {
        let calls = Cell::new(0);
        let settings = PollSettings::new(Duration::from_secs(2), Duration::from_millis(10));
        let value = poll_until(settings, || {
            calls.set(calls.get() + 1);
            if calls.get() >= 3 {
                Ok(calls.get() * 10)
            } else {
                Err("not yet")
            }
        })
        .unwrap();

        assert_eq!(value, 30);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn first_evaluation_waits_one_interval() {
        let start = Instant::now();
        let settings = PollSettings::new(Duration::from_secs(1), Duration::from_millis(50));
        let at: Duration = poll_until(settings, || Ok::<_, ()>(start.elapsed())).unwrap();
        assert!(at >= Duration::from_millis(50), "evaluated at {:?}", at);
    }

    #[test]
    fn timeout_keeps_last_predicate_error() {
        let settings = PollSettings::new(Duration::from_millis(60), Duration::from_millis(20));
        let err = poll_until(settings, || Err::<(), _>("still shared")).unwrap_err();

        assert_eq!(err.last_error, Some("still shared"));
        assert!(err.elapsed >= Duration::from_millis(60));
        assert!(err.to_string().contains("still shared"));
    }

    #[test]
    fn timeout_shorter_than_interval_never_evaluates() {
        let settings = PollSettings::new(Duration::from_millis(20), Duration::from_millis(100));
        let err = poll_until(settings, || -> Result<(), ()> {
            panic!("predicate must not run before the first tick")
        })
        .unwrap_err();
        assert!(err.last_error.is_none());
    }

    #[test]
    fn timeout_beyond_clock_range_does_not_panic() {
        let calls = Cell::new(0);
        let settings = PollSettings::new(Duration::from_millis(u64::MAX), Duration::from_millis(5));
        let value = poll_until(settings, || {
            calls.set(calls.get() + 1);
            if calls.get() >= 2 {
                Ok("diverged")
            } else {
                Err("still shared")
            }
        })
        .unwrap();
        assert_eq!(value, "diverged");
        assert_eq!(calls.get(), 2);
    }
}
