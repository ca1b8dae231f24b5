//! Wall-clock behaviour of the state poller

use ocicheck::kernel::poll::{poll_until, PollSettings};
use std::time::{Duration, Instant};

#[test]
fn test_never_true_predicate_stops_between_timeout_and_one_interval_later() {
    let settings = PollSettings::new(Duration::from_millis(300), Duration::from_millis(100));
    let mut calls = 0;

    let start = Instant::now();
    let result: Result<(), _> = poll_until(settings, || {
        calls += 1;
        Err(format!("attempt {}", calls))
    });
    let elapsed = start.elapsed();

    let timeout = result.unwrap_err();
    assert!(elapsed >= Duration::from_millis(300), "returned early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(400), "returned late: {:?}", elapsed);
    assert!(timeout.elapsed >= Duration::from_millis(300));
    assert!(calls >= 1 && calls <= 3, "unexpected evaluation count {}", calls);
    assert_eq!(timeout.last_error, Some(format!("attempt {}", calls)));
}

#[test]
fn test_success_returns_value_on_first_tick() {
    let settings = PollSettings::new(Duration::from_millis(500), Duration::from_millis(50));

    let start = Instant::now();
    let value = poll_until::<_, (), _>(settings, || Ok(42)).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(value, 42);
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(500));
}

#[test]
fn test_value_comes_from_the_successful_evaluation() {
    let settings = PollSettings::new(Duration::from_secs(2), Duration::from_millis(10));
    let mut attempt = 0;

    let value = poll_until(settings, || {
        attempt += 1;
        if attempt < 4 {
            Err("not yet")
        } else {
            Ok(attempt)
        }
    })
    .unwrap();

    assert_eq!(value, 4);
}
