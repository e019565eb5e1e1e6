//! Sampler thread lifecycle: joins on stop and drop, hands the accelerometer
//! back, survives read failures.

use cadence_core::sampler::Sampler;
use cadence_sim::SimulatedWalker;
use cadence_traits::clock::MonotonicClock;
use std::time::Duration;

#[test]
fn sampler_delivers_samples_in_order() {
    let walker = SimulatedWalker::new(200).with_cadence(100.0);
    let mut sampler = Sampler::spawn(walker, 200, Duration::from_millis(50), MonotonicClock::new());
    let first = sampler
        .recv_timeout(Duration::from_secs(1))
        .expect("first sample");
    std::thread::sleep(Duration::from_millis(50));
    let rest = sampler.drain();
    assert!(!rest.is_empty());
    let mut last = first.timestamp_ms;
    for s in &rest {
        assert!(s.timestamp_ms > last);
        last = s.timestamp_ms;
    }
    assert!(sampler.stop().is_some());
}

#[test]
fn stop_returns_the_accelerometer_once() {
    let walker = SimulatedWalker::new(50);
    let mut sampler = Sampler::spawn(walker, 50, Duration::from_millis(50), MonotonicClock::new());
    std::thread::sleep(Duration::from_millis(30));
    let walker = sampler.stop();
    assert!(walker.is_some());
    assert!(sampler.stop().is_none());
    assert!(!sampler.is_running());
    // Nothing is delivered after a stop.
    assert!(sampler.drain().is_empty());
}

#[test]
fn sampler_thread_exits_on_drop() {
    for _ in 0..10 {
        let walker = SimulatedWalker::new(100);
        let sampler = Sampler::spawn(walker, 100, Duration::from_millis(20), MonotonicClock::new());
        std::thread::sleep(Duration::from_millis(5));
        drop(sampler);
    }
}

#[test]
fn read_failures_do_not_stop_sampling() {
    let walker = SimulatedWalker::new(200);
    walker.fail_next_reads(5);
    let mut sampler = Sampler::spawn(walker, 200, Duration::from_millis(20), MonotonicClock::new());
    let s = sampler.recv_timeout(Duration::from_secs(1));
    assert!(s.is_some(), "sampler stopped after read failures");
    sampler.stop();
}
