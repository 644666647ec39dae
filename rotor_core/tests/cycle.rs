//! End-to-end cycle behavior through the locked `Tacho` handle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rotor_core::mocks::{DriverCall, RecordingDriver};
use rotor_core::{Change, Edge, Fixed, Snapshot, Tacho};
use rotor_traits::ManualClock;

struct Rig {
    tacho: Tacho,
    clock: ManualClock,
    driver: RecordingDriver,
}

fn rig() -> Rig {
    let clock = ManualClock::new();
    let driver = RecordingDriver::new();
    let tacho = Tacho::builder()
        .with_driver(driver.clone())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("default build");
    Rig {
        tacho,
        clock,
        driver,
    }
}

fn fx(s: &str) -> Fixed {
    s.parse().expect("decimal")
}

fn pulses(tacho: &Tacho, n: usize, secondary_high: bool) {
    for _ in 0..n {
        assert!(tacho.handle(Edge::Primary { secondary_high }).is_none());
    }
}

#[test]
fn first_tick_has_zero_cycle_time_and_speed() {
    let r = rig();
    pulses(&r.tacho, 100, false);
    r.clock.advance(Duration::from_millis(700));
    let s = r.tacho.on_clock_edge();
    assert_eq!(s.counter, 1);
    assert_eq!(s.position, 100);
    assert!(s.cycle_time.is_zero());
    assert!(s.speed.is_zero());
    assert_eq!(s.speed.to_string(), "0.000");
}

#[test]
fn hundred_pulses_per_second_reads_fifteen_rpm() {
    let r = rig();
    r.tacho.on_clock_edge();
    pulses(&r.tacho, 100, false);
    r.clock.advance(Duration::from_secs(1));
    let s = r.tacho.on_clock_edge();
    assert_eq!(s.position, 100);
    assert_eq!(s.cycle_time.to_string(), "1.000");
    assert_eq!(s.speed.to_string(), "15.000");
    assert_eq!(s.rotation.to_string(), "0.250");
}

#[test]
fn reverse_pulses_read_negative_speed() {
    let r = rig();
    r.tacho.on_clock_edge();
    pulses(&r.tacho, 100, true);
    r.clock.advance(Duration::from_secs(1));
    let s = r.tacho.on_clock_edge();
    assert_eq!(s.position, -100);
    assert_eq!(s.speed.to_string(), "-15.000");
}

#[test]
fn idle_ticks_read_zero_speed_and_lap_time() {
    let r = rig();
    for i in 1..=10u64 {
        r.clock.advance(Duration::from_secs(1));
        let s = r.tacho.on_clock_edge();
        assert_eq!(s.counter, i);
        assert_eq!(s.speed.to_string(), "0.000");
        assert_eq!(s.lap_time.to_string(), "0.000");
    }
}

#[test]
fn lap_time_collapses_after_ten_idle_ticks() {
    let r = rig();
    r.tacho.on_clock_edge();
    // Two measurement windows 250 ms apart: one lap is 4 windows.
    pulses(&r.tacho, 100, false);
    r.clock.advance(Duration::from_millis(250));
    pulses(&r.tacho, 100, false);
    r.clock.advance(Duration::from_millis(750));
    let s = r.tacho.on_clock_edge();
    assert_eq!(s.lap_time.to_string(), "1.000");

    // The 200-pulse delta stays in the history for nine more ticks.
    for _ in 0..9 {
        r.clock.advance(Duration::from_secs(1));
        let s = r.tacho.on_clock_edge();
        assert!(s.speed.is_zero());
        assert_eq!(s.lap_time.to_string(), "1.000");
    }
    r.clock.advance(Duration::from_secs(1));
    let last = r.tacho.on_clock_edge();
    assert!(last.lap_time.is_zero());
    assert!(last.speed.is_zero());
    let (start, end) = r.tacho.with_core(|c| c.lap_window().bounds());
    assert_eq!(start, end);
}

#[test]
fn reversal_at_boundary_collapses_lap_window() {
    let r = rig();
    pulses(&r.tacho, 100, false);
    r.clock.advance(Duration::from_millis(300));
    pulses(&r.tacho, 100, false);
    assert_eq!(
        r.tacho.with_core(|c| c.lap_window().lap_duration()),
        Duration::from_millis(300)
    );
    r.clock.advance(Duration::from_millis(200));
    // Down to the 100 boundary with the secondary channel now high.
    pulses(&r.tacho, 100, true);
    assert_eq!(
        r.tacho.with_core(|c| c.lap_window().lap_duration()),
        Duration::ZERO
    );
}

#[test]
fn operator_extremes_map_to_register_bounds() {
    let r = rig();
    assert!(r.tacho.select_set_point(fx("31")));
    r.tacho.on_clock_edge();
    assert_eq!(r.driver.last_drive(), Some(31));

    assert!(r.tacho.select_set_point(fx("-31.00000")));
    r.tacho.on_clock_edge();
    assert_eq!(r.driver.last_drive(), Some(-31));
}

#[test]
fn unknown_set_point_keeps_current() {
    let r = rig();
    assert!(r.tacho.select_set_point(fx("12")));
    assert!(!r.tacho.select_set_point(fx("12.5")));
    assert!(!r.tacho.select_set_point(fx("40")));
    assert_eq!(r.tacho.set_point(), fx("12"));
    r.tacho.on_clock_edge();
    assert_eq!(r.driver.last_drive(), Some(12));
}

#[test]
fn drive_failure_still_publishes_snapshot() {
    let r = rig();
    let seen = Arc::new(Mutex::new(Vec::<Snapshot>::new()));
    let sink = Arc::clone(&seen);
    r.tacho.publisher().subscribe(move |c: &Change| {
        if let Change::Snapshot { new, .. } = c {
            sink.lock().unwrap().push(*new);
        }
    });

    r.tacho.on_clock_edge();
    pulses(&r.tacho, 100, false);
    r.driver.set_failing(true);
    r.clock.advance(Duration::from_secs(1));
    r.tacho.on_clock_edge();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].position, 100);
    assert_eq!(seen[1].speed.to_string(), "15.000");
}

#[test]
fn fault_is_read_before_drive_every_tick() {
    let r = rig();
    r.driver.set_fault(0x03);
    r.tacho.on_clock_edge();
    assert_eq!(r.driver.calls(), vec![DriverCall::Fault, DriverCall::Drive(0)]);
}

#[test]
fn reset_mid_run_is_visible_on_next_snapshot() {
    let r = rig();
    r.tacho.on_clock_edge();
    pulses(&r.tacho, 150, false);
    r.tacho.select_set_point(fx("20"));
    r.clock.advance(Duration::from_secs(1));
    r.tacho.on_clock_edge();

    r.tacho.reset();
    assert_eq!(r.tacho.counter(), 0);
    assert_eq!(r.tacho.position(), 0);
    assert_eq!(r.tacho.set_point(), Fixed::ZERO);
    assert_eq!(r.driver.brake_count(), 1);

    r.clock.advance(Duration::from_secs(1));
    let s = r.tacho.on_clock_edge();
    assert_eq!(s.counter, 1);
    assert_eq!(s.position, 0);
    assert_eq!(r.driver.last_drive(), Some(0));
}

#[test]
fn stop_collapses_lap_and_checks_fault_after_brake() {
    let r = rig();
    pulses(&r.tacho, 100, false);
    r.clock.advance(Duration::from_millis(400));
    pulses(&r.tacho, 100, false);
    r.driver.clear();

    r.clock.advance(Duration::from_millis(100));
    r.tacho.stop();
    assert_eq!(r.driver.calls(), vec![DriverCall::Brake, DriverCall::Fault]);
    assert_eq!(r.tacho.position(), 0);
    assert_eq!(r.tacho.counter(), 0);
    assert_eq!(
        r.tacho.with_core(|c| c.lap_window().lap_duration()),
        Duration::ZERO
    );
}

#[test]
fn set_point_changes_are_published_once() {
    let r = rig();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    r.tacho
        .publisher()
        .subscribe_to(rotor_core::Topic::SetPoint, move |c: &Change| {
            sink.lock().unwrap().push(*c);
        });

    r.tacho.select_set_point(fx("5"));
    r.tacho.select_set_point(fx("5"));
    r.tacho.reset();
    r.tacho.reset();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            Change::SetPoint {
                old: Fixed::ZERO,
                new: fx("5")
            },
            Change::SetPoint {
                old: fx("5"),
                new: Fixed::ZERO
            },
        ]
    );
}
