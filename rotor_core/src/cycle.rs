//! The per-edge state machine (`TachoCore`), one clock tick per cycle.
//!
//! Owns every piece of mutable measurement state: encoder position, position
//! history, delta ring, tick counter, previous tick time, lap window and the
//! current set-point. Callers serialize access (see `controller::Tacho`).

use std::sync::Arc;
use std::time::Instant;

use rotor_traits::{Clock, Edge, MotorDriver};

use crate::config::ScaleCfg;
use crate::encoder::EncoderTracker;
use crate::fixed_point::Fixed;
use crate::hw_error::map_driver_error;
use crate::lap::LapWindow;
use crate::ring::{DELTA_HISTORY, DeltaRing};
use crate::set_point::SetPointTable;
use crate::snapshot::Snapshot;
use crate::speed::SpeedEstimator;

/// Cycle timing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No clock edge seen yet; the first cycle has zero duration.
    AwaitingFirstTick,
    Steady { previous_tick: Instant },
}

/// Set-point transition produced by an operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPointChange {
    pub old: Fixed,
    pub new: Fixed,
    /// Register value now issued to the driver each cycle.
    pub register: i32,
}

impl SetPointChange {
    #[inline]
    pub fn is_change(&self) -> bool {
        self.old != self.new
    }
}

pub struct TachoCore<D: MotorDriver> {
    pub(crate) driver: D,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) encoder: EncoderTracker,
    pub(crate) lap: LapWindow,
    pub(crate) speed: SpeedEstimator,
    pub(crate) table: SetPointTable,
    pub(crate) scales: ScaleCfg,
    pub(crate) pulses_per_rev: i64,

    pub(crate) set_point: i32,
    pub(crate) counter: u64,
    /// `[previous, newest]` position samples taken at clock edges.
    pub(crate) positions: [i64; 2],
    pub(crate) deltas: DeltaRing<DELTA_HISTORY>,
    pub(crate) phase: Phase,
}

impl<D: MotorDriver> core::fmt::Debug for TachoCore<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TachoCore")
            .field("counter", &self.counter)
            .field("position", &self.encoder.position())
            .field("set_point", &self.set_point)
            .field("deltas", &self.deltas)
            .field("phase", &self.phase)
            .finish()
    }
}

impl<D: MotorDriver> TachoCore<D> {
    /// Process one edge. Clock edges complete a cycle and yield its snapshot.
    pub fn handle(&mut self, edge: Edge) -> Option<Snapshot> {
        match edge {
            Edge::Primary { secondary_high } => {
                self.on_primary_edge(secondary_high);
                None
            }
            Edge::Clock => Some(self.on_clock_edge()),
        }
    }

    fn on_primary_edge(&mut self, secondary_high: bool) {
        if let Some(boundary) = self.encoder.on_primary_edge(secondary_high) {
            let now = self.clock.now();
            if boundary.is_reversal() {
                tracing::debug!(position = self.encoder.position(), "direction reversal");
            }
            self.lap.on_measurement_boundary(boundary, now);
        }
    }

    /// One reference clock cycle: drive the motor and sample every derived
    /// quantity.
    pub fn on_clock_edge(&mut self) -> Snapshot {
        self.counter = self.counter.saturating_add(1);

        self.check_fault();
        if let Err(e) = self.driver.drive(self.set_point) {
            let err = map_driver_error(e.as_ref());
            tracing::warn!(error = %err, set_point = self.set_point, "drive command failed");
        }

        let now = self.clock.now();
        let elapsed = match self.phase {
            Phase::AwaitingFirstTick => std::time::Duration::ZERO,
            Phase::Steady { previous_tick } => now.saturating_duration_since(previous_tick),
        };
        self.phase = Phase::Steady { previous_tick: now };
        let cycle_time = Fixed::from_duration(elapsed, self.scales.cycle_time);

        self.positions = [self.positions[1], self.encoder.position()];
        let delta = self.positions[1].saturating_sub(self.positions[0]);
        self.deltas.push(delta);
        tracing::trace!(deltas = ?self.deltas, "delta history");

        let rotation = Fixed::from_int(self.positions[1])
            .checked_div(Fixed::from_int(self.pulses_per_rev), self.scales.rotation)
            .unwrap_or(Fixed::zero(self.scales.rotation));
        let speed = self.speed.estimate(delta, cycle_time);

        self.lap.on_cycle_tick(self.deltas.all_zero(), now);
        let lap_time = self.lap.lap_time();

        let snapshot = Snapshot {
            counter: self.counter,
            position: self.positions[1],
            rotation,
            lap_time,
            speed,
            cycle_time,
        };
        tracing::debug!(
            counter = snapshot.counter,
            position = snapshot.position,
            rotation = %snapshot.rotation,
            lap_time = %snapshot.lap_time,
            speed = %snapshot.speed,
            cycle_time = %snapshot.cycle_time,
            "cycle"
        );
        snapshot
    }

    /// Select the set-point shown as `value`.
    ///
    /// `None` when the value is not in the table; the current set-point stays.
    pub fn select_set_point(&mut self, value: Fixed) -> Option<SetPointChange> {
        let Some(register) = self.table.lookup(value) else {
            tracing::debug!(%value, "ignoring unknown set-point");
            return None;
        };
        let change = self.apply_set_point(register);
        if change.is_change() {
            tracing::info!(old = %change.old, new = %change.new, register, "set-point selected");
        }
        Some(change)
    }

    /// Zero counter and position, restore the center set-point and brake.
    pub fn reset(&mut self) -> SetPointChange {
        self.zero_counters();
        let change = self.apply_set_point(0);
        self.brake();
        tracing::info!("reset");
        change
    }

    /// Like [`reset`](Self::reset), but also collapses the lap window and
    /// reads the fault register once the motor is braked.
    pub fn stop(&mut self) -> SetPointChange {
        self.zero_counters();
        let now = self.clock.now();
        self.lap.collapse(now);
        let change = self.apply_set_point(0);
        self.brake();
        self.check_fault();
        tracing::info!("stop");
        change
    }

    /// Read the fault register and log whatever it reports.
    ///
    /// Returns the raw code when the read succeeded.
    pub fn check_fault(&mut self) -> Option<u8> {
        match self.driver.fault() {
            Ok(0) => Some(0),
            Ok(code) => {
                let reason = self.driver.fault_reason(code);
                tracing::error!(code, %reason, "motor driver fault");
                Some(code)
            }
            Err(e) => {
                let err = map_driver_error(e.as_ref());
                tracing::warn!(error = %err, "fault register read failed");
                None
            }
        }
    }

    fn brake(&mut self) {
        if let Err(e) = self.driver.brake() {
            let err = map_driver_error(e.as_ref());
            tracing::error!(error = %err, "brake command failed");
        }
    }

    fn zero_counters(&mut self) {
        self.counter = 0;
        self.encoder.reset();
        self.positions = [0, 0];
    }

    fn apply_set_point(&mut self, register: i32) -> SetPointChange {
        let old = self.set_point_display();
        self.set_point = register;
        SetPointChange {
            old,
            new: self.set_point_display(),
            register,
        }
    }

    #[inline]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    #[inline]
    pub fn position(&self) -> i64 {
        self.encoder.position()
    }

    /// Register value issued on every cycle.
    #[inline]
    pub fn set_point(&self) -> i32 {
        self.set_point
    }

    pub fn set_point_display(&self) -> Fixed {
        self.table
            .display_for(self.set_point)
            .unwrap_or_else(|| self.table.center())
    }

    #[inline]
    pub fn table(&self) -> &SetPointTable {
        &self.table
    }

    #[inline]
    pub fn lap_window(&self) -> &LapWindow {
        &self.lap
    }

    #[inline]
    pub fn deltas(&self) -> &DeltaRing<DELTA_HISTORY> {
        &self.deltas
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[inline]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
