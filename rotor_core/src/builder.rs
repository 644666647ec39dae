//! Type-state builder for `Tacho` and generic `build_core` constructor.
//!
//! The builder enforces at compile time that a motor driver is provided before
//! `build()` is available. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use rotor_traits::{Clock, MonotonicClock, MotorDriver};

use crate::config::{EncoderCfg, ScaleCfg, SetPointCfg};
use crate::controller::Tacho;
use crate::cycle::{Phase, TachoCore};
use crate::encoder::EncoderTracker;
use crate::error::{BuildError, Result};
use crate::fixed_point::MAX_SCALE;
use crate::lap::LapWindow;
use crate::ring::DeltaRing;
use crate::set_point::SetPointTable;
use crate::speed::SpeedEstimator;

/// Driver type used by the dynamic `Tacho`.
pub type BoxedDriver = Box<dyn MotorDriver + Send>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Tacho`. All fields are validated on `build()`.
pub struct TachoBuilder<D> {
    driver: Option<BoxedDriver>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    encoder: Option<EncoderCfg>,
    scales: Option<ScaleCfg>,
    set_points: Option<SetPointCfg>,
    table: Option<SetPointTable>,
    _d: PhantomData<D>,
}

impl Default for TachoBuilder<Missing> {
    fn default() -> Self {
        Self {
            driver: None,
            clock: None,
            encoder: None,
            scales: None,
            set_points: None,
            table: None,
            _d: PhantomData,
        }
    }
}

impl TachoBuilder<Missing> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_driver(self, driver: impl MotorDriver + Send + 'static) -> TachoBuilder<Set> {
        TachoBuilder {
            driver: Some(Box::new(driver)),
            clock: self.clock,
            encoder: self.encoder,
            scales: self.scales,
            set_points: self.set_points,
            table: self.table,
            _d: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<D> TachoBuilder<D> {
    /// Provide a custom clock implementation; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    pub fn with_encoder(mut self, encoder: EncoderCfg) -> Self {
        self.encoder = Some(encoder);
        self
    }
    pub fn with_scales(mut self, scales: ScaleCfg) -> Self {
        self.scales = Some(scales);
        self
    }
    pub fn with_set_points(mut self, set_points: SetPointCfg) -> Self {
        self.set_points = Some(set_points);
        self
    }
    /// Use a prebuilt table instead of deriving one from `SetPointCfg`.
    pub fn with_table(mut self, table: SetPointTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<Tacho> {
        let driver = self
            .driver
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDriver))?;
        let table = match self.table {
            Some(t) => t,
            None => SetPointTable::build(&self.set_points.unwrap_or_default())?,
        };
        let core = validate_and_build(
            driver,
            self.clock,
            self.encoder.unwrap_or_default(),
            self.scales.unwrap_or_default(),
            table,
        )?;
        Ok(Tacho::from_core(core))
    }
}

impl TachoBuilder<Set> {
    /// Validate and build. Only available once a driver is set.
    pub fn build(self) -> Result<Tacho> {
        self.try_build()
    }
}

/// Validate configuration and construct a `TachoCore`.
///
/// Shared by `TachoBuilder::try_build()` and `build_core()`.
fn validate_and_build<D: MotorDriver>(
    driver: D,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    encoder: EncoderCfg,
    scales: ScaleCfg,
    table: SetPointTable,
) -> Result<TachoCore<D>> {
    // ── Validation ───────────────────────────────────────────────────────────
    if encoder.pulses_per_rev == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "pulses_per_rev must be > 0",
        )));
    }
    if encoder.granularity == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "granularity must be > 0",
        )));
    }
    if encoder.pulses_per_rev % encoder.granularity != 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "granularity must divide pulses_per_rev",
        )));
    }
    let display = [
        scales.speed,
        scales.cycle_time,
        scales.lap_time,
        scales.rotation,
        scales.deadband_digits,
    ];
    if scales.internal > MAX_SCALE || display.iter().any(|&s| s > MAX_SCALE) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "scales must be <= 18",
        )));
    }
    if display[..4].iter().any(|&s| s > scales.internal) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "internal scale must be >= every display scale",
        )));
    }

    // ── Precompute ───────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let now = clock.now();

    Ok(TachoCore {
        driver,
        encoder: EncoderTracker::new(encoder.granularity),
        lap: LapWindow::new(now, encoder.lap_factor(), scales.lap_time),
        speed: SpeedEstimator::new(
            encoder.pulses_per_rev,
            scales.internal,
            scales.speed,
            scales.deadband_digits,
        ),
        clock,
        table,
        scales,
        pulses_per_rev: i64::from(encoder.pulses_per_rev),
        set_point: 0,
        counter: 0,
        positions: [0, 0],
        deltas: DeltaRing::new(),
        phase: Phase::AwaitingFirstTick,
    })
}

/// Build a statically-dispatched `TachoCore` from a concrete driver.
///
/// The caller owns serialization; wrap it in a mutex when edges arrive from
/// more than one thread.
pub fn build_core<D: MotorDriver>(
    driver: D,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    encoder: EncoderCfg,
    scales: ScaleCfg,
    set_points: SetPointCfg,
) -> Result<TachoCore<D>> {
    let table = SetPointTable::build(&set_points)?;
    validate_and_build(driver, clock, encoder, scales, table)
}
