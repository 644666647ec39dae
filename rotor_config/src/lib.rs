#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the tachometer rig.
//!
//! `Config` and its sections are deserialized from TOML and checked by
//! [`Config::validate`]. Every section except `[pins]` has defaults matching
//! the reference rig: a 400-pulse encoder, a DRV8830 at 0x60 on I2C bus 1, and
//! a one-second NE555 reference clock.
use serde::Deserialize;

/// Largest fractional-digit count any scale may use.
pub const MAX_SCALE: u32 = 18;

/// Largest set-point magnitude the driver's voltage register can express.
pub const MAX_MAGNITUDE: u32 = 63;

/// Fastest simulated encoder, in pulses per second.
pub const MAX_SIM_PPS: u32 = 1_000_000;

/// BCM GPIO numbers.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    /// Reference clock output.
    pub clock: u8,
    /// Encoder channel A; leading edges are counted.
    pub primary: u8,
    /// Encoder channel B; sampled on each primary edge for direction.
    pub secondary: u8,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Driver {
    pub i2c_bus: u8,
    /// 7-bit slave address.
    pub address: u16,
}

impl Default for Driver {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Encoder {
    pub pulses_per_rev: u32,
    /// Pulses per measurement window; must divide `pulses_per_rev`.
    pub granularity: u32,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            pulses_per_rev: 400,
            granularity: 100,
        }
    }
}

/// Fractional digits of each reported quantity.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Scales {
    pub internal: u32,
    pub speed: u32,
    pub cycle_time: u32,
    pub lap_time: u32,
    pub rotation: u32,
    /// Speeds below `10^-deadband_digits` are reported as zero.
    pub deadband_digits: u32,
}

impl Default for Scales {
    fn default() -> Self {
        Self {
            internal: 6,
            speed: 3,
            cycle_time: 3,
            lap_time: 3,
            rotation: 3,
            deadband_digits: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    /// Display values equal register values: -31 … 31.
    #[default]
    Raw,
    /// Display values are register / magnitude: -1 … 1.
    Normalized,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SetPoint {
    pub magnitude: u32,
    pub scale: u32,
    pub display: Display,
}

impl Default for SetPoint {
    fn default() -> Self {
        Self {
            magnitude: 31,
            scale: 5,
            display: Display::Raw,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters of the simulated rig used when no hardware is present.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Simulation {
    /// Reference clock period.
    pub cycle_ms: u64,
    /// Encoder pulses per second at full set-point.
    pub full_speed_pps: u32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            cycle_ms: 1000,
            full_speed_pps: 400,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub driver: Driver,
    #[serde(default)]
    pub encoder: Encoder,
    #[serde(default)]
    pub scales: Scales,
    #[serde(default)]
    pub set_point: SetPoint,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub simulation: Simulation,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        if p.clock == p.primary || p.clock == p.secondary || p.primary == p.secondary {
            eyre::bail!("pins.clock, pins.primary and pins.secondary must be distinct");
        }

        // Driver
        if self.driver.address > 0x7f {
            eyre::bail!("driver.address must be a 7-bit address (<= 0x7f)");
        }

        // Encoder
        let e = &self.encoder;
        if e.pulses_per_rev == 0 {
            eyre::bail!("encoder.pulses_per_rev must be > 0");
        }
        if e.granularity == 0 {
            eyre::bail!("encoder.granularity must be > 0");
        }
        if e.pulses_per_rev % e.granularity != 0 {
            eyre::bail!(
                "encoder.granularity ({}) must evenly divide encoder.pulses_per_rev ({})",
                e.granularity,
                e.pulses_per_rev
            );
        }

        // Scales
        let s = &self.scales;
        for (name, v) in [
            ("internal", s.internal),
            ("speed", s.speed),
            ("cycle_time", s.cycle_time),
            ("lap_time", s.lap_time),
            ("rotation", s.rotation),
            ("deadband_digits", s.deadband_digits),
        ] {
            if v > MAX_SCALE {
                eyre::bail!("scales.{name} must be <= {MAX_SCALE}");
            }
        }
        for (name, v) in [
            ("speed", s.speed),
            ("cycle_time", s.cycle_time),
            ("lap_time", s.lap_time),
            ("rotation", s.rotation),
        ] {
            if v > s.internal {
                eyre::bail!("scales.{name} must be <= scales.internal ({})", s.internal);
            }
        }

        // Set-points
        let sp = &self.set_point;
        if sp.magnitude == 0 || sp.magnitude > MAX_MAGNITUDE {
            eyre::bail!("set_point.magnitude must be in 1..={MAX_MAGNITUDE}");
        }
        if sp.scale > MAX_SCALE {
            eyre::bail!("set_point.scale must be <= {MAX_SCALE}");
        }
        if sp.display == Display::Normalized && 10u64.pow(sp.scale) < u64::from(sp.magnitude) {
            eyre::bail!("set_point.scale too small to tell normalized set-points apart");
        }

        // Logging
        if self
            .logging
            .rotation
            .as_deref()
            .is_some_and(|r| !matches!(r, "never" | "daily" | "hourly"))
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        // Simulation
        if self.simulation.cycle_ms == 0 {
            eyre::bail!("simulation.cycle_ms must be >= 1");
        }
        if self.simulation.full_speed_pps == 0 || self.simulation.full_speed_pps > MAX_SIM_PPS {
            eyre::bail!("simulation.full_speed_pps must be in 1..={MAX_SIM_PPS}");
        }

        Ok(())
    }
}
