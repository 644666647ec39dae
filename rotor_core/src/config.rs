//! Runtime configuration for the tachometer engine.
//!
//! These are separate from the TOML-deserialized config in `rotor_config`;
//! see `conversions.rs` for the mapping.

/// Encoder geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderCfg {
    /// Primary channel pulses per shaft revolution.
    pub pulses_per_rev: u32,
    /// Pulses between two measurement boundaries. Must divide `pulses_per_rev`.
    pub granularity: u32,
}

impl EncoderCfg {
    /// Measurement windows per revolution; scales a lap window to a full lap.
    pub fn lap_factor(&self) -> u32 {
        self.pulses_per_rev / self.granularity.max(1)
    }
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            pulses_per_rev: 400,
            granularity: 100,
        }
    }
}

/// Fractional digits for each derived quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleCfg {
    /// Intermediate division precision.
    pub internal: u32,
    pub speed: u32,
    pub cycle_time: u32,
    pub lap_time: u32,
    pub rotation: u32,
    /// Speeds smaller than one unit at this many digits read as zero.
    pub deadband_digits: u32,
}

impl Default for ScaleCfg {
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

/// How set-point display values relate to register values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// Display value equals the register value.
    #[default]
    Raw,
    /// Display value is `register / magnitude`, floored at the display scale.
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPointCfg {
    /// Largest register magnitude M; the table holds `2M + 1` entries.
    pub magnitude: u32,
    /// Fractional digits of display values.
    pub scale: u32,
    pub display: DisplayMode,
}

impl Default for SetPointCfg {
    fn default() -> Self {
        Self {
            magnitude: 31,
            scale: 5,
            display: DisplayMode::Raw,
        }
    }
}
