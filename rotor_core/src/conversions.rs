//! `From` implementations bridging `rotor_config` types to `rotor_core` types.

use crate::config::{DisplayMode, EncoderCfg, ScaleCfg, SetPointCfg};

// ── EncoderCfg ───────────────────────────────────────────────────────────────

impl From<&rotor_config::Encoder> for EncoderCfg {
    fn from(c: &rotor_config::Encoder) -> Self {
        Self {
            pulses_per_rev: c.pulses_per_rev,
            granularity: c.granularity,
        }
    }
}

// ── ScaleCfg ─────────────────────────────────────────────────────────────────

impl From<&rotor_config::Scales> for ScaleCfg {
    fn from(c: &rotor_config::Scales) -> Self {
        Self {
            internal: c.internal,
            speed: c.speed,
            cycle_time: c.cycle_time,
            lap_time: c.lap_time,
            rotation: c.rotation,
            deadband_digits: c.deadband_digits,
        }
    }
}

// ── SetPointCfg ──────────────────────────────────────────────────────────────

impl From<rotor_config::Display> for DisplayMode {
    fn from(d: rotor_config::Display) -> Self {
        match d {
            rotor_config::Display::Raw => DisplayMode::Raw,
            rotor_config::Display::Normalized => DisplayMode::Normalized,
        }
    }
}

impl From<&rotor_config::SetPoint> for SetPointCfg {
    fn from(c: &rotor_config::SetPoint) -> Self {
        Self {
            magnitude: c.magnitude,
            scale: c.scale,
            display: c.display.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_core_defaults() {
        assert_eq!(
            EncoderCfg::from(&rotor_config::Encoder::default()),
            EncoderCfg::default()
        );
        assert_eq!(
            ScaleCfg::from(&rotor_config::Scales::default()),
            ScaleCfg::default()
        );
        assert_eq!(
            SetPointCfg::from(&rotor_config::SetPoint::default()),
            SetPointCfg::default()
        );
    }
}
