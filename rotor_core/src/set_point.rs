//! Discrete operator set-points and their driver register values.
//!
//! The table holds `2M + 1` display values in strictly increasing order,
//! symmetric about a zero center. Entry `i` maps to register `i - M`, so the
//! center maps to 0 and the ends map to `-M` and `+M`.

use crate::config::{DisplayMode, SetPointCfg};
use crate::error::{BuildError, Result};
use crate::fixed_point::{Fixed, MAX_SCALE};

pub use rotor_config::MAX_MAGNITUDE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPointTable {
    values: Vec<Fixed>,
    magnitude: i32,
}

impl SetPointTable {
    /// Build the table described by `cfg`.
    pub fn build(cfg: &SetPointCfg) -> Result<Self> {
        if cfg.magnitude == 0 || cfg.magnitude > MAX_MAGNITUDE {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "set-point magnitude must be in 1..=63",
            )));
        }
        if cfg.scale > MAX_SCALE {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "set-point scale must be <= 18",
            )));
        }
        let m = i64::from(cfg.magnitude);
        let one = 10i128.pow(cfg.scale);
        let positive = |r: i64| {
            let units = match cfg.display {
                DisplayMode::Raw => i128::from(r) * one,
                // floor of a non-negative quotient
                DisplayMode::Normalized => i128::from(r) * one / i128::from(m),
            };
            i64::try_from(units).ok().map(|u| Fixed::new(u, cfg.scale))
        };
        let values = (-m..=m)
            .map(|r| if r < 0 { positive(-r).map(|v| -v) } else { positive(r) })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                eyre::Report::new(BuildError::InvalidConfig(
                    "set-point values overflow at this scale",
                ))
            })?;
        Self::from_values(values)
    }

    /// Build from an explicit sequence of display values.
    ///
    /// The sequence must have odd length, be strictly increasing, be symmetric
    /// about its center, and have a zero center.
    pub fn from_values(values: Vec<Fixed>) -> Result<Self> {
        if values.len() % 2 == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "set-point table needs an odd number of entries",
            )));
        }
        if values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "set-point values must be strictly increasing",
            )));
        }
        let n = values.len();
        if (0..n / 2).any(|i| values[i] != -values[n - 1 - i]) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "set-point values must be symmetric about zero",
            )));
        }
        if !values[n / 2].is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "set-point center must be zero",
            )));
        }
        let magnitude = i32::try_from(n / 2).map_err(|_| {
            eyre::Report::new(BuildError::InvalidConfig("set-point table too large"))
        })?;
        Ok(Self { values, magnitude })
    }

    /// Register value for a display value; `None` when it is not in the table.
    pub fn lookup(&self, display: Fixed) -> Option<i32> {
        let idx = self.values.binary_search(&display).ok()?;
        i32::try_from(idx).ok().map(|i| i - self.magnitude)
    }

    /// Display value for a register value; `None` when out of range.
    pub fn display_for(&self, register: i32) -> Option<Fixed> {
        let idx = usize::try_from(register.checked_add(self.magnitude)?).ok()?;
        self.values.get(idx).copied()
    }

    /// The zero entry.
    #[inline]
    pub fn center(&self) -> Fixed {
        self.values[self.values.len() / 2]
    }

    #[inline]
    pub fn magnitude(&self) -> i32 {
        self.magnitude
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(display, register)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Fixed, i32)> + '_ {
        self.values
            .iter()
            .zip(-self.magnitude..=self.magnitude)
            .map(|(v, r)| (*v, r))
    }
}

impl Default for SetPointTable {
    fn default() -> Self {
        let m: i32 = 31;
        Self {
            values: (-m..=m)
                .map(|r| Fixed::new(i64::from(r) * 100_000, 5))
                .collect(),
            magnitude: m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(s: &str) -> Fixed {
        s.parse().unwrap()
    }

    #[test]
    fn default_table_has_sixty_three_entries() {
        let t = SetPointTable::build(&SetPointCfg::default()).unwrap();
        assert_eq!(t.len(), 63);
        assert_eq!(t.center(), Fixed::ZERO);
        assert_eq!(t.lookup(Fixed::ZERO), Some(0));
        assert_eq!(t.lookup(fx("31.00000")), Some(31));
        assert_eq!(t.lookup(fx("-31")), Some(-31));
        assert_eq!(t, SetPointTable::default());
    }

    #[test]
    fn unknown_value_is_none() {
        let t = SetPointTable::default();
        assert_eq!(t.lookup(fx("0.5")), None);
        assert_eq!(t.lookup(fx("32")), None);
        assert_eq!(t.display_for(32), None);
        assert_eq!(t.display_for(-32), None);
    }

    #[test]
    fn normalized_display_floors_toward_zero_symmetrically() {
        let cfg = SetPointCfg {
            display: DisplayMode::Normalized,
            ..SetPointCfg::default()
        };
        let t = SetPointTable::build(&cfg).unwrap();
        assert_eq!(t.display_for(1).unwrap().to_string(), "0.03225");
        assert_eq!(t.display_for(-1).unwrap().to_string(), "-0.03225");
        assert_eq!(t.display_for(31).unwrap().to_string(), "1.00000");
        assert_eq!(t.lookup(fx("-1")), Some(-31));
    }

    #[test]
    fn rejects_bad_sequences() {
        let seq = |v: &[i64]| v.iter().map(|&x| Fixed::from_int(x)).collect::<Vec<_>>();
        assert!(SetPointTable::from_values(seq(&[-1, 0])).is_err());
        assert!(SetPointTable::from_values(seq(&[-1, 0, 0])).is_err());
        assert!(SetPointTable::from_values(seq(&[-2, 0, 1])).is_err());
        assert!(SetPointTable::from_values(seq(&[-2, -1, 2])).is_err());
        assert!(SetPointTable::from_values(seq(&[-2, 0, 2])).is_ok());
    }

    #[test]
    fn rejects_out_of_range_magnitude() {
        let cfg = SetPointCfg {
            magnitude: 64,
            ..SetPointCfg::default()
        };
        assert!(SetPointTable::build(&cfg).is_err());
        let cfg = SetPointCfg {
            magnitude: 0,
            ..SetPointCfg::default()
        };
        assert!(SetPointTable::build(&cfg).is_err());
    }

    #[test]
    fn limits_match_config_validation() {
        let at = |magnitude, scale| SetPointCfg {
            magnitude,
            scale,
            ..SetPointCfg::default()
        };
        assert_eq!(MAX_MAGNITUDE, rotor_config::MAX_MAGNITUDE);
        assert_eq!(MAX_SCALE, rotor_config::MAX_SCALE);
        assert!(SetPointTable::build(&at(MAX_MAGNITUDE, 0)).is_ok());
        assert!(SetPointTable::build(&at(MAX_MAGNITUDE + 1, 0)).is_err());
        assert!(SetPointTable::build(&at(1, MAX_SCALE)).is_ok());
        assert!(SetPointTable::build(&at(1, MAX_SCALE + 1)).is_err());
    }

    #[test]
    fn iter_pairs_ascend_with_registers() {
        let t = SetPointTable::default();
        let pairs: Vec<_> = t.iter().collect();
        assert_eq!(pairs.first().map(|p| p.1), Some(-31));
        assert_eq!(pairs.last().map(|p| p.1), Some(31));
        assert!(pairs.iter().all(|(v, r)| *v == Fixed::from_int(i64::from(*r))));
    }
}
