//! Harness configuration.
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::HarnessError;
use crate::sim::time::{SimTime, TimeUnit};

/// The minimum number of cycles the reset must be held.
pub const MIN_RESET_CYCLES: u64 = 2;

/// Timing of the reset sequence and the sweep, and the simulation horizon.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Half of the clock period, in `time_unit`.
    pub clock_half_period: u64,
    pub time_unit: TimeUnit,
    /// The number of cycles the reset is held asserted.
    pub reset_cycles: u64,
    /// The number of cycles between reset release and the first stimulus.
    pub settle_cycles: u64,
    /// The number of cycles held without sampling after each pattern.
    pub inter_pattern_cycles: u64,
    /// Drive `ena = 1` from the start instead of only after reset release.
    pub enable_during_reset: bool,
    /// The simulation horizon, in clock cycles.
    pub max_cycles: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            clock_half_period: 500,
            time_unit: TimeUnit::Ps,
            reset_cycles: 10,
            settle_cycles: 10,
            inter_pattern_cycles: 50,
            enable_during_reset: false,
            max_cycles: 1_000_000,
        }
    }
}

impl HarnessConfig {
    /// Check the configuration is consistent.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.clock_half_period == 0 {
            return Err(HarnessError::InvalidParameter(
                "Clock half-period must be positive".to_string(),
            ));
        }
        if self.reset_cycles < MIN_RESET_CYCLES {
            return Err(HarnessError::InvalidParameter(format!(
                "Reset must be held for at least {} cycles, got {}",
                MIN_RESET_CYCLES, self.reset_cycles
            )));
        }
        if self.max_cycles == 0 {
            return Err(HarnessError::InvalidParameter(
                "Simulation horizon must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn half_period(&self) -> SimTime {
        SimTime::new(self.clock_half_period, self.time_unit)
    }

    pub fn period(&self) -> SimTime {
        self.half_period() * 2
    }

    /// Returns the simulated time after which no event is processed.
    pub fn horizon(&self) -> SimTime {
        self.period() * self.max_cycles
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), HarnessError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<HarnessConfig, HarnessError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: HarnessConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        let config = HarnessConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.period(), SimTime::new(1, TimeUnit::Ns));
        assert_eq!(config.horizon(), SimTime::new(1_000, TimeUnit::Us));
    }

    #[test]
    fn test_invalid_reset_cycles() {
        let config = HarnessConfig {
            reset_cycles: 1,
            ..HarnessConfig::default()
        };
        assert!(matches!(config.validate(), Err(HarnessError::InvalidParameter(_))));
    }

    #[test]
    fn test_invalid_clock() {
        let config = HarnessConfig {
            clock_half_period: 0,
            ..HarnessConfig::default()
        };
        assert!(matches!(config.validate(), Err(HarnessError::InvalidParameter(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = HarnessConfig {
            clock_half_period: 5,
            time_unit: TimeUnit::Ns,
            enable_during_reset: true,
            ..HarnessConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(HarnessConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: HarnessConfig = serde_json::from_str(r#"{"reset_cycles": 4}"#).unwrap();
        assert_eq!(config.reset_cycles, 4);
        assert_eq!(config.settle_cycles, 10);
        assert_eq!(config.time_unit, TimeUnit::Ps);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"reset_cycles": 0}"#).unwrap();
        assert!(matches!(
            HarnessConfig::load_from(&path),
            Err(HarnessError::InvalidParameter(_))
        ));
    }
}
