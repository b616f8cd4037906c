use ccfprims_wire::ccf::SC_MAX;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// DOCSIS Annex C default for "Number of Bytes Requested".
pub const DEFAULT_PIGGYBACK_MULTIPLIER: usize = 8;

/// Largest reassembly window worth keeping: one segment per sequence number.
pub const DEFAULT_MAX_WINDOW_SEGMENTS: usize = ccfprims_wire::SEQUENCE_SPACE as usize;

/// Packer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    /// Bytes per unit of the piggyback `request` field.
    pub piggyback_multiplier: usize,
    /// SID cluster ID stamped on every emitted segment.
    pub sid_cluster: u8,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            piggyback_multiplier: DEFAULT_PIGGYBACK_MULTIPLIER,
            sid_cluster: 0,
        }
    }
}

impl PackerConfig {
    pub fn validate(&self) -> Result<()> {
        validate_multiplier(self.piggyback_multiplier)?;
        if self.sid_cluster > SC_MAX {
            return Err(EngineError::InvalidConfig(format!(
                "sid_cluster {} exceeds {SC_MAX}",
                self.sid_cluster
            )));
        }
        Ok(())
    }
}

/// Unpacker settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackerConfig {
    /// Bytes per unit of the piggyback `request` field.
    pub piggyback_multiplier: usize,
    /// Drop window segments older than this many time units. `None` keeps
    /// them until their packet completes.
    pub stall_timeout: Option<f64>,
    /// Upper bound on buffered segments; the oldest arrivals go first.
    pub max_window_segments: usize,
}

impl Default for UnpackerConfig {
    fn default() -> Self {
        Self {
            piggyback_multiplier: DEFAULT_PIGGYBACK_MULTIPLIER,
            stall_timeout: None,
            max_window_segments: DEFAULT_MAX_WINDOW_SEGMENTS,
        }
    }
}

impl UnpackerConfig {
    pub fn validate(&self) -> Result<()> {
        validate_multiplier(self.piggyback_multiplier)?;
        if let Some(timeout) = self.stall_timeout {
            if !timeout.is_finite() || timeout <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "stall_timeout must be positive and finite, got {timeout}"
                )));
            }
        }
        if self.max_window_segments == 0 {
            return Err(EngineError::InvalidConfig(
                "max_window_segments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_multiplier(multiplier: usize) -> Result<()> {
    if multiplier == 0 {
        return Err(EngineError::InvalidConfig(
            "piggyback_multiplier must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        PackerConfig::default().validate().unwrap();
        UnpackerConfig::default().validate().unwrap();
        assert_eq!(UnpackerConfig::default().max_window_segments, 8192);
    }

    #[test]
    fn test_rejects_zero_multiplier() {
        let config = PackerConfig {
            piggyback_multiplier: 0,
            ..PackerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_wide_sid_cluster() {
        let config = PackerConfig {
            sid_cluster: 8,
            ..PackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_timeout_and_window() {
        for timeout in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = UnpackerConfig {
                stall_timeout: Some(timeout),
                ..UnpackerConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {timeout}");
        }

        let config = UnpackerConfig {
            max_window_segments: 0,
            ..UnpackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: UnpackerConfig =
            serde_json::from_str(r#"{"stall_timeout": 2.5}"#).unwrap();
        assert_eq!(config.stall_timeout, Some(2.5));
        assert_eq!(config.piggyback_multiplier, DEFAULT_PIGGYBACK_MULTIPLIER);
        config.validate().unwrap();
    }
}
