//! Broker configuration.
//!
//! Plain data with serde support so a host application can load it from
//! whatever configuration source it already uses. JSON is supported
//! directly through [`BrokerConfig::from_json_str`].

use serde::{Deserialize, Serialize};

use crate::{BrokerError, Result};

/// Where a newly registered subscriber's cursor starts.
///
/// Applies only when the subscriber is not yet registered on a partition.
/// Re-registering never moves an existing cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetReset {
    /// Start at offset 0 and replay everything already in the log.
    #[default]
    Earliest,

    /// Start at the current log length; only messages appended after
    /// registration are delivered.
    Latest,
}

/// Broker configuration.
///
/// # Example
///
/// ```
/// use mom_broker::{BrokerConfig, OffsetReset};
///
/// let config = BrokerConfig::from_json_str(r#"{ "offset_reset": "latest" }"#).unwrap();
/// assert_eq!(config.offset_reset, OffsetReset::Latest);
/// assert_eq!(config.default_partitions, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    // ---
    /// Starting position for cursors created by `subscribe`.
    ///
    /// Default: [`OffsetReset::Earliest`] (replay all).
    pub offset_reset: OffsetReset,

    /// Partition count used by
    /// [`Broker::create_topic_default`](crate::Broker::create_topic_default).
    ///
    /// Default: 1
    pub default_partitions: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            offset_reset: OffsetReset::Earliest,
            default_partitions: 1,
        }
    }
}

impl BrokerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Serialization`] on malformed JSON and
    /// [`BrokerError::InvalidConfiguration`] if the result fails
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        // ---
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the cursor start policy.
    pub fn with_offset_reset(mut self, reset: OffsetReset) -> Self {
        self.offset_reset = reset;
        self
    }

    /// Set the default partition count.
    pub fn with_default_partitions(mut self, count: u32) -> Self {
        self.default_partitions = count;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfiguration`] if `default_partitions`
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.default_partitions < 1 {
            return Err(BrokerError::InvalidConfiguration(
                "default_partitions must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let config = BrokerConfig::default();
        assert_eq!(config.offset_reset, OffsetReset::Earliest);
        assert_eq!(config.default_partitions, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        // ---
        let config = BrokerConfig::from_json_str(r#"{ "default_partitions": 4 }"#).unwrap();
        assert_eq!(config.default_partitions, 4);
        assert_eq!(config.offset_reset, OffsetReset::Earliest);
    }

    #[test]
    fn test_from_json_rejects_zero_partitions() {
        // ---
        let err = BrokerConfig::from_json_str(r#"{ "default_partitions": 0 }"#).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_from_json_malformed() {
        // ---
        let err = BrokerConfig::from_json_str("{ offset_reset: ").unwrap_err();
        assert!(matches!(err, BrokerError::Serialization(_)));
    }
}
