use std::time::Duration;

use serde::Deserialize;

use crate::error::EngineError;

const DEFAULT_DRAFT_DEBOUNCE_MS: u64 = 1_500;
const DEFAULT_COUNTER_POLL_MS: u64 = 5_000;
const DEFAULT_FIXED_WAGON_TYPE: &str = "HL";
const DEFAULT_MIN_SPLIT_GROUPS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Quiet interval before edits are written to the draft cache.
    pub draft_debounce_ms: u64,
    /// Interval between counter refreshes.
    pub counter_poll_ms: u64,
    /// Wagon type force-applied to every row of a fixed-type unit.
    pub fixed_wagon_type: String,
    /// Distinct group ids a multi-group parent needs before it may proceed.
    pub min_split_groups: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            draft_debounce_ms: DEFAULT_DRAFT_DEBOUNCE_MS,
            counter_poll_ms: DEFAULT_COUNTER_POLL_MS,
            fixed_wagon_type: DEFAULT_FIXED_WAGON_TYPE.to_string(),
            min_split_groups: DEFAULT_MIN_SPLIT_GROUPS,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.counter_poll_ms == 0 {
            return Err(EngineError::Config("counter_poll_ms must be positive".into()));
        }
        if self.min_split_groups < 2 {
            return Err(EngineError::Config("min_split_groups must be at least 2".into()));
        }
        if self.fixed_wagon_type.trim().is_empty() {
            return Err(EngineError::Config("fixed_wagon_type must not be blank".into()));
        }
        Ok(())
    }

    pub fn draft_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_debounce_ms)
    }

    pub fn counter_poll(&self) -> Duration {
        Duration::from_millis(self.counter_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.draft_debounce(), Duration::from_millis(1_500));
        assert_eq!(config.counter_poll(), Duration::from_secs(5));
    }

    #[test]
    fn partial_override() {
        let config = EngineConfig::from_toml_str(
            r#"
            draft_debounce_ms = 250
            fixed_wagon_type = "BCN"
            "#,
        )
        .unwrap();
        assert_eq!(config.draft_debounce_ms, 250);
        assert_eq!(config.fixed_wagon_type, "BCN");
        assert_eq!(config.counter_poll_ms, DEFAULT_COUNTER_POLL_MS);
    }

    #[test]
    fn rejects_single_group_split() {
        let err = EngineConfig::from_toml_str("min_split_groups = 1").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(EngineConfig::from_toml_str("poll = 3").is_err());
    }
}
