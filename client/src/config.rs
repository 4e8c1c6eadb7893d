//! Session configuration

use std::time::Duration;

use duet_battle::SwitchMode;
use serde::{Deserialize, Serialize};

/// Linear backoff for re-establishing a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(rename = "baseDelayMs", with = "millis")]
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Delay before the retry that follows failure number `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Configuration for a [`BattleSession`](crate::BattleSession)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub retry: RetryPolicy,

    /// How this client picks replacements after a faint
    pub switch_mode: SwitchMode,

    /// Start the push subscription on connect
    pub subscribe: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            switch_mode: SwitchMode::PromptRequired,
            subscribe: true,
        }
    }
}

impl SyncConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_switch_mode(mut self, mode: SwitchMode) -> Self {
        self.switch_mode = mode;
        self
    }

    pub fn with_subscribe(mut self, subscribe: bool) -> Self {
        self.subscribe = subscribe;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.retry.base_delay, Duration::from_millis(500));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.switch_mode, SwitchMode::PromptRequired);
    }

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::new(Duration::from_millis(200), 5);
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            SyncConfig::from_json(r#"{ "retry": { "baseDelayMs": 250, "maxAttempts": 3 } }"#).unwrap();
        assert_eq!(config.retry, RetryPolicy::new(Duration::from_millis(250), 3));
        assert!(config.subscribe);

        let config = SyncConfig::from_json(r#"{ "switchMode": "automatic" }"#).unwrap();
        assert_eq!(config.switch_mode, SwitchMode::Automatic);
    }

    #[test]
    fn test_builders() {
        let config = SyncConfig::default()
            .with_switch_mode(SwitchMode::Automatic)
            .with_subscribe(false);
        assert_eq!(config.switch_mode, SwitchMode::Automatic);
        assert!(!config.subscribe);
    }
}
