use backoff::ExponentialBackoff;
use questboard_sdk::MAX_TRANSACTION_SIZE;
use std::time::Duration;

/// Configuration for transaction submission
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Signature status polls after submission before reporting "unconfirmed"
    pub confirmation_attempts: usize,

    /// Delay between confirmation polls
    pub confirmation_interval: Duration,

    /// Serialized transactions above this size are rejected before submission
    pub max_transaction_size_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confirmation_attempts: 5,
            confirmation_interval: Duration::from_secs(1),
            max_transaction_size_bytes: MAX_TRANSACTION_SIZE,
        }
    }
}

/// Configuration for `QuestContract::ensure_initialized`
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Back-off between readiness attempts; gives up once `max_elapsed_time` passes
    pub backoff: ExponentialBackoff,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            backoff: ExponentialBackoff {
                initial_interval: Duration::from_millis(250),
                max_interval: Duration::from_secs(1),
                max_elapsed_time: Some(Duration::from_secs(3)),
                multiplier: 2.0,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.confirmation_attempts, 5);
        assert_eq!(config.confirmation_interval, Duration::from_secs(1));
        assert_eq!(config.max_transaction_size_bytes, 1232);

        let readiness = ReadinessConfig::default();
        assert_eq!(readiness.backoff.max_elapsed_time, Some(Duration::from_secs(3)));
    }
}
