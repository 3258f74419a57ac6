use crate::task::TaskType;
use std::time::Duration;

/// Timing of the optimistic verification flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    /// Delay between starting a task and the automatic verification call
    pub verify_delay: Duration,

    /// Replaces `verify_delay` for follow tasks when set
    pub follow_verify_delay: Option<Duration>,

    /// Gap between consecutive per-task notices of one verification response
    pub toast_stagger: Duration,
}

impl VerificationConfig {
    pub fn verify_delay_for(&self, task_type: TaskType) -> Duration {
        match (task_type, self.follow_verify_delay) {
            (TaskType::Follow, Some(delay)) => delay,
            _ => self.verify_delay,
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            verify_delay: Duration::from_secs(30),
            follow_verify_delay: None,
            toast_stagger: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_delay_for_every_task_type_by_default() {
        let config = VerificationConfig::default();
        for task_type in TaskType::ALL {
            assert_eq!(config.verify_delay_for(task_type), Duration::from_secs(30));
        }
    }

    #[test]
    fn test_follow_override() {
        let config = VerificationConfig {
            follow_verify_delay: Some(Duration::from_secs(120)),
            ..Default::default()
        };
        assert_eq!(
            config.verify_delay_for(TaskType::Follow),
            Duration::from_secs(120)
        );
        assert_eq!(
            config.verify_delay_for(TaskType::Retweet),
            Duration::from_secs(30)
        );
    }
}
