use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Follow,
    Tweet,
    Retweet,
    Reply,
    QuoteTweet,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        TaskType::Follow,
        TaskType::Tweet,
        TaskType::Retweet,
        TaskType::Reply,
        TaskType::QuoteTweet,
    ];

    /// Content tasks go through a compose-and-confirm step before the backend hears of them.
    pub fn is_content(&self) -> bool {
        matches!(self, TaskType::Tweet | TaskType::Reply | TaskType::QuoteTweet)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::Follow => "follow",
            TaskType::Tweet => "tweet",
            TaskType::Retweet => "retweet",
            TaskType::Reply => "reply",
            TaskType::QuoteTweet => "quote_tweet",
        };
        f.write_str(name)
    }
}

/// Client-visible status of one task for the viewing user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    UnderReview,
    Completed,
    Rejected,

    /// Verified, but the user has no token account to receive the reward
    #[serde(rename = "missingATA")]
    MissingAta,
}

impl TaskStatus {
    /// Done from the user's side; `MissingAta` still blocks payout.
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::MissingAta)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Todo => "todo",
            TaskStatus::UnderReview => "under review",
            TaskStatus::Completed => "completed",
            TaskStatus::Rejected => "rejected",
            TaskStatus::MissingAta => "missing token account",
        };
        f.write_str(name)
    }
}

/// What an intent URL is assembled from. Every field is optional; intents fall back
/// when one they need is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDetails {
    /// Account to follow, or the author of the tweet to retweet/reply/quote
    pub target_handle: Option<String>,
    pub tweet_id: Option<String>,
    pub text: Option<String>,
    pub cashtag: Option<String>,
    pub hashtag: Option<String>,
    pub mention: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub task_type: TaskType,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub details: TaskDetails,
}

impl Task {
    pub fn new(task_id: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            task_id: task_id.into(),
            task_type,
            status: TaskStatus::Todo,
            details: TaskDetails::default(),
        }
    }

    pub fn with_details(mut self, details: TaskDetails) -> Self {
        self.details = details;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::UnderReview).unwrap(),
            "\"under_review\""
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"missingATA\"").unwrap(),
            TaskStatus::MissingAta
        );
        assert_eq!(
            serde_json::from_str::<TaskType>("\"quote_tweet\"").unwrap(),
            TaskType::QuoteTweet
        );
    }

    #[test]
    fn test_task_defaults_when_fields_absent() {
        let task: Task =
            serde_json::from_str(r#"{"task_id": "t1", "task_type": "follow"}"#).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.details, TaskDetails::default());
    }

    #[test]
    fn test_content_task_types() {
        let content: Vec<_> = TaskType::ALL.into_iter().filter(|t| t.is_content()).collect();
        assert_eq!(
            content,
            vec![TaskType::Tweet, TaskType::Reply, TaskType::QuoteTweet]
        );
    }
}
