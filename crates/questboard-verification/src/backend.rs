/*!
# Quest Backend

The REST endpoints the verification flow consumes. [`QuestBackend`] is the seam;
[`HttpQuestBackend`] talks to a real server with `reqwest`.
*/

use crate::{
    error::{VerificationError, VerificationResult},
    task::{Task, TaskStatus},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

pub const ALREADY_HAS_TASK_MESSAGE: &str = "already has this task";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserTaskRequest {
    pub task_id: String,
    pub user_x_handle: String,
    pub task_status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCreation {
    Created,

    /// The record existed; treated the same as `Created`
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskVerificationResult {
    pub task_id: String,
    pub status: TaskStatus,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub matched_tweet_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VerifyQuestResponse {
    #[serde(default)]
    pub verification_results: Vec<TaskVerificationResult>,

    #[serde(default)]
    pub all_tasks_completed: bool,

    /// Reward payout transaction, present once every task is complete
    #[serde(default)]
    pub user_tx_hash: Option<String>,

    #[serde(default)]
    pub user_tokens_earned: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardChain {
    #[default]
    Solana,
    Base,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDetails {
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub chain: RewardChain,

    /// Reward token mint (Solana) or contract (Base)
    #[serde(default)]
    pub reward_token: Option<String>,

    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub max_winners: Option<u32>,

    #[serde(default)]
    pub total_winners: u32,

    #[serde(default)]
    pub is_raffle: bool,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub user_tx_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub start: u64,
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self { start: 0, limit: 20 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// The read endpoints answer in one of two envelopes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PaginatedWire<T> {
    Flat {
        data: Vec<T>,
        total: u64,
    },
    Nested {
        data: NestedPage<T>,
    },
}

#[derive(Debug, Deserialize)]
struct NestedPage<T> {
    results: Vec<T>,
    pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total: u64,
}

impl<T> From<PaginatedWire<T>> for Paginated<T> {
    fn from(wire: PaginatedWire<T>) -> Self {
        match wire {
            PaginatedWire::Flat { data, total } => Paginated { items: data, total },
            PaginatedWire::Nested { data } => Paginated {
                items: data.results,
                total: data.pagination.total,
            },
        }
    }
}

/// `{success, data, message}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,

    data: Option<T>,

    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
pub trait QuestBackend: Send + Sync {
    /// Idempotent: an existing record is reported as [`TaskCreation::AlreadyExists`].
    async fn create_user_task(
        &self,
        request: &CreateUserTaskRequest,
    ) -> VerificationResult<TaskCreation>;

    /// Verifies every task of the quest for `user_handle` and pays out once all are done.
    async fn verify_quest(
        &self,
        quest_id: &str,
        user_handle: &str,
    ) -> VerificationResult<VerifyQuestResponse>;

    async fn get_quest_details(&self, quest_id: &str) -> VerificationResult<QuestDetails>;

    async fn list_quests(&self, page: Page) -> VerificationResult<Paginated<QuestDetails>>;

    async fn get_quest_results(
        &self,
        quest_id: &str,
        page: Page,
    ) -> VerificationResult<Paginated<Value>>;
}

pub struct HttpQuestBackend {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpQuestBackend {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `segments` appended to the base URL's path, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> VerificationResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_paginated<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        page: Page,
    ) -> VerificationResult<Paginated<T>> {
        let url = self.endpoint(segments)?;
        let response = self
            .authorized(self.client.get(url))
            .query(&[("start", page.start), ("limit", page.limit)])
            .send()
            .await?;

        let body = success_body(response).await?;
        let wire: PaginatedWire<T> = serde_json::from_str(&body)?;
        Ok(wire.into())
    }
}

/// Body of a 2xx response, or `Backend` carrying the server's message.
async fn success_body(response: Response) -> VerificationResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    Err(VerificationError::Backend {
        status: status.as_u16(),
        message: server_message(&body),
    })
}

/// `message` or `error` field of a JSON error body, else the raw body.
fn server_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> VerificationResult<T> {
    if !envelope.success {
        return Err(VerificationError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "Request was not successful".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| VerificationError::Rejected("Response has no data".to_string()))
}

/// Maps the create-task response: 400 "already has this task" is success.
fn task_creation_outcome(status: StatusCode, body: &str) -> VerificationResult<TaskCreation> {
    if status.is_success() {
        return Ok(TaskCreation::Created);
    }

    let message = server_message(body);
    if status == StatusCode::BAD_REQUEST && message.contains(ALREADY_HAS_TASK_MESSAGE) {
        return Ok(TaskCreation::AlreadyExists);
    }

    Err(VerificationError::Backend {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl QuestBackend for HttpQuestBackend {
    async fn create_user_task(
        &self,
        request: &CreateUserTaskRequest,
    ) -> VerificationResult<TaskCreation> {
        let url = self.endpoint(&["api", "quests", "user-tasks", "create"])?;
        let response = self
            .authorized(self.client.post(url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let outcome = task_creation_outcome(status, &body)?;

        match outcome {
            TaskCreation::Created => info!(task_id = %request.task_id, "user task created"),
            TaskCreation::AlreadyExists => {
                debug!(task_id = %request.task_id, "user task already exists")
            }
        }
        Ok(outcome)
    }

    async fn verify_quest(
        &self,
        quest_id: &str,
        user_handle: &str,
    ) -> VerificationResult<VerifyQuestResponse> {
        let url = self.endpoint(&["api", "quests", "verification", "quest", quest_id, "verify"])?;
        let response = self
            .authorized(self.client.post(url))
            .json(&serde_json::json!({ "user_handle": user_handle }))
            .send()
            .await?;

        let body = success_body(response).await?;
        let envelope: Envelope<VerifyQuestResponse> = serde_json::from_str(&body)?;
        let verified = unwrap_envelope(envelope).inspect_err(|e| {
            warn!(%quest_id, "verification rejected: {}", e);
        })?;

        debug!(
            %quest_id,
            results = verified.verification_results.len(),
            all_tasks_completed = verified.all_tasks_completed,
            "quest verified"
        );
        Ok(verified)
    }

    async fn get_quest_details(&self, quest_id: &str) -> VerificationResult<QuestDetails> {
        let url = self.endpoint(&["api", "quests", quest_id, "details"])?;
        let response = self.authorized(self.client.get(url)).send().await?;

        let body = success_body(response).await?;
        let envelope: Envelope<QuestDetails> = serde_json::from_str(&body)?;
        unwrap_envelope(envelope)
    }

    async fn list_quests(&self, page: Page) -> VerificationResult<Paginated<QuestDetails>> {
        self.get_paginated(&["api", "quests", "list"], page).await
    }

    async fn get_quest_results(
        &self,
        quest_id: &str,
        page: Page,
    ) -> VerificationResult<Paginated<Value>> {
        self.get_paginated(&["api", "quests", quest_id, "results"], page)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_already_has_task_is_success() {
        let body = json!({ "message": "User already has this task" }).to_string();
        assert_eq!(
            task_creation_outcome(StatusCode::BAD_REQUEST, &body).unwrap(),
            TaskCreation::AlreadyExists
        );
        assert_eq!(
            task_creation_outcome(StatusCode::CREATED, "{}").unwrap(),
            TaskCreation::Created
        );
    }

    #[test]
    fn test_other_client_errors_surface() {
        let body = json!({ "error": "task not found" }).to_string();
        match task_creation_outcome(StatusCode::BAD_REQUEST, &body) {
            Err(VerificationError::Backend { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "task not found");
            }
            other => panic!("expected backend error, got {:?}", other),
        }

        // Same message under another status is still an error
        let body = json!({ "message": "already has this task" }).to_string();
        assert!(task_creation_outcome(StatusCode::INTERNAL_SERVER_ERROR, &body).is_err());
    }

    #[test]
    fn test_both_pagination_envelopes() {
        let flat: PaginatedWire<Value> =
            serde_json::from_value(json!({ "data": [{"id": "q1"}], "total": 7 })).unwrap();
        let flat: Paginated<Value> = flat.into();
        assert_eq!(flat.items.len(), 1);
        assert_eq!(flat.total, 7);

        let nested: PaginatedWire<Value> = serde_json::from_value(json!({
            "success": true,
            "data": { "results": [{"id": "q1"}, {"id": "q2"}], "pagination": { "total": 2, "start": 0 } }
        }))
        .unwrap();
        let nested: Paginated<Value> = nested.into();
        assert_eq!(nested.items.len(), 2);
        assert_eq!(nested.total, 2);
    }

    #[test]
    fn test_verify_envelope() {
        let envelope: Envelope<VerifyQuestResponse> = serde_json::from_value(json!({
            "success": true,
            "data": {
                "verification_results": [
                    { "task_id": "t1", "status": "completed", "matched_tweet_ids": ["123"] },
                    { "task_id": "t2", "status": "missingATA", "message": "create a token account" }
                ],
                "all_tasks_completed": false
            }
        }))
        .unwrap();

        let verified = unwrap_envelope(envelope).unwrap();
        assert_eq!(verified.verification_results[0].status, TaskStatus::Completed);
        assert_eq!(verified.verification_results[1].status, TaskStatus::MissingAta);
        assert!(verified.user_tx_hash.is_none());

        let rejected: Envelope<VerifyQuestResponse> =
            serde_json::from_value(json!({ "success": false, "message": "X API rate limited" }))
                .unwrap();
        assert_eq!(
            unwrap_envelope(rejected).unwrap_err().to_string(),
            "X API rate limited"
        );
    }

    #[test]
    fn test_quest_details_defaults() {
        let details: QuestDetails = serde_json::from_value(json!({
            "id": "q1",
            "end_date": "2030-01-01T00:00:00Z",
            "tasks": [{ "task_id": "t1", "task_type": "retweet", "details": { "tweet_id": "42" } }]
        }))
        .unwrap();
        assert_eq!(details.chain, RewardChain::Solana);
        assert!(!details.is_raffle);
        assert_eq!(details.tasks[0].details.tweet_id.as_deref(), Some("42"));
    }

    fn details_url(base: &str, quest_id: &str) -> String {
        let backend = HttpQuestBackend::new(Url::parse(base).unwrap());
        backend
            .endpoint(&["api", "quests", quest_id, "details"])
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_endpoint_segments() {
        assert_eq!(
            details_url("https://api.example.com", "q1"),
            "https://api.example.com/api/quests/q1/details"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        assert_eq!(
            details_url("https://host.example/backend/", "q1"),
            "https://host.example/backend/api/quests/q1/details"
        );
        assert_eq!(
            details_url("https://host.example/backend", "q1"),
            "https://host.example/backend/api/quests/q1/details"
        );
    }

    #[test]
    fn test_endpoint_encodes_quest_id() {
        let url = details_url("https://api.example.com/", "a/b?c#d");
        assert_eq!(url, "https://api.example.com/api/quests/a%2Fb%3Fc%23d/details");

        let parsed = Url::parse(&url).unwrap();
        assert!(parsed.query().is_none());
        assert!(parsed.fragment().is_none());
        assert_eq!(parsed.path_segments().unwrap().count(), 4);
    }
}
