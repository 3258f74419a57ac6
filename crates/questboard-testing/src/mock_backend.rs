use {
    async_trait::async_trait,
    questboard_verification::{
        CreateUserTaskRequest, Page, Paginated, QuestBackend, QuestDetails, TaskCreation,
        TaskStatus, TaskVerificationResult, VerificationError, VerificationResult,
        VerifyQuestResponse,
    },
    serde_json::Value,
    std::{
        collections::{HashMap, HashSet, VecDeque},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    },
};

fn backend_error(message: String) -> VerificationError {
    VerificationError::Backend {
        status: 500,
        message,
    }
}

/// In-memory quest backend. `create_user_task` is idempotent per (task, handle);
/// `verify_quest` answers from a script, falling back to an empty response.
#[derive(Default)]
pub struct MockBackend {
    quests: Mutex<HashMap<String, QuestDetails>>,
    user_tasks: Mutex<HashSet<(String, String)>>,
    verify_script: Mutex<VecDeque<Result<VerifyQuestResponse, String>>>,
    create_failure: Mutex<Option<String>>,

    create_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quest(self, details: QuestDetails) -> Self {
        self.quests
            .lock()
            .unwrap()
            .insert(details.id.clone(), details);
        self
    }

    pub fn script_verify(&self, response: Result<VerifyQuestResponse, String>) {
        self.verify_script.lock().unwrap().push_back(response);
    }

    /// Queue a successful verification answering `statuses` per task.
    pub fn script_statuses(&self, statuses: &[(&str, TaskStatus)]) {
        self.script_verify(Ok(VerifyQuestResponse {
            verification_results: statuses
                .iter()
                .map(|(task_id, status)| TaskVerificationResult {
                    task_id: task_id.to_string(),
                    status: *status,
                    message: None,
                    matched_tweet_ids: vec![],
                })
                .collect(),
            all_tasks_completed: statuses.iter().all(|(_, s)| *s == TaskStatus::Completed),
            user_tx_hash: None,
            user_tokens_earned: None,
        }));
    }

    /// Every following `create_user_task` fails with `message`.
    pub fn fail_create_with(&self, message: impl Into<String>) {
        *self.create_failure.lock().unwrap() = Some(message.into());
    }

    pub fn has_user_task(&self, task_id: &str, handle: &str) -> bool {
        self.user_tasks
            .lock()
            .unwrap()
            .contains(&(task_id.to_string(), handle.to_string()))
    }

    pub fn user_task_count(&self) -> usize {
        self.user_tasks.lock().unwrap().len()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestBackend for MockBackend {
    async fn create_user_task(
        &self,
        request: &CreateUserTaskRequest,
    ) -> VerificationResult<TaskCreation> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.create_failure.lock().unwrap().clone() {
            return Err(backend_error(message));
        }

        let inserted = self
            .user_tasks
            .lock()
            .unwrap()
            .insert((request.task_id.clone(), request.user_x_handle.clone()));
        Ok(if inserted {
            TaskCreation::Created
        } else {
            TaskCreation::AlreadyExists
        })
    }

    async fn verify_quest(
        &self,
        _quest_id: &str,
        _user_handle: &str,
    ) -> VerificationResult<VerifyQuestResponse> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);

        match self.verify_script.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(backend_error(message)),
            None => Ok(VerifyQuestResponse::default()),
        }
    }

    async fn get_quest_details(&self, quest_id: &str) -> VerificationResult<QuestDetails> {
        self.quests
            .lock()
            .unwrap()
            .get(quest_id)
            .cloned()
            .ok_or_else(|| VerificationError::Backend {
                status: 404,
                message: format!("quest {quest_id} not found"),
            })
    }

    async fn list_quests(&self, page: Page) -> VerificationResult<Paginated<QuestDetails>> {
        let mut quests: Vec<QuestDetails> = self.quests.lock().unwrap().values().cloned().collect();
        quests.sort_by(|a, b| a.id.cmp(&b.id));
        let total = quests.len() as u64;
        Ok(Paginated {
            items: quests
                .into_iter()
                .skip(page.start as usize)
                .take(page.limit as usize)
                .collect(),
            total,
        })
    }

    async fn get_quest_results(
        &self,
        _quest_id: &str,
        _page: Page,
    ) -> VerificationResult<Paginated<Value>> {
        Ok(Paginated {
            items: vec![],
            total: 0,
        })
    }
}
