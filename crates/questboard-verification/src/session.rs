/*!
# Quest Session

Drives the verification flow of one quest for one viewing user. Owns the per-task state
machines and their timers; dropping the session cancels every pending timer and notice.

Timer firings arrive on an internal channel and are handled by
[`QuestSession::process_next_event`], so the session is the only writer of task state.
*/

use crate::{
    backend::{CreateUserTaskRequest, QuestBackend, QuestDetails, RewardChain, VerifyQuestResponse},
    claim::{claim_action, ClaimAction, ClaimBlockReason, ClaimContext, TokenAccountProbe},
    config::VerificationConfig,
    error::{VerificationError, VerificationResult},
    intents::{compose_text, intent_url},
    machine::{reduce, TaskEffect, TaskEvent, TaskState},
    task::{Task, TaskStatus},
};
use chrono::Utc;
use questboard_client::{Notice, Notifier};
use solana_sdk::pubkey::Pubkey;
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    VerifyTimerFired { task_id: String, generation: u64 },
}

struct TaskEntry {
    task: Task,
    state: TaskState,

    /// Bumped per scheduled timer; stale firings carry an older value
    generation: u64,
}

pub struct QuestSession<B> {
    details: QuestDetails,
    user_handle: String,
    backend: Arc<B>,
    notifier: Arc<dyn Notifier>,
    config: VerificationConfig,

    entries: Vec<TaskEntry>,
    drafts: HashMap<String, String>,
    timers: HashMap<String, JoinHandle<()>>,
    toasts: Vec<JoinHandle<()>>,

    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,

    user_tx_hash: Option<String>,
    tokens_earned: Option<f64>,
}

impl<B: QuestBackend> QuestSession<B> {
    pub fn new(
        details: QuestDetails,
        user_handle: impl Into<String>,
        backend: Arc<B>,
        notifier: Arc<dyn Notifier>,
        config: VerificationConfig,
    ) -> Self {
        let entries = details
            .tasks
            .iter()
            .map(|task| TaskEntry {
                task: task.clone(),
                state: TaskState::new(task.status),
                generation: 0,
            })
            .collect();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            user_tx_hash: details.user_tx_hash.clone(),
            details,
            user_handle: user_handle.into(),
            backend,
            notifier,
            config,
            entries,
            drafts: HashMap::new(),
            timers: HashMap::new(),
            toasts: vec![],
            events_tx,
            events_rx,
            tokens_earned: None,
        }
    }

    pub fn quest_id(&self) -> &str {
        &self.details.id
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().map(|entry| &entry.task)
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.entry(task_id).map(|entry| entry.state.status)
    }

    pub fn has_pending_timer(&self, task_id: &str) -> bool {
        self.entry(task_id)
            .is_some_and(|entry| entry.state.timer_pending)
            && self.timers.contains_key(task_id)
    }

    pub fn pending_timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn user_tx_hash(&self) -> Option<&str> {
        self.user_tx_hash.as_deref()
    }

    pub fn tokens_earned(&self) -> Option<f64> {
        self.tokens_earned
    }

    fn entry(&self, task_id: &str) -> Option<&TaskEntry> {
        self.entries.iter().find(|entry| entry.task.task_id == task_id)
    }

    fn entry_mut(&mut self, task_id: &str) -> VerificationResult<&mut TaskEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.task.task_id == task_id)
            .ok_or_else(|| VerificationError::UnknownTask(task_id.to_string()))
    }

    /// Start a follow or retweet task. Returns the intent URL to open.
    pub async fn start_task(&mut self, task_id: &str) -> VerificationResult<Url> {
        let task = self.entry_mut(task_id)?.task.clone();
        if task.task_type.is_content() {
            return Err(VerificationError::ContentConfirmationRequired(task.task_id));
        }
        self.begin(&task, None).await
    }

    /// First step of a content task: the text the user is asked to confirm or edit.
    /// Nothing reaches the backend until [`Self::confirm_content`].
    pub fn start_content_task(&mut self, task_id: &str) -> VerificationResult<String> {
        let task = &self.entry_mut(task_id)?.task;
        if !task.task_type.is_content() {
            return Err(VerificationError::NotAContentTask(task_id.to_string()));
        }

        let draft = compose_text(&task.details);
        self.drafts.insert(task_id.to_string(), draft.clone());
        Ok(draft)
    }

    /// Second step of a content task. `text` replaces the draft when given.
    pub async fn confirm_content(
        &mut self,
        task_id: &str,
        text: Option<String>,
    ) -> VerificationResult<Url> {
        let task = self.entry_mut(task_id)?.task.clone();
        let draft = self
            .drafts
            .get(task_id)
            .cloned()
            .ok_or_else(|| VerificationError::NoContentDraft(task_id.to_string()))?;

        let url = self.begin(&task, Some(text.unwrap_or(draft))).await?;
        self.drafts.remove(task_id);
        Ok(url)
    }

    async fn begin(&mut self, task: &Task, text: Option<String>) -> VerificationResult<Url> {
        let url = intent_url(task, text.as_deref())?;

        let status = self.status(&task.task_id).unwrap_or_default();
        if matches!(status, TaskStatus::Completed | TaskStatus::UnderReview) {
            debug!(task_id = %task.task_id, %status, "task already started");
            return Ok(url);
        }

        let request = CreateUserTaskRequest {
            task_id: task.task_id.clone(),
            user_x_handle: self.user_handle.clone(),
            task_status: TaskStatus::UnderReview,
        };
        if let Err(e) = self.backend.create_user_task(&request).await {
            warn!(task_id = %task.task_id, "creating user task failed: {}", e);
            self.notifier.notify(Notice::error(e.to_string()));
            return Err(e);
        }

        let verify_after = self.config.verify_delay_for(task.task_type);
        self.apply(&task.task_id, TaskEvent::Started { verify_after })?;
        info!(task_id = %task.task_id, task_type = %task.task_type, ?verify_after, "task started");
        Ok(url)
    }

    /// Feed `event` to the task's reducer and carry out the effects.
    /// Returns `true` when the reducer asked for a verification call.
    fn apply(&mut self, task_id: &str, event: TaskEvent) -> VerificationResult<bool> {
        let entry = self.entry_mut(task_id)?;
        let (state, effects) = reduce(entry.state, event);
        entry.state = state;
        entry.task.status = state.status;
        let task_type = entry.task.task_type;

        let mut request_verification = false;
        for effect in effects {
            match effect {
                TaskEffect::ScheduleVerify(delay) => self.schedule_verify(task_id, delay)?,
                TaskEffect::CancelTimer => self.cancel_timer(task_id),
                TaskEffect::RequestVerification => request_verification = true,
                // Announced by the caller, which knows the server's message
                TaskEffect::AnnounceStatus(status) => {
                    debug!(task_id, %task_type, %status, "task status changed")
                }
            }
        }
        Ok(request_verification)
    }

    fn schedule_verify(&mut self, task_id: &str, delay: Duration) -> VerificationResult<()> {
        self.cancel_timer(task_id);

        let entry = self.entry_mut(task_id)?;
        entry.generation += 1;
        let generation = entry.generation;

        let events = self.events_tx.clone();
        let event = SessionEvent::VerifyTimerFired {
            task_id: task_id.to_string(),
            generation,
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver is gone once the session is dropped
            let _ = events.send(event);
        });

        self.timers.insert(task_id.to_string(), handle);
        Ok(())
    }

    /// Cancels only `task_id`'s timer.
    pub fn cancel_timer(&mut self, task_id: &str) {
        if let Some(handle) = self.timers.remove(task_id) {
            handle.abort();
        }
    }

    /// Cancels every verification timer and any notice still waiting for its slot.
    pub fn cancel_all_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        for handle in self.toasts.drain(..) {
            handle.abort();
        }
    }

    /// Wait for the next timer event and handle it. `None` never happens while the
    /// session is alive; the sender half lives in the session itself.
    pub async fn process_next_event(&mut self) -> Option<SessionEvent> {
        let event = self.events_rx.recv().await?;
        self.handle_event(event.clone()).await;
        Some(event)
    }

    /// Handle every event already queued without waiting. Returns how many were handled.
    pub async fn process_ready_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::VerifyTimerFired {
                task_id,
                generation,
            } => {
                let current = self.entry(&task_id).map(|entry| entry.generation);
                if current != Some(generation) {
                    debug!(%task_id, generation, "ignoring stale verification timer");
                    return;
                }
                self.timers.remove(&task_id);

                match self.apply(&task_id, TaskEvent::VerifyTimerFired) {
                    Ok(true) => {
                        // Failures are already reported to the notifier
                        let _ = self.verify_now().await;
                    }
                    Ok(false) => {}
                    Err(e) => warn!(%task_id, "timer for unknown task: {}", e),
                }
            }
        }
    }

    /// Ask the backend to verify every task and reconcile with its answer. A failed call
    /// leaves task state untouched.
    pub async fn verify_now(&mut self) -> VerificationResult<VerifyQuestResponse> {
        let response = match self
            .backend
            .verify_quest(&self.details.id, &self.user_handle)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(quest_id = %self.details.id, "verification failed: {}", e);
                self.notifier.notify(Notice::error(e.to_string()));
                return Err(e);
            }
        };

        let mut notices = vec![];
        for result in &response.verification_results {
            let Some(previous) = self.status(&result.task_id) else {
                debug!(task_id = %result.task_id, "verification result for unknown task");
                continue;
            };
            self.apply(&result.task_id, TaskEvent::ServerStatus(result.status))?;
            if previous != result.status {
                notices.push(status_notice(result.status, result.message.as_deref()));
            }
        }

        if let Some(tx_hash) = &response.user_tx_hash {
            if self.user_tx_hash.as_ref() != Some(tx_hash) {
                info!(quest_id = %self.details.id, %tx_hash, "reward paid");
                let earned = response
                    .user_tokens_earned
                    .map(|tokens| format!("{tokens} tokens"))
                    .unwrap_or_else(|| "your reward".to_string());
                notices.push(Notice::success(format!("Reward sent: {earned}")));
                self.user_tx_hash = Some(tx_hash.clone());
                self.tokens_earned = response.user_tokens_earned;
            }
        }

        self.announce(notices);
        Ok(response)
    }

    /// First notice now, the rest `toast_stagger` apart.
    fn announce(&mut self, notices: Vec<Notice>) {
        self.toasts.retain(|handle| !handle.is_finished());

        for (i, notice) in notices.into_iter().enumerate() {
            if i == 0 {
                self.notifier.notify(notice);
                continue;
            }
            let delay = self.config.toast_stagger * i as u32;
            let notifier = self.notifier.clone();
            self.toasts.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                notifier.notify(notice);
            }));
        }
    }

    pub fn claim_context(&self, wallet: Option<Pubkey>) -> ClaimContext {
        ClaimContext {
            statuses: self.entries.iter().map(|entry| entry.state.status).collect(),
            user_tx_hash: self.user_tx_hash.clone(),
            wallet,
            ..ClaimContext::from_details(&self.details)
        }
    }

    /// What the claim control should offer `wallet`. Checks the reward ATA on Solana.
    pub async fn claim_action(
        &self,
        wallet: Option<Pubkey>,
        probe: &dyn TokenAccountProbe,
    ) -> VerificationResult<ClaimAction> {
        let mut ctx = self.claim_context(wallet);
        let mint = self.reward_mint();

        if let (RewardChain::Solana, Some(owner), Some(mint)) = (ctx.chain, wallet, mint) {
            ctx.has_reward_ata = Some(probe.has_token_account(&owner, &mint).await?);
        }

        // No mint means no token account could ever satisfy the gate
        match claim_action(&ctx, Utc::now()) {
            ClaimAction::CreateTokenAccount if mint.is_none() => {
                Ok(ClaimAction::Blocked(ClaimBlockReason::NoRewardMint))
            }
            action => Ok(action),
        }
    }

    fn reward_mint(&self) -> Option<Pubkey> {
        let mint = self.details.reward_token.as_deref()?;
        Pubkey::from_str(mint)
            .inspect_err(|e| warn!(%mint, "reward token is not a Solana address: {}", e))
            .ok()
    }

    /// Claim the reward through the verify endpoint, which pays out once every task is
    /// complete. Refused locally unless the gate says [`ClaimAction::Claim`].
    pub async fn claim(
        &mut self,
        wallet: Option<Pubkey>,
        probe: &dyn TokenAccountProbe,
    ) -> VerificationResult<VerifyQuestResponse> {
        let action = self.claim_action(wallet, probe).await?;
        if action != ClaimAction::Claim {
            info!(quest_id = %self.details.id, %action, "claim blocked");
            return Err(VerificationError::ClaimBlocked(action));
        }
        self.verify_now().await
    }
}

impl<B> Drop for QuestSession<B> {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        for handle in self.toasts.drain(..) {
            handle.abort();
        }
    }
}

fn status_notice(status: TaskStatus, message: Option<&str>) -> Notice {
    match status {
        TaskStatus::Completed => Notice::success(message.unwrap_or("Task completed")),
        TaskStatus::Rejected => Notice::error(format!(
            "Task rejected: {}",
            message.unwrap_or("verification failed")
        )),
        TaskStatus::MissingAta => Notice::warning(
            message.unwrap_or("Create a token account to receive your reward"),
        ),
        TaskStatus::Todo => Notice::warning(message.unwrap_or("Task not verified yet, try again")),
        TaskStatus::UnderReview => Notice::info(message.unwrap_or("Task under review")),
    }
}
