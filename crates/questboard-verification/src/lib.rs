/*!
# Questboard Verification

The participant side of a quest: starting social tasks, optimistic review state, timed
verification against the backend, and deciding whether a reward can be claimed.

- [`QuestSession`]: per-quest driver owning task state machines and timers
- [`machine`]: the per-task reducer shared by timer and server events
- [`QuestBackend`] / [`HttpQuestBackend`]: the REST endpoints consumed
- [`intents`]: X/Twitter intent URLs
- [`claim`]: claim gating
*/

pub mod backend;
pub mod claim;
pub mod config;
mod error;
pub mod intents;
pub mod machine;
pub mod session;
pub mod task;

pub use backend::{
    CreateUserTaskRequest, HttpQuestBackend, Page, Paginated, QuestBackend, QuestDetails,
    RewardChain, TaskCreation, TaskVerificationResult, VerifyQuestResponse,
};
pub use claim::{claim_action, ClaimAction, ClaimBlockReason, ClaimContext, TokenAccountProbe};
pub use config::VerificationConfig;
pub use error::{VerificationError, VerificationResult};
pub use intents::{compose_text, intent_url};
pub use session::{QuestSession, SessionEvent};
pub use task::{Task, TaskDetails, TaskStatus, TaskType};
