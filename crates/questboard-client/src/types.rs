/*!
# Client Data Types

Results and state reported by the submission pipeline and the quest orchestrator.
*/

use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// How far a submitted transaction got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Reached `confirmed` commitment within the polling window
    Confirmed,

    /// Submission was reported as a duplicate and the earlier copy landed without error
    AlreadyProcessed,

    /// Polling ran out; the transaction may still land
    Unconfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub signature: Signature,
    pub confirmation: Confirmation,
}

impl SubmittedTransaction {
    pub fn is_confirmed(&self) -> bool {
        !matches!(self.confirmation, Confirmation::Unconfirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateQuestParams {
    pub quest_id: String,
    pub token_mint: Pubkey,

    /// Base units of `token_mint`
    pub amount: u64,

    /// Unix seconds; must be in the future
    pub deadline: i64,
    pub max_winners: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedQuest {
    pub tx_hash: Signature,
    pub quest_account_address: Pubkey,
    pub escrow_account_address: Pubkey,

    /// Id stored on-chain
    pub quest_id: String,

    /// Id the caller asked for; differs from `quest_id` when it had to be hashed
    pub requested_quest_id: String,
    pub confirmation: Confirmation,
}

/// Stages of a single `create_quest` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestCreationStage {
    #[default]
    Idle,
    Validating,
    BuildingTransaction,
    Signing,
    Submitting,
    Confirming,
    Succeeded,

    /// Duplicate submission detected; checking whether the earlier copy landed
    RecoveringDuplicate,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaStatus {
    Existing(Pubkey),
    Created {
        address: Pubkey,
        signature: Signature,
    },
}

impl AtaStatus {
    pub fn address(&self) -> Pubkey {
        match self {
            AtaStatus::Existing(address) | AtaStatus::Created { address, .. } => *address,
        }
    }
}
