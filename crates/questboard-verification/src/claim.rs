use crate::{
    backend::{QuestDetails, RewardChain},
    task::TaskStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use questboard_client::{ClientResult, QuestContract, SolanaRpc, WalletProvider};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimBlockReason {
    TasksIncomplete,
    QuestEnded,
    WinnerCapReached,

    /// Solana quest whose reward token is missing or not a mint address
    NoRewardMint,
}

/// What the claim control should offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimAction {
    Claim,
    CreateTokenAccount,
    AddWallet,
    Blocked(ClaimBlockReason),
    AlreadyClaimed { tx_hash: String },

    /// Winners are drawn; there is nothing to claim
    Raffle,
}

impl fmt::Display for ClaimAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimAction::Claim => f.write_str("claim available"),
            ClaimAction::CreateTokenAccount => f.write_str("create a token account first"),
            ClaimAction::AddWallet => f.write_str("add a wallet first"),
            ClaimAction::Blocked(ClaimBlockReason::TasksIncomplete) => {
                f.write_str("not every task is completed")
            }
            ClaimAction::Blocked(ClaimBlockReason::QuestEnded) => f.write_str("quest has ended"),
            ClaimAction::Blocked(ClaimBlockReason::WinnerCapReached) => {
                f.write_str("winner cap reached")
            }
            ClaimAction::Blocked(ClaimBlockReason::NoRewardMint) => {
                f.write_str("quest has no Solana reward mint")
            }
            ClaimAction::AlreadyClaimed { tx_hash } => write!(f, "already claimed in {tx_hash}"),
            ClaimAction::Raffle => f.write_str("raffle quests are not claimed"),
        }
    }
}

/// Everything the claim gate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimContext {
    pub statuses: Vec<TaskStatus>,
    pub user_tx_hash: Option<String>,
    pub is_raffle: bool,
    pub end_date: Option<DateTime<Utc>>,
    pub max_winners: Option<u32>,
    pub total_winners: u32,
    pub chain: RewardChain,
    pub wallet: Option<Pubkey>,

    /// `None` when not checked (or not applicable off Solana)
    pub has_reward_ata: Option<bool>,
}

impl ClaimContext {
    pub fn from_details(details: &QuestDetails) -> Self {
        Self {
            statuses: details.tasks.iter().map(|task| task.status).collect(),
            user_tx_hash: details.user_tx_hash.clone(),
            is_raffle: details.is_raffle,
            end_date: details.end_date,
            max_winners: details.max_winners,
            total_winners: details.total_winners,
            chain: details.chain,
            wallet: None,
            has_reward_ata: None,
        }
    }
}

pub fn claim_action(ctx: &ClaimContext, now: DateTime<Utc>) -> ClaimAction {
    if ctx.is_raffle {
        return ClaimAction::Raffle;
    }
    if let Some(tx_hash) = &ctx.user_tx_hash {
        return ClaimAction::AlreadyClaimed {
            tx_hash: tx_hash.clone(),
        };
    }
    if ctx.statuses.is_empty() || !ctx.statuses.iter().all(TaskStatus::is_done) {
        return ClaimAction::Blocked(ClaimBlockReason::TasksIncomplete);
    }
    if ctx.end_date.is_some_and(|end| now > end) {
        return ClaimAction::Blocked(ClaimBlockReason::QuestEnded);
    }
    if ctx.max_winners.is_some_and(|max| ctx.total_winners >= max) {
        return ClaimAction::Blocked(ClaimBlockReason::WinnerCapReached);
    }

    if ctx.chain == RewardChain::Solana {
        if ctx.wallet.is_none() {
            return ClaimAction::AddWallet;
        }
        let backend_saw_missing_ata = ctx.statuses.contains(&TaskStatus::MissingAta);
        if backend_saw_missing_ata || ctx.has_reward_ata != Some(true) {
            return ClaimAction::CreateTokenAccount;
        }
    }

    ClaimAction::Claim
}

/// Answers "does `owner` have an ATA for `mint`" for the claim gate.
#[async_trait]
pub trait TokenAccountProbe: Send + Sync {
    async fn has_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> ClientResult<bool>;
}

#[async_trait]
impl<R: SolanaRpc, P: WalletProvider> TokenAccountProbe for QuestContract<R, P> {
    async fn has_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> ClientResult<bool> {
        self.check_ata_exists(owner, mint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ready() -> ClaimContext {
        ClaimContext {
            statuses: vec![TaskStatus::Completed, TaskStatus::Completed],
            user_tx_hash: None,
            is_raffle: false,
            end_date: Some(Utc::now() + Duration::days(1)),
            max_winners: Some(10),
            total_winners: 3,
            chain: RewardChain::Solana,
            wallet: Some(Pubkey::new_unique()),
            has_reward_ata: Some(true),
        }
    }

    #[test]
    fn test_claim_when_everything_lines_up() {
        assert_eq!(claim_action(&ready(), Utc::now()), ClaimAction::Claim);
    }

    #[test]
    fn test_missing_ata_offers_token_account_creation() {
        let ctx = ClaimContext {
            has_reward_ata: Some(false),
            ..ready()
        };
        assert_eq!(claim_action(&ctx, Utc::now()), ClaimAction::CreateTokenAccount);

        let unchecked = ClaimContext {
            has_reward_ata: None,
            ..ready()
        };
        assert_eq!(
            claim_action(&unchecked, Utc::now()),
            ClaimAction::CreateTokenAccount
        );

        let flagged_by_backend = ClaimContext {
            statuses: vec![TaskStatus::Completed, TaskStatus::MissingAta],
            ..ready()
        };
        assert_eq!(
            claim_action(&flagged_by_backend, Utc::now()),
            ClaimAction::CreateTokenAccount
        );
    }

    #[test]
    fn test_blocked_states() {
        let now = Utc::now();

        let incomplete = ClaimContext {
            statuses: vec![TaskStatus::Completed, TaskStatus::UnderReview],
            ..ready()
        };
        assert_eq!(
            claim_action(&incomplete, now),
            ClaimAction::Blocked(ClaimBlockReason::TasksIncomplete)
        );

        let ended = ClaimContext {
            end_date: Some(now - Duration::seconds(1)),
            ..ready()
        };
        assert_eq!(
            claim_action(&ended, now),
            ClaimAction::Blocked(ClaimBlockReason::QuestEnded)
        );

        let full = ClaimContext {
            total_winners: 10,
            ..ready()
        };
        assert_eq!(
            claim_action(&full, now),
            ClaimAction::Blocked(ClaimBlockReason::WinnerCapReached)
        );

        let no_wallet = ClaimContext {
            wallet: None,
            ..ready()
        };
        assert_eq!(claim_action(&no_wallet, now), ClaimAction::AddWallet);
    }

    #[test]
    fn test_paid_and_raffle_quests() {
        let paid = ClaimContext {
            user_tx_hash: Some("5sig".to_string()),
            ..ready()
        };
        assert_eq!(
            claim_action(&paid, Utc::now()),
            ClaimAction::AlreadyClaimed {
                tx_hash: "5sig".to_string()
            }
        );

        let raffle = ClaimContext {
            is_raffle: true,
            ..ready()
        };
        assert_eq!(claim_action(&raffle, Utc::now()), ClaimAction::Raffle);
    }

    #[test]
    fn test_base_rewards_skip_solana_checks() {
        let ctx = ClaimContext {
            chain: RewardChain::Base,
            wallet: None,
            has_reward_ata: None,
            ..ready()
        };
        assert_eq!(claim_action(&ctx, Utc::now()), ClaimAction::Claim);
    }
}
