/*!
# Program Account Layouts

Borsh layouts of the escrow program's accounts. Every account starts with an 8-byte
discriminator, `sha256("account:<Name>")[..8]`, followed by the Borsh body. Accounts are
allocated at a fixed size, so decoding tolerates trailing zero bytes.
*/

use crate::{SdkError, SdkResult, DISCRIMINATOR_LEN};
use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    sighash("account", name)
}

pub fn instruction_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    sighash("global", name)
}

fn sighash(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut discriminator = [0u8; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    discriminator
}

pub trait ProgramAccount: BorshSerialize + BorshDeserialize {
    const NAME: &'static str;

    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(Self::NAME)
    }

    fn try_from_account_data(data: &[u8]) -> SdkResult<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(SdkError::AccountDataTooShort { len: data.len() });
        }
        if data[..DISCRIMINATOR_LEN] != Self::discriminator() {
            return Err(SdkError::DiscriminatorMismatch {
                expected: Self::NAME,
            });
        }

        let mut body = &data[DISCRIMINATOR_LEN..];
        Ok(Self::deserialize(&mut body)?)
    }

    fn to_account_data(&self) -> SdkResult<Vec<u8>> {
        let mut data = Self::discriminator().to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }
}

/// Program singleton, seed `[GLOBAL_STATE_SEED]`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct GlobalState {
    /// The only wallet allowed to mutate program configuration.
    pub owner: Pubkey,
    pub paused: bool,
    pub supported_token_mints: Vec<Pubkey>,

    /// Ids of every quest created so far.
    pub quests: Vec<String>,
}

impl GlobalState {
    pub fn supports_mint(&self, mint: &Pubkey) -> bool {
        self.supported_token_mints.contains(mint)
    }

    pub fn quest_count(&self) -> usize {
        self.quests.len()
    }
}

impl ProgramAccount for GlobalState {
    const NAME: &'static str = "GlobalState";
}

/// A quest lives at a freshly generated keypair address, not a PDA.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Quest {
    pub id: String,
    pub creator: Pubkey,
    pub token_mint: Pubkey,
    pub escrow_account: Pubkey,
    pub amount: u64,

    /// Unix seconds.
    pub deadline: i64,
    pub is_active: bool,
    pub total_winners: u32,
    pub total_reward_distributed: u64,
    pub max_winners: u32,
}

impl Quest {
    pub fn remaining_reward(&self) -> u64 {
        self.amount.saturating_sub(self.total_reward_distributed)
    }

    pub fn is_expired(&self, now_unix: i64) -> bool {
        now_unix >= self.deadline
    }

    pub fn is_full(&self) -> bool {
        self.total_winners >= self.max_winners
    }
}

impl ProgramAccount for Quest {
    const NAME: &'static str = "Quest";
}

/// Seed `[REWARD_CLAIMED_SEED, quest, winner]`. Its existence is the double-claim guard.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RewardClaimed {
    pub quest_id: String,
    pub winner: Pubkey,
    pub reward_amount: u64,
    pub claimed: bool,
}

impl ProgramAccount for RewardClaimed {
    const NAME: &'static str = "RewardClaimed";
}
