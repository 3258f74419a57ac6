//! Test support for Questboard: an in-memory ledger that executes the escrow program's
//! instructions, scripted wallet and backend doubles, and a ready-made fixture.

mod mock_backend;
mod mock_rpc;
mod mock_wallet;
mod recording_notifier;
mod test_fixture;

pub use {
    mock_backend::MockBackend,
    mock_rpc::{
        MockRpc, SendBehavior, ERR_INSUFFICIENT_FUNDS, ERR_NOT_INITIALIZED, ERR_PROGRAM_PAUSED,
        ERR_UNSUPPORTED_MINT,
    },
    mock_wallet::{MockWalletProvider, WalletShape},
    recording_notifier::RecordingNotifier,
    test_fixture::{fast_readiness, TestContract, TestFixture},
};

use {
    sha2::{Digest, Sha256},
    solana_sdk::{
        pubkey::Pubkey,
        signature::{keypair_from_seed, Keypair, Signer},
    },
};

pub const TEST_MINT_DECIMALS: u8 = 6;
pub const TEST_CREATOR_BALANCE: u64 = 1_000_000_000; // 1,000 USDC
pub const TEST_REWARD_AMOUNT: u64 = 100_000_000; // 100 USDC
pub const TEST_MAX_WINNERS: u32 = 10;

/// Same identifier, same keypair, across runs.
pub fn deterministic_keypair(identifier: &str) -> Keypair {
    let seed = Sha256::digest(identifier.as_bytes());
    keypair_from_seed(&seed).expect("SHA256 output should always be valid seed")
}

pub fn deterministic_pubkey(identifier: &str) -> Pubkey {
    deterministic_keypair(identifier).pubkey()
}
