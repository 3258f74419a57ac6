use solana_sdk::{pubkey, pubkey::Pubkey};

/// Seed prefixes for PDA derivation
pub const GLOBAL_STATE_SEED: &[u8] = b"global_state";

pub const ESCROW_SEED: &[u8] = b"escrow";

pub const REWARD_CLAIMED_SEED: &[u8] = b"reward_claimed";

/// On-chain limit for `Quest::id`, in bytes.
pub const MAX_QUEST_ID_LENGTH: usize = 36;

/// `GlobalState` reserves room for this many supported mints.
pub const MAX_SUPPORTED_TOKEN_MINTS: usize = 10;

/// Largest serialized transaction the cluster accepts.
pub const MAX_TRANSACTION_SIZE: usize = 1232;

pub const DISCRIMINATOR_LEN: usize = 8;

pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("43RRcJN1k3kVRDx4i3dNHtCEaY7NCZeaPJe7p7u6vcUd");

pub const TOKEN_PROGRAM_ID: Pubkey = spl_token::ID;

pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = spl_associated_token_account::ID;

pub const USDC_MAINNET_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

pub const USDC_DEVNET_MINT: Pubkey = pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
