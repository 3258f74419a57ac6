use questboard_sdk::SdkError;
use solana_sdk::{
    instruction::InstructionError, pubkey::Pubkey, signature::Signature,
    transaction::TransactionError,
};
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Failures raised while asking a wallet to sign.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Transaction rejected by user")]
    UserRejected,

    #[error("Insufficient funds to pay for this transaction")]
    InsufficientFunds,

    #[error("Transaction has no instructions")]
    MissingInstructions,

    #[error("Transaction has no recent blockhash")]
    MissingBlockhash,

    #[error("Transaction has no fee payer")]
    MissingFeePayer,

    #[error("Wallet returned signed transaction in unexpected format: {raw}")]
    UnexpectedFormat { raw: String },

    #[error("Wallet error: {0}")]
    Provider(String),
}

impl WalletError {
    /// Map a provider's free-form failure message onto a stable category.
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_ascii_lowercase();

        if lowered.contains("rejected") || lowered.contains("denied") || lowered.contains("cancel")
        {
            WalletError::UserRejected
        } else if lowered.contains("insufficient") {
            WalletError::InsufficientFunds
        } else {
            WalletError::Provider(message)
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Not ready, missing: {}", .missing.join(", "))]
    MissingDependencies { missing: Vec<&'static str> },

    #[error("Deadline {deadline} must be after current time {now}")]
    InvalidDeadline { deadline: i64, now: i64 },

    #[error("Reward amount must be greater than zero")]
    InvalidAmount,

    #[error("Max winners must be greater than zero")]
    InvalidMaxWinners,

    #[error("Token mint {mint} is not supported. Supported mints: [{}]", format_mints(.supported))]
    UnsupportedTokenMint { mint: Pubkey, supported: Vec<Pubkey> },

    #[error("Mint account {0} not found")]
    MintNotFound(Pubkey),

    #[error("Account {account} is owned by {owner}, which is not a token program")]
    NotATokenMint { account: Pubkey, owner: Pubkey },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction too large: {size} bytes (max: {max})")]
    TransactionTooLarge { size: usize, max: usize },

    #[error("Transaction {signature} failed on-chain: {error:?}")]
    TransactionFailed {
        signature: Signature,
        error: TransactionError,
    },

    #[error("Transaction {0} was reported as already processed but has no status; rebuild it with a fresh blockhash")]
    DuplicateUnresolved(Signature),

    #[error("A quest creation is already in flight")]
    QuestCreationInFlight,

    #[error("Wallet {wallet} is not the configured program admin")]
    NotAdmin { wallet: Pubkey },

    #[error("Program global state is not initialized")]
    ProgramNotInitialized,

    #[error("Program is paused")]
    ProgramPaused,

    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),
}

fn format_mints(mints: &[Pubkey]) -> String {
    mints
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ClientError {
    /// The network reports an "already processed" duplicate submission.
    pub fn is_already_processed(&self) -> bool {
        match self {
            ClientError::Rpc(e) => {
                matches!(e.get_transaction_error(), Some(TransactionError::AlreadyProcessed))
                    || e.to_string().contains("already been processed")
            }
            _ => false,
        }
    }

    /// The token program passed to an instruction does not own the account it touches.
    pub fn is_incorrect_program_id(&self) -> bool {
        match self {
            ClientError::TransactionFailed { error, .. } => is_incorrect_program_id(error),
            ClientError::Rpc(e) => {
                e.get_transaction_error()
                    .as_ref()
                    .is_some_and(is_incorrect_program_id)
                    || e.to_string().to_ascii_lowercase().contains("incorrect program id")
            }
            _ => false,
        }
    }
}

fn is_incorrect_program_id(error: &TransactionError) -> bool {
    matches!(
        error,
        TransactionError::InstructionError(_, InstructionError::IncorrectProgramId)
    )
}
