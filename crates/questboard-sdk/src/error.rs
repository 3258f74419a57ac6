use thiserror::Error;

pub type SdkResult<T> = Result<T, SdkError>;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Account data too short: {len} bytes")]
    AccountDataTooShort { len: usize },

    #[error("Account discriminator mismatch: expected {expected} account")]
    DiscriminatorMismatch { expected: &'static str },

    #[error("Borsh error: {0}")]
    Borsh(#[from] std::io::Error),

    #[error("Quest id is {len} bytes, on-chain limit is {max}")]
    QuestIdTooLong { len: usize, max: usize },

    #[error("Too many supported token mints: {count} (max: {max})")]
    TooManySupportedMints { count: usize, max: usize },

    #[error("Transaction has no instructions")]
    NoInstructions,

    #[error("Transaction encoding failed: {0}")]
    Encode(String),

    #[error("Transaction decoding failed: {0}")]
    Decode(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
}
