/*!
# Wallet Adapter

Wraps a wallet provider's raw signing primitive into `sign_transaction` /
`sign_all_transactions`. Providers hand back the signed transaction in one of a few JSON
shapes; [`SignedPayload::decode`] recognizes exactly those and rejects everything else.
*/

use crate::errors::WalletError;
use async_trait::async_trait;
use questboard_sdk::{deserialize_transaction, serialize_transaction, Network};
use serde_json::{Map, Value};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use tracing::{debug, error};

/// Raw signing capability of an external wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn address(&self) -> Pubkey;

    /// Sign a serialized transaction for `chain` (e.g. `solana:devnet`). May wait on a human.
    async fn sign_transaction_raw(
        &self,
        chain: &str,
        serialized_transaction: Vec<u8>,
    ) -> Result<Value, WalletError>;
}

/// The shapes a provider may use for a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedPayload {
    /// `[1, 2, 3, ...]`
    RawBytes(Vec<u8>),

    /// `[[1, 2, 3, ...]]`
    WrappedArrayOfBytes(Vec<u8>),

    /// `[{"signedTransaction": [1, 2, ...]}]` or `[{"signedTransaction": {"0": 1, "1": 2}}]`
    WrappedSignedTransactionField(Vec<u8>),
}

impl SignedPayload {
    pub fn decode(value: &Value) -> Result<Self, WalletError> {
        let Value::Array(items) = value else {
            return Err(unexpected(value));
        };

        if let Some(bytes) = byte_array(items) {
            return Ok(SignedPayload::RawBytes(bytes));
        }

        match items.as_slice() {
            [Value::Array(inner)] => byte_array(inner)
                .map(SignedPayload::WrappedArrayOfBytes)
                .ok_or_else(|| unexpected(value)),
            [Value::Object(object), ..] => signed_transaction_field(object)
                .map(SignedPayload::WrappedSignedTransactionField)
                .ok_or_else(|| unexpected(value)),
            _ => Err(unexpected(value)),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            SignedPayload::RawBytes(bytes)
            | SignedPayload::WrappedArrayOfBytes(bytes)
            | SignedPayload::WrappedSignedTransactionField(bytes) => bytes,
        }
    }

    pub fn into_transaction(self) -> Result<Transaction, WalletError> {
        deserialize_transaction(self.bytes()).map_err(|e| WalletError::UnexpectedFormat {
            raw: format!("{}: {}", self.kind(), e),
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            SignedPayload::RawBytes(_) => "RawBytes",
            SignedPayload::WrappedArrayOfBytes(_) => "WrappedArrayOfBytes",
            SignedPayload::WrappedSignedTransactionField(_) => "WrappedSignedTransactionField",
        }
    }
}

fn unexpected(value: &Value) -> WalletError {
    error!(raw = %value, "wallet returned signed transaction in unexpected format");
    let mut raw = value.to_string();
    raw.truncate(256);
    WalletError::UnexpectedFormat { raw }
}

fn signed_transaction_field(object: &Map<String, Value>) -> Option<Vec<u8>> {
    match object.get("signedTransaction")? {
        Value::Array(inner) => byte_array(inner),
        Value::Object(indexed) => indexed_byte_object(indexed),
        _ => None,
    }
}

/// Non-empty array where every element is an integer in `0..=255`.
fn byte_array(items: &[Value]) -> Option<Vec<u8>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

/// A JSON-serialized byte buffer: `{"0": 12, "1": 250, ...}` with contiguous indices.
fn indexed_byte_object(object: &Map<String, Value>) -> Option<Vec<u8>> {
    if object.is_empty() {
        return None;
    }

    let mut bytes = vec![None; object.len()];
    for (key, value) in object {
        let index: usize = key.parse().ok()?;
        let byte = value.as_u64().and_then(|n| u8::try_from(n).ok())?;
        *bytes.get_mut(index)? = Some(byte);
    }
    bytes.into_iter().collect()
}

/// Uniform signing surface over any [`WalletProvider`].
pub struct WalletAdapter<P> {
    provider: P,
    chain: String,
}

impl<P: WalletProvider> WalletAdapter<P> {
    pub fn new(provider: P, network: Network) -> Self {
        Self {
            provider,
            chain: format!("solana:{network}"),
        }
    }

    pub fn address(&self) -> Pubkey {
        self.provider.address()
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction, WalletError> {
        check_signable(&tx)?;

        let serialized =
            serialize_transaction(&tx).map_err(|e| WalletError::Provider(e.to_string()))?;

        let raw = self
            .provider
            .sign_transaction_raw(&self.chain, serialized)
            .await
            .map_err(|e| match e {
                WalletError::Provider(message) => WalletError::from_provider_message(message),
                other => other,
            })?;

        let payload = SignedPayload::decode(&raw)?;
        debug!(shape = payload.kind(), "decoded signed transaction");
        payload.into_transaction()
    }

    pub async fn sign_all_transactions(
        &self,
        txs: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, WalletError> {
        let mut signed = Vec::with_capacity(txs.len());
        for tx in txs {
            signed.push(self.sign_transaction(tx).await?);
        }
        Ok(signed)
    }
}

fn check_signable(tx: &Transaction) -> Result<(), WalletError> {
    if tx.message.instructions.is_empty() {
        return Err(WalletError::MissingInstructions);
    }
    if tx.message.recent_blockhash == Hash::default() {
        return Err(WalletError::MissingBlockhash);
    }
    if tx.message.account_keys.is_empty() || tx.message.header.num_required_signatures == 0 {
        return Err(WalletError::MissingFeePayer);
    }
    Ok(())
}

/// Signs with a local keypair and answers in the raw-bytes shape.
pub struct KeypairWalletProvider {
    keypair: Keypair,
}

impl KeypairWalletProvider {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletProvider for KeypairWalletProvider {
    fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction_raw(
        &self,
        _chain: &str,
        serialized_transaction: Vec<u8>,
    ) -> Result<Value, WalletError> {
        let mut tx = deserialize_transaction(&serialized_transaction)
            .map_err(|e| WalletError::Provider(e.to_string()))?;

        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletError::Provider(e.to_string()))?;

        let signed = serialize_transaction(&tx).map_err(|e| WalletError::Provider(e.to_string()))?;
        Ok(Value::from(signed))
    }
}
