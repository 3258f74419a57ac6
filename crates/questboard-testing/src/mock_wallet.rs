use {
    async_trait::async_trait,
    questboard_client::{WalletError, WalletProvider},
    questboard_sdk::{deserialize_transaction, serialize_transaction},
    serde_json::{json, Map, Value},
    solana_sdk::{
        pubkey::Pubkey,
        signature::{Keypair, Signer},
    },
    std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Which JSON shape the wallet answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalletShape {
    /// `[1, 2, 3]`
    #[default]
    RawBytes,

    /// `[[1, 2, 3]]`
    WrappedArray,

    /// `[{"signedTransaction": [1, 2, 3]}]`
    SignedTransactionArray,

    /// `[{"signedTransaction": {"0": 1, "1": 2}}]`
    SignedTransactionIndexed,

    /// `{"signature": "..."}`, which no decoder accepts
    Unrecognized,
}

impl WalletShape {
    pub const RECOGNIZED: [WalletShape; 4] = [
        WalletShape::RawBytes,
        WalletShape::WrappedArray,
        WalletShape::SignedTransactionArray,
        WalletShape::SignedTransactionIndexed,
    ];

    fn encode(self, bytes: Vec<u8>) -> Value {
        match self {
            WalletShape::RawBytes => json!(bytes),
            WalletShape::WrappedArray => json!([bytes]),
            WalletShape::SignedTransactionArray => json!([{ "signedTransaction": bytes }]),
            WalletShape::SignedTransactionIndexed => {
                let indexed: Map<String, Value> = bytes
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (i.to_string(), json!(b)))
                    .collect();
                json!([{ "signedTransaction": indexed }])
            }
            WalletShape::Unrecognized => json!({ "signature": "unsupported" }),
        }
    }
}

#[derive(Debug, Default)]
struct WalletScript {
    shape: WalletShape,
    reject_with: Option<String>,
}

/// Keypair-backed wallet whose answer shape and failures are scripted.
///
/// Clones share the script and counters, so a test can keep a handle after
/// passing the provider to `QuestContract::connect_wallet`.
#[derive(Clone)]
pub struct MockWalletProvider {
    keypair: Arc<Keypair>,
    script: Arc<Mutex<WalletScript>>,
    sign_calls: Arc<AtomicUsize>,
    chains: Arc<Mutex<Vec<String>>>,
}

impl MockWalletProvider {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
            script: Arc::new(Mutex::new(WalletScript::default())),
            sign_calls: Arc::new(AtomicUsize::new(0)),
            chains: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn with_shape(self, shape: WalletShape) -> Self {
        self.set_shape(shape);
        self
    }

    pub fn set_shape(&self, shape: WalletShape) {
        self.script.lock().unwrap().shape = shape;
    }

    /// Every following signing request fails with `message` as the provider's text.
    pub fn reject_with(&self, message: impl Into<String>) {
        self.script.lock().unwrap().reject_with = Some(message.into());
    }

    pub fn stop_rejecting(&self) {
        self.script.lock().unwrap().reject_with = None;
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Chain identifiers seen in signing requests, in order.
    pub fn chains(&self) -> Vec<String> {
        self.chains.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction_raw(
        &self,
        chain: &str,
        serialized_transaction: Vec<u8>,
    ) -> Result<Value, WalletError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.chains.lock().unwrap().push(chain.to_string());

        let (shape, reject_with) = {
            let script = self.script.lock().unwrap();
            (script.shape, script.reject_with.clone())
        };
        if let Some(message) = reject_with {
            return Err(WalletError::Provider(message));
        }

        let mut tx = deserialize_transaction(&serialized_transaction)
            .map_err(|e| WalletError::Provider(e.to_string()))?;
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| WalletError::Provider(e.to_string()))?;

        let signed = serialize_transaction(&tx).map_err(|e| WalletError::Provider(e.to_string()))?;
        Ok(shape.encode(signed))
    }
}
