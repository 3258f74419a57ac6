use crate::{
    config::PipelineConfig,
    errors::{ClientError, ClientResult},
    rpc::{SignatureStatus, SolanaRpc},
    types::{Confirmation, QuestCreationStage, SubmittedTransaction},
    wallet::{WalletAdapter, WalletProvider},
};
use questboard_sdk::{build_unsigned_transaction, serialized_transaction_size};
use solana_sdk::{
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Build, sign, submit and confirm transactions paid for by the connected wallet.
pub struct TransactionPipeline<R, P> {
    rpc: Arc<R>,
    wallet: Arc<WalletAdapter<P>>,
    config: PipelineConfig,
}

impl<R: SolanaRpc, P: WalletProvider> TransactionPipeline<R, P> {
    pub fn new(rpc: Arc<R>, wallet: Arc<WalletAdapter<P>>) -> Self {
        Self::with_config(rpc, wallet, PipelineConfig::default())
    }

    pub fn with_config(rpc: Arc<R>, wallet: Arc<WalletAdapter<P>>, config: PipelineConfig) -> Self {
        Self {
            rpc,
            wallet,
            config,
        }
    }

    pub fn fee_payer(&self) -> Pubkey {
        self.wallet.address()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Let `build` produce instructions for the wallet's address, then submit them.
    pub async fn build_and_send<F>(
        &self,
        build: F,
        additional_signers: &[&Keypair],
    ) -> ClientResult<SubmittedTransaction>
    where
        F: FnOnce(&Pubkey) -> ClientResult<Vec<Instruction>>,
    {
        let fee_payer = self.fee_payer();
        let instructions = build(&fee_payer)?;
        self.sign_and_send(&instructions, &fee_payer, additional_signers)
            .await
    }

    pub async fn sign_and_send(
        &self,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        additional_signers: &[&Keypair],
    ) -> ClientResult<SubmittedTransaction> {
        self.sign_and_send_observed(instructions, fee_payer, additional_signers, &|_| {})
            .await
    }

    /// Same as [`Self::sign_and_send`], reporting each stage to `observe`.
    pub async fn sign_and_send_observed(
        &self,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        additional_signers: &[&Keypair],
        observe: &(dyn Fn(QuestCreationStage) + Sync),
    ) -> ClientResult<SubmittedTransaction> {
        // Fetched right before signing to keep it fresh
        let (blockhash, last_valid_block_height) = self.rpc.get_latest_blockhash().await?;
        let mut tx = build_unsigned_transaction(instructions, fee_payer, blockhash)?;

        let size = serialized_transaction_size(&tx)?;
        if size > self.config.max_transaction_size_bytes {
            return Err(ClientError::TransactionTooLarge {
                size,
                max: self.config.max_transaction_size_bytes,
            });
        }

        if !additional_signers.is_empty() {
            tx.try_partial_sign(additional_signers, blockhash)
                .map_err(|e| ClientError::Signing(e.to_string()))?;
        }

        observe(QuestCreationStage::Signing);
        let message = tx.message.clone();
        let signed = self.wallet.sign_transaction(tx).await?;
        let signature = check_wallet_signed(&message, &signed)?;

        debug!(%signature, size, last_valid_block_height, "submitting transaction");
        observe(QuestCreationStage::Submitting);

        match self.rpc.send_transaction(&signed).await {
            Ok(signature) => {
                observe(QuestCreationStage::Confirming);
                self.confirm(signature).await
            }
            Err(e) if e.is_already_processed() => {
                warn!(%signature, "transaction already processed, checking its status");
                observe(QuestCreationStage::RecoveringDuplicate);
                self.recover_duplicate(signature).await
            }
            Err(e) => Err(e),
        }
    }

    /// A duplicate submission succeeded iff the earlier copy landed without error.
    async fn recover_duplicate(&self, signature: Signature) -> ClientResult<SubmittedTransaction> {
        match self.rpc.get_signature_status(&signature).await? {
            Some(SignatureStatus { err: None, .. }) => {
                info!(%signature, "duplicate submission already landed");
                Ok(SubmittedTransaction {
                    signature,
                    confirmation: Confirmation::AlreadyProcessed,
                })
            }
            Some(SignatureStatus { err: Some(error), .. }) => {
                error!(%signature, ?error, "duplicate submission had failed on-chain");
                Err(ClientError::TransactionFailed { signature, error })
            }
            None => Err(ClientError::DuplicateUnresolved(signature)),
        }
    }

    async fn confirm(&self, signature: Signature) -> ClientResult<SubmittedTransaction> {
        for attempt in 1..=self.config.confirmation_attempts {
            tokio::time::sleep(self.config.confirmation_interval).await;

            match self.rpc.get_signature_status(&signature).await {
                Ok(Some(SignatureStatus {
                    err: Some(error), ..
                })) => {
                    error!(%signature, ?error, "transaction failed on-chain");
                    return Err(ClientError::TransactionFailed { signature, error });
                }
                Ok(Some(SignatureStatus {
                    confirmed: true, ..
                })) => {
                    info!(%signature, attempt, "transaction confirmed");
                    return Ok(SubmittedTransaction {
                        signature,
                        confirmation: Confirmation::Confirmed,
                    });
                }
                Ok(_) => debug!(%signature, attempt, "transaction not confirmed yet"),
                Err(e) => warn!(%signature, attempt, "signature status poll failed: {}", e),
            }
        }

        warn!(%signature, "transaction unconfirmed after polling");
        Ok(SubmittedTransaction {
            signature,
            confirmation: Confirmation::Unconfirmed,
        })
    }
}

/// The wallet must hand back `message` unchanged with every required signature valid.
/// Returns the fee payer's signature.
fn check_wallet_signed(message: &Message, signed: &Transaction) -> ClientResult<Signature> {
    if signed.message != *message {
        return Err(ClientError::Signing(
            "wallet returned a different message than it was asked to sign".to_string(),
        ));
    }

    let required = usize::from(signed.message.header.num_required_signatures);
    if signed.signatures.len() != required {
        return Err(ClientError::Signing(format!(
            "wallet returned {} signature(s), {} required",
            signed.signatures.len(),
            required
        )));
    }

    signed
        .verify()
        .map_err(|e| ClientError::Signing(format!("wallet returned invalid signatures: {e}")))?;

    signed
        .signatures
        .first()
        .copied()
        .ok_or_else(|| ClientError::Signing("wallet returned no signatures".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::WalletError, wallet::KeypairWalletProvider};
    use async_trait::async_trait;
    use questboard_sdk::{deserialize_transaction, serialize_transaction, Network};
    use solana_client::client_error::{ClientError as RpcClientError, ClientErrorKind};
    use solana_sdk::{
        account::Account,
        hash::Hash,
        instruction::InstructionError,
        signature::Signer,
        system_instruction,
        transaction::{Transaction, TransactionError},
    };
    use std::{collections::VecDeque, sync::Mutex};

    enum SendScript {
        Accept,
        AlreadyProcessed,
    }

    struct ScriptedRpc {
        send: SendScript,
        statuses: Mutex<VecDeque<Option<SignatureStatus>>>,
        sent: Mutex<Vec<Transaction>>,
    }

    impl ScriptedRpc {
        fn new(send: SendScript, statuses: Vec<Option<SignatureStatus>>) -> Arc<Self> {
            Arc::new(Self {
                send,
                statuses: Mutex::new(statuses.into()),
                sent: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl SolanaRpc for ScriptedRpc {
        async fn get_account(&self, _address: &Pubkey) -> ClientResult<Option<Account>> {
            Ok(None)
        }

        async fn get_latest_blockhash(&self) -> ClientResult<(Hash, u64)> {
            Ok((Hash::new_from_array([7; 32]), 100))
        }

        async fn send_transaction(&self, tx: &Transaction) -> ClientResult<Signature> {
            self.sent.lock().unwrap().push(tx.clone());
            match self.send {
                SendScript::Accept => Ok(tx.signatures[0]),
                SendScript::AlreadyProcessed => Err(RpcClientError::from(
                    ClientErrorKind::TransactionError(TransactionError::AlreadyProcessed),
                )
                .into()),
            }
        }

        async fn get_signature_status(
            &self,
            _signature: &Signature,
        ) -> ClientResult<Option<SignatureStatus>> {
            Ok(self.statuses.lock().unwrap().pop_front().flatten())
        }

        async fn get_program_accounts_with_discriminator(
            &self,
            _program_id: &Pubkey,
            _discriminator: &[u8],
        ) -> ClientResult<Vec<(Pubkey, Account)>> {
            Ok(vec![])
        }
    }

    fn pipeline(rpc: Arc<ScriptedRpc>) -> TransactionPipeline<ScriptedRpc, KeypairWalletProvider> {
        let wallet = WalletAdapter::new(KeypairWalletProvider::new(Keypair::new()), Network::Devnet);
        TransactionPipeline::new(rpc, Arc::new(wallet))
    }

    fn transfer(from: &Pubkey) -> Vec<Instruction> {
        vec![system_instruction::transfer(from, &Pubkey::new_unique(), 1)]
    }

    const LANDED: Option<SignatureStatus> = Some(SignatureStatus {
        err: None,
        confirmed: true,
    });

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_submission_that_landed_is_success() {
        let rpc = ScriptedRpc::new(SendScript::AlreadyProcessed, vec![LANDED]);
        let pipeline = pipeline(rpc.clone());

        let submitted = pipeline
            .build_and_send(|payer| Ok(transfer(payer)), &[])
            .await
            .unwrap();

        let sent_signature = rpc.sent.lock().unwrap()[0].signatures[0];
        assert_eq!(submitted.signature, sent_signature);
        assert_eq!(submitted.confirmation, Confirmation::AlreadyProcessed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_submission_without_status_requires_rebuild() {
        let rpc = ScriptedRpc::new(SendScript::AlreadyProcessed, vec![None]);
        let pipeline = pipeline(rpc);

        let result = pipeline.build_and_send(|payer| Ok(transfer(payer)), &[]).await;
        assert!(matches!(result, Err(ClientError::DuplicateUnresolved(_))));
        assert!(result.unwrap_err().to_string().contains("fresh blockhash"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_submission_that_failed_is_failure() {
        let failed = Some(SignatureStatus {
            err: Some(TransactionError::InstructionError(0, InstructionError::Custom(1))),
            confirmed: true,
        });
        let rpc = ScriptedRpc::new(SendScript::AlreadyProcessed, vec![failed]);
        let pipeline = pipeline(rpc);

        let result = pipeline.build_and_send(|payer| Ok(transfer(payer)), &[]).await;
        assert!(matches!(result, Err(ClientError::TransactionFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_polling_is_bounded() {
        let rpc = ScriptedRpc::new(SendScript::Accept, vec![None; 10]);
        let pipeline = pipeline(rpc.clone());

        let started = tokio::time::Instant::now();
        let submitted = pipeline
            .build_and_send(|payer| Ok(transfer(payer)), &[])
            .await
            .unwrap();

        assert_eq!(submitted.confirmation, Confirmation::Unconfirmed);
        assert!(!submitted.is_confirmed());
        assert_eq!(started.elapsed(), std::time::Duration::from_secs(5));
        assert_eq!(rpc.statuses.lock().unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_on_third_poll() {
        let rpc = ScriptedRpc::new(SendScript::Accept, vec![None, None, LANDED]);
        let pipeline = pipeline(rpc);

        let submitted = pipeline
            .build_and_send(|payer| Ok(transfer(payer)), &[])
            .await
            .unwrap();
        assert_eq!(submitted.confirmation, Confirmation::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_additional_signer_cosigns_before_wallet() {
        let rpc = ScriptedRpc::new(SendScript::Accept, vec![LANDED]);
        let pipeline = pipeline(rpc.clone());
        let new_account = Keypair::new();
        let payer = pipeline.fee_payer();

        let ix = system_instruction::create_account(
            &payer,
            &new_account.pubkey(),
            1_000_000,
            64,
            &Pubkey::new_unique(),
        );
        pipeline
            .sign_and_send(&[ix], &payer, &[&new_account])
            .await
            .unwrap();

        let sent = rpc.sent.lock().unwrap()[0].clone();
        assert_eq!(sent.signatures.len(), 2);
        assert!(sent.verify().is_ok());
    }

    #[derive(Clone, Copy)]
    enum Tamper {
        StripSignatures,
        SwapMessage,
        BlankCosignature,
    }

    /// Signs honestly, then alters the answer before handing it back.
    struct TamperingProvider {
        keypair: Keypair,
        tamper: Tamper,
    }

    #[async_trait]
    impl WalletProvider for TamperingProvider {
        fn address(&self) -> Pubkey {
            self.keypair.pubkey()
        }

        async fn sign_transaction_raw(
            &self,
            _chain: &str,
            serialized_transaction: Vec<u8>,
        ) -> Result<serde_json::Value, WalletError> {
            let mut tx = deserialize_transaction(&serialized_transaction).unwrap();
            let blockhash = tx.message.recent_blockhash;
            tx.try_partial_sign(&[&self.keypair], blockhash).unwrap();

            match self.tamper {
                Tamper::StripSignatures => tx.signatures.clear(),
                Tamper::SwapMessage => {
                    let payer = self.keypair.pubkey();
                    let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1_000_000);
                    tx = Transaction::new_signed_with_payer(
                        &[ix],
                        Some(&payer),
                        &[&self.keypair],
                        blockhash,
                    );
                }
                Tamper::BlankCosignature => tx.signatures[1] = Signature::default(),
            }

            Ok(serde_json::Value::from(serialize_transaction(&tx).unwrap()))
        }
    }

    fn tampering_pipeline(
        rpc: Arc<ScriptedRpc>,
        tamper: Tamper,
    ) -> TransactionPipeline<ScriptedRpc, TamperingProvider> {
        let provider = TamperingProvider {
            keypair: Keypair::new(),
            tamper,
        };
        TransactionPipeline::new(rpc, Arc::new(WalletAdapter::new(provider, Network::Devnet)))
    }

    #[tokio::test]
    async fn test_wallet_answer_without_signatures_is_rejected() {
        let rpc = ScriptedRpc::new(SendScript::Accept, vec![LANDED]);
        let pipeline = tampering_pipeline(rpc.clone(), Tamper::StripSignatures);

        let result = pipeline.build_and_send(|payer| Ok(transfer(payer)), &[]).await;

        assert!(matches!(result, Err(ClientError::Signing(_))));
        assert!(rpc.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_answer_with_other_message_is_rejected() {
        let rpc = ScriptedRpc::new(SendScript::Accept, vec![LANDED]);
        let pipeline = tampering_pipeline(rpc.clone(), Tamper::SwapMessage);

        let result = pipeline.build_and_send(|payer| Ok(transfer(payer)), &[]).await;

        match result {
            Err(ClientError::Signing(message)) => assert!(message.contains("different message")),
            other => panic!("expected Signing error, got {:?}", other),
        }
        assert!(rpc.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_answer_missing_cosignature_is_rejected() {
        let rpc = ScriptedRpc::new(SendScript::Accept, vec![LANDED]);
        let pipeline = tampering_pipeline(rpc.clone(), Tamper::BlankCosignature);
        let new_account = Keypair::new();
        let payer = pipeline.fee_payer();

        let ix = system_instruction::create_account(
            &payer,
            &new_account.pubkey(),
            1_000_000,
            64,
            &Pubkey::new_unique(),
        );
        let result = pipeline.sign_and_send(&[ix], &payer, &[&new_account]).await;

        assert!(matches!(result, Err(ClientError::Signing(_))));
        assert!(rpc.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_transaction_rejected_before_signing() {
        let rpc = ScriptedRpc::new(SendScript::Accept, vec![]);
        let pipeline = pipeline(rpc.clone());

        let result = pipeline
            .build_and_send(
                |payer| {
                    Ok(vec![Instruction::new_with_bytes(
                        Pubkey::new_unique(),
                        &[0u8; 1300],
                        vec![solana_sdk::instruction::AccountMeta::new(*payer, true)],
                    )])
                },
                &[],
            )
            .await;

        match result {
            Err(ClientError::TransactionTooLarge { size, max }) => {
                assert!(size > 1300);
                assert_eq!(max, 1232);
            }
            other => panic!("expected TransactionTooLarge, got {:?}", other),
        }
        assert!(rpc.sent.lock().unwrap().is_empty());
    }
}
