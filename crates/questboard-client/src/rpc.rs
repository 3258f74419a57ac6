/*!
# RPC Seam

The subset of the Solana JSON-RPC surface the client needs, behind a trait so the
orchestrator can run against a real cluster or an in-memory ledger.
*/

use crate::errors::ClientResult;
use async_trait::async_trait;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::Transaction, transaction::TransactionError,
};

/// What the cluster knows about a submitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// `Some` when the transaction landed but its execution failed.
    pub err: Option<TransactionError>,

    /// Reached at least `confirmed` commitment.
    pub confirmed: bool,
}

#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// `Ok(None)` when the account does not exist.
    async fn get_account(&self, address: &Pubkey) -> ClientResult<Option<Account>>;

    /// Returns the blockhash and its last valid block height.
    async fn get_latest_blockhash(&self) -> ClientResult<(Hash, u64)>;

    async fn send_transaction(&self, tx: &Transaction) -> ClientResult<Signature>;

    /// `Ok(None)` when the cluster has no record of the signature.
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> ClientResult<Option<SignatureStatus>>;

    /// Every account owned by `program_id` whose data starts with `discriminator`.
    async fn get_program_accounts_with_discriminator(
        &self,
        program_id: &Pubkey,
        discriminator: &[u8],
    ) -> ClientResult<Vec<(Pubkey, Account)>>;
}

#[async_trait]
impl SolanaRpc for RpcClient {
    async fn get_account(&self, address: &Pubkey) -> ClientResult<Option<Account>> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await?;
        Ok(response.value)
    }

    async fn get_latest_blockhash(&self) -> ClientResult<(Hash, u64)> {
        Ok(self
            .get_latest_blockhash_with_commitment(self.commitment())
            .await?)
    }

    async fn send_transaction(&self, tx: &Transaction) -> ClientResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment().commitment),
            encoding: None,
            max_retries: Some(3),
            min_context_slot: None,
        };

        Ok(self.send_transaction_with_config(tx, config).await?)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> ClientResult<Option<SignatureStatus>> {
        let response = self.get_signature_statuses(&[*signature]).await?;

        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                confirmed: status.satisfies_commitment(CommitmentConfig::confirmed()),
                err: status.err,
            }))
    }

    async fn get_program_accounts_with_discriminator(
        &self,
        program_id: &Pubkey,
        discriminator: &[u8],
    ) -> ClientResult<Vec<(Pubkey, Account)>> {
        // Filtered locally: the default config fetches base64 data, which Quest accounts need.
        let accounts = self.get_program_accounts(program_id).await?;
        Ok(accounts
            .into_iter()
            .filter(|(_, account)| account.data.starts_with(discriminator))
            .collect())
    }
}
