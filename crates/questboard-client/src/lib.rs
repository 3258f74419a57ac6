/*!
# Questboard Client

Client-side orchestration of the Questboard escrow program.

## Layers

- **Wallet Adapter**: turns a wallet provider's raw signing call into `sign_transaction`,
  normalizing every signed-transaction shape providers are known to return
- **Token Account Resolution**: token program lookup per mint and ATA existence, both cached
- **Transaction Pipeline**: blockhash, co-signers, wallet signature, size guard, submission,
  duplicate recovery and bounded confirmation
- **Quest Contract**: program bootstrap, single-flight quest creation, account reads and the
  ATA lifecycle

The RPC connection is the [`SolanaRpc`] trait, implemented for the nonblocking `RpcClient`.

## Usage

```rust,no_run
use questboard_client::{CreateQuestParams, KeypairWalletProvider, QuestContract, ClientResult};
use questboard_sdk::ChainConfig;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signature::Keypair;
use std::sync::Arc;

async fn example(mint: solana_sdk::pubkey::Pubkey) -> ClientResult<()> {
    let config = ChainConfig::default();
    let rpc = Arc::new(RpcClient::new(config.rpc_url.clone()));

    let contract = QuestContract::new(config).with_connection(rpc);
    contract.connect_wallet(KeypairWalletProvider::new(Keypair::new()));
    contract.ensure_initialized().await?;

    let created = contract
        .create_quest(CreateQuestParams {
            quest_id: "launch-week".to_string(),
            token_mint: mint,
            amount: 1_000_000,
            deadline: chrono::Utc::now().timestamp() + 86_400,
            max_winners: 10,
        })
        .await?;
    println!("quest {} created in {}", created.quest_account_address, created.tx_hash);

    Ok(())
}
```
*/

pub mod config;
pub mod contract;
pub mod errors;
pub mod notify;
pub mod pipeline;
pub mod rpc;
pub mod token_accounts;
pub mod types;
pub mod wallet;

pub use config::{PipelineConfig, ReadinessConfig};
pub use contract::QuestContract;
pub use errors::{ClientError, ClientResult, WalletError};
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use pipeline::TransactionPipeline;
pub use rpc::{SignatureStatus, SolanaRpc};
pub use token_accounts::{
    alternate_token_program, AtaExistenceCache, TokenAccountResolver, TokenProgramCache,
    ATA_CACHE_TTL,
};
pub use types::{
    AtaStatus, Confirmation, CreateQuestParams, CreatedQuest, QuestCreationStage,
    SubmittedTransaction,
};
pub use wallet::{KeypairWalletProvider, SignedPayload, WalletAdapter, WalletProvider};
