pub mod check_ata;
pub mod claim_status;
pub mod create_quest;
pub mod ensure_ata;
pub mod init_program;
pub mod list_quests;
pub mod quest_info;
pub mod verify_quest;

use crate::{
    config::{parse_pubkey, ResolvedConfig},
    error::{CliError, CliResult},
};
use questboard_client::{KeypairWalletProvider, Notice, NoticeLevel, Notifier, QuestContract};
use questboard_sdk::{ChainConfig, TOKEN_PROGRAM_ID};
use questboard_verification::{HttpQuestBackend, Task, TaskStatus};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
};
use std::{path::Path, sync::Arc};

pub type CliContract = QuestContract<RpcClient, KeypairWalletProvider>;

/// Prints notices as they arrive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let icon = match notice.level {
            NoticeLevel::Success => "✅",
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Warning => "⚠️ ",
            NoticeLevel::Error => "❌",
        };
        println!("{icon} {}", notice.message);
    }
}

pub fn load_keypair(path: &Path) -> CliResult<Keypair> {
    read_keypair_file(path).map_err(|e| {
        CliError::InvalidConfig(format!("Failed to read keypair {}: {}", path.display(), e))
    })
}

/// Contract on a `confirmed` connection, with the keypair connected as wallet when given.
pub fn connect(config: &ResolvedConfig, keypair: Option<Keypair>) -> CliContract {
    let rpc = RpcClient::new_with_commitment(
        config.chain.rpc_url.clone(),
        CommitmentConfig::confirmed(),
    );
    let contract = QuestContract::new(config.chain.clone())
        .with_connection(Arc::new(rpc))
        .with_notifier(Arc::new(ConsoleNotifier));

    if let Some(keypair) = keypair {
        contract.connect_wallet(KeypairWalletProvider::new(keypair));
    }
    contract
}

pub fn backend(config: &ResolvedConfig) -> CliResult<HttpQuestBackend> {
    Ok(HttpQuestBackend::new(config.backend_url()?.clone()))
}

/// A supported token symbol (`USDC`) or a mint address.
pub fn resolve_mint(chain: &ChainConfig, token: &str) -> CliResult<Pubkey> {
    if let Some(supported) = chain.token_by_symbol(token) {
        return Ok(supported.mint);
    }
    parse_pubkey("token mint", token)
}

/// `amount` base units as a decimal string when the mint's decimals are known.
pub fn format_amount(chain: &ChainConfig, mint: &Pubkey, amount: u64) -> String {
    let known = chain.token_by_mint(mint).and_then(|token| {
        10u64
            .checked_pow(u32::from(token.decimals))
            .map(|scale| (token, scale))
    });
    match known {
        Some((token, scale)) => {
            let whole = amount / scale;
            let fraction = amount % scale;
            if fraction == 0 {
                format!("{whole} {}", token.symbol)
            } else {
                let digits = format!("{fraction:0width$}", width = usize::from(token.decimals));
                format!("{whole}.{} {}", digits.trim_end_matches('0'), token.symbol)
            }
        }
        None => format!("{amount} base units"),
    }
}

pub fn print_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) {
    for task in tasks {
        let icon = match task.status {
            TaskStatus::Completed => "✅",
            TaskStatus::UnderReview => "⏳",
            TaskStatus::Rejected => "❌",
            TaskStatus::MissingAta => "⚠️ ",
            TaskStatus::Todo => "⬜",
        };
        println!("   {icon} {} ({}): {}", task.task_id, task.task_type, task.status);
    }
}

/// Label for a token program id.
pub fn token_program_name(program: &Pubkey) -> &'static str {
    if program == &TOKEN_PROGRAM_ID {
        "SPL Token"
    } else {
        "Token-2022"
    }
}
