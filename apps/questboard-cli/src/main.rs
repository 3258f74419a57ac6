use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use commands::create_quest::CreateQuestArgs;
use config::CliConfig;
use error::CliResult;

#[derive(Parser)]
#[command(name = "questboard")]
#[command(about = "Questboard CLI - Social quests with escrowed token rewards on Solana")]
#[command(version)]
struct Cli {
    /// YAML file overriding the network defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Network (mainnet or devnet); overrides the config file and QUESTBOARD_NETWORK
    #[arg(long, global = true)]
    network: Option<String>,

    /// Solana RPC URL; overrides the config file and QUESTBOARD_RPC_URL
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the program with the configured supported tokens (admin only)
    InitProgram {
        /// Admin keypair file
        #[arg(short, long)]
        keypair: PathBuf,
    },

    /// Create a quest and escrow its reward
    CreateQuest {
        /// Quest id; ids longer than 36 characters are stored hashed
        id: String,

        /// Reward token symbol or mint address
        #[arg(short, long, default_value = "USDC")]
        token: String,

        /// Total reward in base units of the token
        #[arg(short, long)]
        amount: u64,

        /// Maximum number of winners
        #[arg(short, long)]
        max_winners: u32,

        /// Deadline as a Unix timestamp; defaults to now plus --days
        #[arg(long)]
        deadline: Option<i64>,

        /// Days until the deadline when --deadline is not given
        #[arg(long, default_value = "7")]
        days: u32,

        /// Creator keypair file
        #[arg(short, long)]
        keypair: PathBuf,
    },

    /// Show a quest account
    QuestInfo {
        /// Quest account address
        quest: String,

        /// Also report whether this wallet has claimed a reward
        #[arg(short, long)]
        winner: Option<String>,
    },

    /// List every quest account of the program
    ListQuests {
        /// Only quests that are active, not expired and not full
        #[arg(long)]
        active: bool,
    },

    /// Create an associated token account unless it exists
    EnsureAta {
        /// Token symbol or mint address
        token: String,

        /// Account owner; defaults to the keypair's wallet
        #[arg(short, long)]
        owner: Option<String>,

        /// Funder keypair file
        #[arg(short, long)]
        keypair: PathBuf,
    },

    /// Check whether an associated token account exists
    CheckAta {
        /// Token symbol or mint address
        token: String,

        /// Account owner
        owner: String,
    },

    /// Show task progress and whether the reward can be claimed
    ClaimStatus {
        /// Backend quest id
        quest_id: String,

        /// X handle of the participant
        #[arg(long)]
        handle: String,

        /// Participant wallet receiving the reward
        #[arg(short, long)]
        wallet: Option<String>,
    },

    /// Verify a participant's tasks through the backend
    VerifyQuest {
        /// Backend quest id
        quest_id: String,

        /// X handle of the participant
        #[arg(long)]
        handle: String,

        /// Participant wallet receiving the reward
        #[arg(short, long)]
        wallet: Option<String>,

        /// Only call the backend when the claim gate allows a claim
        #[arg(long)]
        claim: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut overrides = CliConfig::load(cli.config.as_deref())?;
    if let Some(network) = cli.network {
        overrides.network = Some(network);
    }
    if let Some(rpc_url) = cli.rpc_url {
        overrides.rpc_url = Some(rpc_url);
    }
    let config = overrides.resolve()?;

    match cli.command {
        Commands::InitProgram { keypair } => commands::init_program::execute(&config, keypair).await,

        Commands::CreateQuest {
            id,
            token,
            amount,
            max_winners,
            deadline,
            days,
            keypair,
        } => {
            commands::create_quest::execute(
                &config,
                CreateQuestArgs {
                    quest_id: id,
                    token,
                    amount,
                    max_winners,
                    deadline,
                    days,
                    keypair,
                },
            )
            .await
        }

        Commands::QuestInfo { quest, winner } => {
            commands::quest_info::execute(&config, quest, winner).await
        }

        Commands::ListQuests { active } => commands::list_quests::execute(&config, active).await,

        Commands::EnsureAta {
            token,
            owner,
            keypair,
        } => commands::ensure_ata::execute(&config, token, owner, keypair).await,

        Commands::CheckAta { token, owner } => {
            commands::check_ata::execute(&config, token, owner).await
        }

        Commands::ClaimStatus {
            quest_id,
            handle,
            wallet,
        } => commands::claim_status::execute(&config, quest_id, handle, wallet).await,

        Commands::VerifyQuest {
            quest_id,
            handle,
            wallet,
            claim,
        } => commands::verify_quest::execute(&config, quest_id, handle, wallet, claim).await,
    }
}
