use super::{connect, load_keypair, resolve_mint, token_program_name};
use crate::{
    config::{parse_pubkey, ResolvedConfig},
    error::CliResult,
};
use questboard_client::AtaStatus;
use solana_sdk::signature::Signer;
use std::path::PathBuf;

/// Create the associated token account of `owner` (default: the keypair's wallet) for
/// `token` unless it exists. The keypair pays.
pub async fn execute(
    config: &ResolvedConfig,
    token: String,
    owner: Option<String>,
    keypair_path: PathBuf,
) -> CliResult<()> {
    let keypair = load_keypair(&keypair_path)?;
    let funder = keypair.pubkey();
    let mint = resolve_mint(&config.chain, &token)?;
    let owner = match owner {
        Some(owner) => parse_pubkey("owner", &owner)?,
        None => funder,
    };

    println!("🔍 Ensuring token account of {} for mint {}", owner, mint);
    println!("🔑 Funder: {}", funder);

    let contract = connect(config, Some(keypair));
    let status = if owner == funder {
        contract.ensure_user_ata_for_mint(&mint).await?
    } else {
        contract.ensure_ata_exists(&owner, &mint).await?
    };

    match status {
        AtaStatus::Existing(address) => println!("ℹ️  Token account already exists: {}", address),
        AtaStatus::Created { address, signature } => {
            println!("📋 Token account: {}", address);
            println!("📝 Transaction: {}", signature);
        }
    }
    if let Some(program) = contract.token_program_cache().get(&mint) {
        println!("🪙 Token program: {}", token_program_name(&program));
    }

    Ok(())
}
