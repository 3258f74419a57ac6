use super::{connect, load_keypair};
use crate::{config::ResolvedConfig, error::CliResult};
use solana_sdk::signature::Signer;
use std::path::PathBuf;

pub async fn execute(config: &ResolvedConfig, keypair_path: PathBuf) -> CliResult<()> {
    println!("🚀 Initializing Questboard program on {}", config.chain.network);

    let keypair = load_keypair(&keypair_path)?;
    let admin = keypair.pubkey();
    println!("🔑 Admin: {}", admin);
    println!("📋 Program: {}", config.chain.program_id);
    println!("🪙 Supported tokens:");
    for token in &config.chain.supported_tokens {
        println!("   {} ({})", token.symbol, token.mint);
    }

    let contract = connect(config, Some(keypair));
    match contract.initialize_program_if_needed().await? {
        Some(signature) => println!("📝 Transaction: {}", signature),
        None => println!("ℹ️  Program already initialized, nothing sent"),
    }

    if let Some(state) = contract.get_global_state().await? {
        println!("📊 Global state:");
        println!("   Owner: {}", state.owner);
        println!("   Paused: {}", state.paused);
        println!("   Supported mints: {}", state.supported_token_mints.len());
        println!("   Quests: {}", state.quest_count());
    }

    Ok(())
}
