use super::{backend, connect, print_tasks};
use crate::{
    config::{parse_pubkey, ResolvedConfig},
    error::CliResult,
};
use questboard_client::TracingNotifier;
use questboard_verification::{
    ClaimAction, QuestBackend, QuestSession, RewardChain, VerificationConfig,
};
use std::sync::Arc;

pub async fn execute(
    config: &ResolvedConfig,
    quest_id: String,
    handle: String,
    wallet: Option<String>,
) -> CliResult<()> {
    let wallet = wallet
        .map(|wallet| parse_pubkey("wallet", &wallet))
        .transpose()?;

    let backend = Arc::new(backend(config)?);
    println!("🔍 Fetching quest {} from {}", quest_id, backend.base_url());
    let details = backend.get_quest_details(&quest_id).await?;

    println!(
        "📋 {} ({}, {} winner(s) so far)",
        details.title.as_deref().unwrap_or(&details.id),
        chain_name(details.chain),
        details.total_winners
    );
    print_tasks(&details.tasks);

    let session = QuestSession::new(
        details,
        handle,
        backend,
        Arc::new(TracingNotifier),
        VerificationConfig::default(),
    );
    let contract = connect(config, None);
    let action = session.claim_action(wallet, &contract).await?;

    match &action {
        ClaimAction::Claim => println!("🎁 Reward can be claimed (`questboard verify-quest --claim`)"),
        ClaimAction::CreateTokenAccount => {
            println!("⚠️  Create a token account for the reward first (`questboard ensure-ata`)")
        }
        ClaimAction::AlreadyClaimed { tx_hash } => println!("✅ Already claimed: {}", tx_hash),
        other => println!("⬜ Claim unavailable: {}", other),
    }

    Ok(())
}

fn chain_name(chain: RewardChain) -> &'static str {
    match chain {
        RewardChain::Solana => "Solana",
        RewardChain::Base => "Base",
    }
}
