use super::{connect, format_amount, load_keypair, resolve_mint};
use crate::{config::ResolvedConfig, error::CliResult};
use chrono::{DateTime, Duration, Utc};
use questboard_client::{Confirmation, CreateQuestParams};
use solana_sdk::signature::Signer;
use std::path::PathBuf;

pub struct CreateQuestArgs {
    pub quest_id: String,
    pub token: String,
    pub amount: u64,
    pub max_winners: u32,
    pub deadline: Option<i64>,
    pub days: u32,
    pub keypair: PathBuf,
}

pub async fn execute(config: &ResolvedConfig, args: CreateQuestArgs) -> CliResult<()> {
    println!("🎯 Creating quest '{}'", args.quest_id);

    let keypair = load_keypair(&args.keypair)?;
    let creator = keypair.pubkey();
    let token_mint = resolve_mint(&config.chain, &args.token)?;
    let deadline = args
        .deadline
        .unwrap_or_else(|| (Utc::now() + Duration::days(i64::from(args.days))).timestamp());

    println!("🔑 Creator: {}", creator);
    println!("🪙 Reward: {}", format_amount(&config.chain, &token_mint, args.amount));
    println!("🏆 Max winners: {}", args.max_winners);
    match DateTime::<Utc>::from_timestamp(deadline, 0) {
        Some(at) => println!("⏰ Deadline: {}", at.to_rfc3339()),
        None => println!("⏰ Deadline: {}", deadline),
    }

    let contract = connect(config, Some(keypair));
    contract.ensure_initialized().await?;

    let created = contract
        .create_quest(CreateQuestParams {
            quest_id: args.quest_id,
            token_mint,
            amount: args.amount,
            deadline,
            max_winners: args.max_winners,
        })
        .await?;

    if created.quest_id != created.requested_quest_id {
        println!(
            "🔗 Quest id '{}' is stored on-chain as '{}'",
            created.requested_quest_id, created.quest_id
        );
    }
    println!("📝 Transaction: {}", created.tx_hash);
    println!("📋 Quest account: {}", created.quest_account_address);
    println!("🏦 Escrow account: {}", created.escrow_account_address);

    match created.confirmation {
        Confirmation::Confirmed => println!("✅ Confirmed"),
        Confirmation::AlreadyProcessed => {
            println!("✅ Already processed (an earlier submission landed)")
        }
        Confirmation::Unconfirmed => println!(
            "⚠️  Not confirmed yet; check the transaction before creating the quest again"
        ),
    }

    Ok(())
}
