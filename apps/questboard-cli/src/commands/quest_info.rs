use super::{connect, format_amount};
use crate::{
    config::{parse_pubkey, ResolvedConfig},
    error::CliResult,
};
use chrono::{DateTime, Utc};
use questboard_sdk::Quest;

pub async fn execute(config: &ResolvedConfig, quest: String, winner: Option<String>) -> CliResult<()> {
    let quest_address = parse_pubkey("quest", &quest)?;
    println!("🔍 Looking up quest {}", quest_address);

    let contract = connect(config, None);
    let Some(info) = contract.get_quest_info(&quest_address).await? else {
        println!("❌ No quest account at {}", quest_address);
        return Ok(());
    };
    print_quest(config, &info);

    if let Some(winner) = winner {
        let winner = parse_pubkey("winner", &winner)?;
        let claimed = contract
            .has_reward_been_claimed(&quest_address, &winner)
            .await?;
        if claimed {
            println!("🎁 {} has claimed a reward", winner);
        } else {
            println!("⬜ {} has not claimed a reward", winner);
        }
    }

    Ok(())
}

pub fn print_quest(config: &ResolvedConfig, quest: &Quest) {
    let now = Utc::now().timestamp();
    let status = if !quest.is_active {
        "inactive"
    } else if quest.is_expired(now) {
        "expired"
    } else if quest.is_full() {
        "full"
    } else {
        "active"
    };

    println!("📋 Quest '{}' ({})", quest.id, status);
    println!("   Creator: {}", quest.creator);
    println!("   Token mint: {}", quest.token_mint);
    println!("   Escrow: {}", quest.escrow_account);
    println!(
        "   Reward: {}",
        format_amount(&config.chain, &quest.token_mint, quest.amount)
    );
    println!(
        "   Distributed: {} (remaining {})",
        format_amount(&config.chain, &quest.token_mint, quest.total_reward_distributed),
        format_amount(&config.chain, &quest.token_mint, quest.remaining_reward())
    );
    println!("   Winners: {}/{}", quest.total_winners, quest.max_winners);
    match DateTime::<Utc>::from_timestamp(quest.deadline, 0) {
        Some(at) => println!("   Deadline: {}", at.to_rfc3339()),
        None => println!("   Deadline: {}", quest.deadline),
    }
}
