use super::connect;
use crate::{commands::quest_info::print_quest, config::ResolvedConfig, error::CliResult};
use chrono::Utc;

pub async fn execute(config: &ResolvedConfig, active_only: bool) -> CliResult<()> {
    println!("🔍 Listing quests of program {}", config.chain.program_id);

    let contract = connect(config, None);
    let now = Utc::now().timestamp();
    let mut quests = contract.get_all_quests().await?;
    if active_only {
        quests.retain(|(_, quest)| quest.is_active && !quest.is_expired(now) && !quest.is_full());
    }
    quests.sort_by_key(|(_, quest)| quest.deadline);

    if quests.is_empty() {
        println!("ℹ️  No quests found");
        return Ok(());
    }

    println!("📊 {} quest(s)", quests.len());
    for (address, quest) in &quests {
        println!();
        println!("🔗 {}", address);
        print_quest(config, quest);
    }

    Ok(())
}
