use super::{backend, connect, print_tasks};
use crate::{
    config::{parse_pubkey, ResolvedConfig},
    error::CliResult,
};
use questboard_client::TracingNotifier;
use questboard_verification::{QuestBackend, QuestSession, VerificationConfig};
use std::sync::Arc;

/// Ask the backend to verify every task of `quest_id` for `handle`. With `claim`, the
/// claim gate is checked first and the call is refused unless it allows a claim.
pub async fn execute(
    config: &ResolvedConfig,
    quest_id: String,
    handle: String,
    wallet: Option<String>,
    claim: bool,
) -> CliResult<()> {
    let wallet = wallet
        .map(|wallet| parse_pubkey("wallet", &wallet))
        .transpose()?;

    let backend = Arc::new(backend(config)?);
    let details = backend.get_quest_details(&quest_id).await?;
    println!("🔍 Verifying quest {} for @{}", details.id, handle);

    let mut session = QuestSession::new(
        details,
        handle,
        backend,
        Arc::new(TracingNotifier),
        VerificationConfig::default(),
    );

    let response = if claim {
        let contract = connect(config, None);
        session.claim(wallet, &contract).await?
    } else {
        session.verify_now().await?
    };

    println!("📊 Tasks:");
    print_tasks(session.tasks());
    for result in &response.verification_results {
        if let Some(message) = &result.message {
            println!("   💬 {}: {}", result.task_id, message);
        }
    }

    if response.all_tasks_completed {
        println!("✅ All tasks completed");
    }
    if let Some(tx_hash) = &response.user_tx_hash {
        match response.user_tokens_earned {
            Some(tokens) => println!("🎁 Reward of {} tokens sent: {}", tokens, tx_hash),
            None => println!("🎁 Reward sent: {}", tx_hash),
        }
    }

    Ok(())
}
