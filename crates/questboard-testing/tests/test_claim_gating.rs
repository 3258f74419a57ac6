use chrono::{Duration, Utc};
use questboard_client::WalletProvider;
use questboard_testing::{MockBackend, TestFixture};
use questboard_verification::{
    ClaimAction, ClaimBlockReason, QuestDetails, QuestSession, RewardChain, Task, TaskStatus,
    TaskType, TaskVerificationResult, VerificationConfig, VerificationError, VerifyQuestResponse,
};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

fn completed(task_id: &str, task_type: TaskType) -> Task {
    Task {
        status: TaskStatus::Completed,
        ..Task::new(task_id, task_type)
    }
}

fn finished_quest(reward_mint: &Pubkey) -> QuestDetails {
    QuestDetails {
        id: "quest-claim".to_string(),
        title: None,
        chain: RewardChain::Solana,
        reward_token: Some(reward_mint.to_string()),
        end_date: Some(Utc::now() + Duration::days(1)),
        max_winners: Some(10),
        total_winners: 2,
        is_raffle: false,
        tasks: vec![
            completed("follow", TaskType::Follow),
            completed("retweet", TaskType::Retweet),
        ],
        user_tx_hash: None,
    }
}

/// Test that a missing reward token account blocks the claim until it exists
///
/// This test validates the claim gate against the on-chain ATA check by:
/// - Probing the reward mint's ATA through the quest contract
/// - Refusing the claim locally while it is missing
/// - Allowing it once `ensure_user_ata_for_mint` created the account
///
/// **Test flow:**
/// 1. All tasks completed, no ATA for the reward mint
/// 2. The gate offers token account creation and `claim` is refused without a backend call
/// 3. Create the ATA through the contract
/// 4. The gate offers the claim; claiming records the payout
/// 5. Afterwards the gate reports the claim as done
#[tokio::test(start_paused = true)]
async fn test_missing_ata_blocks_claim() {
    let test = TestFixture::new();
    let contract = test.contract_for(&test.creator);
    let wallet = Some(test.creator.address());

    let backend = Arc::new(MockBackend::new());
    let mut session = QuestSession::new(
        finished_quest(&test.usdc_mint),
        "alice",
        backend.clone(),
        test.notifier.clone(),
        VerificationConfig::default(),
    );

    // 2. The gate offers token account creation
    assert_eq!(
        session.claim_action(wallet, &contract).await.unwrap(),
        ClaimAction::CreateTokenAccount
    );
    let err = session.claim(wallet, &contract).await.unwrap_err();
    assert!(
        matches!(err, VerificationError::ClaimBlocked(ClaimAction::CreateTokenAccount)),
        "{err}"
    );
    assert_eq!(backend.verify_calls(), 0);

    // 3. Create the ATA through the contract
    contract
        .ensure_user_ata_for_mint(&test.usdc_mint)
        .await
        .unwrap();

    // 4. The gate offers the claim
    assert_eq!(
        session.claim_action(wallet, &contract).await.unwrap(),
        ClaimAction::Claim
    );
    backend.script_verify(Ok(VerifyQuestResponse {
        verification_results: vec![TaskVerificationResult {
            task_id: "follow".to_string(),
            status: TaskStatus::Completed,
            message: None,
            matched_tweet_ids: vec![],
        }],
        all_tasks_completed: true,
        user_tx_hash: Some("5reward".to_string()),
        user_tokens_earned: Some(10.0),
    }));
    session.claim(wallet, &contract).await.unwrap();
    assert_eq!(session.user_tx_hash(), Some("5reward"));

    // 5. Afterwards the gate reports the claim as done
    assert_eq!(
        session.claim_action(wallet, &contract).await.unwrap(),
        ClaimAction::AlreadyClaimed {
            tx_hash: "5reward".to_string()
        }
    );

    println!("✅ Claim blocked until the reward ATA existed");
}

/// Test that the backend's `missingATA` status blocks the claim even with a cached ATA
#[tokio::test(start_paused = true)]
async fn test_backend_missing_ata_status_blocks_claim() {
    let test = TestFixture::new();
    let contract = test.contract_for(&test.creator);
    contract
        .ensure_user_ata_for_mint(&test.usdc_mint)
        .await
        .unwrap();

    let mut details = finished_quest(&test.usdc_mint);
    details.tasks[1].status = TaskStatus::MissingAta;
    let session = QuestSession::new(
        details,
        "alice",
        Arc::new(MockBackend::new()),
        test.notifier.clone(),
        VerificationConfig::default(),
    );

    assert_eq!(
        session
            .claim_action(Some(test.creator.address()), &contract)
            .await
            .unwrap(),
        ClaimAction::CreateTokenAccount
    );
}

/// Test the gate outcomes that do not depend on the ledger
///
/// **Test flow:**
/// 1. No wallet connected asks for one
/// 2. An unfinished task blocks the claim
/// 3. A full quest blocks the claim
#[tokio::test(start_paused = true)]
async fn test_gate_without_ledger_checks() {
    let test = TestFixture::new();
    let contract = test.contract_for(&test.creator);

    let session = QuestSession::new(
        finished_quest(&test.usdc_mint),
        "alice",
        Arc::new(MockBackend::new()),
        test.notifier.clone(),
        VerificationConfig::default(),
    );
    assert_eq!(
        session.claim_action(None, &contract).await.unwrap(),
        ClaimAction::AddWallet
    );

    let mut unfinished = finished_quest(&test.usdc_mint);
    unfinished.tasks[0].status = TaskStatus::UnderReview;
    let session = QuestSession::new(
        unfinished,
        "alice",
        Arc::new(MockBackend::new()),
        test.notifier.clone(),
        VerificationConfig::default(),
    );
    assert_eq!(
        session
            .claim_action(Some(test.creator.address()), &contract)
            .await
            .unwrap(),
        ClaimAction::Blocked(ClaimBlockReason::TasksIncomplete)
    );

    let mut full = finished_quest(&test.usdc_mint);
    full.total_winners = 10;
    let session = QuestSession::new(
        full,
        "alice",
        Arc::new(MockBackend::new()),
        test.notifier.clone(),
        VerificationConfig::default(),
    );
    assert_eq!(
        session
            .claim_action(Some(test.creator.address()), &contract)
            .await
            .unwrap(),
        ClaimAction::Blocked(ClaimBlockReason::WinnerCapReached)
    );
}

/// Test that a Solana quest without a usable reward mint is blocked instead of asking for an
/// account that could never be created
///
/// **Test flow:**
/// 1. No reward token at all blocks the claim
/// 2. A reward token that is not a Solana address blocks it the same way
/// 3. `claim` is refused without a backend call
#[tokio::test(start_paused = true)]
async fn test_quest_without_reward_mint_is_blocked() {
    let test = TestFixture::new();
    let contract = test.contract_for(&test.creator);
    let wallet = Some(test.creator.address());

    let mut no_token = finished_quest(&test.usdc_mint);
    no_token.reward_token = None;
    let session = QuestSession::new(
        no_token,
        "alice",
        Arc::new(MockBackend::new()),
        test.notifier.clone(),
        VerificationConfig::default(),
    );
    let action = session.claim_action(wallet, &contract).await.unwrap();
    assert_eq!(action, ClaimAction::Blocked(ClaimBlockReason::NoRewardMint));
    assert_eq!(action.to_string(), "quest has no Solana reward mint");

    let mut evm_token = finished_quest(&test.usdc_mint);
    evm_token.reward_token = Some("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string());
    let backend = Arc::new(MockBackend::new());
    let mut session = QuestSession::new(
        evm_token,
        "alice",
        backend.clone(),
        test.notifier.clone(),
        VerificationConfig::default(),
    );
    assert_eq!(
        session.claim_action(wallet, &contract).await.unwrap(),
        ClaimAction::Blocked(ClaimBlockReason::NoRewardMint)
    );

    let err = session.claim(wallet, &contract).await.unwrap_err();
    assert!(
        matches!(
            err,
            VerificationError::ClaimBlocked(ClaimAction::Blocked(ClaimBlockReason::NoRewardMint))
        ),
        "{err}"
    );
    assert_eq!(backend.verify_calls(), 0);
}
