/*!
# Quest Contract Orchestrator

Owns the connection, wallet and program handles and drives every on-chain flow of the
escrow program: bootstrap, quest creation, account reads and the ATA lifecycle.

Handles only change through [`QuestContract::connect_wallet`] and
[`QuestContract::disconnect_wallet`]; nothing mid-flow rebuilds them.
*/

use crate::{
    config::{PipelineConfig, ReadinessConfig},
    errors::{ClientError, ClientResult},
    notify::{Notice, Notifier, TracingNotifier},
    pipeline::TransactionPipeline,
    rpc::SolanaRpc,
    token_accounts::{alternate_token_program, AtaExistenceCache, TokenAccountResolver, TokenProgramCache},
    types::{AtaStatus, CreateQuestParams, CreatedQuest, QuestCreationStage},
    wallet::{WalletAdapter, WalletProvider},
};
use backoff::future::retry;
use questboard_sdk::{
    build_create_ata_idempotent_ix, build_create_quest_ix, build_initialize_ix, normalize_quest_id,
    AddressFinder, ChainConfig, CreateQuestArgs, GlobalState, ProgramAccount, Quest, RewardClaimed,
};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, RwLock,
};
use tracing::{debug, error, info, warn};

/// Everything that needs both a connection and a wallet.
struct ProgramHandle<R, P> {
    pipeline: TransactionPipeline<R, P>,
    resolver: TokenAccountResolver<R>,
}

/// Clears the single-flight flag however `create_quest` exits.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct QuestContract<R, P> {
    config: ChainConfig,
    address_finder: AddressFinder,
    pipeline_config: PipelineConfig,
    readiness: ReadinessConfig,
    notifier: Arc<dyn Notifier>,

    connection: RwLock<Option<Arc<R>>>,
    wallet: RwLock<Option<Arc<WalletAdapter<P>>>>,
    program: RwLock<Option<Arc<ProgramHandle<R, P>>>>,

    program_ids: Arc<TokenProgramCache>,
    ata_cache: Arc<AtaExistenceCache>,

    creating_quest: AtomicBool,
    stage: Mutex<QuestCreationStage>,
}

fn read<T: Clone>(lock: &RwLock<Option<T>>) -> Option<T> {
    lock.read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn write<T>(lock: &RwLock<Option<T>>, value: Option<T>) {
    *lock.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
}

impl<R: SolanaRpc, P: WalletProvider> QuestContract<R, P> {
    pub fn new(config: ChainConfig) -> Self {
        let address_finder = AddressFinder::for_program(config.program_id);
        Self {
            config,
            address_finder,
            pipeline_config: PipelineConfig::default(),
            readiness: ReadinessConfig::default(),
            notifier: Arc::new(TracingNotifier),
            connection: RwLock::new(None),
            wallet: RwLock::new(None),
            program: RwLock::new(None),
            program_ids: Arc::new(TokenProgramCache::default()),
            ata_cache: Arc::new(AtaExistenceCache::default()),
            creating_quest: AtomicBool::new(false),
            stage: Mutex::new(QuestCreationStage::Idle),
        }
    }

    pub fn with_connection(self, rpc: Arc<R>) -> Self {
        write(&self.connection, Some(rpc));
        self.rebuild_program();
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_pipeline_config(mut self, pipeline_config: PipelineConfig) -> Self {
        self.pipeline_config = pipeline_config;
        self.rebuild_program();
        self
    }

    pub fn with_readiness_config(mut self, readiness: ReadinessConfig) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_caches(
        mut self,
        program_ids: Arc<TokenProgramCache>,
        ata_cache: Arc<AtaExistenceCache>,
    ) -> Self {
        self.program_ids = program_ids;
        self.ata_cache = ata_cache;
        self.rebuild_program();
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn address_finder(&self) -> &AddressFinder {
        &self.address_finder
    }

    pub fn ata_cache(&self) -> &AtaExistenceCache {
        &self.ata_cache
    }

    pub fn token_program_cache(&self) -> &TokenProgramCache {
        &self.program_ids
    }

    pub fn wallet_address(&self) -> Option<Pubkey> {
        read(&self.wallet).map(|wallet| wallet.address())
    }

    pub fn creation_stage(&self) -> QuestCreationStage {
        *self.stage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_stage(&self, stage: QuestCreationStage) {
        debug!(?stage, "quest creation stage");
        *self.stage.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = stage;
    }

    /// Returns `false` when `provider` has the identity already connected.
    pub fn connect_wallet(&self, provider: P) -> bool {
        let address = provider.address();
        if self.wallet_address() == Some(address) {
            debug!(%address, "wallet already connected");
            return false;
        }

        info!(%address, "wallet connected");
        write(
            &self.wallet,
            Some(Arc::new(WalletAdapter::new(provider, self.config.network))),
        );
        self.ata_cache.clear();
        self.rebuild_program();
        true
    }

    pub fn disconnect_wallet(&self) {
        if let Some(address) = self.wallet_address() {
            info!(%address, "wallet disconnected");
        }
        write(&self.wallet, None);
        write(&self.program, None);
        self.ata_cache.clear();
    }

    fn rebuild_program(&self) {
        let handle = match (read(&self.connection), read(&self.wallet)) {
            (Some(rpc), Some(wallet)) => Some(Arc::new(ProgramHandle {
                pipeline: TransactionPipeline::with_config(
                    rpc.clone(),
                    wallet,
                    self.pipeline_config.clone(),
                ),
                resolver: self.resolver_for(rpc),
            })),
            _ => None,
        };
        write(&self.program, handle);
    }

    fn resolver_for(&self, rpc: Arc<R>) -> TokenAccountResolver<R> {
        TokenAccountResolver::with_caches(
            rpc,
            self.address_finder.clone(),
            self.program_ids.clone(),
            self.ata_cache.clone(),
        )
    }

    /// Names of the handles that are not available, in `wallet, program, connection` order.
    pub fn missing_dependencies(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if read(&self.wallet).is_none() {
            missing.push("wallet");
        }
        if read(&self.program).is_none() {
            missing.push("program");
        }
        if read(&self.connection).is_none() {
            missing.push("connection");
        }
        missing
    }

    fn connection(&self) -> ClientResult<Arc<R>> {
        read(&self.connection).ok_or(ClientError::MissingDependencies {
            missing: vec!["connection"],
        })
    }

    fn program(&self) -> ClientResult<Arc<ProgramHandle<R, P>>> {
        read(&self.program).ok_or_else(|| ClientError::MissingDependencies {
            missing: self.missing_dependencies(),
        })
    }

    fn resolver(&self) -> ClientResult<TokenAccountResolver<R>> {
        Ok(self.resolver_for(self.connection()?))
    }

    /// Wait briefly for wallet, program and connection, then make sure the program is
    /// initialized on-chain (bootstrapping it when the connected wallet is the admin).
    pub async fn ensure_initialized(&self) -> ClientResult<()> {
        retry(self.readiness.backoff.clone(), || async move {
            if read(&self.program).is_none() {
                self.rebuild_program();
            }
            self.program().map_err(|e| {
                debug!("not ready yet: {}", e);
                backoff::Error::transient(e)
            })
        })
        .await?;

        if self.get_global_state().await?.is_some() {
            return Ok(());
        }

        match self.wallet_address() {
            Some(wallet) if self.config.is_admin(&wallet) => {
                self.initialize_program_if_needed().await.map(|_| ())
            }
            _ => Err(ClientError::ProgramNotInitialized),
        }
    }

    /// Fresh read of the program's global state; `None` before `initialize`.
    pub async fn get_global_state(&self) -> ClientResult<Option<GlobalState>> {
        let (address, _) = self.address_finder.find_global_state_address();
        let Some(account) = self.connection()?.get_account(&address).await? else {
            return Ok(None);
        };

        GlobalState::try_from_account_data(&account.data)
            .map(Some)
            .map_err(|e| ClientError::InvalidAccountData(format!("global state: {}", e)))
    }

    /// Bootstrap the program with `supported_token_mints`. Returns `None` when it was
    /// already initialized.
    pub async fn initialize(
        &self,
        supported_token_mints: Vec<Pubkey>,
    ) -> ClientResult<Option<Signature>> {
        let program = self.program()?;
        let owner = program.pipeline.fee_payer();
        if !self.config.is_admin(&owner) {
            return Err(ClientError::NotAdmin { wallet: owner });
        }

        if self.get_global_state().await?.is_some() {
            info!("program already initialized");
            return Ok(None);
        }

        let (ix, accounts, _) =
            build_initialize_ix(&self.address_finder, owner, supported_token_mints)?;

        let submitted = program.pipeline.sign_and_send(&[ix], &owner, &[]).await?;
        info!(
            signature = %submitted.signature,
            global_state = %accounts.global_state,
            "program initialized"
        );
        self.notifier.notify(Notice::success("Program initialized"));
        Ok(Some(submitted.signature))
    }

    /// [`Self::initialize`] with the configured supported tokens.
    pub async fn initialize_program_if_needed(&self) -> ClientResult<Option<Signature>> {
        self.initialize(self.config.supported_mints()).await
    }

    /// Create a quest funded from the connected wallet's token account.
    ///
    /// Rejects immediately while another creation is in flight. Failures are reported to
    /// the notifier and returned.
    pub async fn create_quest(&self, params: CreateQuestParams) -> ClientResult<CreatedQuest> {
        let Some(_in_flight) = InFlight::acquire(&self.creating_quest) else {
            warn!(quest_id = %params.quest_id, "quest creation already in flight");
            return Err(ClientError::QuestCreationInFlight);
        };

        match self.create_quest_inner(&params).await {
            Ok(created) => {
                self.set_stage(QuestCreationStage::Succeeded);
                self.notifier.notify(Notice::success("Quest created successfully"));
                Ok(created)
            }
            Err(e) => {
                self.set_stage(QuestCreationStage::Failed);
                error!(quest_id = %params.quest_id, ?params, "quest creation failed: {}", e);
                self.notifier
                    .notify(Notice::error(format!("Quest creation failed: {}", e)));
                Err(e)
            }
        }
    }

    async fn create_quest_inner(&self, params: &CreateQuestParams) -> ClientResult<CreatedQuest> {
        self.set_stage(QuestCreationStage::Validating);
        validate_params(params, chrono::Utc::now().timestamp())?;

        let program = self.program()?;
        let creator = program.pipeline.fee_payer();
        let quest_id = normalize_quest_id(&params.quest_id);
        if quest_id != params.quest_id {
            warn!(requested = %params.quest_id, %quest_id, "quest id too long, using its hash");
        }

        // Supported set gates fund safety, so it is never cached
        let global_state = self
            .get_global_state()
            .await?
            .ok_or(ClientError::ProgramNotInitialized)?;
        if global_state.paused {
            return Err(ClientError::ProgramPaused);
        }
        if !global_state.supports_mint(&params.token_mint) {
            return Err(ClientError::UnsupportedTokenMint {
                mint: params.token_mint,
                supported: global_state.supported_token_mints,
            });
        }

        let token_program = program
            .resolver
            .resolve_token_program_id(&params.token_mint)
            .await?;

        self.set_stage(QuestCreationStage::BuildingTransaction);
        let quest = Keypair::new();
        let creator_token_account = self.address_finder.find_associated_token_address(
            &creator,
            &params.token_mint,
            &token_program,
        );
        let (ix, accounts, _) = build_create_quest_ix(
            &self.address_finder,
            creator,
            quest.pubkey(),
            params.token_mint,
            token_program,
            creator_token_account,
            CreateQuestArgs {
                id: quest_id.clone(),
                amount: params.amount,
                deadline: params.deadline,
                max_winners: params.max_winners,
            },
        )?;

        let submitted = program
            .pipeline
            .sign_and_send_observed(&[ix], &creator, &[&quest], &|stage: QuestCreationStage| {
                self.set_stage(stage)
            })
            .await?;

        info!(
            signature = %submitted.signature,
            quest = %accounts.quest,
            escrow = %accounts.escrow_account,
            %quest_id,
            confirmation = ?submitted.confirmation,
            "quest created"
        );

        Ok(CreatedQuest {
            tx_hash: submitted.signature,
            quest_account_address: accounts.quest,
            escrow_account_address: accounts.escrow_account,
            quest_id,
            requested_quest_id: params.quest_id.clone(),
            confirmation: submitted.confirmation,
        })
    }

    pub async fn get_quest_info(&self, quest: &Pubkey) -> ClientResult<Option<Quest>> {
        let Some(account) = self.connection()?.get_account(quest).await? else {
            return Ok(None);
        };

        Quest::try_from_account_data(&account.data)
            .map(Some)
            .map_err(|e| ClientError::InvalidAccountData(format!("quest {}: {}", quest, e)))
    }

    /// Every quest account of the program. Undecodable accounts are skipped.
    pub async fn get_all_quests(&self) -> ClientResult<Vec<(Pubkey, Quest)>> {
        let accounts = self
            .connection()?
            .get_program_accounts_with_discriminator(
                self.address_finder.program_id(),
                &Quest::discriminator(),
            )
            .await?;

        let mut quests = Vec::with_capacity(accounts.len());
        for (address, account) in accounts {
            match Quest::try_from_account_data(&account.data) {
                Ok(quest) => quests.push((address, quest)),
                Err(e) => warn!(%address, "skipping undecodable quest account: {}", e),
            }
        }
        Ok(quests)
    }

    pub async fn has_reward_been_claimed(
        &self,
        quest: &Pubkey,
        winner: &Pubkey,
    ) -> ClientResult<bool> {
        let (record, _) = self.address_finder.find_reward_claimed_address(quest, winner);
        let Some(account) = self.connection()?.get_account(&record).await? else {
            return Ok(false);
        };

        RewardClaimed::try_from_account_data(&account.data)
            .map(|record| record.claimed)
            .map_err(|e| ClientError::InvalidAccountData(format!("reward record: {}", e)))
    }

    pub async fn check_ata_exists(&self, owner: &Pubkey, mint: &Pubkey) -> ClientResult<bool> {
        self.resolver()?.check_ata_exists(owner, mint).await
    }

    /// Create `owner`'s ATA for `mint`, paid by the connected wallet.
    pub async fn create_ata(&self, owner: &Pubkey, mint: &Pubkey) -> ClientResult<AtaStatus> {
        let program = self.program()?;
        let funder = program.pipeline.fee_payer();
        let token_program = program.resolver.resolve_token_program_id(mint).await?;

        let (address, signature) = match self
            .send_create_ata(&program, &funder, owner, mint, &token_program)
            .await
        {
            Err(e) if e.is_incorrect_program_id() => {
                let alternate = alternate_token_program(&token_program);
                warn!(%mint, %token_program, %alternate, "incorrect program id, retrying ATA creation");
                let created = self
                    .send_create_ata(&program, &funder, owner, mint, &alternate)
                    .await?;
                self.program_ids.insert(*mint, alternate);
                created
            }
            other => other?,
        };

        program.resolver.mark_ata_exists(owner, mint);
        info!(%owner, %mint, ata = %address, %signature, "token account created");
        self.notifier.notify(Notice::success("Token account created"));
        Ok(AtaStatus::Created { address, signature })
    }

    async fn send_create_ata(
        &self,
        program: &ProgramHandle<R, P>,
        funder: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> ClientResult<(Pubkey, Signature)> {
        let address = self
            .address_finder
            .find_associated_token_address(owner, mint, token_program);
        let ix = build_create_ata_idempotent_ix(funder, owner, mint, token_program);

        let submitted = program.pipeline.sign_and_send(&[ix], funder, &[]).await?;
        Ok((address, submitted.signature))
    }

    /// Create the ATA unless it is known to exist. A failed existence check only warns:
    /// creation is idempotent.
    pub async fn ensure_ata_exists(&self, owner: &Pubkey, mint: &Pubkey) -> ClientResult<AtaStatus> {
        let program = self.program()?;

        match program.resolver.check_ata_exists(owner, mint).await {
            Ok(true) => {
                let address = program.resolver.find_ata(owner, mint).await?;
                return Ok(AtaStatus::Existing(address));
            }
            Ok(false) => {}
            Err(ClientError::Rpc(e)) => {
                warn!(%owner, %mint, "ATA existence check failed, creating anyway: {}", e)
            }
            Err(e) => return Err(e),
        }

        self.create_ata(owner, mint).await
    }

    pub async fn has_user_ata_for_mint(&self, mint: &Pubkey) -> ClientResult<bool> {
        let owner = self.program()?.pipeline.fee_payer();
        self.check_ata_exists(&owner, mint).await
    }

    pub async fn ensure_user_ata_for_mint(&self, mint: &Pubkey) -> ClientResult<AtaStatus> {
        let owner = self.program()?.pipeline.fee_payer();
        self.ensure_ata_exists(&owner, mint).await
    }
}

fn validate_params(params: &CreateQuestParams, now: i64) -> ClientResult<()> {
    if params.deadline <= now {
        return Err(ClientError::InvalidDeadline {
            deadline: params.deadline,
            now,
        });
    }
    if params.amount == 0 {
        return Err(ClientError::InvalidAmount);
    }
    if params.max_winners == 0 {
        return Err(ClientError::InvalidMaxWinners);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(deadline: i64, amount: u64, max_winners: u32) -> CreateQuestParams {
        CreateQuestParams {
            quest_id: "abc".to_string(),
            token_mint: Pubkey::new_unique(),
            amount,
            deadline,
            max_winners,
        }
    }

    #[test]
    fn test_validation_boundaries() {
        let now = 1_700_000_000;

        assert!(validate_params(&params(now + 1, 1, 1), now).is_ok());
        assert!(matches!(
            validate_params(&params(now, 1, 1), now),
            Err(ClientError::InvalidDeadline { .. })
        ));
        assert!(matches!(
            validate_params(&params(now + 1, 0, 1), now),
            Err(ClientError::InvalidAmount)
        ));
        assert!(matches!(
            validate_params(&params(now + 1, 1, 0), now),
            Err(ClientError::InvalidMaxWinners)
        ));
    }

    #[test]
    fn test_in_flight_flag_released_on_drop() {
        let flag = AtomicBool::new(false);

        let guard = InFlight::acquire(&flag).unwrap();
        assert!(InFlight::acquire(&flag).is_none());
        drop(guard);

        assert!(InFlight::acquire(&flag).is_some());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
