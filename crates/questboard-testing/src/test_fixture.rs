use {
    crate::{
        deterministic_keypair, deterministic_pubkey, MockRpc, MockWalletProvider,
        RecordingNotifier, TEST_CREATOR_BALANCE, TEST_MAX_WINNERS, TEST_MINT_DECIMALS,
    },
    backoff::ExponentialBackoff,
    questboard_client::{CreateQuestParams, QuestContract, ReadinessConfig, WalletProvider},
    questboard_sdk::{
        AddressFinder, ChainConfig, Network, SupportedToken, DEFAULT_PROGRAM_ID,
        DEVNET_RPC_URL, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
    },
    solana_sdk::pubkey::Pubkey,
    std::{sync::Arc, time::Duration},
};

pub type TestContract = QuestContract<MockRpc, MockWalletProvider>;

/// Readiness back-off short enough for tests that expect `MissingDependencies`.
pub fn fast_readiness() -> ReadinessConfig {
    ReadinessConfig {
        backoff: ExponentialBackoff {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(20),
            max_elapsed_time: Some(Duration::from_millis(100)),
            ..Default::default()
        },
    }
}

/// Devnet-shaped ledger with a legacy-token USDC mint, an admin and a creator.
pub struct TestFixture {
    pub rpc: Arc<MockRpc>,
    pub address_finder: AddressFinder,
    pub config: ChainConfig,
    pub notifier: Arc<RecordingNotifier>,

    pub admin: MockWalletProvider,
    pub creator: MockWalletProvider,
    pub usdc_mint: Pubkey,
}

impl TestFixture {
    pub fn new() -> Self {
        let address_finder = AddressFinder::default();
        let rpc = Arc::new(MockRpc::new(address_finder.clone()));

        let admin = MockWalletProvider::new(deterministic_keypair("admin"));
        let creator = MockWalletProvider::new(deterministic_keypair("creator"));
        let usdc_mint = deterministic_pubkey("usdc_mint");
        rpc.add_mint(usdc_mint, TOKEN_PROGRAM_ID, TEST_MINT_DECIMALS);

        let config = ChainConfig {
            network: Network::Devnet,
            rpc_url: DEVNET_RPC_URL.to_string(),
            program_id: DEFAULT_PROGRAM_ID,
            supported_tokens: vec![SupportedToken {
                symbol: "USDC".to_string(),
                mint: usdc_mint,
                decimals: TEST_MINT_DECIMALS,
            }],
            admin: Some(admin.address()),
        };

        Self {
            rpc,
            address_finder,
            config,
            notifier: Arc::new(RecordingNotifier::default()),
            admin,
            creator,
            usdc_mint,
        }
    }

    /// Contract on the fixture's ledger with no wallet connected.
    pub fn contract(&self) -> TestContract {
        QuestContract::new(self.config.clone())
            .with_connection(self.rpc.clone())
            .with_notifier(self.notifier.clone())
            .with_readiness_config(fast_readiness())
    }

    pub fn contract_for(&self, wallet: &MockWalletProvider) -> TestContract {
        let contract = self.contract();
        contract.connect_wallet(wallet.clone());
        contract
    }

    /// Bootstrap the program as the admin with the configured mints.
    pub async fn initialize_program(&self) {
        self.contract_for(&self.admin)
            .ensure_initialized()
            .await
            .unwrap_or_else(|e| panic!("program initialization failed: {e}"));
    }

    /// Initialized program and a creator holding `TEST_CREATOR_BALANCE` USDC.
    pub async fn ready_for_quests(&self) -> TestContract {
        self.initialize_program().await;
        self.rpc.fund_token_account(
            &self.creator.address(),
            &self.usdc_mint,
            TEST_CREATOR_BALANCE,
        );
        self.contract_for(&self.creator)
    }

    pub fn creator_token_account(&self) -> Pubkey {
        self.address_finder.find_associated_token_address(
            &self.creator.address(),
            &self.usdc_mint,
            &TOKEN_PROGRAM_ID,
        )
    }

    pub fn add_token_2022_mint(&self, name: &str) -> Pubkey {
        let mint = deterministic_pubkey(name);
        self.rpc.add_mint(mint, TOKEN_2022_PROGRAM_ID, TEST_MINT_DECIMALS);
        mint
    }

    pub fn quest_params(&self, quest_id: &str, amount: u64) -> CreateQuestParams {
        CreateQuestParams {
            quest_id: quest_id.to_string(),
            token_mint: self.usdc_mint,
            amount,
            deadline: chrono::Utc::now().timestamp() + 86_400,
            max_winners: TEST_MAX_WINNERS,
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
