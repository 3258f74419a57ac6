use {
    async_trait::async_trait,
    questboard_client::{ClientResult, SignatureStatus, SolanaRpc},
    questboard_sdk::{
        AddressFinder, CreateQuestArgs, GlobalState, InitializeArgs, ProgramAccount, Quest,
        ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
    },
    solana_client::client_error::{ClientError as RpcClientError, ClientErrorKind},
    solana_sdk::{
        account::Account,
        hash::Hash,
        instruction::InstructionError,
        pubkey::Pubkey,
        signature::Signature,
        transaction::{Transaction, TransactionError},
    },
    spl_token::{
        solana_program::{program_option::COption, program_pack::Pack},
        state::{Account as TokenAccount, AccountState, Mint},
    },
    std::{
        collections::{HashMap, HashSet, VecDeque},
        sync::{
            atomic::{AtomicU64, AtomicUsize, Ordering},
            Mutex, MutexGuard,
        },
    },
};

/// Custom error codes the in-memory program raises.
pub const ERR_NOT_INITIALIZED: u32 = 3012;
pub const ERR_PROGRAM_PAUSED: u32 = 6000;
pub const ERR_UNSUPPORTED_MINT: u32 = 6001;
pub const ERR_INSUFFICIENT_FUNDS: u32 = 1;

/// How the next `send_transaction` call behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendBehavior {
    /// Execute; on failure answer like a preflight rejection
    Process,

    /// Execute, then answer "already processed" as if a network retry landed first
    LandThenReportAlreadyProcessed,

    /// Answer "already processed" without executing or recording a status
    ReportAlreadyProcessedWithoutStatus,

    /// Accept the transaction but record `TransactionError` as its on-chain result
    LandWithError(TransactionError),

    /// Transport-level failure
    RpcError(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn rpc_error(kind: ClientErrorKind) -> questboard_client::ClientError {
    RpcClientError::from(kind).into()
}

fn token_account(mint: Pubkey, owner: Pubkey, amount: u64, program: Pubkey) -> Account {
    let state = TokenAccount {
        mint,
        owner,
        amount,
        delegate: COption::None,
        state: AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0u8; TokenAccount::LEN];
    TokenAccount::pack(state, &mut data).unwrap_or_else(|e| panic!("pack token account: {e}"));
    Account {
        lamports: 2_039_280,
        data,
        owner: program,
        executable: false,
        rent_epoch: 0,
    }
}

/// In-memory ledger standing in for a cluster. Executes the escrow program's
/// `initialize`/`create_quest` and idempotent ATA creation; everything else is a no-op.
pub struct MockRpc {
    address_finder: AddressFinder,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    statuses: Mutex<HashMap<Signature, SignatureStatus>>,
    unconfirmed_polls: Mutex<HashMap<Signature, usize>>,
    processed: Mutex<HashSet<Signature>>,
    send_script: Mutex<VecDeque<SendBehavior>>,
    sent: Mutex<Vec<Transaction>>,
    polls_before_confirmed: AtomicUsize,
    blockhash_counter: AtomicU64,

    get_account_calls: AtomicUsize,
    send_calls: AtomicUsize,
    status_calls: AtomicUsize,
    blockhash_calls: AtomicUsize,
}

impl MockRpc {
    pub fn new(address_finder: AddressFinder) -> Self {
        Self {
            address_finder,
            accounts: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            unconfirmed_polls: Mutex::new(HashMap::new()),
            processed: Mutex::new(HashSet::new()),
            send_script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(vec![]),
            polls_before_confirmed: AtomicUsize::new(0),
            blockhash_counter: AtomicU64::new(1),
            get_account_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            blockhash_calls: AtomicUsize::new(0),
        }
    }

    // Setup

    pub fn set_account(&self, address: Pubkey, account: Account) {
        lock(&self.accounts).insert(address, account);
    }

    pub fn remove_account(&self, address: &Pubkey) {
        lock(&self.accounts).remove(address);
    }

    pub fn add_mint(&self, mint: Pubkey, token_program: Pubkey, decimals: u8) {
        let state = Mint {
            mint_authority: COption::None,
            supply: 0,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; Mint::LEN];
        Mint::pack(state, &mut data).unwrap_or_else(|e| panic!("pack mint: {e}"));
        self.set_account(
            mint,
            Account {
                lamports: 1_461_600,
                data,
                owner: token_program,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    /// Create (or overwrite) `owner`'s ATA for `mint` holding `amount`.
    pub fn fund_token_account(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
        let program = self.account(mint).map(|a| a.owner).unwrap_or(TOKEN_PROGRAM_ID);
        let ata = self
            .address_finder
            .find_associated_token_address(owner, mint, &program);
        self.set_account(ata, token_account(*mint, *owner, amount, program));
        ata
    }

    pub fn script_send(&self, behavior: SendBehavior) {
        lock(&self.send_script).push_back(behavior);
    }

    /// Signature status polls answered "not yet confirmed" before "confirmed".
    pub fn set_polls_before_confirmed(&self, polls: usize) {
        self.polls_before_confirmed.store(polls, Ordering::SeqCst);
    }

    /// Flip the `paused` flag of an initialized global state.
    pub fn set_paused(&self, paused: bool) {
        let (address, _) = self.address_finder.find_global_state_address();
        let mut accounts = lock(&self.accounts);
        if let Some(account) = accounts.get_mut(&address) {
            if let Ok(mut state) = GlobalState::try_from_account_data(&account.data) {
                state.paused = paused;
                if let Ok(data) = state.to_account_data() {
                    account.data = data;
                }
            }
        }
    }

    // Inspection

    pub fn account(&self, address: &Pubkey) -> Option<Account> {
        lock(&self.accounts).get(address).cloned()
    }

    pub fn account_exists(&self, address: &Pubkey) -> bool {
        lock(&self.accounts).contains_key(address)
    }

    pub fn token_balance(&self, address: &Pubkey) -> Option<u64> {
        let account = self.account(address)?;
        TokenAccount::unpack(&account.data).ok().map(|a| a.amount)
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        lock(&self.sent).clone()
    }

    pub fn get_account_calls(&self) -> usize {
        self.get_account_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn blockhash_calls(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    /// Calls that reached the "network" at all.
    pub fn total_calls(&self) -> usize {
        self.get_account_calls() + self.send_calls() + self.status_calls() + self.blockhash_calls()
    }

    // Execution

    fn record_landed(&self, signature: Signature, err: Option<TransactionError>) {
        lock(&self.processed).insert(signature);
        let polls = self.polls_before_confirmed.load(Ordering::SeqCst);
        if polls > 0 {
            lock(&self.unconfirmed_polls).insert(signature, polls);
        }
        lock(&self.statuses).insert(
            signature,
            SignatureStatus {
                err,
                confirmed: true,
            },
        );
    }

    /// Runs every instruction against a copy of the ledger; commits only if all succeed.
    fn execute(&self, tx: &Transaction) -> Result<(), TransactionError> {
        tx.verify()?;

        let mut staged = lock(&self.accounts).clone();
        let keys = &tx.message.account_keys;

        for (index, ix) in tx.message.instructions.iter().enumerate() {
            let program_id = keys[ix.program_id_index as usize];
            let accounts: Vec<Pubkey> = ix.accounts.iter().map(|i| keys[*i as usize]).collect();

            let result = if program_id == *self.address_finder.program_id() {
                self.execute_program(&mut staged, &accounts, &ix.data)
            } else if program_id == ASSOCIATED_TOKEN_PROGRAM_ID {
                self.execute_create_ata(&mut staged, &accounts)
            } else {
                Ok(())
            };

            result.map_err(|e| TransactionError::InstructionError(index as u8, e))?;
        }

        *lock(&self.accounts) = staged;
        Ok(())
    }

    fn execute_program(
        &self,
        staged: &mut HashMap<Pubkey, Account>,
        accounts: &[Pubkey],
        data: &[u8],
    ) -> Result<(), InstructionError> {
        if let Some(args) = InitializeArgs::try_from_instruction_data(data) {
            let (owner, global_state) = (accounts[0], accounts[1]);
            if staged.contains_key(&global_state) {
                return Err(InstructionError::AccountAlreadyInitialized);
            }
            let state = GlobalState {
                owner,
                paused: false,
                supported_token_mints: args.supported_token_mints,
                quests: vec![],
            };
            staged.insert(global_state, self.program_account(&state)?);
            return Ok(());
        }

        if let Some(args) = CreateQuestArgs::try_from_instruction_data(data) {
            return self.execute_create_quest(staged, accounts, args);
        }

        Err(InstructionError::InvalidInstructionData)
    }

    fn execute_create_quest(
        &self,
        staged: &mut HashMap<Pubkey, Account>,
        accounts: &[Pubkey],
        args: CreateQuestArgs,
    ) -> Result<(), InstructionError> {
        let [creator, global_state, token_mint, token_program, escrow, creator_token_account, quest, ..] =
            accounts
        else {
            return Err(InstructionError::NotEnoughAccountKeys);
        };

        let mut state = staged
            .get(global_state)
            .and_then(|a| GlobalState::try_from_account_data(&a.data).ok())
            .ok_or(InstructionError::Custom(ERR_NOT_INITIALIZED))?;
        if state.paused {
            return Err(InstructionError::Custom(ERR_PROGRAM_PAUSED));
        }
        if !state.supports_mint(token_mint) {
            return Err(InstructionError::Custom(ERR_UNSUPPORTED_MINT));
        }
        if staged.get(token_mint).map(|a| a.owner) != Some(*token_program) {
            return Err(InstructionError::IncorrectProgramId);
        }
        if staged.contains_key(quest) {
            return Err(InstructionError::AccountAlreadyInitialized);
        }

        let mut source = staged
            .get(creator_token_account)
            .and_then(|a| TokenAccount::unpack(&a.data).ok())
            .ok_or(InstructionError::UninitializedAccount)?;
        if source.mint != *token_mint || source.owner != *creator {
            return Err(InstructionError::InvalidAccountData);
        }
        if source.amount < args.amount {
            return Err(InstructionError::Custom(ERR_INSUFFICIENT_FUNDS));
        }
        source.amount -= args.amount;
        if let Some(account) = staged.get_mut(creator_token_account) {
            TokenAccount::pack(source, &mut account.data)
                .map_err(|_| InstructionError::InvalidAccountData)?;
        }

        staged.insert(
            *escrow,
            token_account(*token_mint, *escrow, args.amount, *token_program),
        );

        let quest_state = Quest {
            id: args.id.clone(),
            creator: *creator,
            token_mint: *token_mint,
            escrow_account: *escrow,
            amount: args.amount,
            deadline: args.deadline,
            is_active: true,
            total_winners: 0,
            total_reward_distributed: 0,
            max_winners: args.max_winners,
        };
        staged.insert(*quest, self.program_account(&quest_state)?);

        state.quests.push(args.id);
        staged.insert(*global_state, self.program_account(&state)?);
        Ok(())
    }

    fn execute_create_ata(
        &self,
        staged: &mut HashMap<Pubkey, Account>,
        accounts: &[Pubkey],
    ) -> Result<(), InstructionError> {
        let [_funder, ata, wallet, mint, _system, token_program, ..] = accounts else {
            return Err(InstructionError::NotEnoughAccountKeys);
        };

        if *token_program != TOKEN_PROGRAM_ID && *token_program != TOKEN_2022_PROGRAM_ID {
            return Err(InstructionError::IncorrectProgramId);
        }
        if staged.get(mint).map(|a| a.owner) != Some(*token_program) {
            return Err(InstructionError::IncorrectProgramId);
        }
        let expected = self
            .address_finder
            .find_associated_token_address(wallet, mint, token_program);
        if expected != *ata {
            return Err(InstructionError::InvalidSeeds);
        }

        staged
            .entry(*ata)
            .or_insert_with(|| token_account(*mint, *wallet, 0, *token_program));
        Ok(())
    }

    fn program_account<T: ProgramAccount>(&self, state: &T) -> Result<Account, InstructionError> {
        let data = state
            .to_account_data()
            .map_err(|_| InstructionError::AccountDataTooSmall)?;
        Ok(Account {
            lamports: 1_000_000,
            data,
            owner: *self.address_finder.program_id(),
            executable: false,
            rent_epoch: 0,
        })
    }
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new(AddressFinder::default())
    }
}

#[async_trait]
impl SolanaRpc for MockRpc {
    async fn get_account(&self, address: &Pubkey) -> ClientResult<Option<Account>> {
        self.get_account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.account(address))
    }

    async fn get_latest_blockhash(&self) -> ClientResult<(Hash, u64)> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        let n = self.blockhash_counter.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        Ok((Hash::new_from_array(bytes), 1_000 + n))
    }

    async fn send_transaction(&self, tx: &Transaction) -> ClientResult<Signature> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.sent).push(tx.clone());
        let signature = tx.signatures.first().copied().unwrap_or_default();

        if lock(&self.processed).contains(&signature) {
            return Err(rpc_error(ClientErrorKind::TransactionError(
                TransactionError::AlreadyProcessed,
            )));
        }

        let behavior = lock(&self.send_script)
            .pop_front()
            .unwrap_or(SendBehavior::Process);

        match behavior {
            SendBehavior::Process => match self.execute(tx) {
                Ok(()) => {
                    self.record_landed(signature, None);
                    Ok(signature)
                }
                Err(e) => Err(rpc_error(ClientErrorKind::TransactionError(e))),
            },
            SendBehavior::LandThenReportAlreadyProcessed => {
                let err = self.execute(tx).err();
                self.record_landed(signature, err);
                Err(rpc_error(ClientErrorKind::TransactionError(
                    TransactionError::AlreadyProcessed,
                )))
            }
            SendBehavior::ReportAlreadyProcessedWithoutStatus => Err(rpc_error(
                ClientErrorKind::TransactionError(TransactionError::AlreadyProcessed),
            )),
            SendBehavior::LandWithError(err) => {
                self.record_landed(signature, Some(err));
                Ok(signature)
            }
            SendBehavior::RpcError(message) => Err(rpc_error(ClientErrorKind::Custom(message))),
        }
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> ClientResult<Option<SignatureStatus>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let Some(mut status) = lock(&self.statuses).get(signature).cloned() else {
            return Ok(None);
        };

        let mut unconfirmed = lock(&self.unconfirmed_polls);
        if let Some(remaining) = unconfirmed.get_mut(signature) {
            if *remaining > 0 {
                *remaining -= 1;
                status.confirmed = false;
            }
        }
        Ok(Some(status))
    }

    async fn get_program_accounts_with_discriminator(
        &self,
        program_id: &Pubkey,
        discriminator: &[u8],
    ) -> ClientResult<Vec<(Pubkey, Account)>> {
        self.get_account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.accounts)
            .iter()
            .filter(|(_, a)| a.owner == *program_id && a.data.starts_with(discriminator))
            .map(|(k, a)| (*k, a.clone()))
            .collect())
    }
}
