/*!
# Token Account Resolution

Works out which token program owns a mint, derives associated token accounts from it, and
caches both answers. Program ownership never changes at runtime, so it is cached for the
cache's lifetime; ATA existence is cached for a short TTL.
*/

use crate::{
    errors::{ClientError, ClientResult},
    rpc::SolanaRpc,
};
use questboard_sdk::{AddressFinder, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID};
use solana_sdk::pubkey::Pubkey;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::time::Instant;
use tracing::debug;

pub const ATA_CACHE_TTL: Duration = Duration::from_secs(60);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The token program a transaction should try after `program_id` was rejected.
pub fn alternate_token_program(program_id: &Pubkey) -> Pubkey {
    if *program_id == TOKEN_2022_PROGRAM_ID {
        TOKEN_PROGRAM_ID
    } else {
        TOKEN_2022_PROGRAM_ID
    }
}

/// mint -> owning token program
#[derive(Debug, Default)]
pub struct TokenProgramCache {
    entries: Mutex<HashMap<Pubkey, Pubkey>>,
}

impl TokenProgramCache {
    pub fn get(&self, mint: &Pubkey) -> Option<Pubkey> {
        lock(&self.entries).get(mint).copied()
    }

    pub fn insert(&self, mint: Pubkey, program_id: Pubkey) {
        lock(&self.entries).insert(mint, program_id);
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

#[derive(Debug, Clone, Copy)]
struct AtaCacheEntry {
    exists: bool,
    checked_at: Instant,
}

/// (owner, mint) -> ATA exists, valid for `ttl`
#[derive(Debug)]
pub struct AtaExistenceCache {
    ttl: Duration,
    entries: Mutex<HashMap<(Pubkey, Pubkey), AtaCacheEntry>>,
}

impl AtaExistenceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// `None` when there is no entry or it is older than the TTL.
    pub fn get(&self, owner: &Pubkey, mint: &Pubkey) -> Option<bool> {
        let entries = lock(&self.entries);
        let entry = entries.get(&(*owner, *mint))?;
        (entry.checked_at.elapsed() < self.ttl).then_some(entry.exists)
    }

    pub fn insert(&self, owner: Pubkey, mint: Pubkey, exists: bool) {
        lock(&self.entries).insert(
            (owner, mint),
            AtaCacheEntry {
                exists,
                checked_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, owner: &Pubkey, mint: &Pubkey) {
        lock(&self.entries).remove(&(*owner, *mint));
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

impl Default for AtaExistenceCache {
    fn default() -> Self {
        Self::new(ATA_CACHE_TTL)
    }
}

pub struct TokenAccountResolver<R> {
    rpc: Arc<R>,
    address_finder: AddressFinder,
    program_ids: Arc<TokenProgramCache>,
    ata_cache: Arc<AtaExistenceCache>,
}

impl<R: SolanaRpc> TokenAccountResolver<R> {
    pub fn new(rpc: Arc<R>, address_finder: AddressFinder) -> Self {
        Self::with_caches(
            rpc,
            address_finder,
            Arc::new(TokenProgramCache::default()),
            Arc::new(AtaExistenceCache::default()),
        )
    }

    pub fn with_caches(
        rpc: Arc<R>,
        address_finder: AddressFinder,
        program_ids: Arc<TokenProgramCache>,
        ata_cache: Arc<AtaExistenceCache>,
    ) -> Self {
        Self {
            rpc,
            address_finder,
            program_ids,
            ata_cache,
        }
    }

    pub fn ata_cache(&self) -> &AtaExistenceCache {
        &self.ata_cache
    }

    pub fn program_id_cache(&self) -> &TokenProgramCache {
        &self.program_ids
    }

    /// Read the mint's owner from chain; guessing produces "incorrect program id" failures.
    pub async fn resolve_token_program_id(&self, mint: &Pubkey) -> ClientResult<Pubkey> {
        if let Some(program_id) = self.program_ids.get(mint) {
            return Ok(program_id);
        }

        let account = self
            .rpc
            .get_account(mint)
            .await?
            .ok_or(ClientError::MintNotFound(*mint))?;

        if account.owner != TOKEN_PROGRAM_ID && account.owner != TOKEN_2022_PROGRAM_ID {
            return Err(ClientError::NotATokenMint {
                account: *mint,
                owner: account.owner,
            });
        }

        debug!(%mint, program_id = %account.owner, "resolved token program");
        self.program_ids.insert(*mint, account.owner);
        Ok(account.owner)
    }

    pub async fn find_ata(&self, owner: &Pubkey, mint: &Pubkey) -> ClientResult<Pubkey> {
        let program_id = self.resolve_token_program_id(mint).await?;
        Ok(self
            .address_finder
            .find_associated_token_address(owner, mint, &program_id))
    }

    pub async fn check_ata_exists(&self, owner: &Pubkey, mint: &Pubkey) -> ClientResult<bool> {
        if let Some(exists) = self.ata_cache.get(owner, mint) {
            return Ok(exists);
        }

        let ata = self.find_ata(owner, mint).await?;
        let exists = self.rpc.get_account(&ata).await?.is_some();

        debug!(%owner, %mint, %ata, exists, "checked ATA");
        self.ata_cache.insert(*owner, *mint, exists);
        Ok(exists)
    }

    pub fn mark_ata_exists(&self, owner: &Pubkey, mint: &Pubkey) {
        self.ata_cache.insert(*owner, *mint, true);
    }

    pub fn invalidate_ata(&self, owner: &Pubkey, mint: &Pubkey) {
        self.ata_cache.invalidate(owner, mint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::SignatureStatus;
    use async_trait::async_trait;
    use solana_sdk::{
        account::Account, hash::Hash, signature::Signature, transaction::Transaction,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves account lookups from a map and counts them.
    #[derive(Default)]
    struct AccountsOnlyRpc {
        accounts: Mutex<HashMap<Pubkey, Account>>,
        get_account_calls: AtomicUsize,
    }

    impl AccountsOnlyRpc {
        fn put(&self, address: Pubkey, owner: Pubkey) {
            lock(&self.accounts).insert(
                address,
                Account {
                    lamports: 1,
                    data: vec![],
                    owner,
                    executable: false,
                    rent_epoch: 0,
                },
            );
        }

        fn calls(&self) -> usize {
            self.get_account_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SolanaRpc for AccountsOnlyRpc {
        async fn get_account(&self, address: &Pubkey) -> ClientResult<Option<Account>> {
            self.get_account_calls.fetch_add(1, Ordering::SeqCst);
            Ok(lock(&self.accounts).get(address).cloned())
        }

        async fn get_latest_blockhash(&self) -> ClientResult<(Hash, u64)> {
            unimplemented!()
        }

        async fn send_transaction(&self, _tx: &Transaction) -> ClientResult<Signature> {
            unimplemented!()
        }

        async fn get_signature_status(
            &self,
            _signature: &Signature,
        ) -> ClientResult<Option<SignatureStatus>> {
            unimplemented!()
        }

        async fn get_program_accounts_with_discriminator(
            &self,
            _program_id: &Pubkey,
            _discriminator: &[u8],
        ) -> ClientResult<Vec<(Pubkey, Account)>> {
            unimplemented!()
        }
    }

    fn resolver(rpc: &Arc<AccountsOnlyRpc>) -> TokenAccountResolver<AccountsOnlyRpc> {
        TokenAccountResolver::new(rpc.clone(), AddressFinder::default())
    }

    #[tokio::test]
    async fn test_program_id_follows_mint_owner() {
        let rpc = Arc::new(AccountsOnlyRpc::default());
        let legacy_mint = Pubkey::new_unique();
        let extended_mint = Pubkey::new_unique();
        rpc.put(legacy_mint, TOKEN_PROGRAM_ID);
        rpc.put(extended_mint, TOKEN_2022_PROGRAM_ID);
        let resolver = resolver(&rpc);

        for _ in 0..3 {
            assert_eq!(
                resolver.resolve_token_program_id(&legacy_mint).await.unwrap(),
                TOKEN_PROGRAM_ID
            );
            assert_eq!(
                resolver.resolve_token_program_id(&extended_mint).await.unwrap(),
                TOKEN_2022_PROGRAM_ID
            );
        }
        assert_eq!(rpc.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_mint_and_foreign_owner() {
        let rpc = Arc::new(AccountsOnlyRpc::default());
        let not_a_mint = Pubkey::new_unique();
        rpc.put(not_a_mint, Pubkey::new_unique());
        let resolver = resolver(&rpc);

        let missing = Pubkey::new_unique();
        assert!(matches!(
            resolver.resolve_token_program_id(&missing).await,
            Err(ClientError::MintNotFound(m)) if m == missing
        ));
        assert!(matches!(
            resolver.resolve_token_program_id(&not_a_mint).await,
            Err(ClientError::NotATokenMint { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ata_existence_cached_for_ttl() {
        let rpc = Arc::new(AccountsOnlyRpc::default());
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        rpc.put(mint, TOKEN_PROGRAM_ID);
        let resolver = resolver(&rpc);

        assert!(!resolver.check_ata_exists(&owner, &mint).await.unwrap());
        let after_first = rpc.calls();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!resolver.check_ata_exists(&owner, &mint).await.unwrap());
        assert_eq!(rpc.calls(), after_first);

        // Created meanwhile, visible once the entry expires
        let ata = resolver.find_ata(&owner, &mint).await.unwrap();
        rpc.put(ata, TOKEN_PROGRAM_ID);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(resolver.check_ata_exists(&owner, &mint).await.unwrap());
        assert_eq!(rpc.calls(), after_first + 1);
    }

    #[test]
    fn test_alternate_program() {
        assert_eq!(alternate_token_program(&TOKEN_PROGRAM_ID), TOKEN_2022_PROGRAM_ID);
        assert_eq!(alternate_token_program(&TOKEN_2022_PROGRAM_ID), TOKEN_PROGRAM_ID);
    }

    #[test]
    fn test_cache_invalidation() {
        let cache = AtaExistenceCache::default();
        let (owner, mint) = (Pubkey::new_unique(), Pubkey::new_unique());

        cache.insert(owner, mint, false);
        assert_eq!(cache.get(&owner, &mint), Some(false));
        cache.invalidate(&owner, &mint);
        assert_eq!(cache.get(&owner, &mint), None);

        cache.insert(owner, mint, true);
        cache.clear();
        assert_eq!(cache.get(&owner, &mint), None);
    }
}
