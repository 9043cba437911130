use tracing::info;

use super::WalletDb;
use crate::crypto::{Address, PublicKey};
use crate::error::{Result, WalletDbError};
use crate::records::{AccountRecord, Balance, BalanceId, BalanceRecord, KeyRecord, TransactionRecord};

impl WalletDb {
    fn account_at(&self, index: i32) -> Result<&AccountRecord> {
        self.accounts.get(&index).ok_or_else(|| {
            WalletDbError::Consistency(format!("Secondary index points at missing account {}", index))
        })
    }

    pub fn lookup_account(&self, address: &Address) -> Result<Option<&AccountRecord>> {
        match self.address_to_account.get(address) {
            Some(index) => self.account_at(*index).map(Some),
            None => Ok(None),
        }
    }

    pub fn lookup_account_by_name(&self, name: &str) -> Result<Option<&AccountRecord>> {
        match self.name_to_account.get(name) {
            Some(index) => self.account_at(*index).map(Some),
            None => Ok(None),
        }
    }

    pub fn lookup_account_by_name_id(&self, registered_name_id: u32) -> Result<Option<&AccountRecord>> {
        if registered_name_id == 0 {
            return Ok(None);
        }
        match self.name_id_to_account.get(&registered_name_id) {
            Some(index) => self.account_at(*index).map(Some),
            None => Ok(None),
        }
    }

    pub fn lookup_key(&self, address: &Address) -> Option<&KeyRecord> {
        self.keys.get(address)
    }

    pub fn lookup_balance(&self, balance_id: &BalanceId) -> Option<&BalanceRecord> {
        self.balances.get(balance_id)
    }

    /// Fails if the name, address or nonzero name id is already held by an
    /// account other than the one at `account.index`.
    fn ensure_account_unique(&self, account: &AccountRecord) -> Result<()> {
        let taken_by_other = |owner: Option<&i32>| owner.is_some_and(|index| *index != account.index);

        if taken_by_other(self.name_to_account.get(&account.name)) {
            return Err(WalletDbError::Precondition(format!(
                "Account with name {} already exists",
                account.name
            )));
        }
        if taken_by_other(self.address_to_account.get(&account.account_address)) {
            return Err(WalletDbError::Precondition(format!(
                "Account with address {} already exists",
                account.account_address
            )));
        }
        if account.registered_name_id != 0 && taken_by_other(self.name_id_to_account.get(&account.registered_name_id)) {
            return Err(WalletDbError::Precondition(format!(
                "Account with registered name id {} already exists",
                account.registered_name_id
            )));
        }
        Ok(())
    }

    /// Insert a new account (index 0) or overwrite an existing one in place.
    /// A nonzero index must belong to a loaded account.
    pub fn store_account(&mut self, account: AccountRecord) -> Result<AccountRecord> {
        self.ensure_open()?;
        if account.index != 0 && !self.accounts.contains_key(&account.index) {
            return Err(WalletDbError::Precondition(format!(
                "No account at index {}",
                account.index
            )));
        }
        self.ensure_account_unique(&account)?;

        let mut account = account;
        if account.index == 0 {
            account.index = self.new_index()?;
            self.store_record(&account)?;
            self.load_account_record(account.clone())?;
            return Ok(account);
        }

        self.store_record(&account)?;
        if let Some(old) = self.accounts.remove(&account.index) {
            self.address_to_account.remove(&old.account_address);
            self.name_to_account.remove(&old.name);
            if old.registered_name_id != 0 {
                self.name_id_to_account.remove(&old.registered_name_id);
            }
        }
        self.load_account_record(account.clone())?;
        Ok(account)
    }

    /// Re-storing a known address keeps its original record index. A new
    /// address always gets a freshly allocated index.
    pub fn store_key(&mut self, key: KeyRecord) -> Result<KeyRecord> {
        self.ensure_open()?;
        let address = key.address();
        let mut key = key;

        if let Some(existing) = self.keys.get(&address) {
            key.index = existing.index;
            self.store_record(&key)?;
            self.keys.insert(address, key.clone());
            return Ok(key);
        }

        key.index = self.new_index()?;
        self.store_record(&key)?;
        self.load_key_record(key.clone())?;
        Ok(key)
    }

    /// Register a watch-only contact. The key is written before the account;
    /// a crash in between leaves a key with no account (not rolled back).
    pub fn add_contact_account(&mut self, name: &str, public_key: &PublicKey) -> Result<AccountRecord> {
        self.ensure_open()?;
        let address = public_key.address();
        let account = AccountRecord {
            index: 0,
            name: name.to_string(),
            account_address: address.clone(),
            registered_name_id: 0,
        };
        self.ensure_account_unique(&account)?;

        let mut key = match self.keys.get(&address) {
            Some(existing) => existing.clone(),
            None => KeyRecord::watch_only(*public_key),
        };
        key.account_address = Some(address);
        self.store_key(key)?;

        let account = self.store_account(account)?;
        info!("Added contact account {} ({})", account.name, account.account_address);
        Ok(account)
    }

    /// Write-once per balance id; later calls for the same id are no-ops.
    pub fn cache_balance(&mut self, balance: &Balance) -> Result<()> {
        self.ensure_open()?;
        if self.lookup_balance(&balance.id()).is_some() {
            return Ok(());
        }
        let record = BalanceRecord {
            index: self.new_index()?,
            balance: balance.clone(),
        };
        self.store_record(&record)?;
        self.load_balance_record(record)
    }

    pub fn rename_account(&mut self, _old_account_name: &str, _new_account_name: &str) -> Result<()> {
        Err(WalletDbError::NotImplemented("rename_account"))
    }

    pub fn store_transaction(&mut self, _transaction: &TransactionRecord) -> Result<()> {
        Err(WalletDbError::NotImplemented("store_transaction"))
    }
}
