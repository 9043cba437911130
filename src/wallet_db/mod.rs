//! Encrypted wallet database
//!
//! `WalletDb` owns the record store handle and every in-memory index built
//! from it. Nothing here is shared across instances and nothing is locked:
//! callers must serialize access to one database themselves.
//!
//! - `loader`: replays persisted records into the indices at open
//! - `index`: account/key/balance lookups and interactive inserts
//! - `keys`: master key, child key derivation, memo keys
//! - `properties`: settings and the two persisted counters
//! - `export`: JSON export and import

mod export;
mod index;
mod keys;
mod loader;
mod properties;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

use crate::config::WalletDbConfig;
use crate::crypto::Address;
use crate::error::{Result, WalletDbError};
use crate::records::{
    AccountRecord, BalanceId, BalanceRecord, GenericRecord, KeyRecord, MasterKeyRecord, PropertyId,
    PropertyRecord, WalletRecord,
};
use crate::storage::RecordStore;

pub struct WalletDb {
    config: WalletDbConfig,
    records: RecordStore,

    master_key: Option<MasterKeyRecord>,
    accounts: BTreeMap<i32, AccountRecord>,
    keys: HashMap<Address, KeyRecord>,
    balances: HashMap<BalanceId, BalanceRecord>,
    properties: HashMap<PropertyId, PropertyRecord>,

    address_to_account: HashMap<Address, i32>,
    name_id_to_account: HashMap<u32, i32>,
    name_to_account: HashMap<String, i32>,
}

impl Default for WalletDb {
    fn default() -> Self {
        Self::new(WalletDbConfig::default())
    }
}

impl std::fmt::Debug for WalletDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletDb")
            .field("open", &self.is_open())
            .field("has_master_key", &self.master_key.is_some())
            .field("accounts", &self.accounts.len())
            .field("keys", &self.keys.len())
            .field("balances", &self.balances.len())
            .finish()
    }
}

impl WalletDb {
    pub fn new(config: WalletDbConfig) -> Self {
        WalletDb {
            config,
            records: RecordStore::new(),
            master_key: None,
            accounts: BTreeMap::new(),
            keys: HashMap::new(),
            balances: HashMap::new(),
            properties: HashMap::new(),
            address_to_account: HashMap::new(),
            name_id_to_account: HashMap::new(),
            name_to_account: HashMap::new(),
        }
    }

    pub fn config(&self) -> &WalletDbConfig {
        &self.config
    }

    /// Open the backing store and rebuild the in-memory indices from it.
    /// Records that fail to load are logged and skipped.
    pub fn open(&mut self, path: &Path, create_if_missing: bool) -> Result<()> {
        if self.is_open() {
            return Err(WalletDbError::Precondition("Wallet database already open".to_string()));
        }
        info!("Opening wallet database at {}", path.display());
        self.records.open(path, create_if_missing)?;
        self.load_all()
    }

    /// `open` with the config's `create_if_missing`
    pub fn open_configured(&mut self, path: &Path) -> Result<()> {
        let create_if_missing = self.config.create_if_missing;
        self.open(path, create_if_missing)
    }

    /// Drop the store handle and every in-memory cache. Persisted data stays.
    pub fn close(&mut self) {
        self.records.close();
        self.clear_indices();
    }

    pub fn is_open(&self) -> bool {
        self.records.is_open()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if !self.is_open() {
            return Err(WalletDbError::Precondition("Wallet database is not open".to_string()));
        }
        Ok(())
    }

    pub fn store_generic_record(&mut self, index: i32, record: &GenericRecord) -> Result<()> {
        self.ensure_open()?;
        if index == 0 {
            return Err(WalletDbError::Precondition(format!("Invalid record index 0 for {}", record)));
        }
        self.records.store(index, record)
    }

    pub fn store_record<R: WalletRecord>(&mut self, record: &R) -> Result<()> {
        let generic = GenericRecord::new(record)?;
        self.store_generic_record(record.index(), &generic)
    }

    pub fn master_key(&self) -> Option<&MasterKeyRecord> {
        self.master_key.as_ref()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountRecord> {
        self.accounts.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &KeyRecord> {
        self.keys.values()
    }

    pub fn balances(&self) -> impl Iterator<Item = &BalanceRecord> {
        self.balances.values()
    }

    fn clear_indices(&mut self) {
        self.master_key = None;
        self.accounts.clear();
        self.keys.clear();
        self.balances.clear();
        self.properties.clear();
        self.address_to_account.clear();
        self.name_id_to_account.clear();
        self.name_to_account.clear();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::crypto::ExtendedKey;

    pub const PASSWORD: &str = "correct horse battery staple";
    pub const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    pub fn test_config() -> WalletDbConfig {
        WalletDbConfig {
            kdf_iterations: 16,
            log_filter: "debug".to_string(),
            ..WalletDbConfig::default()
        }
    }

    pub fn open_temp() -> (tempfile::TempDir, WalletDb) {
        let config = test_config();
        config.init_logging();
        let dir = tempfile::tempdir().unwrap();
        let mut db = WalletDb::new(config);
        db.open_configured(&dir.path().join("wallet")).unwrap();
        (dir, db)
    }

    pub fn reopen(db: &mut WalletDb, dir: &tempfile::TempDir) {
        db.close();
        db.open(&dir.path().join("wallet"), false).unwrap();
    }

    pub fn master_key() -> ExtendedKey {
        ExtendedKey::from_mnemonic(PHRASE).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::crypto::PrivateKey;

    #[test]
    fn test_open_close_lifecycle() {
        let (dir, mut db) = open_temp();
        assert!(db.is_open());

        let contact = PrivateKey::generate().public_key();
        db.add_contact_account("bob", &contact).unwrap();
        db.set_master_key(&master_key(), PASSWORD).unwrap();

        db.close();
        assert!(!db.is_open());
        assert!(db.master_key().is_none());
        assert_eq!(db.accounts().count(), 0);
        assert_eq!(db.keys().count(), 0);

        db.open(&dir.path().join("wallet"), false).unwrap();
        assert!(db.master_key().is_some());
        assert_eq!(db.accounts().count(), 1);
        assert_eq!(db.keys().count(), 1);
    }

    #[test]
    fn test_open_twice_rejected() {
        let (dir, mut db) = open_temp();
        assert!(matches!(
            db.open(&dir.path().join("other"), true),
            Err(WalletDbError::Precondition(_))
        ));
    }

    #[test]
    fn test_open_configured_honours_create_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = WalletDb::new(WalletDbConfig {
            create_if_missing: false,
            ..test_config()
        });
        assert!(db.open_configured(&dir.path().join("absent")).is_err());
        assert!(!db.is_open());

        let mut db = WalletDb::new(test_config());
        db.open_configured(&dir.path().join("fresh")).unwrap();
        assert!(db.is_open());
    }

    #[test]
    fn test_store_generic_record_preconditions() {
        let (_dir, mut db) = open_temp();
        let record = GenericRecord::new(&PropertyRecord::new(PropertyId::Version, serde_json::json!(1))).unwrap();

        assert!(matches!(
            db.store_generic_record(0, &record),
            Err(WalletDbError::Precondition(_))
        ));

        db.close();
        assert!(matches!(
            db.store_generic_record(5, &record),
            Err(WalletDbError::Precondition(_))
        ));
    }

    #[test]
    fn test_empty_database_scenario() {
        let (_dir, mut db) = open_temp();
        assert_eq!(db.new_index().unwrap(), 1);
        assert_eq!(db.new_index().unwrap(), 2);

        db.set_master_key(&master_key(), PASSWORD).unwrap();
        let owner = PrivateKey::generate().address();

        let first = db.new_private_key(PASSWORD, &owner).unwrap();
        let second = db.new_private_key(PASSWORD, &owner).unwrap();
        assert_ne!(first, second);

        for key in [&first, &second] {
            let record = db.lookup_key(&key.address()).expect("derived key indexed");
            assert_eq!(record.account_address.as_ref(), Some(&owner));
            assert!(db.has_private_key(&key.address()));
        }
    }
}
