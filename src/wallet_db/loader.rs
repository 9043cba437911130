use tracing::{debug, info, warn};

use super::WalletDb;
use crate::error::{Result, WalletDbError};
use crate::records::{
    AccountRecord, BalanceRecord, GenericRecord, KeyRecord, MasterKeyRecord, PropertyRecord, RecordType,
};

impl WalletDb {
    /// Rebuild every index from the store. Per-record failures are logged
    /// and skipped; only store-level failures abort.
    pub(super) fn load_all(&mut self) -> Result<()> {
        self.clear_indices();

        let mut loaded = 0usize;
        let mut skipped = 0usize;
        for entry in self.records.records()? {
            let (index, record) = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable wallet record: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            match self.load_generic_record(index, &record) {
                Ok(()) => loaded += 1,
                Err(e) => {
                    warn!("Error loading wallet record:\n{}\nreason: {}", record, e);
                    skipped += 1;
                }
            }
        }

        info!("Wallet database loaded: {} records, {} skipped", loaded, skipped);
        Ok(())
    }

    fn load_generic_record(&mut self, index: i32, record: &GenericRecord) -> Result<()> {
        if record.index != index {
            return Err(WalletDbError::Consistency(format!(
                "Record stored at {} claims index {}",
                index, record.index
            )));
        }
        match record.record_type {
            RecordType::MasterKey => self.load_master_key_record(record.decode()?),
            RecordType::Account => self.load_account_record(record.decode()?),
            RecordType::Key => self.load_key_record(record.decode()?),
            RecordType::Balance => self.load_balance_record(record.decode()?),
            RecordType::Property => self.load_property_record(record.decode()?),
            // Kept on disk and in exports, not indexed
            RecordType::Transaction | RecordType::Name | RecordType::Asset => {
                debug!("Record {} ({:?}) left on disk", index, record.record_type);
                Ok(())
            }
        }
    }

    pub(super) fn load_master_key_record(&mut self, mut key: MasterKeyRecord) -> Result<()> {
        if self.master_key.is_some() {
            return Err(WalletDbError::Consistency("Master key already set".to_string()));
        }
        // Records written without a round count were encrypted under the configured one
        if key.kdf_rounds == 0 {
            key.kdf_rounds = self.config.kdf_iterations;
        }
        self.master_key = Some(key);
        Ok(())
    }

    /// Checks every secondary index before touching any of them, so a rejected
    /// account leaves no partial entries behind.
    pub(super) fn load_account_record(&mut self, account: AccountRecord) -> Result<()> {
        if self.accounts.contains_key(&account.index) {
            return Err(WalletDbError::Precondition(format!(
                "Account index {} already in use",
                account.index
            )));
        }
        if self.address_to_account.contains_key(&account.account_address) {
            return Err(WalletDbError::Precondition(format!(
                "Account with address {} already exists",
                account.account_address
            )));
        }
        if account.registered_name_id != 0 && self.name_id_to_account.contains_key(&account.registered_name_id) {
            return Err(WalletDbError::Precondition(format!(
                "Account with registered name id {} already exists",
                account.registered_name_id
            )));
        }
        if self.name_to_account.contains_key(&account.name) {
            return Err(WalletDbError::Precondition(format!(
                "Account with name {} already exists",
                account.name
            )));
        }

        self.address_to_account.insert(account.account_address.clone(), account.index);
        if account.registered_name_id != 0 {
            self.name_id_to_account.insert(account.registered_name_id, account.index);
        }
        self.name_to_account.insert(account.name.clone(), account.index);
        self.accounts.insert(account.index, account);
        Ok(())
    }

    pub(super) fn load_key_record(&mut self, mut key: KeyRecord) -> Result<()> {
        let address = key.address();
        if self.keys.contains_key(&address) {
            return Err(WalletDbError::Precondition(format!("Key {} should be unique", address)));
        }
        if key.kdf_rounds == 0 && key.has_private_key() {
            key.kdf_rounds = self.config.kdf_iterations;
        }
        self.keys.insert(address, key);
        Ok(())
    }

    pub(super) fn load_balance_record(&mut self, record: BalanceRecord) -> Result<()> {
        let id = record.balance.id();
        if self.balances.contains_key(&id) {
            return Err(WalletDbError::Precondition(format!("Balance {} already cached", id.0)));
        }
        self.balances.insert(id, record);
        Ok(())
    }

    pub(super) fn load_property_record(&mut self, property: PropertyRecord) -> Result<()> {
        if property.index != property.property_id.record_index() {
            return Err(WalletDbError::Consistency(format!(
                "Property {:?} stored at index {}",
                property.property_id, property.index
            )));
        }
        self.properties.insert(property.property_id, property);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::crypto::PrivateKey;
    use crate::records::{AssetRecord, Balance, NameRecord, PropertyId, TransactionRecord};

    fn account(index: i32, name: &str, key: &PrivateKey, name_id: u32) -> AccountRecord {
        AccountRecord {
            index,
            name: name.to_string(),
            account_address: key.address(),
            registered_name_id: name_id,
        }
    }

    #[test]
    fn test_load_rebuilds_indices() {
        let (dir, mut db) = open_temp();
        let alice = PrivateKey::generate();
        let bob = PrivateKey::generate();

        db.store_record(&account(10, "alice", &alice, 7)).unwrap();
        db.store_record(&account(11, "bob", &bob, 0)).unwrap();
        let mut key = KeyRecord::watch_only(alice.public_key());
        key.index = 12;
        db.store_record(&key).unwrap();

        reopen(&mut db, &dir);

        assert_eq!(db.accounts().count(), 2);
        for (name, private) in [("alice", &alice), ("bob", &bob)] {
            let by_address = db.lookup_account(&private.address()).unwrap().unwrap().clone();
            let by_name = db.lookup_account_by_name(name).unwrap().unwrap();
            assert_eq!(&by_address, by_name);
            assert_eq!(db.address_to_account[&private.address()], by_address.index);
            assert_eq!(db.name_to_account[name], by_address.index);
        }
        assert_eq!(db.lookup_account_by_name_id(7).unwrap().unwrap().name, "alice");
        assert!(db.lookup_account_by_name_id(0).unwrap().is_none());
        assert_eq!(db.lookup_key(&alice.address()), Some(&key));
    }

    #[test]
    fn test_duplicate_accounts_skipped_without_aborting() {
        let (dir, mut db) = open_temp();
        let alice = PrivateKey::generate();
        let other = PrivateKey::generate();
        let carol = PrivateKey::generate();

        db.store_record(&account(1, "alice", &alice, 0)).unwrap();
        // Same name, different address
        db.store_record(&account(2, "alice", &other, 0)).unwrap();
        // Same address, different name
        db.store_record(&account(3, "alice2", &alice, 0)).unwrap();
        // Valid record after the bad ones
        db.store_record(&account(4, "carol", &carol, 0)).unwrap();

        reopen(&mut db, &dir);

        let names: Vec<&str> = db.accounts().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "carol"]);
        assert!(db.lookup_account(&other.address()).unwrap().is_none());
        assert_eq!(db.lookup_account(&alice.address()).unwrap().unwrap().index, 1);
        // Rejected records leave no stray secondary entries
        assert!(!db.name_to_account.contains_key("alice2"));
        assert_eq!(db.address_to_account.len(), 2);
    }

    #[test]
    fn test_second_master_key_ignored() {
        let (dir, mut db) = open_temp();
        db.set_master_key(&master_key(), PASSWORD).unwrap();
        let first = db.master_key().unwrap().clone();

        let mut second = first.clone();
        second.index = 99;
        second.salt = vec![1, 2, 3];
        db.store_record(&second).unwrap();

        reopen(&mut db, &dir);
        assert_eq!(db.master_key(), Some(&first));
    }

    #[test]
    fn test_duplicate_key_and_corrupt_record_skipped() {
        let (dir, mut db) = open_temp();
        let private = PrivateKey::generate();

        let mut key = KeyRecord::watch_only(private.public_key());
        key.index = 1;
        db.store_record(&key).unwrap();
        let mut dup = key.clone();
        dup.index = 2;
        db.store_record(&dup).unwrap();

        let corrupt = GenericRecord {
            index: 3,
            record_type: RecordType::Account,
            data: serde_json::json!({ "name": 5 }),
        };
        db.store_generic_record(3, &corrupt).unwrap();

        let mismatched = GenericRecord::new(&account(40, "dave", &PrivateKey::generate(), 0)).unwrap();
        db.store_generic_record(4, &mismatched).unwrap();

        let erin = PrivateKey::generate();
        db.store_record(&account(5, "erin", &erin, 0)).unwrap();

        reopen(&mut db, &dir);
        assert_eq!(db.keys().count(), 1);
        assert_eq!(db.lookup_key(&private.address()).unwrap().index, 1);
        let names: Vec<&str> = db.accounts().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["erin"]);
    }

    #[test]
    fn test_malformed_store_key_skipped() {
        let (dir, mut db) = open_temp();
        let alice = PrivateKey::generate();
        db.store_record(&account(1, "alice", &alice, 0)).unwrap();
        db.records.put_raw(&[0x80, 0, 2], b"{}").unwrap();
        let bob = PrivateKey::generate();
        db.store_record(&account(2, "bob", &bob, 0)).unwrap();

        reopen(&mut db, &dir);
        let names: Vec<&str> = db.accounts().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_reload_dispatch_per_record_type() {
        let (dir, mut db) = open_temp();
        let owner = PrivateKey::generate();

        assert_eq!(db.new_index().unwrap(), 1);
        db.cache_balance(&Balance { owner: owner.address(), asset_id: 0, amount: 50 }).unwrap();
        db.set_property(PropertyId::DefaultTransactionFee, serde_json::json!(1000)).unwrap();

        db.store_record(&TransactionRecord {
            index: 100,
            trx_id: "abc".to_string(),
            memo: String::new(),
            data: serde_json::Value::Null,
        })
        .unwrap();
        db.store_record(&NameRecord {
            index: 101,
            name_id: 3,
            name: "carol".to_string(),
            owner: owner.public_key(),
        })
        .unwrap();
        db.store_record(&AssetRecord {
            index: 102,
            asset_id: 1,
            symbol: "XTS".to_string(),
            name: "test shares".to_string(),
            precision: 100_000,
        })
        .unwrap();

        reopen(&mut db, &dir);

        // Balances and properties come back into memory
        assert_eq!(db.balances().count(), 1);
        assert_eq!(db.get_property(PropertyId::DefaultTransactionFee), serde_json::json!(1000));
        assert_eq!(db.new_index().unwrap(), 3);

        // Transactions, names and assets are persisted but not indexed
        assert_eq!(db.accounts().count(), 0);
        let stored: Vec<i32> = db
            .records
            .records()
            .unwrap()
            .into_iter()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert!(stored.contains(&100) && stored.contains(&101) && stored.contains(&102));
    }
}
