use tracing::{debug, info};

use super::WalletDb;
use crate::crypto::{self, Address, ExtendedKey, PrivateKey};
use crate::error::{Result, WalletDbError};
use crate::records::{KeyRecord, MasterKeyRecord, MemoData, MemoStatus};

impl MasterKeyRecord {
    pub fn encrypt(key: &ExtendedKey, password: &str, rounds: u32) -> Result<Self> {
        let salt = crypto::new_salt();
        let encrypted_seed = crypto::encrypt_data(key.seed(), password, &salt, rounds)?;
        Ok(MasterKeyRecord {
            index: 0,
            encrypted_seed,
            salt,
            kdf_rounds: rounds,
        })
    }

    /// Uses the rounds stored with the record, not the current config.
    /// A wrong password fails the GCM tag check; it never yields a different key.
    pub fn decrypt_key(&self, password: &str) -> Result<ExtendedKey> {
        let seed = crypto::decrypt_data(&self.encrypted_seed, password, &self.salt, self.kdf_rounds)?;
        Ok(ExtendedKey::from_seed(&seed))
    }
}

impl KeyRecord {
    /// Replaces the public key with the one matching `key`, which also moves
    /// the record to that key's address.
    pub fn encrypt_private_key(&mut self, password: &str, key: &PrivateKey, rounds: u32) -> Result<()> {
        let salt = crypto::new_salt();
        self.encrypted_private_key = Some(crypto::encrypt_data(&key.to_bytes(), password, &salt, rounds)?);
        self.salt = salt;
        self.kdf_rounds = rounds;
        self.public_key = key.public_key();
        Ok(())
    }

    pub fn decrypt_private_key(&self, password: &str) -> Result<PrivateKey> {
        let blob = self
            .encrypted_private_key
            .as_ref()
            .filter(|blob| !blob.is_empty())
            .ok_or_else(|| WalletDbError::Precondition(format!("Key {} is watch-only", self.address())))?;

        let secret = crypto::decrypt_data(blob, password, &self.salt, self.kdf_rounds)?;
        let key = PrivateKey::from_bytes(&secret)?;
        if key.public_key() != self.public_key {
            return Err(WalletDbError::Crypto(format!(
                "Decrypted key does not match stored public key for {}",
                self.address()
            )));
        }
        Ok(key)
    }
}

impl WalletDb {
    /// Create the single master key record. Fails if one already exists.
    pub fn set_master_key(&mut self, key: &ExtendedKey, password: &str) -> Result<()> {
        self.ensure_open()?;
        if self.master_key.is_some() {
            return Err(WalletDbError::Precondition("Master key already set".to_string()));
        }
        let mut record = MasterKeyRecord::encrypt(key, password, self.config.kdf_iterations)?;
        record.index = self.new_index()?;
        self.store_record(&record)?;
        self.load_master_key_record(record)?;
        info!("Master key stored");
        Ok(())
    }

    fn decrypt_master_key(&self, password: &str) -> Result<ExtendedKey> {
        let master = self
            .master_key
            .as_ref()
            .ok_or_else(|| WalletDbError::Precondition("Wallet has no master key".to_string()))?;
        master.decrypt_key(password)
    }

    /// Derive the child key at `child_index` without touching the counter
    pub fn derive_private_key(&self, password: &str, child_index: i32) -> Result<PrivateKey> {
        let master = self.decrypt_master_key(password)?;
        master.child(&self.config.derivation_path, child_index)
    }

    /// Derive the next child key, store it encrypted under `password` and
    /// return the plaintext key.
    pub fn new_private_key(&mut self, password: &str, parent_account_address: &Address) -> Result<PrivateKey> {
        // Decrypt first so a bad password does not burn a child index
        let master = self.decrypt_master_key(password)?;
        let child_index = self.new_key_child_index()?;
        let private_key = master.child(&self.config.derivation_path, child_index)?;

        let mut key = KeyRecord::watch_only(private_key.public_key());
        key.account_address = Some(parent_account_address.clone());
        key.encrypt_private_key(password, &private_key, self.config.kdf_iterations)?;
        let stored = self.store_key(key)?;

        debug!("Derived child key {} at record {}", child_index, stored.index);
        Ok(private_key)
    }

    /// Keep the owner key recovered from a memo. The record is addressed by
    /// the owner key and points back at the account whose key decoded it.
    pub fn cache_memo(&mut self, memo: &MemoStatus, account_key: &PrivateKey, password: &str) -> Result<KeyRecord> {
        let mut key = KeyRecord::watch_only(memo.owner_private_key.public_key());
        key.account_address = Some(account_key.address());
        key.memo = Some(MemoData {
            message: memo.message.clone(),
        });
        key.valid_from_signature = memo.has_valid_signature;
        key.encrypt_private_key(password, &memo.owner_private_key, self.config.kdf_iterations)?;
        self.store_key(key)
    }

    pub fn has_private_key(&self, address: &Address) -> bool {
        self.keys.get(address).is_some_and(KeyRecord::has_private_key)
    }

    /// Private keys of every account that has one. Watch-only accounts are skipped.
    pub fn get_account_private_keys(&self, password: &str) -> Result<Vec<PrivateKey>> {
        let mut keys = Vec::with_capacity(self.accounts.len());
        for account in self.accounts.values() {
            if let Some(key) = self.keys.get(&account.account_address) {
                if key.has_private_key() {
                    keys.push(key.decrypt_private_key(password)?);
                }
            }
        }
        Ok(keys)
    }
}
