//! Persisted wallet record types
//!
//! Every record on disk is a [`GenericRecord`]: an index, an integer type tag
//! and a JSON payload. Typed records implement [`WalletRecord`] and are
//! converted to and from the generic form per tag.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::{Address, PrivateKey, PublicKey};
use crate::error::{Result, WalletDbError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    MasterKey = 0,
    Account = 1,
    Key = 2,
    Transaction = 3,
    Balance = 4,
    Name = 5,
    Asset = 6,
    Property = 7,
}

impl TryFrom<u8> for RecordType {
    type Error = WalletDbError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(RecordType::MasterKey),
            1 => Ok(RecordType::Account),
            2 => Ok(RecordType::Key),
            3 => Ok(RecordType::Transaction),
            4 => Ok(RecordType::Balance),
            5 => Ok(RecordType::Name),
            6 => Ok(RecordType::Asset),
            7 => Ok(RecordType::Property),
            _ => Err(WalletDbError::Serialization(format!("Unknown record type {}", tag))),
        }
    }
}

impl Serialize for RecordType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for RecordType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = u8::deserialize(deserializer)?;
        RecordType::try_from(tag).map_err(serde::de::Error::custom)
    }
}

/// A typed payload that can live in the record store
pub trait WalletRecord: Serialize + DeserializeOwned {
    const TYPE: RecordType;

    fn index(&self) -> i32;
    fn set_index(&mut self, index: i32);
}

/// The on-disk unit. `data` stays untyped until a loader asks for a concrete type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenericRecord {
    pub index: i32,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub data: serde_json::Value,
}

impl GenericRecord {
    pub fn new<R: WalletRecord>(record: &R) -> Result<Self> {
        Ok(GenericRecord {
            index: record.index(),
            record_type: R::TYPE,
            data: serde_json::to_value(record)?,
        })
    }

    pub fn decode<R: WalletRecord>(&self) -> Result<R> {
        if self.record_type != R::TYPE {
            return Err(WalletDbError::Serialization(format!(
                "Record {} has type {:?}, expected {:?}",
                self.index,
                self.record_type,
                R::TYPE
            )));
        }
        let mut record: R = serde_json::from_value(self.data.clone())?;
        // The envelope index is authoritative
        record.set_index(self.index);
        Ok(record)
    }
}

impl std::fmt::Display for GenericRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {:?} {}", self.index, self.record_type, self.data)
    }
}

macro_rules! wallet_record {
    ($ty:ty, $tag:expr) => {
        impl WalletRecord for $ty {
            const TYPE: RecordType = $tag;

            fn index(&self) -> i32 {
                self.index
            }

            fn set_index(&mut self, index: i32) {
                self.index = index;
            }
        }
    };
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MasterKeyRecord {
    #[serde(default)]
    pub index: i32,
    /// AES-GCM blob of the extended key seed
    pub encrypted_seed: Vec<u8>,
    pub salt: Vec<u8>,
    /// PBKDF2 rounds the seed was encrypted with
    #[serde(default)]
    pub kdf_rounds: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccountRecord {
    #[serde(default)]
    pub index: i32,
    pub name: String,
    pub account_address: Address,
    /// 0 when the name is not registered on chain
    #[serde(default)]
    pub registered_name_id: u32,
}

/// Decoded memo text kept alongside a key recovered from a memo
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct MemoData {
    pub message: String,
}

/// Output of memo decoding, supplied by the chain layer
#[derive(Debug, Clone)]
pub struct MemoStatus {
    pub owner_private_key: PrivateKey,
    pub has_valid_signature: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeyRecord {
    #[serde(default)]
    pub index: i32,
    pub public_key: PublicKey,
    #[serde(default)]
    pub account_address: Option<Address>,
    /// None for watch-only keys
    #[serde(default)]
    pub encrypted_private_key: Option<Vec<u8>>,
    #[serde(default)]
    pub salt: Vec<u8>,
    #[serde(default)]
    pub kdf_rounds: u32,
    #[serde(default)]
    pub memo: Option<MemoData>,
    #[serde(default)]
    pub valid_from_signature: bool,
}

impl KeyRecord {
    pub fn watch_only(public_key: PublicKey) -> Self {
        KeyRecord {
            index: 0,
            public_key,
            account_address: None,
            encrypted_private_key: None,
            salt: Vec::new(),
            kdf_rounds: 0,
            memo: None,
            valid_from_signature: false,
        }
    }

    pub fn address(&self) -> Address {
        self.public_key.address()
    }

    pub fn has_private_key(&self) -> bool {
        self.encrypted_private_key.as_ref().is_some_and(|blob| !blob.is_empty())
    }
}

/// Balance identifier: hex SHA-256 over owner address and asset id
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BalanceId(pub String);

/// Balance as reported by the chain layer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Balance {
    pub owner: Address,
    pub asset_id: u32,
    pub amount: u64,
}

impl Balance {
    pub fn id(&self) -> BalanceId {
        let mut hasher = Sha256::new();
        hasher.update(self.owner.as_str().as_bytes());
        hasher.update(self.asset_id.to_le_bytes());
        BalanceId(hex::encode(hasher.finalize()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BalanceRecord {
    #[serde(default)]
    pub index: i32,
    pub balance: Balance,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    #[serde(default)]
    pub index: i32,
    pub trx_id: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NameRecord {
    #[serde(default)]
    pub index: i32,
    pub name_id: u32,
    pub name: String,
    pub owner: PublicKey,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetRecord {
    #[serde(default)]
    pub index: i32,
    pub asset_id: u32,
    pub symbol: String,
    pub name: String,
    pub precision: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PropertyId {
    Version = 0,
    NextRecordNumber = 1,
    NextChildKeyIndex = 2,
    DefaultTransactionFee = 3,
    LastUnlockedScannedBlockNumber = 4,
}

/// Property records sit in a band at the top of the index space so that
/// persisting the record counter never consumes a counter value.
pub const PROPERTY_INDEX_BASE: i32 = i32::MAX - 64;

impl PropertyId {
    pub fn record_index(self) -> i32 {
        i32::MAX - self as i32
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    #[serde(default)]
    pub index: i32,
    pub property_id: PropertyId,
    pub value: serde_json::Value,
}

impl PropertyRecord {
    pub fn new(property_id: PropertyId, value: serde_json::Value) -> Self {
        PropertyRecord {
            index: property_id.record_index(),
            property_id,
            value,
        }
    }
}

wallet_record!(MasterKeyRecord, RecordType::MasterKey);
wallet_record!(AccountRecord, RecordType::Account);
wallet_record!(KeyRecord, RecordType::Key);
wallet_record!(BalanceRecord, RecordType::Balance);
wallet_record!(TransactionRecord, RecordType::Transaction);
wallet_record!(NameRecord, RecordType::Name);
wallet_record!(AssetRecord, RecordType::Asset);
wallet_record!(PropertyRecord, RecordType::Property);
