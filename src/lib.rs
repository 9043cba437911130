//! Encrypted wallet key database
//!
//! A password-protected master key, deterministic child key derivation and
//! cached account/balance metadata, all persisted as tagged records in an
//! ordered rocksdb store.

pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod records;
pub mod storage;
pub mod wallet_db;

pub use config::WalletDbConfig;
pub use crypto::{Address, ExtendedKey, PrivateKey, PublicKey};
pub use error::{Result, WalletDbError};
pub use records::{GenericRecord, PropertyId, RecordType, WalletRecord};
pub use wallet_db::WalletDb;
