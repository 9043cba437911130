use rocksdb::{IteratorMode, Options, DB};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, WalletDbError};
use crate::records::GenericRecord;

/// Ordered map of record index -> [`GenericRecord`] on top of rocksdb.
///
/// The handle is dropped on `close()`, which releases the rocksdb lock file.
#[derive(Default)]
pub struct RecordStore {
    db: Option<DB>,
}

/// Big-endian with the sign bit flipped so byte order matches numeric order
fn encode_index(index: i32) -> [u8; 4] {
    ((index as u32) ^ 0x8000_0000).to_be_bytes()
}

fn decode_index(key: &[u8]) -> Result<i32> {
    let bytes: [u8; 4] = key
        .try_into()
        .map_err(|_| WalletDbError::Database(format!("Invalid record key length {}", key.len())))?;
    Ok((u32::from_be_bytes(bytes) ^ 0x8000_0000) as i32)
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, path: &Path, create_if_missing: bool) -> Result<()> {
        if self.db.is_some() {
            return Err(WalletDbError::Precondition("Record store already open".to_string()));
        }
        let mut opts = Options::default();
        opts.create_if_missing(create_if_missing);

        let db = DB::open(&opts, path)?;
        debug!("Record store opened at {}", path.display());
        self.db = Some(db);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    pub fn close(&mut self) {
        if self.db.take().is_some() {
            debug!("Record store closed");
        }
    }

    fn db(&self) -> Result<&DB> {
        self.db
            .as_ref()
            .ok_or_else(|| WalletDbError::Precondition("Record store is not open".to_string()))
    }

    pub fn store(&self, index: i32, record: &GenericRecord) -> Result<()> {
        let serialized = serde_json::to_vec(record)?;
        self.db()?.put(encode_index(index), serialized)?;
        Ok(())
    }

    pub fn get(&self, index: i32) -> Result<Option<GenericRecord>> {
        match self.db()?.get(encode_index(index))? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Ascending index order. Each entry is decoded independently so one bad
    /// key or value does not hide the rest; only iterator failures abort.
    pub fn records(&self) -> Result<Vec<Result<(i32, GenericRecord)>>> {
        let db = self.db()?;
        let mut out = Vec::new();
        for item in db.iterator(IteratorMode::Start) {
            let (key, value) = item?;
            out.push(decode_index(&key).and_then(|index| {
                serde_json::from_slice::<GenericRecord>(&value)
                    .map(|record| (index, record))
                    .map_err(|e| WalletDbError::LoadRecord {
                        index,
                        reason: e.to_string(),
                    })
            }));
        }
        Ok(out)
    }

    /// Write raw bytes under an arbitrary key, bypassing the index encoding
    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db()?.put(key, value)?;
        Ok(())
    }
}
