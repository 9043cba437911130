use std::fs;
use std::path::Path;
use tracing::info;

use super::WalletDb;
use crate::error::{Result, WalletDbError};
use crate::records::GenericRecord;

impl WalletDb {
    /// Write every persisted record, in index order, as a pretty JSON array
    pub fn export_to_json(&self, file_name: &Path) -> Result<()> {
        self.ensure_open()?;
        let records = self
            .records
            .records()?
            .into_iter()
            .map(|entry| entry.map(|(_, record)| record))
            .collect::<Result<Vec<GenericRecord>>>()?;

        let json = serde_json::to_string_pretty(&records)?;
        fs::write(file_name, json)?;
        info!("Exported {} wallet records to {}", records.len(), file_name.display());
        Ok(())
    }

    /// Build a new database at `wallet_to_create` from an export file. Every
    /// record keeps its original index, property records included, so the
    /// counters carry on from where the source left off.
    pub fn create_from_json(&mut self, import_file_name: &Path, wallet_to_create: &Path) -> Result<()> {
        if wallet_to_create.exists() {
            return Err(WalletDbError::Precondition(format!(
                "Wallet {} already exists",
                wallet_to_create.display()
            )));
        }
        let input = fs::read_to_string(import_file_name)?;
        let records: Vec<GenericRecord> = serde_json::from_str(&input)?;

        self.open(wallet_to_create, true)?;
        for record in &records {
            self.store_generic_record(record.index, record)?;
            if self.records.get(record.index)?.as_ref() != Some(record) {
                return Err(WalletDbError::Consistency(format!(
                    "Imported record {} did not read back",
                    record.index
                )));
            }
        }
        self.load_all()?;

        info!(
            "Imported {} wallet records from {} into {}",
            records.len(),
            import_file_name.display(),
            wallet_to_create.display()
        );
        Ok(())
    }
}
