use serde_json::Value;

use super::WalletDb;
use crate::error::{Result, WalletDbError};
use crate::records::{PropertyId, PropertyRecord, PROPERTY_INDEX_BASE};

impl WalletDb {
    /// `Value::Null` when the property was never set
    pub fn get_property(&self, property_id: PropertyId) -> Value {
        self.properties
            .get(&property_id)
            .map(|p| p.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn set_property(&mut self, property_id: PropertyId, value: Value) -> Result<()> {
        let mut record = match self.properties.get(&property_id) {
            Some(existing) => existing.clone(),
            None => PropertyRecord::new(property_id, Value::Null),
        };
        record.value = value;
        // Persist before updating memory so a failed write leaves both unchanged
        self.store_record(&record)?;
        self.properties.insert(property_id, record);
        Ok(())
    }

    /// Read-increment-persist on a counter property. Not safe against
    /// concurrent callers; a multi-writer setup would need a lock around it.
    fn next_counter(&mut self, property_id: PropertyId) -> Result<i32> {
        let current = match self.get_property(property_id) {
            Value::Null => 1,
            value => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| {
                    WalletDbError::Consistency(format!("Counter {:?} holds {}", property_id, value))
                })?,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| WalletDbError::Precondition(format!("Counter {:?} exhausted", property_id)))?;
        self.set_property(property_id, Value::from(next))?;
        Ok(current)
    }

    /// Next unused record index, starting at 1
    pub fn new_index(&mut self) -> Result<i32> {
        self.ensure_open()?;
        if let Some(current) = self.get_property(PropertyId::NextRecordNumber).as_i64() {
            if current >= PROPERTY_INDEX_BASE as i64 {
                return Err(WalletDbError::Precondition("Record index space exhausted".to_string()));
            }
        }
        self.next_counter(PropertyId::NextRecordNumber)
    }

    /// Next child key index, starting at 1
    pub fn new_key_child_index(&mut self) -> Result<i32> {
        self.ensure_open()?;
        self.next_counter(PropertyId::NextChildKeyIndex)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_properties_default_to_null() {
        let (_dir, mut db) = open_temp();
        assert!(db.get_property(PropertyId::Version).is_null());

        db.set_property(PropertyId::Version, json!({ "major": 1 })).unwrap();
        assert_eq!(db.get_property(PropertyId::Version), json!({ "major": 1 }));
        db.set_property(PropertyId::Version, json!(2)).unwrap();
        assert_eq!(db.get_property(PropertyId::Version), json!(2));
    }

    #[test]
    fn test_counters_increase_independently() {
        let (_dir, mut db) = open_temp();
        let records: Vec<i32> = (0..3).map(|_| db.new_index().unwrap()).collect();
        let children: Vec<i32> = (0..2).map(|_| db.new_key_child_index().unwrap()).collect();
        assert_eq!(records, vec![1, 2, 3]);
        assert_eq!(children, vec![1, 2]);
        assert_eq!(db.get_property(PropertyId::NextRecordNumber), json!(4));
        assert_eq!(db.get_property(PropertyId::NextChildKeyIndex), json!(3));
    }

    #[test]
    fn test_counters_resume_after_reopen() {
        let (dir, mut db) = open_temp();
        db.new_index().unwrap();
        db.new_index().unwrap();
        db.new_key_child_index().unwrap();

        reopen(&mut db, &dir);
        assert_eq!(db.new_index().unwrap(), 3);
        assert_eq!(db.new_key_child_index().unwrap(), 2);
    }

    #[test]
    fn test_counter_never_enters_property_band() {
        let (_dir, mut db) = open_temp();
        db.set_property(PropertyId::NextRecordNumber, json!(PROPERTY_INDEX_BASE)).unwrap();
        assert!(matches!(db.new_index(), Err(WalletDbError::Precondition(_))));
    }

    #[test]
    fn test_corrupt_counter_is_reported() {
        let (_dir, mut db) = open_temp();
        db.set_property(PropertyId::NextChildKeyIndex, json!("seven")).unwrap();
        assert!(matches!(db.new_key_child_index(), Err(WalletDbError::Consistency(_))));
    }

    #[test]
    fn test_closed_database_rejects_allocation() {
        let (_dir, mut db) = open_temp();
        db.close();
        assert!(db.new_index().is_err());
        assert!(db.set_property(PropertyId::Version, json!(1)).is_err());
    }
}
