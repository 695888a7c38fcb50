use crate::ast::{Datum, Document};
use crate::storage::{META_TABLE, Result, StorageBackend};
use std::sync::Arc;

/// Administrative operations on tables and index markers. Index markers are
/// advisory records in the meta table; query execution does not consult
/// them.
pub struct Schema {
    storage: Arc<dyn StorageBackend>,
}

impl Schema {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    pub async fn list_tables(&self) -> Result<Vec<String>> {
        self.storage.list_tables().await
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        self.storage.table_exists(table).await
    }

    pub async fn create_table(&self, table: &str) -> Result<()> {
        self.storage.create_table(table).await
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        self.storage.drop_table(table).await
    }

    pub async fn create_index(&self, table: &str, column: &str) -> Result<()> {
        let key = format!("index:{table}:{column}");
        let marker = Document::from([
            ("id".to_string(), Datum::String(key.clone())),
            ("table".to_string(), Datum::String(table.to_string())),
            ("column".to_string(), Datum::String(column.to_string())),
        ]);
        self.storage.put(META_TABLE, &key, &marker).await
    }

    pub async fn index_exists(&self, table: &str, column: &str) -> Result<bool> {
        let key = format!("index:{table}:{column}");
        Ok(self.storage.get(META_TABLE, &key).await?.is_some())
    }

    pub async fn drop_index(&self, table: &str, column: &str) -> Result<()> {
        let key = format!("index:{table}:{column}");
        self.storage.delete(META_TABLE, &key).await
    }
}
