use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::SequenceIdentity;
use crate::error::FetchError;

pub const DATA_TABLE_NAME: &str = "tx2gene_table";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub value: String,
    pub dbkey: String,
    pub name: String,
    pub path: String,
}

impl CatalogEntry {
    pub fn for_identity(identity: &SequenceIdentity, path: impl Into<String>) -> Self {
        Self {
            value: identity.sequence_id.clone(),
            dbkey: identity.dbkey.as_str().to_string(),
            name: identity.sequence_name.clone(),
            path: path.into(),
        }
    }
}

/// The document handed back to the caller: named data tables, each a list
/// of entries in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataManagerRecord {
    #[serde(default)]
    pub data_tables: BTreeMap<String, Vec<CatalogEntry>>,
}

impl DataManagerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, table: &str, entry: CatalogEntry) {
        self.data_tables
            .entry(table.to_string())
            .or_default()
            .push(entry);
    }

    pub fn entries(&self, table: &str) -> &[CatalogEntry] {
        self.data_tables
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replaces `path` with this record in one rename, so readers see either
    /// the old file or the complete new one.
    pub fn write_atomic(&self, path: &Path) -> Result<(), FetchError> {
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(self)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        fs::write(&tmp_path, &content).map_err(|err| FetchError::Filesystem(err.to_string()))?;
        fs::rename(&tmp_path, path).map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
