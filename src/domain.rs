use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Genome build identifier an entry is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dbkey(String);

impl Dbkey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates an optional raw value; `None`, empty and `?` are rejected.
    pub fn from_optional(value: Option<&str>) -> Result<Self, FetchError> {
        match value {
            Some(value) => value.parse(),
            None => Err(FetchError::InvalidDbkey("None".to_string())),
        }
    }
}

impl fmt::Display for Dbkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Dbkey {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == "?" {
            return Err(FetchError::InvalidDbkey(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    /// Content is already a transcript-to-gene table.
    Tx2Gene,
    /// Annotation content (gff, gtf, ...) that must be converted.
    Annotation(String),
}

impl FileType {
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, FileType::Tx2Gene)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FileType::Tx2Gene => "tx2gene",
            FileType::Annotation(tag) => tag,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileType {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" => Err(FetchError::InvalidFileType(value.to_string())),
            "tx2gene" => Ok(FileType::Tx2Gene),
            tag => Ok(FileType::Annotation(tag.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceIdentity {
    pub dbkey: Dbkey,
    pub dbkey_name: Option<String>,
    pub sequence_id: String,
    pub sequence_name: String,
}

impl SequenceIdentity {
    /// Applies the fallbacks: an empty sequence id becomes the dbkey, an empty
    /// sequence name becomes the description and then the dbkey.
    pub fn resolve(
        dbkey: Dbkey,
        dbkey_description: Option<&str>,
        sequence_id: Option<&str>,
        sequence_name: Option<&str>,
    ) -> Self {
        let dbkey_name = non_empty(dbkey_description).map(str::to_string);
        let sequence_id = non_empty(sequence_id)
            .map(str::to_string)
            .unwrap_or_else(|| dbkey.as_str().to_string());
        let sequence_name = non_empty(sequence_name)
            .map(str::to_string)
            .or_else(|| dbkey_name.clone())
            .unwrap_or_else(|| dbkey.as_str().to_string());
        Self {
            dbkey,
            dbkey_name,
            sequence_id,
            sequence_name,
        }
    }

    pub fn output_file_name(&self) -> String {
        format!("{}_tx2gene.tab", self.sequence_id)
    }

    pub fn symlink_file_name(&self) -> String {
        format!("{}.fa", self.sequence_id)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
