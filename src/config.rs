use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{Dbkey, FileType, SequenceIdentity};
use crate::error::FetchError;

#[derive(Debug, Deserialize, Serialize)]
pub struct Params {
    #[serde(default)]
    pub output_data: Vec<OutputData>,
    pub param_dict: ParamDict,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OutputData {
    pub extra_files_path: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ParamDict {
    #[serde(default)]
    pub dbkey: Option<String>,
    #[serde(default)]
    pub sequence_id: Option<String>,
    #[serde(default)]
    pub sequence_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    pub reference_source: ReferenceSource,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "reference_source_selector", rename_all = "lowercase")]
pub enum ReferenceSource {
    Url {
        user_url: String,
    },
    History {
        input_fasta: PathList,
    },
    Directory {
        fasta_filename: PathList,
        #[serde(default)]
        create_symlink: Option<SymlinkFlag>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PathList {
    Single(String),
    Many(Vec<String>),
}

impl PathList {
    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            PathList::Single(path) => vec![PathBuf::from(path)],
            PathList::Many(paths) => paths.into_iter().map(PathBuf::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SymlinkFlag {
    Flag(bool),
    Choice(String),
}

impl SymlinkFlag {
    pub fn enabled(&self) -> bool {
        match self {
            SymlinkFlag::Flag(value) => *value,
            SymlinkFlag::Choice(value) => value == "create_symlink",
        }
    }
}

/// Where the input bytes come from, after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Url(Vec<String>),
    History(Vec<PathBuf>),
    Directory {
        paths: Vec<PathBuf>,
        create_symlink: bool,
    },
}

impl SourceSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceSpec::Url(_) => "url",
            SourceSpec::History(_) => "history",
            SourceSpec::Directory { .. } => "directory",
        }
    }
}

/// Command-line values that feed into resolution.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dbkey_description: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedParams {
    pub target_directory: Utf8PathBuf,
    pub identity: SequenceIdentity,
    pub file_type: FileType,
    pub source: SourceSpec,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: &Path, overrides: &CliOverrides) -> Result<ResolvedParams, FetchError> {
        let content =
            fs::read_to_string(path).map_err(|_| FetchError::ConfigRead(path.to_path_buf()))?;
        let params: Params = serde_json::from_str(&content)
            .map_err(|err| FetchError::ConfigParse(err.to_string()))?;

        Self::resolve_params(params, overrides)
    }

    pub fn resolve_params(
        params: Params,
        overrides: &CliOverrides,
    ) -> Result<ResolvedParams, FetchError> {
        let Params {
            output_data,
            param_dict,
        } = params;

        let dbkey = Dbkey::from_optional(param_dict.dbkey.as_deref())?;
        let identity = SequenceIdentity::resolve(
            dbkey,
            overrides.dbkey_description.as_deref(),
            param_dict.sequence_id.as_deref(),
            param_dict.sequence_name.as_deref(),
        );

        let file_type = overrides
            .file_type
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .or(param_dict.file_type.as_deref())
            .unwrap_or_default()
            .parse::<FileType>()?;

        let target_directory = output_data
            .into_iter()
            .next()
            .map(|output| Utf8PathBuf::from(output.extra_files_path))
            .ok_or(FetchError::MissingOutputData)?;

        let source = match param_dict.reference_source {
            ReferenceSource::Url { user_url } => SourceSpec::Url(split_urls(&user_url)),
            ReferenceSource::History { input_fasta } => {
                SourceSpec::History(input_fasta.into_paths())
            }
            ReferenceSource::Directory {
                fasta_filename,
                create_symlink,
            } => {
                let paths = fasta_filename.into_paths();
                let create_symlink = create_symlink
                    .map(|flag| flag.enabled())
                    .unwrap_or(false);
                if create_symlink && paths.len() != 1 {
                    return Err(FetchError::InvalidSource(format!(
                        "symlink mode needs exactly one path, got {}",
                        paths.len()
                    )));
                }
                SourceSpec::Directory {
                    paths,
                    create_symlink,
                }
            }
        };

        Ok(ResolvedParams {
            target_directory,
            identity,
            file_type,
            source,
        })
    }
}

/// Splits a newline separated URL list, dropping blank lines.
pub fn split_urls(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}
