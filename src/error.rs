use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("\"{0}\" is not a valid dbkey. You must specify a valid dbkey.")]
    InvalidDbkey(String),

    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    #[error("invalid reference source: {0}")]
    InvalidSource(String),

    #[error("failed to read params file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse params JSON: {0}")]
    ConfigParse(String),

    #[error("params file has no output_data entry")]
    MissingOutputData,

    #[error("request for {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("corrupt {format} archive: {message}")]
    Archive {
        format: &'static str,
        message: String,
    },

    #[error("failed to read member {member}: {message}")]
    MemberRead { member: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("tx2gene conversion exited with status {status}")]
    Conversion { status: i32, stderr: String },
}

impl FetchError {
    /// Process exit code for this error: the child's status for a failed
    /// conversion, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            FetchError::Conversion { status, .. } => u8::try_from(*status)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}
