use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::Builder;
use tracing::{debug, info};

use crate::domain::FileType;
use crate::error::FetchError;

pub const TX2GENE_SCRIPT: &str = "get_tx2gene_table.R";

/// Turns an annotation file into a tx2gene table written at `output`.
pub trait Tx2GeneConverter {
    fn convert(&self, input: &Path, output: &Path, file_type: &FileType)
    -> Result<(), FetchError>;
}

/// Runs `Rscript <base_dir>/get_tx2gene_table.R -x <input> -o <output> -t <type>`.
#[derive(Debug, Clone)]
pub struct RscriptConverter {
    rscript: Option<PathBuf>,
    script: Option<PathBuf>,
}

impl RscriptConverter {
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            rscript: find_in_path("Rscript"),
            script: base_dir.map(|dir| dir.join(TX2GENE_SCRIPT)),
        }
    }

    pub fn with_programs(rscript: PathBuf, script: PathBuf) -> Self {
        Self {
            rscript: Some(rscript),
            script: Some(script),
        }
    }

    fn args(script: &Path, input: &Path, output: &Path, file_type: &FileType) -> Vec<String> {
        vec![
            script.to_string_lossy().to_string(),
            "-x".to_string(),
            input.to_string_lossy().to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
            "-t".to_string(),
            file_type.to_string(),
        ]
    }
}

impl Tx2GeneConverter for RscriptConverter {
    fn convert(
        &self,
        input: &Path,
        output: &Path,
        file_type: &FileType,
    ) -> Result<(), FetchError> {
        let rscript = self
            .rscript
            .as_ref()
            .ok_or_else(|| FetchError::MissingTool("Rscript".to_string()))?;
        let script = self
            .script
            .as_ref()
            .ok_or_else(|| FetchError::MissingTool(TX2GENE_SCRIPT.to_string()))?;

        let args = Self::args(script, input, output, file_type);
        debug!(program = %rscript.display(), ?args, "running tx2gene conversion");
        let result = Command::new(rscript)
            .args(&args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| FetchError::MissingTool(format!("{}: {err}", rscript.display())))?;
        if result.status.success() {
            return Ok(());
        }
        Err(FetchError::Conversion {
            status: result.status.code().unwrap_or(1),
            stderr: String::from_utf8_lossy(&result.stderr).to_string(),
        })
    }
}

/// Replaces the content of `destination` with its tx2gene conversion unless
/// it already is a tx2gene table. The unconverted file is moved aside next to
/// `destination` and discarded once the converter returns.
pub fn convert_in_place(
    converter: &dyn Tx2GeneConverter,
    destination: &Path,
    file_type: &FileType,
) -> Result<(), FetchError> {
    if !file_type.needs_conversion() {
        return Ok(());
    }
    let parent = destination
        .parent()
        .ok_or_else(|| FetchError::Filesystem("invalid destination path".to_string()))?;
    let moved = Builder::new()
        .prefix(".annotation")
        .tempfile_in(parent)
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    fs::rename(destination, moved.path()).map_err(|err| {
        FetchError::Filesystem(format!("move {} aside: {err}", destination.display()))
    })?;

    info!(%file_type, "converting annotation to tx2gene table");
    converter.convert(moved.path(), destination, file_type)?;
    moved
        .close()
        .map_err(|err| FetchError::Filesystem(err.to_string()))
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
