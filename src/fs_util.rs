use std::fs;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::FetchError;

/// Writes every file entry of `archive` below `target_dir` and returns the
/// written paths in central directory order. Directory entries are created
/// but not returned.
pub fn extract_zip<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    target_dir: &Path,
) -> Result<Vec<PathBuf>, FetchError> {
    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|err| FetchError::Archive {
            format: "zip",
            message: err.to_string(),
        })?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(FetchError::Archive {
                    format: "zip",
                    message: "zip entry path traversal detected".to_string(),
                });
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| FetchError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| FetchError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path)
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| FetchError::Archive {
            format: "zip",
            message: err.to_string(),
        })?;
        written.push(entry_path);
    }
    Ok(written)
}

/// Creates `link` pointing at `source`.
#[cfg(unix)]
pub fn symlink_file(source: &Path, link: &Path) -> Result<(), FetchError> {
    std::os::unix::fs::symlink(source, link).map_err(|err| {
        FetchError::Filesystem(format!(
            "symlink {} -> {}: {err}",
            link.display(),
            source.display()
        ))
    })
}

#[cfg(windows)]
pub fn symlink_file(source: &Path, link: &Path) -> Result<(), FetchError> {
    std::os::windows::fs::symlink_file(source, link).map_err(|err| {
        FetchError::Filesystem(format!(
            "symlink {} -> {}: {err}",
            link.display(),
            source.display()
        ))
    })
}
