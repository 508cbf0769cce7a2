use std::fs::File;
use std::io;

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use tar::Archive;
use tracing::debug;
use zip::ZipArchive;

use crate::error::FetchError;
use crate::fs_util;
use crate::stream::{Member, MemberSet, ReadSeek};
use crate::workspace::Workspace;

/// A gzip stream always decompresses into exactly one member.
pub fn gzip_members(name: &str, reader: Box<dyn ReadSeek>) -> MemberSet {
    MemberSet::single(Member::new(name, MultiGzDecoder::new(reader)).decoded_from("gzip"))
}

pub fn bzip2_members(name: &str, reader: Box<dyn ReadSeek>) -> MemberSet {
    MemberSet::single(Member::new(name, MultiBzDecoder::new(reader)).decoded_from("bzip2"))
}

/// Extracts every zip entry into the workspace. Members follow central
/// directory order and are opened only when read.
pub fn zip_members(
    reader: Box<dyn ReadSeek>,
    workspace: &mut Workspace,
) -> Result<MemberSet, FetchError> {
    let mut archive = ZipArchive::new(reader).map_err(|err| FetchError::Archive {
        format: "zip",
        message: err.to_string(),
    })?;
    let target = workspace.member_dir("zip")?;
    let paths = fs_util::extract_zip(&mut archive, &target)?;
    debug!(members = paths.len(), "extracted zip archive");

    let mut members = MemberSet::new();
    for path in paths {
        let name = path.strip_prefix(&target).unwrap_or(&path).display().to_string();
        members.push(Member::from_path(name, path));
    }
    Ok(members)
}

/// Spools the regular files of a tar archive into the workspace, in header
/// order. Directories, links and other special entries are skipped.
pub fn tar_members(
    reader: Box<dyn ReadSeek>,
    workspace: &mut Workspace,
) -> Result<MemberSet, FetchError> {
    let target = workspace.member_dir("tar")?;
    let mut archive = Archive::new(reader);
    let entries = archive.entries().map_err(tar_error)?;

    let mut members = MemberSet::new();
    for (index, entry) in entries.enumerate() {
        let mut entry = entry.map_err(tar_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| format!("entry {index}"));
        let path = target.join(format!("{index:06}"));
        let mut out = File::create(&path)
            .map_err(|err| FetchError::Filesystem(format!("create {}: {err}", path.display())))?;
        io::copy(&mut entry, &mut out).map_err(tar_error)?;
        members.push(Member::from_path(name, path));
    }
    debug!(members = members.len(), "extracted tar archive");
    Ok(members)
}

fn tar_error(err: io::Error) -> FetchError {
    FetchError::Archive {
        format: "tar",
        message: err.to_string(),
    }
}
