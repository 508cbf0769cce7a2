use std::fmt;
use std::io::{Cursor, Read, Seek};

use tar::Archive;
use tracing::debug;

use crate::archive;
use crate::error::FetchError;
use crate::stream::{self, InputStream, Member, MemberSet, ReadSeek};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Gzip,
    Bzip2,
    Zip,
    Tar,
    Plain,
}

impl ContainerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerFormat::Gzip => "gzip",
            ContainerFormat::Bzip2 => "bzip2",
            ContainerFormat::Zip => "zip",
            ContainerFormat::Tar => "tar",
            ContainerFormat::Plain => "plain",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Magic signatures, tried in order before the tar probe.
const SIGNATURES: &[(&[u8], ContainerFormat)] = &[
    (b"\x1f\x8b\x08", ContainerFormat::Gzip),
    (b"\x42\x5a\x68", ContainerFormat::Bzip2),
    (b"\x50\x4b\x03\x04", ContainerFormat::Zip),
    // end-of-central-directory record of a zip without entries
    (b"\x50\x4b\x05\x06", ContainerFormat::Zip),
];

/// Classifies the leading bytes of a stream.
pub fn detect(head: &[u8]) -> ContainerFormat {
    SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, format)| *format)
        .unwrap_or_else(|| {
            if looks_like_tar(head) {
                ContainerFormat::Tar
            } else {
                ContainerFormat::Plain
            }
        })
}

/// True when the first tar header in `head` parses with a valid checksum.
fn looks_like_tar(head: &[u8]) -> bool {
    let mut archive = Archive::new(Cursor::new(head));
    let Ok(mut entries) = archive.entries() else {
        return false;
    };
    matches!(entries.next(), Some(Ok(_)))
}

/// Makes `input` rewindable, peeks at its first chunk and expands it into
/// the members it contains. Unrecognized content becomes a single member.
pub fn open_members(
    name: &str,
    input: InputStream,
    workspace: &mut Workspace,
) -> Result<MemberSet, FetchError> {
    let mut reader = stream::rewindable(input, workspace)?;
    let head = stream::read_chunk(&mut reader)
        .map_err(|err| FetchError::Filesystem(format!("read {name}: {err}")))?;
    reader
        .rewind()
        .map_err(|err| FetchError::Filesystem(format!("rewind {name}: {err}")))?;

    let format = detect(&head);
    debug!(input = name, %format, "detected container format");
    extract(format, name, reader, workspace)
}

fn extract(
    format: ContainerFormat,
    name: &str,
    reader: Box<dyn ReadSeek>,
    workspace: &mut Workspace,
) -> Result<MemberSet, FetchError> {
    match format {
        ContainerFormat::Gzip => Ok(archive::gzip_members(name, reader)),
        ContainerFormat::Bzip2 => Ok(archive::bzip2_members(name, reader)),
        ContainerFormat::Zip => archive::zip_members(reader, workspace),
        ContainerFormat::Tar => archive::tar_members(reader, workspace),
        ContainerFormat::Plain => Ok(MemberSet::single(Member::from_boxed(
            name,
            Box::new(reader) as Box<dyn Read + Send>,
        ))),
    }
}
