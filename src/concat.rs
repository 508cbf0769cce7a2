use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::FetchError;
use crate::stream::{CHUNK_SIZE, Member, MemberSet};

/// Writes all members, in order, into a freshly truncated `destination`.
///
/// A `\n` is inserted ahead of a member when the bytes written so far do not
/// already end in a line terminator, so the last record of one member can
/// never run into the first record of the next. Returns the byte count.
pub fn concatenate(members: MemberSet, destination: &Path) -> Result<u64, FetchError> {
    let file = File::create(destination).map_err(|err| {
        FetchError::Filesystem(format!("create {}: {err}", destination.display()))
    })?;
    let mut writer = BufWriter::new(file);
    let written = concatenate_into(members, &mut writer)?;
    writer
        .flush()
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    debug!(bytes = written, path = %destination.display(), "wrote concatenated output");
    Ok(written)
}

pub fn concatenate_into<W: Write>(members: MemberSet, writer: &mut W) -> Result<u64, FetchError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut last_byte: Option<u8> = None;
    let mut written = 0u64;

    for (index, mut member) in members.into_iter().enumerate() {
        if index > 0 && last_byte.is_some_and(|byte| byte != b'\n' && byte != b'\r') {
            write(writer, b"\n")?;
            written += 1;
            last_byte = Some(b'\n');
        }
        loop {
            let n = match member.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(read_error(&member, err)),
            };
            write(writer, &buf[..n])?;
            written += n as u64;
            last_byte = Some(buf[n - 1]);
        }
    }
    Ok(written)
}

fn read_error(member: &Member, err: io::Error) -> FetchError {
    match member.container() {
        Some(format) => FetchError::Archive {
            format,
            message: format!("{}: {err}", member.name()),
        },
        None => FetchError::MemberRead {
            member: member.name().to_string(),
            message: err.to_string(),
        },
    }
}

fn write<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), FetchError> {
    writer
        .write_all(bytes)
        .map_err(|err| FetchError::Filesystem(err.to_string()))
}
