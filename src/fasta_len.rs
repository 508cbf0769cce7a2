use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::FetchError;

/// Writes one `<title>\t<length>` line per FASTA record of `input`.
pub fn compute_fasta_lengths(
    input: &Path,
    output: &Path,
    keep_first_word: bool,
) -> Result<(), FetchError> {
    let reader = File::open(input)
        .map_err(|err| FetchError::Filesystem(format!("open {}: {err}", input.display())))?;
    let writer = File::create(output)
        .map_err(|err| FetchError::Filesystem(format!("create {}: {err}", output.display())))?;
    let mut writer = BufWriter::new(writer);
    write_lengths(BufReader::new(reader), &mut writer, keep_first_word)
        .and_then(|()| writer.flush())
        .map_err(|err| FetchError::Filesystem(err.to_string()))
}

pub fn write_lengths<R: Read, W: Write>(
    reader: BufReader<R>,
    writer: &mut W,
    keep_first_word: bool,
) -> std::io::Result<()> {
    let mut current: Option<(String, usize)> = None;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(title) = line.strip_prefix('>') {
            if let Some(record) = current.take() {
                write_record(writer, record, keep_first_word)?;
            }
            current = Some((title.to_string(), 0));
        } else if let Some((_, len)) = current.as_mut() {
            *len += line.len();
        }
    }
    if let Some(record) = current {
        write_record(writer, record, keep_first_word)?;
    }
    Ok(())
}

fn write_record<W: Write>(
    writer: &mut W,
    (title, len): (String, usize),
    keep_first_word: bool,
) -> std::io::Result<()> {
    let title = if keep_first_word {
        title.split_whitespace().next().unwrap_or_default()
    } else {
        title.as_str()
    };
    writeln!(writer, "{title}\t{len}")
}
