use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use tx2gene_fetch::app::App;
use tx2gene_fetch::catalog::{CatalogEntry, DATA_TABLE_NAME};
use tx2gene_fetch::config::{ResolvedParams, SourceSpec};
use tx2gene_fetch::convert::Tx2GeneConverter;
use tx2gene_fetch::domain::{FileType, SequenceIdentity};
use tx2gene_fetch::error::FetchError;
use tx2gene_fetch::remote::UrlFetcher;
use tx2gene_fetch::stream::InputStream;

#[derive(Default)]
struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl MockFetcher {
    fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }
}

impl UrlFetcher for MockFetcher {
    fn open(&self, url: &str) -> Result<InputStream, FetchError> {
        let body = self
            .bodies
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })?;
        Ok(InputStream::forward(Cursor::new(body)))
    }
}

#[derive(Default)]
struct MockConverter {
    fail_with: Option<i32>,
}

impl Tx2GeneConverter for MockConverter {
    fn convert(&self, input: &Path, output: &Path, file_type: &FileType) -> Result<(), FetchError> {
        assert!(input.exists());
        assert!(file_type.needs_conversion());
        if let Some(status) = self.fail_with {
            return Err(FetchError::Conversion {
                status,
                stderr: "bad annotation\n".to_string(),
            });
        }
        fs::write(output, "ENST1\tENSG1\n").unwrap();
        Ok(())
    }
}

fn params(target: &Path, file_type: FileType, source: SourceSpec) -> ResolvedParams {
    ResolvedParams {
        target_directory: Utf8PathBuf::from_path_buf(target.to_path_buf()).unwrap(),
        identity: SequenceIdentity::resolve("hg38".parse().unwrap(), Some("Human"), None, None),
        file_type,
        source,
    }
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

fn zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, body) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn urls(list: &[&str]) -> SourceSpec {
    SourceSpec::Url(list.iter().map(|url| url.to_string()).collect())
}

#[test]
fn gzip_url_is_decompressed_and_registered() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let fetcher = MockFetcher::default().with("https://x/t.tab.gz", gzip(b"ENST1\tENSG1\n"));
    let app = App::new(fetcher, MockConverter::default());

    let record = app
        .run(&params(&target, FileType::Tx2Gene, urls(&["https://x/t.tab.gz"])))
        .unwrap();

    assert_eq!(
        fs::read(target.join("hg38_tx2gene.tab")).unwrap(),
        b"ENST1\tENSG1\n"
    );
    assert_eq!(
        record.entries(DATA_TABLE_NAME),
        &[CatalogEntry {
            value: "hg38".to_string(),
            dbkey: "hg38".to_string(),
            name: "Human".to_string(),
            path: "hg38_tx2gene.tab".to_string(),
        }]
    );
}

#[test]
fn multiple_urls_never_fuse_records() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let fetcher = MockFetcher::default()
        .with("https://x/a.fa", b">a\nACGT".to_vec())
        .with("https://x/b.fa.gz", gzip(b">b\nGGCC\n"));
    let app = App::new(fetcher, MockConverter::default());

    app.run(&params(
        &target,
        FileType::Tx2Gene,
        urls(&["https://x/a.fa", "https://x/b.fa.gz"]),
    ))
    .unwrap();

    assert_eq!(
        fs::read(target.join("hg38_tx2gene.tab")).unwrap(),
        b">a\nACGT\n>b\nGGCC\n"
    );
}

#[test]
fn zip_members_are_concatenated_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let body = zip(&[("chr2.fa", &b">chr2\nTT"[..]), ("chr1.fa", &b">chr1\nAA\n"[..])]);
    let fetcher = MockFetcher::default().with("https://x/ref.zip", body);
    let app = App::new(fetcher, MockConverter::default());

    app.run(&params(&target, FileType::Tx2Gene, urls(&["https://x/ref.zip"])))
        .unwrap();

    assert_eq!(
        fs::read(target.join("hg38_tx2gene.tab")).unwrap(),
        b">chr2\nTT\n>chr1\nAA\n"
    );
}

#[test]
fn empty_zip_produces_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let fetcher = MockFetcher::default().with("https://x/empty.zip", zip(&[]));
    let app = App::new(fetcher, MockConverter::default());

    let record = app
        .run(&params(&target, FileType::Tx2Gene, urls(&["https://x/empty.zip"])))
        .unwrap();

    assert_eq!(fs::metadata(target.join("hg38_tx2gene.tab")).unwrap().len(), 0);
    assert_eq!(record.entries(DATA_TABLE_NAME).len(), 1);
}

#[test]
fn annotation_is_converted() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let gtf = b"chr1\tsrc\ttranscript\t1\t10\t.\t+\t.\tgene_id \"G\";\n".to_vec();
    let fetcher = MockFetcher::default().with("https://x/a.gtf.gz", gzip(&gtf));
    let converter = MockConverter::default();
    let app = App::new(fetcher, converter);

    app.run(&params(
        &target,
        "gtf".parse().unwrap(),
        urls(&["https://x/a.gtf.gz"]),
    ))
    .unwrap();

    assert_eq!(
        fs::read_to_string(target.join("hg38_tx2gene.tab")).unwrap(),
        "ENST1\tENSG1\n"
    );
    assert_eq!(fs::read_dir(&target).unwrap().count(), 1);
}

#[test]
fn conversion_failure_aborts_with_status() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let scratch = dir.path().join("scratch");
    fs::create_dir(&scratch).unwrap();
    let fetcher = MockFetcher::default().with("https://x/a.gff", b"##gff-version 3\n".to_vec());
    let converter = MockConverter { fail_with: Some(4) };
    let app = App::new(fetcher, converter).with_workspace_root(&scratch);

    let err = app
        .run(&params(&target, "gff".parse().unwrap(), urls(&["https://x/a.gff"])))
        .unwrap_err();

    assert_matches!(err, FetchError::Conversion { status: 4, .. });
    assert_eq!(err.exit_code(), 4);
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
}

#[test]
fn corrupt_gzip_is_an_archive_error() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let scratch = dir.path().join("scratch");
    fs::create_dir(&scratch).unwrap();
    let fetcher =
        MockFetcher::default().with("https://x/bad.gz", b"\x1f\x8b\x08not really gzip".to_vec());
    let app = App::new(fetcher, MockConverter::default()).with_workspace_root(&scratch);

    let err = app
        .run(&params(&target, FileType::Tx2Gene, urls(&["https://x/bad.gz"])))
        .unwrap_err();

    assert_matches!(err, FetchError::Archive { format: "gzip", .. });
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
}

#[test]
fn history_files_support_bzip2_and_tar() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");

    let bz_path = dir.path().join("a.fa.bz2");
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(b">a\nAAAA").unwrap();
    fs::write(&bz_path, encoder.finish().unwrap()).unwrap();

    let tar_path = dir.path().join("b.tar");
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(7);
    header.set_mode(0o644);
    builder
        .append_data(&mut header, "b.fa", &b">b\nCCC\n"[..])
        .unwrap();
    fs::write(&tar_path, builder.into_inner().unwrap()).unwrap();

    let app = App::new(MockFetcher::default(), MockConverter::default());
    app.run(&params(
        &target,
        FileType::Tx2Gene,
        SourceSpec::History(vec![bz_path, tar_path]),
    ))
    .unwrap();

    assert_eq!(
        fs::read(target.join("hg38_tx2gene.tab")).unwrap(),
        b">a\nAAAA\n>b\nCCC\n"
    );
}

#[cfg(unix)]
#[test]
fn directory_symlink_mode_links_instead_of_copying() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let source = dir.path().join("genome.fa");
    fs::write(&source, b">chr1\nACGT\n").unwrap();

    let app = App::new(MockFetcher::default(), MockConverter::default());
    let record = app
        .run(&params(
            &target,
            "gtf".parse().unwrap(),
            SourceSpec::Directory {
                paths: vec![source.clone()],
                create_symlink: true,
            },
        ))
        .unwrap();

    let link = target.join("hg38.fa");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&link).unwrap(), source);
    assert_eq!(record.entries(DATA_TABLE_NAME)[0].path, "hg38.fa");
}

#[test]
fn directory_copy_mode_streams_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let source = dir.path().join("t.tab");
    fs::write(&source, b"ENST9\tENSG9\n").unwrap();

    let app = App::new(MockFetcher::default(), MockConverter::default());
    app.run(&params(
        &target,
        FileType::Tx2Gene,
        SourceSpec::Directory {
            paths: vec![source],
            create_symlink: false,
        },
    ))
    .unwrap();

    assert_eq!(
        fs::read(target.join("hg38_tx2gene.tab")).unwrap(),
        b"ENST9\tENSG9\n"
    );
}

#[test]
fn missing_url_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let app = App::new(MockFetcher::default(), MockConverter::default());

    let err = app
        .run(&params(&target, FileType::Tx2Gene, urls(&["https://x/gone.fa"])))
        .unwrap_err();
    assert_matches!(err, FetchError::HttpStatus { status: 404, .. });
}

#[test]
fn tar_with_thousands_of_members_is_concatenated() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");

    let mut builder = tar::Builder::new(Vec::new());
    for i in 0..2000 {
        let body = format!(">seq{i}\nACGT\n");
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, format!("parts/seq{i}.fa"), body.as_bytes())
            .unwrap();
    }
    let tar_path = dir.path().join("parts.tar");
    fs::write(&tar_path, builder.into_inner().unwrap()).unwrap();

    let app = App::new(MockFetcher::default(), MockConverter::default());
    app.run(&params(
        &target,
        FileType::Tx2Gene,
        SourceSpec::History(vec![tar_path]),
    ))
    .unwrap();

    let output = fs::read_to_string(target.join("hg38_tx2gene.tab")).unwrap();
    let headers: Vec<&str> = output.lines().filter(|line| line.starts_with('>')).collect();
    assert_eq!(headers.len(), 2000);
    assert_eq!(headers[0], ">seq0");
    assert_eq!(headers[1999], ">seq1999");
}

#[test]
fn zip_with_thousands_of_members_is_concatenated() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("extra");
    let files: Vec<(String, Vec<u8>)> = (0..1500)
        .map(|i| (format!("seq{i}.fa"), format!(">seq{i}\nTT").into_bytes()))
        .collect();
    let entries: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(name, body)| (name.as_str(), body.as_slice()))
        .collect();
    let fetcher = MockFetcher::default().with("https://x/many.zip", zip(&entries));
    let app = App::new(fetcher, MockConverter::default());

    app.run(&params(&target, FileType::Tx2Gene, urls(&["https://x/many.zip"])))
        .unwrap();

    let output = fs::read_to_string(target.join("hg38_tx2gene.tab")).unwrap();
    assert_eq!(output.lines().count(), 3000);
    assert!(output.starts_with(">seq0\nTT\n>seq1\nTT\n"));
    assert!(output.ends_with(">seq1499\nTT"));
}
