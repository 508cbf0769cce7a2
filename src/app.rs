use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::catalog::{CatalogEntry, DATA_TABLE_NAME, DataManagerRecord};
use crate::concat;
use crate::config::{ResolvedParams, SourceSpec};
use crate::convert::{self, Tx2GeneConverter};
use crate::error::FetchError;
use crate::fs_util;
use crate::remote::{self, UrlFetcher};
use crate::sniff;
use crate::stream::MemberSet;
use crate::workspace::Workspace;

/// Fetches the configured reference, normalizes it into one file below the
/// target directory and describes the result as a data table entry.
pub struct App<F: UrlFetcher, C: Tx2GeneConverter> {
    fetcher: F,
    converter: C,
    workspace_root: Option<PathBuf>,
}

impl<F: UrlFetcher, C: Tx2GeneConverter> App<F, C> {
    pub fn new(fetcher: F, converter: C) -> Self {
        Self {
            fetcher,
            converter,
            workspace_root: None,
        }
    }

    /// Places the temporary workspace below `root` instead of the system
    /// temp directory.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn run(&self, params: &ResolvedParams) -> Result<DataManagerRecord, FetchError> {
        let target = params.target_directory.as_std_path();
        fs::create_dir_all(target).map_err(|err| {
            FetchError::Filesystem(format!("create {}: {err}", target.display()))
        })?;

        let mut workspace = match &self.workspace_root {
            Some(root) => Workspace::new_in(root)?,
            None => Workspace::new()?,
        };
        let result = self.dispatch(params, target, &mut workspace);
        let cleanup = workspace.close();
        let entry = result?;
        cleanup?;

        info!(
            table = DATA_TABLE_NAME,
            value = %entry.value,
            path = %entry.path,
            "registered data table entry"
        );
        let mut record = DataManagerRecord::new();
        record.add_entry(DATA_TABLE_NAME, entry);
        Ok(record)
    }

    fn dispatch(
        &self,
        params: &ResolvedParams,
        target: &Path,
        workspace: &mut Workspace,
    ) -> Result<CatalogEntry, FetchError> {
        info!(
            source = params.source.kind(),
            dbkey = %params.identity.dbkey,
            file_type = %params.file_type,
            "fetching reference"
        );
        match &params.source {
            SourceSpec::Url(urls) => {
                let mut members = MemberSet::new();
                for url in urls {
                    let input = self.fetcher.open(url)?;
                    members.extend(sniff::open_members(url, input, workspace)?);
                }
                self.normalize(members, params, target)
            }
            SourceSpec::History(paths)
            | SourceSpec::Directory {
                paths,
                create_symlink: false,
            } => {
                let mut members = MemberSet::new();
                for path in paths {
                    let input = remote::open_local(path)?;
                    let name = path.display().to_string();
                    members.extend(sniff::open_members(&name, input, workspace)?);
                }
                self.normalize(members, params, target)
            }
            SourceSpec::Directory {
                paths,
                create_symlink: true,
            } => {
                let [source] = paths.as_slice() else {
                    return Err(FetchError::InvalidSource(format!(
                        "symlink mode needs exactly one path, got {}",
                        paths.len()
                    )));
                };
                let file_name = params.identity.symlink_file_name();
                fs_util::symlink_file(source, &target.join(&file_name))?;
                info!(source = %source.display(), link = %file_name, "linked reference");
                Ok(CatalogEntry::for_identity(&params.identity, file_name))
            }
        }
    }

    /// Concatenates the members into the output file and converts it when the
    /// declared type asks for it.
    fn normalize(
        &self,
        members: MemberSet,
        params: &ResolvedParams,
        target: &Path,
    ) -> Result<CatalogEntry, FetchError> {
        let file_name = params.identity.output_file_name();
        let destination = target.join(&file_name);
        info!(members = members.len(), output = %destination.display(), "concatenating");
        concat::concatenate(members, &destination)?;
        convert::convert_in_place(&self.converter, &destination, &params.file_type)?;
        Ok(CatalogEntry::for_identity(&params.identity, file_name))
    }
}
