use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::error::FetchError;
use crate::workspace::Workspace;

/// Read size used for peeking, spooling and copying.
pub const CHUNK_SIZE: usize = 1 << 20;

pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A freshly opened input. Rewindable sources may still refuse to seek
/// (a pipe behind a `File`), which the rewind adapter checks at runtime.
pub enum InputStream {
    Rewindable(Box<dyn ReadSeek>),
    Forward(Box<dyn Read + Send>),
}

impl InputStream {
    pub fn rewindable<R: Read + Seek + Send + 'static>(reader: R) -> Self {
        InputStream::Rewindable(Box::new(reader))
    }

    pub fn forward<R: Read + Send + 'static>(reader: R) -> Self {
        InputStream::Forward(Box::new(reader))
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputStream::Rewindable(_) => write!(f, "InputStream::Rewindable"),
            InputStream::Forward(_) => write!(f, "InputStream::Forward"),
        }
    }
}

/// Rewind adapter: returns a stream positioned at offset zero that can be
/// rewound again. Forward-only streams are spooled into the workspace first.
pub fn rewindable(
    input: InputStream,
    workspace: &Workspace,
) -> Result<Box<dyn ReadSeek>, FetchError> {
    match input {
        InputStream::Rewindable(mut reader) => match reader.rewind() {
            Ok(()) => Ok(reader),
            Err(err) => {
                debug!("rewind unsupported ({err}), spooling to workspace");
                spool(reader, workspace)
            }
        },
        InputStream::Forward(reader) => spool(reader, workspace),
    }
}

fn spool<R: Read + ?Sized>(
    mut reader: Box<R>,
    workspace: &Workspace,
) -> Result<Box<dyn ReadSeek>, FetchError> {
    let mut file = workspace.spool_file("download")?;
    let start = read_chunk(&mut reader)
        .map_err(|err| FetchError::Filesystem(format!("read input: {err}")))?;
    file.write_all(&start)
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    let rest = io::copy(&mut reader, &mut file)
        .map_err(|err| FetchError::Filesystem(format!("read input: {err}")))?;
    file.flush()
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    file.rewind()
        .map_err(|err| FetchError::Filesystem(err.to_string()))?;
    debug!(
        bytes = start.len() as u64 + rest,
        path = %file.path().display(),
        "spooled forward-only stream"
    );
    Ok(Box::new(file))
}

/// Reads up to one chunk, stopping early only at end of stream.
pub fn read_chunk<R: Read + ?Sized>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(CHUNK_SIZE);
    Read::take(&mut *reader, CHUNK_SIZE as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// One readable source destined for the output file.
pub struct Member {
    name: String,
    container: Option<&'static str>,
    source: Source,
}

enum Source {
    Reader(Box<dyn Read + Send>),
    /// Opened on first read and closed when the member is dropped.
    Path(PathBuf),
}

impl Member {
    pub fn new<R: Read + Send + 'static>(name: impl Into<String>, reader: R) -> Self {
        Self::from_boxed(name, Box::new(reader))
    }

    pub fn from_boxed(name: impl Into<String>, reader: Box<dyn Read + Send>) -> Self {
        Self {
            name: name.into(),
            container: None,
            source: Source::Reader(reader),
        }
    }

    /// A member backed by a file that is not opened until it is read, so an
    /// archive with many entries holds at most one descriptor at a time.
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            container: None,
            source: Source::Path(path.into()),
        }
    }

    /// Marks the member as decoded on the fly from a compressed container,
    /// so read failures are reported as archive errors.
    pub fn decoded_from(mut self, container: &'static str) -> Self {
        self.container = Some(container);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> Option<&'static str> {
        self.container
    }
}

impl Read for Member {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Source::Path(path) = &self.source {
            let file = File::open(path).map_err(|err| {
                io::Error::new(err.kind(), format!("open {}: {err}", path.display()))
            })?;
            self.source = Source::Reader(Box::new(file));
        }
        match &mut self.source {
            Source::Reader(reader) => reader.read(buf),
            Source::Path(_) => Ok(0),
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("container", &self.container)
            .finish()
    }
}

/// Ordered sources; length 0, 1 and N are all valid.
#[derive(Debug, Default)]
pub struct MemberSet(Vec<Member>);

impl MemberSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn single(member: Member) -> Self {
        Self(vec![member])
    }

    pub fn push(&mut self, member: Member) {
        self.0.push(member);
    }

    pub fn extend(&mut self, other: MemberSet) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(Member::name).collect()
    }
}

impl From<Vec<Member>> for MemberSet {
    fn from(members: Vec<Member>) -> Self {
        Self(members)
    }
}

impl IntoIterator for MemberSet {
    type Item = Member;
    type IntoIter = std::vec::IntoIter<Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
