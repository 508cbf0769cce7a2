use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use suppaftp::types::FileType as TransferType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, info};

use crate::error::FetchError;
use crate::stream::InputStream;

pub trait UrlFetcher {
    /// Opens `url` for reading. Network responses come back forward-only.
    fn open(&self, url: &str) -> Result<InputStream, FetchError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("tx2gene-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FetchError::Filesystem(err.to_string()))?,
        );

        // no request timeout
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| FetchError::Http {
                url: String::new(),
                message: err.to_string(),
            })?;

        Ok(Self { client })
    }
}

impl UrlFetcher for HttpFetcher {
    fn open(&self, url: &str) -> Result<InputStream, FetchError> {
        let scheme = url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();
        match scheme.as_str() {
            "http" | "https" => {
                info!(url, "downloading");
                let response = self.client.get(url).send().map_err(|err| FetchError::Http {
                    url: url.to_string(),
                    message: err.to_string(),
                })?;
                if !response.status().is_success() {
                    return Err(FetchError::HttpStatus {
                        url: url.to_string(),
                        status: response.status().as_u16(),
                    });
                }
                Ok(InputStream::forward(response))
            }
            "ftp" => open_ftp(url),
            "file" => open_local(Path::new(&url["file://".len()..])),
            _ => Err(FetchError::UnsupportedScheme(url.to_string())),
        }
    }
}

/// Host, credentials and path of an `ftp://` URL. Missing credentials mean
/// an anonymous login.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FtpLocation {
    address: String,
    user: String,
    password: String,
    path: String,
}

impl FtpLocation {
    fn parse(url: &str) -> Result<Self, FetchError> {
        let parsed =
            Url::parse(url).map_err(|err| FetchError::InvalidSource(format!("{url}: {err}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidSource(format!("{url}: missing host")))?;
        let port = parsed.port_or_known_default().unwrap_or(21);
        let user = match parsed.username() {
            "" => "anonymous",
            user => user,
        };
        Ok(Self {
            address: format!("{host}:{port}"),
            user: user.to_string(),
            password: parsed.password().unwrap_or_default().to_string(),
            path: parsed.path().to_string(),
        })
    }
}

fn open_ftp(url: &str) -> Result<InputStream, FetchError> {
    let location = FtpLocation::parse(url)?;
    let ftp_error = |err: FtpError| FetchError::Http {
        url: url.to_string(),
        message: err.to_string(),
    };

    info!(url, "downloading");
    let mut control = FtpStream::connect(&location.address).map_err(ftp_error)?;
    control
        .login(location.user.as_str(), location.password.as_str())
        .map_err(ftp_error)?;
    control
        .transfer_type(TransferType::Binary)
        .map_err(ftp_error)?;
    let data = control.retr_as_stream(&location.path).map_err(ftp_error)?;
    Ok(InputStream::forward(FtpDownload {
        control,
        data: Some(Box::new(data)),
    }))
}

/// Data connection of a RETR; the transfer is finalized on the control
/// connection once the data stream reaches its end.
struct FtpDownload {
    control: FtpStream,
    data: Option<Box<dyn Read + Send>>,
}

impl Read for FtpDownload {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(data) = self.data.as_mut() else {
            return Ok(0);
        };
        let n = data.read(buf)?;
        if n == 0
            && !buf.is_empty()
            && let Some(data) = self.data.take()
        {
            self.control
                .finalize_retr_stream(data)
                .map_err(|err| io::Error::other(err.to_string()))?;
        }
        Ok(n)
    }
}

impl Drop for FtpDownload {
    fn drop(&mut self) {
        if let Err(err) = self.control.quit() {
            debug!("ftp quit failed: {err}");
        }
    }
}

/// Opens a local file; files support native rewind.
pub fn open_local(path: &Path) -> Result<InputStream, FetchError> {
    let file = File::open(path)
        .map_err(|err| FetchError::Filesystem(format!("open {}: {err}", path.display())))?;
    Ok(InputStream::rewindable(file))
}
