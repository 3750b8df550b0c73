use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, info_span, instrument};
use tracing_error::SpanTrace;

use crate::domain::DashError;
use crate::record::{UserRecord, parse_records};

/// Where the user snapshot comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Remote(String),
    File(PathBuf),
}

impl Source {
    pub fn detect(location: &str) -> Result<Source, DashError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(DashError::UnknownSource(location.to_string()));
        }
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Source::Remote(location.to_string()));
        }
        let expanded = shellexpand::full(location)
            .map_err(|_| DashError::UnknownSource(location.to_string()))?;
        Ok(Source::File(PathBuf::from(expanded.as_ref())))
    }

    #[instrument(skip(self), fields(source = %self))]
    pub fn fetch(&self, timeout: Duration) -> Result<Vec<UserRecord>, DashError> {
        let start_time = Instant::now();
        let body = match self {
            Source::Remote(url) => Self::fetch_remote(url, timeout)?,
            Source::File(path) => Self::read_file(path)?,
        };
        debug!("Fetched {} bytes", body.len());

        let records = parse_records(&body)?;
        info!(
            "Loaded {} users in {}ms",
            records.len(),
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }

    fn fetch_remote(url: &str, timeout: Duration) -> Result<String, DashError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        let response = client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashError::HttpStatus(status.as_u16()));
        }
        Ok(response.text()?)
    }

    fn read_file(path: &Path) -> Result<String, DashError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DashError::FileNotFound,
            ErrorKind::PermissionDenied => DashError::PermissionDenied,
            _ => DashError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(DashError::LoadingFailed("Not a file!".into()));
        }
        Ok(fs::read_to_string(path)?)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Remote(url) => write!(f, "{url}"),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A single fetch running on a background thread.
///
/// The result is handed out exactly once by [`Loader::poll`]. Dropping the
/// loader discards a fetch that is still running.
pub struct Loader {
    receiver: Option<Receiver<Result<Vec<UserRecord>, DashError>>>,
}

impl Loader {
    pub fn spawn(source: Source, timeout: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let _span = info_span!("loader", %source).entered();
            let result = source.fetch(timeout);
            if let Err(e) = &result {
                error!(spantrace = %SpanTrace::capture(), "Fetching users failed: {e}");
            }
            // The receiver is gone when the app quit mid fetch
            let _ = sender.send(result);
        });
        Loader {
            receiver: Some(receiver),
        }
    }

    pub fn poll(&mut self) -> Option<Result<Vec<UserRecord>, DashError>> {
        let result = match self.receiver.as_ref()?.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(DashError::LoadingFailed(
                "loader thread vanished".to_string(),
            )),
        };
        self.receiver = None;
        Some(result)
    }
}
