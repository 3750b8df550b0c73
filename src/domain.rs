use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

use crate::record::UserRecord;

pub const DEFAULT_SOURCE: &str = "https://6874ce63dd06792b9c954fc7.mockapi.io/api/v1/users";
pub const DEFAULT_LOG_FILE: &str = "~/.userdash.log";
pub const AVATAR_PLACEHOLDER: &str = "https://via.placeholder.com/80";

pub const HELP_TEXT: &str = "\
 Tab / 1 / 2    switch between Dashboard and Users
 r              reload users from the source
 ?              show this help
 q              quit

 Users page
 /              search by name or email
 :              go to page
 s              toggle sort key (Name / Created At)
 o              toggle sort order
 Left / Right   previous / next page
 Home / End     first / last page
 Up / Down      move the row cursor
 Enter          show user details
 y              copy user as CSV line
 Esc            close popup / details";

#[derive(Debug)]
pub enum DashError {
    IoError(Error),
    HttpError(reqwest::Error),
    JsonError(serde_json::Error),
    HttpStatus(u16),
    LoadingFailed(String),
    UnknownSource(String),
    InvalidConfig(String),
    FileNotFound,
    PermissionDenied,
}

impl fmt::Display for DashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashError::IoError(e) => write!(f, "I/O error: {e}"),
            DashError::HttpError(e) => write!(f, "request failed: {e}"),
            DashError::JsonError(e) => write!(f, "invalid JSON: {e}"),
            DashError::HttpStatus(code) => write!(f, "server answered with HTTP {code}"),
            DashError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            DashError::UnknownSource(src) => write!(f, "unknown source \"{src}\""),
            DashError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            DashError::FileNotFound => write!(f, "file not found"),
            DashError::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

impl std::error::Error for DashError {}

impl From<Error> for DashError {
    fn from(err: Error) -> Self {
        DashError::IoError(err)
    }
}

impl From<reqwest::Error> for DashError {
    fn from(err: reqwest::Error) -> Self {
        DashError::HttpError(err)
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::JsonError(err)
    }
}

#[derive(Debug)]
pub enum Message {
    Quit,
    SwitchPage,
    ShowDashboard,
    ShowUsers,
    MoveUp,
    MoveDown,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    Search,
    GotoPage,
    ToggleSortKey,
    ToggleSortOrder,
    CopyRecord,
    Reload,
    Help,
    Enter,
    Exit,
    RawKey(KeyEvent),
    DataLoaded(Vec<UserRecord>),
    LoadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    GotoPage,
}

#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct DashConfig {
    /// URL or path of the user snapshot
    pub source: String,
    pub event_poll_time: u64,
    pub recent_count: usize,
    pub request_timeout: u64,
}

impl Default for DashConfig {
    fn default() -> Self {
        DashConfig {
            source: DEFAULT_SOURCE.to_string(),
            event_poll_time: 100,
            recent_count: 5,
            request_timeout: 15,
        }
    }
}
