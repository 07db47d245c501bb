use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

pub const MAX_IMPORT_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub const HELP_TEXT: &str = "\
contab - contact import/export

Navigation
  Up/Down, k/j      move selection
  Left/Right, h/l   move column
  PgUp/PgDn         move one page
  g / G             first / last row
  Tab               next table (contacts, import errors, statistics)

Contacts
  i                 import a contact file (.csv, .xlsx)
  x                 open the export form
  D                 delete all contacts

Tables
  e                 export the current table to export.csv
  E                 export the current table, asking for a file name
  c                 copy the selected cell
  r                 copy the selected row as CSV

Export form
  Tab               next field
  Left/Right        change the selected option
  Enter             edit date / submit
  Esc               close

  ?                 this help
  q                 quit
";

#[derive(Debug)]
pub enum ContabError {
    IoError(Error),
    PolarsError(PolarsError),
    XlsxReadError(calamine::XlsxError),
    XlsxWriteError(rust_xlsxwriter::XlsxError),
    ClipboardError(arboard::Error),
    ValidationError(String),
    ConfigError(String),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType(String),
}

impl fmt::Display for ContabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContabError::IoError(e) => write!(f, "I/O error: {e}"),
            ContabError::PolarsError(e) => write!(f, "Failed to read table data: {e}"),
            ContabError::XlsxReadError(e) => write!(f, "Failed to read XLSX file: {e}"),
            ContabError::XlsxWriteError(e) => write!(f, "Failed to write XLSX file: {e}"),
            ContabError::ClipboardError(e) => write!(f, "Clipboard error: {e}"),
            ContabError::ValidationError(msg) => write!(f, "{msg}"),
            ContabError::ConfigError(msg) => write!(f, "Invalid configuration: {msg}"),
            ContabError::LoadingFailed(msg) => write!(f, "Loading failed: {msg}"),
            ContabError::FileNotFound => write!(f, "File not found"),
            ContabError::PermissionDenied => write!(f, "Permission denied"),
            ContabError::UnknownFileType(ext) => write!(f, "Неподдерживаемый формат файла: {ext}"),
        }
    }
}

impl std::error::Error for ContabError {}

impl From<Error> for ContabError {
    fn from(err: Error) -> Self {
        ContabError::IoError(err)
    }
}

impl From<PolarsError> for ContabError {
    fn from(err: PolarsError) -> Self {
        ContabError::PolarsError(err)
    }
}

impl From<calamine::XlsxError> for ContabError {
    fn from(err: calamine::XlsxError) -> Self {
        ContabError::XlsxReadError(err)
    }
}

impl From<rust_xlsxwriter::XlsxError> for ContabError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ContabError::XlsxWriteError(err)
    }
}

impl From<arboard::Error> for ContabError {
    fn from(err: arboard::Error) -> Self {
        ContabError::ClipboardError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct ContabConfig {
    pub event_poll_time: u64,
    pub download_dir: PathBuf,
    pub notification_ttl_ms: u64,
    pub stats_interval_ms: u64,
    pub max_import_size: u64,
}

impl Default for ContabConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            download_dir: PathBuf::from("."),
            notification_ttl_ms: 5_000,
            stats_interval_ms: 30_000,
            max_import_size: MAX_IMPORT_FILE_SIZE,
        }
    }
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(input: &str) -> Result<PathBuf, ContabError> {
    shellexpand::full(input)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| ContabError::ConfigError(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    ImportPath,
    ExportFilename,
    DateFrom,
    DateTo,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::ImportPath => "Import file: ",
            CMDMode::ExportFilename => "Export as: ",
            CMDMode::DateFrom => "Date from (YYYY-MM-DD HH:MM): ",
            CMDMode::DateTo => "Date to (YYYY-MM-DD HH:MM): ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    NextTable,
    CopyCell,
    CopyRow,
    ExportTable,
    ExportTableAs,
    Import,
    OpenExportForm,
    NextField,
    PreviousChoice,
    NextChoice,
    DeleteAll,
    Confirm,
    Help,
    Enter,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
    Tick,
}
