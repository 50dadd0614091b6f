use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::loader::TableKind;

/// Failure to load an ASA24 data directory. Always fatal to the load; the
/// caller keeps whatever it had loaded before.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("data directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("could not read data directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required {table} file in {} (expected a file named *_{table}.csv)", .dir.display())]
    MissingFile { table: TableKind, dir: PathBuf },

    #[error("found more than one {table} file: {}", .files.join(", "))]
    AmbiguousFile { table: TableKind, files: Vec<String> },

    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: &'static str },

    #[error("{file}, line {line}: missing subject identifier (UserName)")]
    MissingSubject { file: String, line: usize },

    #[error("{file}, line {line}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        file: String,
        line: usize,
        column: String,
        value: String,
    },

    #[error("{file}, line {line}: column '{column}' has negative value {value}")]
    NegativeValue {
        file: String,
        line: usize,
        column: String,
        value: f64,
    },

    #[error("{file}, line {line}: column '{column}' has unrecognised date '{value}'")]
    InvalidDate {
        file: String,
        line: usize,
        column: String,
        value: String,
    },
}

impl DataLoadError {
    /// Name of the offending file (or of the expected file when it is missing).
    #[must_use]
    pub fn file(&self) -> Option<String> {
        match self {
            Self::DirectoryNotFound(_) | Self::ReadDir { .. } => None,
            Self::MissingFile { table, .. } | Self::AmbiguousFile { table, .. } => {
                Some(format!("*_{table}.csv"))
            }
            Self::Csv { file, .. }
            | Self::MissingColumn { file, .. }
            | Self::MissingSubject { file, .. }
            | Self::InvalidNumber { file, .. }
            | Self::NegativeValue { file, .. }
            | Self::InvalidDate { file, .. } => Some(file.clone()),
        }
    }
}

/// A table could not be serialized. This is a contract violation on the
/// caller's side, never something the user can fix.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("row {row} has {found} cells but the table has {expected} columns")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("invalid sheet name '{0}'")]
    SheetName(String),

    #[error("spreadsheet writer failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv writer failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error while exporting: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no ASA24 data loaded yet; load a data directory first")]
    NotLoaded,

    #[error(transparent)]
    Load(#[from] DataLoadError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    EmptySelection,
    ScoringSkipped,
}

/// Non-fatal condition reported alongside a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recall_no: Option<u32>,
}

impl Notice {
    #[must_use]
    pub fn no_subjects() -> Self {
        Self {
            kind: NoticeKind::EmptySelection,
            message: "No subjects selected (or none of the selected subjects are in the loaded data)"
                .to_string(),
            subject: None,
            recall_no: None,
        }
    }

    #[must_use]
    pub fn no_rows(what: &str) -> Self {
        Self {
            kind: NoticeKind::EmptySelection,
            message: format!("No {what} reported for the selected subjects"),
            subject: None,
            recall_no: None,
        }
    }

    #[must_use]
    pub fn scoring_skipped(subject: &str, recall_no: Option<u32>) -> Self {
        let unit = match recall_no {
            Some(n) => format!("{subject}, Visit {n}"),
            None => subject.to_string(),
        };
        Self {
            kind: NoticeKind::ScoringSkipped,
            message: format!("HEI-2015 skipped for {unit}: no energy data"),
            subject: Some(subject.to_string()),
            recall_no,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
