//! Append-only destinations for assembled records.

pub mod csv_file;
pub mod sheets;

pub use csv_file::CsvFileSink;
pub use sheets::{normalize_private_key, service_account_key, GoogleSheetsSink, SheetsTarget};

use super::record::Record;

/// Append-only tabular store. Implementations are synchronous; callers on an
/// async runtime should invoke them from a blocking task.
pub trait RecordSink: Send + Sync {
    /// Current header row, or `None` when the sink has no rows yet.
    fn header(&self) -> Result<Option<Vec<String>>, SinkError>;

    fn append(&self, record: &Record) -> Result<(), SinkError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The store could not be reached or the credential was refused.
    #[error("could not connect to sink: {0}")]
    Connection(String),
    /// The store was reachable but rejected the row.
    #[error("could not write record: {0}")]
    Write(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl SinkError {
    pub fn is_connection(&self) -> bool {
        matches!(self, SinkError::Connection(_))
    }
}
