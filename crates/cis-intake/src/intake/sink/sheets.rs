use std::sync::Mutex;

use google_drive3::api::Scope as DriveScope;
use google_drive3::DriveHub;
use google_sheets4::api::{Scope as SheetsScope, ValueRange};
use google_sheets4::yup_oauth2::{self, ServiceAccountKey};
use google_sheets4::{hyper_rustls, hyper_util, Sheets};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, info};

use super::{RecordSink, SinkError};
use crate::config::CredentialSource;
use crate::intake::record::Record;

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Spreadsheet id and first-sheet title the sink writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsTarget {
    pub spreadsheet_id: String,
    pub sheet_title: String,
}

impl SheetsTarget {
    fn range(&self, cells: &str) -> String {
        format!("'{}'!{cells}", self.sheet_title.replace('\'', "''"))
    }
}

/// Google Sheets sink. The spreadsheet is located by title through Drive and
/// rows are appended to its first sheet.
///
/// Calls block on the provided runtime handle, so they must run outside of an
/// async context (e.g. inside `spawn_blocking`).
pub struct GoogleSheetsSink<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    sheets: Sheets<C>,
    drive: DriveHub<C>,
    runtime: Handle,
    spreadsheet_title: String,
    target: Mutex<Option<SheetsTarget>>,
}

impl<C> GoogleSheetsSink<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    pub fn new(
        sheets: Sheets<C>,
        drive: DriveHub<C>,
        runtime: Handle,
        spreadsheet_title: impl Into<String>,
    ) -> Self {
        Self {
            sheets,
            drive,
            runtime,
            spreadsheet_title: spreadsheet_title.into(),
            target: Mutex::new(None),
        }
    }

    fn connection_error<E: std::fmt::Display>(err: E) -> SinkError {
        SinkError::Connection(err.to_string())
    }

    fn api_error(err: google_sheets4::Error) -> SinkError {
        use google_sheets4::Error;

        if matches!(
            err,
            Error::HttpError(_) | Error::MissingToken(_) | Error::MissingAPIKey
        ) {
            SinkError::Connection(err.to_string())
        } else {
            SinkError::Write(err.to_string())
        }
    }

    /// Resolve (once) the spreadsheet id and the title of its first sheet.
    pub fn target(&self) -> Result<SheetsTarget, SinkError> {
        let mut cached = self
            .target
            .lock()
            .map_err(|_| SinkError::Connection("sheets target lock poisoned".to_string()))?;
        if let Some(target) = cached.as_ref() {
            return Ok(target.clone());
        }

        let query = format!(
            "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            escape_query_literal(&self.spreadsheet_title)
        );
        let listing = self.runtime.block_on(async {
            self.drive
                .files()
                .list()
                .q(&query)
                .param("fields", "files(id,name)")
                .page_size(1)
                .include_items_from_all_drives(true)
                .supports_all_drives(true)
                .add_scope(DriveScope::MetadataReadonly)
                .doit()
                .await
        });
        let (_, file_list) = listing.map_err(Self::connection_error)?;
        let spreadsheet_id = file_list
            .files
            .unwrap_or_default()
            .into_iter()
            .find_map(|file| file.id)
            .ok_or_else(|| {
                SinkError::Connection(format!(
                    "spreadsheet '{}' not found or not shared with the service account",
                    self.spreadsheet_title
                ))
            })?;

        let spreadsheet = self.runtime.block_on(async {
            self.sheets
                .spreadsheets()
                .get(&spreadsheet_id)
                .param("fields", "sheets.properties.title")
                .add_scope(SheetsScope::Spreadsheet)
                .doit()
                .await
        });
        let (_, spreadsheet) = spreadsheet.map_err(Self::connection_error)?;
        let sheet_title = spreadsheet
            .sheets
            .unwrap_or_default()
            .into_iter()
            .find_map(|sheet| sheet.properties.and_then(|properties| properties.title))
            .ok_or_else(|| {
                SinkError::Connection(format!(
                    "spreadsheet '{}' has no sheets",
                    self.spreadsheet_title
                ))
            })?;

        let target = SheetsTarget {
            spreadsheet_id,
            sheet_title,
        };
        info!(sheet = %target.sheet_title, "resolved intake spreadsheet");
        *cached = Some(target.clone());
        Ok(target)
    }
}

impl<C> RecordSink for GoogleSheetsSink<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn header(&self) -> Result<Option<Vec<String>>, SinkError> {
        let target = self.target()?;
        let range = target.range("1:1");

        let result = self.runtime.block_on(async {
            self.sheets
                .spreadsheets()
                .values_get(&target.spreadsheet_id, &range)
                .add_scope(SheetsScope::Spreadsheet)
                .doit()
                .await
        });
        let (_, value_range) = result.map_err(Self::api_error)?;

        let header: Vec<String> = value_range
            .values
            .unwrap_or_default()
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(cell_text)
            .collect();

        Ok((!header.is_empty()).then_some(header))
    }

    fn append(&self, record: &Record) -> Result<(), SinkError> {
        let target = self.target()?;
        let range = target.range("A1");
        let request = ValueRange {
            values: Some(vec![record
                .cells()
                .iter()
                .cloned()
                .map(Value::String)
                .collect()]),
            ..ValueRange::default()
        };

        let result = self.runtime.block_on(async {
            self.sheets
                .spreadsheets()
                .values_append(request, &target.spreadsheet_id, &range)
                .value_input_option("RAW")
                .insert_data_option("INSERT_ROWS")
                .add_scope(SheetsScope::Spreadsheet)
                .doit()
                .await
        });
        let (_, response) = result.map_err(Self::api_error)?;
        let updated_range = response.updates.and_then(|updates| updates.updated_range);
        debug!(?updated_range, "row appended");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("google spreadsheet '{}'", self.spreadsheet_title)
    }
}

impl<C> std::fmt::Debug for GoogleSheetsSink<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsSink")
            .field("spreadsheet_title", &self.spreadsheet_title)
            .finish_non_exhaustive()
    }
}

impl GoogleSheetsSink<HttpsConnector> {
    /// Authenticate with the service account and build the Drive and Sheets hubs.
    pub async fn connect(
        spreadsheet_title: impl Into<String>,
        credentials: &CredentialSource,
        runtime: Handle,
    ) -> Result<Self, SinkError> {
        let raw = match credentials {
            CredentialSource::File(path) => std::fs::read_to_string(path).map_err(|err| {
                SinkError::Connection(format!(
                    "unable to read credentials {}: {err}",
                    path.display()
                ))
            })?,
            CredentialSource::Inline(json) => json.clone(),
        };
        let key = service_account_key(&raw)?;

        let sheets_auth = yup_oauth2::ServiceAccountAuthenticator::builder(key.clone())
            .build()
            .await
            .map_err(Self::connection_error)?;
        let drive_auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(Self::connection_error)?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(Self::connection_error)?
            .https_or_http()
            .enable_http1()
            .build();
        let client = hyper_util::client::legacy::Client::builder(
            hyper_util::rt::TokioExecutor::new(),
        )
        .build(connector);

        let sheets = Sheets::new(client.clone(), sheets_auth);
        let drive = DriveHub::new(client, drive_auth);
        Ok(Self::new(sheets, drive, runtime, spreadsheet_title))
    }
}

/// Parse a service-account JSON document, repairing a private key whose line
/// breaks were stored as literal `\n` sequences.
pub fn service_account_key(raw: &str) -> Result<ServiceAccountKey, SinkError> {
    let mut key: ServiceAccountKey = serde_json::from_str(raw)
        .map_err(|err| SinkError::Connection(format!("invalid service account key: {err}")))?;
    key.private_key = normalize_private_key(&key.private_key);
    Ok(key)
}

pub fn normalize_private_key(key: &str) -> String {
    key.replace("\\n", "\n")
}

fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
