use chrono::NaiveDate;
use cis_intake::config::SinkConfig;
use cis_intake::error::AppError;
use cis_intake::intake::record::Record;
use cis_intake::intake::sink::sheets::HttpsConnector;
use cis_intake::intake::{
    CsvFileSink, FieldCatalog, GoogleSheetsSink, IntakeService, RecordSchema, RecordSink,
    SinkError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The sink selected by `INTAKE_SINK`.
#[derive(Debug)]
pub(crate) enum ConfiguredSink {
    Csv(CsvFileSink),
    Sheets(GoogleSheetsSink<HttpsConnector>),
}

impl RecordSink for ConfiguredSink {
    fn header(&self) -> Result<Option<Vec<String>>, SinkError> {
        match self {
            ConfiguredSink::Csv(sink) => sink.header(),
            ConfiguredSink::Sheets(sink) => sink.header(),
        }
    }

    fn append(&self, record: &Record) -> Result<(), SinkError> {
        match self {
            ConfiguredSink::Csv(sink) => sink.append(record),
            ConfiguredSink::Sheets(sink) => sink.append(record),
        }
    }

    fn describe(&self) -> String {
        match self {
            ConfiguredSink::Csv(sink) => sink.describe(),
            ConfiguredSink::Sheets(sink) => sink.describe(),
        }
    }
}

pub(crate) async fn build_sink(config: &SinkConfig) -> Result<ConfiguredSink, SinkError> {
    match config {
        SinkConfig::Csv { path } => Ok(ConfiguredSink::Csv(CsvFileSink::new(
            path,
            RecordSchema::standard().headers(),
        ))),
        SinkConfig::Sheets {
            spreadsheet_title,
            credentials,
        } => {
            let runtime = Handle::current();
            let sink =
                GoogleSheetsSink::connect(spreadsheet_title.as_str(), credentials, runtime).await?;
            Ok(ConfiguredSink::Sheets(sink))
        }
    }
}

/// Build the sink and align the record layout with its header row. Header
/// reads may block on the network, so alignment runs on a blocking task.
pub(crate) async fn open_service(
    config: &SinkConfig,
) -> Result<IntakeService<ConfiguredSink>, AppError> {
    let sink = Arc::new(build_sink(config).await?);
    info!(sink = %sink.describe(), "opening intake sink");

    let service = tokio::task::spawn_blocking(move || {
        IntakeService::aligned(FieldCatalog::standard(), RecordSchema::standard(), sink)
    })
    .await
    .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))??;

    Ok(service)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    cis_intake::intake::state::parse_date(raw)
        .ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM-DD or DD/MM/YYYY"))
}
