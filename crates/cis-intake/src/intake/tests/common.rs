use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::intake::catalog::FieldCatalog;
use crate::intake::intake_router;
use crate::intake::record::Record;
use crate::intake::schema::RecordSchema;
use crate::intake::service::IntakeService;
use crate::intake::session::SessionRegistry;
use crate::intake::sink::{RecordSink, SinkError};
use crate::intake::state::FormState;

pub(super) const PASSPHRASE: &str = "ficha-cis";

pub(super) fn submitted_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|date| date.and_hms_opt(10, 30, 0))
        .expect("valid timestamp")
}

/// Only the three required answers; everything else stays at its default.
pub(super) fn minimal_state() -> FormState {
    FormState::new()
        .with("first_name", "Ana")
        .with("last_name", "Pérez")
        .with("document_number", "30451327")
}

pub(super) fn full_state() -> FormState {
    minimal_state()
        .with("area", "Otro")
        .with("area_other", "Parador Retiro")
        .with("priority", "3. PERSONA SIN TECHO")
        .with("supervisor", "Marta Ruiz")
        .with("letter_number", "C-1187")
        .with("nationality", "Argentina")
        .with("birth_date", "1990-03-15")
        .with("takes_medication", "SI")
        .with("medication_name", "Enalapril")
        .with("has_two_day_supply", "SI")
        .with("has_medication_schedule", "SI")
        .with("schedule_photo_sent", "NO")
        .with("has_mobility_aid", "SI")
        .with("mobility_aid", "BASTON")
        .with("employment_status", "Posee empleo")
        .with("job_description", "Cuidacoches, 8 horas")
        .with("case_summary", "Ingresa derivada por operador de calle.")
}

#[derive(Default, Clone)]
pub(super) struct MemorySink {
    pub(super) header: Option<Vec<String>>,
    pub(super) rows: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub(super) fn with_header(header: Vec<String>) -> Self {
        Self {
            header: Some(header),
            rows: Arc::default(),
        }
    }

    pub(super) fn rows(&self) -> Vec<Record> {
        self.rows.lock().expect("sink mutex poisoned").clone()
    }
}

impl RecordSink for MemorySink {
    fn header(&self) -> Result<Option<Vec<String>>, SinkError> {
        Ok(self.header.clone())
    }

    fn append(&self, record: &Record) -> Result<(), SinkError> {
        self.rows
            .lock()
            .expect("sink mutex poisoned")
            .push(record.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub(super) struct UnreachableSink;

impl RecordSink for UnreachableSink {
    fn header(&self) -> Result<Option<Vec<String>>, SinkError> {
        Err(SinkError::Connection("spreadsheet offline".to_string()))
    }

    fn append(&self, _record: &Record) -> Result<(), SinkError> {
        Err(SinkError::Connection("spreadsheet offline".to_string()))
    }

    fn describe(&self) -> String {
        "unreachable".to_string()
    }
}

pub(super) struct RejectingSink;

impl RecordSink for RejectingSink {
    fn header(&self) -> Result<Option<Vec<String>>, SinkError> {
        Ok(None)
    }

    fn append(&self, _record: &Record) -> Result<(), SinkError> {
        Err(SinkError::Write("quota exceeded".to_string()))
    }

    fn describe(&self) -> String {
        "rejecting".to_string()
    }
}

pub(super) fn build_service() -> (IntakeService<MemorySink>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let service = IntakeService::new(
        FieldCatalog::standard(),
        RecordSchema::standard(),
        sink.clone(),
    );
    (service, sink)
}

pub(super) fn service_with<S: RecordSink + 'static>(sink: S) -> IntakeService<S> {
    IntakeService::new(
        FieldCatalog::standard(),
        RecordSchema::standard(),
        Arc::new(sink),
    )
}

pub(super) fn gated_router(service: IntakeService<MemorySink>) -> axum::Router {
    intake_router(
        Arc::new(service),
        Arc::new(SessionRegistry::new(Some(PASSPHRASE.to_string()))),
    )
}

pub(super) fn open_router<S: RecordSink + 'static>(service: IntakeService<S>) -> axum::Router {
    intake_router(Arc::new(service), Arc::new(SessionRegistry::open()))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
