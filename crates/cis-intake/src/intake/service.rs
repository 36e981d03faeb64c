use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{error, info, warn};

use super::catalog::FieldCatalog;
use super::record::{assemble, Record};
use super::schema::{RecordSchema, SchemaMismatch};
use super::sink::{RecordSink, SinkError};
use super::state::FormState;
use super::validation::{AdvisoryWarning, SubmissionValidator, ValidationError};

/// Composes resolution, validation, assembly and the append-only sink.
pub struct IntakeService<S> {
    catalog: Arc<FieldCatalog>,
    schema: Arc<RecordSchema>,
    validator: SubmissionValidator,
    sink: Arc<S>,
}

impl<S> IntakeService<S>
where
    S: RecordSink + 'static,
{
    pub fn new(catalog: FieldCatalog, schema: RecordSchema, sink: Arc<S>) -> Self {
        let validator = SubmissionValidator::for_catalog(&catalog);
        Self {
            catalog: Arc::new(catalog),
            schema: Arc::new(schema),
            validator,
            sink,
        }
    }

    /// Build a service whose column order follows the sink's existing header.
    pub fn aligned(
        catalog: FieldCatalog,
        schema: RecordSchema,
        sink: Arc<S>,
    ) -> Result<Self, IntakeSetupError> {
        let schema = match sink.header()? {
            Some(header) => schema.aligned_to(&header)?,
            None => {
                warn!(sink = %sink.describe(), "sink has no header row yet, using standard layout");
                schema
            }
        };
        Ok(Self::new(catalog, schema, sink))
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Resolve, validate and assemble without touching the sink.
    pub fn prepare(
        &self,
        state: &FormState,
        submitted_at: NaiveDateTime,
    ) -> Result<PreparedSubmission, ValidationError> {
        let today = submitted_at.date();
        let resolved = state.resolve(&self.catalog, today)?;
        let warnings = self.validator.validate(&resolved, today)?;
        let record = assemble(&self.schema, &resolved, submitted_at);

        Ok(PreparedSubmission {
            display_name: format!(
                "{} {}",
                resolved.value("first_name").trim(),
                resolved.value("last_name").trim()
            ),
            record,
            warnings,
        })
    }

    /// Validate and append one submission. The caller keeps `state`, so a
    /// failed append can be retried with the same answers.
    pub fn submit(
        &self,
        state: &FormState,
        submitted_at: NaiveDateTime,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let prepared = self.prepare(state, submitted_at)?;

        for warning in &prepared.warnings {
            warn!(code = ?warning, "submission accepted with advisory");
        }

        if let Err(err) = self.sink.append(&prepared.record) {
            error!(sink = %self.sink.describe(), error = %err, "failed to append intake record");
            return Err(err.into());
        }

        info!(
            sink = %self.sink.describe(),
            columns = prepared.record.len(),
            warnings = prepared.warnings.len(),
            "intake record appended"
        );

        Ok(SubmissionReceipt {
            message: format!(
                "¡Ficha de {} guardada correctamente!",
                prepared.display_name
            ),
            record_length: prepared.record.len(),
            submitted_at,
            warnings: prepared.warnings,
        })
    }
}

/// A validated submission ready to be appended.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    pub display_name: String,
    pub record: Record,
    pub warnings: Vec<AdvisoryWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub message: String,
    pub record_length: usize,
    pub submitted_at: NaiveDateTime,
    pub warnings: Vec<AdvisoryWarning>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Startup failures while aligning the schema with the sink.
#[derive(Debug, thiserror::Error)]
pub enum IntakeSetupError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Schema(#[from] SchemaMismatch),
}
