use chrono::NaiveDateTime;
use serde::Serialize;

use super::schema::{ColumnSource, RecordSchema};
use super::state::ResolvedForm;

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// One output row, cell-for-column with the schema it was assembled against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record(Vec<String>);

impl Record {
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_cells(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Record {
    fn from(cells: Vec<String>) -> Self {
        Self(cells)
    }
}

/// Render a resolved form into the schema's column order.
pub fn assemble(
    schema: &RecordSchema,
    form: &ResolvedForm,
    submitted_at: NaiveDateTime,
) -> Record {
    let cells = schema
        .columns()
        .iter()
        .map(|column| match &column.source {
            ColumnSource::Timestamp => submitted_at.format(TIMESTAMP_FORMAT).to_string(),
            ColumnSource::Field(key) => form.value(key).to_string(),
            ColumnSource::Date(key) => form
                .date(key)
                .map(|date| date.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            ColumnSource::Age => form.age().to_string(),
            ColumnSource::Reserved => String::new(),
        })
        .collect();

    Record(cells)
}
