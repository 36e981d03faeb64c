use serde::Serialize;
use tracing::warn;

/// Where a column's cell comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum ColumnSource {
    /// Submission time as `DD/MM/YYYY HH:MM:SS`.
    Timestamp,
    Field(&'static str),
    /// A date field rendered as `DD/MM/YYYY`.
    Date(&'static str),
    Age,
    /// Kept blank; filled in later by staff.
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub header: String,
    pub source: ColumnSource,
}

impl Column {
    fn new(header: impl Into<String>, source: ColumnSource) -> Self {
        Self {
            header: header.into(),
            source,
        }
    }
}

/// Named-column layout shared by the record assembler and every sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSchema {
    columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("sink header is missing columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },
    #[error("sink header repeats column '{header}'")]
    DuplicateColumn { header: String },
}

impl RecordSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.header.clone())
            .collect()
    }

    /// The admissions spreadsheet layout.
    pub fn standard() -> Self {
        use ColumnSource::{Age, Date, Field, Reserved, Timestamp};

        let columns = [
            ("MARCA TEMPORAL", Timestamp),
            ("N° LEGAJO", Reserved),
            ("ÁREA", Field("area")),
            ("PRIORIDAD", Field("priority")),
            ("EVALUACIÓN GORCIS", Field("gorcis_evaluation")),
            ("SUPERVISOR/A", Field("supervisor")),
            ("NÚMERO DE CARTA", Field("letter_number")),
            ("APELLIDO", Field("last_name")),
            ("NOMBRE", Field("first_name")),
            ("TIPO DE DOCUMENTO", Field("document_type")),
            ("NÚMERO DE IDENTIDAD", Field("document_number")),
            ("FECHA NACIMIENTO", Date("birth_date")),
            ("EDAD", Age),
            ("NACIONALIDAD", Field("nationality")),
            ("DOC. NECESARIA PARA INGRESO", Field("has_entry_documents")),
            ("FOTO DNI/TRÁMITE", Field("id_photo_sent")),
            ("PROBLEMÁTICA DE SALUD", Field("health_issue")),
            ("AUTOVALIDEZ", Field("self_sufficient")),
            ("CUD", Field("cud")),
            ("SOLICITUD CAMA BAJA", Field("low_bed_request")),
            ("APTO SUBIR ESCALERAS", Field("can_climb_stairs")),
            ("DIAGNÓSTICO MÉDICO/PSIQUIÁTRICO", Field("medical_diagnosis")),
            ("TOMA MEDICACIÓN", Field("takes_medication")),
            ("CUÁL MEDICACIÓN", Field("medication_name")),
            ("CUENTA CON ESQUEMA", Field("has_medication_schedule")),
            ("POSEE MEDICACIÓN PARA 2 DÍAS", Field("has_two_day_supply")),
            ("FOTO DEL ESQUEMA", Field("schedule_photo_sent")),
            ("USA PAÑALES", Field("uses_diapers")),
            ("PUEDE HIGIENIZARSE SOLO", Field("can_self_clean")),
            ("INSTRUMENTO PARA MOVILIDAD", Field("has_mobility_aid")),
            ("CUÁL INSTRUMENTO", Field("mobility_aid")),
            ("YESO O PARTE INMOVILIZADA", Field("cast_or_immobilized")),
            ("TIEMPO EN CALLE", Field("time_on_street")),
            ("MOTIVO SIT. CALLE", Field("street_reason")),
            ("PRIMERA VEZ EN CIS", Field("first_time_at_cis")),
            ("SITUACIÓN LABORAL", Field("employment_status")),
            ("DE QUÉ TRABAJA", Field("job_description")),
            ("RESUMEN DEL CASO", Field("case_summary")),
        ];

        Self::new(
            columns
                .into_iter()
                .map(|(header, source)| Column::new(header, source))
                .collect(),
        )
    }

    /// Reorder the columns to match the header row the sink already has.
    ///
    /// An empty header keeps the current order. Sink columns this schema does
    /// not know are kept as blank reserved columns; schema columns missing from
    /// the sink are an error.
    pub fn aligned_to(&self, actual: &[String]) -> Result<Self, SchemaMismatch> {
        if actual.iter().all(|header| header.trim().is_empty()) {
            return Ok(self.clone());
        }

        let mut remaining: Vec<Option<&Column>> = self.columns.iter().map(Some).collect();
        let mut aligned = Vec::with_capacity(actual.len());

        for header in actual {
            let key = normalize_header(header);
            if !key.is_empty()
                && aligned
                    .iter()
                    .any(|column: &Column| normalize_header(&column.header) == key)
            {
                return Err(SchemaMismatch::DuplicateColumn {
                    header: header.clone(),
                });
            }

            let matched = remaining.iter_mut().find_map(|slot| {
                if slot.is_some_and(|column| normalize_header(&column.header) == key) {
                    slot.take()
                } else {
                    None
                }
            });

            match matched {
                Some(column) => aligned.push(Column::new(header.clone(), column.source.clone())),
                None => {
                    warn!(header = %header, "sink column not produced by the form, leaving blank");
                    aligned.push(Column::new(header.clone(), ColumnSource::Reserved));
                }
            }
        }

        let missing: Vec<String> = remaining
            .into_iter()
            .flatten()
            .map(|column| column.header.clone())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaMismatch::MissingColumns { missing });
        }

        Ok(Self::new(aligned))
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}
