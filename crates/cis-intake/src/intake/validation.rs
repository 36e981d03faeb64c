use chrono::NaiveDate;
use serde::Serialize;

use super::catalog::{FieldCatalog, AREA_COMBAT_UNIT, NOT_APPLICABLE};
use super::state::ResolvedForm;

/// Earliest birth date the form accepts.
pub const MIN_BIRTH_DATE: (i32, u32, u32) = (1920, 1, 1);

/// Reasons a submission is blocked before anything reaches the sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .fields.join(", "))]
    MissingRequired { fields: Vec<&'static str> },
    #[error("'{value}' is not an option for {field}")]
    InvalidChoice { field: &'static str, value: String },
    #[error("'{value}' is not a valid date for {field} (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },
    #[error("birth date {birth_date} must fall between 1920-01-01 and {today}")]
    BirthDateOutOfRange {
        birth_date: NaiveDate,
        today: NaiveDate,
    },
    #[error("unknown form fields: {}", .fields.join(", "))]
    UnknownFields { fields: Vec<String> },
}

impl ValidationError {
    /// Field keys the error points at, for inline display next to the inputs.
    pub fn fields(&self) -> Vec<String> {
        match self {
            ValidationError::MissingRequired { fields } => {
                fields.iter().map(|field| field.to_string()).collect()
            }
            ValidationError::InvalidChoice { field, .. }
            | ValidationError::InvalidDate { field, .. } => vec![field.to_string()],
            ValidationError::BirthDateOutOfRange { .. } => vec!["birth_date".to_string()],
            ValidationError::UnknownFields { fields } => fields.clone(),
        }
    }
}

/// Non-blocking inconsistencies reported back with a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AdvisoryWarning {
    GorcisEvaluationMissing,
}

impl AdvisoryWarning {
    pub const fn message(self) -> &'static str {
        match self {
            AdvisoryWarning::GorcisEvaluationMissing => {
                "Seleccionó DIPA COMBATE pero no indicó evaluación GORCIS."
            }
        }
    }
}

/// Required-field checks plus advisory consistency checks.
#[derive(Debug, Clone)]
pub struct SubmissionValidator {
    required: Vec<&'static str>,
    min_birth_date: NaiveDate,
}

impl SubmissionValidator {
    pub fn for_catalog(catalog: &FieldCatalog) -> Self {
        let (year, month, day) = MIN_BIRTH_DATE;
        Self {
            required: catalog.required_fields().map(|field| field.key).collect(),
            min_birth_date: NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN),
        }
    }

    pub fn validate(
        &self,
        form: &ResolvedForm,
        today: NaiveDate,
    ) -> Result<Vec<AdvisoryWarning>, ValidationError> {
        let missing: Vec<&'static str> = self
            .required
            .iter()
            .copied()
            .filter(|key| form.value(key).trim().is_empty())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired { fields: missing });
        }

        if let Some(birth_date) = form.birth_date() {
            if birth_date < self.min_birth_date || birth_date > today {
                return Err(ValidationError::BirthDateOutOfRange { birth_date, today });
            }
        }

        Ok(advisories(form))
    }
}

fn advisories(form: &ResolvedForm) -> Vec<AdvisoryWarning> {
    let mut warnings = Vec::new();
    if form.value("area") == AREA_COMBAT_UNIT && form.value("gorcis_evaluation") == NOT_APPLICABLE
    {
        warnings.push(AdvisoryWarning::GorcisEvaluationMissing);
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::state::FormState;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
    }

    fn check(state: FormState) -> Result<Vec<AdvisoryWarning>, ValidationError> {
        let catalog = FieldCatalog::standard();
        let validator = SubmissionValidator::for_catalog(&catalog);
        let resolved = state.resolve(&catalog, today())?;
        validator.validate(&resolved, today())
    }

    fn identified() -> FormState {
        FormState::new()
            .with("first_name", "Ana")
            .with("last_name", "Pérez")
            .with("document_number", "30451327")
    }

    #[test]
    fn names_every_missing_required_field() {
        let error = check(FormState::new().with("first_name", "Ana")).expect_err("blocked");
        assert_eq!(
            error,
            ValidationError::MissingRequired {
                fields: vec!["last_name", "document_number"]
            }
        );
        assert_eq!(
            error.to_string(),
            "missing required fields: last_name, document_number"
        );
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let error = check(identified().with("document_number", "   ")).expect_err("blocked");
        assert_eq!(error.fields(), vec!["document_number".to_string()]);
    }

    #[test]
    fn identified_form_passes_without_warnings() {
        assert_eq!(check(identified()).expect("valid"), Vec::new());
    }

    #[test]
    fn combat_unit_without_gorcis_is_advisory_only() {
        let warnings = check(identified().with("area", "DIPA COMBATE")).expect("not blocked");
        assert_eq!(warnings, vec![AdvisoryWarning::GorcisEvaluationMissing]);

        let warnings = check(
            identified()
                .with("area", "DIPA COMBATE")
                .with("gorcis_evaluation", "SI"),
        )
        .expect("not blocked");
        assert!(warnings.is_empty());
    }

    #[test]
    fn birth_date_outside_range_is_rejected() {
        let error = check(identified().with("birth_date", "1919-12-31")).expect_err("too old");
        assert!(matches!(error, ValidationError::BirthDateOutOfRange { .. }));

        let error = check(identified().with("birth_date", "2024-03-16")).expect_err("future");
        assert!(matches!(error, ValidationError::BirthDateOutOfRange { .. }));

        assert!(check(identified().with("birth_date", "2024-03-15")).is_ok());
    }
}
