use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::age::age_on;
use super::catalog::{FieldCatalog, FieldDomain};
use super::validation::ValidationError;
use super::visibility::{resolve_visibility, Visibility};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Date field the derived age is computed from.
pub const BIRTH_DATE_FIELD: &str = "birth_date";

/// Raw answers for one submission, keyed by catalog field key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormState(BTreeMap<String, String>);

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Walk the catalog in order, applying the reveal table, defaults, the
    /// detail merges and the derived age. Values entered for hidden fields are
    /// discarded.
    pub fn resolve(
        &self,
        catalog: &FieldCatalog,
        today: NaiveDate,
    ) -> Result<ResolvedForm, ValidationError> {
        let unknown: Vec<String> = self
            .keys()
            .filter(|key| catalog.field(key).is_none())
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownFields { fields: unknown });
        }

        let mut values: BTreeMap<&'static str, String> = BTreeMap::new();
        let mut dates: BTreeMap<&'static str, NaiveDate> = BTreeMap::new();

        for field in catalog.fields() {
            if matches!(field.domain, FieldDomain::Derived) {
                continue;
            }

            let rule = catalog.rule_for(field.key);
            let entered = self
                .get(field.key)
                .map(str::trim)
                .filter(|value| !value.is_empty());

            let value = match (resolve_visibility(rule, &values), entered) {
                (Visibility::Hidden { default }, _) => default.to_string(),
                // A shown choice keeps the rule default only when it is one of
                // its own options; otherwise it starts on the first option.
                (Visibility::Shown, None) => match rule {
                    Some(rule) if field.domain.accepts(rule.hidden_default) => {
                        rule.hidden_default.to_string()
                    }
                    _ => field.domain.initial().to_string(),
                },
                (Visibility::Shown, Some(raw)) => {
                    if !field.domain.accepts(raw) {
                        return Err(ValidationError::InvalidChoice {
                            field: field.key,
                            value: raw.to_string(),
                        });
                    }
                    if matches!(field.domain, FieldDomain::Date) {
                        let date = parse_date(raw).ok_or_else(|| ValidationError::InvalidDate {
                            field: field.key,
                            value: raw.to_string(),
                        })?;
                        dates.insert(field.key, date);
                    }
                    raw.to_string()
                }
            };

            values.insert(field.key, value);
        }

        for merge in catalog.merges() {
            let detail = values.get(merge.detail).cloned().unwrap_or_default();
            if let Some(merged) = values
                .get(merge.target)
                .and_then(|current| merge.apply(current, &detail))
            {
                values.insert(merge.target, merged);
            }
        }

        let age = age_on(dates.get(BIRTH_DATE_FIELD).copied(), today);
        for field in catalog.fields() {
            if matches!(field.domain, FieldDomain::Derived) {
                values.insert(field.key, age.to_string());
            }
        }

        Ok(ResolvedForm { values, dates, age })
    }
}

impl<K, V> FromIterator<(K, V)> for FormState
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// A form after every catalog field has a definite value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedForm {
    values: BTreeMap<&'static str, String>,
    dates: BTreeMap<&'static str, NaiveDate>,
    age: u32,
}

impl ResolvedForm {
    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.dates.get(key).copied()
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.date(BIRTH_DATE_FIELD)
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn values(&self) -> &BTreeMap<&'static str, String> {
        &self.values
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw.trim(), format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
    }

    #[test]
    fn untouched_choices_take_first_option() {
        let resolved = FormState::new()
            .resolve(&FieldCatalog::standard(), today())
            .expect("empty form resolves");
        assert_eq!(resolved.value("area"), "RED DE ATENCIÓN");
        assert_eq!(resolved.value("priority"), "1. COMUNA 2");
        assert_eq!(resolved.value("takes_medication"), "NO");
        assert_eq!(resolved.value("first_name"), "");
        assert_eq!(resolved.value("age"), "0");
    }

    #[test]
    fn hidden_dependents_discard_entered_values() {
        let state = FormState::new()
            .with("uses_diapers", "NO")
            .with("can_self_clean", "Sí")
            .with("has_mobility_aid", "NO")
            .with("mobility_aid", "BASTON");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.value("can_self_clean"), "NO USA");
        assert_eq!(resolved.value("mobility_aid"), "NINGUNO");
    }

    #[test]
    fn visible_dependents_keep_answers() {
        let state = FormState::new()
            .with("employment_status", "Posee empleo")
            .with("job_description", "Albañil, 6 horas, changas");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.value("job_description"), "Albañil, 6 horas, changas");
    }

    #[test]
    fn visible_dependent_left_blank_uses_rule_default() {
        let state = FormState::new().with("area", "DIPA COMBATE");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.value("gorcis_evaluation"), "NO APLICA");
    }

    #[test]
    fn visible_choice_left_blank_starts_on_first_option() {
        let state = FormState::new()
            .with("uses_diapers", "SI")
            .with("has_mobility_aid", "SI");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.value("can_self_clean"), "Sí");
        assert_eq!(resolved.value("mobility_aid"), "SILLA DE RUEDAS");

        let state = FormState::new().with("takes_medication", "SI");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.value("has_two_day_supply"), "NO REQUIERE");
        assert_eq!(resolved.value("medication_name"), "NO APLICA");
    }

    #[test]
    fn other_area_is_merged_with_detail() {
        let state = FormState::new()
            .with("area", "Otro")
            .with("area_other", "Shelter X");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.value("area"), "Otro: Shelter X");
    }

    #[test]
    fn birth_date_drives_age() {
        let state = FormState::new().with("birth_date", "1990-03-16");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.age(), 33);
        assert_eq!(resolved.value("age"), "33");

        let state = FormState::new().with("birth_date", "15/03/1990");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.age(), 34);
    }

    #[test]
    fn submitted_age_is_ignored() {
        let state = FormState::new().with("age", "99");
        let resolved = state
            .resolve(&FieldCatalog::standard(), today())
            .expect("resolves");
        assert_eq!(resolved.value("age"), "0");
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let catalog = FieldCatalog::standard();

        let error = FormState::new()
            .with("favourite_colour", "green")
            .resolve(&catalog, today())
            .expect_err("unknown key");
        assert!(matches!(error, ValidationError::UnknownFields { .. }));

        let error = FormState::new()
            .with("area", "DIPA 99")
            .resolve(&catalog, today())
            .expect_err("bad choice");
        assert!(matches!(
            error,
            ValidationError::InvalidChoice { field: "area", .. }
        ));

        let error = FormState::new()
            .with("birth_date", "yesterday")
            .resolve(&catalog, today())
            .expect_err("bad date");
        assert!(matches!(
            error,
            ValidationError::InvalidDate {
                field: "birth_date",
                ..
            }
        ));
    }

    #[test]
    fn form_state_round_trips_as_plain_json_object() {
        let state: FormState =
            serde_json::from_str(r#"{"first_name":"Ana","document_number":"30451327"}"#)
                .expect("deserializes");
        assert_eq!(state.get("first_name"), Some("Ana"));
        assert_eq!(state.get("last_name"), None);
    }
}
