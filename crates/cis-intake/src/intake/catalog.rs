use serde::Serialize;

use super::visibility::VisibilityRule;

pub const AREA_COMBAT_UNIT: &str = "DIPA COMBATE";
pub const AREA_OTHER: &str = "Otro";
pub const YES: &str = "SI";
pub const NOT_APPLICABLE: &str = "NO APLICA";
pub const NOT_REQUIRED: &str = "NO REQUIERE";
pub const EMPLOYED: &str = "Posee empleo";

const YES_NO: &[&str] = &["SI", "NO"];
const NO_YES: &[&str] = &["NO", "SI"];
const YES_NO_NOT_REQUIRED: &[&str] = &["SI", "NO", NOT_REQUIRED];
const GORCIS_OPTIONS: &[&str] = &["SI", "NO", NOT_APPLICABLE];
const CUD_OPTIONS: &[&str] = &["NO", "SI", NOT_REQUIRED];
const SELF_CLEAN_OPTIONS: &[&str] = &["Sí", "NO"];
const AREAS: &[&str] = &["RED DE ATENCIÓN", "DIPA 15", AREA_COMBAT_UNIT, "SUBTE", AREA_OTHER];
const DOCUMENT_TYPES: &[&str] = &["DNI", "PASAPORTE", "PRECARIA", "OTRO"];
const MOBILITY_AIDS: &[&str] = &["SILLA DE RUEDAS", "BASTON", "ANDADOR", "MULETAS"];
const PRIORITIES: &[&str] = &[
    "1. COMUNA 2",
    "2. COMUNA 14",
    "3. PERSONA SIN TECHO",
    "4. ORGAS",
    "5. GERENCIA",
    "6. 9 DE JULIO",
    "7. OTRAS",
];
const TIME_ON_STREET: &[&str] = &[
    "NO RECUERDA",
    "MENOS DE 1 MES",
    "MAS DE 1 MES",
    "ENTRE 1 Y 6 MESES",
    "ENTRE 6 MESES Y 1 AÑO",
    "MAS DE 1 AÑO",
    "MAS DE 2 AÑOS",
];
const STREET_REASONS: &[&str] = &[
    "MOTIVO ECONÓMICO",
    "MOTIVO FAMILIAR",
    "MOTIVO SALUD",
    "OTROS MOTIVOS",
];
const EMPLOYMENT_STATUSES: &[&str] = &[
    EMPLOYED,
    "Desempleado. En búsqueda activa",
    "Desempleado. Sin búsqueda activa",
    "Desempleado (Imposibilidad física/mental)",
];

/// Form sections in the order operators fill them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Administrative,
    Personal,
    Health,
    Mobility,
    Social,
}

impl Section {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Administrative,
            Self::Personal,
            Self::Health,
            Self::Mobility,
            Self::Social,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Administrative => "1. Datos Administrativos",
            Self::Personal => "2. Datos Personales",
            Self::Health => "3. Salud y Medicación",
            Self::Mobility => "4. Higiene y Movilidad",
            Self::Social => "5. Situación Social y Laboral",
        }
    }
}

/// Value domain of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDomain {
    Text,
    Choice { options: &'static [&'static str] },
    Date,
    /// Computed by the resolver; submitted values are ignored.
    Derived,
}

impl FieldDomain {
    /// Value a visible field takes when the operator leaves it untouched.
    pub fn initial(&self) -> &'static str {
        match self {
            FieldDomain::Choice { options } => options.first().copied().unwrap_or(""),
            FieldDomain::Text | FieldDomain::Date | FieldDomain::Derived => "",
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            FieldDomain::Choice { options } => options.contains(&value),
            FieldDomain::Text | FieldDomain::Date | FieldDomain::Derived => true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub key: &'static str,
    pub label: &'static str,
    pub section: Section,
    pub domain: FieldDomain,
    pub required: bool,
}

/// Folds a free-text detail into its parent choice, e.g. `Otro` + `Refugio X`
/// becomes `Otro: Refugio X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetailMerge {
    pub target: &'static str,
    pub trigger: &'static str,
    pub detail: &'static str,
}

impl DetailMerge {
    pub fn apply(&self, target_value: &str, detail_value: &str) -> Option<String> {
        (target_value == self.trigger).then(|| format!("{}: {}", self.trigger, detail_value))
    }
}

/// Ordered field catalog with its visibility table.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<Field>,
    rules: Vec<VisibilityRule>,
    merges: Vec<DetailMerge>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<Field>, rules: Vec<VisibilityRule>, merges: Vec<DetailMerge>) -> Self {
        Self {
            fields,
            rules,
            merges,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn rules(&self) -> &[VisibilityRule] {
        &self.rules
    }

    pub fn merges(&self) -> &[DetailMerge] {
        &self.merges
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn rule_for(&self, key: &str) -> Option<&VisibilityRule> {
        self.rules.iter().find(|rule| rule.field == key)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| field.required)
    }

    pub fn section_fields(&self, section: Section) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(move |field| field.section == section)
    }

    /// The admissions form as used at the CIS intake desk.
    pub fn standard() -> Self {
        use FieldDomain::{Date, Derived, Text};
        use Section::{Administrative, Health, Mobility, Personal, Social};

        let fields = vec![
            // Administrative
            choice("area", "ÁREA", Administrative, AREAS),
            field("area_other", "Especifique Área", Administrative, Text),
            choice(
                "gorcis_evaluation",
                "¿Requiere evaluación equipo GORCIS?",
                Administrative,
                GORCIS_OPTIONS,
            ),
            choice("priority", "PRIORIDAD", Administrative, PRIORITIES),
            field("supervisor", "SUPERVISOR/A", Administrative, Text),
            field("letter_number", "NÚMERO DE CARTA", Administrative, Text),
            // Personal
            required("last_name", "APELLIDO", Personal, Text),
            required("first_name", "NOMBRE", Personal, Text),
            field("nationality", "NACIONALIDAD", Personal, Text),
            choice(
                "document_type",
                "TIPO DE DOCUMENTO",
                Personal,
                DOCUMENT_TYPES,
            ),
            required("document_number", "NÚMERO DE IDENTIDAD", Personal, Text),
            field("birth_date", "FECHA NACIMIENTO", Personal, Date),
            field("age", "EDAD", Personal, Derived),
            choice(
                "has_entry_documents",
                "¿TIENE DOC. NECESARIA PARA INGRESO?",
                Personal,
                YES_NO,
            ),
            choice(
                "id_photo_sent",
                "FOTO DNI/TRÁMITE (Enviada a Wpp)",
                Personal,
                YES_NO,
            ),
            // Health
            choice("health_issue", "PROBLEMÁTICA DE SALUD", Health, NO_YES),
            choice("cud", "CUD", Health, CUD_OPTIONS),
            choice("self_sufficient", "AUTOVALIDEZ", Health, YES_NO),
            choice("low_bed_request", "SOLICITUD CAMA BAJA", Health, NO_YES),
            choice("can_climb_stairs", "APTO SUBIR ESCALERAS", Health, YES_NO),
            field(
                "medical_diagnosis",
                "DIAGNÓSTICO MÉDICO/PSIQUIÁTRICO",
                Health,
                Text,
            ),
            choice("takes_medication", "¿TOMA MEDICACIÓN?", Health, NO_YES),
            field("medication_name", "¿CUÁL MEDICACIÓN?", Health, Text),
            choice(
                "has_two_day_supply",
                "¿POSEE MEDICACIÓN PARA 2 DÍAS?",
                Health,
                YES_NO_NOT_REQUIRED,
            ),
            choice(
                "has_medication_schedule",
                "¿CUENTA CON ESQUEMA?",
                Health,
                YES_NO_NOT_REQUIRED,
            ),
            choice(
                "schedule_photo_sent",
                "FOTO DEL ESQUEMA (Enviada Wpp)",
                Health,
                YES_NO_NOT_REQUIRED,
            ),
            // Hygiene and mobility
            choice("uses_diapers", "¿USA PAÑALES?", Mobility, NO_YES),
            choice(
                "can_self_clean",
                "¿PUEDE HIGIENIZARSE SOLO?",
                Mobility,
                SELF_CLEAN_OPTIONS,
            ),
            choice(
                "has_mobility_aid",
                "¿INSTRUMENTO PARA MOVILIDAD?",
                Mobility,
                NO_YES,
            ),
            choice("mobility_aid", "¿CUÁL UTILIZA?", Mobility, MOBILITY_AIDS),
            choice(
                "cast_or_immobilized",
                "¿TIENE YESO O PARTE INMOVILIZADA?",
                Mobility,
                NO_YES,
            ),
            // Social and employment
            choice("time_on_street", "TIEMPO EN CALLE", Social, TIME_ON_STREET),
            choice("street_reason", "MOTIVO SIT. CALLE", Social, STREET_REASONS),
            choice("first_time_at_cis", "PRIMERA VEZ EN CIS", Social, YES_NO),
            choice(
                "employment_status",
                "SITUACIÓN LABORAL",
                Social,
                EMPLOYMENT_STATUSES,
            ),
            field(
                "job_description",
                "DE QUÉ TRABAJA (Rubro,
                horas,
                modalidad)",
                Social,
                Text,
            ),
            field(
                "case_summary",
                "DIAGNÓSTICO DEL OPERADOR Y RESUMEN DEL CASO",
                Social,
                Text,
            ),
        ];

        let rules = vec![
            VisibilityRule::when_equals(
                "gorcis_evaluation",
                "area",
                AREA_COMBAT_UNIT,
                NOT_APPLICABLE,
            ),
            VisibilityRule::when_equals("area_other", "area", AREA_OTHER, ""),
            VisibilityRule::when_equals("medication_name", "takes_medication", YES, NOT_APPLICABLE),
            VisibilityRule::when_equals(
                "has_two_day_supply",
                "takes_medication",
                YES,
                NOT_REQUIRED,
            ),
            VisibilityRule::when_equals(
                "has_medication_schedule",
                "takes_medication",
                YES,
                NOT_REQUIRED,
            ),
            VisibilityRule::when_equals(
                "schedule_photo_sent",
                "takes_medication",
                YES,
                NOT_REQUIRED,
            ),
            VisibilityRule::when_equals("can_self_clean", "uses_diapers", YES, "NO USA"),
            VisibilityRule::when_equals("mobility_aid", "has_mobility_aid", YES, "NINGUNO"),
            VisibilityRule::when_equals(
                "job_description",
                "employment_status",
                EMPLOYED,
                NOT_APPLICABLE,
            ),
        ];

        let merges = vec![DetailMerge {
            target: "area",
            trigger: AREA_OTHER,
            detail: "area_other",
        }];

        Self::new(fields, rules, merges)
    }
}

fn field(
    key: &'static str,
    label: &'static str,
    section: Section,
    domain: FieldDomain,
) -> Field {
    Field {
        key,
        label,
        section,
        domain,
        required: false,
    }
}

fn required(
    key: &'static str,
    label: &'static str,
    section: Section,
    domain: FieldDomain,
) -> Field {
    Field {
        required: true,
        ..field(key, label, section, domain)
    }
}

fn choice(
    key: &'static str,
    label: &'static str,
    section: Section,
    options: &'static [&'static str],
) -> Field {
    field(key, label, section, FieldDomain::Choice { options })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn standard_catalog_keys_are_unique() {
        let catalog = FieldCatalog::standard();
        let keys: HashSet<_> = catalog.fields().iter().map(|field| field.key).collect();
        assert_eq!(keys.len(), catalog.fields().len());
    }

    #[test]
    fn rules_only_reference_earlier_fields() {
        let catalog = FieldCatalog::standard();
        let position = |key: &str| {
            catalog
                .fields()
                .iter()
                .position(|field| field.key == key)
                .unwrap_or_else(|| panic!("{key} missing from catalog"))
        };

        for rule in catalog.rules() {
            let controller = rule.predicate.controller().expect("rule has a controller");
            assert!(
                position(controller) < position(rule.field),
                "{} must come after {}",
                rule.field,
                controller
            );
        }
    }

    #[test]
    fn required_fields_are_names_and_document_number() {
        let catalog = FieldCatalog::standard();
        let required: Vec<_> = catalog.required_fields().map(|field| field.key).collect();
        assert_eq!(required, vec!["last_name", "first_name", "document_number"]);
    }

    #[test]
    fn detail_merge_only_fires_on_trigger() {
        let merge = DetailMerge {
            target: "area",
            trigger: AREA_OTHER,
            detail: "area_other",
        };
        assert_eq!(
            merge.apply("Otro", "Parador Retiro").as_deref(),
            Some("Otro: Parador Retiro")
        );
        assert!(merge.apply("SUBTE", "Parador Retiro").is_none());
    }

    #[test]
    fn every_section_has_fields() {
        let catalog = FieldCatalog::standard();
        for section in Section::ordered() {
            assert!(catalog.section_fields(section).next().is_some());
        }
    }
}
