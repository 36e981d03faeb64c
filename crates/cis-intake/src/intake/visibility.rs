use std::collections::BTreeMap;

use serde::Serialize;

/// Condition over previously resolved answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Always,
    Equals {
        field: &'static str,
        value: &'static str,
    },
}

impl Predicate {
    pub fn evaluate(&self, resolved: &BTreeMap<&'static str, String>) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Equals { field, value } => resolved
                .get(field)
                .map(|current| current == value)
                .unwrap_or(false),
        }
    }

    /// Field whose answer drives this predicate, if any.
    pub fn controller(&self) -> Option<&'static str> {
        match self {
            Predicate::Always => None,
            Predicate::Equals { field, .. } => Some(field),
        }
    }
}

/// One row of the reveal table: `field` is collected only while `predicate`
/// holds, otherwise it resolves to `hidden_default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibilityRule {
    pub field: &'static str,
    pub predicate: Predicate,
    pub hidden_default: &'static str,
}

impl VisibilityRule {
    pub const fn when_equals(
        field: &'static str,
        controller: &'static str,
        value: &'static str,
        hidden_default: &'static str,
    ) -> Self {
        Self {
            field,
            predicate: Predicate::Equals {
                field: controller,
                value,
            },
            hidden_default,
        }
    }

    pub fn is_visible(&self, resolved: &BTreeMap<&'static str, String>) -> bool {
        self.predicate.evaluate(resolved)
    }
}

/// Outcome of checking one field against the reveal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden { default: &'static str },
}

pub fn resolve_visibility(
    rule: Option<&VisibilityRule>,
    resolved: &BTreeMap<&'static str, String>,
) -> Visibility {
    match rule {
        Some(rule) if !rule.is_visible(resolved) => Visibility::Hidden {
            default: rule.hidden_default,
        },
        _ => Visibility::Shown,
    }
}
