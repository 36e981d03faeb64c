use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::age::age_on;
use super::catalog::{FieldCatalog, FieldDomain, Section};
use super::schema::RecordSchema;
use super::service::{IntakeService, SubmissionError};
use super::session::{AccessError, SessionRegistry, SESSION_HEADER};
use super::sink::RecordSink;
use super::state::{parse_date, FormState};
use super::visibility::Predicate;

/// Router state: the intake pipeline and the session registry guarding it.
pub struct IntakeState<S> {
    pub service: Arc<IntakeService<S>>,
    pub sessions: Arc<SessionRegistry>,
}

impl<S> Clone for IntakeState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// HTTP endpoints for the intake form.
pub fn intake_router<S>(service: Arc<IntakeService<S>>, sessions: Arc<SessionRegistry>) -> Router
where
    S: RecordSink + 'static,
{
    Router::new()
        .route("/api/v1/intake/form", get(form_handler::<S>))
        .route(
            "/api/v1/intake/session",
            post(login_handler::<S>).delete(logout_handler::<S>),
        )
        .route("/api/v1/intake/submissions", post(submit_handler::<S>))
        .route("/api/v1/intake/age", get(age_handler::<S>))
        .with_state(IntakeState { service, sessions })
}

#[derive(Debug, Serialize)]
pub struct FormView {
    /// Whether a passphrase login is required before submitting.
    pub gated: bool,
    pub sections: Vec<SectionView>,
    pub columns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SectionView {
    pub key: Section,
    pub label: &'static str,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Serialize)]
pub struct FieldView {
    pub key: &'static str,
    pub label: &'static str,
    pub domain: FieldDomain,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Predicate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_default: Option<&'static str>,
}

impl FormView {
    pub fn build(catalog: &FieldCatalog, schema: &RecordSchema, gated: bool) -> Self {
        let sections = Section::ordered()
            .into_iter()
            .map(|section| SectionView {
                key: section,
                label: section.label(),
                fields: catalog
                    .section_fields(section)
                    .map(|field| {
                        let rule = catalog.rule_for(field.key);
                        FieldView {
                            key: field.key,
                            label: field.label,
                            domain: field.domain,
                            required: field.required,
                            visible_when: rule.map(|rule| rule.predicate),
                            hidden_default: rule.map(|rule| rule.hidden_default),
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            gated,
            sections,
            columns: schema.headers(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub passphrase: String,
}

#[derive(Debug, Deserialize)]
pub struct AgeQuery {
    pub birth_date: Option<String>,
    pub today: Option<String>,
}

fn presented_session(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
}

fn access_denied(err: AccessError) -> Response {
    let status = match err {
        AccessError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        AccessError::WrongPassphrase | AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

pub(crate) async fn form_handler<S>(
    State(state): State<IntakeState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordSink + 'static,
{
    if let Err(err) = state.sessions.authorize(presented_session(&headers)) {
        return access_denied(err);
    }

    let view = FormView::build(
        state.service.catalog(),
        state.service.schema(),
        state.sessions.is_gated(),
    );
    (StatusCode::OK, Json(view)).into_response()
}

pub(crate) async fn login_handler<S>(
    State(state): State<IntakeState<S>>,
    Json(request): Json<LoginRequest>,
) -> Response
where
    S: RecordSink + 'static,
{
    match state.sessions.login(&request.passphrase) {
        Ok(session_id) => (
            StatusCode::CREATED,
            Json(json!({ "session_id": session_id })),
        )
            .into_response(),
        Err(err) => access_denied(err),
    }
}

pub(crate) async fn logout_handler<S>(
    State(state): State<IntakeState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordSink + 'static,
{
    let session = match state.sessions.authorize(presented_session(&headers)) {
        Ok(context) => context.session,
        Err(err) => return access_denied(err),
    };

    if let Some(id) = session {
        if let Err(err) = state.sessions.logout(id) {
            return access_denied(err);
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) async fn submit_handler<S>(
    State(state): State<IntakeState<S>>,
    headers: HeaderMap,
    Json(form): Json<FormState>,
) -> Response
where
    S: RecordSink + 'static,
{
    if let Err(err) = state.sessions.authorize(presented_session(&headers)) {
        return access_denied(err);
    }

    let service = Arc::clone(&state.service);
    let submitted_at = Local::now().naive_local();
    let outcome =
        tokio::task::spawn_blocking(move || service.submit(&form, submitted_at)).await;

    match outcome {
        Ok(Ok(receipt)) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Ok(Err(SubmissionError::Validation(err))) => {
            let payload = json!({
                "error": err.to_string(),
                "fields": err.fields(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Ok(Err(SubmissionError::Sink(err))) => {
            let status = if err.is_connection() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let payload = json!({
                "error": err.to_string(),
                "retryable": true,
            });
            (status, Json(payload)).into_response()
        }
        Err(join_error) => {
            error!(error = %join_error, "submission task failed");
            let payload = json!({ "error": "submission task failed" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn age_handler<S>(
    State(state): State<IntakeState<S>>,
    headers: HeaderMap,
    Query(query): Query<AgeQuery>,
) -> Response
where
    S: RecordSink + 'static,
{
    if let Err(err) = state.sessions.authorize(presented_session(&headers)) {
        return access_denied(err);
    }

    let parse = |raw: Option<String>, name: &str| -> Result<Option<NaiveDate>, Response> {
        match raw.filter(|value| !value.trim().is_empty()) {
            None => Ok(None),
            Some(value) => parse_date(&value).map(Some).ok_or_else(|| {
                let payload = json!({ "error": format!("'{value}' is not a valid {name}") });
                (StatusCode::BAD_REQUEST, Json(payload)).into_response()
            }),
        }
    };

    let birth_date = match parse(query.birth_date, "birth_date") {
        Ok(date) => date,
        Err(response) => return response,
    };
    let today = match parse(query.today, "today") {
        Ok(date) => date.unwrap_or_else(|| Local::now().date_naive()),
        Err(response) => return response,
    };

    let age = age_on(birth_date, today);
    (StatusCode::OK, Json(json!({ "age": age, "today": today }))).into_response()
}
