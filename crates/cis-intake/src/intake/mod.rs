//! CIS admissions intake: field catalog, reveal rules, record assembly and sinks.
//!
//! A submission flows `FormState` → [`ResolvedForm`] → validation → [`Record`]
//! → [`RecordSink`]. Every stage before the sink is pure.

pub mod age;
pub mod catalog;
pub mod record;
pub mod router;
pub mod schema;
pub mod service;
pub mod session;
pub mod sink;
pub mod state;
pub mod validation;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use age::age_on;
pub use catalog::{DetailMerge, Field, FieldCatalog, FieldDomain, Section};
pub use record::{assemble, Record};
pub use router::{intake_router, FormView, IntakeState};
pub use schema::{Column, ColumnSource, RecordSchema, SchemaMismatch};
pub use service::{
    IntakeService, IntakeSetupError, PreparedSubmission, SubmissionError, SubmissionReceipt,
};
pub use session::{AccessError, SessionContext, SessionId, SessionRegistry, SESSION_HEADER};
pub use sink::{CsvFileSink, GoogleSheetsSink, RecordSink, SinkError};
pub use state::{FormState, ResolvedForm};
pub use validation::{AdvisoryWarning, SubmissionValidator, ValidationError};
pub use visibility::{Predicate, VisibilityRule};
