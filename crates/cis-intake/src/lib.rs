//! Intake form catalog, record assembly, and append-only sinks for the CIS
//! admissions desk ("Ficha de Ingreso CIS").

pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
