use crate::infra::open_service;
use chrono::{Local, NaiveDate};
use cis_intake::config::AppConfig;
use cis_intake::error::AppError;
use cis_intake::intake::{
    age_on, FieldCatalog, FormState, FormView, RecordSchema, RecordSink, SubmissionError,
};
use cis_intake::telemetry;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// JSON object of field keys to answers
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// Validate and print the assembled row without appending it
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AgeArgs {
    /// Birth date (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) birth_date: NaiveDate,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_form_schema() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let view = FormView::build(
        &FieldCatalog::standard(),
        &RecordSchema::standard(),
        config.access.passphrase.is_some(),
    );
    print_json(&view)
}

pub(crate) async fn run_form_header() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = open_service(&config.sink).await?;

    println!("Columns for {}:", service.sink().describe());
    for (index, header) in service.schema().headers().iter().enumerate() {
        println!("  {:>2}. {}", index + 1, header);
    }
    Ok(())
}

pub(crate) async fn run_form_submit(args: SubmitArgs) -> Result<(), AppError> {
    let SubmitArgs { file, dry_run } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let raw = std::fs::read_to_string(&file)?;
    let state: FormState = serde_json::from_str(&raw).map_err(std::io::Error::from)?;

    let service = Arc::new(open_service(&config.sink).await?);
    let submitted_at = Local::now().naive_local();

    if dry_run {
        let prepared = service
            .prepare(&state, submitted_at)
            .map_err(SubmissionError::from)?;
        println!("Ficha de {} lista para guardar:", prepared.display_name);
        for (header, cell) in service
            .schema()
            .headers()
            .iter()
            .zip(prepared.record.cells())
        {
            println!("  {header}: {cell}");
        }
        for warning in &prepared.warnings {
            println!("Aviso: {}", warning.message());
        }
        return Ok(());
    }

    let receipt = tokio::task::spawn_blocking(move || service.submit(&state, submitted_at))
        .await
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))??;

    for warning in &receipt.warnings {
        println!("Aviso: {}", warning.message());
    }
    println!("{}", receipt.message);
    Ok(())
}

pub(crate) fn run_age(args: AgeArgs) {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    println!("{}", age_on(Some(args.birth_date), today));
}
