use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use cis_intake::intake::{
    CsvFileSink, FieldCatalog, FormState, IntakeService, RecordSchema, RecordSink,
};

fn scratch_csv() -> PathBuf {
    std::env::temp_dir()
        .join(format!("cis-intake-it-{}", uuid::Uuid::new_v4()))
        .join("fichas_ingreso.csv")
}

fn submitted_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 2)
        .and_then(|date| date.and_hms_opt(9, 5, 0))
        .expect("valid timestamp")
}

fn read_rows(path: &PathBuf) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("csv opens")
        .records()
        .map(|row| row.expect("row parses").iter().map(str::to_string).collect())
        .collect()
}

fn cell<'a>(header: &[String], row: &'a [String], column: &str) -> &'a str {
    let index = header
        .iter()
        .position(|name| name == column)
        .unwrap_or_else(|| panic!("column {column} present"));
    &row[index]
}

#[test]
fn fresh_csv_receives_standard_header_and_first_row() {
    let path = scratch_csv();
    let schema = RecordSchema::standard();
    let sink = Arc::new(CsvFileSink::new(&path, schema.headers()));
    let service = IntakeService::aligned(FieldCatalog::standard(), schema, sink)
        .unwrap_or_else(|err| panic!("service builds: {err}"));

    let state = FormState::new()
        .with("area", "DIPA COMBATE")
        .with("gorcis_evaluation", "SI")
        .with("last_name", "Sosa")
        .with("first_name", "Ramón")
        .with("document_number", "18223904")
        .with("birth_date", "1961-06-03")
        .with("has_mobility_aid", "SI")
        .with("mobility_aid", "SILLA DE RUEDAS");

    let receipt = service.submit(&state, submitted_at()).expect("submission stored");
    assert_eq!(receipt.message, "¡Ficha de Ramón Sosa guardada correctamente!");
    assert!(receipt.warnings.is_empty());

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 2);
    let (header, row) = (&rows[0], &rows[1]);
    assert_eq!(header.len(), 38);
    assert_eq!(cell(header, row, "MARCA TEMPORAL"), "02/06/2025 09:05:00");
    assert_eq!(cell(header, row, "FECHA NACIMIENTO"), "03/06/1961");
    assert_eq!(cell(header, row, "EDAD"), "63");
    assert_eq!(cell(header, row, "CUÁL INSTRUMENTO"), "SILLA DE RUEDAS");
    assert_eq!(cell(header, row, "CUÁL MEDICACIÓN"), "NO APLICA");
    assert_eq!(cell(header, row, "N° LEGAJO"), "");

    let _ = fs::remove_dir_all(path.parent().expect("scratch dir"));
}

#[test]
fn existing_sheet_export_keeps_its_column_order() {
    let path = scratch_csv();
    fs::create_dir_all(path.parent().expect("scratch dir")).expect("mkdir");

    let mut existing = RecordSchema::standard().headers();
    existing.reverse();
    existing.push("OBSERVACIONES".to_string());
    let mut writer = csv::Writer::from_path(&path).expect("seed writer");
    writer.write_record(&existing).expect("seed header");
    writer.flush().expect("flush");
    drop(writer);

    let sink = Arc::new(CsvFileSink::new(&path, RecordSchema::standard().headers()));
    assert_eq!(sink.header().expect("reads header"), Some(existing.clone()));

    let service = IntakeService::aligned(
        FieldCatalog::standard(),
        RecordSchema::standard(),
        Arc::clone(&sink),
    )
    .unwrap_or_else(|err| panic!("service aligns: {err}"));

    let state = FormState::new()
        .with("last_name", "Pérez")
        .with("first_name", "Ana")
        .with("document_number", "30451327");
    service.submit(&state, submitted_at()).expect("submission stored");

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 2);
    let (header, row) = (&rows[0], &rows[1]);
    assert_eq!(row.len(), existing.len());
    assert_eq!(row[0], "");
    assert_eq!(cell(header, row, "NOMBRE"), "Ana");
    assert_eq!(cell(header, row, "APELLIDO"), "Pérez");
    assert_eq!(cell(header, row, "OBSERVACIONES"), "");
    assert_eq!(row.last().map(String::as_str), Some(""));

    let _ = fs::remove_dir_all(path.parent().expect("scratch dir"));
}
