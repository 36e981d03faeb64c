use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{RecordSink, SinkError};
use crate::intake::record::Record;

/// Local CSV file. Created with the header row on first append, appended to
/// without a header afterwards. Rows must be as wide as the file's header.
#[derive(Debug)]
pub struct CsvFileSink {
    path: PathBuf,
    header: Vec<String>,
    write_lock: Mutex<()>,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>, header: Vec<String>) -> Self {
        Self {
            path: path.into(),
            header,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn has_rows(&self) -> Result<bool, SinkError> {
        match fs::metadata(&self.path) {
            Ok(metadata) => Ok(metadata.len() > 0),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

impl RecordSink for CsvFileSink {
    fn header(&self) -> Result<Option<Vec<String>>, SinkError> {
        if !self.has_rows()? {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        match reader.records().next() {
            Some(row) => Ok(Some(row?.iter().map(str::to_string).collect())),
            None => Ok(None),
        }
    }

    fn append(&self, record: &Record) -> Result<(), SinkError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SinkError::Write("csv writer lock poisoned".to_string()))?;

        let existing = self.header()?;
        let expected = existing.as_ref().map_or(self.header.len(), Vec::len);
        if record.len() != expected {
            return Err(SinkError::Write(format!(
                "record has {} cells but the file layout has {expected} columns",
                record.len()
            )));
        }

        let write_header = existing.is_none();
        if write_header {
            if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(&self.header)?;
        }
        writer.write_record(record.cells())?;
        writer.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("cis-intake-{}", uuid::Uuid::new_v4()))
            .join("fichas.csv")
    }

    fn header() -> Vec<String> {
        vec!["APELLIDO".to_string(), "NOMBRE".to_string()]
    }

    fn row(last: &str, first: &str) -> Record {
        Record::from(vec![last.to_string(), first.to_string()])
    }

    #[test]
    fn creates_file_with_header_then_appends_rows() {
        let path = scratch_path();
        let sink = CsvFileSink::new(&path, header());
        assert!(sink.header().expect("reads").is_none());

        sink.append(&row("Pérez", "Ana")).expect("first append");
        sink.append(&row("Gómez", "Luis, \"Lucho\"")).expect("second append");

        let contents = fs::read_to_string(&path).expect("file exists");
        assert_eq!(
            contents,
            "APELLIDO,NOMBRE\nPérez,Ana\nGómez,\"Luis, \"\"Lucho\"\"\"\n"
        );
        assert_eq!(sink.header().expect("reads"), Some(header()));

        let _ = fs::remove_dir_all(path.parent().expect("scratch dir"));
    }

    #[test]
    fn existing_file_is_not_given_a_second_header() {
        let path = scratch_path();
        fs::create_dir_all(path.parent().expect("scratch dir")).expect("mkdir");
        fs::write(&path, "APELLIDO,NOMBRE\nRuiz,Marta\n").expect("seed file");

        let sink = CsvFileSink::new(&path, header());
        sink.append(&row("Pérez", "Ana")).expect("append");

        let contents = fs::read_to_string(&path).expect("file exists");
        assert_eq!(contents.matches("APELLIDO").count(), 1);
        assert!(contents.ends_with("Pérez,Ana\n"));

        let _ = fs::remove_dir_all(path.parent().expect("scratch dir"));
    }

    #[test]
    fn rejects_rows_that_do_not_fit_the_layout() {
        let path = scratch_path();
        let sink = CsvFileSink::new(&path, header());
        let error = sink
            .append(&Record::from(vec!["solo".to_string()]))
            .expect_err("width mismatch");
        assert!(matches!(error, SinkError::Write(_)));
        assert!(!path.exists());
    }
}
