use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::table::{TableSource, table_to_csv};

pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8;";
pub const DEFAULT_EXPORT_FILENAME: &str = "export.csv";

/// A file ready to be handed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl Download {
    pub fn csv(filename: impl Into<String>, text: String) -> Self {
        Self {
            filename: filename.into(),
            mime_type: CSV_MIME_TYPE.to_string(),
            content: text.into_bytes(),
        }
    }
}

/// The capability to deliver a download. Returns where the file ended up.
pub trait DownloadSink {
    fn deliver(&self, download: &Download) -> io::Result<PathBuf>;
}

/// Delivers downloads as files inside one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, download: &Download) -> io::Result<PathBuf> {
        // Only the last path component is honoured, never a path outside `dir`.
        let name = Path::new(&download.filename).file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable file name {:?}", download.filename),
            )
        })?;
        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(name);
        fs::write(&target, &download.content)?;
        Ok(target)
    }
}

/// Explicit export trigger bound to one table view.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBinding {
    pub table_id: String,
    pub filename: Option<String>,
}

impl ExportBinding {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn trigger(
        &self,
        source: &impl TableSource,
        sink: Option<&dyn DownloadSink>,
    ) -> Option<PathBuf> {
        export_table_to_csv(source, &self.table_id, self.filename.as_deref(), sink)
    }
}

/// Export the identified table as a CSV download.
///
/// A missing table, a missing sink or a failed delivery all end as a silent
/// no-op (`None`), only visible in the logs.
pub fn export_table_to_csv(
    source: &impl TableSource,
    table_id: &str,
    filename: Option<&str>,
    sink: Option<&dyn DownloadSink>,
) -> Option<PathBuf> {
    let Some(table) = source.table(table_id) else {
        debug!("No table {table_id:?}, nothing to export");
        return None;
    };
    let Some(sink) = sink else {
        debug!("No download sink available, skipping export of {table_id:?}");
        return None;
    };

    if table.is_empty() {
        debug!("Table {table_id:?} has no rows, exporting an empty file");
    }
    let filename = filename.unwrap_or(DEFAULT_EXPORT_FILENAME);
    let download = Download::csv(filename, table_to_csv(&table));
    match sink.deliver(&download) {
        Ok(path) => {
            info!("Exported table {table_id:?} ({} rows) to {path:?}", table.len());
            Some(path)
        }
        Err(e) => {
            warn!("Export of table {table_id:?} failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingSink {
        delivered: RefCell<Vec<Download>>,
    }

    impl DownloadSink for RecordingSink {
        fn deliver(&self, download: &Download) -> io::Result<PathBuf> {
            self.delivered.borrow_mut().push(download.clone());
            Ok(PathBuf::from(&download.filename))
        }
    }

    fn tables() -> HashMap<String, Table> {
        let mut tables = HashMap::new();
        tables.insert(
            "contacts".to_string(),
            Table::new(vec![
                vec!["a".into(), "b".into()],
                vec!["c,d".into(), "e\"f".into()],
            ]),
        );
        tables
    }

    #[test]
    fn exports_with_default_filename() {
        let sink = RecordingSink::default();
        let path = export_table_to_csv(&tables(), "contacts", None, Some(&sink));
        assert_eq!(path, Some(PathBuf::from("export.csv")));

        let delivered = sink.delivered.borrow();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].filename, "export.csv");
        assert_eq!(delivered[0].mime_type, "text/csv;charset=utf-8;");
        assert_eq!(delivered[0].content, b"a,b\n\"c,d\",\"e\"\"f\"".to_vec());
    }

    #[test]
    fn unknown_table_is_a_no_op() {
        let sink = RecordingSink::default();
        assert_eq!(export_table_to_csv(&tables(), "nope", Some("x.csv"), Some(&sink)), None);
        assert!(sink.delivered.borrow().is_empty());
    }

    #[test]
    fn missing_sink_is_a_no_op() {
        assert_eq!(export_table_to_csv(&tables(), "contacts", None, None), None);
    }

    #[test]
    fn binding_carries_filename() {
        let sink = RecordingSink::default();
        let binding = ExportBinding::new("contacts").with_filename("people.csv");
        assert_eq!(binding.trigger(&tables(), Some(&sink)), Some(PathBuf::from("people.csv")));
    }

    #[test]
    fn directory_sink_writes_file() {
        let dir = tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("downloads"));
        let path = export_table_to_csv(&tables(), "contacts", Some("out.csv"), Some(&sink)).unwrap();
        assert_eq!(path, dir.path().join("downloads").join("out.csv"));
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "a,b\n\"c,d\",\"e\"\"f\"");
    }

    #[test]
    fn directory_sink_strips_directories() {
        let dir = tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let path = export_table_to_csv(&tables(), "contacts", Some("../../evil.csv"), Some(&sink));
        assert_eq!(path, Some(dir.path().join("evil.csv")));
    }

    #[test]
    fn directory_sink_failure_is_silent() {
        let dir = tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        assert_eq!(export_table_to_csv(&tables(), "contacts", Some(".."), Some(&sink)), None);
    }
}
