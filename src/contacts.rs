use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDateTime;
use polars::prelude::*;
use rayon::prelude::*;
use rust_xlsxwriter::{Workbook, XlsxError};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, trace};

use crate::domain::ContabError;
use crate::table::{Row, Table};

pub const HEADER_FIRST_NAME: &str = "имя";
pub const HEADER_LAST_NAME: &str = "фамилия";
pub const HEADER_SECOND_NAME: &str = "отчество";
pub const HEADER_PHONE: &str = "номер телефона";
pub const HEADER_EMAIL: &str = "почта";
pub const HEADER_COMPANY: &str = "компания";
const HEADER_COMPANY_CAPITALIZED: &str = "Компания";

pub const CONTACT_HEADERS: [&str; 6] = [
    HEADER_FIRST_NAME,
    HEADER_LAST_NAME,
    HEADER_SECOND_NAME,
    HEADER_PHONE,
    HEADER_EMAIL,
    HEADER_COMPANY,
];

const XLSX_SHEET_NAME: &str = "Контакты";

/// One parsed line of a contact file: header -> value.
pub type RawRecord = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    pub const SUPPORTED: [FileFormat; 2] = [FileFormat::Csv, FileFormat::Xlsx];

    pub fn from_extension(ext: &str) -> Result<Self, ContabError> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            _ => Err(ContabError::UnknownFileType(format!(".{ext}"))),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ContabError> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
        FileFormat::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => ".csv",
            FileFormat::Xlsx => ".xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv",
            FileFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Comma separated list of the supported extensions, e.g. `.csv, .xlsx`.
    pub fn supported_list() -> String {
        Self::SUPPORTED
            .iter()
            .map(|f| f.extension())
            .collect::<Vec<&str>>()
            .join(", ")
    }

    pub fn read(&self, path: &Path) -> Result<Vec<RawRecord>, ContabError> {
        let start_time = Instant::now();
        let records = match self {
            FileFormat::Csv => read_csv(path),
            FileFormat::Xlsx => read_xlsx(path),
        }
        .inspect_err(|e| error!("Failed to read {path:?}: {e}"))?;
        info!(
            "Read {} records from {path:?} in {}ms",
            records.len(),
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }

    pub fn write(&self, contacts: &[Contact]) -> Result<Vec<u8>, ContabError> {
        match self {
            FileFormat::Csv => Ok(write_csv(contacts)),
            FileFormat::Xlsx => write_xlsx(contacts),
        }
    }
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_format: FileFormat,
}

impl FileInfo {
    /// Size of a regular file, with missing and unreadable files mapped to their own errors.
    pub fn file_size(path: &Path) -> Result<u64, ContabError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ContabError::FileNotFound,
            ErrorKind::PermissionDenied => ContabError::PermissionDenied,
            _ => ContabError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(ContabError::LoadingFailed("Not a file!".into()));
        }
        Ok(metadata.len())
    }
}

fn read_csv(path: &Path) -> Result<Vec<RawRecord>, ContabError> {
    // polars refuses a zero byte file, which simply holds no contacts.
    if fs::metadata(path)?.len() == 0 {
        debug!("{path:?} is empty");
        return Ok(Vec::new());
    }

    // Schema inference is disabled so every column arrives as a string.
    let df = LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;

    // Each column is converted in its own thread.
    let names = df.get_column_names();
    let columns: Result<Vec<(String, Vec<String>)>, PolarsError> = names
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    let records = (0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|(name, data)| (name.clone(), data[row].clone()))
                .collect::<RawRecord>()
        })
        .collect();
    Ok(records)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<(String, Vec<String>), PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let data = series
        .into_iter()
        .map(|value| value.map(|s| s.trim().to_string()).unwrap_or_default())
        .collect();
    trace!("Loaded column {col_name:?}");
    Ok((col_name.trim().to_string(), data))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        other => {
            let text = other.to_string().trim().to_string();
            (!text.is_empty()).then_some(text)
        }
    }
}

fn read_xlsx(path: &Path) -> Result<Vec<RawRecord>, ContabError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ContabError::LoadingFailed("No worksheet found".into()))??;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first) => first.iter().map_while(cell_text).collect(),
        None => return Ok(Vec::new()),
    };
    debug!("XLSX headers: {headers:?}");

    let mut records = Vec::new();
    for row in rows {
        let record: RawRecord = row
            .iter()
            .zip(headers.iter())
            .filter_map(|(cell, header)| cell_text(cell).map(|v| (header.clone(), v)))
            .collect();
        if !record.is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}

// Contact files also quote line breaks, table exports do not.
fn escape_field(field: &str) -> String {
    let escaped = field.replace('"', "\"\"");
    if escaped.contains([',', '"', '\n', '\r']) {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

fn csv_line(fields: &[String]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<String>>()
        .join(",");
    line.push_str("\r\n");
    line
}

fn write_csv(contacts: &[Contact]) -> Vec<u8> {
    if contacts.is_empty() {
        return Vec::new();
    }
    let header: Row = CONTACT_HEADERS.iter().map(|h| h.to_string()).collect();
    let mut out = csv_line(&header);
    for contact in contacts {
        out.push_str(&csv_line(&contact.to_row()));
    }
    out.into_bytes()
}

/// Worksheet coordinates for a zero based row and column.
fn cell_index(row: usize, col: usize) -> Result<(u32, u16), XlsxError> {
    let row = u32::try_from(row).map_err(|_| XlsxError::RowColumnLimitError)?;
    let col = u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)?;
    Ok((row, col))
}

fn write_xlsx(contacts: &[Contact]) -> Result<Vec<u8>, ContabError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(XLSX_SHEET_NAME)?;

    for (idx, header) in CONTACT_HEADERS.iter().enumerate() {
        let (row, col) = cell_index(0, idx)?;
        worksheet.write_string(row, col, *header)?;
    }
    for (idx, contact) in contacts.iter().enumerate() {
        for (col_idx, value) in contact.to_row().iter().enumerate() {
            let (row, col) = cell_index(idx + 1, col_idx)?;
            worksheet.write_string(row, col, value)?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub second_name: String,
    pub phone: String,
    pub email: String,
    pub company: String,
    pub created: NaiveDateTime,
}

impl Contact {
    fn from_record(record: &RawRecord, created: NaiveDateTime) -> Self {
        let field = |key: &str| record.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let mut company = field(HEADER_COMPANY);
        if company.is_empty() {
            company = field(HEADER_COMPANY_CAPITALIZED);
        }
        Contact {
            first_name: field(HEADER_FIRST_NAME),
            last_name: field(HEADER_LAST_NAME),
            second_name: field(HEADER_SECOND_NAME),
            phone: field(HEADER_PHONE),
            email: field(HEADER_EMAIL),
            company,
            created,
        }
    }

    pub fn has_name(&self) -> bool {
        !(self.first_name.is_empty() && self.last_name.is_empty() && self.second_name.is_empty())
    }

    /// Cells in `CONTACT_HEADERS` order.
    pub fn to_row(&self) -> Row {
        vec![
            self.first_name.clone(),
            self.last_name.clone(),
            self.second_name.clone(),
            self.phone.clone(),
            self.email.clone(),
            self.company.clone(),
        ]
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ContactStats {
    pub total: usize,
    pub with_phone: usize,
    pub with_email: usize,
    pub with_company: usize,
    pub companies: usize,
}

impl ContactStats {
    pub fn to_table(&self) -> Table {
        let row = |label: &str, value: usize| vec![label.to_string(), value.to_string()];
        Table::with_header(
            ["показатель", "значение"],
            vec![
                row("всего контактов", self.total),
                row("с телефоном", self.with_phone),
                row("с почтой", self.with_email),
                row("с компанией", self.with_company),
                row("компаний", self.companies),
            ],
        )
    }
}

/// In-memory store of imported contacts, oldest first.
#[derive(Debug, Default)]
pub struct ContactBook {
    contacts: Vec<Contact>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    #[cfg(test)]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn import(&mut self, records: &[RawRecord], now: NaiveDateTime) -> ImportReport {
        let mut report = ImportReport {
            total: records.len(),
            ..Default::default()
        };
        for (idx, record) in records.iter().enumerate() {
            let contact = Contact::from_record(record, now);
            if contact.has_name() {
                self.contacts.push(contact);
                report.success += 1;
            } else {
                report.failed += 1;
                report.errors.push(format!(
                    "Не удалось импортировать контакт номер {}: пустое имя",
                    idx + 1
                ));
            }
        }
        info!(
            "Import finished: {} total, {} imported, {} failed",
            report.total, report.success, report.failed
        );
        report
    }

    /// Contacts created within the inclusive range, newest first.
    pub fn export(&self, from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> Vec<Contact> {
        let mut selected: Vec<Contact> = self
            .contacts
            .iter()
            .filter(|c| from.is_none_or(|f| c.created >= f))
            .filter(|c| to.is_none_or(|t| c.created <= t))
            .cloned()
            .collect();
        // Ties keep the most recently imported contact first.
        selected.reverse();
        selected.sort_by(|a, b| b.created.cmp(&a.created));
        debug!("Selected {} of {} contacts for export", selected.len(), self.len());
        selected
    }

    pub fn delete_all(&mut self) -> usize {
        let removed = self.contacts.len();
        self.contacts.clear();
        info!("Deleted {removed} contacts");
        removed
    }

    pub fn stats(&self) -> ContactStats {
        let companies: BTreeSet<&str> = self
            .contacts
            .iter()
            .filter(|c| !c.company.is_empty())
            .map(|c| c.company.as_str())
            .collect();
        ContactStats {
            total: self.contacts.len(),
            with_phone: self.contacts.iter().filter(|c| !c.phone.is_empty()).count(),
            with_email: self.contacts.iter().filter(|c| !c.email.is_empty()).count(),
            with_company: self.contacts.iter().filter(|c| !c.company.is_empty()).count(),
            companies: companies.len(),
        }
    }

    pub fn to_table(&self) -> Table {
        Table::with_header(
            CONTACT_HEADERS,
            self.contacts.iter().map(Contact::to_row).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(FileFormat::from_extension(".CSV").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_extension("xlsx").unwrap(), FileFormat::Xlsx);
        assert!(matches!(
            FileFormat::from_extension(".txt"),
            Err(ContabError::UnknownFileType(ext)) if ext == ".txt"
        ));
        assert_eq!(FileFormat::supported_list(), ".csv, .xlsx");
        assert_eq!(FileFormat::Csv.mime_type(), "text/csv");
    }

    #[test]
    fn import_reports_nameless_rows() {
        let mut book = ContactBook::new();
        let records = vec![
            record(&[("имя", " Иван "), ("фамилия", "Петров"), ("компания", "Рога и копыта")]),
            record(&[("почта", "ghost@example.com")]),
            record(&[("отчество", "Сергеевич"), ("Компания", "ООО Ромашка")]),
        ];
        let report = book.import(&records, at(1, 10));

        assert_eq!(report.total, 3);
        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.errors,
            vec!["Не удалось импортировать контакт номер 2: пустое имя".to_string()]
        );
        assert_eq!(book.contacts()[0].first_name, "Иван");
        assert_eq!(book.contacts()[1].company, "ООО Ромашка");
    }

    #[test]
    fn export_filters_by_creation_date_newest_first() {
        let mut book = ContactBook::new();
        book.import(&[record(&[("имя", "old")])], at(1, 0));
        book.import(&[record(&[("имя", "mid")])], at(5, 0));
        book.import(&[record(&[("имя", "new")])], at(9, 0));

        let all: Vec<String> = book.export(None, None).into_iter().map(|c| c.first_name).collect();
        assert_eq!(all, vec!["new", "mid", "old"]);

        let ranged: Vec<String> = book
            .export(Some(at(5, 0)), Some(at(9, 0)))
            .into_iter()
            .map(|c| c.first_name)
            .collect();
        assert_eq!(ranged, vec!["new", "mid"]);

        assert!(book.export(Some(at(10, 0)), None).is_empty());
    }

    #[test]
    fn stats_count_filled_fields() {
        let mut book = ContactBook::new();
        book.import(
            &[
                record(&[("имя", "a"), ("номер телефона", "+7 900"), ("компания", "X")]),
                record(&[("имя", "b"), ("почта", "b@x.ru"), ("компания", "X")]),
                record(&[("имя", "c"), ("компания", "Y")]),
            ],
            at(1, 0),
        );
        let stats = book.stats();
        assert_eq!(
            stats,
            ContactStats {
                total: 3,
                with_phone: 1,
                with_email: 1,
                with_company: 3,
                companies: 2,
            }
        );
        assert_eq!(stats.to_table().cell(5, 1), Some("2"));
        assert_eq!(book.delete_all(), 3);
        assert!(book.is_empty());
    }

    #[test]
    fn writes_csv_with_header() {
        let mut book = ContactBook::new();
        book.import(&[record(&[("имя", "Анна"), ("компания", "Acme, Inc")])], at(1, 0));
        let bytes = FileFormat::Csv.write(book.contacts()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "имя,фамилия,отчество,номер телефона,почта,компания\r\nАнна,,,,,\"Acme, Inc\"\r\n"
        );
        assert!(FileFormat::Csv.write(&[]).unwrap().is_empty());
    }

    #[test]
    fn reads_csv_fixture() {
        let records = FileFormat::Csv.read(&fixture("contacts.csv")).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["имя"], "Иван");
        assert_eq!(records[0]["компания"], "ООО \"Ромашка\", филиал");
        assert_eq!(records[2]["номер телефона"], "");
    }

    #[test]
    fn xlsx_write_then_read() {
        let mut book = ContactBook::new();
        book.import(
            &[
                record(&[("имя", "Анна"), ("почта", "anna@example.com")]),
                record(&[("фамилия", "Смирнов"), ("компания", "Acme")]),
            ],
            at(1, 0),
        );
        let bytes = FileFormat::Xlsx.write(book.contacts()).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("contacts.xlsx");
        fs::write(&path, bytes).unwrap();

        let records = FileFormat::Xlsx.read(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["почта"], "anna@example.com");
        assert!(!records[0].contains_key("компания"));
        assert_eq!(records[1]["фамилия"], "Смирнов");
    }

    #[test]
    fn file_size_reports_missing_files() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            FileInfo::file_size(&dir.path().join("missing.csv")),
            Err(ContabError::FileNotFound)
        ));
        assert!(matches!(
            FileInfo::file_size(dir.path()),
            Err(ContabError::LoadingFailed(_))
        ));
    }

    #[test]
    fn multi_line_values_survive_csv_write_and_read() {
        let mut book = ContactBook::new();
        book.import(
            &[record(&[("имя", "Анна"), ("компания", "Acme\nEast")])],
            at(1, 0),
        );
        let bytes = FileFormat::Csv.write(book.contacts()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.ends_with("Анна,,,,,\"Acme\nEast\"\r\n"));

        let dir = tempdir().unwrap();
        let path = dir.path().join("contacts.csv");
        fs::write(&path, bytes).unwrap();
        let records = FileFormat::Csv.read(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["имя"], "Анна");
        assert_eq!(records[0]["компания"], "Acme\nEast");
    }

    #[test]
    fn empty_csv_file_has_no_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(FileFormat::Csv.read(&path).unwrap().is_empty());

        let mut book = ContactBook::new();
        let report = book.import(&FileFormat::Csv.read(&path).unwrap(), at(1, 0));
        assert_eq!(report, ImportReport::default());
    }

    #[test]
    fn xlsx_cell_index_rejects_overflow() {
        assert_eq!(cell_index(3, 5).unwrap(), (3, 5));
        assert!(cell_index(0, usize::from(u16::MAX) + 1).is_err());
        assert!(cell_index(u32::MAX as usize + 1, 0).is_err());
    }
}
