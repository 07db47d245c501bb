use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

use crate::contacts::{FileFormat, FileInfo};
use crate::domain::{ContabError, MAX_IMPORT_FILE_SIZE};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

fn invalid(msg: impl Into<String>) -> ContabError {
    ContabError::ValidationError(msg.into())
}

/// Accepts `YYYY-MM-DD HH:MM`, the `T` separated variant, optional seconds,
/// or a bare date meaning midnight.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[derive(Debug, Default, Clone)]
pub struct ImportForm {
    pub path: Option<PathBuf>,
    pub max_size: Option<u64>,
}

impl ImportForm {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            max_size: None,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Check the selected file and return what is known about it.
    pub fn validate(&self) -> Result<FileInfo, ContabError> {
        let path = self
            .path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| invalid("Файл не выбран"))?;

        let file_size = FileInfo::file_size(path)?;
        if file_size > self.max_size.unwrap_or(MAX_IMPORT_FILE_SIZE) {
            return Err(invalid("Размер файла не должен превышать 10 МБ"));
        }
        let file_format = Self::check_extension(path)?;
        Ok(FileInfo {
            path: path.to_path_buf(),
            file_size,
            file_format,
        })
    }

    fn check_extension(path: &Path) -> Result<FileFormat, ContabError> {
        FileFormat::from_path(path).map_err(|_| {
            invalid(format!(
                "Неподдерживаемый формат файла. Поддерживаемые форматы: {}",
                FileFormat::supported_list()
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPeriod {
    All,
    Today,
    Week,
    Month,
    Custom,
}

impl ExportPeriod {
    pub const ALL: [ExportPeriod; 5] = [
        ExportPeriod::All,
        ExportPeriod::Today,
        ExportPeriod::Week,
        ExportPeriod::Month,
        ExportPeriod::Custom,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExportPeriod::All => "Все контакты",
            ExportPeriod::Today => "За сегодня",
            ExportPeriod::Week => "За последнюю неделю",
            ExportPeriod::Month => "За последний месяц",
            ExportPeriod::Custom => "Выбрать период",
        }
    }
}

/// Which part of the export form has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportField {
    Format,
    Period,
    DateFrom,
    DateTo,
}

pub type DateRange = (Option<NaiveDateTime>, Option<NaiveDateTime>);

#[derive(Debug, Clone)]
pub struct ExportForm {
    pub format: FileFormat,
    pub period: ExportPeriod,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    pub focus: ExportField,
}

impl ExportForm {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            format: FileFormat::Csv,
            period: ExportPeriod::All,
            date_from: None,
            date_to: Some(now),
            focus: ExportField::Format,
        }
    }

    /// The date range inputs are only shown for a custom period.
    pub fn date_fields_visible(&self) -> bool {
        self.period == ExportPeriod::Custom
    }

    pub fn fields(&self) -> Vec<ExportField> {
        let mut fields = vec![ExportField::Format, ExportField::Period];
        if self.date_fields_visible() {
            fields.extend([ExportField::DateFrom, ExportField::DateTo]);
        }
        fields
    }

    pub fn focus_next(&mut self) {
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + 1) % fields.len()];
    }

    /// Step the focused choice field forwards or backwards.
    pub fn cycle(&mut self, forward: bool) {
        match self.focus {
            ExportField::Format => {
                self.format = match self.format {
                    FileFormat::Csv => FileFormat::Xlsx,
                    FileFormat::Xlsx => FileFormat::Csv,
                };
            }
            ExportField::Period => {
                let all = ExportPeriod::ALL;
                let pos = all.iter().position(|p| *p == self.period).unwrap_or(0);
                let next = if forward {
                    (pos + 1) % all.len()
                } else {
                    (pos + all.len() - 1) % all.len()
                };
                self.period = all[next];
            }
            ExportField::DateFrom | ExportField::DateTo => {}
        }
    }

    pub fn validate(&self) -> Result<(), ContabError> {
        if self.period != ExportPeriod::Custom {
            return Ok(());
        }
        let from = self
            .date_from
            .ok_or_else(|| invalid("Укажите дату начала периода"))?;
        let to = self
            .date_to
            .ok_or_else(|| invalid("Укажите дату окончания периода"))?;
        if from >= to {
            return Err(invalid("Дата начала должна быть меньше даты окончания"));
        }
        Ok(())
    }

    pub fn date_range(&self, now: NaiveDateTime) -> DateRange {
        match self.period {
            ExportPeriod::All => (None, None),
            ExportPeriod::Today => (now.date().and_hms_opt(0, 0, 0), Some(now)),
            ExportPeriod::Week => (Some(now - Duration::days(7)), Some(now)),
            ExportPeriod::Month => (Some(now - Duration::days(30)), Some(now)),
            ExportPeriod::Custom => (self.date_from, self.date_to),
        }
    }

    /// Validate and resolve the range in one step.
    pub fn submit(&self, now: NaiveDateTime) -> Result<DateRange, ContabError> {
        self.validate()?;
        Ok(self.date_range(now))
    }
}
