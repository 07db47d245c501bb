use arboard::Clipboard;
use chrono::{Local, NaiveDateTime};
use ratatui::crossterm::event::KeyEvent;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::contacts::{ContactBook, ContactStats, ImportReport};
use crate::domain::{CMDMode, ContabConfig, ContabError, HELP_TEXT, Message, expand_path};
use crate::download::{DirectorySink, Download, DownloadSink, ExportBinding};
use crate::forms::{ExportField, ExportForm, ImportForm, parse_datetime};
use crate::inputter::{InputResult, Inputter};
use crate::notification::{Level, Notification, Notifier};
use crate::stats::StatsPoller;
use crate::table::{Table, TableSource, row_to_csv};
use crate::ui::TABLE_CHROME_HEIGHT;

pub const CONTACTS_TABLE: &str = "contacts";
pub const ERRORS_TABLE: &str = "import-errors";
pub const STATS_TABLE: &str = "stats";

const DELETE_ALL_PROMPT: &str = "Delete all contacts? Press 'y' to confirm, any other key to cancel.";

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
    EXPORTFORM,
    CONFIRM,
}

struct TableView {
    id: &'static str,
    title: &'static str,
    table: Table, // rebuilt by `refresh_tables`
    curser_row: usize, // data row, header excluded
    curser_column: usize,
}

impl TableView {
    fn new(id: &'static str, title: &'static str) -> Self {
        TableView {
            id,
            title,
            table: Table::default(),
            curser_row: 0,
            curser_column: 0,
        }
    }
}

pub struct Model {
    config: ContabConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    book: ContactBook,
    last_report: ImportReport,
    views: Vec<TableView>,
    active_view: usize,
    notifier: Notifier,
    poller: StatsPoller,
    sink: Option<DirectorySink>,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    export_form: ExportForm,
    popup_message: String,
    page_height: usize,
}

impl Model {
    pub fn init(config: &ContabConfig, _ui_width: usize, ui_height: usize) -> Result<Self, ContabError> {
        let clipboard = match Clipboard::new() {
            Ok(cb) => Some(cb),
            Err(e) => {
                warn!("Clipboard not available: {e}");
                None
            }
        };
        let sink = Some(DirectorySink::new(config.download_dir.clone()));
        Ok(Self::with_parts(config, ui_height, sink, clipboard))
    }

    fn with_parts(
        config: &ContabConfig,
        ui_height: usize,
        sink: Option<DirectorySink>,
        clipboard: Option<Clipboard>,
    ) -> Self {
        let now = Instant::now();
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            book: ContactBook::new(),
            last_report: ImportReport::default(),
            views: vec![
                TableView::new(CONTACTS_TABLE, "Contacts"),
                TableView::new(ERRORS_TABLE, "Import errors"),
                TableView::new(STATS_TABLE, "Statistics"),
            ],
            active_view: 0,
            notifier: Notifier::new(Duration::from_millis(config.notification_ttl_ms)),
            poller: StatsPoller::new(Duration::from_millis(config.stats_interval_ms)),
            sink,
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            export_form: ExportForm::new(Self::now()),
            popup_message: String::new(),
            page_height: ui_height.saturating_sub(TABLE_CHROME_HEIGHT).max(1),
        };
        model.poller.refresh(&model.book, now);
        model.refresh_tables();
        model.notifier.notify(Level::Info, "Started contab! Press '?' for help.", now);
        model
    }

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    // -------------------- Read access for the UI ---------------------- //

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn table_titles(&self) -> Vec<&'static str> {
        self.views.iter().map(|v| v.title).collect()
    }

    pub fn active_view(&self) -> usize {
        self.active_view
    }

    pub fn active_table(&self) -> &Table {
        &self.views[self.active_view].table
    }

    /// Selected (data row, column) of the active table.
    pub fn selection(&self) -> (usize, usize) {
        let view = &self.views[self.active_view];
        (view.curser_row, view.curser_column)
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notifier.current(Instant::now())
    }

    pub fn stats(&self) -> ContactStats {
        self.poller.latest()
    }

    pub fn export_form(&self) -> Option<&ExportForm> {
        match (self.modus, self.previous_modus) {
            (Modus::EXPORTFORM, _) | (Modus::CMDINPUT, Modus::EXPORTFORM) => Some(&self.export_form),
            _ => None,
        }
    }

    pub fn cmd_input(&self) -> Option<(CMDMode, &InputResult)> {
        match (self.modus, self.cmd_mode) {
            (Modus::CMDINPUT, Some(mode)) => Some((mode, &self.last_input)),
            _ => None,
        }
    }

    pub fn popup(&self) -> Option<&str> {
        match self.modus {
            Modus::POPUP | Modus::CONFIRM => Some(&self.popup_message),
            _ => None,
        }
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    // -------------------- Message dispatch ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), ContabError> {
        let Some(msg) = message else {
            return Ok(());
        };
        if msg != Message::Tick {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        }
        match (self.modus, msg) {
            (_, Message::Tick) => self.tick(),
            (_, Message::Resize(width, height)) => self.ui_resize(width, height),
            (_, Message::Quit) => self.quit(),
            (Modus::TABLE, msg) => self.update_table(msg),
            (Modus::POPUP, Message::Exit) => self.close_popup(),
            (Modus::CONFIRM, Message::Confirm) => self.delete_all(),
            (Modus::CONFIRM, Message::Exit) => self.close_popup(),
            (Modus::EXPORTFORM, msg) => self.update_export_form(msg),
            (Modus::CMDINPUT, Message::RawKey(key)) => self.raw_input(key),
            _ => (),
        }
        Ok(())
    }

    fn update_table(&mut self, msg: Message) {
        match msg {
            Message::MoveDown => self.move_selection_down(1),
            Message::MoveUp => self.move_selection_up(1),
            Message::MovePageDown => self.move_selection_down(self.page_height),
            Message::MovePageUp => self.move_selection_up(self.page_height),
            Message::MoveBeginning => self.views[self.active_view].curser_row = 0,
            Message::MoveEnd => self.move_selection_end(),
            Message::MoveLeft => self.move_selection_left(),
            Message::MoveRight => self.move_selection_right(),
            Message::NextTable => self.next_table(),
            Message::CopyCell => self.copy_cell(),
            Message::CopyRow => self.copy_row(),
            Message::ExportTable => self.export_active_table(None),
            Message::ExportTableAs => self.enter_cmd_mode(CMDMode::ExportFilename, ""),
            Message::Import => self.enter_cmd_mode(CMDMode::ImportPath, ""),
            Message::OpenExportForm => self.open_export_form(),
            Message::DeleteAll if self.book.is_empty() => {
                self.notify(Level::Info, "Нет контактов для удаления")
            }
            Message::DeleteAll => self.show_popup(Modus::CONFIRM, DELETE_ALL_PROMPT),
            Message::Help => self.show_popup(Modus::POPUP, HELP_TEXT),
            Message::Exit => self.notifier.dismiss(),
            _ => (),
        }
    }

    fn update_export_form(&mut self, msg: Message) {
        match msg {
            Message::NextField => self.export_form.focus_next(),
            Message::NextChoice => self.export_form.cycle(true),
            Message::PreviousChoice => self.export_form.cycle(false),
            Message::Enter => match self.export_form.focus {
                ExportField::DateFrom => {
                    let current = Self::format_date(self.export_form.date_from);
                    self.enter_cmd_mode(CMDMode::DateFrom, &current);
                }
                ExportField::DateTo => {
                    let current = Self::format_date(self.export_form.date_to);
                    self.enter_cmd_mode(CMDMode::DateTo, &current);
                }
                ExportField::Format | ExportField::Period => self.submit_export_form(),
            },
            Message::Exit => {
                self.modus = Modus::TABLE;
                self.previous_modus = Modus::EXPORTFORM;
            }
            _ => (),
        }
    }

    fn tick(&mut self) {
        let now = Instant::now();
        self.notifier.expire(now);
        if self.poller.poll(&self.book, now).is_some() {
            self.refresh_tables();
            self.clamp_selection();
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized! w:{width}, h:{height}");
        self.page_height = height.saturating_sub(TABLE_CHROME_HEIGHT).max(1);
    }

    fn notify(&mut self, level: Level, message: impl Into<String>) {
        self.notifier.notify(level, message, Instant::now());
    }

    fn show_popup(&mut self, modus: Modus, text: &str) {
        self.previous_modus = self.modus;
        self.modus = modus;
        self.popup_message = text.to_string();
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.popup_message.clear();
    }

    fn format_date(date: Option<NaiveDateTime>) -> String {
        date.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }

    // -------------------- Command input ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode, initial: &str) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.input.clear();
        self.input.set(initial);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        let mode = self.cmd_mode.take();
        if self.last_input.canceled {
            debug!("Command input {mode:?} canceled");
            return;
        }

        let cmd_input = self.last_input.input.trim().to_string();
        trace!("Handle cmd input {mode:?}: {cmd_input}");
        match mode {
            Some(CMDMode::ImportPath) => self.handle_import(&cmd_input),
            Some(CMDMode::ExportFilename) => {
                let filename = (!cmd_input.is_empty()).then_some(cmd_input);
                self.export_active_table(filename);
            }
            Some(CMDMode::DateFrom) => self.set_form_date(&cmd_input, true),
            Some(CMDMode::DateTo) => self.set_form_date(&cmd_input, false),
            None => info!("Cmd mode is none!"),
        }
    }

    fn set_form_date(&mut self, input: &str, from: bool) {
        let value = if input.is_empty() {
            None
        } else {
            match parse_datetime(input) {
                Some(d) => Some(d),
                None => {
                    self.notify(Level::Error, format!("Неверный формат даты: {input}"));
                    return;
                }
            }
        };
        if from {
            self.export_form.date_from = value;
        } else {
            self.export_form.date_to = value;
        }
    }

    // -------------------- Import / export / delete ---------------------- //

    /// Validate, read and import a contact file.
    pub fn import_file(&mut self, path: PathBuf) -> Result<ImportReport, ContabError> {
        let form = ImportForm::new(Some(path)).with_max_size(self.config.max_import_size);
        let info = form.validate()?;
        let records = info.file_format.read(&info.path)?;
        self.last_report = self.book.import(&records, Self::now());
        self.poller.refresh(&self.book, Instant::now());
        self.refresh_tables();
        self.clamp_selection();
        Ok(self.last_report.clone())
    }

    /// Import from user input, reporting the outcome as a notification.
    pub fn handle_import(&mut self, input: &str) {
        let result = if input.is_empty() {
            self.import_file(PathBuf::new())
        } else {
            expand_path(input).and_then(|path| self.import_file(path))
        };
        match result {
            Ok(report) => {
                let (level, message) = if report.failed == 0 {
                    (Level::Success, format!("Импортировано контактов: {}", report.success))
                } else {
                    (
                        Level::Warning,
                        format!(
                            "Импортировано: {}, ошибок: {} (see the import errors table)",
                            report.success, report.failed
                        ),
                    )
                };
                self.notify(level, message);
            }
            Err(e) => self.notify(Level::Error, e.to_string()),
        }
    }

    pub fn export_table(&self, table_id: &str, filename: Option<String>) -> Option<PathBuf> {
        let binding = match filename {
            Some(name) => ExportBinding::new(table_id).with_filename(name),
            None => ExportBinding::new(table_id),
        };
        binding.trigger(self, self.sink.as_ref().map(|s| s as &dyn DownloadSink))
    }

    fn export_active_table(&mut self, filename: Option<String>) {
        let id = self.views[self.active_view].id;
        // A failed export stays silent, only success is reported.
        if let Some(path) = self.export_table(id, filename) {
            self.notify(Level::Success, format!("Saved {}", path.display()));
        }
    }

    fn open_export_form(&mut self) {
        self.export_form = ExportForm::new(Self::now());
        self.previous_modus = self.modus;
        self.modus = Modus::EXPORTFORM;
    }

    fn submit_export_form(&mut self) {
        match self.export_contacts() {
            Ok((count, path)) => {
                self.modus = Modus::TABLE;
                self.previous_modus = Modus::EXPORTFORM;
                self.notify(
                    Level::Success,
                    format!("Экспортировано контактов: {count} -> {}", path.display()),
                );
            }
            Err(e) => self.notify(Level::Error, e.to_string()),
        }
    }

    fn export_contacts(&self) -> Result<(usize, PathBuf), ContabError> {
        let now = Self::now();
        let (from, to) = self.export_form.submit(now)?;
        let contacts = self.book.export(from, to);
        let format = self.export_form.format;
        let download = Download {
            filename: format!("contacts_{}{}", now.format("%Y%m%d_%H%M%S"), format.extension()),
            mime_type: format.mime_type().to_string(),
            content: format.write(&contacts)?,
        };
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| ContabError::ConfigError("downloads are not available".into()))?;
        let path = sink.deliver(&download)?;
        info!("Exported {} contacts to {path:?}", contacts.len());
        Ok((contacts.len(), path))
    }

    fn delete_all(&mut self) {
        let removed = self.book.delete_all();
        self.last_report = ImportReport::default();
        self.poller.refresh(&self.book, Instant::now());
        self.refresh_tables();
        self.close_popup();
        self.clamp_selection();
        self.notify(Level::Success, format!("Удалено контактов: {removed}"));
    }

    // -------------------- Clipboard ---------------------- //

    fn selected_row(&self) -> Option<Vec<String>> {
        let (row, _) = self.selection();
        self.active_table().rows().get(row + 1).cloned()
    }

    fn copy_cell(&mut self) {
        let (row, column) = self.selection();
        let cell = self.active_table().cell(row + 1, column).map(str::to_string);
        if let Some(cell) = cell {
            trace!("Cell content: {}", cell);
            self.copy_to_clipboard(cell);
        }
    }

    fn copy_row(&mut self) {
        if let Some(row) = self.selected_row() {
            self.copy_to_clipboard(row_to_csv(&row));
        }
    }

    fn copy_to_clipboard(&mut self, text: String) {
        let result = match self.clipboard.as_mut() {
            Some(cb) => cb.set_text(text).map_err(ContabError::from),
            None => {
                self.notify(Level::Warning, "Clipboard is not available");
                return;
            }
        };
        match result {
            Ok(_) => {
                trace!("Copied to clipboard.");
                self.notify(Level::Info, "Скопировано в буфер обмена");
            }
            Err(e) => self.notify(Level::Error, e.to_string()),
        }
    }

    // -------------------- Selection ---------------------- //

    fn next_table(&mut self) {
        self.active_view = (self.active_view + 1) % self.views.len();
        self.clamp_selection();
    }

    fn data_rows(&self) -> usize {
        self.active_table().len().saturating_sub(1)
    }

    fn clamp_selection(&mut self) {
        let rows = self.data_rows();
        let width = self.active_table().width();
        let view = &mut self.views[self.active_view];
        view.curser_row = view.curser_row.min(rows.saturating_sub(1));
        view.curser_column = view.curser_column.min(width.saturating_sub(1));
    }

    fn move_selection_up(&mut self, size: usize) {
        let view = &mut self.views[self.active_view];
        view.curser_row = view.curser_row.saturating_sub(size);
    }

    fn move_selection_down(&mut self, size: usize) {
        let last = self.data_rows().saturating_sub(1);
        let view = &mut self.views[self.active_view];
        view.curser_row = std::cmp::min(view.curser_row + size, last);
    }

    fn move_selection_end(&mut self) {
        let last = self.data_rows().saturating_sub(1);
        self.views[self.active_view].curser_row = last;
    }

    fn move_selection_left(&mut self) {
        let view = &mut self.views[self.active_view];
        view.curser_column = view.curser_column.saturating_sub(1);
    }

    fn move_selection_right(&mut self) {
        let last = self.active_table().width().saturating_sub(1);
        let view = &mut self.views[self.active_view];
        view.curser_column = std::cmp::min(view.curser_column + 1, last);
    }
}

impl Model {
    /// Rebuild the tables behind every view after the contacts, the last
    /// import report or the statistics changed.
    fn refresh_tables(&mut self) {
        let tables: Vec<Table> = self
            .views
            .iter()
            .map(|v| self.build_table(v.id).unwrap_or_default())
            .collect();
        for (view, table) in self.views.iter_mut().zip(tables) {
            view.table = table;
        }
    }

    fn build_table(&self, id: &str) -> Option<Table> {
        match id {
            CONTACTS_TABLE => Some(self.book.to_table()),
            ERRORS_TABLE => Some(Table::with_header(
                ["№", "ошибка"],
                self.last_report
                    .errors
                    .iter()
                    .enumerate()
                    .map(|(idx, e)| vec![(idx + 1).to_string(), e.clone()])
                    .collect(),
            )),
            STATS_TABLE => Some(self.poller.latest().to_table()),
            _ => None,
        }
    }
}

impl TableSource for Model {
    fn table(&self, id: &str) -> Option<Table> {
        self.views
            .iter()
            .find(|v| v.id == id)
            .map(|v| v.table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::ExportPeriod;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("contacts.csv")
    }

    fn model() -> (Model, TempDir) {
        let dir = tempdir().unwrap();
        let config = ContabConfig::default().download_dir(dir.path().to_path_buf());
        let sink = Some(DirectorySink::new(dir.path()));
        (Model::with_parts(&config, 30, sink, None), dir)
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    fn type_line(model: &mut Model, text: &str) {
        for c in text.chars() {
            send(model, Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
        send(model, Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    }

    #[test]
    fn imports_fixture_and_exports_contacts_table() {
        let (mut model, dir) = model();
        let report = model.import_file(fixture()).unwrap();
        assert_eq!(report.success, 3);
        assert_eq!(model.stats().total, 3);

        send(&mut model, Message::ExportTable);
        let csv = fs::read_to_string(dir.path().join("export.csv")).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines[0], "имя,фамилия,отчество,номер телефона,почта,компания");
        assert!(lines[1].ends_with(",\"ООО \"\"Ромашка\"\", филиал\""));
        assert_eq!(lines.len(), 4);
        assert_eq!(model.notification().unwrap().level, Level::Success);
    }

    #[test]
    fn export_as_uses_typed_filename_or_default() {
        let (mut model, dir) = model();
        send(&mut model, Message::ExportTableAs);
        assert_eq!(model.modus(), Modus::CMDINPUT);
        type_line(&mut model, "people.csv");
        assert_eq!(model.modus(), Modus::TABLE);
        assert!(dir.path().join("people.csv").exists());

        send(&mut model, Message::ExportTableAs);
        type_line(&mut model, "");
        assert!(dir.path().join("export.csv").exists());
    }

    #[test]
    fn unknown_table_or_missing_sink_is_silent() {
        let (mut model, _dir) = model();
        assert_eq!(model.export_table("nope", None), None);

        model.sink = None;
        model.notifier.dismiss();
        send(&mut model, Message::ExportTable);
        assert!(model.notification().is_none());
    }

    #[test]
    fn import_errors_become_notifications() {
        let (mut model, _dir) = model();
        send(&mut model, Message::Import);
        type_line(&mut model, "");
        let note = model.notification().unwrap();
        assert_eq!(note.level, Level::Error);
        assert_eq!(note.message, "Файл не выбран");
    }

    #[test]
    fn import_errors_table_lists_failures() {
        let (mut model, dir) = model();
        let path = dir.path().join("partial.csv");
        fs::write(&path, "имя,почта\nАнна,a@x.ru\n,ghost@x.ru\n").unwrap();
        let report = model.import_file(path).unwrap();
        assert_eq!(report.failed, 1);

        let errors = model.table(ERRORS_TABLE).unwrap();
        assert_eq!(
            errors.cell(1, 1),
            Some("Не удалось импортировать контакт номер 2: пустое имя")
        );
    }

    #[test]
    fn export_form_validates_custom_period() {
        let (mut model, dir) = model();
        model.import_file(fixture()).unwrap();
        send(&mut model, Message::OpenExportForm);
        assert!(model.export_form().is_some());

        send(&mut model, Message::NextField);
        send(&mut model, Message::PreviousChoice);
        assert_eq!(model.export_form().unwrap().period, ExportPeriod::Custom);

        send(&mut model, Message::Enter);
        assert_eq!(model.notification().unwrap().message, "Укажите дату начала периода");
        assert_eq!(model.modus(), Modus::EXPORTFORM);

        send(&mut model, Message::NextField);
        send(&mut model, Message::Enter);
        assert_eq!(model.cmd_input().map(|(m, _)| m), Some(CMDMode::DateFrom));
        assert!(model.export_form().is_some());
        type_line(&mut model, "2000-01-01");
        assert_eq!(model.modus(), Modus::EXPORTFORM);

        send(&mut model, Message::NextField);
        send(&mut model, Message::NextField);
        send(&mut model, Message::Enter);
        assert_eq!(model.modus(), Modus::TABLE);

        let exported: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("contacts_") && n.ends_with(".csv"))
            .collect();
        assert_eq!(exported.len(), 1);
    }

    #[test]
    fn bad_dates_are_reported() {
        let (mut model, _dir) = model();
        send(&mut model, Message::OpenExportForm);
        model.export_form.period = ExportPeriod::Custom;
        model.export_form.focus = ExportField::DateTo;
        send(&mut model, Message::Enter);
        model.input.clear();
        type_line(&mut model, "tomorrow");
        assert_eq!(model.notification().unwrap().message, "Неверный формат даты: tomorrow");
        assert!(model.export_form.date_to.is_some());
    }

    #[test]
    fn delete_all_needs_confirmation() {
        let (mut model, _dir) = model();
        send(&mut model, Message::DeleteAll);
        assert_eq!(model.modus(), Modus::TABLE);

        model.import_file(fixture()).unwrap();
        send(&mut model, Message::DeleteAll);
        assert_eq!(model.modus(), Modus::CONFIRM);
        send(&mut model, Message::Exit);
        assert_eq!(model.book.len(), 3);

        send(&mut model, Message::DeleteAll);
        send(&mut model, Message::Confirm);
        assert_eq!(model.book.len(), 0);
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(model.stats().total, 0);
    }

    #[test]
    fn selection_stays_inside_table() {
        let (mut model, _dir) = model();
        model.import_file(fixture()).unwrap();
        send(&mut model, Message::MovePageDown);
        assert_eq!(model.selection(), (2, 0));
        for _ in 0..10 {
            send(&mut model, Message::MoveRight);
        }
        assert_eq!(model.selection(), (2, 5));

        send(&mut model, Message::NextTable);
        assert_eq!(model.active_view(), 1);
        assert_eq!(model.selection(), (0, 0));
        send(&mut model, Message::NextTable);
        send(&mut model, Message::MoveEnd);
        assert_eq!(model.selection(), (4, 0));
    }

    #[test]
    fn view_tables_follow_contact_changes() {
        let (mut model, _dir) = model();
        assert_eq!(model.active_table().len(), 1);

        model.import_file(fixture()).unwrap();
        assert_eq!(model.active_table().len(), 4);
        assert_eq!(model.active_table().cell(1, 0), Some("Иван"));
        assert_eq!(model.table(STATS_TABLE).unwrap().cell(1, 1), Some("3"));

        send(&mut model, Message::DeleteAll);
        send(&mut model, Message::Confirm);
        assert_eq!(model.active_table().len(), 1);
        assert_eq!(model.table(STATS_TABLE).unwrap().cell(1, 1), Some("0"));
    }

    #[test]
    fn copy_without_clipboard_warns() {
        let (mut model, _dir) = model();
        model.import_file(fixture()).unwrap();
        send(&mut model, Message::CopyRow);
        assert_eq!(model.notification().unwrap().level, Level::Warning);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let (mut model, _dir) = model();
        send(&mut model, Message::Help);
        assert_eq!(model.popup(), Some(HELP_TEXT));
        send(&mut model, Message::Exit);
        assert!(model.popup().is_none());
        send(&mut model, Message::Quit);
        assert_eq!(model.status, Status::QUITTING);
    }
}
