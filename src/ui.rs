use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::forms::{ExportField, ExportForm};
use crate::model::{Modus, Model};
use crate::notification::Level;

pub const TABS_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const TABLE_BORDER_HEIGHT: usize = 2;
pub const STATSLINE_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 1;
/// Rows of the screen not available for table data.
pub const TABLE_CHROME_HEIGHT: usize =
    TABS_HEIGHT + TABLE_BORDER_HEIGHT + TABLE_HEADER_HEIGHT + STATSLINE_HEIGHT + CMDLINE_HEIGHT;
const MAX_COLUMN_WIDTH: usize = 40;
const COLUMN_WIDTH_MARGIN: usize = 2;

#[derive(Debug, Default)]
pub struct TableUI;

impl TableUI {
    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let [tabs_area, table_area, stats_area, cmd_area] = Layout::vertical([
            Constraint::Length(TABS_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATSLINE_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.draw_tabs(model, frame, tabs_area);
        self.draw_table(model, frame, table_area);
        self.draw_stats(model, frame, stats_area);
        self.draw_cmdline(model, frame, cmd_area);

        if let Some(form) = model.export_form() {
            self.draw_export_form(form, frame);
        }
        if let Some(text) = model.popup() {
            self.draw_popup(model.modus(), text, frame);
        }
    }

    fn draw_tabs(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let tabs = Tabs::new(model.table_titles())
            .select(model.active_view())
            .highlight_style(Style::new().bold().fg(Color::Yellow))
            .divider("|");
        frame.render_widget(tabs, area);
    }

    fn column_widths(table: &crate::table::Table) -> Vec<Constraint> {
        let mut widths = vec![0usize; table.width()];
        for row in table.rows() {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }
        widths
            .into_iter()
            .map(|w| Constraint::Length((w.min(MAX_COLUMN_WIDTH) + COLUMN_WIDTH_MARGIN) as u16))
            .collect()
    }

    fn draw_table(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let table = model.active_table();
        let widths = Self::column_widths(table);
        let mut rows = table.rows().iter().map(|r| {
            Row::new(r.iter().map(|c| Cell::from(c.replace('\n', " ↵ "))))
        });
        let header = rows
            .next()
            .unwrap_or_default()
            .style(Style::new().bold().underlined());

        let instructions = Line::from(vec![
            " Export ".into(),
            "<e>".blue().bold(),
            " Copy ".into(),
            "<c/r>".blue().bold(),
            " Import ".into(),
            "<i>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(Line::from(" contab ".bold()).centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);

        let widget = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .cell_highlight_style(Style::new().bold().fg(Color::Yellow));

        let (row, column) = model.selection();
        let mut state = TableState::default()
            .with_selected(Some(row))
            .with_selected_column(Some(column));
        if table.len() <= 1 {
            state.select(None);
        }
        frame.render_stateful_widget(widget, area, &mut state);
    }

    fn draw_stats(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let stats = model.stats();
        let line = Line::from(vec![
            " Контакты: ".into(),
            stats.total.to_string().bold(),
            "  с телефоном: ".into(),
            stats.with_phone.to_string().bold(),
            "  с почтой: ".into(),
            stats.with_email.to_string().bold(),
            "  компаний: ".into(),
            stats.companies.to_string().bold(),
        ]);
        frame.render_widget(Paragraph::new(line).dark_gray(), area);
    }

    fn draw_cmdline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if let Some((mode, input)) = model.cmd_input() {
            let prompt = mode.prompt();
            let line = Line::from(vec![prompt.bold(), input.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + input.curser_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        if let Some(note) = model.notification() {
            let style = match note.level {
                Level::Info => Style::new().fg(Color::Cyan),
                Level::Success => Style::new().fg(Color::Green),
                Level::Warning => Style::new().fg(Color::Yellow),
                Level::Error => Style::new().fg(Color::Red).bold(),
            };
            frame.render_widget(Paragraph::new(Span::styled(note.message.clone(), style)), area);
        }
    }

    fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let [area] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(area);
        let [area] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        area
    }

    fn draw_export_form(&self, form: &ExportForm, frame: &mut Frame) {
        let field = |focus: ExportField, label: &str, value: String| {
            let marker = if form.focus == focus { "> " } else { "  " };
            let line = Line::from(vec![marker.into(), format!("{label:<20}").into(), value.into()]);
            if form.focus == focus {
                line.yellow().bold()
            } else {
                line
            }
        };
        let date = |d: Option<chrono::NaiveDateTime>| {
            d.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        };

        let mut lines = vec![
            field(
                ExportField::Format,
                "Формат файла",
                format!("< {} >", form.format.extension()),
            ),
            field(
                ExportField::Period,
                "Период экспорта",
                format!("< {} >", form.period.label()),
            ),
        ];
        if form.date_fields_visible() {
            lines.push(field(ExportField::DateFrom, "Дата создания с", date(form.date_from)));
            lines.push(field(ExportField::DateTo, "Дата создания по", date(form.date_to)));
        }

        let area = Self::centered(frame.area(), 60, lines.len() as u16 + 2);
        let block = Block::bordered()
            .title(Line::from(" Экспорт контактов ".bold()).centered())
            .title_bottom(Line::from(" <Enter> submit  <Esc> close ").centered())
            .border_set(border::ROUNDED);
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_popup(&self, modus: Modus, text: &str, frame: &mut Frame) {
        let height = text.lines().count() as u16 + 2;
        let area = Self::centered(frame.area(), 72, height);
        let title = match modus {
            Modus::CONFIRM => " Confirm ",
            _ => " Help ",
        };
        let block = Block::bordered()
            .title(Line::from(title.bold()).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(text).wrap(Wrap { trim: false }).block(block),
            area,
        );
    }
}
