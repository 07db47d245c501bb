/// One table row, cells in display order.
pub type Row = Vec<String>;

/// A rendered table: rows top to bottom, header rows included.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Build a table from a header row followed by data rows.
    pub fn with_header<S: Into<String>>(header: impl IntoIterator<Item = S>, body: Vec<Row>) -> Self {
        let mut rows = Vec::with_capacity(body.len() + 1);
        rows.push(header.into_iter().map(Into::into).collect());
        rows.extend(body);
        Self::new(rows)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Anything that can hand out tables by identifier.
pub trait TableSource {
    fn table(&self, id: &str) -> Option<Table>;
}

impl TableSource for std::collections::HashMap<String, Table> {
    fn table(&self, id: &str) -> Option<Table> {
        self.get(id).cloned()
    }
}

// Quotes are doubled first, the wrap check runs on the doubled text.
// Newlines get no special treatment.
pub fn escape_cell(cell: &str) -> String {
    let escaped = cell.replace('"', "\"\"");
    if escaped.contains(',') || escaped.contains('"') {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

pub fn row_to_csv(row: &[String]) -> String {
    row.iter()
        .map(|c| escape_cell(c))
        .collect::<Vec<String>>()
        .join(",")
}

/// Serialize a table to CSV text. Rows are joined by `\n` without a trailing newline.
pub fn table_to_csv(table: &Table) -> String {
    table
        .rows()
        .iter()
        .map(|r| row_to_csv(r))
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn escapes_commas_and_quotes() {
        let table = Table::new(vec![row(&["a", "b"]), row(&["c,d", "e\"f"])]);
        assert_eq!(table_to_csv(&table), "a,b\n\"c,d\",\"e\"\"f\"");
    }

    #[test]
    fn empty_table_is_empty_string() {
        assert_eq!(table_to_csv(&Table::default()), "");
    }

    #[test]
    fn plain_cells_are_unchanged() {
        for cell in ["", "plain", "with space", "tab\there", "Иванов", "semi;colon"] {
            assert_eq!(escape_cell(cell), cell);
        }
    }

    #[test]
    fn quotes_are_doubled_and_wrapped() {
        assert_eq!(escape_cell("\""), "\"\"\"\"");
        assert_eq!(escape_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn embedded_newlines_pass_through() {
        let table = Table::new(vec![row(&["line1\nline2", "x"])]);
        assert_eq!(table_to_csv(&table), "line1\nline2,x");
    }

    #[test]
    fn ragged_rows_keep_their_own_width() {
        let table = Table::new(vec![row(&["a"]), row(&["b", "c", "d"]), row(&[])]);
        assert_eq!(table_to_csv(&table), "a\nb,c,d\n");
        assert_eq!(table.width(), 3);
    }

    #[test]
    fn header_row_comes_first() {
        let table = Table::with_header(["name", "company"], vec![row(&["Anna", "Acme, Inc"])]);
        assert_eq!(table_to_csv(&table), "name,company\nAnna,\"Acme, Inc\"");
        assert_eq!(table.cell(1, 1), Some("Acme, Inc"));
        assert_eq!(table.cell(2, 0), None);
    }

    #[test]
    fn map_source_looks_up_by_id() {
        let mut tables = HashMap::new();
        tables.insert("contacts".to_string(), Table::new(vec![row(&["x"])]));
        assert!(tables.table("contacts").is_some());
        assert!(tables.table("missing").is_none());
    }
}
