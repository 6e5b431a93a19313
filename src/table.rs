//! Tabular renderer: row-0 columns, formatted cells, pagination and
//! header sorting.

use crate::coerce::{self, format_cell};
use crate::container::{Container, Output};
use crate::spec::{ChartSpec, Row, SortOrder};

pub const PAGE_SIZE: usize = 100;
pub const COMPACT_ROWS: usize = 5;

/// Column schema, taken from the keys of the first row in their given order.
/// Later rows may lack these keys (blank cells) or carry extra ones (ignored).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns(Vec<String>);

impl Columns {
    pub fn from_first_row(rows: &[Row]) -> Self {
        match rows.first() {
            Some(first) => Columns(first.keys().cloned().collect()),
            None => Columns(Vec::new()),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    /// Every row in base order (compact views keep only the shown rows).
    rows: Vec<Row>,
    total: usize,
    columns: Columns,
    compact: bool,
    page: usize,
    sort: Option<(String, SortOrder)>,
}

impl TableView {
    /// Full tables start in the spec's sort order; compact tables show input
    /// order.
    pub fn new(spec: &ChartSpec, compact: bool) -> Self {
        let rows: Vec<Row> = if compact {
            spec.data.iter().take(COMPACT_ROWS).cloned().collect()
        } else {
            spec.ordered_rows().into_iter().cloned().collect()
        };
        TableView {
            rows,
            total: spec.data.len(),
            columns: Columns::from_first_row(&spec.data),
            compact,
            page: 0,
            sort: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        self.columns.names()
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    pub fn row_count(&self) -> usize {
        self.total
    }

    pub fn font_size(&self) -> f64 {
        if self.compact {
            9.0
        } else {
            11.0
        }
    }

    // === Pagination ===

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(PAGE_SIZE)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Move to `page`, clamped to the valid range. Returns the page shown.
    pub fn set_page(&mut self, page: usize) -> usize {
        if self.compact {
            return 0;
        }
        self.page = page.min(self.total_pages().saturating_sub(1));
        self.page
    }

    pub fn next_page(&mut self) -> usize {
        self.set_page(self.page + 1)
    }

    pub fn prev_page(&mut self) -> usize {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn can_prev(&self) -> bool {
        !self.compact && self.page > 0
    }

    pub fn can_next(&self) -> bool {
        !self.compact && self.page + 1 < self.total_pages()
    }

    // === Sorting ===

    /// Cycle a column's sort: ascending, descending, off. A different column
    /// starts at ascending. Compact tables ignore this.
    pub fn toggle_sort(&mut self, column: &str) -> Option<SortOrder> {
        if self.compact {
            return None;
        }
        self.sort = match self.sort.take() {
            Some((current, SortOrder::Asc)) if current == column => Some((current, SortOrder::Desc)),
            Some((current, SortOrder::Desc)) if current == column => None,
            _ => Some((column.to_string(), SortOrder::Asc)),
        };
        self.sort.as_ref().map(|(_, order)| *order)
    }

    pub fn sort_state(&self) -> Option<(&str, SortOrder)> {
        self.sort.as_ref().map(|(c, o)| (c.as_str(), *o))
    }

    // === Cells ===

    /// Rows in the current window, sorted within the window when a header
    /// sort is active.
    fn window(&self) -> Vec<&Row> {
        let window: &[Row] = if self.compact {
            &self.rows
        } else {
            let start = (self.page * PAGE_SIZE).min(self.rows.len());
            let end = (start + PAGE_SIZE).min(self.rows.len());
            &self.rows[start..end]
        };
        match &self.sort {
            Some((column, order)) => coerce::sort_rows(window, column, *order),
            None => window.iter().collect(),
        }
    }

    /// Formatted cells of the visible rows, one entry per column.
    pub fn visible_rows(&self) -> Vec<Vec<String>> {
        self.window()
            .into_iter()
            .map(|row| {
                self.columns
                    .names()
                    .iter()
                    .map(|c| format_cell(row.get(c)))
                    .collect()
            })
            .collect()
    }

    /// Rows cut off by a compact view.
    pub fn more_rows(&self) -> Option<usize> {
        let hidden = self.total.saturating_sub(COMPACT_ROWS);
        (self.compact && hidden > 0).then_some(hidden)
    }

    /// "N rows · Page p/T", shown only when there is more than one page.
    pub fn status_line(&self) -> Option<String> {
        let pages = self.total_pages();
        (!self.compact && pages > 1)
            .then(|| format!("{} rows · Page {}/{}", self.total, self.page + 1, pages))
    }

    pub fn footer(&self) -> Option<String> {
        match self.more_rows() {
            Some(n) => Some(format!("+{n} more rows")),
            None => self.status_line(),
        }
    }

    /// Plain-text rendering with aligned columns.
    pub fn render_text(&self) -> String {
        let headers: Vec<String> = self
            .columns
            .names()
            .iter()
            .map(|c| match self.sort_state() {
                Some((s, SortOrder::Asc)) if s == c => format!("{c} ↑"),
                Some((s, SortOrder::Desc)) if s == c => format!("{c} ↓"),
                _ => c.clone(),
            })
            .collect();
        let body = self.visible_rows();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &body {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{cell:<w$}", w = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = Vec::new();
        if !headers.is_empty() {
            out.push(line(&headers));
            out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
            for row in &body {
                out.push(line(row));
            }
        }
        if let Some(footer) = self.footer() {
            out.push(footer);
        }
        out.join("\n")
    }
}

/// Render a table into the container, replacing its contents.
pub fn render(spec: &ChartSpec, compact: bool, container: &mut Container) {
    container.clear();
    container.replace(Output::Table(TableView::new(spec, compact)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbered(count: usize) -> ChartSpec {
        let data: Vec<_> = (0..count).map(|i| json!({"id": i, "name": format!("row{i}")})).collect();
        ChartSpec::from_value(json!({"chart_type": "table", "data": data})).unwrap()
    }

    #[test]
    fn test_columns_from_first_row_with_heterogeneous_rows() {
        let spec = ChartSpec::from_value(json!({
            "chart_type": "table",
            "x": "ignored",
            "data": [{"b": 1, "a": 2}, {"a": 3, "c": 4}]
        }))
        .unwrap();
        let view = TableView::new(&spec, false);
        assert_eq!(view.columns(), &["b".to_string(), "a".to_string()]);
        assert_eq!(view.visible_rows()[1], vec!["".to_string(), "3".to_string()]);
    }

    #[test]
    fn test_empty_table() {
        let view = TableView::new(&numbered(0), false);
        assert!(view.columns().is_empty());
        assert_eq!(view.total_pages(), 0);
        let mut view = view;
        assert_eq!(view.set_page(3), 0);
        assert!(!view.can_next() && !view.can_prev());
        assert_eq!(view.render_text(), "");
    }

    #[test]
    fn test_pagination_clamps() {
        let mut view = TableView::new(&numbered(250), false);
        assert_eq!(view.total_pages(), 3);
        assert_eq!(view.set_page(5), 2);
        assert_eq!(view.visible_rows().len(), 50);
        assert!(!view.can_next());
        assert!(view.can_prev());
        assert_eq!(view.status_line().unwrap(), "250 rows · Page 3/3");
        view.set_page(0);
        assert!(!view.can_prev());
        assert_eq!(view.prev_page(), 0);
        assert_eq!(view.next_page(), 1);
        assert_eq!(view.visible_rows()[0][0], "100");
    }

    #[test]
    fn test_single_page_has_no_status_line() {
        let view = TableView::new(&numbered(100), false);
        assert_eq!(view.total_pages(), 1);
        assert!(view.status_line().is_none());
    }

    #[test]
    fn test_compact_shows_five_and_footer() {
        let mut view = TableView::new(&numbered(12), true);
        assert_eq!(view.visible_rows().len(), 5);
        assert_eq!(view.footer().unwrap(), "+7 more rows");
        assert_eq!(view.toggle_sort("id"), None);
        assert!(view.sort_state().is_none());

        let view = TableView::new(&numbered(3), true);
        assert_eq!(view.visible_rows().len(), 3);
        assert!(view.footer().is_none());
    }

    #[test]
    fn test_toggle_sort_cycles() {
        let mut view = TableView::new(&numbered(3), false);
        assert_eq!(view.toggle_sort("id"), Some(SortOrder::Asc));
        assert_eq!(view.toggle_sort("id"), Some(SortOrder::Desc));
        assert_eq!(view.visible_rows()[0][0], "2");
        assert_eq!(view.toggle_sort("id"), None);
        assert_eq!(view.visible_rows()[0][0], "0");
        view.toggle_sort("id");
        assert_eq!(view.toggle_sort("name"), Some(SortOrder::Asc));
    }

    #[test]
    fn test_header_sort_stays_within_page() {
        let mut view = TableView::new(&numbered(150), false);
        view.toggle_sort("id");
        view.toggle_sort("id");
        // Descending on page one starts at the page's own maximum.
        assert_eq!(view.visible_rows()[0][0], "99");
        view.next_page();
        assert_eq!(view.visible_rows()[0][0], "149");
    }

    #[test]
    fn test_spec_sort_orders_full_table() {
        let spec = ChartSpec::from_value(json!({
            "chart_type": "table",
            "sort": {"field": "n", "order": "desc"},
            "data": [{"n": 1}, {"n": 3}, {"n": 2}]
        }))
        .unwrap();
        let cells: Vec<String> = TableView::new(&spec, false)
            .visible_rows()
            .into_iter()
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(cells, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_cell_formatting_and_text() {
        let spec = ChartSpec::from_value(json!({
            "chart_type": "table",
            "data": [{"name": "a", "amount": 1234567.5, "note": null}]
        }))
        .unwrap();
        let text = TableView::new(&spec, false).render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name  amount       note");
        assert_eq!(lines[2], "a     1,234,567.5");
    }
}
