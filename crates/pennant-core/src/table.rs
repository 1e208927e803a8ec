// HTML table extraction.
//
// Every `<table>` on a page becomes a `Table`: an ordered list of rows, each
// an ordered list of cells. Header rows are kept in place so callers can
// decide which rows to skip (the standings roster drops its first and last
// rows, schedule tables drop repeated header rows mid-table).

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TableError {
    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },
}

/// A single `<th>` or `<td>` cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    /// Visible text with whitespace collapsed and trimmed.
    pub text: String,
    /// `href` of the first link inside the cell, if any.
    pub href: Option<String>,
}

impl Cell {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            href: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// One `<tr>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Text of the cell at `index`, `None` when absent or blank.
    pub fn text_at(&self, index: usize) -> Option<&str> {
        self.cell(index)
            .filter(|c| !c.is_blank())
            .map(|c| c.text.as_str())
    }

    /// First cell carrying a link, as `(text, href)`.
    pub fn first_link(&self) -> Option<(&str, &str)> {
        self.cells
            .iter()
            .find_map(|c| c.href.as_deref().map(|h| (c.text.as_str(), h)))
    }
}

/// A parsed HTML table, rows in document order (header rows included).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// The first row, conventionally the column headers.
    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Every row after the header.
    pub fn body(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Index of the first header cell whose text equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header()?.cells.iter().position(|c| c.text == name)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn selector(css: &str) -> Result<Selector, TableError> {
    Selector::parse(css).map_err(|e| TableError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// Parse every `<table>` in `html`, in document order.
pub fn parse_tables(html: &str) -> Result<Vec<Table>, TableError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;
    let link_sel = selector("a[href]")?;

    let tables = document
        .select(&table_sel)
        .map(|table| {
            let rows = table
                .select(&row_sel)
                .map(|tr| {
                    Row::new(
                        tr.select(&cell_sel)
                            .map(|cell| parse_cell(cell, &link_sel))
                            .collect(),
                    )
                })
                .collect();
            Table::new(rows)
        })
        .collect();

    Ok(tables)
}

fn parse_cell(cell: ElementRef<'_>, link_sel: &Selector) -> Cell {
    let raw: String = cell.text().collect();
    let href = cell
        .select(link_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);
    Cell {
        text: normalize_ws(&raw),
        href,
    }
}

/// Remove HTML comment markers so tables the site ships commented-out
/// (and un-comments client side) become part of the document.
pub fn strip_comment_markers(html: &str) -> String {
    html.replace("<!--", "").replace("-->", "")
}

/// Collapse runs of whitespace (including non-breaking spaces) to one space
/// and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
