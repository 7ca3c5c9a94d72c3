//! Column layout for styled text.
//!
//! A [`TextTable`] lays out rows of cells in fixed-width columns. A
//! [`Overflow::Span`] cell may run past its column into the ones to its
//! right; a [`Overflow::Wrap`] cell is word-wrapped inside its column. When
//! a cell would start left of the text already on the current line, it moves
//! to a new line at its own column. Lines never exceed the table width and
//! carry no trailing whitespace.

use crate::markup::Text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Span,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub width: usize,
    /// Leading spaces inside the column.
    pub indent: usize,
    pub overflow: Overflow,
}

impl Column {
    pub fn new(width: usize, indent: usize, overflow: Overflow) -> Self {
        Self {
            width,
            indent,
            overflow,
        }
    }
}

#[derive(Debug, Default)]
struct Line {
    text: Text,
    cursor: usize,
}

impl Line {
    fn place(&mut self, x: usize, text: Text) {
        if text.is_empty() {
            return;
        }
        if x > self.cursor {
            self.text.push_str(&" ".repeat(x - self.cursor));
            self.cursor = x;
        }
        self.cursor += text.width();
        self.text.push(text);
    }
}

#[derive(Debug, Clone)]
pub struct TextTable {
    columns: Vec<Column>,
    rows: Vec<Vec<Text>>,
}

impl TextTable {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Total width of all columns.
    pub fn width(&self) -> usize {
        self.columns.iter().map(|c| c.width).sum()
    }

    /// Adds a row; missing trailing cells are empty, extra cells are dropped.
    pub fn add_row(&mut self, cells: Vec<Text>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders every row, one `\n`-terminated line per output line.
    pub fn render(&self, ansi: bool) -> String {
        let mut out = String::new();
        for row in &self.rows {
            for line in self.layout(row) {
                out.push_str(&line.text.render(ansi));
                out.push('\n');
            }
        }
        out
    }

    fn layout(&self, row: &[Text]) -> Vec<Line> {
        let total = self.width();
        let mut lines = vec![Line::default()];
        let mut current = 0;
        let mut start = 0;

        for (column, cell) in self.columns.iter().zip(row) {
            let x = start + column.indent;
            start += column.width;
            if cell.is_empty() {
                continue;
            }

            let cursor = lines[current].cursor;
            let collides = match column.overflow {
                Overflow::Span => cursor > x,
                Overflow::Wrap => cursor > x || (cursor == x && cursor > 0),
            };
            if collides {
                lines.push(Line::default());
                current = lines.len() - 1;
            }

            let available = match column.overflow {
                Overflow::Span => total.saturating_sub(x),
                Overflow::Wrap => column.width.saturating_sub(column.indent),
            };
            for (i, piece) in cell.wrap(available).into_iter().enumerate() {
                if i > 0 {
                    lines.push(Line::default());
                    current = lines.len() - 1;
                }
                lines[current].place(x, piece);
            }
        }
        lines
    }
}
