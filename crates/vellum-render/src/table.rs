//! Table accumulation and box-drawing rendering.
//!
//! The builder collects cell text row by row; the terminal layout stage
//! turns the structured rows into box-drawn lines. A layout stage with a
//! richer table model can ignore the lines and consume the rows directly.

use crate::node::{TableCell, TableRow};

/// Accumulates rows and cells while the builder walks a `<table>` subtree.
#[derive(Debug, Default)]
pub(crate) struct TableScratch {
    rows: Vec<TableRow>,
    current_row: Option<Vec<TableCell>>,
    current_cell: Option<TableCell>,
}

impl TableScratch {
    pub fn start_row(&mut self) {
        self.end_row();
        self.current_row = Some(Vec::new());
    }

    pub fn end_row(&mut self) {
        self.end_cell();
        if let Some(cells) = self.current_row.take() {
            self.rows.push(TableRow { cells });
        }
    }

    pub fn start_cell(&mut self, header: bool) {
        self.end_cell();
        if self.current_row.is_none() {
            self.current_row = Some(Vec::new());
        }
        self.current_cell = Some(TableCell {
            text: String::new(),
            header,
        });
    }

    pub fn end_cell(&mut self) {
        if let Some(cell) = self.current_cell.take()
            && let Some(row) = self.current_row.as_mut()
        {
            row.push(cell);
        }
    }

    /// Append text into the open cell. Text outside any cell is dropped;
    /// the tree builder has already foster-parented anything significant.
    pub fn push_text(&mut self, text: &str) {
        if let Some(cell) = self.current_cell.as_mut() {
            let collapsed = collapse_whitespace(text);
            if !collapsed.trim().is_empty() || !cell.text.is_empty() {
                cell.text.push_str(&collapsed);
            }
        }
    }

    pub fn in_cell(&self) -> bool {
        self.current_cell.is_some()
    }

    pub fn finish(mut self) -> Vec<TableRow> {
        self.end_row();
        for row in &mut self.rows {
            for cell in &mut row.cells {
                cell.text = cell.text.trim().to_string();
            }
        }
        self.rows
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}

/// Render structured rows as box-drawn lines.
///
/// Borders use U+2500-range box-drawing characters; when the first row
/// consists of header cells it is separated from the body with a
/// double-stroke rule (`╞═╪═╡`).
///
/// ```text
/// ┌──────┬─────┐
/// │ name │ age │
/// ╞══════╪═════╡
/// │ ada  │ 36  │
/// └──────┴─────┘
/// ```
#[must_use]
pub fn ascii_table(rows: &[TableRow]) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }
    let columns = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.cells.iter().enumerate() {
            widths[i] = widths[i].max(cell.text.chars().count());
        }
    }

    let rule = |left: char, fill: char, joint: char, right: char| {
        let mut line = String::new();
        line.push(left);
        for (i, width) in widths.iter().enumerate() {
            if i > 0 {
                line.push(joint);
            }
            line.extend(std::iter::repeat_n(fill, width + 2));
        }
        line.push(right);
        line
    };

    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(rule('┌', '─', '┬', '┐'));
    let header_first = rows[0].cells.iter().all(|c| c.header) && !rows[0].cells.is_empty();
    for (index, row) in rows.iter().enumerate() {
        let mut line = String::from('│');
        for (i, width) in widths.iter().enumerate() {
            let text = row.cells.get(i).map_or("", |c| c.text.as_str());
            let pad = width - text.chars().count();
            line.push(' ');
            line.push_str(text);
            line.extend(std::iter::repeat_n(' ', pad + 1));
            line.push('│');
        }
        lines.push(line);
        if index == 0 && header_first && rows.len() > 1 {
            lines.push(rule('╞', '═', '╪', '╡'));
        }
    }
    lines.push(rule('└', '─', '┴', '┘'));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str, header: bool) -> TableCell {
        TableCell {
            text: text.into(),
            header,
        }
    }

    #[test]
    fn renders_boxed_lines_with_header_separator() {
        let rows = vec![
            TableRow {
                cells: vec![cell("name", true), cell("age", true)],
            },
            TableRow {
                cells: vec![cell("ada", false), cell("36", false)],
            },
        ];
        let lines = ascii_table(&rows);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "┌──────┬─────┐");
        assert_eq!(lines[1], "│ name │ age │");
        assert_eq!(lines[2], "╞══════╪═════╡");
        assert_eq!(lines[3], "│ ada  │ 36  │");
        assert_eq!(lines[4], "└──────┴─────┘");
    }

    #[test]
    fn body_only_table_has_no_header_rule() {
        let rows = vec![TableRow {
            cells: vec![cell("x", false)],
        }];
        let lines = ascii_table(&rows);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| !l.contains('╪')));
    }

    #[test]
    fn ragged_rows_pad_to_the_widest() {
        let rows = vec![
            TableRow {
                cells: vec![cell("a", false), cell("b", false)],
            },
            TableRow {
                cells: vec![cell("only", false)],
            },
        ];
        let lines = ascii_table(&rows);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn scratch_accumulates_rows_and_cells() {
        let mut scratch = TableScratch::default();
        scratch.start_row();
        scratch.start_cell(true);
        scratch.push_text("h");
        scratch.start_cell(false);
        scratch.push_text("  a  b  ");
        scratch.end_row();
        let rows = scratch.finish();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells[0].text, "h");
        assert!(rows[0].cells[0].header);
        assert_eq!(rows[0].cells[1].text, "a b");
    }
}
