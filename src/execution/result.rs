//! Query Result - rows returned by the dataset store and their text form

use serde::{Deserialize, Serialize};

/// Rows and columns returned by a successful query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTable {
    /// Column names, in select order
    pub columns: Vec<String>,

    /// One entry per row, aligned with `columns`
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Align {
    Left,
    Right,
}

impl QueryTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render as a markdown pipe table with a leading row-index column.
    ///
    /// Numeric columns are right-aligned, everything else left-aligned.
    pub fn to_markdown(&self) -> String {
        let mut headers = vec![String::new()];
        headers.extend(self.columns.iter().cloned());

        let mut aligns = vec![Align::Right];
        aligns.extend((0..self.columns.len()).map(|c| self.column_alignment(c)));

        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut cells = vec![idx.to_string()];
                cells.extend((0..self.columns.len()).map(|c| format_cell(row.get(c))));
                cells
            })
            .collect();

        let widths: Vec<usize> = (0..headers.len())
            .map(|c| {
                body.iter()
                    .map(|row| row[c].chars().count())
                    .chain(std::iter::once(headers[c].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(body.len() + 2);
        lines.push(format_line(&headers, &widths, &aligns));
        lines.push(format_separator(&widths, &aligns));
        for row in &body {
            lines.push(format_line(row, &widths, &aligns));
        }
        lines.join("\n")
    }

    fn column_alignment(&self, column: usize) -> Align {
        let mut saw_number = false;
        for row in &self.rows {
            match row.get(column) {
                Some(serde_json::Value::Number(_)) => saw_number = true,
                Some(serde_json::Value::Null) | None => {}
                Some(_) => return Align::Left,
            }
        }
        if saw_number {
            Align::Right
        } else {
            Align::Left
        }
    }
}

fn format_cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => "None".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn format_line(cells: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .zip(aligns)
        .map(|((cell, &width), align)| match align {
            Align::Right => format!(" {:>width$} ", cell, width = width),
            Align::Left => format!(" {:<width$} ", cell, width = width),
        })
        .collect();
    format!("|{}|", padded.join("|"))
}

fn format_separator(widths: &[usize], aligns: &[Align]) -> String {
    let parts: Vec<String> = widths
        .iter()
        .zip(aligns)
        .map(|(&width, align)| match align {
            Align::Right => format!("{}:", "-".repeat(width + 1)),
            Align::Left => format!(":{}", "-".repeat(width + 1)),
        })
        .collect();
    format!("|{}|", parts.join("|"))
}
