//! Statement pivoting: rows-per-report into rows-per-line-item.
//!
//! A [`StatementTable`] keeps the raw numbers, oldest period first, together
//! with the unit scale chosen for the whole table. [`StatementTable::render`]
//! produces the display strings and per-cell trend used for colouring.

use crate::domain::format::{
    format_percent, growth_trends, humanize_label, period_label, sign_trend, Trend, UnitScale,
    MISSING,
};
use crate::domain::ratios::safe_div;
use crate::domain::statement::{filter_by_period, PeriodType, StatementKind, StatementRow};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub name: String,
    pub cells: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementTable {
    pub label: String,
    pub period: PeriodType,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    pub scale: UnitScale,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCell {
    pub text: String,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

impl RenderedCell {
    fn new(text: String, trend: Trend) -> Self {
        Self {
            text,
            trend,
            color: trend.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub name: String,
    pub cells: Vec<RenderedCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTable {
    pub label: String,
    pub columns: Vec<String>,
    pub rows: Vec<RenderedRow>,
    pub caption: Option<String>,
    pub suffix: String,
}

/// Pivots statement rows for one period type. `None` when no row survives
/// the period filter.
pub fn build_statement_table(
    kind: StatementKind,
    rows: &[StatementRow],
    period: PeriodType,
) -> Option<StatementTable> {
    let mut filtered = filter_by_period(rows, period);
    if filtered.is_empty() {
        return None;
    }
    filtered.sort_by_key(|r| r.date);

    let item_names: Vec<String> = match kind.field_order() {
        Some(order) => order
            .iter()
            .filter(|field| filtered.iter().any(|r| r.has_item(field)))
            .map(|field| field.to_string())
            .collect(),
        None => {
            let mut names: Vec<String> = Vec::new();
            for row in &filtered {
                for (name, _) in &row.items {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
            names
        }
    };

    let columns = filtered
        .iter()
        .map(|r| period_label(r.date, period))
        .collect();

    let table_rows: Vec<TableRow> = item_names
        .iter()
        .map(|name| TableRow {
            name: humanize_label(name),
            cells: filtered.iter().map(|r| r.value(name)).collect(),
        })
        .collect();

    let scale = UnitScale::for_values(
        table_rows
            .iter()
            .flat_map(|r| r.cells.iter().flatten().copied()),
    );

    Some(StatementTable {
        label: kind.label().to_string(),
        period,
        columns,
        rows: table_rows,
        scale,
    })
}

impl StatementTable {
    pub fn render(&self) -> RenderedTable {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let trends = growth_trends(&row.cells);
                RenderedRow {
                    name: row.name.clone(),
                    cells: row
                        .cells
                        .iter()
                        .zip(trends)
                        .map(|(cell, trend)| {
                            let text = match cell {
                                Some(v) => self.scale.apply(*v),
                                None => MISSING.to_string(),
                            };
                            RenderedCell::new(text, trend)
                        })
                        .collect(),
                }
            })
            .collect();

        RenderedTable {
            label: self.label.clone(),
            columns: self.columns.clone(),
            rows,
            caption: Some(self.scale.caption()),
            suffix: self.scale.suffix().to_string(),
        }
    }

    /// Period-over-period change per line item as fractions; the first column
    /// has no predecessor and is dropped.
    pub fn yoy_changes(&self) -> Vec<TableRow> {
        self.rows
            .iter()
            .map(|row| TableRow {
                name: row.name.clone(),
                cells: row
                    .cells
                    .windows(2)
                    .map(|pair| match (pair[0], pair[1]) {
                        (Some(prev), Some(curr)) => Some(safe_div(curr - prev, prev.abs())),
                        _ => None,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Rendered year-over-year table, coloured by sign.
    pub fn render_yoy(&self) -> RenderedTable {
        let columns = self.columns.iter().skip(1).cloned().collect();
        let rows = self
            .yoy_changes()
            .into_iter()
            .map(|row| RenderedRow {
                name: row.name,
                cells: row
                    .cells
                    .into_iter()
                    .map(|c| RenderedCell::new(format_percent(c, 2), sign_trend(c)))
                    .collect(),
            })
            .collect();

        RenderedTable {
            label: format!("{} (YoY %)", self.label),
            columns,
            rows,
            caption: None,
            suffix: "%".to_string(),
        }
    }
}

impl RenderedTable {
    /// Fixed-width plain text, for terminals.
    pub fn to_text(&self) -> String {
        let mut widths = Vec::with_capacity(self.columns.len() + 1);
        widths.push(
            self.rows
                .iter()
                .map(|r| r.name.chars().count())
                .chain(std::iter::once(self.label.chars().count()))
                .max()
                .unwrap_or(0),
        );
        for (i, col) in self.columns.iter().enumerate() {
            let cell_width = self
                .rows
                .iter()
                .filter_map(|r| r.cells.get(i))
                .map(|c| c.text.chars().count())
                .max()
                .unwrap_or(0);
            widths.push(cell_width.max(col.chars().count()));
        }

        let mut out = String::new();
        if let Some(caption) = &self.caption {
            out.push_str(caption);
            out.push('\n');
        }
        out.push_str(&format!("{:<w$}", self.label, w = widths[0]));
        for (i, col) in self.columns.iter().enumerate() {
            out.push_str(&format!("  {:>w$}", col, w = widths[i + 1]));
        }
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format!("{:<w$}", row.name, w = widths[0]));
            for (i, cell) in row.cells.iter().enumerate() {
                out.push_str(&format!("  {:>w$}", cell.text, w = widths[i + 1]));
            }
            out.push('\n');
        }
        out
    }
}
