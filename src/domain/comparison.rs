//! Side-by-side comparison of several companies.

use crate::domain::format::{format_num, humanize_label};
use crate::domain::ratios::{RatioKind, RatioSet};
use crate::domain::statement::StatementRow;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub cells: Vec<String>,
    /// Columns holding the row's largest value; every tied column is listed.
    pub best: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub tickers: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

fn best_indices(values: &[Option<f64>]) -> Vec<usize> {
    let finite: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();
    let Some(max) = finite.iter().map(|(_, x)| *x).reduce(f64::max) else {
        return Vec::new();
    };
    finite
        .into_iter()
        .filter(|(_, x)| *x == max)
        .map(|(i, _)| i)
        .collect()
}

/// One column per ticker with a snapshot; line items are the union across
/// snapshots in first-seen order.
pub fn compare_latest(snapshots: &[(String, Option<StatementRow>)]) -> Option<ComparisonTable> {
    let present: Vec<(&String, &StatementRow)> = snapshots
        .iter()
        .filter_map(|(t, row)| row.as_ref().map(|r| (t, r)))
        .collect();
    if present.is_empty() {
        return None;
    }

    let mut names: Vec<&str> = Vec::new();
    for (_, row) in &present {
        for (name, _) in &row.items {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
    }

    let rows = names
        .into_iter()
        .map(|name| {
            let values: Vec<Option<f64>> = present.iter().map(|(_, r)| r.value(name)).collect();
            ComparisonRow {
                name: humanize_label(name),
                cells: values.iter().map(|v| format_num(*v)).collect(),
                best: best_indices(&values),
                values,
            }
        })
        .collect();

    Some(ComparisonTable {
        tickers: present.iter().map(|(t, _)| t.to_string()).collect(),
        rows,
    })
}

pub fn compare_ratios(sets: &[(String, RatioSet)]) -> Option<ComparisonTable> {
    if sets.is_empty() {
        return None;
    }
    let rows = RatioKind::ALL
        .into_iter()
        .map(|kind| {
            let values: Vec<Option<f64>> = sets.iter().map(|(_, s)| s.get(kind)).collect();
            ComparisonRow {
                name: kind.label().to_string(),
                cells: values.iter().map(|v| kind.format(*v)).collect(),
                best: best_indices(&values),
                values,
            }
        })
        .collect();
    Some(ComparisonTable {
        tickers: sets.iter().map(|(t, _)| t.clone()).collect(),
        rows,
    })
}

/// Percentage change of each series relative to its first close.
pub fn relative_performance(
    series: &[(String, Vec<(NaiveDate, f64)>)],
) -> BTreeMap<String, Vec<(NaiveDate, f64)>> {
    series
        .iter()
        .filter_map(|(ticker, points)| {
            let base = points.first().map(|(_, p)| *p).filter(|p| *p != 0.0)?;
            let normalized = points
                .iter()
                .map(|(d, p)| (*d, (p / base - 1.0) * 100.0))
                .collect();
            Some((ticker.clone(), normalized))
        })
        .collect()
}
