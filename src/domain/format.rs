//! Number, label and period formatting for tabular output.
//!
//! Unit scale selection works on the largest absolute value in a table so
//! that every cell of one table shares a suffix.

use crate::domain::statement::PeriodType;
use chrono::{Datelike, NaiveDate};

pub const MISSING: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum UnitScale {
    #[default]
    Ones,
    Thousands,
    Millions,
    Billions,
    Trillions,
}

impl UnitScale {
    pub fn for_max_abs(max_abs: f64) -> Self {
        let v = max_abs.abs();
        if !v.is_finite() {
            return Self::Ones;
        }
        if v >= 1e12 {
            Self::Trillions
        } else if v >= 1e9 {
            Self::Billions
        } else if v >= 1e6 {
            Self::Millions
        } else if v >= 1e3 {
            Self::Thousands
        } else {
            Self::Ones
        }
    }

    /// Scale for a set of values; `Ones` when there are none.
    pub fn for_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let max_abs = values
            .into_iter()
            .filter(|v| v.is_finite())
            .map(f64::abs)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
        max_abs.map_or(Self::Ones, Self::for_max_abs)
    }

    pub fn divisor(self) -> f64 {
        match self {
            Self::Ones => 1.0,
            Self::Thousands => 1e3,
            Self::Millions => 1e6,
            Self::Billions => 1e9,
            Self::Trillions => 1e12,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Ones => "",
            Self::Thousands => "K",
            Self::Millions => "M",
            Self::Billions => "B",
            Self::Trillions => "T",
        }
    }

    pub fn caption(self) -> String {
        format!(
            "All values shown in {suffix} (e.g., 1.25{suffix} = {unit})",
            suffix = self.suffix(),
            unit = format_grouped(self.divisor(), 0)
        )
    }

    pub fn apply(self, value: f64) -> String {
        format_grouped(value / self.divisor(), 2)
    }
}

/// Comma-grouped rendering with a fixed number of decimals.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let negative = value < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Compact rendering for cards and comparison cells: `1.50B`, `2.30M`, `950.00`.
pub fn format_num(value: Option<f64>) -> String {
    let Some(n) = value.filter(|v| v.is_finite()) else {
        return MISSING.to_string();
    };
    if n.abs() >= 1e9 {
        format!("{:.2}B", n / 1e9)
    } else if n.abs() >= 1e6 {
        format!("{:.2}M", n / 1e6)
    } else {
        format_grouped(n, 2)
    }
}

pub fn format_ratio(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{v:.2}"),
        None => MISSING.to_string(),
    }
}

pub fn format_percent(value: Option<f64>, decimals: usize) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{:.*}%", decimals, v * 100.0),
        None => MISSING.to_string(),
    }
}

/// Parses a rendered cell back into a number, accepting grouping commas and a
/// trailing percent sign.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned);
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `net_cash_from_operating_activities` -> `Net Cash From Operating Activities`
pub fn humanize_label(column: &str) -> String {
    column
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// Column header for a report date: `2023` or `2023 Q4`.
pub fn period_label(date: NaiveDate, period: PeriodType) -> String {
    match period {
        PeriodType::Annual => date.year().to_string(),
        PeriodType::Quarterly => format!("{} Q{}", date.year(), quarter_of(date)),
    }
}

/// Direction of a cell relative to a reference, used for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
    Unknown,
}

impl Trend {
    pub fn color(self) -> Option<&'static str> {
        match self {
            Self::Up => Some("#6FCF97"),
            Self::Down => Some("#D87C6E"),
            Self::Flat => Some("white"),
            Self::Unknown => None,
        }
    }
}

/// Each cell compared with the one before it; the first cell has no trend.
pub fn growth_trends(cells: &[Option<f64>]) -> Vec<Trend> {
    let mut trends = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        if i == 0 {
            trends.push(Trend::Unknown);
            continue;
        }
        let trend = match (cells[i - 1], *cell) {
            (Some(prev), Some(curr)) if prev.is_finite() && curr.is_finite() => {
                if curr > prev {
                    Trend::Up
                } else if curr < prev {
                    Trend::Down
                } else {
                    Trend::Flat
                }
            }
            _ => Trend::Unknown,
        };
        trends.push(trend);
    }
    trends
}

pub fn sign_trend(value: Option<f64>) -> Trend {
    match value.filter(|v| v.is_finite()) {
        Some(v) if v > 0.0 => Trend::Up,
        Some(v) if v < 0.0 => Trend::Down,
        Some(_) => Trend::Flat,
        None => Trend::Unknown,
    }
}
