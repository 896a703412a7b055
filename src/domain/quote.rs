//! Quote-provider types: company overview and price history.

use crate::domain::error::DashboardError;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyOverview {
    pub name: Option<String>,
    pub ticker: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub beta: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub price: Option<f64>,
    pub currency: String,
    pub website: Option<String>,
    pub logo_url: Option<String>,
}

impl CompanyOverview {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            currency: "USD".to_string(),
            ..Self::default()
        }
    }

    /// Providers answer unknown tickers with a near-empty record; only a
    /// price or a name makes it a real company.
    pub fn is_meaningful(&self) -> bool {
        self.price.is_some() || self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&date.format("%Y-%m-%d").to_string())
}

const RANGES: [&str; 11] = [
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];
const INTERVALS: [&str; 13] = [
    "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
];

/// Look-back window for price history, in the provider's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRange(String);

impl Default for HistoryRange {
    fn default() -> Self {
        Self("1y".to_string())
    }
}

impl FromStr for HistoryRange {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if RANGES.contains(&s.as_str()) {
            Ok(Self(s))
        } else {
            Err(DashboardError::invalid(format!(
                "unsupported period '{s}', expected one of {}",
                RANGES.join(", ")
            )))
        }
    }
}

impl HistoryRange {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bar size for price history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryInterval(String);

impl Default for HistoryInterval {
    fn default() -> Self {
        Self("1d".to_string())
    }
}

impl FromStr for HistoryInterval {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if INTERVALS.contains(&s.as_str()) {
            Ok(Self(s))
        } else {
            Err(DashboardError::invalid(format!(
                "unsupported interval '{s}', expected one of {}",
                INTERVALS.join(", ")
            )))
        }
    }
}

impl HistoryInterval {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HistoryInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overview_requires_price_or_name() {
        let mut o = CompanyOverview::new("aapl");
        assert_eq!(o.ticker, "AAPL");
        assert_eq!(o.currency, "USD");
        assert!(!o.is_meaningful());
        o.name = Some("  ".into());
        assert!(!o.is_meaningful());
        o.price = Some(189.5);
        assert!(o.is_meaningful());
    }

    #[test]
    fn ranges_and_intervals_validate() {
        assert_eq!("6MO".parse::<HistoryRange>().unwrap().as_str(), "6mo");
        assert!("7y".parse::<HistoryRange>().is_err());
        assert_eq!(HistoryInterval::default().as_str(), "1d");
        assert!("1wk".parse::<HistoryInterval>().is_ok());
        assert!("2wk".parse::<HistoryInterval>().is_err());
    }

    #[test]
    fn price_bar_serializes_plain_date() {
        let bar = PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 100,
        };
        let json = serde_json::to_value(&bar).unwrap();
        assert_eq!(json["date"], "2024-05-01");
        assert_eq!(json["volume"], 100);
    }
}
