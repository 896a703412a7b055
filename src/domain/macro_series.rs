//! Macroeconomic series and the economist-style synthesis over their latest
//! values.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::DashboardError;
use crate::ports::llm_port::LanguageModelPort;
use crate::ports::macro_port::MacroPort;

pub type SharedMacro = Arc<dyn MacroPort + Send + Sync>;
pub type SharedLlm = Arc<dyn LanguageModelPort + Send + Sync>;

pub const DEFAULT_YEARS: u32 = 2;

pub const LLM_UNAVAILABLE: &str =
    "Synthesis failed: Gemini API key not found or client could not be initialized.";
pub const MACRO_UNAVAILABLE: &str = "Synthesis failed: FRED client not initialized.";

const ECONOMIST_INSTRUCTION: &str = "You are a Chief Economist providing a macro-economic outlook. \
Your analysis must be objective, concise, and focused on the interaction between indicators. \
Use the provided data exclusively.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroObservation {
    #[serde(rename = "Date", serialize_with = "serialize_date")]
    pub date: NaiveDate,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Series")]
    pub series: String,
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&date.format("%Y-%m-%d").to_string())
}

/// One requested indicator: display label, series id and unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSpec(pub String, pub String, pub String);

impl IndicatorSpec {
    pub fn new(label: &str, series_id: &str, unit: &str) -> Self {
        Self(label.to_string(), series_id.to_string(), unit.to_string())
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    pub fn series_id(&self) -> &str {
        &self.1
    }

    pub fn unit(&self) -> &str {
        &self.2
    }
}

/// Group name to indicators. Groups keep the order they were inserted in.
pub type IndicatorGroups = Vec<(String, Vec<IndicatorSpec>)>;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub label: String,
    pub series_id: String,
    pub value: f64,
    pub unit: String,
    pub frequency: String,
}

/// First day of a `years`-long window ending `today`, counting 365 days per
/// year. Windows reaching before the representable calendar are rejected.
pub fn observation_start(today: NaiveDate, years: u32) -> Result<NaiveDate, DashboardError> {
    Duration::try_days(i64::from(years) * 365)
        .and_then(|span| today.checked_sub_signed(span))
        .ok_or_else(|| DashboardError::invalid(format!("years out of range: {years}")))
}

/// Observations labelled with `label`, oldest first.
pub async fn fetch_series(
    port: &SharedMacro,
    series_id: &str,
    label: &str,
    start: NaiveDate,
) -> Result<Vec<MacroObservation>, DashboardError> {
    let points = port.observations(series_id, start).await?;
    if points.is_empty() {
        tracing::warn!(series_id, label, "no observations returned");
    }
    Ok(points
        .into_iter()
        .map(|(date, value)| MacroObservation {
            date,
            value,
            series: label.to_string(),
        })
        .collect())
}

pub fn format_data_points(groups: &[(String, Vec<IndicatorSnapshot>)]) -> String {
    let mut out = String::from("Economic Data Points:\n\n");
    for (group, items) in groups {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "--- {group} ---");
        for item in items {
            let _ = writeln!(
                out,
                "{} ({}) [{}]: {:.2} {}",
                item.label, item.series_id, item.frequency, item.value, item.unit
            );
        }
    }
    out
}

/// System instruction and user query for the synthesis call.
pub fn synthesis_prompt(data: &str, focus: &str) -> (&'static str, String) {
    let query = format!(
        "Analyze the following economic data across all provided groups (Leading, Monetary, Lagging). \
Formulate a conclusion based on how these recent values converge or diverge, especially concerning the user's focus on: '{focus}'. \
Structure your response with:\n\n\
1. **Summary of Key Trends:** (Identify 2-3 most important signals, e.g., strong labor market despite high rates).\n\
2. **Conclusive Outlook:** (A single sentence predicting the short-term direction of the economy).\n\n\
Data to Analyze:\n{data}"
    );
    (ECONOMIST_INSTRUCTION, query)
}

async fn snapshot(port: &SharedMacro, indicator: &IndicatorSpec) -> Result<IndicatorSnapshot, DashboardError> {
    let value = port
        .latest_value(indicator.series_id())
        .await?
        .ok_or_else(|| DashboardError::NoData {
            what: format!("latest value for {}", indicator.series_id()),
        })?;
    let frequency = port.frequency(indicator.series_id()).await?;
    Ok(IndicatorSnapshot {
        label: indicator.label().to_string(),
        series_id: indicator.series_id().to_string(),
        value,
        unit: indicator.unit().to_string(),
        frequency,
    })
}

/// Gathers the latest value of every indicator and asks the model for a
/// conclusion. Always yields text: failures are reported in-band.
pub async fn synthesize(
    macro_port: Option<&SharedMacro>,
    llm: Option<&SharedLlm>,
    groups: &IndicatorGroups,
    focus: &str,
) -> String {
    let Some(llm) = llm else {
        return LLM_UNAVAILABLE.to_string();
    };
    let Some(macro_port) = macro_port else {
        return MACRO_UNAVAILABLE.to_string();
    };

    let mut gathered: Vec<(String, Vec<IndicatorSnapshot>)> = Vec::with_capacity(groups.len());
    for (group, indicators) in groups {
        let mut items = Vec::new();
        for indicator in indicators {
            match snapshot(macro_port, indicator).await {
                Ok(s) => items.push(s),
                Err(e) => {
                    tracing::warn!(series_id = indicator.series_id(), error = %e, "skipping indicator");
                }
            }
        }
        gathered.push((group.clone(), items));
    }

    let data = format_data_points(&gathered);
    let (system, query) = synthesis_prompt(&data, focus);
    match llm.generate(Some(system), &query).await {
        Ok(text) => text,
        Err(e) => format!("AI Synthesis Error: Failed to generate conclusion. Details: {e}"),
    }
}

/// Converts the request's `{group: [[label, id, unit], ...]}` shape, keeping
/// the groups in request order and dropping malformed entries.
pub fn groups_from_map(raw: Map<String, Value>) -> IndicatorGroups {
    raw.into_iter()
        .map(|(group, items)| {
            let indicators = items
                .as_array()
                .map(|items| items.iter().filter_map(indicator_from).collect())
                .unwrap_or_default();
            (group, indicators)
        })
        .collect()
}

fn indicator_from(item: &Value) -> Option<IndicatorSpec> {
    let fields: Vec<&str> = item
        .as_array()?
        .iter()
        .map(Value::as_str)
        .collect::<Option<_>>()?;
    match fields.as_slice() {
        [label, id, unit, ..] => Some(IndicatorSpec::new(label, id, unit)),
        [label, id] => Some(IndicatorSpec::new(label, id, "")),
        _ => None,
    }
}
