//! Request, response and domain types for the forecast service.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};

// ---

/// Number of future steps forecast for every parameter.
pub const FORECAST_HORIZON: usize = 5;

/// The water-quality measurements this service forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Biochemical oxygen demand
    Bod,
    /// Dissolved oxygen
    DissolvedOxygen,
    Ph,
    Nitrate,
    FecalColiform,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Parameter::Bod,
        Parameter::DissolvedOxygen,
        Parameter::Ph,
        Parameter::Nitrate,
        Parameter::FecalColiform,
    ];

    /// Field name used in historical records.
    pub fn name(self) -> &'static str {
        match self {
            Parameter::Bod => "bod",
            Parameter::DissolvedOxygen => "do",
            Parameter::Ph => "ph",
            Parameter::Nitrate => "nitrate",
            Parameter::FecalColiform => "fecalColiform",
        }
    }

    /// Key used for this parameter in the forecast response.
    pub fn forecast_key(self) -> &'static str {
        match self {
            Parameter::Bod => "bod_forecast",
            Parameter::DissolvedOxygen => "do_forecast",
            Parameter::Ph => "ph_forecast",
            Parameter::Nitrate => "nitrate_forecast",
            Parameter::FecalColiform => "fecalColiform_forecast",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---

/// Body of `POST /predict`.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    // ---
    #[serde(rename = "locationId")]
    pub location_id: LocationId,
    pub historical_data: Vec<HistoricalRecord>,
}

/// Caller-supplied location identifier.
///
/// Only its presence is required; any JSON value is accepted and it is used
/// for logging only.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationId(serde_json::Value);

impl<'de> Deserialize<'de> for LocationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // An absent key still fails as a missing field
        serde_json::Value::deserialize(deserializer).map(LocationId)
    }
}

impl From<&str> for LocationId {
    fn from(id: &str) -> Self {
        LocationId(serde_json::Value::String(id.to_string()))
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(id) => f.write_str(id),
            other => write!(f, "{other}"),
        }
    }
}

/// One timestamped row of measurements.
///
/// Unknown fields are ignored; each tracked parameter may be absent, null,
/// or carry a value.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalRecord {
    // ---
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub bod: Reading,
    #[serde(default, rename = "do")]
    pub dissolved_oxygen: Reading,
    #[serde(default)]
    pub ph: Reading,
    #[serde(default)]
    pub nitrate: Reading,
    #[serde(default, rename = "fecalColiform")]
    pub fecal_coliform: Reading,
}

impl HistoricalRecord {
    pub fn reading(&self, parameter: Parameter) -> &Reading {
        match parameter {
            Parameter::Bod => &self.bod,
            Parameter::DissolvedOxygen => &self.dissolved_oxygen,
            Parameter::Ph => &self.ph,
            Parameter::Nitrate => &self.nitrate,
            Parameter::FecalColiform => &self.fecal_coliform,
        }
    }
}

/// A single parameter's cell in a historical record.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Reading {
    /// The key is not present in the record.
    #[default]
    Absent,
    /// The key is present with a `null` value.
    Missing,
    Value(f64),
    /// Present but not a number; holds the raw JSON text.
    Malformed(String),
}

impl Reading {
    /// Whether the record's schema carries this parameter at all.
    pub fn is_present(&self) -> bool {
        !matches!(self, Reading::Absent)
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // ---
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            None | Some(serde_json::Value::Null) => Reading::Missing,
            Some(serde_json::Value::Number(n)) => match n.as_f64() {
                Some(v) => Reading::Value(v),
                None => Reading::Malformed(n.to_string()),
            },
            Some(other) => Reading::Malformed(other.to_string()),
        })
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: {raw:?}")))
}

/// Parse an ISO-8601 date or date-time. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // `%z` takes the offset with or without a colon
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%d %H:%M%z",
    ] {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---

/// Why a parameter's forecast was replaced by placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingReason {
    /// No record carries the parameter.
    NotInSchema,
    /// Too few non-null observations to fit the model.
    InsufficientData { observations: usize },
    /// Series extraction, fitting or forecasting failed.
    ModelFailure(String),
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::NotInSchema => write!(f, "parameter not in data"),
            MissingReason::InsufficientData { observations } => {
                write!(f, "not enough data ({observations} observations)")
            }
            MissingReason::ModelFailure(cause) => write!(f, "model failure: {cause}"),
        }
    }
}

/// Outcome of forecasting one parameter.
///
/// Serialized as a `FORECAST_HORIZON`-element array; `Missing` becomes an
/// array of `null` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterForecast {
    Forecast([f64; FORECAST_HORIZON]),
    Missing(MissingReason),
}

impl ParameterForecast {
    pub fn values(&self) -> Option<&[f64; FORECAST_HORIZON]> {
        match self {
            ParameterForecast::Forecast(values) => Some(values),
            ParameterForecast::Missing(_) => None,
        }
    }
}

impl Serialize for ParameterForecast {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // ---
        let mut seq = serializer.serialize_seq(Some(FORECAST_HORIZON))?;
        match self {
            ParameterForecast::Forecast(values) => {
                for value in values {
                    seq.serialize_element(value)?;
                }
            }
            ParameterForecast::Missing(_) => {
                for _ in 0..FORECAST_HORIZON {
                    seq.serialize_element(&Option::<f64>::None)?;
                }
            }
        }
        seq.end()
    }
}

/// Success body of `POST /predict`: one entry per tracked parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    // ---
    pub bod_forecast: ParameterForecast,
    pub do_forecast: ParameterForecast,
    pub ph_forecast: ParameterForecast,
    pub nitrate_forecast: ParameterForecast,
    #[serde(rename = "fecalColiform_forecast")]
    pub fecal_coliform_forecast: ParameterForecast,
}

impl ForecastResponse {
    /// Build a response by forecasting every tracked parameter with `f`.
    pub fn from_fn(mut f: impl FnMut(Parameter) -> ParameterForecast) -> Self {
        // ---
        Self {
            bod_forecast: f(Parameter::Bod),
            do_forecast: f(Parameter::DissolvedOxygen),
            ph_forecast: f(Parameter::Ph),
            nitrate_forecast: f(Parameter::Nitrate),
            fecal_coliform_forecast: f(Parameter::FecalColiform),
        }
    }

    pub fn get(&self, parameter: Parameter) -> &ParameterForecast {
        match parameter {
            Parameter::Bod => &self.bod_forecast,
            Parameter::DissolvedOxygen => &self.do_forecast,
            Parameter::Ph => &self.ph_forecast,
            Parameter::Nitrate => &self.nitrate_forecast,
            Parameter::FecalColiform => &self.fecal_coliform_forecast,
        }
    }
}
