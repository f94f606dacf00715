//! Per-parameter forecasting for a single `/predict` request.
//!
//! Records are ordered by timestamp, each tracked parameter is reduced to its
//! non-null observations, and an ARIMA(5,1,0) model is fitted to every series
//! with enough data. A parameter that cannot be forecast is reported as
//! [`ParameterForecast::Missing`] and never fails the request.

use tracing::{debug, warn};

use crate::arima::{Arima, ArimaOrder};
use crate::{
    ForecastResponse, HistoricalRecord, MissingReason, Parameter, ParameterForecast,
    PredictRequest, Reading, FORECAST_HORIZON,
};

// ---

/// Fixed model order: 5 AR terms, one difference, no MA terms.
pub const MODEL_ORDER: ArimaOrder = ArimaOrder::new(5, 1, 0);

/// Minimum number of non-null observations before a model is fitted.
pub const MIN_OBSERVATIONS: usize = 11;

/// Forecast every tracked parameter in `request`.
pub fn forecast_request(request: &PredictRequest) -> ForecastResponse {
    // ---
    let mut records: Vec<&HistoricalRecord> = request.historical_data.iter().collect();
    records.sort_by_key(|r| r.timestamp);

    ForecastResponse::from_fn(|parameter| {
        let outcome = forecast_parameter(&records, parameter);
        match &outcome {
            ParameterForecast::Forecast(values) => {
                debug!(
                    "{} for location {}: {:?}",
                    parameter.forecast_key(),
                    request.location_id,
                    values
                );
            }
            ParameterForecast::Missing(reason @ MissingReason::ModelFailure(_)) => {
                warn!(
                    "Error forecasting {} for location {}: {}",
                    parameter, request.location_id, reason
                );
            }
            ParameterForecast::Missing(reason) => {
                debug!(
                    "Skipping {} for location {}: {}",
                    parameter, request.location_id, reason
                );
            }
        }
        outcome
    })
}

/// Forecast one parameter from records already ordered by timestamp.
pub fn forecast_parameter(
    records: &[&HistoricalRecord],
    parameter: Parameter,
) -> ParameterForecast {
    // ---
    match extract_series(records, parameter).and_then(|series| fit_and_forecast(&series)) {
        Ok(values) => ParameterForecast::Forecast(values),
        Err(reason) => ParameterForecast::Missing(reason),
    }
}

/// Collect the non-null observations of `parameter`, oldest first.
fn extract_series(
    records: &[&HistoricalRecord],
    parameter: Parameter,
) -> Result<Vec<f64>, MissingReason> {
    // ---
    if !records.iter().any(|r| r.reading(parameter).is_present()) {
        return Err(MissingReason::NotInSchema);
    }

    // Malformed cells count as observations; they only fail once the series is fitted
    let observed: Vec<(&HistoricalRecord, Result<f64, &str>)> = records
        .iter()
        .filter_map(|r| match r.reading(parameter) {
            Reading::Absent | Reading::Missing => None,
            Reading::Value(v) => Some((*r, Ok(*v))),
            Reading::Malformed(raw) => Some((*r, Err(raw.as_str()))),
        })
        .collect();

    if observed.len() < MIN_OBSERVATIONS {
        return Err(MissingReason::InsufficientData {
            observations: observed.len(),
        });
    }

    observed
        .into_iter()
        .map(|(record, value)| {
            value.map_err(|raw| {
                MissingReason::ModelFailure(format!(
                    "non-numeric value {} at {}",
                    raw,
                    record.timestamp.to_rfc3339()
                ))
            })
        })
        .collect()
}

fn fit_and_forecast(series: &[f64]) -> Result<[f64; FORECAST_HORIZON], MissingReason> {
    // ---
    let failure = |e: crate::arima::ModelError| MissingReason::ModelFailure(e.to_string());

    let fitted = Arima::new(MODEL_ORDER).map_err(failure)?.fit(series).map_err(failure)?;
    debug!(
        "Fitted ARIMA{:?} on {} points: ar={:?} sigma2={:.6}",
        (MODEL_ORDER.p, MODEL_ORDER.d, MODEL_ORDER.q),
        series.len(),
        fitted.ar_coefficients(),
        fitted.noise_variance()
    );

    let values = fitted.forecast(FORECAST_HORIZON).map_err(failure)?;
    values.try_into().map_err(|v: Vec<f64>| {
        MissingReason::ModelFailure(format!(
            "expected {} forecast values, got {}",
            FORECAST_HORIZON,
            v.len()
        ))
    })
}
