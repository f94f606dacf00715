use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{forecast, Parameter, PredictRequest};

// ---

const INVALID_REQUEST: &str = "Invalid request data";

/// Client-error body for rejected payloads.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: &'static str,
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // ---
    Router::new().route("/predict", post(handler))
}

/// Handle `POST /predict`.
///
/// Any payload that does not map onto [`PredictRequest`] (absent body,
/// missing `locationId` or `historical_data`, unparseable timestamps) is
/// answered with `400 {"message": "Invalid request data"}`. Per-parameter
/// forecasting failures never reach the caller; they become placeholders.
async fn handler(payload: Result<Json<PredictRequest>, JsonRejection>) -> Response {
    // ---
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("POST /predict - Rejected payload: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    message: INVALID_REQUEST,
                }),
            )
                .into_response();
        }
    };

    info!(
        "POST /predict - location {} with {} records",
        request.location_id,
        request.historical_data.len()
    );

    let forecasts = forecast::forecast_request(&request);
    let forecast_count = Parameter::ALL
        .iter()
        .filter(|p| forecasts.get(**p).values().is_some())
        .count();
    info!(
        "POST /predict - Forecast {} of {} parameters for location {}",
        forecast_count,
        Parameter::ALL.len(),
        request.location_id
    );

    debug!("POST /predict - Returning OK");
    (StatusCode::OK, Json(forecasts)).into_response()
}
