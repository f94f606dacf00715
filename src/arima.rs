//! ARIMA (AutoRegressive Integrated Moving Average) forecasting.
//!
//! Supports the autoregressive and integrated parts of the model:
//!
//! - **AR**: the differenced series is regressed on its own `p` lagged values
//! - **I**: the series is differenced `d` times before fitting and the
//!   forecasts are integrated back onto the original scale
//!
//! AR coefficients are estimated from the sample autocovariances with the
//! Levinson-Durbin recursion of the Yule-Walker equations, which always
//! yields a stationary AR polynomial. No mean term is estimated once `d > 0`,
//! so a fitted ARI model forecasts without drift.
//!
//! ```ignore
//! let model = Arima::new(ArimaOrder::new(5, 1, 0))?;
//! let fitted = model.fit(&series)?;
//! let next_five = fitted.forecast(5)?;
//! ```

use thiserror::Error;

/// Errors raised while fitting or forecasting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Insufficient data points for the requested order
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Invalid model order
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Invalid time series data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Numerical computation error
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Largest supported AR order.
const MAX_P: usize = 10;
/// Largest supported differencing order.
const MAX_D: usize = 2;

/// ARIMA order `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Smallest series length `fit` accepts for this order.
    pub const fn min_observations(&self) -> usize {
        self.p + self.d + 1
    }
}

/// An unfitted ARIMA model with a validated order.
#[derive(Debug, Clone, Copy)]
pub struct Arima {
    order: ArimaOrder,
}

impl Arima {
    /// Create a model for `order`.
    ///
    /// `p` may be at most 10 and `d` at most 2. Moving-average terms are not
    /// supported, so `q` must be 0.
    pub fn new(order: ArimaOrder) -> Result<Self> {
        // ---
        if order.p > MAX_P {
            return Err(ModelError::InvalidParameter {
                name: "p",
                reason: format!("AR order must be <= {MAX_P}"),
            });
        }
        if order.d > MAX_D {
            return Err(ModelError::InvalidParameter {
                name: "d",
                reason: format!("Differencing order must be <= {MAX_D}"),
            });
        }
        if order.q != 0 {
            return Err(ModelError::InvalidParameter {
                name: "q",
                reason: "moving-average terms are not supported".to_string(),
            });
        }

        Ok(Self { order })
    }

    /// Fit the model to `data`, ordered oldest first.
    pub fn fit(&self, data: &[f64]) -> Result<FittedArima> {
        // ---
        let required = self.order.min_observations();
        if data.len() < required {
            return Err(ModelError::InsufficientData {
                required,
                actual: data.len(),
            });
        }

        if data.iter().any(|x| !x.is_finite()) {
            return Err(ModelError::InvalidData(
                "Data contains NaN or infinite values".to_string(),
            ));
        }

        let (differenced, levels) = difference(data, self.order.d);
        let autocov = autocovariances(&differenced, self.order.p);
        let (ar_coeffs, noise_variance) = levinson_durbin(&autocov, self.order.p);

        if ar_coeffs.iter().any(|c| !c.is_finite()) || !noise_variance.is_finite() {
            return Err(ModelError::NumericalError(
                "Yule-Walker estimation produced non-finite coefficients".to_string(),
            ));
        }

        Ok(FittedArima {
            ar_coeffs,
            noise_variance,
            differenced,
            levels,
        })
    }
}

/// A model fitted to one series, ready to forecast past its end.
#[derive(Debug, Clone)]
pub struct FittedArima {
    ar_coeffs: Vec<f64>,
    noise_variance: f64,
    differenced: Vec<f64>,
    /// Last value of the series at each differencing level, level 0 first.
    levels: Vec<f64>,
}

impl FittedArima {
    /// AR coefficients, lag 1 first.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coeffs
    }

    /// Innovation variance left after the AR fit.
    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    /// Forecast the `steps` values immediately following the fitted series.
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>> {
        // ---
        if steps == 0 {
            return Ok(Vec::new());
        }

        // Recursive AR forecast on the differenced scale
        let n = self.differenced.len();
        let mut extended = self.differenced.clone();
        extended.reserve(steps);
        for _ in 0..steps {
            let next: f64 = self
                .ar_coeffs
                .iter()
                .zip(extended.iter().rev())
                .map(|(coeff, value)| coeff * value)
                .sum();
            extended.push(next);
        }

        let forecasts = integrate(&extended[n..], &self.levels);
        if forecasts.iter().any(|x| !x.is_finite()) {
            return Err(ModelError::NumericalError(
                "Forecast diverged to a non-finite value".to_string(),
            ));
        }

        Ok(forecasts)
    }
}

/// Difference `data` `order` times.
///
/// Returns the differenced series and the last value of every level that was
/// differenced away, which `integrate` needs to undo the transform.
fn difference(data: &[f64], order: usize) -> (Vec<f64>, Vec<f64>) {
    // ---
    let mut current = data.to_vec();
    let mut levels = Vec::with_capacity(order);
    for _ in 0..order {
        if let Some(&last) = current.last() {
            levels.push(last);
        }
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    (current, levels)
}

/// Undo `difference`, innermost level first.
fn integrate(forecasts: &[f64], levels: &[f64]) -> Vec<f64> {
    // ---
    let mut result = forecasts.to_vec();
    for &last in levels.iter().rev() {
        let mut running = last;
        for value in result.iter_mut() {
            running += *value;
            *value = running;
        }
    }
    result
}

/// Biased sample autocovariances for lags `0..=max_lag`, about zero.
fn autocovariances(data: &[f64], max_lag: usize) -> Vec<f64> {
    // ---
    let n = data.len() as f64;
    (0..=max_lag)
        .map(|k| {
            data.iter()
                .skip(k)
                .zip(data.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n
        })
        .collect()
}

/// Solve the Yule-Walker equations for `p` AR coefficients.
///
/// Returns the coefficients (lag 1 first) and the final prediction error
/// variance. Stops early, leaving higher lags at zero, once the series is
/// perfectly predicted.
fn levinson_durbin(autocov: &[f64], p: usize) -> (Vec<f64>, f64) {
    // ---
    let mut coeffs = vec![0.0; p];
    let gamma0 = autocov.first().copied().unwrap_or(0.0);
    let mut error = gamma0;

    for k in 0..p {
        if error <= f64::EPSILON * gamma0.abs() || error <= 0.0 {
            break;
        }

        let mut acc = autocov[k + 1];
        for j in 0..k {
            acc -= coeffs[j] * autocov[k - j];
        }
        let reflection = acc / error;

        let previous = coeffs.clone();
        coeffs[k] = reflection;
        for j in 0..k {
            coeffs[j] = previous[j] - reflection * previous[k - 1 - j];
        }

        error *= 1.0 - reflection * reflection;
    }

    (coeffs, error.max(0.0))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    const ORDER: ArimaOrder = ArimaOrder::new(5, 1, 0);

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_order_validation() {
        // ---
        assert!(Arima::new(ORDER).is_ok());
        assert!(matches!(
            Arima::new(ArimaOrder::new(11, 1, 0)),
            Err(ModelError::InvalidParameter { name: "p", .. })
        ));
        assert!(matches!(
            Arima::new(ArimaOrder::new(5, 3, 0)),
            Err(ModelError::InvalidParameter { name: "d", .. })
        ));
        assert!(matches!(
            Arima::new(ArimaOrder::new(5, 1, 1)),
            Err(ModelError::InvalidParameter { name: "q", .. })
        ));
    }

    #[test]
    fn test_fit_rejects_short_series() {
        // ---
        let model = Arima::new(ORDER).unwrap();
        let err = model.fit(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                required: 7,
                actual: 6
            }
        );
    }

    #[test]
    fn test_fit_rejects_non_finite_values() {
        // ---
        let model = Arima::new(ORDER).unwrap();
        let mut data: Vec<f64> = (0..12).map(f64::from).collect();
        data[4] = f64::NAN;
        assert!(matches!(model.fit(&data), Err(ModelError::InvalidData(_))));

        data[4] = f64::INFINITY;
        assert!(matches!(model.fit(&data), Err(ModelError::InvalidData(_))));
    }

    #[test]
    fn test_constant_series_forecasts_constant() {
        // ---
        let model = Arima::new(ORDER).unwrap();
        let fitted = model.fit(&[7.2; 15]).unwrap();

        assert!(fitted.ar_coefficients().iter().all(|&c| c == 0.0));
        let forecast = fitted.forecast(5).unwrap();
        assert_eq!(forecast, vec![7.2; 5]);
    }

    #[test]
    fn test_linear_trend_keeps_rising() {
        // ---
        let data: Vec<f64> = (0..20).map(|t| 2.0 * f64::from(t) + 1.0).collect();
        let fitted = Arima::new(ORDER).unwrap().fit(&data).unwrap();
        let forecast = fitted.forecast(5).unwrap();

        assert_eq!(forecast.len(), 5);
        let mut previous = *data.last().unwrap();
        for value in forecast {
            assert!(value > previous, "{value} should exceed {previous}");
            previous = value;
        }
    }

    #[test]
    fn test_forecast_zero_steps_is_empty() {
        // ---
        let data: Vec<f64> = (0..12).map(|t| f64::from(t).sin()).collect();
        let fitted = Arima::new(ORDER).unwrap().fit(&data).unwrap();
        assert!(fitted.forecast(0).unwrap().is_empty());
    }

    #[test]
    fn test_ar1_coefficient_from_autocovariances() {
        // ---
        // gamma = [1.0, 0.5, 0.25] is an exact AR(1) with phi = 0.5
        let (coeffs, variance) = levinson_durbin(&[1.0, 0.5, 0.25], 2);
        assert_close(coeffs[0], 0.5);
        assert_close(coeffs[1], 0.0);
        assert_close(variance, 0.75);
    }

    #[test]
    fn test_yule_walker_coefficients_are_stationary() {
        // ---
        let data: Vec<f64> = (0..40)
            .map(|t| 10.0 + (f64::from(t) * 0.7).sin() * 3.0 + f64::from(t % 3))
            .collect();
        let fitted = Arima::new(ORDER).unwrap().fit(&data).unwrap();

        assert_eq!(fitted.ar_coefficients().len(), 5);
        let sum: f64 = fitted.ar_coefficients().iter().map(|c| c.abs()).sum();
        assert!(sum.is_finite());
        assert!(fitted.noise_variance() >= 0.0);
        assert!(fitted.forecast(5).unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_difference_and_integrate_round_trip() {
        // ---
        let data = [1.0, 4.0, 9.0, 16.0, 25.0];
        let (diffed, levels) = difference(&data, 2);
        assert_eq!(diffed, vec![2.0, 2.0, 2.0]);
        assert_eq!(levels, vec![25.0, 9.0]);

        // Continuing the second difference of 2 extends the squares
        assert_eq!(integrate(&[2.0, 2.0], &levels), vec![36.0, 49.0]);
    }

    #[test]
    fn test_random_walk_step_is_repeated_last_level() {
        // ---
        let model = Arima::new(ArimaOrder::new(0, 1, 0)).unwrap();
        let fitted = model.fit(&[3.0, 5.0, 4.0, 6.0]).unwrap();
        assert_eq!(fitted.forecast(3).unwrap(), vec![6.0, 6.0, 6.0]);
    }
}
