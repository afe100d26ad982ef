//! Horizon returns over a date-sorted price series.
//!
//! Both functions index by row position, so callers must pass one ticker's
//! adjusted closes sorted ascending by date. The trailing return at `t`
//! reads only rows `<= t`; the forward return at `t` reads row `t + horizon`
//! and is stored at `t`.

use punta_core::{Datum, UndefinedReason};

/// `prices[t] / prices[t - horizon] - 1`; the first `horizon` rows are undefined.
pub fn trailing_returns(prices: &[f64], horizon: usize) -> Vec<Datum<f64>> {
    (0..prices.len())
        .map(|t| {
            if horizon == 0 || t < horizon {
                Datum::Undefined(UndefinedReason::InsufficientHistory)
            } else {
                Datum::Defined(prices[t] / prices[t - horizon] - 1.0)
            }
        })
        .collect()
}

/// `prices[t + horizon] / prices[t] - 1`; the last `horizon` rows are undefined.
pub fn forward_returns(prices: &[f64], horizon: usize) -> Vec<Datum<f64>> {
    (0..prices.len())
        .map(|t| {
            if horizon > 0 && horizon < prices.len() - t {
                Datum::Defined(prices[t + horizon] / prices[t] - 1.0)
            } else {
                Datum::Undefined(UndefinedReason::NoForwardObservation)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trailing_known_values() {
        let prices = [100.0, 110.0, 121.0, 99.0];
        let out = trailing_returns(&prices, 2);

        assert_eq!(out[0], Datum::Undefined(UndefinedReason::InsufficientHistory));
        assert_eq!(out[1], Datum::Undefined(UndefinedReason::InsufficientHistory));
        assert_relative_eq!(out[2].value().unwrap(), 0.21, epsilon = 1e-12);
        assert_relative_eq!(out[3].value().unwrap(), 99.0 / 110.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_forward_known_values() {
        let prices = [100.0, 110.0, 121.0, 99.0];
        let out = forward_returns(&prices, 2);

        assert_relative_eq!(out[0].value().unwrap(), 0.21, epsilon = 1e-12);
        assert_relative_eq!(out[1].value().unwrap(), 99.0 / 110.0 - 1.0, epsilon = 1e-12);
        assert_eq!(out[2], Datum::Undefined(UndefinedReason::NoForwardObservation));
        assert_eq!(out[3], Datum::Undefined(UndefinedReason::NoForwardObservation));
    }

    #[test]
    fn test_forward_is_trailing_shifted() {
        let prices: Vec<f64> = (0..30).map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let fwd = forward_returns(&prices, 5);
        let trail = trailing_returns(&prices, 5);

        for t in 0..prices.len() - 5 {
            assert_eq!(fwd[t], trail[t + 5]);
        }
    }

    #[test]
    fn test_series_shorter_than_horizon() {
        let prices = [10.0, 11.0, 12.0];
        assert!(trailing_returns(&prices, 252).iter().all(|d| !d.is_defined()));
        assert!(forward_returns(&prices, 252).iter().all(|d| !d.is_defined()));
        assert!(forward_returns(&[], 1).is_empty());
    }
}
