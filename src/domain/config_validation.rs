//! Configuration validation.
//!
//! Every key is optional; absent keys take their defaults and are validated
//! like any other value.

use crate::domain::backtest::{DEFAULT_INITIAL_CAPITAL, DEFAULT_RISK_FREE_RATE};
use crate::domain::error::SignaltraderError;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SignaltraderError> {
    validate_initial_capital(config)?;
    validate_risk_free_rate(config)?;
    validate_pool_size(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SignaltraderError> {
    validate_bollinger(config)?;
    validate_ma_crossover(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> SignaltraderError {
    SignaltraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SignaltraderError> {
    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), SignaltraderError> {
    let value = config.get_double("backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), SignaltraderError> {
    if config.get_int("sqlite", "pool_size", 4) < 1 {
        return Err(invalid("sqlite", "pool_size", "pool_size must be at least 1"));
    }
    Ok(())
}

fn validate_bollinger(config: &dyn ConfigPort) -> Result<(), SignaltraderError> {
    // A sample deviation needs at least two observations.
    if config.get_int("bollinger", "window", 20) < 2 {
        return Err(invalid("bollinger", "window", "window must be at least 2"));
    }
    let num_std = config.get_double("bollinger", "num_std", 2.0);
    if !num_std.is_finite() || num_std <= 0.0 {
        return Err(invalid("bollinger", "num_std", "num_std must be positive"));
    }
    if config.get_int("bollinger", "trend_window", 200) < 1 {
        return Err(invalid(
            "bollinger",
            "trend_window",
            "trend_window must be positive",
        ));
    }
    Ok(())
}

fn validate_ma_crossover(config: &dyn ConfigPort) -> Result<(), SignaltraderError> {
    let short = config.get_int("ma_crossover", "short_window", 50);
    let long = config.get_int("ma_crossover", "long_window", 200);
    if short < 1 {
        return Err(invalid(
            "ma_crossover",
            "short_window",
            "short_window must be positive",
        ));
    }
    if long <= short {
        return Err(invalid(
            "ma_crossover",
            "long_window",
            "long_window must be greater than short_window",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestConfig {
        values: HashMap<(String, String), String>,
    }

    impl TestConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            let values = entries
                .iter()
                .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                .collect();
            Self { values }
        }
    }

    impl ConfigPort for TestConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.values
                .get(&(section.to_string(), key.to_string()))
                .cloned()
        }
        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    fn assert_invalid(result: Result<(), SignaltraderError>, expected_key: &str) {
        match result {
            Err(SignaltraderError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_is_valid() {
        let config = TestConfig::new(&[]);
        validate_backtest_config(&config).unwrap();
        validate_strategy_config(&config).unwrap();
    }

    #[test]
    fn full_config_is_valid() {
        let config = TestConfig::new(&[
            ("backtest", "initial_capital", "50000"),
            ("backtest", "risk_free_rate", "0.03"),
            ("sqlite", "pool_size", "2"),
            ("bollinger", "window", "10"),
            ("bollinger", "num_std", "1.5"),
            ("bollinger", "trend_window", "100"),
            ("ma_crossover", "short_window", "20"),
            ("ma_crossover", "long_window", "100"),
        ]);
        validate_backtest_config(&config).unwrap();
        validate_strategy_config(&config).unwrap();
    }

    #[test]
    fn rejects_non_positive_capital() {
        for value in ["0", "-100"] {
            let config = TestConfig::new(&[("backtest", "initial_capital", value)]);
            assert_invalid(validate_backtest_config(&config), "initial_capital");
        }
    }

    #[test]
    fn rejects_risk_free_rate_out_of_range() {
        for value in ["-0.01", "1.0", "5"] {
            let config = TestConfig::new(&[("backtest", "risk_free_rate", value)]);
            assert_invalid(validate_backtest_config(&config), "risk_free_rate");
        }
        let zero = TestConfig::new(&[("backtest", "risk_free_rate", "0")]);
        validate_backtest_config(&zero).unwrap();
    }

    #[test]
    fn rejects_zero_pool_size() {
        let config = TestConfig::new(&[("sqlite", "pool_size", "0")]);
        assert_invalid(validate_backtest_config(&config), "pool_size");
    }

    #[test]
    fn rejects_bad_bollinger_params() {
        let config = TestConfig::new(&[("bollinger", "window", "1")]);
        assert_invalid(validate_strategy_config(&config), "window");

        let config = TestConfig::new(&[("bollinger", "num_std", "0")]);
        assert_invalid(validate_strategy_config(&config), "num_std");

        let config = TestConfig::new(&[("bollinger", "trend_window", "0")]);
        assert_invalid(validate_strategy_config(&config), "trend_window");
    }

    #[test]
    fn rejects_bad_crossover_windows() {
        let config = TestConfig::new(&[("ma_crossover", "short_window", "0")]);
        assert_invalid(validate_strategy_config(&config), "short_window");

        let config = TestConfig::new(&[
            ("ma_crossover", "short_window", "50"),
            ("ma_crossover", "long_window", "50"),
        ]);
        assert_invalid(validate_strategy_config(&config), "long_window");
    }
}
