//! Configuration validation.
//!
//! Runs before any computation and reports the first offending key.

use crate::domain::error::SigallocError;
use crate::ports::config_port::ConfigPort;

pub const ALLOCATION_METHODS: [&str; 2] = ["mean_variance", "risk_parity"];

pub fn validate_allocation_config(config: &dyn ConfigPort) -> Result<(), SigallocError> {
    validate_method(config)?;
    validate_risk_aversion(config)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), SigallocError> {
    validate_max_position_fraction(config)?;
    validate_volatility_decay(config)?;
    validate_default_stop_loss(config)?;
    validate_portfolio(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> SigallocError {
    SigallocError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_method(config: &dyn ConfigPort) -> Result<(), SigallocError> {
    match config.get_string("allocation", "method") {
        None => Ok(()),
        Some(m) if ALLOCATION_METHODS.contains(&m.trim().to_lowercase().as_str()) => Ok(()),
        Some(_) => Err(invalid(
            "allocation",
            "method",
            "method must be mean_variance or risk_parity",
        )),
    }
}

fn validate_risk_aversion(config: &dyn ConfigPort) -> Result<(), SigallocError> {
    let value = config.get_double("allocation", "risk_aversion", 1.0);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "allocation",
            "risk_aversion",
            "risk_aversion must be positive",
        ));
    }
    Ok(())
}

fn validate_max_position_fraction(config: &dyn ConfigPort) -> Result<(), SigallocError> {
    let value = config.get_double("risk", "max_position_fraction", 0.25);
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "risk",
            "max_position_fraction",
            "max_position_fraction must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_volatility_decay(config: &dyn ConfigPort) -> Result<(), SigallocError> {
    let value = config.get_double("risk", "volatility_decay", 1.0);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "risk",
            "volatility_decay",
            "volatility_decay must be positive",
        ));
    }
    Ok(())
}

fn validate_default_stop_loss(config: &dyn ConfigPort) -> Result<(), SigallocError> {
    let value = config.get_double("risk", "default_stop_loss_pct", 0.10);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "risk",
            "default_stop_loss_pct",
            "default_stop_loss_pct must be at least 0 and below 1",
        ));
    }
    Ok(())
}

fn validate_portfolio(config: &dyn ConfigPort) -> Result<(), SigallocError> {
    let cash = config.get_double("portfolio", "cash", 0.0);
    if !cash.is_finite() || cash < 0.0 {
        return Err(invalid("portfolio", "cash", "cash must be non-negative"));
    }
    let margin = config.get_double("portfolio", "margin_requirement", 0.5);
    if !(0.0..=1.0).contains(&margin) {
        return Err(invalid(
            "portfolio",
            "margin_requirement",
            "margin_requirement must be between 0 and 1",
        ));
    }
    let margin_used = config.get_double("portfolio", "margin_used", 0.0);
    if !margin_used.is_finite() || margin_used < 0.0 {
        return Err(invalid(
            "portfolio",
            "margin_used",
            "margin_used must be non-negative",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: SigallocError) -> String {
        match err {
            SigallocError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_uses_valid_defaults() {
        let cfg = config("[allocation]\n");
        assert!(validate_allocation_config(&cfg).is_ok());
        assert!(validate_risk_config(&cfg).is_ok());
    }

    #[test]
    fn accepts_both_methods() {
        assert!(validate_allocation_config(&config("[allocation]\nmethod = risk_parity\n")).is_ok());
        assert!(
            validate_allocation_config(&config("[allocation]\nmethod = Mean_Variance\n")).is_ok()
        );
    }

    #[test]
    fn rejects_unknown_method() {
        let err = validate_allocation_config(&config("[allocation]\nmethod = kelly\n")).unwrap_err();
        assert_eq!(invalid_key(err), "method");
    }

    #[test]
    fn rejects_zero_risk_aversion() {
        let err =
            validate_allocation_config(&config("[allocation]\nrisk_aversion = 0\n")).unwrap_err();
        assert_eq!(invalid_key(err), "risk_aversion");
    }

    #[test]
    fn rejects_fraction_above_one() {
        let err =
            validate_risk_config(&config("[risk]\nmax_position_fraction = 1.5\n")).unwrap_err();
        assert_eq!(invalid_key(err), "max_position_fraction");
    }

    #[test]
    fn rejects_zero_fraction() {
        let err = validate_risk_config(&config("[risk]\nmax_position_fraction = 0\n")).unwrap_err();
        assert_eq!(invalid_key(err), "max_position_fraction");
    }

    #[test]
    fn rejects_non_positive_decay() {
        let err = validate_risk_config(&config("[risk]\nvolatility_decay = -1\n")).unwrap_err();
        assert_eq!(invalid_key(err), "volatility_decay");
    }

    #[test]
    fn rejects_stop_loss_of_one() {
        let err =
            validate_risk_config(&config("[risk]\ndefault_stop_loss_pct = 1.0\n")).unwrap_err();
        assert_eq!(invalid_key(err), "default_stop_loss_pct");
    }

    #[test]
    fn rejects_negative_cash() {
        let err = validate_risk_config(&config("[portfolio]\ncash = -5\n")).unwrap_err();
        assert_eq!(invalid_key(err), "cash");
    }

    #[test]
    fn rejects_margin_requirement_out_of_range() {
        let err =
            validate_risk_config(&config("[portfolio]\nmargin_requirement = 2\n")).unwrap_err();
        assert_eq!(invalid_key(err), "margin_requirement");
    }

    #[test]
    fn rejects_nan_values() {
        let cases = [
            ("[risk]\nmax_position_fraction = nan\n", "max_position_fraction"),
            ("[risk]\nvolatility_decay = nan\n", "volatility_decay"),
            ("[risk]\ndefault_stop_loss_pct = nan\n", "default_stop_loss_pct"),
            ("[portfolio]\ncash = nan\n", "cash"),
            ("[portfolio]\nmargin_requirement = nan\n", "margin_requirement"),
            ("[portfolio]\nmargin_used = nan\n", "margin_used"),
        ];
        for (content, key) in cases {
            let err = validate_risk_config(&config(content)).unwrap_err();
            assert_eq!(invalid_key(err), key, "{content}");
        }
    }

    #[test]
    fn rejects_nan_risk_aversion() {
        let err =
            validate_allocation_config(&config("[allocation]\nrisk_aversion = nan\n")).unwrap_err();
        assert_eq!(invalid_key(err), "risk_aversion");
    }

    #[test]
    fn rejects_infinite_cash() {
        let err = validate_risk_config(&config("[portfolio]\ncash = inf\n")).unwrap_err();
        assert_eq!(invalid_key(err), "cash");
    }
}
