//! CSV report writer.

use crate::domain::error::SigallocError;
use crate::domain::optimizer::PortfolioWeights;
use crate::domain::risk_analysis::{RiskReport, SkipReason};
use crate::ports::report_port::ReportPort;
use std::io::Write;

pub const WEIGHTS_HEADER: [&str; 2] = ["ticker", "weight"];

pub const RISK_HEADER: [&str; 11] = [
    "ticker",
    "current_price",
    "daily_volatility",
    "annualized_volatility",
    "var_95",
    "cvar_95",
    "stop_loss_price",
    "potential_loss",
    "volatility_adjusted_fraction",
    "position_limit",
    "remaining_position_limit",
];

pub struct CsvReportAdapter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvReportAdapter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, SigallocError> {
        self.writer.into_inner().map_err(|e| SigallocError::Io(e.into_error()))
    }
}

fn write_error(e: csv::Error) -> SigallocError {
    SigallocError::Data {
        reason: format!("CSV write error: {}", e),
    }
}

fn fmt(value: f64) -> String {
    format!("{:.6}", value)
}

impl<W: Write> ReportPort for CsvReportAdapter<W> {
    fn write_weights(&mut self, weights: &PortfolioWeights) -> Result<(), SigallocError> {
        self.writer.write_record(WEIGHTS_HEADER).map_err(write_error)?;
        for (ticker, weight) in weights.iter() {
            self.writer
                .write_record([ticker, fmt(weight).as_str()])
                .map_err(write_error)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn write_risk_report(&mut self, report: &RiskReport) -> Result<(), SigallocError> {
        self.writer.write_record(RISK_HEADER).map_err(write_error)?;
        for a in report.analyses.values() {
            let record = [
                a.ticker.clone(),
                fmt(a.current_price),
                fmt(a.volatility.daily_volatility),
                fmt(a.volatility.annualized_volatility),
                fmt(a.risk_metrics.var_95),
                fmt(a.risk_metrics.cvar_95),
                fmt(a.stop_loss_metrics.stop_loss_price),
                fmt(a.stop_loss_metrics.potential_loss),
                fmt(a.volatility_adjusted_fraction),
                fmt(a.position_limit),
                fmt(a.remaining_position_limit),
            ];
            self.writer.write_record(&record).map_err(write_error)?;
        }
        self.writer.flush()?;

        for skipped in &report.skipped {
            let why = match &skipped.reason {
                SkipReason::NoData => "no price data".to_string(),
                SkipReason::InsufficientHistory { points } => {
                    format!("only {} price points", points)
                }
                SkipReason::InvalidData { reason } => reason.clone(),
            };
            tracing::warn!(ticker = %skipped.ticker, "not in report: {}", why);
        }
        Ok(())
    }
}
