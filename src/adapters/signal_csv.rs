//! CSV readers for analyst signals, covariance matrices and positions.
//!
//! Columns are located by header name, so column order in the files is free.

use crate::domain::covariance::CovarianceMatrix;
use crate::domain::error::SigallocError;
use crate::domain::position::Position;
use crate::domain::signal::{AggregatedSignals, Signal, SignalLabel, CONFIDENCE_SCALE};
use std::fs::File;
use std::io::Read;
use std::path::Path;

fn open(path: &Path) -> Result<File, SigallocError> {
    File::open(path).map_err(|e| SigallocError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })
}

fn csv_error(e: csv::Error) -> SigallocError {
    SigallocError::Data {
        reason: format!("CSV parse error: {}", e),
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, SigallocError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| SigallocError::Data {
            reason: format!("missing {} column", name),
        })
}

fn number(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<f64, SigallocError> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|_| SigallocError::Data {
        reason: format!("invalid {} value {:?} on line {}", name, raw, line),
    })
}

/// Reads `agent,ticker,signal,confidence` rows. Tickers are upper-cased.
pub fn read_signals<R: Read>(reader: R) -> Result<AggregatedSignals, SigallocError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let agent_col = column(&headers, "agent")?;
    let ticker_col = column(&headers, "ticker")?;
    let signal_col = column(&headers, "signal")?;
    let confidence_col = column(&headers, "confidence")?;

    let mut signals = AggregatedSignals::new();
    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let record = result.map_err(csv_error)?;
        let agent = record.get(agent_col).unwrap_or("").trim();
        let ticker = record.get(ticker_col).unwrap_or("").trim().to_uppercase();
        if agent.is_empty() || ticker.is_empty() {
            return Err(SigallocError::Data {
                reason: format!("empty agent or ticker on line {}", line),
            });
        }
        let label: SignalLabel = record
            .get(signal_col)
            .unwrap_or("")
            .parse()
            .map_err(|e| SigallocError::Data {
                reason: format!("{} on line {}", e, line),
            })?;
        let confidence = number(&record, confidence_col, "confidence", line)?;
        if !(0.0..=CONFIDENCE_SCALE).contains(&confidence) {
            return Err(SigallocError::Data {
                reason: format!(
                    "confidence {} on line {} is outside 0..={}",
                    confidence, line, CONFIDENCE_SCALE
                ),
            });
        }
        signals.insert(agent, &ticker, Signal::new(label, confidence));
    }
    Ok(signals)
}

pub fn read_signals_file(path: &Path) -> Result<AggregatedSignals, SigallocError> {
    read_signals(open(path)?)
}

/// Reads a covariance matrix whose header row names the tickers (an optional
/// leading label column is allowed), one row per ticker in header order.
pub fn read_covariance<R: Read>(reader: R) -> Result<CovarianceMatrix, SigallocError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let first_is_label = headers
        .get(0)
        .is_some_and(|h| h.trim().is_empty() || h.trim().eq_ignore_ascii_case("ticker"));
    let skip = usize::from(first_is_label);
    let tickers: Vec<String> = headers
        .iter()
        .skip(skip)
        .map(|h| h.trim().to_uppercase())
        .collect();

    let mut rows = Vec::with_capacity(tickers.len());
    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let record = result.map_err(csv_error)?;
        let row = (skip..record.len())
            .map(|c| number(&record, c, "covariance", line))
            .collect::<Result<Vec<f64>, _>>()?;
        rows.push(row);
    }

    CovarianceMatrix::new(tickers, rows)
}

pub fn read_covariance_file(path: &Path) -> Result<CovarianceMatrix, SigallocError> {
    read_covariance(open(path)?)
}

/// Reads `ticker,long,short,long_cost_basis,short_cost_basis[,stop_loss_pct]`
/// rows. A missing or blank stop-loss falls back to `default_stop_loss_pct`.
pub fn read_positions<R: Read>(
    reader: R,
    default_stop_loss_pct: f64,
) -> Result<Vec<Position>, SigallocError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let ticker_col = column(&headers, "ticker")?;
    let long_col = column(&headers, "long")?;
    let short_col = column(&headers, "short")?;
    let long_basis_col = column(&headers, "long_cost_basis")?;
    let short_basis_col = column(&headers, "short_cost_basis")?;
    let stop_col = column(&headers, "stop_loss_pct").ok();

    let mut positions = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let record = result.map_err(csv_error)?;
        let ticker = record.get(ticker_col).unwrap_or("").trim().to_uppercase();
        if ticker.is_empty() {
            return Err(SigallocError::Data {
                reason: format!("empty ticker on line {}", line),
            });
        }
        let stop_loss_pct = match stop_col {
            Some(c) if !record.get(c).unwrap_or("").trim().is_empty() => {
                number(&record, c, "stop_loss_pct", line)?
            }
            _ => default_stop_loss_pct,
        };
        let position = Position {
            ticker,
            long_qty: number(&record, long_col, "long", line)?,
            short_qty: number(&record, short_col, "short", line)?,
            long_cost_basis: number(&record, long_basis_col, "long_cost_basis", line)?,
            short_cost_basis: number(&record, short_basis_col, "short_cost_basis", line)?,
            stop_loss_pct,
        };
        if position.long_qty < 0.0 || position.short_qty < 0.0 {
            return Err(SigallocError::Data {
                reason: format!("negative quantity on line {}", line),
            });
        }
        positions.push(position);
    }
    Ok(positions)
}

pub fn read_positions_file(
    path: &Path,
    default_stop_loss_pct: f64,
) -> Result<Vec<Position>, SigallocError> {
    read_positions(open(path)?, default_stop_loss_pct)
}
