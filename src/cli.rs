//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::signal_csv::{read_covariance_file, read_positions_file, read_signals_file};
use crate::domain::config_validation::{validate_allocation_config, validate_risk_config};
use crate::domain::covariance::CovarianceMatrix;
use crate::domain::error::SigallocError;
use crate::domain::ohlcv::{closes, PriceBar};
use crate::domain::optimizer::{optimize, AllocationMethod, PortfolioWeights};
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Position;
use crate::domain::position_limit::RiskConfig;
use crate::domain::risk_analysis::{analyze_portfolio, PriceHistory, RiskReport};
use crate::domain::universe::parse_tickers;
use crate::domain::volatility::daily_returns;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "sigalloc",
    about = "Signal-driven portfolio allocation and position risk limits"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Allocate portfolio weights from analyst signals
    Allocate {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV of agent,ticker,signal,confidence rows
        #[arg(short, long)]
        signals: PathBuf,
        /// Covariance matrix CSV; estimated from --prices when absent
        #[arg(long, required_unless_present = "prices")]
        covariance: Option<PathBuf>,
        /// Directory of <TICKER>.csv price files
        #[arg(short, long)]
        prices: Option<PathBuf>,
        /// Overrides [allocation] method
        #[arg(short, long)]
        method: Option<String>,
        /// Comma-separated tickers, overrides [universe] tickers
        #[arg(long)]
        tickers: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute volatility, tail risk and position limits per ticker
    Risk {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <TICKER>.csv price files
        #[arg(short, long)]
        prices: PathBuf,
        /// CSV of held positions
        #[arg(long)]
        positions: Option<PathBuf>,
        #[arg(long)]
        tickers: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Allocate {
            config,
            signals,
            covariance,
            prices,
            method,
            tickers,
            output,
        } => run_allocate(
            &config,
            &signals,
            covariance.as_deref(),
            prices.as_deref(),
            method.as_deref(),
            tickers.as_deref(),
            output.as_deref(),
        ),
        Command::Risk {
            config,
            prices,
            positions,
            tickers,
            output,
        } => run_risk(
            &config,
            &prices,
            positions.as_deref(),
            tickers.as_deref(),
            output.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SigallocError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Date bounds and trailing-bar limit applied to every price fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Keep only this many most recent bars; 0 keeps all.
    pub lookback: usize,
}

impl PriceWindow {
    fn trim(&self, bars: &mut Vec<PriceBar>) {
        if self.lookback > 0 && bars.len() > self.lookback {
            bars.drain(..bars.len() - self.lookback);
        }
    }

    pub fn fetch(
        &self,
        data: &dyn DataPort,
        ticker: &str,
    ) -> Result<Vec<PriceBar>, SigallocError> {
        let mut bars = data.fetch_prices(ticker, self.start_date, self.end_date)?;
        self.trim(&mut bars);
        Ok(bars)
    }

    pub fn fetch_all(
        &self,
        data: &dyn DataPort,
        tickers: &[String],
    ) -> PriceHistory {
        let mut prices = data.fetch_all(tickers, self.start_date, self.end_date);
        for bars in prices.values_mut().filter_map(|r| r.as_mut().ok()) {
            self.trim(bars);
        }
        prices
    }
}

fn parse_config_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDate>, SigallocError> {
    config
        .get_string("data", key)
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                SigallocError::ConfigInvalid {
                    section: "data".into(),
                    key: key.into(),
                    reason: "invalid date format (expected YYYY-MM-DD)".into(),
                }
            })
        })
        .transpose()
}

pub fn build_price_window(config: &dyn ConfigPort) -> Result<PriceWindow, SigallocError> {
    let start_date = parse_config_date(config, "start_date")?;
    let end_date = parse_config_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(SigallocError::ConfigInvalid {
                section: "data".into(),
                key: "start_date".into(),
                reason: "start_date must not be after end_date".into(),
            });
        }
    }

    let lookback = config.get_int("data", "lookback", 0);
    let lookback = usize::try_from(lookback).map_err(|_| SigallocError::ConfigInvalid {
        section: "data".into(),
        key: "lookback".into(),
        reason: "lookback must be non-negative".into(),
    })?;

    Ok(PriceWindow {
        start_date,
        end_date,
        lookback,
    })
}

/// Resolves the allocation method, preferring `method_override` over the
/// `[allocation] method` key.
pub fn build_allocation_method(
    config: &dyn ConfigPort,
    method_override: Option<&str>,
) -> Result<AllocationMethod, SigallocError> {
    let method = method_override
        .map(str::to_string)
        .or_else(|| config.get_string("allocation", "method"))
        .unwrap_or_else(|| "mean_variance".to_string());

    match method.trim().to_lowercase().as_str() {
        "mean_variance" => Ok(AllocationMethod::MeanVariance {
            risk_aversion: config.get_double("allocation", "risk_aversion", 1.0),
        }),
        "risk_parity" => Ok(AllocationMethod::RiskParity),
        other => Err(SigallocError::ConfigInvalid {
            section: "allocation".into(),
            key: "method".into(),
            reason: format!("unknown allocation method '{other}'"),
        }),
    }
}

pub fn build_risk_config(config: &dyn ConfigPort) -> RiskConfig {
    let defaults = RiskConfig::default();
    RiskConfig {
        max_position_fraction: config.get_double(
            "risk",
            "max_position_fraction",
            defaults.max_position_fraction,
        ),
        volatility_decay: config.get_double("risk", "volatility_decay", defaults.volatility_decay),
        default_stop_loss_pct: config.get_double(
            "risk",
            "default_stop_loss_pct",
            defaults.default_stop_loss_pct,
        ),
    }
}

pub fn build_portfolio(config: &dyn ConfigPort, positions: Vec<Position>) -> Portfolio {
    let mut portfolio = Portfolio::new(config.get_double("portfolio", "cash", 0.0));
    portfolio.margin_requirement = config.get_double("portfolio", "margin_requirement", 0.5);
    portfolio.margin_used = config.get_double("portfolio", "margin_used", 0.0);
    for position in positions {
        portfolio.add_position(position);
    }
    portfolio
}

pub fn resolve_tickers(
    ticker_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, SigallocError> {
    let raw = match ticker_override {
        Some(t) => t.to_string(),
        None => config
            .get_string("universe", "tickers")
            .ok_or_else(|| SigallocError::ConfigMissing {
                section: "universe".into(),
                key: "tickers".into(),
            })?,
    };

    parse_tickers(&raw).map_err(|e| SigallocError::ConfigInvalid {
        section: "universe".into(),
        key: "tickers".into(),
        reason: e.to_string(),
    })
}

/// Sample covariance of daily returns for `tickers`, in ticker order.
pub fn estimate_covariance(
    data: &dyn DataPort,
    tickers: &[String],
    window: &PriceWindow,
) -> Result<CovarianceMatrix, SigallocError> {
    let mut returns = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let bars = window.fetch(data, ticker)?;
        debug!(%ticker, bars = bars.len(), "loaded price history");
        returns.push(daily_returns(ticker, &closes(&bars))?);
    }
    CovarianceMatrix::from_returns(tickers.to_vec(), &returns)
}

/// Fetches prices for `tickers` and every held position, then runs the
/// per-ticker risk pass over `tickers`.
pub fn run_risk_pipeline(
    data: &dyn DataPort,
    tickers: &[String],
    portfolio: &Portfolio,
    config: &RiskConfig,
    window: &PriceWindow,
) -> RiskReport {
    let mut wanted = tickers.to_vec();
    for ticker in portfolio.positions.keys() {
        if !wanted.contains(ticker) {
            wanted.push(ticker.clone());
        }
    }
    let prices = window.fetch_all(data, &wanted);
    analyze_portfolio(tickers, &prices, portfolio, config)
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, SigallocError> {
    match path {
        Some(p) => {
            info!("Writing {}", p.display());
            Ok(Box::new(File::create(p)?))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

fn run_allocate(
    config_path: &Path,
    signals_path: &Path,
    covariance_path: Option<&Path>,
    prices_dir: Option<&Path>,
    method_override: Option<&str>,
    ticker_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), SigallocError> {
    let config = load_config(config_path)?;
    validate_allocation_config(&config)?;
    let method = build_allocation_method(&config, method_override)?;
    let tickers = resolve_tickers(ticker_override, &config)?;

    let signals = read_signals_file(signals_path)?;
    info!(
        agents = signals.agent_count(),
        tickers = tickers.len(),
        "Loaded signals"
    );

    let covariance = match (covariance_path, prices_dir) {
        (Some(path), _) => read_covariance_file(path)?,
        (None, Some(dir)) => {
            let window = build_price_window(&config)?;
            info!("Estimating covariance from {}", dir.display());
            estimate_covariance(&CsvAdapter::new(dir.to_path_buf()), &tickers, &window)?
        }
        (None, None) => {
            return Err(SigallocError::Data {
                reason: "either --covariance or --prices is required".into(),
            });
        }
    };

    let weights = optimize(&signals, &covariance, &tickers, method)?;
    log_weights(method, &weights);

    let mut report = CsvReportAdapter::new(open_output(output_path)?);
    report.write_weights(&weights)
}

fn log_weights(method: AllocationMethod, weights: &PortfolioWeights) {
    if weights.is_flat() {
        warn!("No conviction in any ticker; all weights are zero");
    }
    info!(
        method = method.name(),
        net = weights.sum(),
        gross = weights.gross(),
        "Allocation complete"
    );
}

fn run_risk(
    config_path: &Path,
    prices_dir: &Path,
    positions_path: Option<&Path>,
    ticker_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), SigallocError> {
    let config = load_config(config_path)?;
    validate_risk_config(&config)?;
    let risk_config = build_risk_config(&config);
    let window = build_price_window(&config)?;
    let data = CsvAdapter::new(prices_dir.to_path_buf());
    let tickers = match resolve_tickers(ticker_override, &config) {
        Err(SigallocError::ConfigMissing { .. }) => {
            info!("No universe configured; using every ticker in {}", prices_dir.display());
            data.list_tickers()?
        }
        other => other?,
    };

    let positions = match positions_path {
        Some(path) => read_positions_file(path, risk_config.default_stop_loss_pct)?,
        None => Vec::new(),
    };
    let portfolio = build_portfolio(&config, positions);
    info!(
        tickers = tickers.len(),
        positions = portfolio.position_count(),
        "Running risk analysis"
    );

    let report = run_risk_pipeline(&data, &tickers, &portfolio, &risk_config, &window);
    info!(
        analysed = report.analyses.len(),
        skipped = report.skipped.len(),
        "Risk analysis complete"
    );

    let mut output = CsvReportAdapter::new(open_output(output_path)?);
    output.write_risk_report(&report)
}

fn run_validate(config_path: &Path) -> Result<(), SigallocError> {
    let config = load_config(config_path)?;
    validate_allocation_config(&config)?;
    validate_risk_config(&config)?;
    build_price_window(&config)?;
    let method = build_allocation_method(&config, None)?;

    match resolve_tickers(None, &config) {
        Ok(tickers) => info!("Universe: {}", tickers.join(", ")),
        Err(SigallocError::ConfigMissing { .. }) => {
            warn!("No [universe] tickers configured")
        }
        Err(e) => return Err(e),
    }

    info!(method = method.name(), "Configuration is valid");
    Ok(())
}
