//! CSV file price data adapter.
//!
//! One file per ticker, `<dir>/<TICKER>.csv`, with a
//! `date,open,high,low,close,volume` header.

use crate::domain::error::SigallocError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<T, SigallocError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| SigallocError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| SigallocError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, SigallocError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| SigallocError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SigallocError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| SigallocError::Data {
                reason: "missing date column".into(),
            })?;
            let timestamp = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                SigallocError::Data {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            if start_date.is_some_and(|s| timestamp < s) || end_date.is_some_and(|e| timestamp > e)
            {
                continue;
            }

            bars.push(PriceBar {
                ticker: ticker.to_string(),
                timestamp,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SigallocError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SigallocError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SigallocError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2023-01-03,102.0,103.0,101.0,102.0,1000\n\
            2023-01-01,100.0,101.0,99.0,100.0,1200\n\
            2023-01-02,95.0,96.0,94.0,95.0,900\n";

        fs::write(path.join("AAA.csv"), csv_content).unwrap();
        fs::write(path.join("BBB.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "ignore me").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_prices_sorts_ascending() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_prices("AAA", None, None).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
        assert_eq!(bars[0].close, 100.0);
        assert_eq!(bars[1].close, 95.0);
        assert_eq!(bars[2].close, 102.0);
        assert_eq!(bars[2].volume, 1000);
        assert_eq!(bars[0].ticker, "AAA");
    }

    #[test]
    fn fetch_prices_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let start = NaiveDate::from_ymd_opt(2023, 1, 2);
        let bars = adapter.fetch_prices("AAA", start, None).unwrap();
        assert_eq!(bars.len(), 2);

        let end = NaiveDate::from_ymd_opt(2023, 1, 2);
        let bars = adapter.fetch_prices("AAA", start, end).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 95.0);
    }

    #[test]
    fn fetch_prices_empty_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.fetch_prices("BBB", None, None).unwrap().is_empty());
    }

    #[test]
    fn fetch_prices_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_prices("ZZZ", None, None).unwrap_err();
        assert!(matches!(err, SigallocError::Data { .. }));
    }

    #[test]
    fn fetch_prices_bad_close() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "date,open,high,low,close,volume\n2023-01-01,1,1,1,abc,10\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let err = adapter.fetch_prices("BAD", None, None).unwrap_err();
        assert!(err.to_string().contains("invalid close value"));
    }

    #[test]
    fn list_tickers_only_csv() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_tickers().unwrap(), vec!["AAA", "BBB"]);
    }

    #[test]
    fn fetch_all_keeps_failures_per_ticker() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close,volume\n2023-01-01,1,1,1,abc,10\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);
        let all = adapter.fetch_all(
            &["AAA".to_string(), "BAD".to_string(), "BBB".to_string()],
            None,
            None,
        );
        assert_eq!(all["AAA"].as_ref().unwrap().len(), 3);
        assert!(all["BBB"].as_ref().unwrap().is_empty());
        let err = all["BAD"].as_ref().unwrap_err();
        assert!(err.to_string().contains("invalid close value"));
    }
}
