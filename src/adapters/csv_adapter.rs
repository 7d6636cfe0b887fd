//! CSV file data adapter.
//!
//! One file per instrument, `<code>_<exchange>.csv`, with the header
//! `date,open,high,low,close,volume` and ISO dates.

use crate::domain::error::AllocatorError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvAdapter {
    base_path: PathBuf,
}

fn feed_error(reason: String) -> AllocatorError {
    AllocatorError::DataFeed { reason }
}

fn field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<T, AllocatorError>
where
    T::Err: std::fmt::Display,
{
    let raw = record
        .get(index)
        .ok_or_else(|| feed_error(format!("line {line}: missing {name} column")))?;
    raw.trim()
        .parse()
        .map_err(|e| feed_error(format!("line {line}: invalid {name} value '{raw}': {e}")))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str, exchange: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, exchange))
    }

    fn read_all(&self, code: &str, exchange: &str) -> Result<Vec<OhlcvBar>, AllocatorError> {
        let path = self.csv_path(code, exchange);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AllocatorError::NoData {
                    code: code.to_string(),
                    exchange: exchange.to_string(),
                });
            }
            Err(e) => {
                return Err(feed_error(format!("failed to read {}: {}", path.display(), e)));
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| feed_error(format!("{}: {}", path.display(), e)))?;
            let line = record.position().map_or(0, |p| p.line());

            let raw_date: String = field(&record, 0, "date", line)?;
            let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
                .map_err(|e| feed_error(format!("line {line}: invalid date '{raw_date}': {e}")))?;

            let bar = OhlcvBar {
                code: code.to_string(),
                exchange: exchange.to_string(),
                date,
                open: field(&record, 1, "open", line)?,
                high: field(&record, 2, "high", line)?,
                low: field(&record, 3, "low", line)?,
                close: field(&record, 4, "close", line)?,
                volume: field(&record, 5, "volume", line)?,
            };
            if let Some(defect) = bar.defect() {
                return Err(feed_error(format!("{} line {line}: {defect}", path.display())));
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, AllocatorError> {
        let mut bars = self.read_all(code, exchange)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, AllocatorError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            feed_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let suffix = format!("_{}.csv", exchange);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| feed_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            if let Some(code) = name.to_string_lossy().strip_suffix(&suffix) {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
        exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AllocatorError> {
        let bars = match self.read_all(code, exchange) {
            Ok(bars) => bars,
            Err(AllocatorError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
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
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("SPY_US.csv"), csv_content).unwrap();
        fs::write(path.join("QQQ_US.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("BHP_ASX.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(
            path.join("INV_US.csv"),
            "date,open,high,low,close,volume\n2024-01-15,10,9,11,10,100\n",
        )
        .unwrap();
        fs::write(
            path.join("BAD_US.csv"),
            "date,open,high,low,close,volume\n2024-01-15,abc,1,1,1,1\n",
        )
        .unwrap();

        (dir, path)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn fetch_ohlcv_returns_sorted_bars() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("SPY", "US", date(15), date(17)).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, date(15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[0].code, "SPY");
        assert_eq!(bars[2].date, date(17));
    }

    #[test]
    fn fetch_ohlcv_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("SPY", "US", date(16), date(16)).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date(16));
    }

    #[test]
    fn missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_ohlcv("XYZ", "US", date(1), date(31));
        assert!(matches!(result, Err(AllocatorError::NoData { .. })));
    }

    #[test]
    fn malformed_value_is_data_feed_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_ohlcv("BAD", "US", date(1), date(31));
        match result {
            Err(AllocatorError::DataFeed { reason }) => assert!(reason.contains("open")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inverted_range_is_data_feed_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        match adapter.fetch_ohlcv("INV", "US", date(1), date(31)) {
            Err(AllocatorError::DataFeed { reason }) => assert!(reason.contains("low above high")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn list_symbols_returns_exchange_symbols() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.list_symbols("US").unwrap(), vec!["BAD", "INV", "QQQ", "SPY"]);
        assert_eq!(adapter.list_symbols("ASX").unwrap(), vec!["BHP"]);
    }

    #[test]
    fn data_range_spans_whole_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(
            adapter.get_data_range("SPY", "US").unwrap(),
            Some((date(15), date(17), 3))
        );
        assert_eq!(adapter.get_data_range("QQQ", "US").unwrap(), None);
        assert_eq!(adapter.get_data_range("XYZ", "US").unwrap(), None);
    }
}
