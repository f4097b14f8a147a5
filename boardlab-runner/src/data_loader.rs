//! Bar and decision loading from CSV.
//!
//! Bars are read once, up front, and handed to the core as a `Vec<Bar>`.
//! Columns are matched by header name, either English (`date, open, high,
//! low, close, volume`) or the vendor's Chinese export (`日期, 开盘, 最高,
//! 最低, 收盘, 成交量`). Extra columns are ignored. Rows are kept in file
//! order; ordering problems are reported by the engine's input validation.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boardlab_core::domain::{Action, Bar, Decision};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{column}' (accepted headers: {accepted})")]
    MissingColumn {
        column: &'static str,
        accepted: String,
    },

    #[error("row {row}: {message}")]
    Parse { row: usize, message: String },
}

/// Where a bar series came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: String },
    Synthetic { seed: u64 },
}

/// Bars plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over every bar, for reproducibility checks.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn new(bars: Vec<Bar>, source: DataSource) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            bars,
            source,
            dataset_hash,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic { .. })
    }
}

const DATE: &[&str] = &["date", "日期", "trade_date"];
const OPEN: &[&str] = &["open", "开盘"];
const HIGH: &[&str] = &["high", "最高"];
const LOW: &[&str] = &["low", "最低"];
const CLOSE: &[&str] = &["close", "收盘"];
const VOLUME: &[&str] = &["volume", "成交量", "vol"];
const ACTION: &[&str] = &["action", "signal", "信号"];

fn column(
    headers: &csv::StringRecord,
    name: &'static str,
    aliases: &[&str],
) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| {
            let h = h.trim().trim_start_matches('\u{feff}');
            aliases.iter().any(|a| h.eq_ignore_ascii_case(a))
        })
        .ok_or_else(|| LoadError::MissingColumn {
            column: name,
            accepted: aliases.join(", "),
        })
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD` and `YYYYMMDD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, row: usize) -> Result<&'r str, LoadError> {
    record.get(idx).map(str::trim).ok_or_else(|| LoadError::Parse {
        row,
        message: format!("missing field {idx}"),
    })
}

fn number(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
    name: &str,
) -> Result<f64, LoadError> {
    let raw = field(record, idx, row)?;
    raw.parse::<f64>().map_err(|_| LoadError::Parse {
        row,
        message: format!("{name} '{raw}' is not a number"),
    })
}

fn date(record: &csv::StringRecord, idx: usize, row: usize) -> Result<NaiveDate, LoadError> {
    let raw = field(record, idx, row)?;
    parse_date(raw).ok_or_else(|| LoadError::Parse {
        row,
        message: format!("unrecognised date '{raw}'"),
    })
}

/// Read bars from any CSV source.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let cols = [
        column(&headers, "date", DATE)?,
        column(&headers, "open", OPEN)?,
        column(&headers, "high", HIGH)?,
        column(&headers, "low", LOW)?,
        column(&headers, "close", CLOSE)?,
        column(&headers, "volume", VOLUME)?,
    ];

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let row = i + 2;
        let volume = number(&record, cols[5], row, "volume")?;
        if !(volume.is_finite() && volume >= 0.0) {
            return Err(LoadError::Parse {
                row,
                message: format!("volume {volume} must be non-negative"),
            });
        }
        bars.push(Bar {
            date: date(&record, cols[0], row)?,
            open: number(&record, cols[1], row, "open")?,
            high: number(&record, cols[2], row, "high")?,
            low: number(&record, cols[3], row, "low")?,
            close: number(&record, cols[4], row, "close")?,
            volume: volume.round() as u64,
        });
    }
    Ok(bars)
}

/// Read a `date,action` decision series.
pub fn read_decisions<R: Read>(reader: R) -> Result<Vec<Decision>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let date_col = column(&headers, "date", DATE)?;
    let action_col = column(&headers, "action", ACTION)?;

    let mut decisions = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 2;
        let raw = field(&record, action_col, row)?;
        let action: Action = raw.parse().map_err(|e| LoadError::Parse {
            row,
            message: format!("{e}"),
        })?;
        decisions.push(Decision::new(date(&record, date_col, row)?, action));
    }
    Ok(decisions)
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_bars_csv(path: &Path) -> Result<LoadedData, LoadError> {
    let bars = read_bars(open(path)?)?;
    tracing::info!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(LoadedData::new(
        bars,
        DataSource::Csv {
            path: path.display().to_string(),
        },
    ))
}

pub fn load_decisions_csv(path: &Path) -> Result<Vec<Decision>, LoadError> {
    let decisions = read_decisions(open(path)?)?;
    tracing::info!(path = %path.display(), decisions = decisions.len(), "loaded decisions");
    Ok(decisions)
}

/// Write bars with English headers.
pub fn write_bars<W: Write>(bars: &[Bar], writer: W) -> Result<(), LoadError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "open", "high", "low", "close", "volume"])?;
    for bar in bars {
        wtr.write_record([
            bar.date.to_string(),
            format!("{:.4}", bar.open),
            format!("{:.4}", bar.high),
            format!("{:.4}", bar.low),
            format!("{:.4}", bar.close),
            bar.volume.to_string(),
        ])?;
    }
    wtr.flush().map_err(|e| LoadError::Csv(e.into()))?;
    Ok(())
}

/// Keep bars inside an inclusive date window.
pub fn filter_date_range(
    bars: Vec<Bar>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| start.map_or(true, |s| b.date >= s) && end.map_or(true, |e| b.date <= e))
        .collect()
}

/// Deterministic BLAKE3 hash over dates and OHLCV values.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLISH: &str = "\
date,open,high,low,close,volume
2024-01-02,10.00,10.50,9.90,10.30,120000
2024-01-03,10.30,10.80,10.20,10.70,98000
";

    const CHINESE: &str = "\
日期,股票代码,开盘,收盘,最高,最低,成交量,成交额
2024-01-02,600519,10.00,10.30,10.50,9.90,120000,1236000.0
2024-01-03,600519,10.30,10.70,10.80,10.20,98000,1048600.0
";

    #[test]
    fn english_headers() {
        let bars = read_bars(ENGLISH.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].close, 10.70);
        assert_eq!(bars[1].volume, 98_000);
    }

    #[test]
    fn chinese_headers_in_vendor_order() {
        let english = read_bars(ENGLISH.as_bytes()).unwrap();
        let chinese = read_bars(CHINESE.as_bytes()).unwrap();
        assert_eq!(english, chinese);
    }

    #[test]
    fn compact_dates_and_float_volume() {
        let csv = "date,open,high,low,close,volume\n20240102,1,2,0.5,1.5,100.0\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].volume, 100);
    }

    #[test]
    fn missing_column_names_accepted_aliases() {
        let err = read_bars("date,open,high,low,volume\n".as_bytes()).unwrap_err();
        match err {
            LoadError::MissingColumn { column, accepted } => {
                assert_eq!(column, "close");
                assert!(accepted.contains("收盘"));
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn bad_number_reports_row() {
        let csv = "date,open,high,low,close,volume\n2024-01-02,1,2,0.5,abc,100\n";
        match read_bars(csv.as_bytes()).unwrap_err() {
            LoadError::Parse { row, message } => {
                assert_eq!(row, 2);
                assert!(message.contains("close"));
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn decisions_parse_case_insensitively() {
        let csv = "date,action\n2024-01-02,buy\n2024-01-03,HOLD\n2024-01-04, Sell \n";
        let decisions = read_decisions(csv.as_bytes()).unwrap();
        let actions: Vec<Action> = decisions.iter().map(|d| d.action).collect();
        assert_eq!(actions, vec![Action::Buy, Action::Hold, Action::Sell]);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let csv = "date,action\n2024-01-02,short\n";
        assert!(matches!(
            read_decisions(csv.as_bytes()),
            Err(LoadError::Parse { row: 2, .. })
        ));
    }

    #[test]
    fn write_then_read_preserves_bars() {
        let bars = read_bars(ENGLISH.as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_bars(&bars, &mut buf).unwrap();
        assert_eq!(read_bars(buf.as_slice()).unwrap(), bars);
    }

    #[test]
    fn date_window_is_inclusive() {
        let bars = read_bars(ENGLISH.as_bytes()).unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 3);
        assert_eq!(filter_date_range(bars.clone(), d, d).len(), 1);
        assert_eq!(filter_date_range(bars, None, None).len(), 2);
    }

    #[test]
    fn dataset_hash_changes_with_data() {
        let mut bars = read_bars(ENGLISH.as_bytes()).unwrap();
        let before = dataset_hash(&bars);
        assert_eq!(before, dataset_hash(&bars));
        bars[0].close += 0.01;
        assert_ne!(before, dataset_hash(&bars));
    }
}
