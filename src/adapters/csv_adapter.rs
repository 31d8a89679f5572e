//! CSV file data adapter.
//!
//! Reads `<dir>/<TICKER>_<interval>.csv`. The first column is the bar
//! timestamp; OHLCV headers are matched case-insensitively and renamed to
//! their canonical spelling, other columns are kept as written.

use crate::domain::error::SignalError;
use crate::domain::ohlcv::{CLOSE, HIGH, LOW, OPEN, OhlcvTable, VOLUME};
use crate::domain::timeframe::{Interval, Period};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::fs;
use std::path::PathBuf;

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

fn canonical(header: &str) -> String {
    let trimmed = header.trim();
    [OPEN, HIGH, LOW, CLOSE, VOLUME]
        .into_iter()
        .find(|c| c.eq_ignore_ascii_case(trimmed))
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

/// RFC 3339, `YYYY-mm-dd HH:MM[:SS]` or a bare date. Naive values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, ticker: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", ticker, interval))
    }
}

impl DataPort for CsvDataAdapter {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        interval: Interval,
        period: Period,
    ) -> Result<OhlcvTable, SignalError> {
        let fetch_err = |reason: String| SignalError::Fetch {
            ticker: ticker.to_string(),
            interval: interval.to_string(),
            reason,
        };

        let path = self.csv_path(ticker, interval);
        let content = fs::read_to_string(&path)
            .map_err(|e| fetch_err(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| fetch_err(format!("CSV header error: {e}")))?
            .iter()
            .skip(1)
            .map(canonical)
            .collect();

        let mut rows: Vec<(DateTime<Utc>, Vec<f64>)> = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| fetch_err(format!("CSV parse error: {e}")))?;
            let raw_ts = record.get(0).unwrap_or_default();
            let ts = parse_timestamp(raw_ts)
                .ok_or_else(|| fetch_err(format!("invalid timestamp {raw_ts:?} on row {}", line + 1)))?;

            let values: Option<Vec<f64>> = record
                .iter()
                .skip(1)
                .map(|cell| cell.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect();
            match values {
                Some(values) if values.len() == headers.len() => rows.push((ts, values)),
                _ => tracing::debug!(%ticker, row = line + 1, "skipping incomplete row"),
            }
        }

        rows.sort_by_key(|(ts, _)| *ts);
        rows.dedup_by_key(|(ts, _)| *ts);
        if let Some(&(last, _)) = rows.last() {
            let cutoff = last - Duration::days(period.days());
            rows.retain(|(ts, _)| *ts > cutoff);
        }

        let mut table = OhlcvTable::new(rows.iter().map(|(ts, _)| *ts).collect())?;
        for (col, name) in headers.iter().enumerate() {
            table = table.with_column(name.as_str(), rows.iter().map(|(_, v)| v[col]).collect())?;
        }
        tracing::debug!(%ticker, %interval, bars = table.len(), "loaded");
        Ok(table)
    }
}
