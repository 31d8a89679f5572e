#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use signalcraft::domain::error::SignalError;
pub use signalcraft::domain::ohlcv::{OhlcvBar, OhlcvTable};
use signalcraft::domain::timeframe::{Interval, Period};
use signalcraft::ports::data_port::DataPort;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory data port. Bars are served for every interval unless an
/// interval-specific entry exists.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub by_interval: HashMap<(String, Interval), Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub calls: Mutex<Vec<(String, Interval)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            by_interval: HashMap::new(),
            errors: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_interval_bars(mut self, ticker: &str, interval: Interval, bars: Vec<OhlcvBar>) -> Self {
        self.by_interval.insert((ticker.to_string(), interval), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        interval: Interval,
        _period: Period,
    ) -> Result<OhlcvTable, SignalError> {
        self.calls.lock().unwrap().push((ticker.to_string(), interval));
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SignalError::Fetch {
                ticker: ticker.to_string(),
                interval: interval.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self
            .by_interval
            .get(&(ticker.to_string(), interval))
            .or_else(|| self.data.get(ticker))
            .cloned()
            .unwrap_or_default();
        OhlcvTable::from_bars(&bars)
    }
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap()
}

/// Deterministic bars: a linear drift plus a wave, with varying volume.
pub fn generate_bars(count: usize, start_price: f64, drift: f64, phase: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = start_price + drift * t + 2.0 * (t * 0.4 + phase).sin();
            OhlcvBar {
                timestamp: start() + Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.0 + 0.2 * (t * 0.7 + phase).cos().abs(),
                low: close - 1.0,
                close,
                volume: 10_000.0 + 1_000.0 * ((i * 7 + phase as usize) % 11) as f64,
            }
        })
        .collect()
}

pub fn flat_bars(count: usize, price: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| OhlcvBar {
            timestamp: start() + Duration::days(i as i64),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 1_000.0,
        })
        .collect()
}
