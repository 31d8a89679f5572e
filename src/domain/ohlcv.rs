//! OHLCV bars and the column-oriented table the engines read from.

use crate::domain::error::SignalError;
use chrono::{DateTime, Utc};

pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// (high + low + close) / 3
pub fn typical_price(high: f64, low: f64, close: f64) -> f64 {
    (high + low + close) / 3.0
}

/// max(high - low, |high - prev_close|, |low - prev_close|)
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// One instrument's price history for one timeframe.
///
/// Rows are indexed by strictly ascending UTC timestamps. Columns are kept
/// under whatever names the fetcher produced; the engines only ever read
/// them and never mutate raw rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OhlcvTable {
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<(String, Vec<f64>)>,
}

impl OhlcvTable {
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Result<Self, SignalError> {
        if let Some(pair) = timestamps.windows(2).find(|w| w[0] >= w[1]) {
            return Err(SignalError::data(format!(
                "timestamps must be strictly ascending ({} followed by {})",
                pair[0], pair[1]
            )));
        }
        Ok(Self {
            timestamps,
            columns: Vec::new(),
        })
    }

    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, SignalError> {
        let name = name.into();
        if values.len() != self.timestamps.len() {
            return Err(SignalError::data(format!(
                "column {} has {} values for {} timestamps",
                name,
                values.len(),
                self.timestamps.len()
            )));
        }
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
        Ok(self)
    }

    /// Standard Open/High/Low/Close/Volume table from bars sorted by time.
    pub fn from_bars(bars: &[OhlcvBar]) -> Result<Self, SignalError> {
        Self::new(bars.iter().map(|b| b.timestamp).collect())?
            .with_column(OPEN, bars.iter().map(|b| b.open).collect())?
            .with_column(HIGH, bars.iter().map(|b| b.high).collect())?
            .with_column(LOW, bars.iter().map(|b| b.low).collect())?
            .with_column(CLOSE, bars.iter().map(|b| b.close).collect())?
            .with_column(VOLUME, bars.iter().map(|b| b.volume).collect())
    }

    pub fn without_column(mut self, name: &str) -> Self {
        self.columns.retain(|(n, _)| n != name);
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Exact-name lookup.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Lookup tolerant of upstream casing: tries the name as given, then
    /// lowercase, capitalized and uppercase variants.
    pub fn resolve_column(&self, name: &str) -> Option<&[f64]> {
        case_variants(name)
            .iter()
            .find_map(|candidate| self.column(candidate))
    }
}

fn case_variants(name: &str) -> [String; 4] {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    [name.to_string(), lower, capitalized, name.to_uppercase()]
}
