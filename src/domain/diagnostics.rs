//! Per-run record of everything the pipeline skipped.
//!
//! No single instrument, indicator or enhancer may abort a run. Each
//! failure is narrowed to a [`SkipReason`], logged, and collected here so
//! callers and tests can inspect what was left out.

use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("missing input columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("insufficient history: {bars} bars, need {minimum}")]
    InsufficientHistory { bars: usize, minimum: usize },

    #[error("fetch returned no data")]
    EmptyData,

    #[error("computation failed: {reason}")]
    Computation { reason: String },

    #[error("fetch failed: {reason}")]
    Fetch { reason: String },

    #[error("column not present in snapshot")]
    MissingSummaryColumn,
}

impl SkipReason {
    pub fn computation(reason: impl fmt::Display) -> Self {
        SkipReason::Computation {
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkipEntry {
    pub timeframe: String,
    pub ticker: Option<String>,
    /// The indicator, enhancer column or stage that was skipped.
    pub subject: String,
    pub reason: SkipReason,
}

impl fmt::Display for SkipEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ticker {
            Some(t) => write!(f, "[{}] {} {}: {}", self.timeframe, t, self.subject, self.reason),
            None => write!(f, "[{}] {}: {}", self.timeframe, self.subject, self.reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<SkipEntry>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        timeframe: &str,
        ticker: Option<&str>,
        subject: impl Into<String>,
        reason: SkipReason,
    ) {
        let entry = SkipEntry {
            timeframe: timeframe.to_string(),
            ticker: ticker.map(str::to_string),
            subject: subject.into(),
            reason,
        };
        tracing::warn!(
            timeframe = %entry.timeframe,
            ticker = entry.ticker.as_deref().unwrap_or("-"),
            subject = %entry.subject,
            "skipped: {}",
            entry.reason
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[SkipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_ticker<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a SkipEntry> {
        self.entries
            .iter()
            .filter(move |e| e.ticker.as_deref() == Some(ticker))
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}
