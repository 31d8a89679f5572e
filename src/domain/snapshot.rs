//! Per-timeframe snapshot: one row per instrument, as of its last bar.
//!
//! The builder fetches every instrument of the universe (in parallel, on a
//! bounded pool), then runs indicators, passthroughs and history
//! enhancers per instrument, keeps the last row, and finally applies the
//! cross-sectional enhancers and the composite score to the whole table.

use crate::domain::column::ColumnKey;
use crate::domain::composite::{SLOPE_SUM_ZZ, SUM_ZZ, composite_score, composite_trend};
use crate::domain::compute::compute_indicators;
use crate::domain::diagnostics::{Diagnostics, SkipReason};
use crate::domain::enhance::{EnhancerScope, enhance};
use crate::domain::error::SignalError;
use crate::domain::frame::{ColumnStore, FeatureFrame};
use crate::domain::ohlcv::OhlcvTable;
use crate::domain::passthrough::compute_passthroughs;
use crate::domain::registry::Registry;
use crate::domain::series::Series;
use crate::domain::settings::PipelineSettings;
use crate::domain::timeframe::Interval;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rayon::prelude::*;

pub const DATE_FORMAT: &str = "%m/%d/%y";
pub const TIME_FORMAT: &str = "%H:%M";

/// Identifying metadata of one snapshot row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMeta {
    pub ticker: String,
    pub timeframe: String,
    pub date: Option<String>,
    pub time: Option<String>,
    /// `false` for metadata-only placeholder rows.
    pub complete: bool,
}

impl RowMeta {
    pub fn placeholder(ticker: &str, timeframe: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            timeframe: timeframe.to_string(),
            date: None,
            time: None,
            complete: false,
        }
    }

    pub fn as_of(ticker: &str, timeframe: &str, ts: DateTime<Utc>, tz: Tz) -> Self {
        let local = ts.with_timezone(&tz);
        Self {
            ticker: ticker.to_string(),
            timeframe: timeframe.to_string(),
            date: Some(local.format(DATE_FORMAT).to_string()),
            time: Some(local.format(TIME_FORMAT).to_string()),
            complete: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    label: String,
    rows: Vec<RowMeta>,
    /// Column-major values, columns in first-seen order.
    columns: Vec<(ColumnKey, Vec<Option<f64>>)>,
}

impl Snapshot {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rows: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[RowMeta] {
        &self.rows
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.ticker.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.columns.iter().map(|(k, _)| k)
    }

    /// Every row's value for `key`, borrowed.
    pub fn values(&self, key: &ColumnKey) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn value(&self, row: usize, key: &ColumnKey) -> Option<f64> {
        self.values(key).and_then(|v| v.get(row).copied().flatten())
    }

    /// True when no row carries any feature value.
    pub fn is_all_missing(&self) -> bool {
        self.columns
            .iter()
            .all(|(_, v)| v.iter().all(Option::is_none))
    }

    /// Appends a row. Columns first seen here are back-filled with missing
    /// values; known columns this row lacks get a missing value.
    pub fn push_row(&mut self, meta: RowMeta, values: Vec<(ColumnKey, Option<f64>)>) {
        let row = self.rows.len();
        for (key, value) in values {
            match self.columns.iter_mut().find(|(k, _)| *k == key) {
                Some((_, column)) => {
                    if column.len() == row {
                        column.push(value);
                    } else {
                        column[row] = value;
                    }
                }
                None => {
                    let mut column = vec![None; row];
                    column.push(value);
                    self.columns.push((key, column));
                }
            }
        }
        for (_, column) in &mut self.columns {
            if column.len() == row {
                column.push(None);
            }
        }
        self.rows.push(meta);
    }
}

impl ColumnStore for Snapshot {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column(&self, key: &ColumnKey) -> Option<Series> {
        self.values(key).map(|v| Series::new(v.to_vec()))
    }

    fn set_column(&mut self, key: ColumnKey, values: Series) -> Result<(), SignalError> {
        if values.len() != self.rows.len() {
            return Err(SignalError::data(format!(
                "column {} has {} rows, snapshot has {}",
                key,
                values.len(),
                self.rows.len()
            )));
        }
        let values = values.values().to_vec();
        match self.columns.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((key, values)),
        }
        Ok(())
    }
}

/// One instrument's processed history and its as-of row.
struct Processed {
    meta: RowMeta,
    history: FeatureFrame,
}

pub struct SnapshotBuilder<'a> {
    data: &'a dyn DataPort,
    registry: &'a Registry,
    settings: &'a PipelineSettings,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(
        data: &'a dyn DataPort,
        registry: &'a Registry,
        settings: &'a PipelineSettings,
    ) -> Self {
        Self {
            data,
            registry,
            settings,
        }
    }

    /// One snapshot per configured timeframe, in configuration order.
    pub fn build_all(&self, diag: &mut Diagnostics) -> Vec<Snapshot> {
        self.settings
            .timeframes
            .iter()
            .map(|&interval| self.build(interval, diag))
            .collect()
    }

    pub fn build(&self, interval: Interval, diag: &mut Diagnostics) -> Snapshot {
        let label = interval.label();
        let period = self.settings.period_for(interval);
        tracing::info!(
            timeframe = %label,
            tickers = self.settings.tickers.len(),
            %period,
            "building snapshot"
        );

        let fetched = self.fetch_all(interval);

        let mut snapshot = Snapshot::new(label.as_str());
        let mut histories: Vec<Option<FeatureFrame>> = Vec::with_capacity(fetched.len());

        for (ticker, result) in self.settings.tickers.iter().zip(fetched) {
            let ticker = ticker.as_str();
            let table = match result {
                Ok(table) => table,
                Err(e) => {
                    diag.record(&label, Some(ticker), "fetch", SkipReason::Fetch {
                        reason: e.to_string(),
                    });
                    snapshot.push_row(RowMeta::placeholder(ticker, &label), Vec::new());
                    histories.push(None);
                    continue;
                }
            };

            if table.is_empty() {
                diag.record(&label, Some(ticker), "history", SkipReason::EmptyData);
                continue;
            }
            if table.len() < self.settings.min_bars {
                diag.record(&label, Some(ticker), "history", SkipReason::InsufficientHistory {
                    bars: table.len(),
                    minimum: self.settings.min_bars,
                });
                continue;
            }

            match self.process(ticker, &label, &table, diag) {
                Ok(processed) => {
                    snapshot.push_row(processed.meta, processed.history.last_row());
                    histories.push(Some(processed.history));
                }
                Err(reason) => {
                    diag.record(&label, Some(ticker), "snapshot", reason);
                    snapshot.push_row(RowMeta::placeholder(ticker, &label), Vec::new());
                    histories.push(None);
                }
            }
        }

        self.finish(&mut snapshot, interval, &histories, diag);

        tracing::info!(timeframe = %label, rows = snapshot.len(), "snapshot built");
        if snapshot.is_empty() {
            tracing::warn!(timeframe = %label, "no usable data");
        }
        snapshot
    }

    /// Fetches every ticker on a pool of `fetch_concurrency` threads. Results
    /// come back in universe order regardless of completion order.
    fn fetch_all(&self, interval: Interval) -> Vec<Result<OhlcvTable, SignalError>> {
        let data = self.data;
        let period = self.settings.period_for(interval);
        let tickers = &self.settings.tickers;
        let fetch = |ticker: &String| {
            tracing::debug!(%ticker, %interval, "fetching");
            data.fetch_ohlcv(ticker, interval, period)
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.fetch_concurrency)
            .build()
        {
            Ok(pool) => pool.install(|| tickers.par_iter().map(fetch).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "fetch pool unavailable, fetching sequentially");
                tickers.iter().map(fetch).collect()
            }
        }
    }

    fn process(
        &self,
        ticker: &str,
        label: &str,
        table: &OhlcvTable,
        diag: &mut Diagnostics,
    ) -> Result<Processed, SkipReason> {
        let mut history = compute_indicators(table, label, self.registry, Some(ticker), diag);
        let passthroughs = compute_passthroughs(table, label, self.registry, Some(ticker), diag);
        history
            .merge(passthroughs)
            .map_err(SkipReason::computation)?;

        enhance(
            &mut history,
            label,
            &self.registry.enhancers,
            EnhancerScope::History,
            Some(ticker),
            diag,
        );

        let ts = table
            .last_timestamp()
            .ok_or_else(|| SkipReason::computation("table has no timestamps"))?;
        let meta = RowMeta::as_of(ticker, label, ts, self.settings.market_timezone);
        Ok(Processed { meta, history })
    }

    /// Cross-sectional stage: z-scores, composite score and composite trend.
    fn finish(
        &self,
        snapshot: &mut Snapshot,
        interval: Interval,
        histories: &[Option<FeatureFrame>],
        diag: &mut Diagnostics,
    ) {
        if snapshot.is_empty() {
            return;
        }
        let label = interval.label();
        let enhancers = &self.registry.enhancers;

        enhance(snapshot, &label, enhancers, EnhancerScope::CrossSection, None, diag);

        let Some(sum) = composite_score(&*snapshot, &label, enhancers) else {
            tracing::debug!(timeframe = %label, "no z-score columns, composite skipped");
            return;
        };
        if let Err(e) = snapshot.set_column(ColumnKey::base(SUM_ZZ, &label), sum) {
            diag.record(&label, None, SUM_ZZ, SkipReason::computation(e));
        }

        if self.settings.composite_trend {
            let refs: Vec<Option<&FeatureFrame>> = histories.iter().map(Option::as_ref).collect();
            let slopes = composite_trend(&refs, &label, enhancers, interval.composite_window());
            if let Err(e) = snapshot.set_column(ColumnKey::base(SLOPE_SUM_ZZ, &label), slopes) {
                diag.record(&label, None, SLOPE_SUM_ZZ, SkipReason::computation(e));
            }
        }
    }
}
