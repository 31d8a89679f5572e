//! Top/bottom ranking of instruments per tracked feature and timeframe.

use crate::domain::column::{ColumnKey, ColumnVariant, FeatureName};
use crate::domain::diagnostics::{Diagnostics, SkipReason};
use crate::domain::frame::ColumnStore;
use crate::domain::settings::SummarySettings;
use crate::domain::snapshot::Snapshot;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRanking {
    pub feature: FeatureName,
    pub top: Vec<String>,
    pub bottom: Vec<String>,
    /// Universe mean of the `_Avg` companion, when context is requested.
    pub avg_mean: Option<f64>,
    pub slope_mean: Option<f64>,
}

/// All rankings for one timeframe, in tracked-feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub timeframe: String,
    pub rankings: Vec<IndicatorRanking>,
}

impl SummaryRecord {
    pub fn ranking(&self, feature: &str) -> Option<&IndicatorRanking> {
        let feature = FeatureName::parse(feature);
        self.rankings.iter().find(|r| r.feature == feature)
    }
}

/// Descending, missing values last. Equal values keep row order.
fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Row indices of `snapshot` ordered by `key`, or `None` if the column is absent.
pub fn ranked_rows(snapshot: &Snapshot, key: &ColumnKey) -> Option<Vec<usize>> {
    let column = snapshot.column(key)?;
    let mut order: Vec<usize> = (0..snapshot.len()).collect();
    order.sort_by(|&a, &b| descending(column.get(a), column.get(b)));
    Some(order)
}

/// Head and reversed tail of an ordering. Both are the whole ordering
/// when it is shorter than `n`.
pub fn top_bottom<T: Clone>(ordered: &[T], n: usize) -> (Vec<T>, Vec<T>) {
    let top = ordered.iter().take(n).cloned().collect();
    let bottom = ordered.iter().rev().take(n).cloned().collect();
    (top, bottom)
}

/// Rounds half away from zero. When scaling would overflow, `value` is
/// returned unrounded.
pub fn round_to(value: f64, precision: usize) -> f64 {
    let scale = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() { rounded } else { value }
}

fn companion_mean(
    snapshot: &Snapshot,
    feature: &FeatureName,
    variant: ColumnVariant,
    precision: usize,
) -> Option<f64> {
    if feature.variant != ColumnVariant::Base {
        return None;
    }
    let key = ColumnKey::new(feature.indicator.as_str(), variant, snapshot.label());
    snapshot
        .column(&key)?
        .mean()
        .map(|m| round_to(m, precision))
}

pub fn summarize_snapshot(
    snapshot: &Snapshot,
    settings: &SummarySettings,
    diag: &mut Diagnostics,
) -> SummaryRecord {
    let label = snapshot.label();
    let tickers: Vec<String> = snapshot.tickers().map(str::to_string).collect();
    let mut rankings = Vec::with_capacity(settings.indicators.len());

    for feature in &settings.indicators {
        let key = feature.qualify(label);
        let Some(order) = ranked_rows(snapshot, &key) else {
            diag.record(label, None, key.to_string(), SkipReason::MissingSummaryColumn);
            continue;
        };
        let ordered: Vec<String> = order.iter().map(|&i| tickers[i].clone()).collect();
        let (top, bottom) = top_bottom(&ordered, settings.top_n);

        let (avg_mean, slope_mean) = if settings.include_context {
            (
                companion_mean(snapshot, feature, ColumnVariant::Avg, settings.precision),
                companion_mean(snapshot, feature, ColumnVariant::Slope, settings.precision),
            )
        } else {
            (None, None)
        };

        rankings.push(IndicatorRanking {
            feature: feature.clone(),
            top,
            bottom,
            avg_mean,
            slope_mean,
        });
    }

    tracing::debug!(timeframe = label, rankings = rankings.len(), "summarized");
    SummaryRecord {
        timeframe: label.to_string(),
        rankings,
    }
}

/// One record per snapshot, in snapshot order.
pub fn summarize(
    snapshots: &[Snapshot],
    settings: &SummarySettings,
    diag: &mut Diagnostics,
) -> Vec<SummaryRecord> {
    snapshots
        .iter()
        .map(|s| summarize_snapshot(s, settings, diag))
        .collect()
}
