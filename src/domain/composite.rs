//! Composite anomaly score across z-scored indicators.
//!
//! `sumZZ_<TF>` is the row-wise sum of the `<Indicator>_Z_<TF>` columns of
//! every indicator that declares the z-score, skipping missing terms.
//! `slope_sumZZ_<TF>` is the regression slope of each instrument's composite
//! over the last `window` bars, with every bar z-scored across the universe
//! the same way the snapshot is.

use crate::domain::column::ColumnKey;
use crate::domain::enhance::{Enhancer, EnhancerMap, true_trend, z_score};
use crate::domain::frame::{ColumnStore, FeatureFrame};
use crate::domain::series::Series;

pub const SUM_ZZ: &str = "sumZZ";
pub const SLOPE_SUM_ZZ: &str = "slope_sumZZ";

/// Skip-missing row-wise sum; a row with no present term is missing.
pub fn row_sum(columns: &[Series], rows: usize) -> Series {
    (0..rows)
        .map(|i| {
            columns
                .iter()
                .filter_map(|c| c.get(i))
                .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v))
        })
        .collect()
}

/// The composite over whichever z-score columns exist in `store`, or `None`
/// when none do.
pub fn composite_score<S: ColumnStore>(
    store: &S,
    timeframe: &str,
    enhancers: &EnhancerMap,
) -> Option<Series> {
    let columns: Vec<Series> = enhancers
        .z_scored()
        .filter_map(|ind| store.column(&ColumnKey::enhanced(ind, Enhancer::ZScore, timeframe)))
        .collect();
    if columns.is_empty() {
        return None;
    }
    Some(row_sum(&columns, store.row_count()))
}

/// Composite trend per instrument.
///
/// `histories` holds one entry per snapshot row (`None` for rows without
/// history). For each of the last `window` bars, counted back from each
/// instrument's own last bar, the base columns of the z-scored indicators are
/// z-scored across instruments and summed. The result is the slope of that
/// composite history; fewer than `window` composite values give a missing
/// slope.
pub fn composite_trend(
    histories: &[Option<&FeatureFrame>],
    timeframe: &str,
    enhancers: &EnhancerMap,
    window: usize,
) -> Series {
    let n = histories.len();
    let keys: Vec<ColumnKey> = enhancers
        .z_scored()
        .map(|ind| ColumnKey::base(ind, timeframe))
        .collect();

    // composite[i][k]: instrument i, k bars before its last bar
    let mut composite = vec![vec![None; window]; n];
    for bars_ago in 0..window {
        let mut terms: Vec<Series> = Vec::with_capacity(keys.len());
        for key in &keys {
            let cross_section: Series = histories
                .iter()
                .map(|h| h.and_then(|frame| value_from_end(frame, key, bars_ago)))
                .collect();
            terms.push(z_score(&cross_section));
        }
        let summed = row_sum(&terms, n);
        for (i, row) in composite.iter_mut().enumerate() {
            row[bars_ago] = summed.get(i);
        }
    }

    composite
        .into_iter()
        .map(|mut row| {
            row.reverse();
            true_trend(&Series::new(row), window)
        })
        .collect()
}

fn value_from_end(frame: &FeatureFrame, key: &ColumnKey, bars_ago: usize) -> Option<f64> {
    let idx = frame.len().checked_sub(bars_ago + 1)?;
    frame.get(key)?.get(idx)
}
