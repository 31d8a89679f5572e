//! Indicator computation engine.
//!
//! Turns one instrument's OHLCV table into timeframe-qualified indicator
//! columns, in registry order. An entry whose inputs are missing or whose
//! computation fails is recorded and skipped; the rest still run.

use crate::domain::column::{ColumnKey, ColumnVariant};
use crate::domain::diagnostics::{Diagnostics, SkipReason};
use crate::domain::frame::FeatureFrame;
use crate::domain::indicator::IndicatorOutput;
use crate::domain::ohlcv::OhlcvTable;
use crate::domain::passthrough::ratio_to_average;
use crate::domain::registry::{IndicatorDefinition, Registry};
use crate::domain::series::Series;

/// Base column plus the `_Avg` / `_Slope` companions its flags ask for.
pub fn with_companions(
    key: ColumnKey,
    base: Series,
    with_avg: bool,
    with_slope: bool,
    avg_window: usize,
) -> Vec<(ColumnKey, Series)> {
    let mut out = Vec::with_capacity(3);
    if with_avg {
        out.push((key.with_variant(ColumnVariant::Avg), base.rolling_mean(avg_window)));
    }
    if with_slope {
        out.push((key.with_variant(ColumnVariant::Slope), base.diff(1)));
    }
    out.insert(0, (key, base));
    out
}

/// Columns for a single registry entry.
pub fn compute_indicator(
    def: &IndicatorDefinition,
    table: &OhlcvTable,
    timeframe: &str,
    avg_window: usize,
) -> Result<Vec<(ColumnKey, Series)>, SkipReason> {
    let missing: Vec<String> = def
        .columns
        .iter()
        .filter(|c| !table.has_column(c))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(SkipReason::MissingColumns { missing });
    }

    let inputs: Vec<&[f64]> = def
        .columns
        .iter()
        .filter_map(|c| table.column(c))
        .collect();

    let key = ColumnKey::base(def.name.as_str(), timeframe);
    let Some(computation) = &def.computation else {
        let first = inputs
            .first()
            .ok_or_else(|| SkipReason::computation("passthrough entry has no input column"))?;
        return Ok(with_companions(
            key,
            Series::from_values(first),
            def.with_avg,
            def.with_slope,
            avg_window,
        ));
    };

    match computation.compute(&inputs).map_err(SkipReason::computation)? {
        IndicatorOutput::Single(series) => Ok(with_companions(
            key,
            series,
            def.with_avg,
            def.with_slope,
            avg_window,
        )),
        IndicatorOutput::Multi(columns) => Ok(columns
            .into_iter()
            .map(|(name, series)| (ColumnKey::base(name, timeframe), series))
            .collect()),
    }
}

/// Runs every registry indicator over `table`.
///
/// When the frame ends up holding `VOLUME` with its average, the relative
/// volume column is appended last.
pub fn compute_indicators(
    table: &OhlcvTable,
    timeframe: &str,
    registry: &Registry,
    ticker: Option<&str>,
    diag: &mut Diagnostics,
) -> FeatureFrame {
    let mut frame = FeatureFrame::new(table.len());

    for def in &registry.indicators {
        let columns = match compute_indicator(def, table, timeframe, registry.avg_window) {
            Ok(columns) => columns,
            Err(reason) => {
                diag.record(timeframe, ticker, def.name.as_str(), reason);
                continue;
            }
        };
        tracing::debug!(indicator = %def.name, timeframe, columns = columns.len(), "computed");
        for (key, series) in columns {
            if let Err(e) = frame.insert(key, series) {
                diag.record(timeframe, ticker, def.name.as_str(), SkipReason::computation(e));
            }
        }
    }

    if let Some(rel) = ratio_to_average(&frame, "VOLUME", timeframe) {
        if let Err(e) = frame.insert(ColumnKey::base("REL_VOLUME", timeframe), rel) {
            diag.record(timeframe, ticker, "REL_VOLUME", SkipReason::computation(e));
        }
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorFn;
    use crate::domain::ohlcv::{CLOSE, OhlcvBar, VOLUME};
    use chrono::{Duration, TimeZone, Utc};

    fn make_bars(n: usize) -> Vec<OhlcvBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.5).sin() * 3.0 + i as f64 * 0.1;
                OhlcvBar {
                    timestamp: start + Duration::days(i as i64),
                    open: close - 0.2,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0 + (i % 7) as f64 * 150.0,
                }
            })
            .collect()
    }

    fn table(n: usize) -> OhlcvTable {
        OhlcvTable::from_bars(&make_bars(n)).unwrap()
    }

    fn names(frame: &FeatureFrame) -> Vec<String> {
        frame.keys().map(|k| k.to_string()).collect()
    }

    #[test]
    fn default_registry_columns_in_order() {
        let mut diag = Diagnostics::new();
        let frame = compute_indicators(&table(60), "1D", &Registry::default(), None, &mut diag);

        assert!(diag.is_empty());
        assert_eq!(
            names(&frame),
            vec![
                "CMF_1D",
                "CMF_1D_Avg",
                "CMF_1D_Slope",
                "RSI_1D",
                "RSI_1D_Avg",
                "RSI_1D_Slope",
                "MACD_12_26_9_1D",
                "MACDh_12_26_9_1D",
                "MACDs_12_26_9_1D",
                "OBV_1D",
                "OBV_1D_Avg",
                "OBV_1D_Slope",
                "VWAP_1D",
                "BBL_20_2.0_1D",
                "BBM_20_2.0_1D",
                "BBU_20_2.0_1D",
                "BBB_20_2.0_1D",
                "BBP_20_2.0_1D",
            ]
        );
    }

    #[test]
    fn avg_companion_is_rolling_mean_of_base() {
        let mut diag = Diagnostics::new();
        let frame = compute_indicators(&table(40), "1H", &Registry::default(), None, &mut diag);
        let base = frame.get(&ColumnKey::base("OBV", "1H")).unwrap();
        let avg = frame
            .get(&ColumnKey::new("OBV", ColumnVariant::Avg, "1H"))
            .unwrap();

        assert!(avg.values()[..4].iter().all(Option::is_none));
        for i in 4..40 {
            let expected: f64 = (i - 4..=i).map(|j| base.get(j).unwrap()).sum::<f64>() / 5.0;
            assert!((avg.get(i).unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn missing_volume_skips_only_volume_indicators() {
        let raw = table(40).without_column(VOLUME);
        let mut diag = Diagnostics::new();
        let frame = compute_indicators(&raw, "1D", &Registry::default(), Some("AAA"), &mut diag);

        assert!(frame.contains(&ColumnKey::base("RSI", "1D")));
        assert!(frame.contains(&ColumnKey::base("MACDh_12_26_9", "1D")));
        assert!(!frame.keys().any(|k| k.indicator() == "CMF"));
        assert!(!frame.keys().any(|k| k.indicator() == "OBV"));
        assert!(!frame.keys().any(|k| k.indicator() == "VWAP"));

        let skipped: Vec<&str> = diag.entries().iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(skipped, vec!["CMF", "OBV", "VWAP"]);
        assert_eq!(
            diag.entries()[0].reason,
            SkipReason::MissingColumns {
                missing: vec!["Volume".into()]
            }
        );
    }

    #[test]
    fn failing_entry_does_not_stop_the_rest() {
        let mut registry = Registry::default();
        registry.indicators[0].computation = Some(IndicatorFn::Cmf { length: 0 });
        let mut diag = Diagnostics::new();
        let frame = compute_indicators(&table(40), "1D", &registry, None, &mut diag);

        assert_eq!(diag.len(), 1);
        assert!(matches!(diag.entries()[0].reason, SkipReason::Computation { .. }));
        assert!(frame.contains(&ColumnKey::base("RSI", "1D")));
    }

    #[test]
    fn passthrough_entry_copies_first_column() {
        let mut registry = Registry::default();
        registry.indicators = vec![IndicatorDefinition {
            name: "VOLUME".into(),
            computation: None,
            columns: vec![VOLUME.into()],
            with_avg: true,
            with_slope: false,
        }];
        let raw = table(10);
        let mut diag = Diagnostics::new();
        let frame = compute_indicators(&raw, "1D", &registry, None, &mut diag);

        assert_eq!(names(&frame), vec!["VOLUME_1D", "VOLUME_1D_Avg", "REL_VOLUME_1D"]);
        let vol = frame.get(&ColumnKey::base("VOLUME", "1D")).unwrap();
        assert_eq!(vol.present(), raw.column(VOLUME).unwrap().to_vec());
        let rel = frame.get(&ColumnKey::base("REL_VOLUME", "1D")).unwrap();
        assert!(rel.get(3).is_none());
        assert!(rel.get(4).is_some());
    }

    #[test]
    fn multi_output_is_not_double_tagged() {
        let mut registry = Registry::default();
        registry.indicators.retain(|d| d.name == "MACD");
        let mut diag = Diagnostics::new();
        let frame = compute_indicators(&table(40), "1D", &registry, None, &mut diag);
        assert!(frame.keys().all(|k| k.timeframe == "1D"));
        assert!(!names(&frame).iter().any(|n| n.ends_with("_1D_1D")));
    }

    #[test]
    fn exact_column_names_required() {
        let bars = make_bars(30);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let raw = OhlcvTable::new(bars.iter().map(|b| b.timestamp).collect())
            .unwrap()
            .with_column("close", closes)
            .unwrap();
        let mut registry = Registry::default();
        registry.indicators.retain(|d| d.name == "RSI");
        let mut diag = Diagnostics::new();
        let frame = compute_indicators(&raw, "1D", &registry, None, &mut diag);

        assert!(frame.is_empty());
        assert_eq!(
            diag.entries()[0].reason,
            SkipReason::MissingColumns {
                missing: vec![CLOSE.into()]
            }
        );
    }
}
