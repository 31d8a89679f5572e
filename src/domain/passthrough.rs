//! Passthrough computation engine: raw columns copied under
//! timeframe-qualified names, and simple ratios derived from them.

use crate::domain::column::{ColumnKey, ColumnVariant};
use crate::domain::compute::with_companions;
use crate::domain::diagnostics::{Diagnostics, SkipReason};
use crate::domain::frame::FeatureFrame;
use crate::domain::ohlcv::OhlcvTable;
use crate::domain::registry::{PassthroughSource, Registry};
use crate::domain::series::Series;

/// `<base>_<TF> / <base>_<TF>_Avg`, if both columns are in the frame.
pub fn ratio_to_average(frame: &FeatureFrame, base: &str, timeframe: &str) -> Option<Series> {
    let key = ColumnKey::base(base, timeframe);
    let values = frame.get(&key)?;
    let avg = frame.get(&key.with_variant(ColumnVariant::Avg))?;
    Some(values.ratio(avg))
}

pub fn compute_passthroughs(
    table: &OhlcvTable,
    timeframe: &str,
    registry: &Registry,
    ticker: Option<&str>,
    diag: &mut Diagnostics,
) -> FeatureFrame {
    let mut frame = FeatureFrame::new(table.len());

    for def in &registry.passthroughs {
        let key = ColumnKey::base(def.name.as_str(), timeframe);
        let base = match &def.source {
            PassthroughSource::Column(source) => match table.resolve_column(source) {
                Some(values) => Series::from_values(values),
                None => {
                    diag.record(timeframe, ticker, def.name.as_str(), SkipReason::MissingColumns {
                        missing: vec![source.clone()],
                    });
                    continue;
                }
            },
            PassthroughSource::RatioToAverage(of) => match ratio_to_average(&frame, of, timeframe) {
                Some(ratio) => ratio,
                None => {
                    let needed = ColumnKey::new(of.as_str(), ColumnVariant::Avg, timeframe);
                    diag.record(timeframe, ticker, def.name.as_str(), SkipReason::MissingColumns {
                        missing: vec![needed.to_string()],
                    });
                    continue;
                }
            },
        };

        let columns = with_companions(key, base, def.with_avg, def.with_slope, registry.avg_window);
        for (key, series) in columns {
            if let Err(e) = frame.insert(key, series) {
                diag.record(timeframe, ticker, def.name.as_str(), SkipReason::computation(e));
            }
        }
    }

    frame
}
