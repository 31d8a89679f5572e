//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are missing.

use crate::domain::series::Series;

pub fn calculate_ema(values: &[f64], period: usize) -> Series {
    if period == 0 {
        return Series::missing(values.len());
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if i < period - 1 {
                sum += v;
                None
            } else if i == period - 1 {
                sum += v;
                ema = sum / period as f64;
                Some(ema)
            } else {
                ema = v * k + ema * (1.0 - k);
                Some(ema)
            }
        })
        .collect()
}

/// EMA over a series whose leading values may be missing; the average
/// starts at the first present value.
pub fn ema_from_first_present(series: &Series, period: usize) -> Series {
    let start = series
        .values()
        .iter()
        .position(Option::is_some)
        .unwrap_or(series.len());
    let tail: Vec<f64> = series.values()[start..]
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    let mut out = vec![None; start];
    out.extend(calculate_ema(&tail, period).iter());
    Series::new(out)
}
