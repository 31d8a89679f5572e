//! CMF (Chaikin Money Flow).
//!
//! MF multiplier = ((C - L) - (H - C)) / (H - L), 0 when H == L
//! CMF(n) = sum(multiplier * V, n) / sum(V, n)
//! Warmup: first (n-1) bars missing. A zero volume window is missing.

use crate::domain::series::Series;

pub fn calculate_cmf(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
    period: usize,
) -> Series {
    let n = close.len();
    if period == 0 {
        return Series::missing(n);
    }

    let money_flow: Vec<f64> = (0..n)
        .map(|i| {
            let range = high[i] - low[i];
            if range == 0.0 {
                0.0
            } else {
                ((close[i] - low[i]) - (high[i] - close[i])) / range * volume[i]
            }
        })
        .collect();

    (0..n)
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let start = i + 1 - period;
            let mf_sum: f64 = money_flow[start..=i].iter().sum();
            let vol_sum: f64 = volume[start..=i].iter().sum();
            if vol_sum == 0.0 {
                None
            } else {
                Some(mf_sum / vol_sum)
            }
        })
        .collect()
}
