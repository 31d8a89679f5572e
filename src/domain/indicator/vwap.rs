//! Rolling VWAP over typical price.
//!
//! VWAP(n)[i] = sum(TP * V, n) / sum(V, n), TP = (H + L + C) / 3
//! Warmup: first (n-1) bars missing. A zero volume window is missing.

use crate::domain::ohlcv::typical_price;
use crate::domain::series::Series;

pub fn calculate_vwap(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
    window: usize,
) -> Series {
    let n = close.len();
    if window == 0 {
        return Series::missing(n);
    }

    let weighted: Vec<f64> = (0..n)
        .map(|i| typical_price(high[i], low[i], close[i]) * volume[i])
        .collect();

    (0..n)
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let start = i + 1 - window;
            let pv: f64 = weighted[start..=i].iter().sum();
            let v: f64 = volume[start..=i].iter().sum();
            if v == 0.0 { None } else { Some(pv / v) }
        })
        .collect()
}
