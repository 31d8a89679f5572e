//! ROC (Rate of Change).
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: ROC = 0
//! Warmup: first n bars missing.

use crate::domain::series::Series;

pub fn calculate_roc(close: &[f64], period: usize) -> Series {
    (0..close.len())
        .map(|i| {
            if i < period {
                return None;
            }
            let prev_close = close[i - period];
            if prev_close == 0.0 {
                Some(0.0)
            } else {
                Some((close[i] - prev_close) / prev_close * 100.0)
            }
        })
        .collect()
}
