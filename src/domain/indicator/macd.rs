//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: line from bar slow-1, signal and histogram from bar slow-1 + signal-1.

use crate::domain::indicator::ema::{calculate_ema, ema_from_first_present};
use crate::domain::series::Series;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub fast: usize,
    pub slow: usize,
    pub signal_period: usize,
    pub line: Series,
    pub histogram: Series,
    pub signal: Series,
}

impl Macd {
    /// Output columns as `MACD_f_s_g`, `MACDh_f_s_g`, `MACDs_f_s_g`.
    pub fn named(self) -> Vec<(String, Series)> {
        let tag = format!("{}_{}_{}", self.fast, self.slow, self.signal_period);
        vec![
            (format!("MACD_{tag}"), self.line),
            (format!("MACDh_{tag}"), self.histogram),
            (format!("MACDs_{tag}"), self.signal),
        ]
    }
}

pub fn calculate_macd(close: &[f64], fast: usize, slow: usize, signal_period: usize) -> Macd {
    let ema_fast = calculate_ema(close, fast);
    let ema_slow = calculate_ema(close, slow);

    let line: Series = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| Some(f? - s?))
        .collect();
    let signal = ema_from_first_present(&line, signal_period);
    let histogram: Series = line
        .iter()
        .zip(signal.iter())
        .map(|(l, s)| Some(l? - s?))
        .collect();

    Macd {
        fast,
        slow,
        signal_period,
        line,
        histogram,
        signal,
    }
}
