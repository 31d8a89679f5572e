//! Bollinger Bands.
//!
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//! - Bandwidth: (Upper - Lower) / Middle × 100
//! - Percent: (Close - Lower) / (Upper - Lower)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are missing.

use crate::domain::series::Series;

#[derive(Debug, Clone, PartialEq)]
pub struct Bands {
    pub period: usize,
    pub stddev_mult_x100: u32,
    pub lower: Series,
    pub middle: Series,
    pub upper: Series,
    pub bandwidth: Series,
    pub percent: Series,
}

impl Bands {
    /// Output columns as `BBL_20_2.0`, `BBM_..`, `BBU_..`, `BBB_..`, `BBP_..`.
    pub fn named(self) -> Vec<(String, Series)> {
        let tag = format!("{}_{:.1}", self.period, self.stddev_mult_x100 as f64 / 100.0);
        vec![
            (format!("BBL_{tag}"), self.lower),
            (format!("BBM_{tag}"), self.middle),
            (format!("BBU_{tag}"), self.upper),
            (format!("BBB_{tag}"), self.bandwidth),
            (format!("BBP_{tag}"), self.percent),
        ]
    }
}

pub fn calculate_bollinger(close: &[f64], period: usize, stddev_mult_x100: u32) -> Bands {
    let n = close.len();
    let mult = stddev_mult_x100 as f64 / 100.0;
    let warmup = period.saturating_sub(1);

    let mut lower = Vec::with_capacity(n);
    let mut middle = Vec::with_capacity(n);
    let mut upper = Vec::with_capacity(n);
    let mut bandwidth = Vec::with_capacity(n);
    let mut percent = Vec::with_capacity(n);

    for i in 0..n {
        if period == 0 || i < warmup {
            lower.push(None);
            middle.push(None);
            upper.push(None);
            bandwidth.push(None);
            percent.push(None);
            continue;
        }

        let window = &close[i + 1 - period..=i];
        let mid: f64 = window.iter().sum::<f64>() / period as f64;
        let variance: f64 = window
            .iter()
            .map(|c| {
                let diff = c - mid;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();
        let up = mid + mult * stddev;
        let lo = mid - mult * stddev;

        lower.push(Some(lo));
        middle.push(Some(mid));
        upper.push(Some(up));
        bandwidth.push(Some((up - lo) / mid * 100.0));
        percent.push(Some((close[i] - lo) / (up - lo)));
    }

    Bands {
        period,
        stddev_mult_x100,
        lower: Series::new(lower),
        middle: Series::new(middle),
        upper: Series::new(upper),
        bandwidth: Series::new(bandwidth),
        percent: Series::new(percent),
    }
}
