//! ADX (Average Directional Index) with the +DI / -DI lines.
//!
//! TR[0] = H - L, TR[i] = max(H - L, |H - C[i-1]|, |L - C[i-1]|)
//! +DM = up if up > down and up > 0, -DM = down if down > up and down > 0
//! ATR, +DM and -DM use Wilder smoothing seeded with the SMA of the first n values.
//! DMP = 100 * +DM_s / ATR, DMN = 100 * -DM_s / ATR
//! DX = 100 * |DMP - DMN| / (DMP + DMN), ADX = Wilder smoothing of DX
//!
//! Warmup: DMP/DMN from bar n-1, ADX from bar 2n-2.

use crate::domain::ohlcv::true_range;
use crate::domain::series::Series;

#[derive(Debug, Clone, PartialEq)]
pub struct Adx {
    pub period: usize,
    pub adx: Series,
    pub plus_di: Series,
    pub minus_di: Series,
}

impl Adx {
    /// Output columns as `ADX_n`, `DMP_n`, `DMN_n`.
    pub fn named(self) -> Vec<(String, Series)> {
        let n = self.period;
        vec![
            (format!("ADX_{n}"), self.adx),
            (format!("DMP_{n}"), self.plus_di),
            (format!("DMN_{n}"), self.minus_di),
        ]
    }
}

/// Wilder smoothing: SMA seed at index period-1, then (prev * (n-1) + x) / n.
fn wilder_smooth(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut smoothed = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if i + 1 < period {
                None
            } else if i + 1 == period {
                smoothed = values[..period].iter().sum::<f64>() / period as f64;
                Some(smoothed)
            } else {
                smoothed = (smoothed * (period - 1) as f64 + v) / period as f64;
                Some(smoothed)
            }
        })
        .collect()
}

pub fn calculate_adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Adx {
    let n = close.len();
    if period == 0 || n < period {
        return Adx {
            period,
            adx: Series::missing(n),
            plus_di: Series::missing(n),
            minus_di: Series::missing(n),
        };
    }

    let mut tr = Vec::with_capacity(n);
    let mut plus_dm = Vec::with_capacity(n);
    let mut minus_dm = Vec::with_capacity(n);
    for i in 0..n {
        if i == 0 {
            tr.push(high[0] - low[0]);
            plus_dm.push(0.0);
            minus_dm.push(0.0);
            continue;
        }
        tr.push(true_range(high[i], low[i], close[i - 1]));
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }

    let atr = wilder_smooth(&tr, period);
    let plus_s = wilder_smooth(&plus_dm, period);
    let minus_s = wilder_smooth(&minus_dm, period);

    let di = |dm: Option<f64>, atr: Option<f64>| -> Option<f64> {
        let (dm, atr) = (dm?, atr?);
        Some(if atr == 0.0 { 0.0 } else { 100.0 * dm / atr })
    };
    let plus_di: Vec<Option<f64>> = (0..n).map(|i| di(plus_s[i], atr[i])).collect();
    let minus_di: Vec<Option<f64>> = (0..n).map(|i| di(minus_s[i], atr[i])).collect();

    let start = period - 1;
    let dx: Vec<f64> = (start..n)
        .filter_map(|i| {
            let (p, m) = (plus_di[i]?, minus_di[i]?);
            let sum = p + m;
            Some(if sum == 0.0 { 0.0 } else { 100.0 * (p - m).abs() / sum })
        })
        .collect();

    let mut adx = vec![None; start];
    adx.extend(wilder_smooth(&dx, period));

    Adx {
        period,
        adx: Series::new(adx),
        plus_di: Series::new(plus_di),
        minus_di: Series::new(minus_di),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_up(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let close: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let high = close.iter().map(|c| c + 1.0).collect();
        let low = close.iter().map(|c| c - 1.0).collect();
        (high, low, close)
    }

    #[test]
    fn wilder_seed_is_average() {
        let out = wilder_smooth(&[2.0, 4.0, 6.0, 10.0], 3);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 4.0).abs() < 1e-12);
        // (4 * 2 + 10) / 3 = 6
        assert!((out[3].unwrap() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn adx_warmup() {
        let (h, l, c) = trending_up(30);
        let out = calculate_adx(&h, &l, &c, 5);
        assert!(out.plus_di.get(3).is_none());
        assert!(out.plus_di.get(4).is_some());
        assert!(out.adx.get(7).is_none());
        assert!(out.adx.get(8).is_some());
    }

    #[test]
    fn uptrend_has_positive_direction() {
        let (h, l, c) = trending_up(40);
        let out = calculate_adx(&h, &l, &c, 14);
        assert!(out.plus_di.last().unwrap() > out.minus_di.last().unwrap());
        assert!(out.adx.last().unwrap() > 50.0);
    }

    #[test]
    fn flat_bars_are_zero() {
        let out = calculate_adx(&[10.0; 10], &[10.0; 10], &[10.0; 10], 3);
        assert_eq!(out.plus_di.last(), Some(0.0));
        assert_eq!(out.adx.last(), Some(0.0));
    }

    #[test]
    fn too_short_is_all_missing() {
        let out = calculate_adx(&[1.0, 2.0], &[0.5, 1.5], &[0.8, 1.8], 14);
        assert!(out.adx.present().is_empty());
        assert_eq!(out.adx.len(), 2);
    }

    #[test]
    fn named_columns() {
        let (h, l, c) = trending_up(5);
        let names: Vec<String> = calculate_adx(&h, &l, &c, 14)
            .named()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["ADX_14", "DMP_14", "DMN_14"]);
    }
}
