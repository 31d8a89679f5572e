//! OBV (On-Balance Volume).

use crate::domain::series::Series;

/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; every bar has a value.
pub fn calculate_obv(close: &[f64], volume: &[f64]) -> Series {
    let mut obv = 0.0;
    let mut prev_close = 0.0;

    close
        .iter()
        .zip(volume)
        .enumerate()
        .map(|(i, (&c, &v))| {
            if i == 0 {
                obv = v;
            } else if c > prev_close {
                obv += v;
            } else if c < prev_close {
                obv -= v;
            }
            prev_close = c;
            Some(obv)
        })
        .collect()
}
