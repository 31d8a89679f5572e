//! Support and resistance from a volume-by-price profile.

use crate::domain::error::SignalError;
use crate::domain::ohlcv::{CLOSE, OhlcvTable, VOLUME};
use crate::domain::summary::round_to;
use std::fmt;

pub const DEFAULT_BINS: usize = 30;
const TOP_LEVELS: usize = 5;
const STRONG: usize = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Levels {
    pub strong_support: Vec<f64>,
    pub weak_support: Vec<f64>,
    pub strong_resistance: Vec<f64>,
    pub weak_resistance: Vec<f64>,
}

impl Levels {
    pub fn is_empty(&self) -> bool {
        self.strong_support.is_empty() && self.strong_resistance.is_empty()
    }
}

fn join(levels: &[f64]) -> String {
    levels
        .iter()
        .map(|l| format!("{l:.2}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Levels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "strong resistance: {}", join(&self.strong_resistance))?;
        writeln!(f, "weak resistance:   {}", join(&self.weak_resistance))?;
        writeln!(f, "strong support:    {}", join(&self.strong_support))?;
        write!(f, "weak support:      {}", join(&self.weak_support))
    }
}

/// Volume summed per equal-width close-price bin, keyed by the rounded bin
/// midpoint. Bins are closed on both ends, so a close on a boundary counts
/// toward both neighbours.
pub fn volume_profile(closes: &[f64], volumes: &[f64], bins: usize) -> Vec<(f64, f64)> {
    let (Some(min), Some(max)) = (
        closes.iter().copied().reduce(f64::min),
        closes.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };
    let step = (max - min) / bins as f64;

    let mut profile: Vec<(f64, f64)> = Vec::with_capacity(bins);
    for i in 0..bins {
        let lower = min + i as f64 * step;
        let upper = lower + step;
        let volume: f64 = closes
            .iter()
            .zip(volumes)
            .filter(|&(&c, _)| c >= lower && c <= upper)
            .map(|(_, &v)| v)
            .sum();
        let mid = round_to((lower + upper) / 2.0, 2);
        match profile.iter_mut().find(|(level, _)| *level == mid) {
            Some(entry) => entry.1 = volume,
            None => profile.push((mid, volume)),
        }
    }
    profile
}

pub fn support_resistance(table: &OhlcvTable, bins: usize) -> Result<Levels, SignalError> {
    let (Some(closes), Some(volumes)) = (table.column(CLOSE), table.column(VOLUME)) else {
        return Err(SignalError::data(format!(
            "support/resistance needs {CLOSE} and {VOLUME} columns"
        )));
    };
    if bins == 0 {
        return Err(SignalError::data("bin count must be at least 1"));
    }
    let Some(&current) = closes.last() else {
        return Ok(Levels::default());
    };

    let mut profile = volume_profile(closes, volumes, bins);
    profile.sort_by(|a, b| b.1.total_cmp(&a.1));
    let top: Vec<f64> = profile.iter().take(TOP_LEVELS).map(|(l, _)| *l).collect();

    let mut support: Vec<f64> = top.iter().copied().filter(|&l| l < current).collect();
    support.sort_by(|a, b| b.total_cmp(a));
    let mut resistance: Vec<f64> = top.iter().copied().filter(|&l| l > current).collect();
    resistance.sort_by(|a, b| a.total_cmp(b));

    let weak_support = support.split_off(STRONG.min(support.len()));
    let weak_resistance = resistance.split_off(STRONG.min(resistance.len()));
    Ok(Levels {
        strong_support: support,
        weak_support,
        strong_resistance: resistance,
        weak_resistance,
    })
}
