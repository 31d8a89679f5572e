//! Feature enhancement: derived statistics per declared indicator.
//!
//! Enhancers have one of two scopes. History enhancers (trend, noise,
//! impulse, smoothing, velocity) run over one instrument's bar history
//! before the last row is taken. The z-score is cross-sectional and runs
//! over a snapshot column, one row per instrument. [`enhance`] applies only
//! the enhancers of the requested scope, so each call site keeps its
//! meaning.

use crate::domain::column::ColumnKey;
use crate::domain::diagnostics::{Diagnostics, SkipReason};
use crate::domain::frame::ColumnStore;
use crate::domain::series::{Series, linear_slope};
use std::fmt;
use std::str::FromStr;

pub const TREND_WINDOW: usize = 10;
pub const NOISE_WINDOW: usize = 5;
pub const SMOOTH_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnhancerScope {
    /// Rows are bars of a single instrument.
    History,
    /// Rows are instruments of one snapshot.
    CrossSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enhancer {
    ZScore,
    TrueTrend,
    SignalNoise,
    SlopeDiff,
    SmoothSeries,
    VelocityRank,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown enhancer '{0}' (expected one of z_score, true_trend, signal_noise, slope_diff, smooth_series, velocity_rank)")]
pub struct UnknownEnhancer(pub String);

impl Enhancer {
    pub const ALL: [Enhancer; 6] = [
        Enhancer::ZScore,
        Enhancer::TrueTrend,
        Enhancer::SignalNoise,
        Enhancer::SlopeDiff,
        Enhancer::SmoothSeries,
        Enhancer::VelocityRank,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Enhancer::ZScore => "z_score",
            Enhancer::TrueTrend => "true_trend",
            Enhancer::SignalNoise => "signal_noise",
            Enhancer::SlopeDiff => "slope_diff",
            Enhancer::SmoothSeries => "smooth_series",
            Enhancer::VelocityRank => "velocity_rank",
        }
    }

    /// Column-name suffix, e.g. `RSI_Z_1D`.
    pub fn suffix(self) -> &'static str {
        match self {
            Enhancer::ZScore => "Z",
            Enhancer::TrueTrend => "Trend",
            Enhancer::SignalNoise => "Noise",
            Enhancer::SlopeDiff => "Impulse",
            Enhancer::SmoothSeries => "Smoothed",
            Enhancer::VelocityRank => "Velocity",
        }
    }

    pub fn scope(self) -> EnhancerScope {
        match self {
            Enhancer::ZScore => EnhancerScope::CrossSection,
            _ => EnhancerScope::History,
        }
    }

    pub fn apply(self, series: &Series) -> Series {
        match self {
            Enhancer::ZScore => z_score(series),
            Enhancer::TrueTrend => rolling_true_trend(series, TREND_WINDOW),
            Enhancer::SignalNoise => series.rolling_std(NOISE_WINDOW),
            Enhancer::SlopeDiff => series.diff(1),
            Enhancer::SmoothSeries => series.rolling_mean(SMOOTH_WINDOW),
            Enhancer::VelocityRank => series.pct_change(),
        }
    }
}

impl fmt::Display for Enhancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Enhancer {
    type Err = UnknownEnhancer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Enhancer::ALL
            .into_iter()
            .find(|e| e.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownEnhancer(s.to_string()))
    }
}

/// Ordered indicator → enhancers declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnhancerMap(Vec<(String, Vec<Enhancer>)>);

impl EnhancerMap {
    pub fn new(entries: Vec<(String, Vec<Enhancer>)>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Enhancer])> {
        self.0.iter().map(|(n, e)| (n.as_str(), e.as_slice()))
    }

    pub fn get(&self, indicator: &str) -> Option<&[Enhancer]> {
        self.0
            .iter()
            .find(|(n, _)| n == indicator)
            .map(|(_, e)| e.as_slice())
    }

    /// Indicators that declare the z-score, in declaration order.
    pub fn z_scored(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, e)| e.contains(&Enhancer::ZScore))
            .map(|(n, _)| n)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `(x - mean) / std` over the present values of the whole column, sample
/// standard deviation. Fewer than two values or a constant column give an
/// all-missing result.
pub fn z_score(series: &Series) -> Series {
    match (series.mean(), series.std()) {
        (Some(mean), Some(std)) => series.map(|x| (x - mean) / std),
        _ => Series::missing(series.len()),
    }
}

/// Linear-regression slope of the last `window` present observations.
pub fn true_trend(series: &Series, window: usize) -> Option<f64> {
    let present = series.present();
    if window == 0 || present.len() < window {
        return None;
    }
    linear_slope(&present[present.len() - window..])
}

/// [`true_trend`] over every full window of the series.
pub fn rolling_true_trend(series: &Series, window: usize) -> Series {
    series.rolling_apply(window, linear_slope)
}

/// Appends one column per (indicator, enhancer) pair of the given scope.
///
/// Indicators whose base column is absent are skipped entirely. A column
/// that cannot be stored is recorded and the remaining enhancers proceed.
pub fn enhance<S: ColumnStore>(
    store: &mut S,
    timeframe: &str,
    enhancers: &EnhancerMap,
    scope: EnhancerScope,
    ticker: Option<&str>,
    diag: &mut Diagnostics,
) {
    for (indicator, declared) in enhancers.iter() {
        let base_key = ColumnKey::base(indicator, timeframe);
        let Some(base) = store.column(&base_key) else {
            tracing::debug!(column = %base_key, "no base column, enhancement skipped");
            continue;
        };

        for &enhancer in declared.iter().filter(|e| e.scope() == scope) {
            let key = ColumnKey::enhanced(indicator, enhancer, timeframe);
            let values = enhancer.apply(&base);
            if let Err(e) = store.set_column(key.clone(), values) {
                diag.record(timeframe, ticker, key.to_string(), SkipReason::computation(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::FeatureFrame;
    use approx::assert_relative_eq;

    fn s(values: &[f64]) -> Series {
        Series::from_values(values)
    }

    fn map(entries: &[(&str, &[Enhancer])]) -> EnhancerMap {
        EnhancerMap::new(
            entries
                .iter()
                .map(|(n, e)| (n.to_string(), e.to_vec()))
                .collect(),
        )
    }

    mod identifiers {
        use super::*;

        #[test]
        fn ids_and_suffixes() {
            let pairs: Vec<(&str, &str)> =
                Enhancer::ALL.iter().map(|e| (e.id(), e.suffix())).collect();
            assert_eq!(
                pairs,
                vec![
                    ("z_score", "Z"),
                    ("true_trend", "Trend"),
                    ("signal_noise", "Noise"),
                    ("slope_diff", "Impulse"),
                    ("smooth_series", "Smoothed"),
                    ("velocity_rank", "Velocity"),
                ]
            );
        }

        #[test]
        fn parse_known_and_unknown() {
            assert_eq!("z_score".parse::<Enhancer>().unwrap(), Enhancer::ZScore);
            assert_eq!(" TRUE_TREND ".parse::<Enhancer>().unwrap(), Enhancer::TrueTrend);
            let err = "kurtosis".parse::<Enhancer>().unwrap_err();
            assert_eq!(err, UnknownEnhancer("kurtosis".into()));
        }

        #[test]
        fn only_z_score_is_cross_sectional() {
            for e in Enhancer::ALL {
                let expected = if e == Enhancer::ZScore {
                    EnhancerScope::CrossSection
                } else {
                    EnhancerScope::History
                };
                assert_eq!(e.scope(), expected);
            }
        }
    }

    mod statistics {
        use super::*;

        #[test]
        fn z_score_two_point_population() {
            let z = z_score(&s(&[70.0, 30.0]));
            let (a, b) = (z.get(0).unwrap(), z.get(1).unwrap());
            assert!(a > 0.0);
            assert!(b < 0.0);
            assert_relative_eq!(a + b, 0.0, epsilon = 1e-12);
            assert_relative_eq!(a, 2.0f64.sqrt() / 2.0, epsilon = 1e-12);
        }

        #[test]
        fn z_score_keeps_missing_rows() {
            let z = z_score(&Series::new(vec![Some(1.0), None, Some(3.0)]));
            assert!(z.get(1).is_none());
            assert_relative_eq!(z.get(0).unwrap(), -(2.0f64.sqrt()) / 2.0, epsilon = 1e-12);
        }

        #[test]
        fn z_score_constant_is_missing() {
            let z = z_score(&s(&[5.0, 5.0, 5.0]));
            assert!(z.present().is_empty());
        }

        #[test]
        fn z_score_single_row_is_missing() {
            assert_eq!(z_score(&s(&[5.0])).values(), &[None]);
        }

        #[test]
        fn true_trend_uses_last_window_of_present_values() {
            let series = Series::new(vec![Some(100.0), None, Some(1.0), Some(2.0), Some(3.0)]);
            assert_relative_eq!(true_trend(&series, 3).unwrap(), 1.0);
            assert_eq!(true_trend(&series, 5), None);
        }

        #[test]
        fn rolling_true_trend_needs_full_window() {
            let values: Vec<f64> = (0..12).map(|i| 2.0 * i as f64).collect();
            let trend = rolling_true_trend(&s(&values), TREND_WINDOW);
            assert!(trend.get(8).is_none());
            assert_relative_eq!(trend.get(9).unwrap(), 2.0, epsilon = 1e-12);
            assert_relative_eq!(trend.get(11).unwrap(), 2.0, epsilon = 1e-12);
        }

        #[test]
        fn history_enhancers() {
            let base = s(&[1.0, 2.0, 4.0, 8.0, 16.0]);
            assert_eq!(Enhancer::SlopeDiff.apply(&base).get(4), Some(8.0));
            assert_eq!(Enhancer::VelocityRank.apply(&base).get(4), Some(1.0));
            assert_relative_eq!(
                Enhancer::SmoothSeries.apply(&base).get(4).unwrap(),
                28.0 / 3.0
            );
            assert!(Enhancer::SignalNoise.apply(&base).get(3).is_none());
            assert!(Enhancer::SignalNoise.apply(&base).get(4).is_some());
        }
    }

    mod engine {
        use super::*;

        fn frame_with(indicator: &str, values: &[f64]) -> FeatureFrame {
            let mut frame = FeatureFrame::new(values.len());
            frame
                .insert(ColumnKey::base(indicator, "1D"), s(values))
                .unwrap();
            frame
        }

        #[test]
        fn applies_only_requested_scope() {
            let enhancers = map(&[("RSI", &[Enhancer::ZScore, Enhancer::SlopeDiff])]);
            let mut frame = frame_with("RSI", &[1.0, 3.0, 6.0]);
            let mut diag = Diagnostics::new();

            enhance(&mut frame, "1D", &enhancers, EnhancerScope::History, None, &mut diag);

            let names: Vec<String> = frame.keys().map(|k| k.to_string()).collect();
            assert_eq!(names, vec!["RSI_1D", "RSI_Impulse_1D"]);

            enhance(&mut frame, "1D", &enhancers, EnhancerScope::CrossSection, None, &mut diag);
            assert!(frame.contains(&ColumnKey::enhanced("RSI", Enhancer::ZScore, "1D")));
            assert!(diag.is_empty());
        }

        #[test]
        fn absent_base_column_is_skipped() {
            let enhancers = map(&[("OBV", &[Enhancer::TrueTrend]), ("RSI", &[Enhancer::SmoothSeries])]);
            let mut frame = frame_with("RSI", &[1.0, 2.0, 3.0]);
            let mut diag = Diagnostics::new();

            enhance(&mut frame, "1D", &enhancers, EnhancerScope::History, None, &mut diag);

            assert_eq!(frame.width(), 2);
            assert!(!frame.contains(&ColumnKey::enhanced("OBV", Enhancer::TrueTrend, "1D")));
            assert!(diag.is_empty());
        }

        #[test]
        fn z_scored_lists_declaring_indicators() {
            let enhancers = map(&[
                ("OBV", &[Enhancer::ZScore, Enhancer::TrueTrend]),
                ("RSI", &[Enhancer::SignalNoise]),
                ("VWAP", &[Enhancer::ZScore]),
            ]);
            assert_eq!(enhancers.z_scored().collect::<Vec<_>>(), vec!["OBV", "VWAP"]);
            assert_eq!(enhancers.get("RSI"), Some(&[Enhancer::SignalNoise][..]));
        }
    }
}
