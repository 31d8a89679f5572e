//! Pipeline settings and their validation.
//!
//! Everything is resolved and checked once, before any fetch, into an
//! immutable [`PipelineSettings`] that is passed to the engines explicitly.

use crate::domain::column::FeatureName;
use crate::domain::error::SignalError;
use crate::domain::timeframe::{Interval, Period, TimeframeError};
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

pub const DEFAULT_TIMEFRAMES: [Interval; 5] = [
    Interval::Min5,
    Interval::Hour1,
    Interval::Day1,
    Interval::Week1,
    Interval::Month1,
];
pub const DEFAULT_MIN_BARS: usize = 20;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 5;
pub const DEFAULT_MARKET_TIMEZONE: Tz = chrono_tz::America::New_York;
pub const DEFAULT_OUTPUT_DIR: &str = "data";

pub const DEFAULT_REDUCED_FEATURES: [&str; 9] = [
    "RSI",
    "RSI_Z",
    "BBP_20_2.0",
    "MACDh_12_26_9_Z",
    "OBV_Z",
    "CMF",
    "CMF_Z",
    "VWAP_Z",
    "sumZZ",
];
pub const DEFAULT_SUMMARY_INDICATORS: [&str; 7] = [
    "CMF",
    "RSI_Z",
    "CMF_Z",
    "OBV_Z",
    "MACDh_12_26_9_Z",
    "VWAP_Z",
    "sumZZ",
];
pub const DEFAULT_TOP_N: usize = 2;
pub const DEFAULT_PRECISION: usize = 2;
pub const MAX_PRECISION: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct SummarySettings {
    pub indicators: Vec<FeatureName>,
    pub top_n: usize,
    /// Attach universe means of the `_Avg` / `_Slope` companions.
    pub include_context: bool,
    pub precision: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            indicators: DEFAULT_SUMMARY_INDICATORS
                .iter()
                .map(|n| FeatureName::parse(n))
                .collect(),
            top_n: DEFAULT_TOP_N,
            include_context: false,
            precision: DEFAULT_PRECISION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub tickers: Vec<String>,
    pub timeframes: Vec<Interval>,
    pub min_bars: usize,
    pub fetch_concurrency: usize,
    pub market_timezone: Tz,
    pub composite_trend: bool,
    /// Lookback overrides; intervals not listed use their default period.
    pub periods: BTreeMap<Interval, Period>,
    pub reduced_features: Vec<FeatureName>,
    pub summary: SummarySettings,
    pub data_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            timeframes: DEFAULT_TIMEFRAMES.to_vec(),
            min_bars: DEFAULT_MIN_BARS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            market_timezone: DEFAULT_MARKET_TIMEZONE,
            composite_trend: true,
            periods: BTreeMap::new(),
            reduced_features: DEFAULT_REDUCED_FEATURES
                .iter()
                .map(|n| FeatureName::parse(n))
                .collect(),
            summary: SummarySettings::default(),
            data_dir: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalError> {
        let defaults = Self::default();

        let tickers = match config.get_string("universe", "tickers") {
            Some(raw) => parse_ticker_list(&raw)?,
            None => Vec::new(),
        };

        let timeframes = match config.get_string("pipeline", "timeframes") {
            Some(raw) => parse_timeframes(&raw)?,
            None => defaults.timeframes,
        };

        let min_bars = at_least(config, "pipeline", "min_bars", DEFAULT_MIN_BARS, 1)?;
        let fetch_concurrency = at_least(
            config,
            "pipeline",
            "fetch_concurrency",
            DEFAULT_FETCH_CONCURRENCY,
            1,
        )?;

        let market_timezone = match config.get_string("pipeline", "market_timezone") {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                SignalError::invalid(
                    "pipeline",
                    "market_timezone",
                    format!("unknown timezone '{name}'"),
                )
            })?,
            None => DEFAULT_MARKET_TIMEZONE,
        };

        let composite_trend = config.get_bool("pipeline", "composite_trend", true);
        let periods = parse_periods(config)?;

        let reduced_features = match config.get_list("features", "reduced") {
            Some(names) if !names.is_empty() => {
                names.iter().map(|n| FeatureName::parse(n)).collect()
            }
            _ => defaults.reduced_features,
        };

        let summary = SummarySettings {
            indicators: match config.get_list("summary", "indicators") {
                Some(names) if !names.is_empty() => {
                    names.iter().map(|n| FeatureName::parse(n)).collect()
                }
                _ => defaults.summary.indicators,
            },
            top_n: at_least(config, "summary", "top_n", DEFAULT_TOP_N, 1)?,
            include_context: config.get_bool("summary", "include_context", false),
            precision: precision(config)?,
        };

        Ok(Self {
            tickers,
            timeframes,
            min_bars,
            fetch_concurrency,
            market_timezone,
            composite_trend,
            periods,
            reduced_features,
            summary,
            data_dir: config.get_string("data", "dir").map(PathBuf::from),
            output_dir: config
                .get_string("output", "dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }

    pub fn period_for(&self, interval: Interval) -> Period {
        self.periods
            .get(&interval)
            .copied()
            .unwrap_or_else(|| interval.default_period())
    }

    /// Checks that the settings, after command-line overrides, describe a
    /// runnable pipeline.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.tickers.is_empty() {
            return Err(SignalError::ConfigMissing {
                section: "universe".to_string(),
                key: "tickers".to_string(),
            });
        }
        if self.timeframes.is_empty() {
            return Err(SignalError::invalid(
                "pipeline",
                "timeframes",
                "at least one timeframe is required",
            ));
        }
        Ok(())
    }
}

pub fn parse_ticker_list(raw: &str) -> Result<Vec<String>, SignalError> {
    parse_tickers(raw).map_err(|e| SignalError::invalid("universe", "tickers", e.to_string()))
}

pub fn parse_timeframes(raw: &str) -> Result<Vec<Interval>, SignalError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let interval: Interval = token
            .parse()
            .map_err(|e: TimeframeError| SignalError::invalid("pipeline", "timeframes", e.to_string()))?;
        if !seen.insert(interval) {
            return Err(SignalError::invalid(
                "pipeline",
                "timeframes",
                format!("duplicate timeframe '{token}'"),
            ));
        }
        out.push(interval);
    }
    if out.is_empty() {
        return Err(SignalError::invalid(
            "pipeline",
            "timeframes",
            "at least one timeframe is required",
        ));
    }
    Ok(out)
}

fn parse_periods(config: &dyn ConfigPort) -> Result<BTreeMap<Interval, Period>, SignalError> {
    let mut periods = BTreeMap::new();
    for key in config.section_keys("periods") {
        let interval: Interval = key
            .parse()
            .map_err(|_| SignalError::invalid("periods", &key, "unknown interval"))?;
        let raw = config
            .get_string("periods", &key)
            .ok_or_else(|| SignalError::ConfigMissing {
                section: "periods".to_string(),
                key: key.clone(),
            })?;
        let period: Period = raw
            .parse()
            .map_err(|e: TimeframeError| SignalError::invalid("periods", &key, e.to_string()))?;
        periods.insert(interval, period);
    }
    Ok(periods)
}

fn at_least(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
    minimum: i64,
) -> Result<usize, SignalError> {
    let value = config.get_int(section, key, default as i64);
    if value < minimum {
        return Err(SignalError::invalid(
            section,
            key,
            format!("{key} must be at least {minimum}"),
        ));
    }
    Ok(value as usize)
}

fn precision(config: &dyn ConfigPort) -> Result<usize, SignalError> {
    let value = at_least(config, "summary", "precision", DEFAULT_PRECISION, 0)?;
    if value > MAX_PRECISION {
        return Err(SignalError::invalid(
            "summary",
            "precision",
            format!("precision must be at most {MAX_PRECISION}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::column::ColumnVariant;
    use crate::domain::enhance::Enhancer;

    fn settings(ini: &str) -> Result<PipelineSettings, SignalError> {
        PipelineSettings::from_config(&FileConfigAdapter::from_string(ini).unwrap())
    }

    fn invalid_key(err: SignalError) -> String {
        match err {
            SignalError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    mod defaults {
        use super::*;

        #[test]
        fn empty_config_uses_defaults() {
            let s = settings("").unwrap();
            assert!(s.tickers.is_empty());
            assert_eq!(s.timeframes, DEFAULT_TIMEFRAMES.to_vec());
            assert_eq!(s.min_bars, 20);
            assert_eq!(s.fetch_concurrency, 5);
            assert_eq!(s.market_timezone, chrono_tz::America::New_York);
            assert!(s.composite_trend);
            assert_eq!(s.summary.top_n, 2);
            assert_eq!(s.summary.precision, 2);
            assert!(!s.summary.include_context);
            assert_eq!(s.output_dir, PathBuf::from("data"));
            assert_eq!(s.data_dir, None);
        }

        #[test]
        fn default_features_parse_to_typed_names() {
            let s = PipelineSettings::default();
            assert_eq!(s.reduced_features.len(), 9);
            assert_eq!(
                s.reduced_features[3],
                FeatureName::new("MACDh_12_26_9", ColumnVariant::Enhanced(Enhancer::ZScore))
            );
            assert_eq!(s.summary.indicators.last(), Some(&FeatureName::base("sumZZ")));
        }

        #[test]
        fn default_periods() {
            let s = PipelineSettings::default();
            assert_eq!(s.period_for(Interval::Min5).to_string(), "30d");
            assert_eq!(s.period_for(Interval::Day1).to_string(), "5y");
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn full_config() {
            let s = settings(
                r#"
[universe]
tickers = spy, qqq, iwm

[pipeline]
timeframes = 1h, 1d
min_bars = 30
fetch_concurrency = 8
market_timezone = Europe/London
composite_trend = false

[periods]
1d = 2y

[features]
reduced = RSI, sumZZ

[summary]
indicators = RSI, REL_VOLUME
top_n = 3
include_context = true
precision = 4

[data]
dir = /srv/bars

[output]
dir = /srv/out
"#,
            )
            .unwrap();

            assert_eq!(s.tickers, vec!["SPY", "QQQ", "IWM"]);
            assert_eq!(s.timeframes, vec![Interval::Hour1, Interval::Day1]);
            assert_eq!(s.min_bars, 30);
            assert_eq!(s.fetch_concurrency, 8);
            assert_eq!(s.market_timezone, chrono_tz::Europe::London);
            assert!(!s.composite_trend);
            assert_eq!(s.period_for(Interval::Day1).to_string(), "2y");
            assert_eq!(s.period_for(Interval::Hour1).to_string(), "60d");
            assert_eq!(
                s.reduced_features,
                vec![FeatureName::base("RSI"), FeatureName::base("sumZZ")]
            );
            assert_eq!(s.summary.indicators.len(), 2);
            assert_eq!(s.summary.top_n, 3);
            assert!(s.summary.include_context);
            assert_eq!(s.summary.precision, 4);
            assert_eq!(s.data_dir, Some(PathBuf::from("/srv/bars")));
            assert_eq!(s.output_dir, PathBuf::from("/srv/out"));
        }

        #[test]
        fn unknown_timeframe_rejected() {
            let err = settings("[pipeline]\ntimeframes = 1d, 4h\n").unwrap_err();
            assert_eq!(invalid_key(err), "timeframes");
        }

        #[test]
        fn duplicate_timeframe_rejected() {
            let err = settings("[pipeline]\ntimeframes = 1d, 1D\n").unwrap_err();
            assert_eq!(invalid_key(err), "timeframes");
        }

        #[test]
        fn duplicate_ticker_rejected() {
            let err = settings("[universe]\ntickers = SPY, spy\n").unwrap_err();
            assert_eq!(invalid_key(err), "tickers");
        }

        #[test]
        fn bad_timezone_rejected() {
            let err = settings("[pipeline]\nmarket_timezone = Mars/Olympus\n").unwrap_err();
            assert_eq!(invalid_key(err), "market_timezone");
        }

        #[test]
        fn zero_concurrency_rejected() {
            let err = settings("[pipeline]\nfetch_concurrency = 0\n").unwrap_err();
            assert_eq!(invalid_key(err), "fetch_concurrency");
        }

        #[test]
        fn zero_top_n_rejected() {
            let err = settings("[summary]\ntop_n = 0\n").unwrap_err();
            assert_eq!(invalid_key(err), "top_n");
        }

        #[test]
        fn precision_is_bounded() {
            let err = settings("[summary]\nprecision = 400\n").unwrap_err();
            assert_eq!(invalid_key(err), "precision");
            let err = settings("[summary]\nprecision = -1\n").unwrap_err();
            assert_eq!(invalid_key(err), "precision");
            let s = settings("[summary]\nprecision = 15\n").unwrap();
            assert_eq!(s.summary.precision, MAX_PRECISION);
        }

        #[test]
        fn bad_period_rejected() {
            let err = settings("[periods]\n1h = soon\n").unwrap_err();
            assert_eq!(invalid_key(err), "1h");
        }

        #[test]
        fn unknown_period_interval_rejected() {
            let err = settings("[periods]\n3h = 10d\n").unwrap_err();
            assert_eq!(invalid_key(err), "3h");
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn missing_universe() {
            let err = PipelineSettings::default().validate().unwrap_err();
            assert!(matches!(err, SignalError::ConfigMissing { ref key, .. } if key == "tickers"));
        }

        #[test]
        fn runnable_after_override() {
            let mut s = PipelineSettings::default();
            s.tickers = vec!["SPY".into()];
            assert!(s.validate().is_ok());
        }
    }
}
