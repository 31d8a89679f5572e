//! Indicator, passthrough and enhancer registries.
//!
//! Names in configuration are resolved once, at load time, into typed
//! definitions. Nothing downstream looks a computation up by string.

use crate::domain::enhance::{Enhancer, EnhancerMap};
use crate::domain::error::SignalError;
use crate::domain::indicator::IndicatorFn;
use crate::domain::ohlcv::{CLOSE, HIGH, LOW, VOLUME};
use crate::ports::config_port::ConfigPort;
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_RSI_LENGTH: usize = 14;
pub const DEFAULT_CMF_LENGTH: usize = 20;
pub const DEFAULT_AVG_WINDOW: usize = 5;

pub const DEFAULT_INDICATORS: [&str; 6] = ["CMF", "RSI", "MACD", "OBV", "VWAP", "BB_POS"];
pub const DEFAULT_PASSTHROUGHS: [&str; 2] = ["VOLUME", "REL_VOLUME"];

const SECTION: &str = "registry";

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorDefinition {
    pub name: String,
    /// `None` copies the first input column unchanged.
    pub computation: Option<IndicatorFn>,
    pub columns: Vec<String>,
    pub with_avg: bool,
    pub with_slope: bool,
}

impl IndicatorDefinition {
    fn new(name: &str, computation: Option<IndicatorFn>, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            computation,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            with_avg: false,
            with_slope: false,
        }
    }

    fn with_companions(mut self) -> Self {
        self.with_avg = true;
        self.with_slope = true;
        self
    }
}

impl fmt::Display for IndicatorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.computation {
            Some(c) => write!(f, "{:<10} {:<16}", self.name, c.to_string())?,
            None => write!(f, "{:<10} {:<16}", self.name, "passthrough")?,
        }
        write!(f, " [{}]", self.columns.join(", "))?;
        if self.with_avg {
            f.write_str(" +avg")?;
        }
        if self.with_slope {
            f.write_str(" +slope")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassthroughSource {
    /// Raw OHLCV column, resolved case-insensitively.
    Column(String),
    /// Another passthrough divided by its own rolling average.
    RatioToAverage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughDefinition {
    pub name: String,
    pub source: PassthroughSource,
    pub with_avg: bool,
    pub with_slope: bool,
}

impl fmt::Display for PassthroughDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            PassthroughSource::Column(c) => write!(f, "{:<10} column {}", self.name, c)?,
            PassthroughSource::RatioToAverage(p) => {
                write!(f, "{:<10} {} / {}_Avg", self.name, p, p)?
            }
        }
        if self.with_avg {
            f.write_str(" +avg")?;
        }
        if self.with_slope {
            f.write_str(" +slope")?;
        }
        Ok(())
    }
}

/// Parameters the catalog entries take from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogParams {
    pub rsi_length: usize,
    pub cmf_length: usize,
}

impl Default for CatalogParams {
    fn default() -> Self {
        Self {
            rsi_length: DEFAULT_RSI_LENGTH,
            cmf_length: DEFAULT_CMF_LENGTH,
        }
    }
}

/// Every indicator the registry can be configured with.
pub fn catalog_entry(name: &str, params: CatalogParams) -> Option<IndicatorDefinition> {
    let hlcv = [HIGH, LOW, CLOSE, VOLUME];
    let def = match name {
        "CMF" => IndicatorDefinition::new(
            name,
            Some(IndicatorFn::Cmf {
                length: params.cmf_length,
            }),
            &hlcv,
        )
        .with_companions(),
        "RSI" => IndicatorDefinition::new(
            name,
            Some(IndicatorFn::Rsi {
                length: params.rsi_length,
            }),
            &[CLOSE],
        )
        .with_companions(),
        "MACD" => IndicatorDefinition::new(
            name,
            Some(IndicatorFn::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            }),
            &[CLOSE],
        ),
        "OBV" => IndicatorDefinition::new(name, Some(IndicatorFn::Obv), &[CLOSE, VOLUME])
            .with_companions(),
        "VWAP" => IndicatorDefinition::new(name, Some(IndicatorFn::Vwap { window: 20 }), &hlcv),
        "BB_POS" | "BBANDS" => IndicatorDefinition::new(
            name,
            Some(IndicatorFn::Bbands {
                length: 20,
                std_x100: 200,
            }),
            &[CLOSE],
        ),
        "ROC" => IndicatorDefinition::new(name, Some(IndicatorFn::Roc { length: 10 }), &[CLOSE]),
        "EMA_50" => IndicatorDefinition::new(name, Some(IndicatorFn::Ema { length: 50 }), &[CLOSE]),
        "ADX" => IndicatorDefinition::new(
            name,
            Some(IndicatorFn::Adx { length: 14 }),
            &[HIGH, LOW, CLOSE],
        ),
        "CLOSE" => IndicatorDefinition::new(name, None, &[CLOSE]).with_companions(),
        _ => return None,
    };
    Some(def)
}

pub fn passthrough_entry(name: &str) -> Option<PassthroughDefinition> {
    let def = match name {
        "VOLUME" => PassthroughDefinition {
            name: name.to_string(),
            source: PassthroughSource::Column(VOLUME.to_string()),
            with_avg: true,
            with_slope: true,
        },
        "REL_VOLUME" => PassthroughDefinition {
            name: name.to_string(),
            source: PassthroughSource::RatioToAverage("VOLUME".to_string()),
            with_avg: false,
            with_slope: false,
        },
        _ => return None,
    };
    Some(def)
}

pub fn default_enhancers() -> EnhancerMap {
    use Enhancer::*;
    EnhancerMap::new(vec![
        ("OBV".to_string(), vec![ZScore, TrueTrend]),
        ("CMF".to_string(), vec![ZScore, TrueTrend]),
        ("RSI".to_string(), vec![ZScore]),
        ("MACDh_12_26_9".to_string(), vec![ZScore]),
        ("VOLUME".to_string(), vec![ZScore]),
        ("VWAP".to_string(), vec![ZScore]),
    ])
}

/// Immutable set of definitions shared by every engine of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    pub indicators: Vec<IndicatorDefinition>,
    pub passthroughs: Vec<PassthroughDefinition>,
    pub enhancers: EnhancerMap,
    /// Window of the `_Avg` companions.
    pub avg_window: usize,
}

impl Default for Registry {
    fn default() -> Self {
        let params = CatalogParams::default();
        Self {
            indicators: DEFAULT_INDICATORS
                .iter()
                .filter_map(|n| catalog_entry(n, params))
                .collect(),
            passthroughs: DEFAULT_PASSTHROUGHS
                .iter()
                .filter_map(|n| passthrough_entry(n))
                .collect(),
            enhancers: default_enhancers(),
            avg_window: DEFAULT_AVG_WINDOW,
        }
    }
}

impl Registry {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalError> {
        let params = CatalogParams {
            rsi_length: positive(config, "rsi_length", DEFAULT_RSI_LENGTH)?,
            cmf_length: positive(config, "cmf_length", DEFAULT_CMF_LENGTH)?,
        };
        let avg_window = positive(config, "avg_window", DEFAULT_AVG_WINDOW)?;

        let indicator_names = config
            .get_list(SECTION, "indicators")
            .unwrap_or_else(|| DEFAULT_INDICATORS.iter().map(|s| s.to_string()).collect());
        check_unique(&indicator_names, "indicators")?;
        let indicators = indicator_names
            .iter()
            .map(|name| {
                catalog_entry(name, params).ok_or_else(|| {
                    SignalError::invalid(SECTION, "indicators", format!("unknown indicator '{name}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let passthrough_names = config
            .get_list(SECTION, "passthroughs")
            .unwrap_or_else(|| DEFAULT_PASSTHROUGHS.iter().map(|s| s.to_string()).collect());
        check_unique(&passthrough_names, "passthroughs")?;
        let passthroughs = passthrough_names
            .iter()
            .map(|name| {
                passthrough_entry(name).ok_or_else(|| {
                    SignalError::invalid(
                        SECTION,
                        "passthroughs",
                        format!("unknown passthrough '{name}'"),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        check_passthrough_order(&passthroughs)?;

        if indicators.is_empty() && passthroughs.is_empty() {
            return Err(SignalError::invalid(
                SECTION,
                "indicators",
                "registry has no indicators and no passthroughs",
            ));
        }

        let enhancers = if config.has_section("enhancers") {
            enhancers_from_config(config)?
        } else {
            default_enhancers()
        };

        Ok(Self {
            indicators,
            passthroughs,
            enhancers,
            avg_window,
        })
    }

    pub fn indicator(&self, name: &str) -> Option<&IndicatorDefinition> {
        self.indicators.iter().find(|d| d.name == name)
    }
}

fn positive(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, SignalError> {
    let value = config.get_int(SECTION, key, default as i64);
    if value < 1 {
        return Err(SignalError::invalid(SECTION, key, format!("{key} must be at least 1")));
    }
    Ok(value as usize)
}

fn check_unique(names: &[String], key: &str) -> Result<(), SignalError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(SignalError::invalid(SECTION, key, format!("duplicate entry '{name}'")));
        }
    }
    Ok(())
}

/// A ratio passthrough reads its base's `_Avg`, so the base must come first
/// and carry the average.
fn check_passthrough_order(defs: &[PassthroughDefinition]) -> Result<(), SignalError> {
    for (i, def) in defs.iter().enumerate() {
        if let PassthroughSource::RatioToAverage(base) = &def.source {
            let ok = defs[..i].iter().any(|d| &d.name == base && d.with_avg);
            if !ok {
                return Err(SignalError::invalid(
                    SECTION,
                    "passthroughs",
                    format!("{} requires {} listed before it", def.name, base),
                ));
            }
        }
    }
    Ok(())
}

fn enhancers_from_config(config: &dyn ConfigPort) -> Result<EnhancerMap, SignalError> {
    let mut entries = Vec::new();
    for indicator in config.section_keys("enhancers") {
        let names = config.get_list("enhancers", &indicator).unwrap_or_default();
        let enhancers = names
            .iter()
            .map(|n| {
                n.parse::<Enhancer>()
                    .map_err(|e| SignalError::invalid("enhancers", &indicator, e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !enhancers.is_empty() {
            entries.push((indicator, enhancers));
        }
    }
    Ok(EnhancerMap::new(entries))
}
