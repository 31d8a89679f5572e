//! Technical indicator implementations.
//!
//! - `IndicatorFn`: typed identity + parameters of a computation, resolved
//!   once when the registry is built
//! - `IndicatorOutput`: one series, or several named output columns
//! - per-indicator modules operate on plain `&[f64]` columns

pub mod adx;
pub mod bollinger;
pub mod cmf;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod vwap;

use crate::domain::series::Series;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    Single(Series),
    /// Output columns named the way the charting libraries name them,
    /// e.g. `MACDh_12_26_9`, `BBP_20_2.0`.
    Multi(Vec<(String, Series)>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("{indicator} expects {expected} input columns, got {got}")]
    Arity {
        indicator: String,
        expected: usize,
        got: usize,
    },

    #[error("{indicator}: input columns have different lengths")]
    RaggedInput { indicator: String },

    #[error("{indicator}: invalid parameter {name}: {reason}")]
    InvalidParameter {
        indicator: String,
        name: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorFn {
    /// Inputs: close.
    Rsi { length: usize },
    /// Inputs: high, low, close, volume.
    Cmf { length: usize },
    /// Inputs: close.
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    /// Inputs: close, volume.
    Obv,
    /// Inputs: high, low, close, volume.
    Vwap { window: usize },
    /// Inputs: close.
    Bbands { length: usize, std_x100: u32 },
    /// Inputs: close.
    Roc { length: usize },
    /// Inputs: close.
    Ema { length: usize },
    /// Inputs: high, low, close.
    Adx { length: usize },
}

impl IndicatorFn {
    pub fn arity(&self) -> usize {
        match self {
            IndicatorFn::Rsi { .. }
            | IndicatorFn::Macd { .. }
            | IndicatorFn::Bbands { .. }
            | IndicatorFn::Roc { .. }
            | IndicatorFn::Ema { .. } => 1,
            IndicatorFn::Obv => 2,
            IndicatorFn::Adx { .. } => 3,
            IndicatorFn::Cmf { .. } | IndicatorFn::Vwap { .. } => 4,
        }
    }

    pub fn compute(&self, inputs: &[&[f64]]) -> Result<IndicatorOutput, IndicatorError> {
        let name = self.to_string();
        if inputs.len() != self.arity() {
            return Err(IndicatorError::Arity {
                indicator: name,
                expected: self.arity(),
                got: inputs.len(),
            });
        }
        if inputs.windows(2).any(|w| w[0].len() != w[1].len()) {
            return Err(IndicatorError::RaggedInput { indicator: name });
        }
        self.check_params()?;

        let out = match *self {
            IndicatorFn::Rsi { length } => {
                IndicatorOutput::Single(rsi::calculate_rsi(inputs[0], length))
            }
            IndicatorFn::Cmf { length } => IndicatorOutput::Single(cmf::calculate_cmf(
                inputs[0], inputs[1], inputs[2], inputs[3], length,
            )),
            IndicatorFn::Macd { fast, slow, signal } => {
                IndicatorOutput::Multi(macd::calculate_macd(inputs[0], fast, slow, signal).named())
            }
            IndicatorFn::Obv => IndicatorOutput::Single(obv::calculate_obv(inputs[0], inputs[1])),
            IndicatorFn::Vwap { window } => IndicatorOutput::Single(vwap::calculate_vwap(
                inputs[0], inputs[1], inputs[2], inputs[3], window,
            )),
            IndicatorFn::Bbands { length, std_x100 } => IndicatorOutput::Multi(
                bollinger::calculate_bollinger(inputs[0], length, std_x100).named(),
            ),
            IndicatorFn::Roc { length } => {
                IndicatorOutput::Single(roc::calculate_roc(inputs[0], length))
            }
            IndicatorFn::Ema { length } => {
                IndicatorOutput::Single(ema::calculate_ema(inputs[0], length))
            }
            IndicatorFn::Adx { length } => IndicatorOutput::Multi(
                adx::calculate_adx(inputs[0], inputs[1], inputs[2], length).named(),
            ),
        };
        Ok(out)
    }

    fn check_params(&self) -> Result<(), IndicatorError> {
        let positive = |name: &'static str, value: usize| {
            if value == 0 {
                Err(IndicatorError::InvalidParameter {
                    indicator: self.to_string(),
                    name,
                    reason: "must be positive".into(),
                })
            } else {
                Ok(())
            }
        };
        match *self {
            IndicatorFn::Rsi { length }
            | IndicatorFn::Cmf { length }
            | IndicatorFn::Roc { length }
            | IndicatorFn::Ema { length }
            | IndicatorFn::Adx { length } => positive("length", length),
            IndicatorFn::Vwap { window } => positive("window", window),
            IndicatorFn::Bbands { length, std_x100 } => {
                positive("length", length)?;
                positive("std", std_x100 as usize)
            }
            IndicatorFn::Macd { fast, slow, signal } => {
                positive("fast", fast)?;
                positive("slow", slow)?;
                positive("signal", signal)?;
                if fast >= slow {
                    return Err(IndicatorError::InvalidParameter {
                        indicator: self.to_string(),
                        name: "fast",
                        reason: format!("fast ({fast}) must be below slow ({slow})"),
                    });
                }
                Ok(())
            }
            IndicatorFn::Obv => Ok(()),
        }
    }
}

impl fmt::Display for IndicatorFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorFn::Rsi { length } => write!(f, "RSI({})", length),
            IndicatorFn::Cmf { length } => write!(f, "CMF({})", length),
            IndicatorFn::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorFn::Obv => write!(f, "OBV"),
            IndicatorFn::Vwap { window } => write!(f, "VWAP({})", window),
            IndicatorFn::Bbands { length, std_x100 } => {
                write!(f, "BBANDS({},{})", length, *std_x100 as f64 / 100.0)
            }
            IndicatorFn::Roc { length } => write!(f, "ROC({})", length),
            IndicatorFn::Ema { length } => write!(f, "EMA({})", length),
            IndicatorFn::Adx { length } => write!(f, "ADX({})", length),
        }
    }
}
