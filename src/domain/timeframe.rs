//! Bar intervals, their labels and lookback policies.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interval {
    Min1,
    Min2,
    Min5,
    Min15,
    Min30,
    Min60,
    Min90,
    Hour1,
    Day1,
    Week1,
    Month1,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeframeError {
    #[error("unknown interval '{0}' (expected one of 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d, 1wk, 1mo)")]
    UnknownInterval(String),

    #[error("invalid period '{0}' (expected <number><d|w|m|y>, e.g. 60d)")]
    InvalidPeriod(String),
}

impl Interval {
    pub const ALL: [Interval; 11] = [
        Interval::Min1,
        Interval::Min2,
        Interval::Min5,
        Interval::Min15,
        Interval::Min30,
        Interval::Min60,
        Interval::Min90,
        Interval::Hour1,
        Interval::Day1,
        Interval::Week1,
        Interval::Month1,
    ];

    /// Interval code understood by the data source.
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min2 => "2m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Min60 => "60m",
            Interval::Min90 => "90m",
            Interval::Hour1 => "1h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1wk",
            Interval::Month1 => "1mo",
        }
    }

    /// Timeframe label used in column names, e.g. `1H`, `1WK`.
    pub fn label(self) -> String {
        self.as_str().to_uppercase()
    }

    /// How much history to request.
    pub fn default_period(self) -> Period {
        let (amount, unit) = match self {
            Interval::Min1 => (7, PeriodUnit::Day),
            Interval::Min2 | Interval::Min5 | Interval::Min15 | Interval::Min30 => {
                (30, PeriodUnit::Day)
            }
            Interval::Min60 | Interval::Min90 | Interval::Hour1 => (60, PeriodUnit::Day),
            Interval::Day1 => (5, PeriodUnit::Year),
            Interval::Week1 => (10, PeriodUnit::Year),
            Interval::Month1 => (20, PeriodUnit::Year),
        };
        Period { amount, unit }
    }

    /// Bars of composite history used for the composite trend, roughly one
    /// comparable horizon per interval.
    pub fn composite_window(self) -> usize {
        match self {
            Interval::Min1 | Interval::Min2 => 60,
            Interval::Min5 => 48,
            Interval::Min15 => 32,
            Interval::Min30 => 26,
            Interval::Min60 | Interval::Hour1 => 24,
            Interval::Min90 => 20,
            Interval::Day1 => 14,
            Interval::Week1 => 12,
            Interval::Month1 => 6,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TimeframeError::UnknownInterval(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
    Year,
}

/// A lookback span such as `60d` or `5y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub amount: u32,
    pub unit: PeriodUnit,
}

impl Period {
    /// Approximate length in days; months count 30, years 365.
    pub fn days(&self) -> i64 {
        let per_unit = match self.unit {
            PeriodUnit::Day => 1,
            PeriodUnit::Week => 7,
            PeriodUnit::Month => 30,
            PeriodUnit::Year => 365,
        };
        i64::from(self.amount) * per_unit
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            PeriodUnit::Day => "d",
            PeriodUnit::Week => "w",
            PeriodUnit::Month => "m",
            PeriodUnit::Year => "y",
        };
        write!(f, "{}{}", self.amount, unit)
    }
}

impl FromStr for Period {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || TimeframeError::InvalidPeriod(s.to_string());
        let split = s.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        let (digits, unit) = s.split_at(split);
        let amount: u32 = digits.parse().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        let unit = match unit {
            "d" => PeriodUnit::Day,
            "w" => PeriodUnit::Week,
            "m" | "mo" => PeriodUnit::Month,
            "y" => PeriodUnit::Year,
            _ => return Err(invalid()),
        };
        Ok(Period { amount, unit })
    }
}
