//! Typed column identity: `{indicator, variant, timeframe}`.
//!
//! The `<Indicator>_<TF>`, `<Indicator>_<TF>_Avg` and
//! `<Indicator>_<Suffix>_<TF>` spellings only exist at the serialization
//! boundary, through `Display` and [`FeatureName::parse`].

use crate::domain::enhance::Enhancer;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnVariant {
    Base,
    /// Rolling mean companion.
    Avg,
    /// First-difference companion.
    Slope,
    Enhanced(Enhancer),
}

/// A feature without its timeframe, e.g. `RSI`, `RSI_Z`, `CMF_Avg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureName {
    pub indicator: String,
    pub variant: ColumnVariant,
}

impl FeatureName {
    pub fn new(indicator: impl Into<String>, variant: ColumnVariant) -> Self {
        Self {
            indicator: indicator.into(),
            variant,
        }
    }

    pub fn base(indicator: impl Into<String>) -> Self {
        Self::new(indicator, ColumnVariant::Base)
    }

    /// Parses a configured feature name. Trailing `_Avg` / `_Slope` select a
    /// companion, a trailing enhancer suffix (`_Z`, `_Trend`, ...) selects an
    /// enhanced column, anything else is a base column.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(ind) = name.strip_suffix("_Avg") {
            return Self::new(ind, ColumnVariant::Avg);
        }
        if let Some(ind) = name.strip_suffix("_Slope") {
            return Self::new(ind, ColumnVariant::Slope);
        }
        for enhancer in Enhancer::ALL {
            if let Some(ind) = name.strip_suffix(&format!("_{}", enhancer.suffix())) {
                if !ind.is_empty() {
                    return Self::new(ind, ColumnVariant::Enhanced(enhancer));
                }
            }
        }
        Self::base(name)
    }

    pub fn qualify(&self, timeframe: &str) -> ColumnKey {
        ColumnKey::new(self.indicator.clone(), self.variant, timeframe)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            ColumnVariant::Base => write!(f, "{}", self.indicator),
            ColumnVariant::Avg => write!(f, "{}_Avg", self.indicator),
            ColumnVariant::Slope => write!(f, "{}_Slope", self.indicator),
            ColumnVariant::Enhanced(e) => write!(f, "{}_{}", self.indicator, e.suffix()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub feature: FeatureName,
    pub timeframe: String,
}

impl ColumnKey {
    /// Builds a key, stripping a `_<timeframe>` suffix the indicator name may
    /// already carry so the column is never tagged twice.
    pub fn new(indicator: impl Into<String>, variant: ColumnVariant, timeframe: &str) -> Self {
        let indicator = indicator.into();
        let tag = format!("_{timeframe}");
        let indicator = match indicator.strip_suffix(&tag) {
            Some(stripped) if !stripped.is_empty() => stripped.to_string(),
            _ => indicator,
        };
        Self {
            feature: FeatureName::new(indicator, variant),
            timeframe: timeframe.to_string(),
        }
    }

    pub fn base(indicator: impl Into<String>, timeframe: &str) -> Self {
        Self::new(indicator, ColumnVariant::Base, timeframe)
    }

    pub fn enhanced(indicator: impl Into<String>, enhancer: Enhancer, timeframe: &str) -> Self {
        Self::new(indicator, ColumnVariant::Enhanced(enhancer), timeframe)
    }

    pub fn indicator(&self) -> &str {
        &self.feature.indicator
    }

    pub fn variant(&self) -> ColumnVariant {
        self.feature.variant
    }

    pub fn with_variant(&self, variant: ColumnVariant) -> Self {
        Self {
            feature: FeatureName::new(self.feature.indicator.clone(), variant),
            timeframe: self.timeframe.clone(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (ind, tf) = (&self.feature.indicator, &self.timeframe);
        match self.feature.variant {
            ColumnVariant::Base => write!(f, "{ind}_{tf}"),
            ColumnVariant::Avg => write!(f, "{ind}_{tf}_Avg"),
            ColumnVariant::Slope => write!(f, "{ind}_{tf}_Slope"),
            ColumnVariant::Enhanced(e) => write!(f, "{ind}_{}_{tf}", e.suffix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_base_and_companions() {
        let key = ColumnKey::base("RSI", "1H");
        assert_eq!(key.to_string(), "RSI_1H");
        assert_eq!(key.with_variant(ColumnVariant::Avg).to_string(), "RSI_1H_Avg");
        assert_eq!(key.with_variant(ColumnVariant::Slope).to_string(), "RSI_1H_Slope");
    }

    #[test]
    fn renders_enhanced_columns() {
        assert_eq!(
            ColumnKey::enhanced("RSI", Enhancer::ZScore, "1D").to_string(),
            "RSI_Z_1D"
        );
        assert_eq!(
            ColumnKey::enhanced("OBV", Enhancer::TrueTrend, "1H").to_string(),
            "OBV_Trend_1H"
        );
        assert_eq!(
            ColumnKey::enhanced("OBV", Enhancer::SlopeDiff, "5M").to_string(),
            "OBV_Impulse_5M"
        );
    }

    #[test]
    fn does_not_double_tag_timeframe() {
        let key = ColumnKey::base("MACDh_12_26_9_1D", "1D");
        assert_eq!(key.indicator(), "MACDh_12_26_9");
        assert_eq!(key.to_string(), "MACDh_12_26_9_1D");
    }

    #[test]
    fn parse_base_feature() {
        assert_eq!(FeatureName::parse("CMF"), FeatureName::base("CMF"));
        assert_eq!(FeatureName::parse("BBP_20_2.0"), FeatureName::base("BBP_20_2.0"));
        assert_eq!(FeatureName::parse("sumZZ"), FeatureName::base("sumZZ"));
    }

    #[test]
    fn parse_enhanced_feature() {
        assert_eq!(
            FeatureName::parse("MACDh_12_26_9_Z"),
            FeatureName::new("MACDh_12_26_9", ColumnVariant::Enhanced(Enhancer::ZScore))
        );
        assert_eq!(
            FeatureName::parse("RSI_Noise"),
            FeatureName::new("RSI", ColumnVariant::Enhanced(Enhancer::SignalNoise))
        );
    }

    #[test]
    fn parse_companions() {
        assert_eq!(
            FeatureName::parse("VOLUME_Avg"),
            FeatureName::new("VOLUME", ColumnVariant::Avg)
        );
        assert_eq!(
            FeatureName::parse("OBV_Slope"),
            FeatureName::new("OBV", ColumnVariant::Slope)
        );
    }

    #[test]
    fn parse_display_round_trip_for_configured_names() {
        for name in ["RSI_Z", "CMF", "OBV_Trend", "VOLUME_Avg", "slope_sumZZ"] {
            assert_eq!(FeatureName::parse(name).to_string(), name);
        }
    }

    #[test]
    fn qualify_matches_column_key() {
        let key = FeatureName::parse("RSI_Z").qualify("1WK");
        assert_eq!(key, ColumnKey::enhanced("RSI", Enhancer::ZScore, "1WK"));
        assert_eq!(key.to_string(), "RSI_Z_1WK");
    }
}
