//! Data access port trait.

use crate::domain::error::SignalError;
use crate::domain::ohlcv::OhlcvTable;
use crate::domain::timeframe::{Interval, Period};

/// Source of raw OHLCV history.
///
/// Implementations must distinguish failure (`Err`) from an empty result
/// (`Ok` with an empty table). They are called from several worker threads
/// at once.
pub trait DataPort: Send + Sync {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        interval: Interval,
        period: Period,
    ) -> Result<OhlcvTable, SignalError>;
}
