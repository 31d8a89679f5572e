//! Core domain types and logic.

pub mod column;
pub mod composite;
pub mod compute;
pub mod diagnostics;
pub mod enhance;
pub mod error;
pub mod frame;
pub mod indicator;
pub mod levels;
pub mod ohlcv;
pub mod passthrough;
pub mod pipeline;
pub mod registry;
pub mod series;
pub mod settings;
pub mod snapshot;
pub mod summary;
pub mod timeframe;
pub mod universe;
