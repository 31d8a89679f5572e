//! Domain error types.

/// Top-level error type for signalcraft.
///
/// Only conditions that stop a whole command end up here. Per-indicator,
/// per-enhancer and per-instrument failures are recorded as
/// [`SkipReason`](crate::domain::diagnostics::SkipReason) instead.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("fetch failed for {ticker} ({interval}): {reason}")]
    Fetch {
        ticker: String,
        interval: String,
        reason: String,
    },

    #[error("malformed data: {reason}")]
    Data { reason: String },

    #[error("no usable data for {what}")]
    NoData { what: String },

    #[error("failed to write {path}: {reason}")]
    Artifact { path: String, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignalError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SignalError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        SignalError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&SignalError> for std::process::ExitCode {
    fn from(err: &SignalError) -> Self {
        let code: u8 = match err {
            SignalError::Io(_) | SignalError::Csv(_) | SignalError::Artifact { .. } => 1,
            SignalError::ConfigParse { .. }
            | SignalError::ConfigMissing { .. }
            | SignalError::ConfigInvalid { .. } => 2,
            SignalError::Fetch { .. } | SignalError::Data { .. } => 3,
            SignalError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message() {
        let err = SignalError::invalid("summary", "top_n", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value [summary] top_n: must be positive"
        );
    }

    #[test]
    fn fetch_message_names_ticker_and_interval() {
        let err = SignalError::Fetch {
            ticker: "SPY".into(),
            interval: "1h".into(),
            reason: "timeout".into(),
        };
        assert_eq!(err.to_string(), "fetch failed for SPY (1h): timeout");
    }

    #[test]
    fn io_converts_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SignalError = io.into();
        assert!(matches!(err, SignalError::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }
}
