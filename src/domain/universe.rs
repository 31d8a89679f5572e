//! Instrument universe parsing.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),

    #[error("ticker list is empty")]
    Empty,
}

/// Parses a comma-separated ticker list: trimmed, upper-cased, order kept.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }

    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_ticker() {
        assert_eq!(parse_tickers("SPY").unwrap(), vec!["SPY"]);
    }

    #[test]
    fn parse_trims_and_uppercases() {
        assert_eq!(
            parse_tickers(" spy , qqq,Iwm ").unwrap(),
            vec!["SPY", "QQQ", "IWM"]
        );
    }

    #[test]
    fn parse_keeps_order() {
        assert_eq!(parse_tickers("XLF,XLE,XLK").unwrap(), vec!["XLF", "XLE", "XLK"]);
    }

    #[test]
    fn parse_rejects_empty_token() {
        assert_eq!(parse_tickers("SPY,,QQQ"), Err(UniverseError::EmptyToken));
        assert_eq!(parse_tickers("SPY,"), Err(UniverseError::EmptyToken));
    }

    #[test]
    fn parse_rejects_duplicates_case_insensitively() {
        assert_eq!(
            parse_tickers("SPY,spy"),
            Err(UniverseError::DuplicateTicker("SPY".into()))
        );
    }

    #[test]
    fn parse_rejects_blank_input() {
        assert_eq!(parse_tickers("  "), Err(UniverseError::Empty));
    }
}
