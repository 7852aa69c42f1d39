use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::headline::canonical_symbol;
use crate::ConfigError;

/// Longest symbol accepted into the system. Matches the storage layer's
/// identifier limit.
pub const MAX_SYMBOL_LEN: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistFile {
    pub symbols: Vec<String>,
}

/// Returns `true` if `symbol` (already canonicalized) is a well-formed ticker:
/// 1..=12 chars, ASCII alphanumeric plus `.` and `-` (class shares like BRK.B).
#[must_use]
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Load and validate the watchlist from a YAML file.
///
/// Symbols are canonicalized (trimmed, uppercased) on load.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation (empty list, malformed symbol, case-insensitive duplicate).
pub fn load_watchlist(path: &Path) -> Result<WatchlistFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::WatchlistIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut watchlist: WatchlistFile = serde_yaml::from_str(&content)?;
    watchlist.symbols = watchlist
        .symbols
        .iter()
        .map(|s| canonical_symbol(s))
        .collect();

    validate_watchlist(&watchlist)?;

    Ok(watchlist)
}

fn validate_watchlist(watchlist: &WatchlistFile) -> Result<(), ConfigError> {
    if watchlist.symbols.is_empty() {
        return Err(ConfigError::Validation(
            "watchlist must contain at least one symbol".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for symbol in &watchlist.symbols {
        if !is_valid_symbol(symbol) {
            return Err(ConfigError::Validation(format!(
                "invalid symbol '{symbol}': must be 1-{MAX_SYMBOL_LEN} ASCII alphanumeric/./- chars"
            )));
        }
        if !seen.insert(symbol.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate symbol in watchlist: '{symbol}'"
            )));
        }
    }

    Ok(())
}
