use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Statically defined universes, keyed by file name under the universe
/// directory.
pub const KNOWN_UNIVERSES: &[(&str, &str)] = &[
    ("sp500", "S&P 500"),
    ("dow30", "Dow 30"),
    ("nasdaq100", "Nasdaq 100"),
    ("sp400", "S&P 400"),
];

#[derive(Debug, Clone, Serialize)]
pub struct UniverseInfo {
    pub key: String,
    pub label: String,
    pub count: usize,
}

fn universe_path(dir: &Path, name: &str) -> Option<PathBuf> {
    // Universe names map straight to file names; reject anything that
    // could escape the directory.
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(dir.join(format!("{name}.json")))
}

/// Symbols for a named universe. Missing or corrupt files yield an empty
/// list, never an error.
pub fn load_universe_symbols(dir: &Path, name: &str) -> Vec<String> {
    let Some(path) = universe_path(dir, name) else {
        return Vec::new();
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            debug!("universe file {} unreadable: {}", path.display(), e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<String>>(&content) {
        Ok(symbols) => symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(e) => {
            debug!("universe file {} corrupt: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Every known universe with its symbol count.
pub fn list_universes(dir: &Path) -> Vec<UniverseInfo> {
    KNOWN_UNIVERSES
        .iter()
        .map(|(key, label)| UniverseInfo {
            key: key.to_string(),
            label: label.to_string(),
            count: load_universe_symbols(dir, key).len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_universe_symbols() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dow30.json"), r#"[" aapl", "MSFT", ""]"#).unwrap();

        assert_eq!(
            load_universe_symbols(dir.path(), "dow30"),
            vec!["AAPL", "MSFT"]
        );
    }

    #[test]
    fn test_missing_or_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_universe_symbols(dir.path(), "sp500").is_empty());

        std::fs::write(dir.path().join("sp500.json"), "{not json").unwrap();
        assert!(load_universe_symbols(dir.path(), "sp500").is_empty());
    }

    #[test]
    fn test_traversal_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_universe_symbols(dir.path(), "../etc/passwd").is_empty());
        assert!(load_universe_symbols(dir.path(), "").is_empty());
    }

    #[test]
    fn test_list_universes_counts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dow30.json"), r#"["AAPL","MSFT"]"#).unwrap();

        let infos = list_universes(dir.path());
        assert_eq!(infos.len(), KNOWN_UNIVERSES.len());
        let dow = infos.iter().find(|u| u.key == "dow30").unwrap();
        assert_eq!(dow.count, 2);
        let sp500 = infos.iter().find(|u| u.key == "sp500").unwrap();
        assert_eq!(sp500.count, 0);
    }
}
