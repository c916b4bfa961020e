//! [`PreferencesContext`]: engine-wide string preferences loaded once
//! from `Modulith.config`, next to the executable.

use loom_context::Subcontext;
use std::collections::HashMap;
use std::path::Path;

const PREFERENCES_FILE: &str = "Modulith.config";

/// A flat string-to-string table of engine preferences, loaded from a
/// YAML map. Malformed entries are skipped individually rather than
/// failing the whole load, and a missing file simply leaves the table
/// empty.
#[derive(Default)]
pub struct PreferencesContext {
    preferences: HashMap<String, String>,
}

impl PreferencesContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(preferences: HashMap<String, String>) -> Self {
        Self { preferences }
    }

    pub fn try_get(&self, key: &str) -> Option<&str> {
        self.preferences.get(key).map(String::as_str)
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.preferences
    }

    fn load_from_file(path: &Path) -> HashMap<String, String> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(),
        };
        let value: serde_yaml::Value = match serde_yaml::from_str(&contents) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("could not parse {path:?} as YAML: {e}");
                return HashMap::new();
            }
        };
        let mapping = match value.as_mapping() {
            Some(m) => m,
            None => return HashMap::new(),
        };

        let mut preferences = HashMap::new();
        for (key, value) in mapping {
            let (Some(key), Some(value)) = (key.as_str(), value.as_str()) else {
                continue;
            };
            log::info!("read preference from {PREFERENCES_FILE}: key: {key}, value: {value}");
            preferences.insert(key.to_string(), value.to_string());
        }
        preferences
    }
}

impl Subcontext for PreferencesContext {
    fn name(&self) -> &str {
        "Preferences Context"
    }

    fn initialize(&mut self) {
        self.preferences = Self::load_from_file(Path::new(PREFERENCES_FILE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_leaves_preferences_empty() {
        let preferences = PreferencesContext::load_from_file(Path::new("does-not-exist.config"));
        assert!(preferences.is_empty());
    }

    #[test]
    fn loads_string_entries_and_skips_non_string_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Modulith.config");
        std::fs::write(
            &path,
            "DefaultInitializeFunctionName: ModuleInit\nnested:\n  a: 1\n",
        )
        .unwrap();

        let preferences = PreferencesContext::load_from_file(&path);
        assert_eq!(
            preferences.get("DefaultInitializeFunctionName").map(String::as_str),
            Some("ModuleInit")
        );
        assert!(!preferences.contains_key("nested"));
    }

    #[test]
    fn try_get_returns_none_for_unknown_keys() {
        let context = PreferencesContext::new();
        assert_eq!(context.try_get("anything"), None);
    }
}
