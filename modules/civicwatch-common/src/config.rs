use std::env;
use std::path::PathBuf;

/// Runtime configuration loaded from environment variables. Everything has a
/// sensible local default so the CLI works out of the box.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the event store snapshot.
    pub data_dir: PathBuf,
    /// Path to the YAML watch-rule file.
    pub rules_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_dir: env::var("CIVICWATCH_DATA_DIR")
                .unwrap_or_else(|_| "data".to_string())
                .into(),
            rules_path: env::var("CIVICWATCH_RULES")
                .unwrap_or_else(|_| "rules.yaml".to_string())
                .into(),
        }
    }

    /// The event store snapshot file inside `data_dir`.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("events.json")
    }
}
