#![forbid(unsafe_code)]

use crate::error::WorkflowError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORAGE_DIR: &str = ".plantflow";
pub const DEFAULT_SEARCH_WINDOW: usize = 50;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

const ENV_STORAGE_DIR: &str = "PLANTFLOW_STORAGE_DIR";
const ENV_TEMPLATES: &str = "PLANTFLOW_TEMPLATES";
const ENV_SEARCH_WINDOW: &str = "PLANTFLOW_SEARCH_WINDOW";
const ENV_STORE_TIMEOUT_MS: &str = "PLANTFLOW_STORE_TIMEOUT_MS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub storage_dir: PathBuf,
    /// YAML template catalog; `None` uses the built-in registry.
    pub templates_path: Option<PathBuf>,
    /// How many recent posts a search looks at before filtering.
    pub search_window: usize,
    pub store_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            templates_path: None,
            search_window: DEFAULT_SEARCH_WINDOW,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
        }
    }
}

impl Config {
    pub fn from_process() -> Result<Self, WorkflowError> {
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::resolve(&args, |key| std::env::var(key).ok())
    }

    /// Each field comes from its CLI flag, else its environment variable, else the default.
    pub fn resolve(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, WorkflowError> {
        let pick = |flag: &str, key: &str| -> Option<String> {
            flag_value(args, flag)
                .or_else(|| env(key))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(dir) = pick("--storage-dir", ENV_STORAGE_DIR) {
            config.storage_dir = PathBuf::from(dir);
        }
        config.templates_path = pick("--templates", ENV_TEMPLATES).map(PathBuf::from);
        if let Some(raw) = pick("--search-window", ENV_SEARCH_WINDOW) {
            config.search_window = parse_positive(&raw, "search window")?;
        }
        if let Some(raw) = pick("--store-timeout-ms", ENV_STORE_TIMEOUT_MS) {
            config.store_timeout_ms = parse_positive(&raw, "store timeout")?;
        }
        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// The last occurrence of a repeated flag wins.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut found = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.as_str() == flag
            && let Some(value) = iter.next()
        {
            found = Some(value.clone());
        } else if let Some(value) = arg
            .strip_prefix(flag)
            .and_then(|rest| rest.strip_prefix('='))
        {
            found = Some(value.to_string());
        }
    }
    found
}

fn parse_positive<T>(raw: &str, what: &str) -> Result<T, WorkflowError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    match raw.parse::<T>() {
        Ok(value) if value != T::default() => Ok(value),
        _ => Err(WorkflowError::invalid_input(format!(
            "{what} must be a positive integer, got '{raw}'"
        ))),
    }
}
