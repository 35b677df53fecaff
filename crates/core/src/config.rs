use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Key lookup used to build a [`Config`]. The process environment in
/// production, a map in tests.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn var_opt(lookup: Lookup, key: &str) -> Option<String> {
    lookup(key).filter(|s| !s.trim().is_empty())
}

fn var_or(lookup: Lookup, key: &str, default: &str) -> String {
    var_opt(lookup, key).unwrap_or_else(|| default.to_string())
}

fn var_parse<T: FromStr>(lookup: Lookup, key: &str, default: T) -> Result<T, ConfigError> {
    match var_opt(lookup, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn var_bool(lookup: Lookup, key: &str, default: bool) -> Result<bool, ConfigError> {
    match var_opt(lookup, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        },
    }
}

// ── Top-level config ──────────────────────────────────────────

/// Job configuration, built once at startup and handed to every component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub ledger: LedgerConfig,
    pub sink: SinkConfig,
    pub transform: TransformConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let l: Lookup = &lookup;
        Ok(Self {
            source: SourceConfig::from_lookup(l),
            ledger: LedgerConfig::from_lookup(l),
            sink: SinkConfig::from_lookup(l)?,
            transform: TransformConfig::from_lookup(l)?,
            pipeline: PipelineConfig::from_lookup(l)?,
        })
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        info!("Config loaded:");
        info!(
            "  source:     folder={}, local_dir={}",
            self.source.folder_locator.as_deref().unwrap_or("(none)"),
            self.source.local_directory.display()
        );
        info!("  ledger:     path={}", self.ledger.path.display());
        info!(
            "  sink:       url={}, table={}, batch_size={}",
            self.sink.redacted_url().as_deref().unwrap_or("(not set)"),
            self.sink.table,
            self.sink.batch_size
        );
        info!(
            "  transform:  {} = {} * {} ({} aliases)",
            self.transform.output_column,
            self.transform.quantity_column,
            self.transform.value_column,
            self.transform.aliases.len()
        );
        info!("  pipeline:   policy={:?}", self.pipeline.error_policy);
    }
}

// ── Source ────────────────────────────────────────────────────

pub const DEFAULT_LOCAL_DIRECTORY: &str = "default_directory";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Remote folder to sync from. Sync is skipped when unset.
    pub folder_locator: Option<String>,
    /// Directory holding candidate files.
    pub local_directory: PathBuf,
}

impl SourceConfig {
    fn from_lookup(l: Lookup) -> Self {
        Self {
            folder_locator: var_opt(l, "FOLDER_URL"),
            local_directory: PathBuf::from(var_or(l, "LOCAL_DIRECTORY", DEFAULT_LOCAL_DIRECTORY)),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            folder_locator: None,
            local_directory: PathBuf::from(DEFAULT_LOCAL_DIRECTORY),
        }
    }
}

// ── Ledger ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub path: PathBuf,
}

impl LedgerConfig {
    fn from_lookup(l: Lookup) -> Self {
        Self {
            path: PathBuf::from(var_or(l, "LEDGER_PATH", "ledger.db")),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ledger.db"),
        }
    }
}

// ── Sink ──────────────────────────────────────────────────────

pub const DEFAULT_SINK_TABLE: &str = "calculated_sales";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// PostgreSQL connection string. Required to run the job.
    pub database_url: Option<String>,
    pub table: String,
    pub max_connections: u32,
    /// Rows per INSERT statement.
    pub batch_size: usize,
}

impl SinkConfig {
    fn from_lookup(l: Lookup) -> Result<Self, ConfigError> {
        let batch_size = var_parse(l, "SINK_BATCH_SIZE", 1000usize)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SINK_BATCH_SIZE".into(),
                value: "0".into(),
            });
        }
        Ok(Self {
            database_url: var_opt(l, "DATABASE_URL"),
            table: var_or(l, "SINK_TABLE", DEFAULT_SINK_TABLE),
            max_connections: var_parse(l, "SINK_MAX_CONNECTIONS", 2u32)?,
            batch_size,
        })
    }

    /// Connection string with any password masked, for logs.
    pub fn redacted_url(&self) -> Option<String> {
        let raw = self.database_url.as_deref()?;
        match url::Url::parse(raw) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("****"));
                }
                Some(parsed.to_string())
            }
            Err(_) => Some("(unparseable)".to_string()),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            table: DEFAULT_SINK_TABLE.to_string(),
            max_connections: 2,
            batch_size: 1000,
        }
    }
}

// ── Transform ─────────────────────────────────────────────────

pub const DEFAULT_COLUMN_ALIASES: &str = "quantidade=quantity,valor=value";

/// Localized column names mapped onto canonical ones, applied before the
/// derived column is computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAliases(Vec<(String, String)>);

impl ColumnAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `alias=canonical` pairs separated by commas.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut aliases = Self::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (alias, canonical) = pair
                .split_once('=')
                .map(|(a, c)| (a.trim(), c.trim()))
                .filter(|(a, c)| !a.is_empty() && !c.is_empty())
                .ok_or_else(|| ConfigError::InvalidAlias(pair.to_string()))?;
            aliases.insert(alias, canonical);
        }
        Ok(aliases)
    }

    pub fn insert(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        let alias = alias.into();
        let canonical = canonical.into();
        match self.0.iter_mut().find(|(a, _)| *a == alias) {
            Some(entry) => entry.1 = canonical,
            None => self.0.push((alias, canonical)),
        }
    }

    /// Aliases that map to `canonical`, in declaration order.
    pub fn aliases_for<'a>(&'a self, canonical: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(_, c)| c == canonical)
            .map(|(a, _)| a.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    pub quantity_column: String,
    pub value_column: String,
    pub output_column: String,
    pub aliases: ColumnAliases,
}

impl TransformConfig {
    fn from_lookup(l: Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            quantity_column: var_or(l, "QUANTITY_COLUMN", "quantity"),
            value_column: var_or(l, "VALUE_COLUMN", "value"),
            output_column: var_or(l, "OUTPUT_COLUMN", "total_sales"),
            aliases: ColumnAliases::parse(&var_or(l, "COLUMN_ALIASES", DEFAULT_COLUMN_ALIASES))?,
        })
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        let mut aliases = ColumnAliases::new();
        aliases.insert("quantidade", "quantity");
        aliases.insert("valor", "value");
        Self {
            quantity_column: "quantity".to_string(),
            value_column: "value".to_string(),
            output_column: "total_sales".to_string(),
            aliases,
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────

/// What the orchestrator does after a file fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the failure and move on to the next file.
    #[default]
    ContinueOnError,
    /// Stop the run at the first failed file.
    FailFast,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub error_policy: ErrorPolicy,
}

impl PipelineConfig {
    fn from_lookup(l: Lookup) -> Result<Self, ConfigError> {
        let error_policy = if var_bool(l, "FAIL_FAST", false)? {
            ErrorPolicy::FailFast
        } else {
            ErrorPolicy::ContinueOnError
        };
        Ok(Self { error_policy })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.source.local_directory, PathBuf::from("default_directory"));
        assert!(config.source.folder_locator.is_none());
        assert!(config.sink.database_url.is_none());
        assert_eq!(config.sink.table, "calculated_sales");
        assert_eq!(config.transform.output_column, "total_sales");
        assert_eq!(config.transform.aliases, TransformConfig::default().aliases);
        assert_eq!(config.pipeline.error_policy, ErrorPolicy::ContinueOnError);
    }

    #[test]
    fn reads_all_sections() {
        let config = config_from(&[
            ("FOLDER_URL", "s3://bucket/drop"),
            ("LOCAL_DIRECTORY", "/tmp/in"),
            ("LEDGER_PATH", "/tmp/ledger.db"),
            ("DATABASE_URL", "postgres://etl:secret@db:5432/sales"),
            ("SINK_TABLE", "sales_2024"),
            ("SINK_BATCH_SIZE", "50"),
            ("COLUMN_ALIASES", "qty=quantity, price=value"),
            ("FAIL_FAST", "true"),
        ])
        .unwrap();
        assert_eq!(config.source.folder_locator.as_deref(), Some("s3://bucket/drop"));
        assert_eq!(config.ledger.path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.sink.table, "sales_2024");
        assert_eq!(config.sink.batch_size, 50);
        let aliases: Vec<_> = config.transform.aliases.iter().collect();
        assert_eq!(aliases, vec![("qty", "quantity"), ("price", "value")]);
        assert_eq!(config.pipeline.error_policy, ErrorPolicy::FailFast);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[("DATABASE_URL", ""), ("LOCAL_DIRECTORY", "  ")]).unwrap();
        assert!(config.sink.database_url.is_none());
        assert_eq!(config.source.local_directory, PathBuf::from("default_directory"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            config_from(&[("COLUMN_ALIASES", "quantidade")]),
            Err(ConfigError::InvalidAlias(p)) if p == "quantidade"
        ));
        assert!(matches!(
            config_from(&[("SINK_BATCH_SIZE", "lots")]),
            Err(ConfigError::InvalidValue { key, .. }) if key == "SINK_BATCH_SIZE"
        ));
        assert!(config_from(&[("SINK_BATCH_SIZE", "0")]).is_err());
        assert!(config_from(&[("FAIL_FAST", "maybe")]).is_err());
    }

    #[test]
    fn redacted_url_masks_password() {
        let sink = SinkConfig {
            database_url: Some("postgres://etl:secret@db:5432/sales".into()),
            ..SinkConfig::default()
        };
        let redacted = sink.redacted_url().unwrap();
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("etl"));
        assert!(redacted.contains("db:5432/sales"));
    }

    #[test]
    fn later_alias_overrides_earlier() {
        let aliases = ColumnAliases::parse("q=quantity,q=value").unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.aliases_for("value").collect::<Vec<_>>(), vec!["q"]);
        assert_eq!(aliases.aliases_for("quantity").count(), 0);
    }
}
