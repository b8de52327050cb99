use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for memoflow
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MemoflowConfig {
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Notification sync settings
    pub notifications: NotificationSettings,
    /// Approval workflow settings
    pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotificationSettings {
    /// Size of the initial fetch and of the local cache
    pub fetch_limit: usize,
    /// Show a toast for each inserted notification
    pub toast_on_insert: bool,
    /// Resubscribe attempts after the channel drops
    pub resubscribe_attempts: u32,
    /// Delay between resubscribe attempts
    pub resubscribe_backoff_ms: u64,
}

impl NotificationSettings {
    pub fn resubscribe_backoff(&self) -> Duration {
        Duration::from_millis(self.resubscribe_backoff_ms)
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            fetch_limit: 50,
            toast_on_insert: true,
            resubscribe_attempts: 3,
            resubscribe_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkflowSettings {
    /// Lifetime of a cached "memos by author" view
    pub memo_view_ttl_seconds: u64,
    /// Maximum number of cached author views
    pub memo_view_capacity: u64,
    /// Write a notification to the memo author when a decision is recorded
    pub notify_author_on_decision: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            memo_view_ttl_seconds: 60,
            memo_view_capacity: 256,
            notify_author_on_decision: true,
        }
    }
}

impl Default for MemoflowConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
            notifications: NotificationSettings::default(),
            workflow: WorkflowSettings::default(),
        }
    }
}

impl MemoflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (memoflow.toml)
    /// 3. Environment variables (prefixed with MEMOFLOW__)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("memoflow.toml"))
    }

    /// Same as [`MemoflowConfig::load`] with an explicit file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("MEMOFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<MemoflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = MemoflowConfig::load_env_file();
        MemoflowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static MemoflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoflowConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.notifications.fetch_limit, 50);
        assert!(config.workflow.notify_author_on_decision);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memoflow.toml");
        std::fs::write(
            &path,
            "[notifications]\nfetch_limit = 20\ntoast_on_insert = false\n",
        )
        .unwrap();

        let config = MemoflowConfig::load_from(&path).unwrap();
        assert_eq!(config.notifications.fetch_limit, 20);
        assert!(!config.notifications.toast_on_insert);
        assert_eq!(config.notifications.resubscribe_attempts, 3);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memoflow.toml");
        let mut config = MemoflowConfig::default();
        config.workflow.memo_view_ttl_seconds = 5;
        config.save_to_file(&path).unwrap();

        let loaded = MemoflowConfig::load_from(&path).unwrap();
        assert_eq!(loaded.workflow.memo_view_ttl_seconds, 5);
    }
}
