//! Configuration file support for relsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. Legacy environment variables (`GITHUB_TOKEN`, `GITHUB_THRESHOLD`, ...)
//! 2. Environment variables prefixed with `RELSYNC_`, using `__` for nesting
//!    (e.g. `RELSYNC_UPDATER__QUOTA_SOFT_THRESHOLD`)
//! 3. Config file (./relsync.toml, then ~/.config/relsync/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/relsync/relsync.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite:///var/lib/relsync/relsync.db?mode=rwc"
//!
//! [github]
//! token = "ghp_..."  # or use GITHUB_TOKEN
//!
//! [updater]
//! quota_soft_threshold = 1000
//! quota_hard_floor = 200
//! reconcile_period_minutes = 6
//! excluded_vendors = ["adoptopenjdk"]
//! tracked_versions = [8, 11, 17, 21, 25]
//! ```

use std::path::PathBuf;

use config::builder::{ConfigBuilder, DefaultState};
use config::{ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use relsync::UpdaterSettings;
use serde::Deserialize;

/// Environment variables kept from older deployments, and the keys they set.
const LEGACY_ENV_VARS: [(&str, &str); 6] = [
    ("GITHUB_TOKEN", "github.token"),
    ("GITHUB_THRESHOLD", "updater.quota_soft_threshold"),
    ("GITHUB_THRESHOLD_HARD_FLOOR", "updater.quota_hard_floor"),
    ("DISABLE_UPDATER", "updater.disable_updater"),
    ("UPDATE_DAY_CUTOFF", "updater.prerelease_day_cutoff"),
    ("UPDATE_ADOPTOPENJDK", "updater.include_excluded_vendors"),
];

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    /// Sync engine and scheduler settings.
    pub updater: UpdaterSettings,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Defaults to `sqlite://~/.local/state/relsync/relsync.db` if not specified.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token. Also read from `GITHUB_TOKEN`.
    pub token: Option<String>,
    /// Overrides the GraphQL endpoint (GitHub Enterprise, test doubles).
    pub graphql_url: Option<String>,
    /// Overrides the quota endpoint.
    pub rate_limit_url: Option<String>,
}

fn environment() -> Environment {
    Environment::with_prefix("RELSYNC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("updater.excluded_vendors")
        .with_list_parse_key("updater.tracked_versions")
}

fn apply_legacy_env<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in LEGACY_ENV_VARS {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            builder = builder.set_override(key, value)?;
        }
    }
    Ok(builder)
}

fn validated(config: Config) -> Result<Config, ConfigError> {
    config
        .updater
        .validate()
        .map_err(|e| ConfigError::Message(e.to_string()))?;
    Ok(config)
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// A configuration that fails to build, deserialize or validate is
    /// logged and replaced by the defaults.
    pub fn load() -> Self {
        let mut builder = config::Config::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("relsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./relsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(environment());

        let built = apply_legacy_env(builder, |name| std::env::var(name).ok())
            .and_then(|builder| builder.build())
            .and_then(|settings| settings.try_deserialize::<Config>())
            .and_then(validated);

        match built {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("relsync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// GraphQL client settings with the configured endpoints and token.
    #[cfg(feature = "github")]
    pub fn client_settings(&self) -> relsync::graphql::ClientSettings {
        let mut settings = self.updater.client_settings();
        if let Some(url) = &self.github.graphql_url {
            settings.graphql_url = url.clone();
        }
        if let Some(url) = &self.github.rate_limit_url {
            settings.rate_limit_url = url.clone();
        }
        settings.token = self.github.token.clone();
        settings
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "relsync")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/relsync` or `~/.local/state/relsync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relsync::Vendor;

    fn from_toml(toml: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.updater, UpdaterSettings::default());
    }

    #[test]
    fn test_config_builder_with_toml_string() {
        let config = from_toml(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            token = "ghp_test123"
            graphql_url = "http://localhost:8080/graphql"

            [updater]
            quota_soft_threshold = 500
            excluded_vendors = ["adoptopenjdk", "ibm"]
            tracked_versions = [17, 21]
        "#,
        );

        assert_eq!(
            config.database.url,
            Some("sqlite:///tmp/test.db".to_string())
        );
        assert_eq!(config.github.token, Some("ghp_test123".to_string()));
        assert_eq!(config.updater.quota_soft_threshold, 500);
        assert_eq!(
            config.updater.excluded_vendors,
            vec![Vendor::Adoptopenjdk, Vendor::Ibm]
        );
        assert_eq!(config.updater.tracked_versions, vec![17, 21]);
    }

    #[test]
    fn test_config_builder_partial_override() {
        let config = from_toml(
            r#"
            [updater]
            reconcile_period_minutes = 3
        "#,
        );

        assert_eq!(config.updater.reconcile_period_minutes, 3);
        assert_eq!(config.updater.full_sync_period_hours, 24);
        assert_eq!(config.updater.cool_down_minutes, 10);
    }

    #[test]
    fn test_prefixed_environment_nests_with_double_underscore() {
        let vars: config::Map<String, String> = [
            ("RELSYNC_DATABASE__URL", "sqlite::memory:"),
            ("RELSYNC_UPDATER__QUOTA_HARD_FLOOR", "50"),
            ("RELSYNC_UPDATER__EXCLUDED_VENDORS", "adoptopenjdk,alibaba"),
            ("RELSYNC_UPDATER__TRACKED_VERSIONS", "11,17"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config: Config = config::Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.updater.quota_hard_floor, 50);
        assert_eq!(
            config.updater.excluded_vendors,
            vec![Vendor::Adoptopenjdk, Vendor::Alibaba]
        );
        assert_eq!(config.updater.tracked_versions, vec![11, 17]);
    }

    #[test]
    fn test_legacy_env_overrides_file_values() {
        let builder = config::Config::builder().add_source(File::from_str(
            "[updater]\nquota_soft_threshold = 2000\n",
            FileFormat::Toml,
        ));
        let builder = apply_legacy_env(builder, |name| match name {
            "GITHUB_TOKEN" => Some("ghp_legacy".to_string()),
            "GITHUB_THRESHOLD" => Some("750".to_string()),
            "DISABLE_UPDATER" => Some("true".to_string()),
            "UPDATE_ADOPTOPENJDK" => Some("true".to_string()),
            "UPDATE_DAY_CUTOFF" => Some("  ".to_string()),
            _ => None,
        })
        .unwrap();

        let config: Config = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.github.token.as_deref(), Some("ghp_legacy"));
        assert_eq!(config.updater.quota_soft_threshold, 750);
        assert!(config.updater.disable_updater);
        assert!(config.updater.include_excluded_vendors);
        assert_eq!(
            config.updater.prerelease_day_cutoff,
            UpdaterSettings::default().prerelease_day_cutoff
        );
    }

    #[test]
    fn test_out_of_range_updater_setting_is_rejected() {
        let config = from_toml(
            r#"
            [updater]
            full_sync_period_hours = 18446744073709551
        "#,
        );

        let err = validated(config).unwrap_err();
        assert!(err.to_string().contains("full_sync_period_hours"));
        assert!(validated(from_toml("[updater]\nfull_sync_period_hours = 12\n")).is_ok());
    }

    #[test]
    fn test_database_url_prefers_configured_value() {
        let mut config = Config::default();
        config.database.url = Some("sqlite::memory:".to_string());
        assert_eq!(config.database_url().as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn test_default_database_url_lives_in_state_dir() {
        if let Some(url) = Config::default().database_url() {
            assert!(url.starts_with("sqlite://"));
            assert!(url.ends_with("relsync.db?mode=rwc"));
        }
    }

    #[cfg(feature = "github")]
    #[test]
    fn test_client_settings_use_configured_endpoints() {
        let config = from_toml(
            r#"
            [github]
            token = "t"
            rate_limit_url = "http://localhost/rate_limit"

            [updater]
            requests_per_second = 0
        "#,
        );

        let settings = config.client_settings();
        assert_eq!(settings.token.as_deref(), Some("t"));
        assert_eq!(settings.rate_limit_url, "http://localhost/rate_limit");
        assert_eq!(settings.graphql_url, relsync::graphql::GITHUB_GRAPHQL_URL);
        assert_eq!(settings.requests_per_second, 0);
    }
}
