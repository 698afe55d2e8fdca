use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CrmError;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Runtime configuration, layered as defaults → `config.toml` → `CRM_*` env.
///
/// Nested keys are split on `__`, e.g. `CRM_DATABASE__URL=sqlite:/data/crm.sqlite`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub database: DatabaseConfig,
    pub reminders: ReminderConfig,
    pub dashboard: DashboardConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub crm_key: String,
    pub loglevel: String,
    pub seed_demo: bool,
    pub body_limit_bytes: usize,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            crm_key: "change-me".to_string(),
            loglevel: "info".to_string(),
            seed_demo: false,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_retries: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:crm.sqlite".to_string(),
            max_connections: 5,
            connect_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub scan_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub upcoming_days: i64,
    pub recent_activity_limit: i64,
    pub open_task_limit: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            upcoming_days: 7,
            recent_activity_limit: 10,
            open_task_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub company_name: String,
    pub currency: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            company_name: "Mi Empresa".to_string(),
            currency: "EUR".to_string(),
        }
    }
}

impl Config {
    /// Load from the file named by `CRM_CONFIG` (or `config.toml`) plus the environment.
    pub fn load() -> Result<Self, CrmError> {
        let path = std::env::var_os("CRM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::figment(path).extract().map_err(CrmError::from)
    }

    pub fn figment(path: impl Into<PathBuf>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.into()))
            .merge(Env::prefixed("CRM_").ignore(&["config"]).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_file_is_missing() {
        figment::Jail::expect_with(|_jail| {
            let cfg: Config = Config::figment("does-not-exist.toml").extract()?;
            assert_eq!(cfg.basic.listen_addr, "0.0.0.0:8000");
            assert_eq!(cfg.database.max_connections, 5);
            assert_eq!(cfg.dashboard.upcoming_days, 7);
            Ok(())
        });
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "crm.toml",
                r#"
                [basic]
                crm_key = "from-file"
                loglevel = "debug"

                [export]
                currency = "USD"
                "#,
            )?;
            jail.set_env("CRM_BASIC__CRM_KEY", "from-env");
            jail.set_env("CRM_REMINDERS__SCAN_INTERVAL_SECS", "60");

            let cfg: Config = Config::figment("crm.toml").extract()?;
            assert_eq!(cfg.basic.crm_key, "from-env");
            assert_eq!(cfg.basic.loglevel, "debug");
            assert_eq!(cfg.export.currency, "USD");
            assert_eq!(cfg.reminders.scan_interval_secs, 60);
            assert!(cfg.reminders.enabled);
            Ok(())
        });
    }
}
