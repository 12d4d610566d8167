use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub whois_binary: String,
    pub whois_timeout_seconds: u64,
    pub query_registry_host: bool,
    pub concurrent_lookups: usize,
    pub public_suffix_list: Option<String>, // Path to a PSL file, optional
    pub start_time: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub port: u16,
    pub whois_binary: String,
    pub whois_timeout_seconds: u64,
    pub query_registry_host: bool,
    pub concurrent_lookups: usize,
    #[serde(default)]
    pub public_suffix_list: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let system_info = Self::detect_system_capabilities();

        let mut settings = config::Config::builder()
            .set_default("port", Self::get_default_port())?
            .set_default("whois_binary", "whois")?
            .set_default("whois_timeout_seconds", system_info.default_timeout)?
            .set_default("query_registry_host", true)?
            .set_default("concurrent_lookups", system_info.concurrent_lookups as i64)?;

        // Override with environment variables if present
        settings = Self::apply_env_overrides(settings)?;

        let config_data: ConfigData = settings.build()?.try_deserialize()?;

        Ok(Self::from_data(config_data))
    }

    // A zero timeout would fail every lookup before the process starts
    fn from_data(config_data: ConfigData) -> Self {
        Config {
            port: config_data.port,
            whois_binary: config_data.whois_binary,
            whois_timeout_seconds: config_data.whois_timeout_seconds.max(1),
            query_registry_host: config_data.query_registry_host,
            concurrent_lookups: config_data.concurrent_lookups.max(1),
            public_suffix_list: config_data.public_suffix_list.filter(|p| !p.trim().is_empty()),
            start_time: Instant::now(),
        }
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_secs(self.whois_timeout_seconds)
    }

    fn detect_system_capabilities() -> SystemCapabilities {
        let cpu_cores = Self::get_cpu_cores();
        let is_production = Self::is_production_environment();

        SystemCapabilities {
            default_timeout: if is_production { 30 } else { 15 },
            // Registries rate-limit aggressively, keep parallel queries low
            concurrent_lookups: cpu_cores.min(4),
        }
    }

    fn get_cpu_cores() -> usize {
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4)
    }

    fn is_production_environment() -> bool {
        std::env::var("ENVIRONMENT")
            .or_else(|_| std::env::var("ENV"))
            .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
            .unwrap_or(false)
    }

    fn get_default_port() -> u16 {
        std::env::var("PORT")
            .or_else(|_| std::env::var("HTTP_PORT"))
            .or_else(|_| std::env::var("SERVER_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000)
    }

    fn apply_env_overrides(mut settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let env_mappings = [
            ("PORT", "port"),
            ("WHOIS_BINARY", "whois_binary"),
            ("WHOIS_TIMEOUT_SECONDS", "whois_timeout_seconds"),
            ("WHOIS_TIMEOUT", "whois_timeout_seconds"),
            ("WHOIS_QUERY_REGISTRY_HOST", "query_registry_host"),
            ("CONCURRENT_LOOKUPS", "concurrent_lookups"),
            ("PUBLIC_SUFFIX_LIST", "public_suffix_list"),
        ];

        for (env_var, config_key) in env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                settings = settings.set_override(config_key, value)?;
            }
        }

        Ok(settings)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            whois_binary: "whois".to_string(),
            whois_timeout_seconds: 15,
            query_registry_host: true,
            concurrent_lookups: 4,
            public_suffix_list: None,
            start_time: Instant::now(),
        }
    }
}

struct SystemCapabilities {
    default_timeout: u64,
    concurrent_lookups: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_has_sane_defaults() {
        let config = tokio_test::assert_ok!(Config::load());

        assert!(!config.whois_binary.is_empty());
        assert!(config.whois_timeout_seconds > 0);
        assert!(config.concurrent_lookups >= 1);
        assert_eq!(config.whois_timeout(), Duration::from_secs(config.whois_timeout_seconds));
    }

    #[test]
    fn test_zero_limits_are_clamped() {
        let config = Config::from_data(ConfigData {
            port: 3000,
            whois_binary: "whois".to_string(),
            whois_timeout_seconds: 0,
            query_registry_host: true,
            concurrent_lookups: 0,
            public_suffix_list: Some("  ".to_string()),
        });

        assert_eq!(config.whois_timeout(), Duration::from_secs(1));
        assert_eq!(config.concurrent_lookups, 1);
        assert!(config.public_suffix_list.is_none());
    }
}
