use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub web: WebConfig,
    pub mqtt: MqttConfig,
    pub http: HttpConfig,
    pub lookup: LookupConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Base URL devices can reach this service on; embedded in proxied
    /// image URLs handed back to scanners.
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Upper bound for every outbound HTTP call (product lookup and image
    /// fetch alike).
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub api_base: String,
    /// Credential for the lookup API. Usually left empty here and supplied
    /// via the BARCODELOOKUP_API_KEY environment variable instead.
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                base_url: "http://localhost:3000".to_string(),
            },
            mqtt: MqttConfig {
                broker_host: "localhost".to_string(),
                broker_port: 1883,
                keep_alive_secs: 30,
            },
            http: HttpConfig {
                request_timeout_secs: 10,
            },
            lookup: LookupConfig {
                api_base: "https://api.barcodelookup.com/v3/products".to_string(),
                api_key: String::new(),
            },
            cache: CacheConfig {
                ttl_secs: 3600,
                sweep_interval_secs: 1800,
            },
        }
    }
}

impl Config {
    /// Load configuration from `path`, writing the defaults there first if
    /// the file does not exist yet.
    pub fn load(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, contents)?;
            Ok(default_config)
        }
    }
}

impl LookupConfig {
    /// Effective lookup credential: the environment wins over the config
    /// file, and empty values count as unset.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|key| !key.is_empty())
            .or_else(|| Some(self.api_key.clone()).filter(|key| !key.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let contents = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&contents).unwrap();
        assert_eq!(parsed.web.port, config.web.port);
        assert_eq!(parsed.mqtt.broker_port, 1883);
        assert_eq!(parsed.cache.ttl_secs, 3600);
        assert_eq!(parsed.cache.sweep_interval_secs, 1800);
    }

    #[test]
    fn api_key_prefers_environment_over_file() {
        let lookup = LookupConfig {
            api_base: String::new(),
            api_key: "from-file".to_string(),
        };
        assert_eq!(
            lookup.resolve_api_key(Some("from-env".to_string())),
            Some("from-env".to_string())
        );
        assert_eq!(
            lookup.resolve_api_key(None),
            Some("from-file".to_string())
        );
        assert_eq!(
            lookup.resolve_api_key(Some(String::new())),
            Some("from-file".to_string())
        );
    }

    #[test]
    fn missing_api_key_resolves_to_none() {
        let lookup = LookupConfig {
            api_base: String::new(),
            api_key: String::new(),
        };
        assert_eq!(lookup.resolve_api_key(None), None);
        assert_eq!(lookup.resolve_api_key(Some(String::new())), None);
    }
}
