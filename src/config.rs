use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// Settlement confirmation timing (budget arithmetic inputs)
    #[serde(default)]
    pub transfer: TransferTimingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_body_limit() -> usize {
    64 * 1024
}

/// Timing knobs for the pending-transfer coordinator.
///
/// All values are milliseconds. Their relative magnitudes matter: the
/// coordinator spends one overall budget (`timeout_ms`) across webhook grace,
/// polling interval and per-query timeout.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TransferTimingConfig {
    pub timeout_ms: u64,
    pub webhook_polling_start_delay_ms: u64,
    pub polling_interval_ms: u64,
    pub query_timeout_ms: u64,
    pub polling_enabled: bool,
    pub cleanup_interval_ms: u64,
    pub cleanup_grace_ms: u64,
}

impl Default for TransferTimingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 50_000,
            webhook_polling_start_delay_ms: 30_000,
            polling_interval_ms: 5_000,
            query_timeout_ms: 10_000,
            polling_enabled: true,
            cleanup_interval_ms: 120_000,
            cleanup_grace_ms: 30_000,
        }
    }
}

impl TransferTimingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn polling_start_delay(&self) -> Duration {
        Duration::from_millis(self.webhook_polling_start_delay_ms)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Age after which the sweep considers an entry abandoned
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.timeout_ms + self.cleanup_grace_ms)
    }

    /// Reject combinations the deadline arithmetic cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_ms == 0 {
            bail!("transfer.timeout_ms must be greater than zero");
        }
        if self.polling_interval_ms == 0 {
            bail!("transfer.polling_interval_ms must be greater than zero");
        }
        if self.webhook_polling_start_delay_ms >= self.timeout_ms {
            bail!(
                "transfer.webhook_polling_start_delay_ms ({}) must be below timeout_ms ({})",
                self.webhook_polling_start_delay_ms,
                self.timeout_ms
            );
        }
        if self.query_timeout_ms == 0 || self.query_timeout_ms >= self.timeout_ms {
            bail!(
                "transfer.query_timeout_ms ({}) must be in (0, timeout_ms = {})",
                self.query_timeout_ms,
                self.timeout_ms
            );
        }
        if self.cleanup_interval_ms <= self.timeout_ms {
            bail!(
                "transfer.cleanup_interval_ms ({}) must be longer than timeout_ms ({})",
                self.cleanup_interval_ms,
                self.timeout_ms
            );
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    #[default]
    Http,
    Mock,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub mode: ProviderMode,
    #[serde(default)]
    pub dife: EndpointConfig,
    #[serde(default)]
    pub mol: EndpointConfig,
}

/// Downstream endpoint with OAuth2 client-credentials auth
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            token_url: "http://localhost:9000/oauth2/token".to_string(),
            client_id: "charon".to_string(),
            client_secret: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl EndpointConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))?;
        config.apply_env_overrides();
        config.transfer.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Secrets stay out of the YAML files when these are set.
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("CHARON_DIFE_CLIENT_SECRET") {
            self.providers.dife.client_secret = secret;
        }
        if let Ok(secret) = std::env::var("CHARON_MOL_CLIENT_SECRET") {
            self.providers.mol.client_secret = secret;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
log_level: "info"
log_dir: "./logs"
log_file: "charon.log"
use_json: false
rotation: "daily"
gateway:
  host: "0.0.0.0"
  port: 3000
transfer:
  timeout_ms: 50000
  webhook_polling_start_delay_ms: 30000
  polling_interval_ms: 5000
  query_timeout_ms: 10000
  polling_enabled: true
  cleanup_interval_ms: 120000
  cleanup_grace_ms: 30000
providers:
  mode: "mock"
  dife:
    base_url: "https://dife.example.com"
    token_url: "https://dife.example.com/oauth2/token"
    client_id: "charon-dife"
"#;

    #[test]
    fn test_app_config_deserialize() {
        let config = AppConfig::from_yaml(YAML).unwrap();

        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.gateway.body_limit_bytes, 64 * 1024);
        assert_eq!(config.transfer.timeout(), Duration::from_secs(50));
        assert_eq!(config.providers.mode, ProviderMode::Mock);
        assert_eq!(config.providers.dife.client_id, "charon-dife");
        assert_eq!(config.providers.dife.request_timeout_ms, 15_000);
        // mol block omitted entirely
        assert_eq!(config.providers.mol.client_id, "charon");
        assert!(config.transfer.validate().is_ok());
    }

    #[test]
    fn test_transfer_section_defaults() {
        let yaml = r#"
log_level: "debug"
log_dir: "./logs"
log_file: "charon.log"
use_json: true
rotation: "never"
gateway:
  host: "127.0.0.1"
  port: 8080
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.transfer, TransferTimingConfig::default());
        assert_eq!(config.providers.mode, ProviderMode::Http);
    }

    #[test]
    fn test_stale_after_adds_grace() {
        let timing = TransferTimingConfig::default();
        assert_eq!(timing.stale_after(), Duration::from_secs(80));
    }

    #[test]
    fn test_validate_rejects_inconsistent_budget() {
        let mut timing = TransferTimingConfig {
            webhook_polling_start_delay_ms: 60_000,
            ..Default::default()
        };
        assert!(timing.validate().is_err());

        timing.webhook_polling_start_delay_ms = 30_000;
        timing.query_timeout_ms = 50_000;
        assert!(timing.validate().is_err());

        timing.query_timeout_ms = 10_000;
        timing.cleanup_interval_ms = 50_000;
        assert!(timing.validate().is_err());

        timing.cleanup_interval_ms = 120_000;
        timing.timeout_ms = 0;
        assert!(timing.validate().is_err());
    }
}
