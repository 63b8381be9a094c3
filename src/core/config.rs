use serde::{Deserialize, Serialize};

use crate::models::constants::{DATABASE_TIMEOUT_SECS, DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_MS};

/// Top-level application configuration (spec.md §6.4).
///
/// Loaded once at startup via [`AppConfig::load`] by layering environment
/// variables over the defaults below through the `config` crate. Unknown
/// keys are rejected so a typo in an env var surfaces at boot, not at 3am
/// when a callback silently uses the wrong value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub abdm: AbdmConfig,
    pub callbacks: CallbackConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth_service_url: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbdmConfig {
    pub base_url: String,
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub request_timeout_ms: u64,
    pub max_retry_attempts: u32,
    pub token_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallbackConfig {
    pub consent_callback_url: String,
    pub health_record_callback_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    pub token_encryption_key: String,
    pub data_encryption_key: String,
    pub webhook_hmac_secret: String,
    pub webhook_allowed_source_ips: Vec<String>,
    /// RSA public key (PEM) the ABDM gateway signs consent artifacts with;
    /// used to verify `ConsentArtifact.signedPayload` at ingestion (spec.md
    /// §3 invariant: "signature verification succeeds at ingestion").
    pub abdm_gateway_public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Loads config from (in increasing precedence) built-in defaults, an
    /// optional `config.toml` in the working directory, and environment
    /// variables prefixed `ABDM_CORE_` with `__` as the nesting separator
    /// (e.g. `ABDM_CORE_DATABASE__URL`).
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .set_default("abdm.base_url", "https://abdm.example.gov.in/gateway")?
            .set_default("abdm.auth_url", "https://abdm.example.gov.in/gateway/v0.5/sessions")?
            .set_default("abdm.client_id", "")?
            .set_default("abdm.client_secret", "")?
            .set_default("abdm.request_timeout_ms", DEFAULT_REQUEST_TIMEOUT_MS)?
            .set_default("abdm.max_retry_attempts", DEFAULT_MAX_RETRY_ATTEMPTS)?
            .set_default("abdm.token_cache_ttl_secs", 3600)?
            .set_default("callbacks.consent_callback_url", "")?
            .set_default("callbacks.health_record_callback_url", "")?
            .set_default("security.token_encryption_key", "")?
            .set_default("security.data_encryption_key", "")?
            .set_default("security.webhook_hmac_secret", "")?
            .set_default("security.webhook_allowed_source_ips", Vec::<String>::new())?
            .set_default("security.abdm_gateway_public_key", "")?
            .set_default("database.url", "postgresql://localhost/abdm_core")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout_secs", DATABASE_TIMEOUT_SECS)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("auth_service_url", "http://localhost:9000")?
            .set_default("log_level", "info")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("ABDM_CORE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.abdm.client_id.is_empty() || self.abdm.client_secret.is_empty() {
            anyhow::bail!("ABDM client_id/client_secret must be configured");
        }
        if self.security.token_encryption_key.is_empty() {
            anyhow::bail!("security.token_encryption_key must be configured");
        }
        if self.security.data_encryption_key.is_empty() {
            anyhow::bail!("security.data_encryption_key must be configured");
        }
        if self.security.webhook_hmac_secret.is_empty() {
            anyhow::bail!("security.webhook_hmac_secret must be configured");
        }
        if self.security.abdm_gateway_public_key.is_empty() {
            anyhow::bail!("security.abdm_gateway_public_key must be configured");
        }
        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than 0");
        }
        if self.database.url.is_empty() {
            anyhow::bail!("database.url cannot be empty");
        }
        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "database.min_connections ({}) cannot exceed max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unequal_pool_bounds() {
        let mut cfg = test_config();
        cfg.database.min_connections = 20;
        cfg.database.max_connections = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_missing_abdm_credentials() {
        let mut cfg = test_config();
        cfg.abdm.client_id = String::new();
        assert!(cfg.validate().is_err());
    }

    fn test_config() -> AppConfig {
        AppConfig {
            abdm: AbdmConfig {
                base_url: "https://abdm.example.gov.in/gateway".into(),
                auth_url: "https://abdm.example.gov.in/gateway/v0.5/sessions".into(),
                client_id: "client".into(),
                client_secret: "secret".into(),
                request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
                max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
                token_cache_ttl_secs: 3600,
            },
            callbacks: CallbackConfig {
                consent_callback_url: "https://hiu.example.org/callbacks/consent".into(),
                health_record_callback_url: "https://hiu.example.org/callbacks/health-record".into(),
            },
            security: SecurityConfig {
                token_encryption_key: "k".repeat(32),
                data_encryption_key: "k".repeat(32),
                webhook_hmac_secret: "s".repeat(32),
                webhook_allowed_source_ips: vec![],
                abdm_gateway_public_key: "-----BEGIN PUBLIC KEY-----\ntest\n-----END PUBLIC KEY-----".into(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/abdm_core".into(),
                max_connections: 10,
                min_connections: 2,
                connect_timeout_secs: DATABASE_TIMEOUT_SECS,
            },
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
            },
            auth_service_url: "http://localhost:9000".into(),
            log_level: "info".into(),
        }
    }
}
