use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::StockroomError;
use crate::organizations::{InvitationConfig, OrganizationConfig};
use crate::session::SessionConfig;
use crate::utils::get_env_with_prefix;

/// Main configuration for a Stockroom server
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub organizations: OrganizationConfig,
    #[serde(default)]
    pub invitations: InvitationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    pub fn with_organizations(mut self, organizations: OrganizationConfig) -> Self {
        self.config.organizations = organizations;
        self
    }

    pub fn with_invitations(mut self, invitations: InvitationConfig) -> Self {
        self.config.invitations = invitations;
        self
    }

    /// Load configuration from environment variables with STOCKROOM_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        // STOCKROOM_PORT first, then PORT for platforms that inject it
        if let Some(port) = get_env_with_prefix("PORT") {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        self.config.session = SessionConfig::from_env();
        self.config.organizations = OrganizationConfig::from_env();
        self.config.invitations = InvitationConfig::from_env();

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns a bad request error when the server address, log level,
    /// session TTL, trial length or invitation expiry is invalid.
    pub fn build(self) -> crate::error::Result<Config> {
        self.config.server.addr().map_err(|e| {
            StockroomError::bad_request(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(StockroomError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if self.config.server.port == 0 {
            return Err(StockroomError::bad_request(
                "Server port must be greater than 0",
            ));
        }

        if self.config.session.default_ttl_seconds == 0 {
            return Err(StockroomError::bad_request(
                "Session TTL must be greater than 0",
            ));
        }

        if self.config.organizations.trial_days == 0 {
            return Err(StockroomError::bad_request(
                "Trial length must be greater than 0 days",
            ));
        }

        if self.config.invitations.expiry_hours == 0 {
            return Err(StockroomError::bad_request(
                "Invitation expiry must be greater than 0 hours",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.organizations.trial_days, 14);
        assert_eq!(config.invitations.expiry_hours, 168);
        assert_eq!(config.session.cookie_name, "stockroom_session");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let result = ConfigBuilder::new().with_log_level("loud").build();
        assert!(matches!(result, Err(StockroomError::BadRequest(_))));
    }

    #[test]
    fn test_zero_port_rejected() {
        let result = ConfigBuilder::new().with_port(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_invitation_expiry_rejected() {
        let result = ConfigBuilder::new()
            .with_invitations(InvitationConfig::new().expiry_hours(0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_host_rejected() {
        let result = ConfigBuilder::new().with_host("not a host").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: Config = serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.invitations.expiry_hours, 168);
    }
}
