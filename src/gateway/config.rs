//! Gateway configuration

use std::time::Duration;

use crate::core::{env, GatewayError, GatewayResult};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const PRODUCTION: &str = "production";

/// HTTP server and session settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Maximum session age; also the reaper's sweep interval
    pub session_ttl: Duration,
    /// Allowed CORS origin. `None` allows any origin.
    pub cors_origin: Option<String>,
    pub environment: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            cors_origin: None,
            environment: "development".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Create a gateway configuration from environment variables
    ///
    /// Reads from:
    /// - `HOST` (optional, defaults to `0.0.0.0`)
    /// - `PORT` (optional, defaults to 3001)
    /// - `SESSION_TTL_SECS` (optional, defaults to 3600)
    /// - `CLIENT_URL` (optional, CORS origin)
    /// - `APP_ENV` (optional, defaults to `development`)
    pub fn from_env() -> GatewayResult<Self> {
        let mut config = Self::default();

        if let Some(host) = env::var("HOST") {
            config.host = host;
        }
        if let Some(port) = env::parse_var("PORT").map_err(config_error)? {
            config.port = port;
        }
        if let Some(secs) = env::parse_var::<u64>("SESSION_TTL_SECS").map_err(config_error)? {
            if secs == 0 {
                return Err(GatewayError::Config(
                    "SESSION_TTL_SECS must be greater than zero".to_string(),
                ));
            }
            config.session_ttl = Duration::from_secs(secs);
        }
        config.cors_origin = env::var("CLIENT_URL");
        if let Some(environment) = env::var("APP_ENV") {
            config.environment = environment;
        }

        Ok(config)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Whether internal error detail may be shown to clients
    pub fn expose_error_details(&self) -> bool {
        !self.environment.eq_ignore_ascii_case(PRODUCTION)
    }

    /// Session TTL as a signed duration for timestamp arithmetic
    pub fn session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::MAX)
    }

    /// Address to bind, as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn config_error(err: anyhow::Error) -> GatewayError {
    GatewayError::Config(format!("{:#}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.session_ttl_chrono(), chrono::Duration::hours(1));
        assert!(config.cors_origin.is_none());
        assert!(config.expose_error_details());
        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
    }

    #[test]
    fn test_production_hides_details() {
        let config = GatewayConfig::default().with_environment("Production");
        assert!(!config.expose_error_details());
    }

    #[test]
    fn test_builders() {
        let config = GatewayConfig::default()
            .with_host("127.0.0.1")
            .with_port(8080)
            .with_session_ttl(Duration::from_secs(90))
            .with_cors_origin("http://localhost:5173");
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.session_ttl_chrono(), chrono::Duration::seconds(90));
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn test_config_error_keeps_variable_name() {
        std::env::set_var("COACH_GATEWAY_TEST_TTL", "soon");
        let err = env::parse_var::<u64>("COACH_GATEWAY_TEST_TTL")
            .map_err(config_error)
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(ref msg) if msg.contains("COACH_GATEWAY_TEST_TTL")));
    }
}
