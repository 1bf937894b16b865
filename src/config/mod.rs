use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prebuilt presentation assets served behind the navigation guard
    pub pages_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the booking backend. Checked on every proxied request, never at startup.
    pub url: Option<String>,
    /// Outbound timeout; `None` keeps the HTTP client default
    pub timeout_secs: Option<u64>,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub domain: Option<String>,
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    pub app_base_url: Option<String>,
    pub audience: Option<String>,
    pub scope: String,
    pub roles_claim: String,
    pub session_ttl_secs: u64,
    pub transaction_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Marks session cookies `Secure`
    pub require_https: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("GATEWAY_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("PAGES_DIR") {
            self.server.pages_dir = PathBuf::from(v);
        }

        // Backend
        self.backend.url = non_empty_var("BACKEND_URL");
        if let Ok(v) = env::var("BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = v.parse().ok();
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.backend.max_request_size_bytes = v.parse().unwrap_or(self.backend.max_request_size_bytes);
        }

        // Identity provider
        self.auth.domain = non_empty_var("AUTH0_DOMAIN")
            .or_else(|| non_empty_var("AUTH0_ISSUER_BASE_URL").map(|issuer| domain_from_issuer(&issuer)));
        self.auth.client_id = non_empty_var("AUTH0_CLIENT_ID");
        self.auth.client_secret = non_empty_var("AUTH0_CLIENT_SECRET");
        self.auth.secret = non_empty_var("AUTH0_SECRET");
        self.auth.app_base_url = non_empty_var("APP_BASE_URL").or_else(|| non_empty_var("AUTH0_BASE_URL"));
        self.auth.audience = non_empty_var("AUTH0_AUDIENCE");
        if let Some(scope) = non_empty_var("AUTH0_SCOPE") {
            self.auth.scope = scope;
        }
        if let Some(claim) = non_empty_var("AUTH0_ROLES_CLAIM") {
            self.auth.roles_claim = claim;
        }
        if let Ok(v) = env::var("SESSION_TTL_SECS") {
            self.auth.session_ttl_secs = v.parse().unwrap_or(self.auth.session_ttl_secs);
        }

        // Security
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_HTTPS") {
            self.security.require_https = v.parse().unwrap_or(self.security.require_https);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            backend: BackendConfig {
                url: None,
                timeout_secs: None,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            auth: AuthConfig::default(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                require_https: false,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig::default(),
            backend: BackendConfig {
                url: None,
                timeout_secs: None,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            auth: AuthConfig {
                session_ttl_secs: 24 * 60 * 60,
                ..AuthConfig::default()
            },
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: Vec::new(),
                require_https: true,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig::default(),
            backend: BackendConfig {
                url: None,
                timeout_secs: None,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            auth: AuthConfig::default(),
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: Vec::new(),
                require_https: true,
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            pages_dir: PathBuf::from("public"),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: None,
            client_id: None,
            client_secret: None,
            secret: None,
            app_base_url: None,
            audience: None,
            scope: "openid profile email".to_string(),
            roles_claim: "roles".to_string(),
            session_ttl_secs: 7 * 24 * 60 * 60, // 1 week
            transaction_ttl_secs: 10 * 60,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `https://tenant.eu.auth0.com/` -> `tenant.eu.auth0.com`
pub fn domain_from_issuer(issuer: &str) -> String {
    let without_scheme = issuer
        .strip_prefix("https://")
        .or_else(|| issuer.strip_prefix("http://"))
        .unwrap_or(issuer);
    without_scheme.strip_suffix('/').unwrap_or(without_scheme).to_string()
}

#[macro_export]
macro_rules! is_production {
    ($config:expr) => {
        matches!($config.environment, $crate::config::Environment::Production)
    };
}
