use anyhow::{Context, Result};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::i18n::SupportedLanguage;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub app: AppConfig,
    pub auth: AuthConfig,
    pub attendance: AttendanceConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Without a URL the service keeps its data in memory.
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    pub static_dir: String,
    pub default_language: SupportedLanguage,
    /// Identity-provider uids that receive the admin role on first sign-in.
    pub bootstrap_admins: Vec<String>,
}

/// Shared-secret verification of the identity provider's ID tokens.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct AttendanceConfig {
    /// Minimum hours between two attendance marks for the same participant.
    pub min_interval_hours: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source; `from_env` passes
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Server configuration
        let host = lookup("SERVER_HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = lookup("SERVER_PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        // Database configuration
        let db_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let db_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(val) => Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?),
            None => Some(10),
        };
        let db_min_connections = match lookup("DATABASE_MIN_CONNECTIONS") {
            Some(val) => Some(val.parse().context("Failed to parse DATABASE_MIN_CONNECTIONS")?),
            None => Some(1),
        };

        // App configuration
        let environment = match lookup("APP_ENVIRONMENT") {
            Some(val) => val
                .parse::<Environment>()
                .map_err(anyhow::Error::msg)
                .context("Failed to parse APP_ENVIRONMENT")?,
            None => Environment::default(),
        };
        let app_name = lookup("APP_NAME").unwrap_or_else(|| "Eventos".to_string());
        let static_dir = lookup("STATIC_DIR").unwrap_or_else(|| "static".to_string());
        let default_language = match lookup("DEFAULT_LANGUAGE") {
            Some(val) => val
                .parse::<SupportedLanguage>()
                .map_err(anyhow::Error::msg)
                .context("Failed to parse DEFAULT_LANGUAGE")?,
            None => SupportedLanguage::default(),
        };

        let bootstrap_admins = lookup("BOOTSTRAP_ADMIN_UIDS")
            .map(|val| {
                val.split(',')
                    .map(str::trim)
                    .filter(|uid| !uid.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // Identity tokens
        let jwt_secret = lookup("AUTH_JWT_SECRET").context("AUTH_JWT_SECRET must be set")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("AUTH_JWT_SECRET must be at least {} bytes", MIN_JWT_SECRET_LEN);
        }
        let issuer = lookup("AUTH_JWT_ISSUER").unwrap_or_else(|| "eventos-identity".to_string());
        let audience = lookup("AUTH_JWT_AUDIENCE").unwrap_or_else(|| "eventos-api".to_string());

        // Attendance policy
        let min_interval_hours = match lookup("ATTENDANCE_MIN_INTERVAL_HOURS") {
            Some(val) => {
                let hours: i64 = val
                    .parse()
                    .context("Failed to parse ATTENDANCE_MIN_INTERVAL_HOURS")?;
                (hours > 0).then_some(hours)
            }
            None => None,
        };

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
            },
            app: AppConfig {
                name: app_name,
                environment,
                static_dir,
                default_language,
                bootstrap_admins,
            },
            auth: AuthConfig {
                jwt_secret,
                issuer,
                audience,
            },
            attendance: AttendanceConfig { min_interval_hours },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

impl Default for Config {
    /// In-memory storage on localhost with a fixed development token secret.
    /// Deployments go through `from_env`, which requires a real secret.
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 8000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: Some(10),
                min_connections: Some(1),
            },
            app: AppConfig {
                name: "Eventos".to_string(),
                environment: Environment::Development,
                static_dir: "static".to_string(),
                default_language: SupportedLanguage::default(),
                bootstrap_admins: Vec::new(),
            },
            auth: AuthConfig {
                jwt_secret: "development-only-secret-do-not-deploy".to_string(),
                issuer: "eventos-identity".to_string(),
                audience: "eventos-api".to_string(),
            },
            attendance: AttendanceConfig::default(),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_str() {
        assert_eq!("Production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("staging".parse::<Environment>(), Ok(Environment::Staging));
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_default_config_uses_memory_storage() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.attendance.min_interval_hours.is_none());
        assert_eq!(config.server_addr().port(), 8000);
        assert_eq!(config.app.environment, Environment::Development);
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    const SECRET: (&str, &str) = ("AUTH_JWT_SECRET", "0123456789abcdef0123456789abcdef");

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup_from(&[SECRET])).unwrap();
        assert_eq!(config.server_addr().port(), 8000);
        assert_eq!(config.app.environment, Environment::Development);
        assert_eq!(config.auth.audience, "eventos-api");
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_unknown_environment_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[SECRET, ("APP_ENVIRONMENT", "qa")])).unwrap_err();
        assert!(format!("{:#}", err).contains("APP_ENVIRONMENT"));

        let config = Config::from_lookup(lookup_from(&[SECRET, ("APP_ENVIRONMENT", "production")])).unwrap();
        assert_eq!(config.app.environment, Environment::Production);
    }

    #[test]
    fn test_token_secret_is_required() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("AUTH_JWT_SECRET", "short")])).is_err());
    }

    #[test]
    fn test_secret_is_not_printed() {
        let config = Config::from_lookup(lookup_from(&[SECRET])).unwrap();
        assert!(!format!("{:?}", config).contains(SECRET.1));
    }
}
