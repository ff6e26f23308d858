use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub weather: WeatherConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. When unset, weather enrichment is disabled and
    /// every lookup reports "unavailable".
    pub api_key: Option<String>,
    /// Timeout (seconds) for outbound geocoding/forecast requests.
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// SMTP credentials. When unset, the mail notifier is disabled.
    pub username: Option<String>,
    pub password: Option<String>,
    /// From address for confirmation mails; falls back to the SMTP username.
    pub from_address: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/gameon.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            weather: WeatherConfig {
                api_key: env::var("OPENWEATHER_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty()),
                request_timeout_seconds: env::var("WEATHER_REQUEST_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            email: EmailConfig {
                smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                smtp_port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .unwrap_or(587),
                username: env::var("EMAIL_USER").ok().filter(|u| !u.is_empty()),
                password: env::var("EMAIL_PASSWORD").ok().filter(|p| !p.is_empty()),
                from_address: env::var("EMAIL_FROM").ok().filter(|f| !f.is_empty()),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                frontend_url: "http://localhost:5173".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/gameon.db".to_string(),
                max_connections: 5,
            },
            weather: WeatherConfig {
                api_key: None,
                request_timeout_seconds: 10,
            },
            email: EmailConfig {
                smtp_host: "smtp.gmail.com".to_string(),
                smtp_port: 587,
                username: None,
                password: None,
                from_address: None,
            },
        }
    }
}
