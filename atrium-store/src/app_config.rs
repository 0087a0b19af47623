use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub booking: BookingRules,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string, or the literal "memory" to run on the
    /// in-process store with no database at all.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// ISO 4217 code reported alongside minor-unit amounts.
    pub currency: String,
    /// Buffer size of the availability broadcast channel; subscribers
    /// further behind than this lose events.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_broadcast_capacity() -> usize {
    256
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Exact origin, or "*" for permissive local development.
    pub allowed_origin: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base configuration everyone shares
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Machine-local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Finally the environment: ATRIUM__SERVER__PORT=9090
            .add_source(config::Environment::with_prefix("ATRIUM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
