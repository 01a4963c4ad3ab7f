use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub public_rps: u32,
    pub api_rps: u32,
    pub allowed_origins: Vec<String>,
    /// When set, subtest submissions later than the time limit plus this many
    /// seconds are rejected. Unset keeps the time limit advisory.
    pub subtest_grace_seconds: Option<i64>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            public_rps: get_env_parse("PUBLIC_RPS")?,
            api_rps: get_env_parse("API_RPS")?,
            allowed_origins: parse_origins(env::var("ALLOWED_ORIGINS").ok().as_deref()),
            subtest_grace_seconds: match env::var("SUBTEST_GRACE_SECONDS") {
                Ok(_) => Some(get_env_parse("SUBTEST_GRACE_SECONDS")?),
                Err(_) => None,
            },
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(_) => get_env_parse(name),
        Err(_) => Ok(default),
    }
}

/// Localhost dev origins are always allowed; `raw` adds to them.
fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let mut origins: Vec<String> = DEFAULT_ALLOWED_ORIGINS
        .iter()
        .map(|o| o.to_string())
        .collect();
    for origin in raw.unwrap_or_default().split(',') {
        let origin = origin.trim().trim_end_matches('/');
        if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }
    origins
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_default_to_localhost() {
        let origins = parse_origins(None);
        assert_eq!(origins, vec!["http://localhost:3000", "http://localhost:5173"]);
    }

    #[test]
    fn origins_are_trimmed_and_deduplicated() {
        let origins = parse_origins(Some(" https://app.example.com/ ,http://localhost:3000,,"));
        assert_eq!(
            origins,
            vec![
                "http://localhost:3000",
                "http://localhost:5173",
                "https://app.example.com",
            ]
        );
    }
}
