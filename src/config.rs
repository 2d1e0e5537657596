use dotenv::dotenv;
use std::env;

const HOST: &str = "HOST";
const PORT: &str = "PORT";
const AUTH_SECRET: &str = "AUTH_SECRET";
const TOKEN_TTL_HOURS: &str = "TOKEN_TTL_HOURS";
const EVENT_CAPACITY: &str = "EVENT_CAPACITY";

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub auth_secret: String,
    pub token_ttl_hours: i64,
    pub event_capacity: usize,
}

impl Config {
    pub fn from_env() -> Config {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<Config, String> {
        // Load .env file
        dotenv().ok();

        let host = env::var(HOST).unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = match env::var(PORT) {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| format!("failed to parse {}: {}", PORT, raw))?,
            Err(_) => 5000,
        };

        // The token signing secret has no safe default
        let auth_secret = env::var(AUTH_SECRET)
            .map_err(|_| format!("failed to load environment variable {}", AUTH_SECRET))?;

        let token_ttl_hours = match env::var(TOKEN_TTL_HOURS) {
            Ok(raw) => {
                let hours = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| format!("failed to parse {}: {}", TOKEN_TTL_HOURS, raw))?;
                if hours <= 0 {
                    return Err(format!("{} must be positive, got {}", TOKEN_TTL_HOURS, hours));
                }
                hours
            }
            Err(_) => 24,
        };

        let event_capacity = match env::var(EVENT_CAPACITY) {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("failed to parse {}: {}", EVENT_CAPACITY, raw))?,
            Err(_) => 1024,
        };

        Ok(Config {
            host,
            port,
            auth_secret,
            token_ttl_hours,
            event_capacity,
        })
    }

    pub fn default() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 5000,
            auth_secret: "dev-secret-change-me".to_string(),
            token_ttl_hours: 24,
            event_capacity: 1024,
        }
    }
}
