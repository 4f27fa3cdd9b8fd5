// Start of file: /src/config/environment.rs

// * Environment configuration, parsed from a key/value map so that
// * tests can build it without touching the process environment.

use std::{borrow::Cow, collections::HashMap, fmt};
// * anyhow for convenient error handling
use anyhow::{bail, Context, Result};
use tracing::warn;

// ! Default values for environment variables (used if variables aren't set):
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_DEV_SECRET: &str = "dev-only-insecure-jwt-secret";
const DEFAULT_ACCESS_TTL: u64 = 900; // 15 minutes
const DEFAULT_REFRESH_TTL: u64 = 2_592_000; // 30 days
const DEFAULT_RATE_LIMIT_MAX: u64 = 200;
const DEFAULT_RATE_LIMIT_WINDOW: u64 = 60;
const DEFAULT_REDIS_TIMEOUT_MS: u64 = 250;
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_BODY_SIZE: usize = 16_777_216; // 16MB
const DEFAULT_TIMEOUT: u64 = 30; // 30 seconds
const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

// * A struct containing all environment variables used by the app
#[derive(Clone)]
pub struct EnvironmentVariables {
    pub environment: Cow<'static, str>,
    pub host: Cow<'static, str>,
    pub port: u16,
    pub jwt_secret_key: Cow<'static, str>,
    pub allowed_origins: Vec<String>,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub rate_limit_max_requests: u64,
    pub rate_limit_window_seconds: u64,
    pub redis_url: Option<String>,
    pub redis_timeout_ms: u64,
    pub log_dir: Cow<'static, str>,
    pub upload_dir: Cow<'static, str>,
    pub max_request_body_size: usize,
    pub default_timeout_seconds: u64,
    pub bcrypt_cost: u32,
}

impl EnvironmentVariables {
    // * Loads environment variables from the process and, outside
    // * production, from a .env file.
    pub fn load() -> Result<Self> {
        Self::load_dotenv();

        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    // * Reads .env outside production and reports whether the process
    // * runs in production. Safe to call more than once.
    pub fn load_dotenv() -> bool {
        // ? In non-production environments, attempt to load .env
        if std::env::var("ENVIRONMENT").unwrap_or_default() != "production" {
            dotenv::dotenv().ok();
        }

        std::env::var("ENVIRONMENT").is_ok_and(|value| value.trim() == "production")
    }

    // * Builds the configuration from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get_var = |key: &str| {
            vars.get(key)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
        };

        let environment: Cow<'static, str> = get_var("ENVIRONMENT")
            .map(|s| Cow::Owned(s.into()))
            .unwrap_or_else(|| {
                warn!("Missing ENVIRONMENT, defaulting to '{DEFAULT_ENVIRONMENT}'");
                Cow::Borrowed(DEFAULT_ENVIRONMENT)
            });
        let production: bool = environment == "production";

        let jwt_secret_key: Cow<'static, str> = match get_var("JWT_SECRET_KEY") {
            Some(secret) => Cow::Owned(secret.into()),
            None if production => bail!("JWT_SECRET_KEY must be set in production"),
            None => {
                warn!("Missing JWT_SECRET_KEY, using an insecure development secret");
                Cow::Borrowed(DEFAULT_DEV_SECRET)
            }
        };

        let allowed_origins: Vec<String> = get_var("ALLOWED_ORIGIN")
            .unwrap_or(DEFAULT_ALLOWED_ORIGIN)
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        if allowed_origins.is_empty() {
            bail!("ALLOWED_ORIGIN must name at least one origin");
        }

        let config: Self = Self {
            host: get_var("HOST")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or(Cow::Borrowed(DEFAULT_HOST)),

            port: parse_or(get_var("PORT"), "PORT", DEFAULT_PORT)?,

            jwt_secret_key,
            allowed_origins,

            access_token_ttl_seconds: parse_or(
                get_var("ACCESS_TOKEN_TTL_SECONDS"),
                "ACCESS_TOKEN_TTL_SECONDS",
                DEFAULT_ACCESS_TTL,
            )?,

            refresh_token_ttl_seconds: parse_or(
                get_var("REFRESH_TOKEN_TTL_SECONDS"),
                "REFRESH_TOKEN_TTL_SECONDS",
                DEFAULT_REFRESH_TTL,
            )?,

            rate_limit_max_requests: parse_or(
                get_var("RATE_LIMIT_MAX_REQUESTS"),
                "RATE_LIMIT_MAX_REQUESTS",
                DEFAULT_RATE_LIMIT_MAX,
            )?,

            rate_limit_window_seconds: parse_or(
                get_var("RATE_LIMIT_WINDOW_SECONDS"),
                "RATE_LIMIT_WINDOW_SECONDS",
                DEFAULT_RATE_LIMIT_WINDOW,
            )?,

            redis_url: get_var("REDIS_URL").map(str::to_string),

            redis_timeout_ms: parse_or(
                get_var("REDIS_TIMEOUT_MS"),
                "REDIS_TIMEOUT_MS",
                DEFAULT_REDIS_TIMEOUT_MS,
            )?,

            log_dir: get_var("LOG_DIR")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or(Cow::Borrowed(DEFAULT_LOG_DIR)),

            upload_dir: get_var("UPLOAD_DIR")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or(Cow::Borrowed(DEFAULT_UPLOAD_DIR)),

            max_request_body_size: parse_or(
                get_var("MAX_REQUEST_BODY_SIZE"),
                "MAX_REQUEST_BODY_SIZE",
                DEFAULT_MAX_BODY_SIZE,
            )?,

            default_timeout_seconds: parse_or(
                get_var("DEFAULT_TIMEOUT_SECONDS"),
                "DEFAULT_TIMEOUT_SECONDS",
                DEFAULT_TIMEOUT,
            )?,

            bcrypt_cost: parse_or(get_var("BCRYPT_COST"), "BCRYPT_COST", DEFAULT_BCRYPT_COST)?,

            environment,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    fn validate(&self) -> Result<()> {
        if self.rate_limit_max_requests == 0 {
            bail!("RATE_LIMIT_MAX_REQUESTS must be greater than zero");
        }
        if self.rate_limit_window_seconds == 0 {
            bail!("RATE_LIMIT_WINDOW_SECONDS must be greater than zero");
        }
        if self.access_token_ttl_seconds == 0 || self.refresh_token_ttl_seconds == 0 {
            bail!("token lifetimes must be greater than zero");
        }
        if self.redis_timeout_ms == 0 {
            bail!("REDIS_TIMEOUT_MS must be greater than zero");
        }
        if self.default_timeout_seconds == 0 {
            bail!("DEFAULT_TIMEOUT_SECONDS must be greater than zero");
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31");
        }
        for origin in &self.allowed_origins {
            axum::http::HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid ALLOWED_ORIGIN entry '{origin}'"))?;
        }
        Ok(())
    }
}

// * Parses an optional raw value, falling back to the default when unset
fn parse_or<T>(raw: Option<&str>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map(|s| s.parse::<T>().with_context(|| format!("Invalid {key} value")))
        .transpose()
        .map(|value| value.unwrap_or(default))
}

// ! The signing key never reaches the logs
impl fmt::Debug for EnvironmentVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentVariables")
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret_key", &"[REDACTED]")
            .field("allowed_origins", &self.allowed_origins)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_seconds", &self.rate_limit_window_seconds)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[SET]"))
            .field("redis_timeout_ms", &self.redis_timeout_ms)
            .field("log_dir", &self.log_dir)
            .field("upload_dir", &self.upload_dir)
            .field("max_request_body_size", &self.max_request_body_size)
            .field("default_timeout_seconds", &self.default_timeout_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}


// End of file: /src/config/environment.rs
