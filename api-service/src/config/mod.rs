use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_DATABASE: &str = "sessions_db";
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 15 * 60;
const DEFAULT_JSON_BODY_LIMIT_BYTES: usize = 100 * 1024;
const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";

/// Wildcard origin used when `FRONTEND_URL` is not configured.
pub const ANY_ORIGIN: &str = "*";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub common: core_config::Config,
    /// Value of `NODE_ENV`, reported by the health endpoint.
    pub environment: String,
    pub frontend_url: Option<String>,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub rate_limit: RateLimitConfig,
    pub json_body_limit_bytes: usize,
    pub ai: AiConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// `None` when `MONGODB_URI` is unset; connecting then fails with
    /// `ConnectError::NotConfigured`.
    pub uri: Option<String>,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: AiProviderKind,
    pub api_key: Option<String>,
    pub text_model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProviderKind {
    Gemini,
    Mock,
}

impl AiProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProviderKind::Gemini => "gemini",
            AiProviderKind::Mock => "mock",
        }
    }
}

impl FromStr for AiProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(AiProviderKind::Gemini),
            "mock" => Ok(AiProviderKind::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "AI_PROVIDER must be 'gemini' or 'mock', got '{}'",
                other
            ))),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            frontend_url: None,
            otlp_endpoint: None,
            mongodb: MongoConfig {
                uri: None,
                database: DEFAULT_DATABASE.to_string(),
            },
            rate_limit: RateLimitConfig {
                max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
                window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            },
            json_body_limit_bytes: DEFAULT_JSON_BODY_LIMIT_BYTES,
            ai: AiConfig {
                provider: AiProviderKind::Mock,
                api_key: None,
                text_model: DEFAULT_TEXT_MODEL.to_string(),
            },
        }
    }
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_source(common, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_source<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = EnvSource { lookup };

        let environment = source.or_default("NODE_ENV", DEFAULT_ENVIRONMENT);

        let api_key = source.optional("GOOGLE_API_KEY");
        let provider = match source.optional("AI_PROVIDER") {
            Some(value) => value.parse()?,
            None if api_key.is_some() => AiProviderKind::Gemini,
            None => AiProviderKind::Mock,
        };

        if provider == AiProviderKind::Gemini && api_key.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GOOGLE_API_KEY is required when AI_PROVIDER is gemini"
            )));
        }

        let config = ApiConfig {
            common,
            environment,
            frontend_url: source.optional("FRONTEND_URL"),
            otlp_endpoint: source.optional("OTLP_ENDPOINT"),
            mongodb: MongoConfig {
                uri: source.optional("MONGODB_URI"),
                database: source.or_default("MONGODB_DATABASE", DEFAULT_DATABASE),
            },
            rate_limit: RateLimitConfig {
                max_requests: source
                    .parse_or("RATE_LIMIT_MAX_REQUESTS", DEFAULT_RATE_LIMIT_MAX_REQUESTS)?,
                window_seconds: source
                    .parse_or("RATE_LIMIT_WINDOW_SECONDS", DEFAULT_RATE_LIMIT_WINDOW_SECONDS)?,
            },
            json_body_limit_bytes: source
                .parse_or("JSON_BODY_LIMIT_BYTES", DEFAULT_JSON_BODY_LIMIT_BYTES)?,
            ai: AiConfig {
                provider,
                api_key,
                text_model: source.or_default("GENAI_TEXT_MODEL", DEFAULT_TEXT_MODEL),
            },
        };

        if config.ai.provider == AiProviderKind::Mock && config.is_production() {
            tracing::warn!("Mock AI provider selected in production");
        }

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// The CORS allowed origin: `FRONTEND_URL`, or `*`.
    pub fn cors_origin(&self) -> &str {
        self.frontend_url.as_deref().unwrap_or(ANY_ORIGIN)
    }
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank values are treated the same.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
            }),
            None => Ok(default),
        }
    }
}
