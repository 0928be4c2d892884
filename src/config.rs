use anyhow::{Context, Result};
use tracing::warn;

use crate::util::env::{self as env_util, env_first, env_flag, env_opt, env_parse};

pub const DEFAULT_JWT_SECRET: &str = "default-secret-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Settings for the external text-generation service.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Process-wide configuration, read once at startup and handed to every component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub auto_migrate: bool,
    pub migrations_dir: String,
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub llm: LlmConfig,
    pub allowed_origins: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        env_util::init_env();

        let port = env_opt("API_PORT")
            .unwrap_or_else(|| "8001".to_string())
            .trim()
            .parse()
            .context("Invalid API_PORT")?;

        let store_backend = match env_opt("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".into())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("unknown STORE_BACKEND '{other}' (expected postgres|memory)"),
        };

        let database_url = match env_util::db_url() {
            Ok(url) => Some(match env_opt("DB_NAME") {
                Some(name) => env_util::with_database_name(&url, &name),
                None => url,
            }),
            Err(_) if store_backend == StoreBackend::Memory => None,
            Err(e) => return Err(e.context("DATABASE_URL is required for the postgres store")),
        };

        let jwt_secret = env_opt("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using the built-in development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        Ok(Self {
            host: env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            store_backend,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNS", 10u32),
            auto_migrate: env_flag("AUTO_MIGRATE", false),
            migrations_dir: env_opt("MIGRATIONS_DIR").unwrap_or_else(|| "./migrations".into()),
            jwt_secret,
            bcrypt_cost: env_parse("BCRYPT_COST", bcrypt::DEFAULT_COST),
            llm: LlmConfig {
                api_key: env_first(&["LLM_API_KEY", "EMERGENT_LLM_KEY"]),
                base_url: env_opt("LLM_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: env_opt("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                timeout_secs: env_parse("LLM_TIMEOUT_SECS", 30u64),
            },
            allowed_origins: env_opt("CORS_ORIGINS").unwrap_or_else(|| "*".to_string()),
        })
    }

    /// Log a redacted snapshot of the settings that came from the environment.
    pub fn log_snapshot(&self) -> Result<()> {
        // Required values were already enforced by `from_env`.
        env_util::preflight_check(
            "feedback-vault",
            &[],
            &[
                "API_HOST",
                "API_PORT",
                "STORE_BACKEND",
                "DATABASE_URL",
                "DB_NAME",
                "JWT_SECRET",
                "LLM_API_KEY",
                "LLM_BASE_URL",
                "LLM_MODEL",
                "CORS_ORIGINS",
            ],
        )
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    /// Local-development settings: in-memory store, no external insight service.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8001,
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 10,
            auto_migrate: false,
            migrations_dir: "./migrations".into(),
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".into(),
                model: "gpt-4o-mini".into(),
                timeout_secs: 30,
            },
            allowed_origins: "*".into(),
        }
    }
}
