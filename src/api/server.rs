// API server implementation using actix-web

use std::path::Path;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

use crate::api::{middleware, routes};
use crate::config::{AppConfig, StoreBackend};
use crate::identity::{Identity, PasswordHasher, TokenIssuer};
use crate::insights::{ChatCompletionsSummarizer, InsightGenerator, Summarizer};
use crate::store::{MemoryStore, PgStore, Store};
use crate::util::db::Db;

/// Shared, read-only handles every handler receives through `web::Data`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Identity,
    pub insights: InsightGenerator,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, identity: Identity, insights: InsightGenerator) -> Self {
        Self {
            store,
            identity,
            insights,
        }
    }

    /// Open the configured store and build the identity and insight services.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store = open_store(config).await?;
        let identity = Identity::new(
            TokenIssuer::new(&config.jwt_secret),
            PasswordHasher::new(config.bcrypt_cost),
        );
        let summarizer = ChatCompletionsSummarizer::from_config(&config.llm)
            .context("Failed to build insight service client")?
            .map(|s| Arc::new(s) as Arc<dyn Summarizer>);
        if summarizer.is_none() {
            tracing::info!("no LLM_API_KEY configured; insights use the rule-based summary");
        }
        Ok(Self::new(store, identity, InsightGenerator::new(summarizer)))
    }
}

pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let db = connect_db(config).await?;
            if config.auto_migrate {
                let applied = db.run_migrations(Path::new(&config.migrations_dir)).await?;
                tracing::info!(applied, "migrations checked");
            }
            Ok(Arc::new(PgStore::new(db)))
        }
    }
}

pub async fn connect_db(config: &AppConfig) -> Result<Db> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres store")?;
    Db::connect(url, config.db_max_connections).await
}

pub struct ApiServer {
    config: AppConfig,
}

impl ApiServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Start the HTTP server
    pub async fn run(self, state: AppState) -> Result<()> {
        let bind_addr = self.config.bind_addr();

        tracing::info!(
            host = %self.config.host,
            port = %self.config.port,
            ai_insights = state.insights.is_ai_enabled(),
            "Starting FeedbackVault API server"
        );

        let state = web::Data::new(state);
        let allowed_origins = self.config.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(state.clone())
                .wrap(cors)
                .wrap(compress)
                .wrap(logger)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
