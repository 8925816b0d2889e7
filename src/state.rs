use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::auth::github::GitHubOAuth;
use crate::config::AppConfig;
use crate::registry::{GovRegistry, RegistryClient};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub registry: Arc<dyn RegistryClient>,
    pub github: Arc<GitHubOAuth>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let registry = Arc::new(GovRegistry::new(&config.registry)?) as Arc<dyn RegistryClient>;
        let github = Arc::new(GitHubOAuth::new(&config.github)?);

        Ok(Self {
            db,
            config,
            registry,
            github,
        })
    }
}
