use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_REGISTRY_BASE_URL: &str = "https://data.gov.il/api/3/action";
pub const DEFAULT_CARS_RESOURCE: &str = "053cea08-09bc-40ec-8f7a-156f0677aff3";
pub const DEFAULT_TAV_RESOURCE: &str = "c8b9f9c8-4612-4068-934f-d4acd2e3c06e";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub base_url: String,
    pub cars_resource: String,
    pub tav_resource: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub github: GitHubConfig,
    pub registry: RegistryConfig,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let session = SessionConfig {
            secret: std::env::var("AUTH_SECRET").context("AUTH_SECRET not set")?,
            issuer: var_or("SESSION_ISSUER", "carlist"),
            audience: var_or("SESSION_AUDIENCE", "carlist-users"),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 30),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };
        let github = GitHubConfig {
            client_id: std::env::var("GITHUB_ID").context("GITHUB_ID not set")?,
            client_secret: std::env::var("GITHUB_SECRET").context("GITHUB_SECRET not set")?,
            redirect_url: var_or(
                "AUTH_REDIRECT_URL",
                "http://localhost:8080/auth/github/callback",
            ),
        };
        let registry = RegistryConfig {
            base_url: var_or("REGISTRY_BASE_URL", DEFAULT_REGISTRY_BASE_URL),
            cars_resource: var_or("REGISTRY_CARS_RESOURCE", DEFAULT_CARS_RESOURCE),
            tav_resource: var_or("REGISTRY_TAV_RESOURCE", DEFAULT_TAV_RESOURCE),
        };
        Ok(Self {
            database_url,
            session,
            github,
            registry,
        })
    }
}
