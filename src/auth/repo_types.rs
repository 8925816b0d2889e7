use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                     // numeric user ID carried by the session
    pub name: Option<String>,        // display name or GitHub login
    pub email: Option<String>,       // primary verified email
    pub image: Option<String>,       // avatar URL
    pub provider: String,            // identity provider, "github"
    pub provider_id: String,         // id at the provider
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Profile returned by the identity provider, before it is stored.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}
