use anyhow::Context;
use sqlx::PgPool;

use crate::auth::repo_types::{ProviderProfile, User};

const USER_COLUMNS: &str = "id, name, email, image, provider, provider_id, created_at, updated_at";

impl User {
    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Insert the user on first sign-in, refresh the profile afterwards.
    pub async fn upsert_from_provider(
        db: &PgPool,
        provider: &str,
        profile: &ProviderProfile,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, image, provider, provider_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider, provider_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                image = EXCLUDED.image,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.image)
        .bind(provider)
        .bind(&profile.provider_id)
        .fetch_one(db)
        .await
        .context("upsert user")?;
        Ok(user)
    }
}

/// Remember a pending authorization (CSRF state + PKCE verifier) for 10 minutes.
pub async fn save_oauth_state(
    db: &PgPool,
    provider: &str,
    state: &str,
    pkce_verifier: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO oauth_states (state, provider, pkce_verifier, expires_at)
        VALUES ($1, $2, $3, NOW() + INTERVAL '10 minutes')
        "#,
    )
    .bind(state)
    .bind(provider)
    .bind(pkce_verifier)
    .execute(db)
    .await
    .context("insert oauth state")?;
    Ok(())
}

/// Consume a pending authorization; returns the PKCE verifier if the state
/// exists and has not expired. A state can only be taken once.
pub async fn take_oauth_state(
    db: &PgPool,
    provider: &str,
    state: &str,
) -> anyhow::Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        r#"
        DELETE FROM oauth_states
        WHERE state = $1 AND provider = $2 AND expires_at > NOW()
        RETURNING pkce_verifier
        "#,
    )
    .bind(state)
    .bind(provider)
    .fetch_optional(db)
    .await
    .context("take oauth state")?;
    Ok(row.map(|r| r.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, name: &str) -> ProviderProfile {
        ProviderProfile {
            provider_id: id.into(),
            name: Some(name.into()),
            email: Some(format!("{}@example.com", name)),
            image: None,
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn upsert_refreshes_existing_user(db: PgPool) {
        let first = User::upsert_from_provider(&db, "github", &profile("99", "old"))
            .await
            .unwrap();
        let second = User::upsert_from_provider(&db, "github", &profile("99", "new"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("new"));

        let found = User::find_by_id(&db, first.id).await.unwrap().unwrap();
        assert_eq!(found.email.as_deref(), Some("new@example.com"));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn oauth_state_is_single_use(db: PgPool) {
        save_oauth_state(&db, "github", "csrf-1", "verifier-1").await.unwrap();
        assert_eq!(
            take_oauth_state(&db, "github", "csrf-1").await.unwrap().as_deref(),
            Some("verifier-1")
        );
        assert_eq!(take_oauth_state(&db, "github", "csrf-1").await.unwrap(), None);
        assert_eq!(take_oauth_state(&db, "google", "csrf-1").await.unwrap(), None);
    }
}
