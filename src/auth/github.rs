//! GitHub sign-in (authorization code flow with PKCE).
//!
//! [`GitHubOAuth::authorize_url`] stores the CSRF state and PKCE verifier in
//! `oauth_states`; [`GitHubOAuth::complete`] consumes that row, exchanges the
//! code, reads the GitHub profile and upserts the user.

use anyhow::Context;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, info};

use super::repo::{save_oauth_state, take_oauth_state};
use super::repo_types::{ProviderProfile, User};
use crate::config::GitHubConfig;

pub const PROVIDER: &str = "github";
const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

pub struct GitHubOAuth {
    client: ConfiguredClient,
    // token exchange must not follow redirects
    token_http: reqwest::Client,
    api_http: reqwest::Client,
}

impl GitHubOAuth {
    pub fn new(config: &GitHubConfig) -> anyhow::Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).context("github auth url")?)
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string()).context("github token url")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone()).context("AUTH_REDIRECT_URL")?,
            );

        let token_http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build oauth http client")?;
        let api_http = reqwest::ClientBuilder::new()
            .user_agent(concat!("carlist/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build github api client")?;

        Ok(Self {
            client,
            token_http,
            api_http,
        })
    }

    /// Authorization URL for the browser redirect.
    pub async fn authorize_url(&self, db: &PgPool) -> anyhow::Result<String> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("read:user".to_string()))
            .add_scope(Scope::new("user:email".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        save_oauth_state(db, PROVIDER, csrf_state.secret(), pkce_verifier.secret()).await?;
        debug!("github authorization started");
        Ok(url.to_string())
    }

    /// Finish the flow started by [`GitHubOAuth::authorize_url`].
    pub async fn complete(&self, db: &PgPool, code: &str, state: &str) -> anyhow::Result<User> {
        let verifier = take_oauth_state(db, PROVIDER, state)
            .await?
            .context("invalid or expired oauth state")?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier))
            .request_async(&self.token_http)
            .await
            .context("github token exchange")?;
        let access_token = token.access_token().secret();

        let gh: GitHubUser = self
            .api_http
            .get(format!("{}/user", API_URL))
            .bearer_auth(access_token)
            .send()
            .await
            .context("github /user")?
            .error_for_status()
            .context("github /user status")?
            .json()
            .await
            .context("decode github /user")?;

        let email = match gh.email {
            Some(email) => Some(email),
            None => self.primary_email(access_token).await?,
        };

        let profile = ProviderProfile {
            provider_id: gh.id.to_string(),
            name: gh.name.or(Some(gh.login)),
            email,
            image: gh.avatar_url,
        };
        let user = User::upsert_from_provider(db, PROVIDER, &profile).await?;
        info!(user_id = user.id, "github sign-in");
        Ok(user)
    }

    async fn primary_email(&self, access_token: &str) -> anyhow::Result<Option<String>> {
        let emails: Vec<GitHubEmail> = self
            .api_http
            .get(format!("{}/user/emails", API_URL))
            .bearer_auth(access_token)
            .send()
            .await
            .context("github /user/emails")?
            .error_for_status()
            .context("github /user/emails status")?
            .json()
            .await
            .context("decode github /user/emails")?;
        Ok(pick_primary_email(emails))
    }
}

fn pick_primary_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::test_config;

    #[test]
    fn picks_primary_verified_email() {
        let emails = vec![
            GitHubEmail { email: "a@x.io".into(), primary: false, verified: true },
            GitHubEmail { email: "b@x.io".into(), primary: true, verified: false },
            GitHubEmail { email: "c@x.io".into(), primary: true, verified: true },
        ];
        assert_eq!(pick_primary_email(emails).as_deref(), Some("c@x.io"));
        assert_eq!(pick_primary_email(Vec::new()), None);
    }

    #[test]
    fn rejects_malformed_redirect_url() {
        let mut config = test_config().github;
        config.redirect_url = "not a url".into();
        assert!(GitHubOAuth::new(&config).is_err());
    }
}
