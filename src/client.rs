use std::sync::Arc;

use reqwest::{Client, IntoUrl, Request, RequestBuilder, Response};
use tracing::{error, info};

use crate::{
    api::AnilistApi,
    config::Config,
    errors::Error,
    token::{AccessTokenRecord, TokenGuard, TokenResponse},
};

/// An authenticated AniList session: one HTTP client, one token guard.
#[derive(Clone)]
pub struct AnilistClient {
    http_client: Client,
    guard: Arc<TokenGuard<AnilistApi>>,
}

impl AnilistClient {
    /// Create a new AnilistClient
    /// # Arguments
    /// * `config` - Explicit configuration, typically loaded via `Config::from_file` or `Config::from_env`.
    ///   A `refresh_token` in the config restores a previously persisted session.
    pub fn new(config: Config) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("anilist-auth/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let api = AnilistApi::with_client(http_client.clone(), &config)?;
        let guard = TokenGuard::new(api, config.refresh_token.clone());
        Ok(Self::from_parts(http_client, guard))
    }

    pub fn from_parts(http_client: Client, guard: TokenGuard<AnilistApi>) -> Self {
        Self {
            http_client,
            guard: Arc::new(guard),
        }
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn guard(&self) -> Arc<TokenGuard<AnilistApi>> {
        Arc::clone(&self.guard)
    }

    pub fn authorize_url(&self) -> Result<String, Error> {
        self.guard.builder().authorize_url()
    }

    /// Exchanges the code from an interactive login and stores the session.
    ///
    /// The exchange is sent directly, not through the token guard.
    pub async fn login(&self, code: &str) -> Result<AccessTokenRecord, Error> {
        let request = self.guard.builder().login_request(code)?;
        let resp = self.http_client.execute(request).await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(status = %status, body_len = body.len(), "login failed");
            return Err(Error::Login(status, body));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        let record = AccessTokenRecord::from_response(token.clone());
        self.guard.set_auth(Some(token)).await;
        info!(
            expires_at_millis = record.expires_at_millis(),
            "login ok: access token stored (len={})",
            record.access_token().len()
        );
        Ok(record)
    }

    pub async fn logout(&self) {
        self.guard.set_auth(None).await;
        info!("session cleared");
    }

    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.http_client.get(url)
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.http_client.post(url)
    }

    /// Sends `request` through the token guard.
    pub async fn send(&self, request: Request) -> Result<Response, Error> {
        self.guard.intercept(request, &self.http_client).await
    }
}
