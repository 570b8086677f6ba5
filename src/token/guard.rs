use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue};
use reqwest::{Request, Response, Url};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::api::RefreshRequestBuilder;
use crate::clock::{Clock, SystemClock};
use crate::errors::Error;
use crate::telemetry::refresh::RefreshTelemetry;
use crate::transport::Transport;

use super::{AccessTokenRecord, TokenResponse};

/// Convenience result alias for guard operations.
pub type TokenGuardResult<T> = Result<T, Error>;

/// Where a guard stands relative to the clock at the time of asking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    /// No refresh token is held.
    Unauthenticated,
    /// A refresh token is held but there is no unexpired access token.
    Stale,
    /// An unexpired access token is cached.
    Fresh,
}

#[derive(Default)]
struct Session {
    refresh_token: Option<String>,
    current: Option<AccessTokenRecord>,
    // Bumped by every completed refresh attempt and every set_auth.
    generation: u64,
}

enum Decision {
    Unauthenticated,
    Fresh(String),
    Stale {
        refresh_token: String,
        generation: u64,
    },
}

impl Session {
    fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    fn decide(&self, now_millis: i64) -> Decision {
        let Some(refresh_token) = self.refresh_token() else {
            return Decision::Unauthenticated;
        };
        match &self.current {
            Some(record) if !record.is_expired(now_millis) => {
                Decision::Fresh(record.access_token().to_string())
            }
            _ => Decision::Stale {
                refresh_token: refresh_token.to_string(),
                generation: self.generation,
            },
        }
    }

    /// Outcome left behind by whoever last changed the session.
    fn settled(&self) -> TokenGuardResult<String> {
        if self.refresh_token().is_none() {
            return Err(Error::Unauthenticated);
        }
        match &self.current {
            Some(record) => Ok(record.access_token().to_string()),
            None => Err(Error::RefreshFailed(
                "concurrent refresh did not produce a token".into(),
            )),
        }
    }
}

/// Attaches a valid AniList bearer token to every request it forwards,
/// refreshing the access token when it is missing or expired.
pub struct TokenGuard<A> {
    session: RwLock<Session>,
    refresh_lock: Mutex<()>,
    builder: A,
    clock: Arc<dyn Clock>,
}

impl<A: RefreshRequestBuilder> TokenGuard<A> {
    pub fn new(builder: A, refresh_token: Option<String>) -> Self {
        Self::with_clock(builder, refresh_token, Arc::new(SystemClock))
    }

    pub fn with_clock(builder: A, refresh_token: Option<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            session: RwLock::new(Session {
                refresh_token,
                ..Session::default()
            }),
            refresh_lock: Mutex::new(()),
            builder,
            clock,
        }
    }

    pub fn builder(&self) -> &A {
        &self.builder
    }

    /// Forwards `request` with an `Authorization: Bearer` header, refreshing
    /// the access token first when needed.
    ///
    /// Fails with [`Error::Unauthenticated`] when no refresh token is held and
    /// with [`Error::RefreshFailed`] when the refresh yields no token; in both
    /// cases the request is never sent. Transport errors on the forwarded
    /// request are returned as-is.
    pub async fn intercept<T: Transport>(
        &self,
        mut request: Request,
        transport: &T,
    ) -> TokenGuardResult<Response> {
        let access_token = self.ensure_access_token(request.url(), transport).await?;
        let value = bearer_header(&access_token)?;
        request.headers_mut().append(AUTHORIZATION, value);
        transport.proceed(request).await
    }

    /// Replaces the session after an interactive login, or clears it when
    /// given `None`.
    pub async fn set_auth(&self, record: Option<TokenResponse>) {
        let mut session = self.session.write().await;
        session.refresh_token = record.as_ref().map(|r| r.refresh_token.clone());
        session.current = record.map(AccessTokenRecord::from_response);
        session.generation += 1;
    }

    pub async fn current(&self) -> Option<AccessTokenRecord> {
        self.session.read().await.current.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.session.read().await.refresh_token.clone()
    }

    pub async fn state(&self) -> AuthState {
        match self.session.read().await.decide(self.clock.now_millis()) {
            Decision::Unauthenticated => AuthState::Unauthenticated,
            Decision::Fresh(_) => AuthState::Fresh,
            Decision::Stale { .. } => AuthState::Stale,
        }
    }

    async fn ensure_access_token<T: Transport>(
        &self,
        url: &Url,
        transport: &T,
    ) -> TokenGuardResult<String> {
        let observed = {
            let session = self.session.read().await;
            match session.decide(self.clock.now_millis()) {
                Decision::Unauthenticated => return Err(Error::Unauthenticated),
                Decision::Fresh(token) => return Ok(token),
                Decision::Stale { generation, .. } => generation,
            }
        };

        // Only one refresh attempt should run at a time.
        let _flight = self.refresh_lock.lock().await;
        let now = self.clock.now_millis();
        let refresh_token = {
            let session = self.session.read().await;
            if session.generation != observed {
                debug!("session changed while waiting; reusing its outcome");
                return session.settled();
            }
            match session.decide(now) {
                Decision::Unauthenticated => return Err(Error::Unauthenticated),
                Decision::Fresh(token) => return Ok(token),
                Decision::Stale { refresh_token, .. } => refresh_token,
            }
        };

        let telemetry = RefreshTelemetry::new(url.as_str());
        telemetry.emit_start(now);
        let outcome = self.refresh(&refresh_token, transport).await;

        let mut session = self.session.write().await;
        if session.generation != observed {
            debug!("session replaced during refresh; discarding refresh result");
            return session.settled();
        }
        session.generation += 1;
        match outcome {
            Ok(record) => {
                telemetry.emit_success(record.expires_at_millis(), record.access_token().len());
                let token = record.access_token().to_string();
                session.current = Some(record);
                Ok(token)
            }
            Err(reason) => {
                telemetry.emit_failure(&reason);
                session.current = None;
                Err(Error::RefreshFailed(reason))
            }
        }
    }

    async fn refresh<T: Transport>(
        &self,
        refresh_token: &str,
        transport: &T,
    ) -> Result<AccessTokenRecord, String> {
        let request = self
            .builder
            .refresh_request(refresh_token)
            .map_err(|e| format!("could not build refresh request: {e}"))?;
        let response = transport
            .proceed(request)
            .await
            .map_err(|e| format!("refresh request failed: {e}"))?;

        let status = response.status();
        // Reading to the end releases the connection on both branches.
        let body = response
            .text()
            .await
            .map_err(|e| format!("could not read refresh response: {e}"))?;
        if !status.is_success() {
            warn!(%status, body_len = body.len(), "token endpoint rejected refresh");
            return Err(format!("token endpoint returned {status}"));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| format!("malformed token response: {e}"))?;
        // A token that cannot travel in a header is as good as none.
        bearer_header(&parsed.access_token)
            .map_err(|e| format!("access token is not a valid header value: {e}"))?;
        Ok(AccessTokenRecord::from_response(parsed))
    }
}

fn bearer_header(access_token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {access_token}"))?;
    value.set_sensitive(true);
    Ok(value)
}
