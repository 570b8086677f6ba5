use serde::{Deserialize, Serialize};

/// Safety margin subtracted from the server-reported expiry.
pub const EXPIRY_MARGIN_MILLIS: i64 = 60_000;

/// Token payload as returned by the AniList token endpoint.
///
/// `expires` is an absolute instant in seconds since the epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires: i64,
}

/// An issued access token with its expiry already moved one minute early.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessTokenRecord {
    access_token: String,
    refresh_token: String,
    expires_at_millis: i64,
}

impl AccessTokenRecord {
    /// Converts the server expiry from seconds to milliseconds and subtracts
    /// [`EXPIRY_MARGIN_MILLIS`].
    pub fn from_response(response: TokenResponse) -> Self {
        let TokenResponse {
            access_token,
            refresh_token,
            expires,
        } = response;
        Self {
            access_token,
            refresh_token,
            expires_at_millis: expires
                .saturating_mul(1000)
                .saturating_sub(EXPIRY_MARGIN_MILLIS),
        }
    }

    /// Returns the raw token value suitable for Authorization headers.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at_millis
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at_millis <= now_millis
    }
}

impl From<TokenResponse> for AccessTokenRecord {
    fn from(response: TokenResponse) -> Self {
        Self::from_response(response)
    }
}
