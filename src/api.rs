//! Request builders for the AniList authorization endpoints.

use reqwest::{Client, Request, Url};

use crate::{Config, errors::Error};

/// Builds the request that exchanges a refresh token for a new access token.
pub trait RefreshRequestBuilder: Send + Sync {
    fn refresh_request(&self, refresh_token: &str) -> Result<Request, Error>;
}

#[derive(Clone, Debug)]
pub struct AnilistApi {
    http: Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: Option<String>,
}

impl AnilistApi {
    pub fn new(config: &Config) -> Result<Self, Error> {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: &Config) -> Result<Self, Error> {
        let raw = config.base_url();
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("Invalid AniList base URL '{raw}': {e}")))?;
        Ok(Self {
            http,
            base_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_url(&self) -> Result<Url, Error> {
        self.endpoint("auth/access_token")
    }

    /// URL the user opens to start an interactive login.
    pub fn authorize_url(&self) -> Result<String, Error> {
        let redirect_uri = self.redirect_uri()?;
        let mut url = self.endpoint("auth/authorize")?.to_string();
        url.push_str(&format!(
            "?grant_type=authorization_code&client_id={}&redirect_uri={}&response_type=code",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
        ));
        Ok(url)
    }

    /// Exchange of the authorization code received on the redirect URI.
    pub fn login_request(&self, code: &str) -> Result<Request, Error> {
        let redirect_uri = self.redirect_uri()?;
        let request = self
            .http
            .post(self.token_url()?)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .build()?;
        Ok(request)
    }

    fn redirect_uri(&self) -> Result<&str, Error> {
        self.redirect_uri
            .as_deref()
            .ok_or_else(|| Error::Config("redirect_uri is required for login".to_string()))
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid endpoint '{path}': {e}")))
    }
}

impl RefreshRequestBuilder for AnilistApi {
    fn refresh_request(&self, refresh_token: &str) -> Result<Request, Error> {
        let request = self
            .http
            .post(self.token_url()?)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .build()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;

    fn config(base_url: Option<&str>) -> Config {
        Config::from_values(
            "client id",
            "secret",
            base_url.map(str::to_string),
            Some("app://anilist-auth".to_string()),
            None,
            None,
        )
    }

    fn body(request: &Request) -> String {
        let bytes = request
            .body()
            .and_then(|b| b.as_bytes())
            .expect("form body is buffered");
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn refresh_request_targets_token_endpoint() {
        let api = AnilistApi::new(&config(None)).unwrap();
        let request = api.refresh_request("rt1").unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://anilist.co/api/auth/access_token"
        );
        let body = body(&request);
        assert!(body.contains("grant_type=refresh_token"));
        assert!(body.contains("client_id=client+id"));
        assert!(body.contains("client_secret=secret"));
        assert!(body.contains("refresh_token=rt1"));
        assert_eq!(
            request.headers()["content-type"],
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn base_url_without_trailing_slash_keeps_path() {
        let api = AnilistApi::new(&config(Some("http://127.0.0.1:8080/api"))).unwrap();
        assert_eq!(
            api.token_url().unwrap().as_str(),
            "http://127.0.0.1:8080/api/auth/access_token"
        );
    }

    #[test]
    fn invalid_base_url_fails_fast() {
        let err = AnilistApi::new(&config(Some("://not-a-url"))).expect_err("invalid url");
        match err {
            Error::Config(msg) => assert!(msg.contains("Invalid AniList base URL")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn authorize_url_encodes_parameters() {
        let api = AnilistApi::new(&config(None)).unwrap();
        let url = api.authorize_url().unwrap();
        assert_eq!(
            url,
            "https://anilist.co/api/auth/authorize?grant_type=authorization_code\
             &client_id=client%20id&redirect_uri=app%3A%2F%2Fanilist-auth&response_type=code"
        );
    }

    #[test]
    fn login_request_carries_code_and_redirect() {
        let api = AnilistApi::new(&config(None)).unwrap();
        let request = api.login_request("abc").unwrap();
        let body = body(&request);
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=abc"));
        assert!(body.contains("redirect_uri=app%3A%2F%2Fanilist-auth"));
    }

    #[test]
    fn login_without_redirect_uri_is_config_error() {
        let mut cfg = config(None);
        cfg.redirect_uri = None;
        let api = AnilistApi::new(&cfg).unwrap();
        assert!(matches!(api.login_request("abc"), Err(Error::Config(_))));
        assert!(matches!(api.authorize_url(), Err(Error::Config(_))));
    }
}
