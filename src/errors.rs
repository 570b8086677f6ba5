use std::fmt;

use reqwest::StatusCode;
use reqwest::header::InvalidHeaderValue;

#[derive(Debug)]
pub enum Error {
    /// No refresh token is held; the caller must log in again.
    Unauthenticated,
    /// The refresh attempt did not produce a usable access token.
    RefreshFailed(String),
    Login(StatusCode, String),
    Http(reqwest::Error),
    Json(serde_json::Error),
    Io(std::io::Error),
    Config(String),
    Header(InvalidHeaderValue),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unauthenticated => write!(f, "not authenticated with AniList"),
            Error::RefreshFailed(reason) => write!(f, "access token wasn't refreshed: {reason}"),
            Error::Login(status, body) => write!(f, "login failed ({status}): {body}"),
            Error::Http(err) => write!(f, "http error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Header(err) => write!(f, "invalid header value: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Header(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<InvalidHeaderValue> for Error {
    fn from(err: InvalidHeaderValue) -> Self {
        Error::Header(err)
    }
}
