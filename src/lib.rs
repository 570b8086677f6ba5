pub mod api;
mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod token;
mod transport;

pub use api::{AnilistApi, RefreshRequestBuilder};
pub use client::AnilistClient;
pub use config::Config;
pub use errors::Error;
pub use token::{AccessTokenRecord, AuthState, TokenGuard, TokenResponse};
pub use transport::Transport;
