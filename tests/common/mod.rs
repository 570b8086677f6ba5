#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anilist_auth::clock::Clock;
use anilist_auth::{AnilistApi, Config, Error, RefreshRequestBuilder};
use reqwest::Request;
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Registry, fmt};
use wiremock::MockServer;

pub fn config(server: &MockServer, refresh_token: Option<&str>) -> Config {
    Config::from_values(
        "client",
        "secret",
        Some(server.uri()),
        Some("app://anilist-auth".to_string()),
        refresh_token.map(str::to_string),
        Some(5),
    )
}

pub fn token_body(access_token: &str, refresh_token: &str, expires: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires": expires,
    })
}

/// Address that refuses connections: bound once, then released.
pub fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Refresh request builder that counts how often it is asked for a request.
pub struct CountingApi {
    inner: AnilistApi,
    calls: Arc<AtomicUsize>,
}

impl CountingApi {
    pub fn new(config: &Config) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let api = Self {
            inner: AnilistApi::new(config).expect("valid config"),
            calls: calls.clone(),
        };
        (api, calls)
    }
}

impl RefreshRequestBuilder for CountingApi {
    fn refresh_request(&self, refresh_token: &str) -> Result<Request, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.refresh_request(refresh_token)
    }
}

struct VecWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl std::io::Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.lines.lock().unwrap();
        guard.push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let writer_lines = lines.clone();
    let subscriber = Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    );
    let guard = set_default(subscriber);
    (lines, guard)
}
