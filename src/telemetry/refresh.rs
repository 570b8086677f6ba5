use tracing::{Level, event};
use uuid::Uuid;

/// Structured log events for one refresh attempt.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    /// `context` names what triggered the refresh, usually the intercepted URL.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn emit_start(&self, now_millis: i64) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            now_millis,
            "refresh.start"
        );
    }

    pub fn emit_success(&self, expires_at_millis: i64, token_len: usize) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            expires_at_millis,
            token_len,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, reason: &str) {
        event!(
            Level::WARN,
            attempt_id = %self.attempt_id,
            context = %self.context,
            reason,
            "refresh.failure"
        );
    }
}
