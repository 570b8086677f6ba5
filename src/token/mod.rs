mod guard;
mod record;

pub use guard::{AuthState, TokenGuard, TokenGuardResult};
pub use record::{AccessTokenRecord, EXPIRY_MARGIN_MILLIS, TokenResponse};
