use async_trait::async_trait;
use tracing::debug;

use super::{repo_types::User, services::resolve_user};
use crate::{backend::Credential, error::AppError, state::AppState};

/// An authenticated request: the resolved user plus the token it arrived
/// with. Every store call made on the caller's behalf reuses that token so
/// the store's row-level policies apply.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub token: String,
}

impl Caller {
    pub fn credential(&self) -> Credential {
        Credential::Bearer(self.token.clone())
    }

    /// Path emails are compared case-insensitively.
    pub fn is(&self, email: &str) -> bool {
        self.user.email.eq_ignore_ascii_case(email.trim())
    }
}

/// Turns a bearer token into a `Caller`. Installed on `AppState` at start-up
/// so tests can swap in their own.
#[async_trait]
pub trait RequestGuard: Send + Sync {
    async fn authenticate(&self, state: &AppState, token: &str) -> Result<Caller, AppError>;
}

/// Token Validator followed by User Resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerGuard;

#[async_trait]
impl RequestGuard for BearerGuard {
    async fn authenticate(&self, state: &AppState, token: &str) -> Result<Caller, AppError> {
        let email = state.keys.validate(token)?;
        let caller = resolve_user(state.store.as_ref(), &email, token).await?;
        debug!(user_id = %caller.user.id, "request authenticated");
        Ok(caller)
    }
}

/// Accepts any token and returns the same caller. Test wiring only.
#[derive(Debug, Clone)]
pub struct StaticGuard(pub Caller);

#[async_trait]
impl RequestGuard for StaticGuard {
    async fn authenticate(&self, _state: &AppState, token: &str) -> Result<Caller, AppError> {
        Ok(Caller {
            user: self.0.user.clone(),
            token: token.to_string(),
        })
    }
}
