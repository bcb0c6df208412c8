use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{guard::Caller, repo_types::User};
use crate::{
    backend::{BackendError, Credential, Session, StoreClient},
    error::AppError,
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    Ok(email)
}

/// Provider rejections keep the provider's message but take the status the
/// calling flow dictates.
fn provider_error(e: BackendError, reject: fn(String) -> AppError) -> AppError {
    match e {
        BackendError::Status { message, .. } => reject(message),
        other => other.into(),
    }
}

/// User Resolver: map a verified email to its `users` row, using the
/// caller's own token.
pub async fn resolve_user(
    store: &dyn StoreClient,
    email: &str,
    token: &str,
) -> Result<Caller, AppError> {
    let credential = Credential::Bearer(token.to_string());
    match User::find_by_email(store, email, &credential).await {
        Ok(Some(user)) => Ok(Caller {
            user,
            token: token.to_string(),
        }),
        Ok(None) => {
            warn!(email = %email, "no local user for verified token");
            Err(AppError::not_found("User not found"))
        }
        Err(e) if e.is_auth_rejection() => {
            warn!(error = %e, "store rejected caller token");
            Err(AppError::unauthenticated("Invalid token"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Create the identity with the provider, then the local row.
pub async fn register(state: &AppState, email: &str, password: &str) -> Result<User, AppError> {
    let email = normalize_email(email)?;
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::bad_request("Password too short"));
    }

    let store = state.store.as_ref();
    if User::find_by_email(store, &email, &Credential::Anon).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::conflict(format!(
            "User with email {email} already exists."
        )));
    }

    let outcome = state
        .identity
        .sign_up(&email, password)
        .await
        .map_err(|e| provider_error(e, AppError::BadRequest))?;

    // Without an immediate session the row is written with the anon key.
    let credential = outcome
        .session
        .as_ref()
        .map(|s| Credential::Bearer(s.access_token.clone()))
        .unwrap_or(Credential::Anon);
    let user = User::create(store, outcome.user.id, &email, &credential).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Authenticate with the provider. Identities created out-of-band get their
/// local row on first login.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<Session, AppError> {
    let email = normalize_email(email)?;

    let session = state
        .identity
        .sign_in(&email, password)
        .await
        .map_err(|e| {
            warn!(email = %email, error = %e, "login rejected");
            provider_error(e, AppError::Unauthenticated)
        })?;

    let store = state.store.as_ref();
    let credential = Credential::Bearer(session.access_token.clone());
    if User::find_by_email(store, &email, &credential).await?.is_none() {
        let user = User::create(store, session.user.id, &email, &credential).await?;
        info!(user_id = %user.id, "created missing local user on login");
    }

    info!(user_id = %session.user.id, email = %email, "user logged in");
    Ok(session)
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<Session, AppError> {
    state.identity.refresh(refresh_token).await.map_err(|e| {
        warn!(error = %e, "refresh rejected");
        match e {
            BackendError::Status { .. } => AppError::unauthenticated("Invalid refresh token"),
            other => other.into(),
        }
    })
}
