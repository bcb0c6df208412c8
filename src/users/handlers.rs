use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::PublicUser, Caller, User},
    backend::Credential,
    error::AppError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/:email", get(get_user).delete(delete_user))
}

fn ensure_self(caller: &Caller, email: &str) -> Result<(), AppError> {
    if caller.is(email) {
        return Ok(());
    }
    warn!(user_id = %caller.user.id, path_email = %email, "profile access denied");
    Err(AppError::forbidden("Not authorized to access this profile"))
}

#[instrument(skip(caller), fields(user_id = %caller.user.id))]
pub async fn get_user(
    caller: Caller,
    Path(email): Path<String>,
) -> Result<Json<PublicUser>, AppError> {
    ensure_self(&caller, &email)?;
    Ok(Json(caller.user.into()))
}

/// Removes the provider identity, then the local row. Both run with the
/// service key; a failure in the second step leaves the first applied.
#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: Caller,
    Path(email): Path<String>,
) -> Result<StatusCode, AppError> {
    ensure_self(&caller, &email)?;

    let id = caller.user.id;
    state.identity.delete_identity(id).await?;
    User::delete(state.store.as_ref(), id, &Credential::Service).await?;

    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
