use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateExpenseRequest, UpdateExpenseRequest},
    repo_types::Expense,
    services,
};
use crate::{auth::Caller, error::AppError, state::AppState};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(create_expense))
        // one segment: an owner email for GET, an expense id otherwise
        .route(
            "/expenses/:key",
            get(list_expenses).put(update_expense).delete(delete_expense),
        )
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        warn!(id = %raw, "malformed expense id");
        AppError::bad_request("Invalid expense id")
    })
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.user.id))]
pub async fn create_expense(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), AppError> {
    let expense = services::create(state.store.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn list_expenses(
    State(state): State<AppState>,
    caller: Caller,
    Path(email): Path<String>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let expenses = services::list_for(state.store.as_ref(), &caller, &email).await?;
    Ok(Json(expenses))
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.user.id))]
pub async fn update_expense(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> Result<Json<Expense>, AppError> {
    let id = parse_id(&id)?;
    let expense = services::update(state.store.as_ref(), &caller, id, payload).await?;
    Ok(Json(expense))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn delete_expense(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    services::delete(state.store.as_ref(), &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
