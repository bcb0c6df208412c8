use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CategoryView, CreateCategoryRequest},
    resolver,
};
use crate::{auth::Caller, error::AppError, state::AppState};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:name",
            get(get_category).delete(delete_category),
        )
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.user.id))]
pub async fn create_category(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryView>), AppError> {
    let category = resolver::create(state.store.as_ref(), &caller, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn list_categories(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<CategoryView>>, AppError> {
    let all = resolver::list(state.store.as_ref(), &caller).await?;
    Ok(Json(
        all.into_iter()
            .filter_map(CategoryView::from_resolution)
            .collect(),
    ))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn get_category(
    State(state): State<AppState>,
    caller: Caller,
    Path(name): Path<String>,
) -> Result<Json<CategoryView>, AppError> {
    let resolution = resolver::require(state.store.as_ref(), &caller, &name).await?;
    CategoryView::from_resolution(resolution)
        .map(Json)
        .ok_or_else(|| AppError::not_found("Category not found"))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn delete_category(
    State(state): State<AppState>,
    caller: Caller,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    resolver::delete(state.store.as_ref(), &caller, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
