use serde_json::{json, Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateExpenseRequest, UpdateExpenseRequest},
    guard::authorize,
    repo_types::Expense,
};
use crate::{
    auth::Caller,
    backend::StoreClient,
    categories::{self, Resolution},
    error::AppError,
};

fn check_amount(amount: f64) -> Result<(), AppError> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(AppError::bad_request("Amount must be a finite number"))
    }
}

/// Strict category check for writes. An unknown category is a client
/// error here, not a 404.
async fn resolve_category(
    store: &dyn StoreClient,
    caller: &Caller,
    name: &str,
) -> Result<String, AppError> {
    match categories::lookup(store, caller, name).await? {
        Resolution::Missing => {
            warn!(user_id = %caller.user.id, category = %name, "expense category does not resolve");
            Err(AppError::conflict("Category not found"))
        }
        found => Ok(found.name().unwrap_or_default().to_string()),
    }
}

pub async fn create(
    store: &dyn StoreClient,
    caller: &Caller,
    req: CreateExpenseRequest,
) -> Result<Expense, AppError> {
    check_amount(req.amount)?;
    let category = resolve_category(store, caller, &req.category).await?;

    let expense = Expense::create(
        store,
        caller.user.id,
        req.amount,
        &category,
        req.description.as_deref(),
        &caller.credential(),
    )
    .await?;
    info!(expense_id = %expense.id, user_id = %caller.user.id, "expense created");
    Ok(expense)
}

pub async fn list_for(
    store: &dyn StoreClient,
    caller: &Caller,
    email: &str,
) -> Result<Vec<Expense>, AppError> {
    if !caller.is(email) {
        warn!(user_id = %caller.user.id, path_email = %email, "expense listing denied");
        return Err(AppError::forbidden("Not authorized to access these expenses"));
    }
    Ok(Expense::list_by_user(store, caller.user.id, &caller.credential()).await?)
}

/// Only the new category is validated; the one being replaced is not.
pub async fn update(
    store: &dyn StoreClient,
    caller: &Caller,
    id: Uuid,
    req: UpdateExpenseRequest,
) -> Result<Expense, AppError> {
    authorize(store, caller, id).await?;

    let mut patch = Map::new();
    if let Some(amount) = req.amount {
        check_amount(amount)?;
        patch.insert("amount".into(), json!(amount));
    }
    if let Some(category) = req.category.as_deref() {
        let category = resolve_category(store, caller, category).await?;
        patch.insert("category".into(), Value::String(category));
    }
    if let Some(description) = req.description {
        patch.insert("description".into(), Value::String(description));
    }
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    patch.insert("updated_at".into(), Value::String(now));

    let expense = Expense::update(store, id, Value::Object(patch), &caller.credential())
        .await?
        .ok_or_else(|| AppError::not_found("Expense not found"))?;
    info!(expense_id = %id, user_id = %caller.user.id, "expense updated");
    Ok(expense)
}

pub async fn delete(store: &dyn StoreClient, caller: &Caller, id: Uuid) -> Result<(), AppError> {
    authorize(store, caller, id).await?;
    Expense::delete(store, id, &caller.credential()).await?;
    info!(expense_id = %id, user_id = %caller.user.id, "expense deleted");
    Ok(())
}
