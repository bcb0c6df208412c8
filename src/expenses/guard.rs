use tracing::warn;
use uuid::Uuid;

use super::repo_types::Expense;
use crate::{auth::Caller, backend::StoreClient, error::AppError};

/// Expense Authorization Guard. Must pass before any update or delete.
pub async fn authorize(
    store: &dyn StoreClient,
    caller: &Caller,
    expense_id: Uuid,
) -> Result<Expense, AppError> {
    let expense = Expense::find(store, expense_id, &caller.credential())
        .await?
        .ok_or_else(|| {
            warn!(expense_id = %expense_id, "expense not found");
            AppError::not_found("Expense not found")
        })?;

    if expense.user_id != caller.user.id {
        warn!(
            expense_id = %expense_id,
            owner = %expense.user_id,
            user_id = %caller.user.id,
            "expense belongs to another user"
        );
        return Err(AppError::forbidden("Not authorized to access this expense"));
    }
    Ok(expense)
}
