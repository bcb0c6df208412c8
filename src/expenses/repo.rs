use serde_json::{json, Value};
use uuid::Uuid;

use super::repo_types::Expense;
use crate::backend::{
    decode_rows, first_row, BackendError, Credential, Filters, StoreClient, EXPENSES,
};

impl Expense {
    pub async fn find(
        store: &dyn StoreClient,
        id: Uuid,
        credential: &Credential,
    ) -> Result<Option<Expense>, BackendError> {
        let rows = store
            .select(EXPENSES, &Filters::new().eq("id", id), credential)
            .await?;
        first_row(rows)
    }

    pub async fn list_by_user(
        store: &dyn StoreClient,
        user_id: Uuid,
        credential: &Credential,
    ) -> Result<Vec<Expense>, BackendError> {
        let rows = store
            .select(EXPENSES, &Filters::new().eq("user_id", user_id), credential)
            .await?;
        decode_rows(rows)
    }

    pub async fn create(
        store: &dyn StoreClient,
        user_id: Uuid,
        amount: f64,
        category: &str,
        description: Option<&str>,
        credential: &Credential,
    ) -> Result<Expense, BackendError> {
        let row = json!({
            "user_id": user_id,
            "amount": amount,
            "category": category,
            "description": description,
        });
        first_row(store.insert(EXPENSES, row, credential).await?)?
            .ok_or_else(|| BackendError::Decode("insert into expenses returned no row".into()))
    }

    /// Apply `patch` to one expense; `None` if the store matched no row.
    pub async fn update(
        store: &dyn StoreClient,
        id: Uuid,
        patch: Value,
        credential: &Credential,
    ) -> Result<Option<Expense>, BackendError> {
        let rows = store
            .update(EXPENSES, &Filters::new().eq("id", id), patch, credential)
            .await?;
        first_row(rows)
    }

    pub async fn delete(
        store: &dyn StoreClient,
        id: Uuid,
        credential: &Credential,
    ) -> Result<(), BackendError> {
        store
            .delete(EXPENSES, &Filters::new().eq("id", id), credential)
            .await?;
        Ok(())
    }
}
