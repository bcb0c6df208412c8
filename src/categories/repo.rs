use serde_json::json;
use uuid::Uuid;

use super::repo_types::Category;
use crate::backend::{
    decode_rows, first_row, BackendError, Credential, Filters, StoreClient, CATEGORIES, EXPENSES,
};

impl Category {
    pub async fn find(
        store: &dyn StoreClient,
        user_id: Uuid,
        name: &str,
        credential: &Credential,
    ) -> Result<Option<Category>, BackendError> {
        let filters = Filters::new().eq("user_id", user_id).eq("name", name);
        first_row(store.select(CATEGORIES, &filters, credential).await?)
    }

    pub async fn list_by_user(
        store: &dyn StoreClient,
        user_id: Uuid,
        credential: &Credential,
    ) -> Result<Vec<Category>, BackendError> {
        let rows = store
            .select(CATEGORIES, &Filters::new().eq("user_id", user_id), credential)
            .await?;
        decode_rows(rows)
    }

    pub async fn create(
        store: &dyn StoreClient,
        user_id: Uuid,
        name: &str,
        credential: &Credential,
    ) -> Result<Category, BackendError> {
        let rows = store
            .insert(
                CATEGORIES,
                json!({ "user_id": user_id, "name": name }),
                credential,
            )
            .await?;
        first_row(rows)?
            .ok_or_else(|| BackendError::Decode("insert into categories returned no row".into()))
    }

    pub async fn delete(
        store: &dyn StoreClient,
        id: Uuid,
        credential: &Credential,
    ) -> Result<(), BackendError> {
        store
            .delete(CATEGORIES, &Filters::new().eq("id", id), credential)
            .await?;
        Ok(())
    }

    /// Whether any of the user's expenses still carry this category name.
    pub async fn is_referenced(
        store: &dyn StoreClient,
        user_id: Uuid,
        name: &str,
        credential: &Credential,
    ) -> Result<bool, BackendError> {
        let filters = Filters::new().eq("user_id", user_id).eq("category", name);
        Ok(!store.select(EXPENSES, &filters, credential).await?.is_empty())
    }
}
