use serde_json::json;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::backend::{first_row, BackendError, Credential, Filters, StoreClient, USERS};

impl User {
    /// Find a user by email.
    pub async fn find_by_email(
        store: &dyn StoreClient,
        email: &str,
        credential: &Credential,
    ) -> Result<Option<User>, BackendError> {
        let rows = store
            .select(USERS, &Filters::new().eq("email", email), credential)
            .await?;
        first_row(rows)
    }

    /// Insert the local row for an identity the provider already knows.
    pub async fn create(
        store: &dyn StoreClient,
        id: Uuid,
        email: &str,
        credential: &Credential,
    ) -> Result<User, BackendError> {
        let rows = store
            .insert(USERS, json!({ "id": id, "email": email }), credential)
            .await?;
        first_row(rows)?
            .ok_or_else(|| BackendError::Decode("insert into users returned no row".into()))
    }

    pub async fn delete(
        store: &dyn StoreClient,
        id: Uuid,
        credential: &Credential,
    ) -> Result<(), BackendError> {
        store
            .delete(USERS, &Filters::new().eq("id", id), credential)
            .await?;
        Ok(())
    }
}
