//! In-process store and identity provider. Used with `BACKEND=memory` and
//! by the test suite. Row-level policies are not emulated: every
//! credential sees every row, so ownership is enforced only by the
//! service's own checks.

use std::collections::HashMap;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{
    BackendError, Credential, Filters, IdentityClient, IdentityUser, Session, SignUpOutcome,
    StoreClient, USERS,
};
use crate::auth::JwtKeys;

#[derive(Debug, Clone)]
struct Identity {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Value>>,
    identities: HashMap<String, Identity>,
    // refresh token -> email
    refresh_tokens: HashMap<String, String>,
}

pub struct MemoryBackend {
    keys: JwtKeys,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend").finish_non_exhaustive()
    }
}

fn status(status: u16, message: impl Into<String>) -> BackendError {
    BackendError::Status {
        status,
        message: message.into(),
    }
}

fn now_rfc3339() -> Result<String, BackendError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| status(500, e.to_string()))
}

/// Column values are compared in their text form, the way query-string
/// filters are.
fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn matches(row: &Value, filters: &Filters) -> bool {
    filters
        .iter()
        .all(|(column, value)| column_text(row, column).as_deref() == Some(value))
}

fn hash_password(plain: &str) -> Result<String, BackendError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            status(500, e.to_string())
        })
}

fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!(error = %e, "argon2 parse hash error");
            false
        }
    }
}

impl MemoryBackend {
    pub fn new(keys: JwtKeys) -> Self {
        Self {
            keys,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn issue_session(&self, inner: &mut Inner, identity: &Identity) -> Result<Session, BackendError> {
        let access_token = self
            .keys
            .sign_access(identity.id, &identity.email)
            .map_err(|e| status(500, e.to_string()))?;
        let refresh_token = Uuid::new_v4().simple().to_string();
        inner
            .refresh_tokens
            .insert(refresh_token.clone(), identity.email.clone());

        let expires_in = self.keys.access_ttl.as_secs() as i64;
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(expires_in);
        Ok(Session {
            access_token,
            refresh_token,
            token_type: "bearer".into(),
            expires_in,
            expires_at: Some(expires_at.unix_timestamp()),
            user: IdentityUser {
                id: identity.id,
                email: Some(identity.email.clone()),
            },
        })
    }
}

#[async_trait]
impl StoreClient for MemoryBackend {
    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        _credential: &Credential,
    ) -> Result<Vec<Value>, BackendError> {
        let inner = self.inner.lock().await;
        let rows: Vec<Value> = inner
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(r, filters)).cloned().collect())
            .unwrap_or_default();
        debug!(table, rows = rows.len(), "memory select");
        Ok(rows)
    }

    async fn insert(
        &self,
        table: &str,
        row: Value,
        _credential: &Credential,
    ) -> Result<Vec<Value>, BackendError> {
        let Value::Object(mut fields) = row else {
            return Err(status(400, "row must be a JSON object"));
        };
        fields
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        if !fields.contains_key("created_at") {
            fields.insert("created_at".into(), Value::String(now_rfc3339()?));
        }
        let row = Value::Object(fields);

        let mut inner = self.inner.lock().await;
        let rows = inner.tables.entry(table.to_string()).or_default();
        let duplicate = |column: &str| {
            let value = column_text(&row, column);
            value.is_some() && rows.iter().any(|r| column_text(r, column) == value)
        };
        if duplicate("id") || (table == USERS && duplicate("email")) {
            return Err(status(
                409,
                "duplicate key value violates unique constraint",
            ));
        }
        rows.push(row.clone());
        Ok(vec![row])
    }

    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        patch: Value,
        _credential: &Credential,
    ) -> Result<Vec<Value>, BackendError> {
        let Value::Object(patch) = patch else {
            return Err(status(400, "patch must be a JSON object"));
        };

        let mut inner = self.inner.lock().await;
        let mut updated = Vec::new();
        if let Some(rows) = inner.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches(r, filters)) {
                if let Value::Object(fields) = row {
                    merge(fields, &patch);
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(
        &self,
        table: &str,
        filters: &Filters,
        _credential: &Credential,
    ) -> Result<Vec<Value>, BackendError> {
        let mut inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get_mut(table) else {
            return Ok(Vec::new());
        };
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|r| matches(r, filters));
        *rows = kept;
        debug!(table, rows = removed.len(), "memory delete");
        Ok(removed)
    }
}

fn merge(fields: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (k, v) in patch {
        fields.insert(k.clone(), v.clone());
    }
}

#[async_trait]
impl IdentityClient for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let password_hash = hash_password(password)?;

        let mut inner = self.inner.lock().await;
        if inner.identities.contains_key(email) {
            return Err(status(422, "User already registered"));
        }
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
        };
        inner.identities.insert(email.to_string(), identity.clone());
        let session = self.issue_session(&mut inner, &identity)?;

        info!(user_id = %identity.id, "identity created");
        Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let invalid = || status(400, "Invalid login credentials");
        let identity = self
            .inner
            .lock()
            .await
            .identities
            .get(email)
            .cloned()
            .ok_or_else(invalid)?;

        // hash check runs without the store lock
        if !verify_password(password, &identity.password_hash) {
            return Err(invalid());
        }

        let mut inner = self.inner.lock().await;
        if !inner.identities.contains_key(email) {
            return Err(invalid());
        }
        self.issue_session(&mut inner, &identity)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let mut inner = self.inner.lock().await;
        // rotated: a refresh token is good for one use
        let identity = inner
            .refresh_tokens
            .remove(refresh_token)
            .and_then(|email| inner.identities.get(&email).cloned())
            .ok_or_else(|| status(400, "Invalid Refresh Token: Refresh Token Not Found"))?;
        self.issue_session(&mut inner, &identity)
    }

    async fn delete_identity(&self, user_id: Uuid) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().await;
        let email = inner
            .identities
            .values()
            .find(|i| i.id == user_id)
            .map(|i| i.email.clone())
            .ok_or_else(|| status(404, "User not found"))?;
        inner.identities.remove(&email);
        inner.refresh_tokens.retain(|_, e| *e != email);
        info!(user_id = %user_id, "identity deleted");
        Ok(())
    }
}
