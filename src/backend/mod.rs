//! Collaborators the service delegates to: a REST data store with
//! row-level security and an identity provider that issues sessions.
//!
//! Both are traits so the hosted backend (`rest`) and the in-process one
//! (`memory`) are interchangeable behind `AppState`.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod rest;

pub use memory::MemoryBackend;
pub use rest::SupabaseClient;

pub const USERS: &str = "users";
pub const EXPENSES: &str = "expenses";
pub const CATEGORIES: &str = "categories";

#[derive(Debug, Error)]
pub enum BackendError {
    /// Non-2xx response; `message` is the response body text.
    #[error("{status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("unexpected backend response: {0}")]
    Decode(String),
    #[error("backend client is closed")]
    Closed,
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The caller's credential was rejected by the store.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Whose privileges a call runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Public anon key; subject to row-level policies for anonymous access.
    Anon,
    /// Service key; bypasses row-level security. Admin operations only.
    Service,
    /// The caller's own access token.
    Bearer(String),
}

/// Equality filters (`column = value`), applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<(String, String)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.0.push((column.to_string(), value.to_string()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        credential: &Credential,
    ) -> Result<Vec<Value>, BackendError>;

    async fn insert(
        &self,
        table: &str,
        row: Value,
        credential: &Credential,
    ) -> Result<Vec<Value>, BackendError>;

    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        patch: Value,
        credential: &Credential,
    ) -> Result<Vec<Value>, BackendError>;

    async fn delete(
        &self,
        table: &str,
        filters: &Filters,
        credential: &Credential,
    ) -> Result<Vec<Value>, BackendError>;

    /// Release pooled connections. Safe to call more than once; only the
    /// first call does anything.
    async fn close(&self) {}
}

/// Identity as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session returned by sign-in and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub user: IdentityUser,
}

fn default_token_type() -> String {
    "bearer".into()
}

/// Sign-up yields a session only when the provider confirms accounts
/// immediately.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: IdentityUser,
    pub session: Option<Session>,
}

#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;
    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError>;
    async fn delete_identity(&self, user_id: Uuid) -> Result<(), BackendError>;
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
    rows.into_iter()
        .map(|r| serde_json::from_value(r).map_err(|e| BackendError::Decode(e.to_string())))
        .collect()
}

pub fn first_row<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>, BackendError> {
    Ok(decode_rows(rows)?.into_iter().next())
}
