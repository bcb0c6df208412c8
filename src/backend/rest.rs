//! Hosted backend: PostgREST-style tables under `rest/v1` and the
//! GoTrue-style identity API under `auth/v1`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    BackendError, Credential, Filters, IdentityClient, IdentityUser, Session, SignUpOutcome,
    StoreClient,
};
use crate::config::SupabaseConfig;

pub struct SupabaseClient {
    // `None` once the pool has been released.
    http: RwLock<Option<Client>>,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("anon_key", &"[REDACTED]")
            .field("service_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            http: RwLock::new(Some(client)),
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            service_key: config.service_key.clone(),
        })
    }

    async fn http(&self) -> Result<Client, BackendError> {
        self.http.read().await.clone().ok_or(BackendError::Closed)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder, credential: &Credential) -> RequestBuilder {
        let (apikey, bearer) = match credential {
            Credential::Anon => (self.anon_key.as_str(), self.anon_key.as_str()),
            Credential::Service => (self.service_key.as_str(), self.service_key.as_str()),
            Credential::Bearer(token) => (self.anon_key.as_str(), token.as_str()),
        };
        req.header("apikey", apikey).bearer_auth(bearer)
    }

    async fn table_request(
        &self,
        method: reqwest::Method,
        table: &str,
        filters: &Filters,
        credential: &Credential,
    ) -> Result<RequestBuilder, BackendError> {
        let req = self
            .http()
            .await?
            .request(method, self.url(&format!("rest/v1/{table}")))
            .header("Prefer", "return=representation")
            .query(&eq_params(filters));
        Ok(self.authorize(req, credential))
    }
}

fn eq_params(filters: &Filters) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|(column, value)| (column.to_string(), format!("eq.{value}")))
        .collect()
}

/// Prefer the provider's own message field over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

async fn send(req: RequestBuilder) -> Result<Option<Value>, BackendError> {
    let res = req
        .send()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;

    if !status.is_success() {
        warn!(%status, "backend returned error status");
        return Err(BackendError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| BackendError::Decode(e.to_string()))
}

fn into_rows(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(rows)) => rows,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

fn parse_session(value: Option<Value>) -> Result<Session, BackendError> {
    let value = value.ok_or_else(|| BackendError::Decode("empty session response".into()))?;
    serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl StoreClient for SupabaseClient {
    #[instrument(skip(self, credential), fields(table = %table))]
    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        credential: &Credential,
    ) -> Result<Vec<Value>, BackendError> {
        let req = self
            .table_request(reqwest::Method::GET, table, filters, credential)
            .await?;
        let rows = into_rows(send(req).await?);
        debug!(rows = rows.len(), "select");
        Ok(rows)
    }

    #[instrument(skip(self, row, credential), fields(table = %table))]
    async fn insert(
        &self,
        table: &str,
        row: Value,
        credential: &Credential,
    ) -> Result<Vec<Value>, BackendError> {
        let req = self
            .table_request(reqwest::Method::POST, table, &Filters::new(), credential)
            .await?
            .json(&row);
        Ok(into_rows(send(req).await?))
    }

    #[instrument(skip(self, patch, credential), fields(table = %table))]
    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        patch: Value,
        credential: &Credential,
    ) -> Result<Vec<Value>, BackendError> {
        let req = self
            .table_request(reqwest::Method::PATCH, table, filters, credential)
            .await?
            .json(&patch);
        Ok(into_rows(send(req).await?))
    }

    #[instrument(skip(self, credential), fields(table = %table))]
    async fn delete(
        &self,
        table: &str,
        filters: &Filters,
        credential: &Credential,
    ) -> Result<Vec<Value>, BackendError> {
        let req = self
            .table_request(reqwest::Method::DELETE, table, filters, credential)
            .await?;
        Ok(into_rows(send(req).await?))
    }

    async fn close(&self) {
        if self.http.write().await.take().is_some() {
            info!("backend http pool closed");
        }
    }
}

#[async_trait]
impl IdentityClient for SupabaseClient {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        let req = self
            .http()
            .await?
            .post(self.url("auth/v1/signup"))
            .json(&json!({ "email": email, "password": password }));
        let value = send(self.authorize(req, &Credential::Anon))
            .await?
            .ok_or_else(|| BackendError::Decode("empty sign-up response".into()))?;

        // With auto-confirm the provider answers with a full session,
        // otherwise with the bare user object.
        if value.get("access_token").is_some() {
            let session = parse_session(Some(value))?;
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }
        let user_value = value.get("user").cloned().unwrap_or(value);
        let user: IdentityUser =
            serde_json::from_value(user_value).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(SignUpOutcome { user, session: None })
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let req = self
            .http()
            .await?
            .post(self.url("auth/v1/token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        parse_session(send(self.authorize(req, &Credential::Anon)).await?)
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let req = self
            .http()
            .await?
            .post(self.url("auth/v1/token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        parse_session(send(self.authorize(req, &Credential::Anon)).await?)
    }

    #[instrument(skip(self))]
    async fn delete_identity(&self, user_id: Uuid) -> Result<(), BackendError> {
        let req = self
            .http()
            .await?
            .delete(self.url(&format!("auth/v1/admin/users/{user_id}")));
        send(self.authorize(req, &Credential::Service)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: format!("{}/", server.uri()),
            anon_key: "anon".into(),
            service_key: "service".into(),
        })
        .expect("client")
    }

    #[tokio::test]
    async fn select_sends_eq_filters_and_caller_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("email", "eq.alice@example.com"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": Uuid::nil(), "email": "alice@example.com"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let rows = client
            .select(
                "users",
                &Filters::new().eq("email", "alice@example.com"),
                &Credential::Bearer("user-token".into()),
            )
            .await
            .expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn non_success_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/categories"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"message": "duplicate key value violates unique constraint"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .insert("categories", json!({"name": "food"}), &Credential::Anon)
            .await
            .unwrap_err();
        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 409);
                assert!(message.contains("duplicate key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_with_empty_body_returns_no_rows() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/expenses"))
            .and(query_param("id", "eq.42"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let rows = client_for(&server)
            .delete(
                "expenses",
                &Filters::new().eq("id", 42),
                &Credential::Bearer("t".into()),
            )
            .await
            .expect("delete");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn sign_in_parses_session() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({"email": "a@b.io", "password": "pw123456"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "acc",
                "refresh_token": "ref",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {"id": id, "email": "a@b.io"}
            })))
            .mount(&server)
            .await;

        let session = client_for(&server)
            .sign_in("a@b.io", "pw123456")
            .await
            .expect("session");
        assert_eq!(session.access_token, "acc");
        assert_eq!(session.user.id, id);
        assert_eq!(session.expires_in, 3600);
    }

    #[tokio::test]
    async fn sign_up_accepts_bare_user_response() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": id, "email": "a@b.io"})),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .sign_up("a@b.io", "pw123456")
            .await
            .expect("outcome");
        assert_eq!(outcome.user.id, id);
        assert!(outcome.session.is_none());
    }

    #[tokio::test]
    async fn delete_identity_uses_service_key() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("DELETE"))
            .and(path(format!("/auth/v1/admin/users/{id}")))
            .and(header("apikey", "service"))
            .and(header("authorization", "Bearer service"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_identity(id).await.expect("deleted");
    }

    #[tokio::test]
    async fn closed_client_refuses_calls() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        client.close().await;
        client.close().await;

        let err = client
            .select("users", &Filters::new(), &Credential::Anon)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Closed));
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("plain failure\n"), "plain failure");
        assert_eq!(error_message(r#"{"msg":"Invalid login credentials"}"#), "Invalid login credentials");
    }
}
