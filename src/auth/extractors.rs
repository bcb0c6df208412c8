use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::guard::Caller;
use crate::{error::AppError, state::AppState};

/// Read the token from `Authorization: Bearer <token>`. The scheme is
/// case-insensitive.
pub fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::unauthenticated("Token is missing"))?;

    let token = auth
        .trim_start()
        .split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            warn!("invalid auth scheme");
            AppError::unauthenticated("Invalid authorization header")
        })?;

    Ok(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.to_string();
        state.guard.authenticate(state, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut req = Request::builder().uri("/expenses");
        if let Some(h) = header {
            req = req.header(AUTHORIZATION, h);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))).unwrap(), "abc");
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))).unwrap(), "abc");
        assert_eq!(bearer_token(&parts_with(Some("BEARER abc"))).unwrap(), "abc");
        assert_eq!(bearer_token(&parts_with(Some("BeArEr  abc "))).unwrap(), "abc");
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(matches!(
            bearer_token(&parts_with(None)),
            Err(AppError::Unauthenticated(m)) if m == "Token is missing"
        ));
        assert!(bearer_token(&parts_with(Some("Basic abc"))).is_err());
        assert!(bearer_token(&parts_with(Some("Bearerabc"))).is_err());
        assert!(bearer_token(&parts_with(Some("Bearer"))).is_err());
        assert!(bearer_token(&parts_with(Some("Bearer   "))).is_err());
    }
}
