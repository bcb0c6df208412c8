use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claims carried by access tokens issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // provider user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,    // expires at (unix timestamp)
    #[serde(default)]
    pub iat: usize,    // issued at (unix timestamp)
    // string or array; checked by the validator, not by us
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}
