use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Who the credential says the player is. The signature is the backend's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenClaims {
    #[serde(alias = "id", alias = "sub")]
    user_id: serde_json::Value,
    #[serde(default)]
    name: Option<String>,
}

/// Reads the middle segment of a `header.payload.signature` token.
pub fn decode_identity(token: &str) -> Result<Identity, AppError> {
    let payload = token
        .trim()
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| AppError::AuthDecode("token has no payload segment".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .or_else(|_| STANDARD.decode(payload))
        .map_err(|err| AppError::AuthDecode(format!("payload is not base64: {err}")))?;

    let claims: TokenClaims = serde_json::from_slice(&bytes)
        .map_err(|err| AppError::AuthDecode(format!("payload is not valid claims json: {err}")))?;

    let user_id = match claims.user_id {
        serde_json::Value::String(s) if !s.is_empty() => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => return Err(AppError::AuthDecode("missing user id".to_string())),
    };

    Ok(Identity {
        user_id,
        name: claims.name.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.c2ln",
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn decodes_user_id_and_name() {
        let token = token_with(r#"{"userId":"665f","name":"Sam","iat":1}"#);
        let id = decode_identity(&token).unwrap();
        assert_eq!(id.user_id, "665f");
        assert_eq!(id.name, "Sam");
    }

    #[test]
    fn malformed_tokens_are_auth_decode_failures() {
        for bad in ["", "abc", "a..c", "a.!!!.c"] {
            let err = decode_identity(bad).unwrap_err();
            assert!(err.is_fatal(), "{bad:?} should be fatal");
        }
        let err = decode_identity(&token_with(r#"{"name":"Sam"}"#)).unwrap_err();
        assert!(matches!(err, AppError::AuthDecode(_)));
    }
}
