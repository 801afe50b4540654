use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::query::SecurityContext;
use crate::server::AppState;

/// Bearer token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: usize,
}

/// Resolves the caller's role and user id and stores them as a
/// `SecurityContext` request extension for the handlers.
pub async fn security_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let security = resolve_security(request.headers(), &state.config.security)?;
    tracing::debug!("Request runs as role {:?} user {:?}", security.role, security.user_id);
    request.extensions_mut().insert(security);
    Ok(next.run(request).await)
}

/// No Authorization header means the anonymous role with no user id
pub fn resolve_security(headers: &HeaderMap, config: &SecurityConfig) -> Result<SecurityContext, ApiError> {
    let Some(token) = extract_jwt_from_headers(headers).map_err(ApiError::unauthorized)? else {
        return Ok(SecurityContext::new(config.anonymous_role.clone(), ""));
    };

    let claims = validate_jwt(&token, &config.jwt_secret).map_err(ApiError::unauthorized)?;
    let role = claims
        .role
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| config.anonymous_role.clone());
    Ok(SecurityContext::new(role, claims.user_id))
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(Some(token.trim().to_string()))
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Validate JWT token and extract claims
fn validate_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn security() -> SecurityConfig {
        let mut config = AppConfig::development().security;
        config.jwt_secret = SECRET.to_string();
        config
    }

    fn token(claims: &Claims, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn claims(user_id: &str, role: Option<&str>, exp_offset: i64) -> Claims {
        Claims {
            user_id: user_id.to_string(),
            role: role.map(str::to_string),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
        headers
    }

    #[test]
    fn anonymous_without_header() {
        let ctx = resolve_security(&HeaderMap::new(), &security()).unwrap();
        assert_eq!(ctx, SecurityContext::new("anon", ""));
    }

    #[test]
    fn token_with_role() {
        let t = token(&claims("u-1", Some("admin"), 3600), SECRET);
        let ctx = resolve_security(&bearer(&t), &security()).unwrap();
        assert_eq!(ctx, SecurityContext::new("admin", "u-1"));
    }

    #[test]
    fn token_without_role_uses_anonymous_role() {
        let t = token(&claims("u-2", None, 3600), SECRET);
        let ctx = resolve_security(&bearer(&t), &security()).unwrap();
        assert_eq!(ctx, SecurityContext::new("anon", "u-2"));
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let t = token(&claims("u-1", Some("admin"), 3600), "other");
        let err = resolve_security(&bearer(&t), &security()).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let t = token(&claims("u-1", None, -3600), SECRET);
        assert!(resolve_security(&bearer(&t), &security()).is_err());
    }

    #[test]
    fn non_bearer_scheme_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic YW5vbjphbm9u"));
        assert_eq!(resolve_security(&headers, &security()).unwrap_err().status_code(), 401);
    }

    #[test]
    fn tokens_rejected_without_secret() {
        let t = token(&claims("u-1", None, 3600), SECRET);
        let mut config = security();
        config.jwt_secret.clear();
        assert!(resolve_security(&bearer(&t), &config).is_err());
    }
}
