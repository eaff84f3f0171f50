//! Bearer JWT authentication for the tracking routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use domain::models::UserRole;
use shared::jwt::{extract_user_id, JwtConfig};

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated caller, taken from the access token claims.
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub user_id: Uuid,
    pub role: UserRole,
    pub jti: String,
}

impl UserAuth {
    /// Validates an access token and extracts the caller.
    pub fn validate(jwt: &JwtConfig, token: &str) -> Result<Self, String> {
        let claims = jwt
            .validate_token(token)
            .map_err(|e| format!("Invalid token: {}", e))?;

        let user_id = extract_user_id(&claims).map_err(|e| e.to_string())?;
        let role = claims.role.parse::<UserRole>()?;

        Ok(UserAuth {
            user_id,
            role,
            jti: claims.jti,
        })
    }
}

pub(crate) fn bearer_token(req_headers: &axum::http::HeaderMap) -> Option<&str> {
    req_headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Rejects requests without a valid access token and stores the
/// [`UserAuth`] in request extensions.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return ApiError::Unauthorized("Missing or invalid Authorization header".to_string())
            .into_response();
    };

    match UserAuth::validate(&state.jwt, token) {
        Ok(auth) => {
            tracing::debug!(user_id = %auth.user_id, jti = %auth.jti, "Authenticated operator");
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("JWT validation failed: {}", e);
            ApiError::Unauthorized("Invalid or expired token".to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn jwt() -> JwtConfig {
        JwtConfig::from_secret("unit-test-secret", 3600, 0).unwrap()
    }

    #[test]
    fn test_validate_extracts_user_and_role() {
        let jwt = jwt();
        let user_id = Uuid::new_v4();
        let (token, jti) = jwt.generate_access_token(user_id, "organization").unwrap();

        let auth = UserAuth::validate(&jwt, &token).unwrap();
        assert_eq!(auth.user_id, user_id);
        assert_eq!(auth.role, UserRole::Organization);
        assert_eq!(auth.jti, jti);
    }

    #[test]
    fn test_validate_rejects_unknown_role() {
        let jwt = jwt();
        let (token, _) = jwt.generate_access_token(Uuid::new_v4(), "captain").unwrap();
        assert!(UserAuth::validate(&jwt, &token).is_err());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(UserAuth::validate(&jwt(), "not.a.token").is_err());
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
