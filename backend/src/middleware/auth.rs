//! Authentication middleware
//!
//! Validates bearer tokens issued by the identity provider and exposes the
//! operator to handlers

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse};

/// Authenticated operator extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    /// Display name written to audit rows and manifests
    pub name: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let permission = format!("{}:{}", resource, action);
        self.permissions.contains(&permission)
    }

    /// Name recorded in audit trails
    pub fn audit_name(&self) -> String {
        if self.name.trim().is_empty() {
            self.user_id.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    // Secret comes from the environment so the middleware stays stateless
    let jwt_secret = std::env::var("BTR__JWT__SECRET")
        .or_else(|_| std::env::var("BTR_JWT_SECRET"))
        .unwrap_or_else(|_| "development-secret-key".to_string());

    let claims = match decode_jwt(token, &jwt_secret) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    let user_id = match uuid::Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let auth_user = AuthUser {
        user_id,
        name: claims.name.unwrap_or_default(),
        permissions: claims.permissions,
    };
    tracing::trace!(user_id = %auth_user.user_id, "request authenticated");

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    permissions: Vec<String>,
    exp: i64,
    iat: i64,
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> AppResult<Claims> {
    use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_pt: "Não autorizado".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current operator
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_pt: "É necessário autenticar-se".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

/// Permission guard for destructive operations such as `crt:delete`
pub fn require_permission(user: &AuthUser, resource: &str, action: &str) -> AppResult<()> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, exp: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            name: Some("Operador".to_string()),
            permissions: vec!["orders:cancel".to_string()],
            exp: now + exp,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_decode_valid_token() {
        let claims = decode_jwt(&token("s3cret", 3600), "s3cret").unwrap();
        assert_eq!(claims.name.as_deref(), Some("Operador"));
        assert_eq!(claims.permissions, vec!["orders:cancel".to_string()]);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        assert!(matches!(
            decode_jwt(&token("s3cret", 3600), "other"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        assert!(matches!(
            decode_jwt(&token("s3cret", -3600), "s3cret"),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_permission_check() {
        let user = AuthUser {
            user_id: uuid::Uuid::new_v4(),
            name: String::new(),
            permissions: vec!["orders:cancel".to_string()],
        };
        assert!(require_permission(&user, "orders", "cancel").is_ok());
        assert!(require_permission(&user, "orders", "delete").is_err());
        assert_eq!(user.audit_name(), user.user_id.to_string());
    }

    #[test]
    fn test_crt_delete_needs_its_own_grant() {
        let mut user = AuthUser {
            user_id: uuid::Uuid::new_v4(),
            name: "Supervisora".to_string(),
            permissions: vec!["crt:edit".to_string()],
        };
        assert!(matches!(
            require_permission(&user, "crt", "delete"),
            Err(AppError::InsufficientPermissions)
        ));
        user.permissions.push("crt:delete".to_string());
        assert!(require_permission(&user, "crt", "delete").is_ok());
    }
}
