//! Authentication middleware
//!
//! JWT verification for staff routes and license-number lookup for the
//! public dispensary storefront.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shared::{is_privileged_role, Action, PermissionSet, Resource, Viewer};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::dispensary::{DispensaryRecord, DispensaryService};
use crate::AppState;

/// Header carrying a dispensary license number on public routes
pub const LICENSE_HEADER: &str = "x-license-number";

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub role_name: String,
    pub permissions: PermissionSet,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.permissions.allows(resource, action)
    }

    /// Admin-level roles see records owned by every user
    pub fn is_privileged(&self) -> bool {
        is_privileged_role(&self.role_name)
    }

    pub fn viewer(&self) -> Viewer {
        Viewer {
            user_id: self.user_id,
            privileged: self.is_privileged(),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role_id: String,
    pub role_name: String,
    pub permissions: PermissionSet,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
                .into_response();
        }
    };

    match decode_jwt(token, &state.config.jwt.secret).and_then(auth_user_from_claims) {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

fn auth_user_from_claims(claims: Claims) -> AppResult<AuthUser> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;
    let role_id = Uuid::parse_str(&claims.role_id)
        .map_err(|_| AppError::Unauthorized("Invalid role ID in token".to_string()))?;

    Ok(AuthUser {
        user_id,
        role_id,
        role_name: claims.role_name,
        permissions: claims.permissions,
    })
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> AppResult<Claims> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Sign claims with the shared secret. Tokens are normally issued by the
/// account service; this is used by tooling and tests.
pub fn encode_jwt(claims: &Claims, secret: &str) -> AppResult<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Extractor for a dispensary identified by its license number
#[derive(Clone, Debug)]
pub struct LicensedDispensary(pub DispensaryRecord);

#[axum::async_trait]
impl axum::extract::FromRequestParts<AppState> for LicensedDispensary {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let license = parts
            .headers
            .get(LICENSE_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("License number required".to_string()))?;
        let license = shared::normalize_license_number(license)?;

        DispensaryService::new(state.db.clone())
            .by_license(license)
            .await?
            .map(LicensedDispensary)
            .ok_or_else(|| AppError::Unauthorized("Invalid license number".to_string()))
    }
}

/// Permission guard for use in handlers
/// Returns an error if the user doesn't have the required permission
pub fn check_permission(user: &AuthUser, resource: Resource, action: Action) -> AppResult<()> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %user.user_id,
            ?resource,
            ?action,
            "Permission denied"
        );
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims(permissions: PermissionSet) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4().to_string(),
            role_id: Uuid::new_v4().to_string(),
            role_name: "Sales Rep".to_string(),
            permissions,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let original = claims(PermissionSet::sales_rep());
        let token = encode_jwt(&original, "test-secret").unwrap();
        let decoded = decode_jwt(&token, "test-secret").unwrap();
        let user = auth_user_from_claims(decoded).unwrap();

        assert_eq!(user.user_id.to_string(), original.sub);
        assert!(user.has_permission(Resource::OrdersVmi, Action::Edit));
        assert!(!user.is_privileged());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = encode_jwt(&claims(PermissionSet::all()), "a").unwrap();
        assert!(matches!(decode_jwt(&token, "b"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut expired = claims(PermissionSet::all());
        expired.exp = Utc::now().timestamp() - 3600;
        let token = encode_jwt(&expired, "s").unwrap();
        assert!(decode_jwt(&token, "s").is_err());
    }

    #[test]
    fn test_check_permission() {
        let mut c = claims(PermissionSet::sales_rep());
        c.role_name = "Admin".to_string();
        let user = auth_user_from_claims(c).unwrap();
        assert!(user.is_privileged());
        assert!(check_permission(&user, Resource::OrdersVmi, Action::Edit).is_ok());
        assert!(matches!(
            check_permission(&user, Resource::OrdersVmi, Action::Delete),
            Err(AppError::InsufficientPermissions)
        ));
    }
}
