use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::error::ApiError;
use crate::{AppState, blocking};
use tradehub_types::api::Claims;
use tradehub_types::models::Role;

/// Extract and validate JWT from the Authorization header, then confirm
/// the account row still exists. A deleted account's token stops
/// working on its next request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;
    let claims = token_data.claims;

    let sub = claims.sub.to_string();
    let role = claims.role;
    let exists = blocking(&state, move |db| {
        Ok(match role {
            Role::Admin => db.get_admin(&sub)?.is_some(),
            Role::Seller => db.get_seller(&sub)?.is_some(),
            Role::Buyer => db.get_buyer(&sub)?.is_some(),
        })
    })
    .await?;
    if !exists {
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub fn require_role(claims: &Claims, role: Role) -> Result<(), ApiError> {
    if claims.role == role {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "requires {} role",
            role.as_str()
        )))
    }
}
