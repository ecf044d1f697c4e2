use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use tradehub_db::models::WriteOutcome;
use tradehub_types::api::{
    AuthResponse, BuyerSignupRequest, Claims, SellerSignupRequest, SigninRequest,
};
use tradehub_types::models::Role;

use crate::error::ApiError;
use crate::{AppState, blocking};

pub async fn seller_signup(
    State(state): State<AppState>,
    Json(req): Json<SellerSignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    if req.business_name.trim().is_empty() {
        return Err(ApiError::Validation("business_name is required".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let seller_id = Uuid::new_v4();

    let id = seller_id.to_string();
    let email = req.email.clone();
    let business_name = req.business_name.clone();
    let outcome = blocking(&state, move |db| {
        db.create_seller(
            &id,
            &req.email,
            &password_hash,
            &req.business_name,
            &req.contact_name,
            &req.phone,
            &req.address,
        )
    })
    .await?;
    if outcome == WriteOutcome::Conflict {
        return Err(ApiError::Conflict("email is already registered".into()));
    }

    let token = create_token(&state.jwt_secret, seller_id, Role::Seller, &business_name)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            id: seller_id,
            role: Role::Seller,
            name: business_name,
            email,
        }),
    ))
}

pub async fn seller_signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.clone();
    let seller = blocking(&state, move |db| db.get_seller_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    verify_password(&req.password, &seller.password)?;

    let seller_id: Uuid = seller
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt seller id: {}", e)))?;
    let token = create_token(
        &state.jwt_secret,
        seller_id,
        Role::Seller,
        &seller.business_name,
    )?;

    Ok(Json(AuthResponse {
        token,
        id: seller_id,
        role: Role::Seller,
        name: seller.business_name,
        email: seller.email,
    }))
}

pub async fn buyer_signup(
    State(state): State<AppState>,
    Json(req): Json<BuyerSignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let buyer_id = Uuid::new_v4();

    let id = buyer_id.to_string();
    let email = req.email.clone();
    let name = req.name.clone();
    let outcome = blocking(&state, move |db| {
        db.create_buyer(&id, &req.email, &password_hash, &req.name, &req.phone, &req.address)
    })
    .await?;
    if outcome == WriteOutcome::Conflict {
        return Err(ApiError::Conflict("email is already registered".into()));
    }

    let token = create_token(&state.jwt_secret, buyer_id, Role::Buyer, &name)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            id: buyer_id,
            role: Role::Buyer,
            name,
            email,
        }),
    ))
}

pub async fn buyer_signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.clone();
    let buyer = blocking(&state, move |db| db.get_buyer_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    verify_password(&req.password, &buyer.password)?;

    let buyer_id: Uuid = buyer
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt buyer id: {}", e)))?;
    let token = create_token(&state.jwt_secret, buyer_id, Role::Buyer, &buyer.name)?;

    Ok(Json(AuthResponse {
        token,
        id: buyer_id,
        role: Role::Buyer,
        name: buyer.name,
        email: buyer.email,
    }))
}

pub async fn admin_signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.clone();
    let admin = blocking(&state, move |db| db.get_admin_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    verify_password(&req.password, &admin.password)?;

    let admin_id: Uuid = admin
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt admin id: {}", e)))?;
    let token = create_token(&state.jwt_secret, admin_id, Role::Admin, &admin.name)?;

    Ok(Json(AuthResponse {
        token,
        id: admin_id,
        role: Role::Admin,
        name: admin.name,
        email: admin.email,
    }))
}

// -- Helpers --

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.len() < 3 || email.len() > 254 || !email.contains('@') {
        return Err(ApiError::Validation("invalid email address".into()));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hash failed: {}", e)))?
        .to_string();
    Ok(hash)
}

/// The plaintext from the request is always the first argument; the
/// stored hash the second.
pub(crate) fn verify_password(password: &str, stored_hash: &str) -> Result<(), ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)
}

pub(crate) fn create_token(
    secret: &str,
    sub: Uuid,
    role: Role,
    name: &str,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub,
        role,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token encode failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn password_verifies_only_the_right_plaintext() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(verify_password("wrong horse", &hash).is_err());
    }

    #[test]
    fn token_round_trips_claims() {
        let sub = Uuid::new_v4();
        let token = create_token("secret", sub, Role::Seller, "Acme Metals").unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, sub);
        assert_eq!(data.claims.role, Role::Seller);
        assert_eq!(data.claims.name, "Acme Metals");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token("secret", Uuid::new_v4(), Role::Buyer, "Pat").unwrap();
        let res = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other"),
            &Validation::default(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("jo@acme.test").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
    }
}
