use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tradehub_db::models::{AdminRow, WriteOutcome, parse_timestamp};
use tradehub_types::api::{AdminResponse, Claims, CreateAdminRequest, UpdateAdminRequest};
use tradehub_types::models::{AdminRole, Role};

use crate::auth::{hash_password, validate_email, validate_password};
use crate::error::ApiError;
use crate::middleware::require_role;
use crate::{AppState, blocking, parse_uuid};

pub async fn list_admins(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;

    let rows = blocking(&state, |db| db.list_admins()).await?;
    let admins: Vec<AdminResponse> = rows.into_iter().map(admin_response).collect();
    Ok(Json(admins))
}

/// New admins are always plain ADMIN; the super admin is seeded at
/// startup and cannot be minted through this endpoint.
pub async fn create_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let password_hash = hash_password(&req.password)?;
    let admin_id = Uuid::new_v4();

    let id = admin_id.to_string();
    let outcome = blocking(&state, move |db| {
        db.create_admin(&id, &req.email, &password_hash, &req.name, "ADMIN")
    })
    .await?;
    if outcome == WriteOutcome::Conflict {
        return Err(ApiError::Conflict("email is already registered".into()));
    }

    let id = admin_id.to_string();
    let row = blocking(&state, move |db| db.get_admin(&id))
        .await?
        .ok_or(ApiError::NotFound("admin"))?;
    Ok((StatusCode::CREATED, Json(admin_response(row))))
}

pub async fn update_admin(
    State(state): State<AppState>,
    Path(admin_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    if let Some(email) = &req.email {
        validate_email(email)?;
    }
    if let Some(password) = &req.password {
        validate_password(password)?;
    }

    guard_super_admin(&state, admin_id).await?;

    let password_hash = match &req.password {
        Some(p) => Some(hash_password(p)?),
        None => None,
    };

    let id = admin_id.to_string();
    let outcome = blocking(&state, move |db| {
        db.update_admin(
            &id,
            req.email.as_deref(),
            password_hash.as_deref(),
            req.name.as_deref(),
        )
    })
    .await?;
    match outcome {
        WriteOutcome::Done => {}
        WriteOutcome::NotFound => return Err(ApiError::NotFound("admin")),
        WriteOutcome::Conflict => {
            return Err(ApiError::Conflict("email is already registered".into()));
        }
    }

    let id = admin_id.to_string();
    let row = blocking(&state, move |db| db.get_admin(&id))
        .await?
        .ok_or(ApiError::NotFound("admin"))?;
    Ok(Json(admin_response(row)))
}

pub async fn delete_admin(
    State(state): State<AppState>,
    Path(admin_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    guard_super_admin(&state, admin_id).await?;

    let id = admin_id.to_string();
    let outcome = blocking(&state, move |db| db.delete_admin(&id)).await?;
    match outcome {
        WriteOutcome::Done => Ok(StatusCode::NO_CONTENT),
        WriteOutcome::NotFound => Err(ApiError::NotFound("admin")),
        WriteOutcome::Conflict => Err(ApiError::Conflict(
            "admin still has assigned chat rooms".into(),
        )),
    }
}

/// Editing or deleting the super admin is forbidden, distinct from the
/// 404 an unknown id gets.
async fn guard_super_admin(state: &AppState, admin_id: Uuid) -> Result<(), ApiError> {
    let id = admin_id.to_string();
    let row = blocking(state, move |db| db.get_admin(&id))
        .await?
        .ok_or(ApiError::NotFound("admin"))?;
    if row.role == AdminRole::SuperAdmin.as_str() {
        return Err(ApiError::Forbidden(
            "the super admin cannot be managed through this endpoint".into(),
        ));
    }
    Ok(())
}

fn admin_response(row: AdminRow) -> AdminResponse {
    let role = AdminRole::from_str(&row.role).unwrap_or(AdminRole::Admin);
    AdminResponse {
        id: parse_uuid(&row.id, "admin"),
        email: row.email,
        name: row.name,
        role,
        created_at: parse_timestamp(&row.created_at),
    }
}
