use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use tradehub_db::models::{SellerRow, WriteOutcome, parse_timestamp};
use tradehub_types::api::{Claims, ReviewRequest, SellerResponse};
use tradehub_types::models::Role;

use crate::error::ApiError;
use crate::middleware::require_role;
use crate::{AppState, blocking, parse_uuid};

pub async fn list_sellers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;

    let rows = blocking(&state, |db| db.list_sellers()).await?;
    let sellers: Vec<SellerResponse> = rows.into_iter().map(seller_response).collect();
    Ok(Json(sellers))
}

pub async fn approve_seller(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;

    let id = seller_id.to_string();
    let outcome = blocking(&state, move |db| db.approve_seller(&id, req.note.as_deref())).await?;
    match outcome {
        WriteOutcome::Done => {}
        WriteOutcome::NotFound => return Err(ApiError::NotFound("seller")),
        WriteOutcome::Conflict => {
            return Err(ApiError::Conflict("seller is already approved".into()));
        }
    }

    let id = seller_id.to_string();
    let row = blocking(&state, move |db| db.get_seller(&id))
        .await?
        .ok_or(ApiError::NotFound("seller"))?;
    Ok(Json(seller_response(row)))
}

pub async fn reject_seller(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;

    let note = req
        .note
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("a rejection note is required".into()))?;

    let id = seller_id.to_string();
    let outcome = blocking(&state, move |db| db.reject_seller(&id, &note)).await?;
    match outcome {
        WriteOutcome::Done => {}
        _ => return Err(ApiError::NotFound("seller")),
    }

    let id = seller_id.to_string();
    let row = blocking(&state, move |db| db.get_seller(&id))
        .await?
        .ok_or(ApiError::NotFound("seller"))?;
    Ok(Json(seller_response(row)))
}

pub(crate) fn seller_response(row: SellerRow) -> SellerResponse {
    SellerResponse {
        id: parse_uuid(&row.id, "seller"),
        email: row.email,
        business_name: row.business_name,
        contact_name: row.contact_name,
        phone: row.phone,
        address: row.address,
        is_approved: row.is_approved,
        approval_note: row.approval_note,
        created_at: parse_timestamp(&row.created_at),
    }
}
