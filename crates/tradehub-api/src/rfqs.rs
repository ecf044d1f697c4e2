use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tradehub_db::models::{RfqRow, WriteOutcome, parse_timestamp};
use tradehub_types::api::{Claims, CreateRfqRequest, RfqResponse, StatsResponse, StatusCount};
use tradehub_types::models::{RfqStatus, Role};

use crate::error::ApiError;
use crate::middleware::require_role;
use crate::{AppState, blocking, parse_uuid};

pub async fn create_rfq(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRfqRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Buyer)?;
    if req.quantity <= 0 {
        return Err(ApiError::Validation("quantity must be positive".into()));
    }

    // RFQs only target live listings
    let pid = req.product_id.to_string();
    let product = blocking(&state, move |db| db.get_product(&pid))
        .await?
        .ok_or(ApiError::NotFound("listing"))?;
    if product.status != "ACTIVE" {
        return Err(ApiError::Conflict("listing is not active".into()));
    }

    let rfq_id = Uuid::new_v4();
    let id = rfq_id.to_string();
    let buyer_id = claims.sub.to_string();
    let outcome = blocking(&state, move |db| {
        db.insert_rfq(
            &id,
            &req.product_id.to_string(),
            &buyer_id,
            &req.unit_id.to_string(),
            req.quantity,
            &req.payment_terms,
            &req.delivery_terms,
            req.note.as_deref(),
        )
    })
    .await?;
    if outcome == WriteOutcome::Conflict {
        return Err(ApiError::Validation("unknown unit".into()));
    }

    let id = rfq_id.to_string();
    let row = blocking(&state, move |db| db.get_rfq(&id))
        .await?
        .ok_or(ApiError::NotFound("rfq"))?;
    Ok((StatusCode::CREATED, Json(rfq_response(row))))
}

pub async fn my_rfqs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Buyer)?;

    let buyer_id = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.list_rfqs_by_buyer(&buyer_id)).await?;
    Ok(Json(rows.into_iter().map(rfq_response).collect::<Vec<_>>()))
}

pub async fn rfqs_for_seller(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Seller)?;

    let seller_id = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.list_rfqs_for_seller(&seller_id)).await?;
    Ok(Json(rows.into_iter().map(rfq_response).collect::<Vec<_>>()))
}

pub async fn all_rfqs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;

    let rows = blocking(&state, |db| db.list_all_rfqs()).await?;
    Ok(Json(rows.into_iter().map(rfq_response).collect::<Vec<_>>()))
}

/// Forwarding hands the RFQ to the seller and opens the buyer's chat
/// room with the assigned admin.
pub async fn forward_rfq(
    State(state): State<AppState>,
    Path(rfq_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;

    let id = rfq_id.to_string();
    let outcome =
        blocking(&state, move |db| db.set_rfq_status(&id, "PENDING", "FORWARDED")).await?;
    match outcome {
        WriteOutcome::Done => {}
        WriteOutcome::NotFound => return Err(ApiError::NotFound("rfq")),
        WriteOutcome::Conflict => {
            return Err(ApiError::Conflict("rfq is not pending".into()));
        }
    }

    let id = rfq_id.to_string();
    let row = blocking(&state, move |db| db.get_rfq(&id))
        .await?
        .ok_or(ApiError::NotFound("rfq"))?;

    // Room creation is an upsert, so re-forward attempts cannot duplicate it
    let rfq = rfq_id.to_string();
    let buyer = row.buyer_id.clone();
    let room_id = Uuid::new_v4().to_string();
    let welcome_id = Uuid::new_v4().to_string();
    blocking(&state, move |db| {
        let admin_id = db
            .least_loaded_admin()?
            .ok_or_else(|| anyhow!("no admin available for chat assignment"))?;
        db.ensure_buyer_room(
            &room_id,
            &rfq,
            &buyer,
            &admin_id,
            &welcome_id,
            "Your request has been forwarded to the seller. We'll keep you posted here.",
        )
    })
    .await?;

    Ok(Json(rfq_response(row)))
}

pub async fn approve_rfq(
    State(state): State<AppState>,
    Path(rfq_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    transition(&state, rfq_id, "FORWARDED", "APPROVED", "rfq has not been forwarded").await
}

pub async fn reject_rfq(
    State(state): State<AppState>,
    Path(rfq_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    transition(&state, rfq_id, "FORWARDED", "REJECTED", "rfq has not been forwarded").await
}

pub async fn close_rfq(
    State(state): State<AppState>,
    Path(rfq_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    transition(&state, rfq_id, "APPROVED", "CLOSED", "only approved rfqs can be closed").await
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;

    let response = blocking(&state, |db| {
        let rfqs = db.rfq_status_counts()?;
        let listings = db.product_status_counts()?;
        let (approved, pending) = db.count_sellers_by_approval()?;
        Ok(StatsResponse {
            rfqs_by_status: rfqs
                .into_iter()
                .map(|c| StatusCount {
                    status: c.status,
                    count: c.count,
                })
                .collect(),
            listings_by_status: listings
                .into_iter()
                .map(|c| StatusCount {
                    status: c.status,
                    count: c.count,
                })
                .collect(),
            sellers_approved: approved,
            sellers_pending: pending,
        })
    })
    .await?;

    Ok(Json(response))
}

async fn transition(
    state: &AppState,
    rfq_id: Uuid,
    from: &'static str,
    to: &'static str,
    conflict_msg: &'static str,
) -> Result<Json<RfqResponse>, ApiError> {
    let id = rfq_id.to_string();
    let outcome = blocking(state, move |db| db.set_rfq_status(&id, from, to)).await?;
    match outcome {
        WriteOutcome::Done => {}
        WriteOutcome::NotFound => return Err(ApiError::NotFound("rfq")),
        WriteOutcome::Conflict => return Err(ApiError::Conflict(conflict_msg.into())),
    }

    let id = rfq_id.to_string();
    let row = blocking(state, move |db| db.get_rfq(&id))
        .await?
        .ok_or(ApiError::NotFound("rfq"))?;
    Ok(Json(rfq_response(row)))
}

fn rfq_response(row: RfqRow) -> RfqResponse {
    let status = RfqStatus::from_str(&row.status).unwrap_or(RfqStatus::Pending);
    RfqResponse {
        id: parse_uuid(&row.id, "rfq"),
        product_id: parse_uuid(&row.product_id, "product"),
        product_name: row.product_name,
        buyer_id: parse_uuid(&row.buyer_id, "buyer"),
        unit_id: parse_uuid(&row.unit_id, "unit"),
        quantity: row.quantity,
        payment_terms: row.payment_terms,
        delivery_terms: row.delivery_terms,
        note: row.note,
        status,
        created_at: parse_timestamp(&row.created_at),
    }
}
