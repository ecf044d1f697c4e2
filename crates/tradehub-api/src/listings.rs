use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use tradehub_db::models::{ProductRow, WriteOutcome, parse_timestamp};
use tradehub_types::api::{Claims, CreateListingRequest, ListingResponse, ReviewRequest};
use tradehub_types::models::{ListingStatus, Role};

use crate::error::ApiError;
use crate::middleware::require_role;
use crate::{AppState, blocking, parse_uuid};

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<Uuid>,
}

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Seller)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if req.price_cents <= 0 {
        return Err(ApiError::Validation("price must be positive".into()));
    }
    if req.quantity <= 0 {
        return Err(ApiError::Validation("quantity must be positive".into()));
    }

    // Listing creation is gated on approval, not sign-in
    let seller_id = claims.sub.to_string();
    let sid = seller_id.clone();
    let seller = blocking(&state, move |db| db.get_seller(&sid))
        .await?
        .ok_or(ApiError::NotFound("seller"))?;
    if !seller.is_approved {
        return Err(ApiError::Forbidden(
            "seller account is not approved yet".into(),
        ));
    }

    let product_id = Uuid::new_v4();
    let slug = slugify(&req.name, product_id);

    let id = product_id.to_string();
    let slug_arg = slug.clone();
    let outcome = blocking(&state, move |db| {
        db.insert_product(
            &id,
            &seller_id,
            &req.name,
            &slug_arg,
            &req.description,
            req.price_cents,
            req.quantity,
            &req.unit_id.to_string(),
            &req.category_id.to_string(),
            &req.industry_id.to_string(),
        )
    })
    .await?;
    if outcome == WriteOutcome::Conflict {
        // FK violation on unit/category/industry, or a slug collision
        return Err(ApiError::Validation(
            "unknown unit, category, or industry".into(),
        ));
    }

    let id = product_id.to_string();
    let row = blocking(&state, move |db| db.get_product(&id))
        .await?
        .ok_or(ApiError::NotFound("listing"))?;
    Ok((StatusCode::CREATED, Json(listing_response(row))))
}

pub async fn my_listings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Seller)?;

    let seller_id = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.list_products_by_seller(&seller_id)).await?;
    let listings: Vec<ListingResponse> = rows.into_iter().map(listing_response).collect();
    Ok(Json(listings))
}

pub async fn public_listings(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = query.category.map(|c| c.to_string());
    let rows = blocking(&state, move |db| {
        db.list_active_products(category.as_deref())
    })
    .await?;
    let listings: Vec<ListingResponse> = rows.into_iter().map(listing_response).collect();
    Ok(Json(listings))
}

pub async fn public_listing_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = blocking(&state, move |db| db.get_active_product_by_slug(&slug))
        .await?
        .ok_or(ApiError::NotFound("listing"))?;
    Ok(Json(listing_response(row)))
}

pub async fn approve_listing(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    transition(&state, product_id, "ACTIVE", None).await
}

pub async fn reject_listing(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    let note = req
        .note
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("a rejection note is required".into()))?;
    transition(&state, product_id, "REJECTED", Some(note)).await
}

/// Review transitions only apply to PENDING listings.
async fn transition(
    state: &AppState,
    product_id: Uuid,
    to: &'static str,
    note: Option<String>,
) -> Result<Json<ListingResponse>, ApiError> {
    let id = product_id.to_string();
    let outcome = blocking(state, move |db| {
        db.set_product_status(&id, "PENDING", to, note.as_deref())
    })
    .await?;
    match outcome {
        WriteOutcome::Done => {}
        WriteOutcome::NotFound => return Err(ApiError::NotFound("listing")),
        WriteOutcome::Conflict => {
            return Err(ApiError::Conflict(
                "listing has already been reviewed".into(),
            ));
        }
    }

    let id = product_id.to_string();
    let row = blocking(state, move |db| db.get_product(&id))
        .await?
        .ok_or(ApiError::NotFound("listing"))?;
    Ok(Json(listing_response(row)))
}

/// URL slug from the listing name plus a short id suffix, so identical
/// names never collide.
pub(crate) fn slugify(name: &str, id: Uuid) -> String {
    let base: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let base = base.trim_matches('-').to_string();
    let mut collapsed = String::with_capacity(base.len());
    for c in base.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }
    let suffix = &id.simple().to_string()[..8];
    if collapsed.is_empty() {
        format!("listing-{}", suffix)
    } else {
        format!("{}-{}", collapsed, suffix)
    }
}

pub(crate) fn listing_response(row: ProductRow) -> ListingResponse {
    let status = ListingStatus::from_str(&row.status).unwrap_or(ListingStatus::Pending);
    ListingResponse {
        id: parse_uuid(&row.id, "listing"),
        seller_id: parse_uuid(&row.seller_id, "seller"),
        name: row.name,
        slug: row.slug,
        description: row.description,
        price_cents: row.price_cents,
        quantity: row.quantity,
        status,
        review_note: row.review_note,
        unit: row.unit_name,
        category: row.category_name,
        industry: row.industry_name,
        created_at: parse_timestamp(&row.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_kebab_case_with_id_suffix() {
        let id = Uuid::nil();
        let slug = slugify("M8 Hex Bolt (zinc)", id);
        assert_eq!(slug, "m8-hex-bolt-zinc-00000000");
    }

    #[test]
    fn same_name_different_ids_never_collide() {
        let a = slugify("Hex Bolt", Uuid::new_v4());
        let b = slugify("Hex Bolt", Uuid::new_v4());
        assert_ne!(a, b);
    }

    #[test]
    fn degenerate_names_still_slug() {
        let slug = slugify("???", Uuid::nil());
        assert_eq!(slug, "listing-00000000");
    }
}
