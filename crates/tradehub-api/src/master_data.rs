use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tradehub_db::models::WriteOutcome;
use tradehub_db::{CATCH_ALL_CATEGORY_ID, CATCH_ALL_INDUSTRY_ID, CATCH_ALL_UNIT_ID};
use tradehub_types::api::{
    AddNamedRequest, AddUnitRequest, Claims, MasterDataResponse, NamedEntry, RenameRequest,
    UnitEntry,
};
use tradehub_types::models::Role;

use crate::error::ApiError;
use crate::middleware::require_role;
use crate::{AppState, blocking, parse_uuid};

/// The whole lookup payload in one round trip; the storefront caches it.
pub async fn master_data(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let response = blocking(&state, |db| {
        let categories = db
            .list_categories()?
            .into_iter()
            .map(|row| NamedEntry {
                id: parse_uuid(&row.id, "category"),
                name: row.name,
            })
            .collect();
        let industries = db
            .list_industries()?
            .into_iter()
            .map(|row| NamedEntry {
                id: parse_uuid(&row.id, "industry"),
                name: row.name,
            })
            .collect();
        let units = db
            .list_units()?
            .into_iter()
            .map(|row| UnitEntry {
                id: parse_uuid(&row.id, "unit"),
                name: row.name,
                symbol: row.symbol,
            })
            .collect();
        Ok(MasterDataResponse {
            categories,
            industries,
            units,
        })
    })
    .await?;

    Ok(Json(response))
}

// -- Categories --

pub async fn add_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddNamedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    let name = required_name(req.name)?;

    let id = Uuid::new_v4();
    let id_arg = id.to_string();
    let outcome = blocking(&state, move |db| db.add_category(&id_arg, &name)).await?;
    created(outcome, "category", id)
}

pub async fn rename_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    guard_catch_all(id, CATCH_ALL_CATEGORY_ID)?;
    let name = required_name(req.name)?;

    let id_arg = id.to_string();
    let outcome = blocking(&state, move |db| db.rename_category(&id_arg, &name)).await?;
    updated(outcome, "category")
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    guard_catch_all(id, CATCH_ALL_CATEGORY_ID)?;

    let id_arg = id.to_string();
    let outcome = blocking(&state, move |db| db.delete_category(&id_arg)).await?;
    deleted(outcome, "category")
}

// -- Industries --

pub async fn add_industry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddNamedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    let name = required_name(req.name)?;

    let id = Uuid::new_v4();
    let id_arg = id.to_string();
    let outcome = blocking(&state, move |db| db.add_industry(&id_arg, &name)).await?;
    created(outcome, "industry", id)
}

pub async fn rename_industry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    guard_catch_all(id, CATCH_ALL_INDUSTRY_ID)?;
    let name = required_name(req.name)?;

    let id_arg = id.to_string();
    let outcome = blocking(&state, move |db| db.rename_industry(&id_arg, &name)).await?;
    updated(outcome, "industry")
}

pub async fn delete_industry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    guard_catch_all(id, CATCH_ALL_INDUSTRY_ID)?;

    let id_arg = id.to_string();
    let outcome = blocking(&state, move |db| db.delete_industry(&id_arg)).await?;
    deleted(outcome, "industry")
}

// -- Units --

pub async fn add_unit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddUnitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    let name = required_name(req.name)?;
    if req.symbol.trim().is_empty() {
        return Err(ApiError::Validation("symbol is required".into()));
    }

    let id = Uuid::new_v4();
    let id_arg = id.to_string();
    let outcome = blocking(&state, move |db| db.add_unit(&id_arg, &name, &req.symbol)).await?;
    created(outcome, "unit", id)
}

pub async fn rename_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddUnitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    guard_catch_all(id, CATCH_ALL_UNIT_ID)?;
    let name = required_name(req.name)?;

    let id_arg = id.to_string();
    let outcome =
        blocking(&state, move |db| db.rename_unit(&id_arg, &name, &req.symbol)).await?;
    updated(outcome, "unit")
}

pub async fn delete_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Admin)?;
    guard_catch_all(id, CATCH_ALL_UNIT_ID)?;

    let id_arg = id.to_string();
    let outcome = blocking(&state, move |db| db.delete_unit(&id_arg)).await?;
    deleted(outcome, "unit")
}

// -- Shared outcome mapping --

fn required_name(name: String) -> Result<String, ApiError> {
    let trimmed = name.trim().to_string();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    Ok(trimmed)
}

fn guard_catch_all(id: Uuid, catch_all: &str) -> Result<(), ApiError> {
    if id.to_string() == catch_all {
        return Err(ApiError::Forbidden(
            "the catch-all entry cannot be modified".into(),
        ));
    }
    Ok(())
}

fn created(
    outcome: WriteOutcome,
    what: &'static str,
    id: Uuid,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    match outcome {
        WriteOutcome::Done => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id })),
        )),
        WriteOutcome::Conflict => Err(ApiError::Conflict(format!("{what} name already exists"))),
        WriteOutcome::NotFound => Err(ApiError::NotFound(what)),
    }
}

fn updated(outcome: WriteOutcome, what: &'static str) -> Result<StatusCode, ApiError> {
    match outcome {
        WriteOutcome::Done => Ok(StatusCode::NO_CONTENT),
        WriteOutcome::Conflict => Err(ApiError::Conflict(format!("{what} name already exists"))),
        WriteOutcome::NotFound => Err(ApiError::NotFound(what)),
    }
}

fn deleted(outcome: WriteOutcome, what: &'static str) -> Result<StatusCode, ApiError> {
    match outcome {
        WriteOutcome::Done => Ok(StatusCode::NO_CONTENT),
        // The db layer also refuses catch-all deletes; reaching this arm
        // means the guard above was bypassed by a stale id.
        WriteOutcome::Conflict => Err(ApiError::Forbidden(
            "the catch-all entry cannot be deleted".into(),
        )),
        WriteOutcome::NotFound => Err(ApiError::NotFound(what)),
    }
}
