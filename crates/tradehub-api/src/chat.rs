use std::collections::HashMap;

use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use tradehub_db::models::{ChatMessageRow, ChatRoomRow, WriteOutcome, parse_timestamp};
use tradehub_types::api::{
    ChatMessageResponse, ChatRoomResponse, Claims, EditChatMessageRequest, ReactionGroup,
    SendChatMessageRequest, ToggleReactionRequest,
};
use tradehub_types::models::{Role, RoomKind, RoomStatus};

use crate::error::ApiError;
use crate::middleware::require_role;
use crate::{AppState, blocking, parse_uuid};

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination — pass the `created_at` timestamp and id of
    /// the oldest message from the previous page to fetch older messages.
    /// The id keeps the cursor stable when several messages share a
    /// one-second timestamp.
    pub before: Option<String>,
    pub before_id: Option<Uuid>,
}

fn default_limit() -> u32 {
    50
}

// -- Rooms --

/// Seller opens (or re-opens) the room about one of their listings.
pub async fn open_product_room(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Seller)?;

    let pid = product_id.to_string();
    let product = blocking(&state, move |db| db.get_product(&pid))
        .await?
        .ok_or(ApiError::NotFound("listing"))?;
    if product.seller_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("not your listing".into()));
    }

    let seller_id = claims.sub.to_string();
    let pid = product_id.to_string();
    let room_id = Uuid::new_v4().to_string();
    let welcome_id = Uuid::new_v4().to_string();
    let (id, created) = blocking(&state, move |db| {
        let admin_id = db
            .least_loaded_admin()?
            .ok_or_else(|| anyhow!("no admin available for chat assignment"))?;
        db.ensure_seller_room(
            &room_id,
            &pid,
            &seller_id,
            &admin_id,
            &welcome_id,
            "Welcome! An admin has been assigned to help with your listing.",
        )
    })
    .await?;

    let room = blocking(&state, move |db| db.get_room(&id))
        .await?
        .ok_or(ApiError::NotFound("chat room"))?;
    Ok((open_room_status(created), Json(room_response(room))))
}

/// Buyer opens the room about one of their RFQs. Usually already created
/// by the forward action; this is the same upsert.
pub async fn open_rfq_room(
    State(state): State<AppState>,
    Path(rfq_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Buyer)?;

    let rid = rfq_id.to_string();
    let rfq = blocking(&state, move |db| db.get_rfq(&rid))
        .await?
        .ok_or(ApiError::NotFound("rfq"))?;
    if rfq.buyer_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("not your rfq".into()));
    }

    let buyer_id = claims.sub.to_string();
    let rid = rfq_id.to_string();
    let room_id = Uuid::new_v4().to_string();
    let welcome_id = Uuid::new_v4().to_string();
    let (id, created) = blocking(&state, move |db| {
        let admin_id = db
            .least_loaded_admin()?
            .ok_or_else(|| anyhow!("no admin available for chat assignment"))?;
        db.ensure_buyer_room(
            &room_id,
            &rid,
            &buyer_id,
            &admin_id,
            &welcome_id,
            "Welcome! An admin has been assigned to help with your request.",
        )
    })
    .await?;

    let room = blocking(&state, move |db| db.get_room(&id))
        .await?
        .ok_or(ApiError::NotFound("chat room"))?;
    Ok((open_room_status(created), Json(room_response(room))))
}

pub async fn list_rooms(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let sub = claims.sub.to_string();
    let role = claims.role;
    let rows = blocking(&state, move |db| match role {
        Role::Admin => db.list_rooms_for_admin(&sub),
        Role::Seller => db.list_rooms_for_seller(&sub),
        Role::Buyer => db.list_rooms_for_buyer(&sub),
    })
    .await?;
    Ok(Json(rows.into_iter().map(room_response).collect::<Vec<_>>()))
}

// -- Messages --

pub async fn room_messages(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let room = load_room_for(&state, room_id, &claims).await?;

    let limit = query.limit.min(200);
    let before = query.before;
    let before_id = query.before_id.map(|id| id.to_string());
    let rid = room.id.clone();
    let (rows, reaction_rows) = blocking(&state, move |db| {
        let rows = db.list_chat_messages(&rid, limit, before.as_deref(), before_id.as_deref())?;
        let message_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let reaction_rows = db.get_reactions_for_messages(&message_ids)?;
        Ok((rows, reaction_rows))
    })
    .await?;

    // Group reactions by message_id -> emoji -> user_ids
    let mut reaction_map: HashMap<String, HashMap<String, Vec<Uuid>>> = HashMap::new();
    for r in &reaction_rows {
        let emoji_map = reaction_map.entry(r.message_id.clone()).or_default();
        let user_ids = emoji_map.entry(r.emoji.clone()).or_default();
        if let Ok(uid) = r.user_id.parse::<Uuid>() {
            user_ids.push(uid);
        }
    }

    let messages: Vec<ChatMessageResponse> = rows
        .into_iter()
        .map(|row| {
            let reactions = reaction_map
                .get(&row.id)
                .map(|emoji_map| {
                    emoji_map
                        .iter()
                        .map(|(emoji, user_ids)| ReactionGroup {
                            emoji: emoji.clone(),
                            count: user_ids.len(),
                            user_ids: user_ids.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            message_response(row, reactions)
        })
        .collect();

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendChatMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() && req.attachment_url.is_none() {
        return Err(ApiError::Validation(
            "message needs content or an attachment".into(),
        ));
    }

    let room = load_room_for(&state, room_id, &claims).await?;
    if room.status != RoomStatus::Open.as_str() {
        return Err(ApiError::Conflict("chat room is closed".into()));
    }

    let message_id = Uuid::new_v4();
    let id = message_id.to_string();
    let rid = room.id.clone();
    let sender_id = claims.sub.to_string();
    let sender_role = claims.role;
    let outcome = blocking(&state, move |db| {
        db.insert_chat_message(
            &id,
            &rid,
            &sender_id,
            sender_role.as_str(),
            &req.content,
            req.attachment_url.as_deref(),
            req.attachment_kind.as_deref(),
        )
    })
    .await?;
    if outcome != WriteOutcome::Done {
        return Err(ApiError::NotFound("chat room"));
    }

    let id = message_id.to_string();
    let row = blocking(&state, move |db| db.get_chat_message(&id))
        .await?
        .ok_or(ApiError::NotFound("message"))?;
    Ok((StatusCode::CREATED, Json(message_response(row, vec![]))))
}

pub async fn edit_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditChatMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("content is required".into()));
    }

    let row = load_message(&state, message_id).await?;
    if row.sender_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("not your message".into()));
    }

    let id = message_id.to_string();
    let outcome = blocking(&state, move |db| db.edit_chat_message(&id, &req.content)).await?;
    match outcome {
        WriteOutcome::Done => {}
        WriteOutcome::Conflict => {
            return Err(ApiError::Conflict("message has been deleted".into()));
        }
        WriteOutcome::NotFound => return Err(ApiError::NotFound("message")),
    }

    let id = message_id.to_string();
    let row = blocking(&state, move |db| db.get_chat_message(&id))
        .await?
        .ok_or(ApiError::NotFound("message"))?;
    Ok(Json(message_response(row, vec![])))
}

/// Soft delete: the row survives with a tombstone flag. Senders can
/// delete their own messages; admins can delete anything.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = load_message(&state, message_id).await?;
    if row.sender_id != claims.sub.to_string() && claims.role != Role::Admin {
        return Err(ApiError::Forbidden("not your message".into()));
    }

    let id = message_id.to_string();
    let outcome = blocking(&state, move |db| db.soft_delete_chat_message(&id)).await?;
    match outcome {
        WriteOutcome::Done => Ok(StatusCode::NO_CONTENT),
        _ => Err(ApiError::NotFound("message")),
    }
}

pub async fn pin_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = load_message(&state, message_id).await?;
    let room_id = parse_uuid(&row.chat_room_id, "chat room");
    load_room_for(&state, room_id, &claims).await?;

    let id = message_id.to_string();
    let pinned = blocking(&state, move |db| db.toggle_pin(&id))
        .await?
        .ok_or(ApiError::NotFound("message"))?;
    Ok(Json(serde_json::json!({ "pinned": pinned })))
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.emoji.trim().is_empty() {
        return Err(ApiError::Validation("emoji is required".into()));
    }

    let row = load_message(&state, message_id).await?;
    let room_id = parse_uuid(&row.chat_room_id, "chat room");
    load_room_for(&state, room_id, &claims).await?;

    let reaction_id = Uuid::new_v4().to_string();
    let mid = message_id.to_string();
    let user_id = claims.sub.to_string();
    let (added, _id) = blocking(&state, move |db| {
        db.toggle_reaction(&reaction_id, &mid, &user_id, &req.emoji)
    })
    .await?;

    Ok(Json(serde_json::json!({ "added": added })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let room = load_room_for(&state, room_id, &claims).await?;

    let rid = room.id.clone();
    let reader = claims.sub.to_string();
    let marked = blocking(&state, move |db| db.mark_room_read(&rid, &reader)).await?;
    Ok(Json(serde_json::json!({ "marked": marked })))
}

// -- Helpers --

/// The room endpoints are upserts: 201 when this call created the room,
/// 200 when it found an existing one.
fn open_room_status(created: bool) -> StatusCode {
    if created { StatusCode::CREATED } else { StatusCode::OK }
}

/// Fetch a room and enforce participation. Admins can enter any room;
/// sellers and buyers only their own.
async fn load_room_for(
    state: &AppState,
    room_id: Uuid,
    claims: &Claims,
) -> Result<ChatRoomRow, ApiError> {
    let id = room_id.to_string();
    let room = blocking(state, move |db| db.get_room(&id))
        .await?
        .ok_or(ApiError::NotFound("chat room"))?;

    let sub = claims.sub.to_string();
    let allowed = match claims.role {
        Role::Admin => true,
        Role::Seller => room.seller_id.as_deref() == Some(sub.as_str()),
        Role::Buyer => room.buyer_id.as_deref() == Some(sub.as_str()),
    };
    if !allowed {
        return Err(ApiError::Forbidden("not a participant of this room".into()));
    }
    Ok(room)
}

async fn load_message(state: &AppState, message_id: Uuid) -> Result<ChatMessageRow, ApiError> {
    let id = message_id.to_string();
    blocking(state, move |db| db.get_chat_message(&id))
        .await?
        .ok_or(ApiError::NotFound("message"))
}

fn room_response(row: ChatRoomRow) -> ChatRoomResponse {
    let kind = RoomKind::from_str(&row.kind).unwrap_or(RoomKind::Seller);
    let status = RoomStatus::from_str(&row.status).unwrap_or(RoomStatus::Open);
    ChatRoomResponse {
        id: parse_uuid(&row.id, "chat room"),
        kind,
        status,
        product_id: row.product_id.map(|id| parse_uuid(&id, "product")),
        rfq_id: row.rfq_id.map(|id| parse_uuid(&id, "rfq")),
        seller_id: row.seller_id.map(|id| parse_uuid(&id, "seller")),
        buyer_id: row.buyer_id.map(|id| parse_uuid(&id, "buyer")),
        admin_id: parse_uuid(&row.admin_id, "admin"),
        created_at: parse_timestamp(&row.created_at),
    }
}

fn message_response(row: ChatMessageRow, reactions: Vec<ReactionGroup>) -> ChatMessageResponse {
    let sender_role = Role::from_str(&row.sender_role).unwrap_or(Role::Admin);
    ChatMessageResponse {
        id: parse_uuid(&row.id, "message"),
        chat_room_id: parse_uuid(&row.chat_room_id, "chat room"),
        sender_id: parse_uuid(&row.sender_id, "sender"),
        sender_role,
        content: if row.deleted { String::new() } else { row.content },
        attachment_url: if row.deleted { None } else { row.attachment_url },
        attachment_kind: if row.deleted { None } else { row.attachment_kind },
        read: row.read,
        deleted: row.deleted,
        pinned: row.pinned,
        created_at: parse_timestamp(&row.created_at),
        reactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_row(deleted: bool) -> ChatMessageRow {
        ChatMessageRow {
            id: Uuid::new_v4().to_string(),
            chat_room_id: Uuid::new_v4().to_string(),
            sender_id: Uuid::new_v4().to_string(),
            sender_role: "SELLER".into(),
            content: "price is firm".into(),
            attachment_url: Some("https://cdn.hub.test/quote.pdf".into()),
            attachment_kind: Some("pdf".into()),
            read: false,
            deleted,
            pinned: false,
            created_at: "2026-08-29 12:00:00".into(),
        }
    }

    #[test]
    fn deleted_message_reads_as_a_blank_tombstone() {
        let resp = message_response(message_row(true), vec![]);
        assert!(resp.deleted);
        assert_eq!(resp.content, "");
        assert_eq!(resp.attachment_url, None);
        assert_eq!(resp.attachment_kind, None);
    }

    #[test]
    fn live_message_keeps_content_and_attachment() {
        let resp = message_response(message_row(false), vec![]);
        assert!(!resp.deleted);
        assert_eq!(resp.content, "price is firm");
        assert_eq!(resp.attachment_url.as_deref(), Some("https://cdn.hub.test/quote.pdf"));
        assert_eq!(resp.attachment_kind.as_deref(), Some("pdf"));
    }

    #[test]
    fn room_upsert_status_reflects_creation() {
        assert_eq!(open_room_status(true), StatusCode::CREATED);
        assert_eq!(open_room_status(false), StatusCode::OK);
    }
}
