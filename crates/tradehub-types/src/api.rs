use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AdminRole, ListingStatus, RfqStatus, Role, RoomKind, RoomStatus};

// -- JWT Claims --

/// Bearer-token claims shared by the REST middleware and the auth
/// handlers. Canonical definition lives here in tradehub-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SellerSignupRequest {
    pub email: String,
    pub password: String,
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuyerSignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
}

// -- Accounts --

#[derive(Debug, Serialize)]
pub struct SellerResponse {
    pub id: Uuid,
    pub email: String,
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub address: String,
    pub is_approved: bool,
    pub approval_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BuyerResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAdminRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Approve carries an optional note; reject requires one. Enforced by
/// the handlers rather than by separate request types.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub note: Option<String>,
}

// -- Listings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub unit_id: Uuid,
    pub category_id: Uuid,
    pub industry_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub status: ListingStatus,
    pub review_note: Option<String>,
    pub unit: String,
    pub category: String,
    pub industry: String,
    pub created_at: DateTime<Utc>,
}

// -- RFQs --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRfqRequest {
    pub product_id: Uuid,
    pub unit_id: Uuid,
    pub quantity: i64,
    pub payment_terms: String,
    pub delivery_terms: String,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RfqResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub buyer_id: Uuid,
    pub unit_id: Uuid,
    pub quantity: i64,
    pub payment_terms: String,
    pub delivery_terms: String,
    pub note: Option<String>,
    pub status: RfqStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub rfqs_by_status: Vec<StatusCount>,
    pub listings_by_status: Vec<StatusCount>,
    pub sellers_approved: u64,
    pub sellers_pending: u64,
}

// -- Master data --

#[derive(Debug, Serialize)]
pub struct NamedEntry {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UnitEntry {
    pub id: Uuid,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct MasterDataResponse {
    pub categories: Vec<NamedEntry>,
    pub industries: Vec<NamedEntry>,
    pub units: Vec<UnitEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddNamedRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddUnitRequest {
    pub name: String,
    pub symbol: String,
}

// -- Chat --

#[derive(Debug, Serialize)]
pub struct ChatRoomResponse {
    pub id: Uuid,
    pub kind: RoomKind,
    pub status: RoomStatus,
    pub product_id: Option<Uuid>,
    pub rfq_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub admin_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendChatMessageRequest {
    pub content: String,
    pub attachment_url: Option<String>,
    pub attachment_kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditChatMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: usize,
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageResponse {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: Role,
    /// Blank for soft-deleted messages; the `deleted` flag tells the
    /// client to render a tombstone.
    pub content: String,
    pub attachment_url: Option<String>,
    pub attachment_kind: Option<String>,
    pub read: bool,
    pub deleted: bool,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<ReactionGroup>,
}
