//! Database row types — these map directly to SQLite rows.
//! Distinct from tradehub-types API models to keep the DB layer independent.

use chrono::{DateTime, Utc};
use tracing::warn;

pub struct SellerRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub address: String,
    pub is_approved: bool,
    pub approval_note: Option<String>,
    pub created_at: String,
}

pub struct BuyerRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub created_at: String,
}

pub struct AdminRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub created_at: String,
}

pub struct NamedRow {
    pub id: String,
    pub name: String,
}

pub struct UnitRow {
    pub id: String,
    pub name: String,
    pub symbol: String,
}

pub struct ProductRow {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub unit_id: String,
    pub category_id: String,
    pub industry_id: String,
    pub status: String,
    pub review_note: Option<String>,
    pub created_at: String,
    /// Joined lookup names, present on list/detail queries.
    pub unit_name: String,
    pub category_name: String,
    pub industry_name: String,
}

pub struct RfqRow {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub buyer_id: String,
    pub unit_id: String,
    pub quantity: i64,
    pub payment_terms: String,
    pub delivery_terms: String,
    pub note: Option<String>,
    pub status: String,
    pub created_at: String,
}

pub struct ChatRoomRow {
    pub id: String,
    pub product_id: Option<String>,
    pub rfq_id: Option<String>,
    pub seller_id: Option<String>,
    pub buyer_id: Option<String>,
    pub admin_id: String,
    pub kind: String,
    pub status: String,
    pub created_at: String,
}

pub struct ChatMessageRow {
    pub id: String,
    pub chat_room_id: String,
    pub sender_id: String,
    pub sender_role: String,
    pub content: String,
    pub attachment_url: Option<String>,
    pub attachment_kind: Option<String>,
    pub read: bool,
    pub deleted: bool,
    pub pinned: bool,
    pub created_at: String,
}

pub struct ReactionRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: String,
}

pub struct StatusCountRow {
    pub status: String,
    pub count: u64,
}

/// Result of a conditional write where the caller needs to distinguish
/// a missing row from a row in the wrong state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Done,
    NotFound,
    Conflict,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse RFC 3339 first, then fall back to naive UTC.
pub fn parse_timestamp(s: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", s, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_datetime_format() {
        let ts = parse_timestamp("2026-08-29 12:34:56");
        assert_eq!(ts.to_rfc3339(), "2026-08-29T12:34:56+00:00");
    }

    #[test]
    fn parses_rfc3339() {
        let ts = parse_timestamp("2026-08-29T12:34:56Z");
        assert_eq!(ts, parse_timestamp("2026-08-29 12:34:56"));
    }
}
