use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Reserved catch-all rows. Deleting any other category/industry/unit
/// re-parents its dependents onto these; the rows themselves can never
/// be edited or deleted.
pub const CATCH_ALL_CATEGORY_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const CATCH_ALL_INDUSTRY_ID: &str = "00000000-0000-0000-0000-000000000002";
pub const CATCH_ALL_UNIT_ID: &str = "00000000-0000-0000-0000-000000000003";

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS sellers (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            business_name   TEXT NOT NULL,
            contact_name    TEXT NOT NULL,
            phone           TEXT NOT NULL,
            address         TEXT NOT NULL,
            is_approved     INTEGER NOT NULL DEFAULT 0,
            approval_note   TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS buyers (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            name        TEXT NOT NULL,
            phone       TEXT NOT NULL,
            address     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS admins (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            name        TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'ADMIN',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS industries (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS units (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            symbol      TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS products (
            id              TEXT PRIMARY KEY,
            seller_id       TEXT NOT NULL REFERENCES sellers(id),
            name            TEXT NOT NULL,
            slug            TEXT NOT NULL UNIQUE,
            description     TEXT NOT NULL,
            price_cents     INTEGER NOT NULL,
            quantity        INTEGER NOT NULL,
            unit_id         TEXT NOT NULL REFERENCES units(id),
            category_id     TEXT NOT NULL REFERENCES categories(id),
            industry_id     TEXT NOT NULL REFERENCES industries(id),
            status          TEXT NOT NULL DEFAULT 'PENDING',
            review_note     TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_products_seller
            ON products(seller_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_products_status
            ON products(status);

        CREATE TABLE IF NOT EXISTS rfqs (
            id              TEXT PRIMARY KEY,
            product_id      TEXT NOT NULL REFERENCES products(id),
            buyer_id        TEXT NOT NULL REFERENCES buyers(id),
            unit_id         TEXT NOT NULL REFERENCES units(id),
            quantity        INTEGER NOT NULL,
            payment_terms   TEXT NOT NULL,
            delivery_terms  TEXT NOT NULL,
            note            TEXT,
            status          TEXT NOT NULL DEFAULT 'PENDING',
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_rfqs_buyer
            ON rfqs(buyer_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_rfqs_status
            ON rfqs(status);

        CREATE TABLE IF NOT EXISTS chat_rooms (
            id          TEXT PRIMARY KEY,
            product_id  TEXT REFERENCES products(id),
            rfq_id      TEXT REFERENCES rfqs(id),
            seller_id   TEXT REFERENCES sellers(id),
            buyer_id    TEXT REFERENCES buyers(id),
            admin_id    TEXT NOT NULL REFERENCES admins(id),
            kind        TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'OPEN',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One room per (product, seller) and per (rfq, buyer). Partial
        -- unique indexes make room creation an upsert instead of
        -- check-then-insert, so concurrent callers cannot duplicate a room.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_rooms_product_seller
            ON chat_rooms(product_id, seller_id) WHERE product_id IS NOT NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_rooms_rfq_buyer
            ON chat_rooms(rfq_id, buyer_id) WHERE rfq_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS chat_messages (
            id              TEXT PRIMARY KEY,
            chat_room_id    TEXT NOT NULL REFERENCES chat_rooms(id),
            sender_id       TEXT NOT NULL,
            sender_role     TEXT NOT NULL,
            content         TEXT NOT NULL,
            attachment_url  TEXT,
            attachment_kind TEXT,
            read            INTEGER NOT NULL DEFAULT 0,
            deleted         INTEGER NOT NULL DEFAULT 0,
            pinned          INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON chat_messages(chat_room_id, created_at);

        CREATE TABLE IF NOT EXISTS chat_reactions (
            id          TEXT PRIMARY KEY,
            message_id  TEXT NOT NULL REFERENCES chat_messages(id),
            user_id     TEXT NOT NULL,
            emoji       TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(message_id, user_id, emoji)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_message
            ON chat_reactions(message_id);

        -- Seed the reserved catch-all rows
        INSERT OR IGNORE INTO categories (id, name)
            VALUES ('{cat}', 'Others');
        INSERT OR IGNORE INTO industries (id, name)
            VALUES ('{ind}', 'Others');
        INSERT OR IGNORE INTO units (id, name, symbol)
            VALUES ('{unit}', 'Piece', 'pc');
        ",
        cat = CATCH_ALL_CATEGORY_ID,
        ind = CATCH_ALL_INDUSTRY_ID,
        unit = CATCH_ALL_UNIT_ID,
    ))?;

    info!("Database migrations complete");
    Ok(())
}
