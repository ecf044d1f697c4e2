use crate::Database;
use crate::models::{ChatMessageRow, ChatRoomRow, ReactionRow, WriteOutcome};
use crate::queries::{OptionalExt, is_constraint_violation};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

const ROOM_SELECT: &str = "
    SELECT id, product_id, rfq_id, seller_id, buyer_id, admin_id, kind, status, created_at
    FROM chat_rooms";

const MESSAGE_SELECT: &str = "
    SELECT id, chat_room_id, sender_id, sender_role, content, attachment_url,
           attachment_kind, read, deleted, pinned, created_at
    FROM chat_messages";

impl Database {
    // -- Rooms --

    /// Assignment policy for new rooms: the admin with the fewest OPEN
    /// rooms, ties broken by oldest account.
    pub fn least_loaded_admin(&self) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT a.id FROM admins a
                     LEFT JOIN chat_rooms c ON c.admin_id = a.id AND c.status = 'OPEN'
                     GROUP BY a.id
                     ORDER BY COUNT(c.id) ASC, a.created_at ASC
                     LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    /// Find-or-create the room for a (product, seller) pair. The partial
    /// unique index makes this an upsert: concurrent callers converge on
    /// one row, and the welcome message is seeded only by the caller
    /// whose INSERT actually landed.
    ///
    /// Returns (room id, created).
    pub fn ensure_seller_room(
        &self,
        room_id: &str,
        product_id: &str,
        seller_id: &str,
        admin_id: &str,
        welcome_id: &str,
        welcome: &str,
    ) -> Result<(String, bool)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let created = tx.execute(
                "INSERT INTO chat_rooms (id, product_id, seller_id, admin_id, kind)
                 VALUES (?1, ?2, ?3, ?4, 'SELLER')
                 ON CONFLICT(product_id, seller_id) WHERE product_id IS NOT NULL
                 DO NOTHING",
                rusqlite::params![room_id, product_id, seller_id, admin_id],
            )? == 1;
            if created {
                seed_welcome(&tx, welcome_id, room_id, admin_id, welcome)?;
            }
            let id: String = tx.query_row(
                "SELECT id FROM chat_rooms WHERE product_id = ?1 AND seller_id = ?2",
                rusqlite::params![product_id, seller_id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok((id, created))
        })
    }

    /// Find-or-create the room for an (RFQ, buyer) pair.
    pub fn ensure_buyer_room(
        &self,
        room_id: &str,
        rfq_id: &str,
        buyer_id: &str,
        admin_id: &str,
        welcome_id: &str,
        welcome: &str,
    ) -> Result<(String, bool)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let created = tx.execute(
                "INSERT INTO chat_rooms (id, rfq_id, buyer_id, admin_id, kind)
                 VALUES (?1, ?2, ?3, ?4, 'BUYER')
                 ON CONFLICT(rfq_id, buyer_id) WHERE rfq_id IS NOT NULL
                 DO NOTHING",
                rusqlite::params![room_id, rfq_id, buyer_id, admin_id],
            )? == 1;
            if created {
                seed_welcome(&tx, welcome_id, room_id, admin_id, welcome)?;
            }
            let id: String = tx.query_row(
                "SELECT id FROM chat_rooms WHERE rfq_id = ?1 AND buyer_id = ?2",
                rusqlite::params![rfq_id, buyer_id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok((id, created))
        })
    }

    pub fn get_room(&self, id: &str) -> Result<Option<ChatRoomRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ROOM_SELECT} WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_room).optional()?;
            Ok(row)
        })
    }

    pub fn list_rooms_for_admin(&self, admin_id: &str) -> Result<Vec<ChatRoomRow>> {
        self.with_conn(|conn| list_rooms(conn, "admin_id", admin_id))
    }

    pub fn list_rooms_for_seller(&self, seller_id: &str) -> Result<Vec<ChatRoomRow>> {
        self.with_conn(|conn| list_rooms(conn, "seller_id", seller_id))
    }

    pub fn list_rooms_for_buyer(&self, buyer_id: &str) -> Result<Vec<ChatRoomRow>> {
        self.with_conn(|conn| list_rooms(conn, "buyer_id", buyer_id))
    }

    // -- Messages --

    pub fn insert_chat_message(
        &self,
        id: &str,
        chat_room_id: &str,
        sender_id: &str,
        sender_role: &str,
        content: &str,
        attachment_url: Option<&str>,
        attachment_kind: Option<&str>,
    ) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO chat_messages (id, chat_room_id, sender_id, sender_role,
                                            content, attachment_url, attachment_kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    chat_room_id,
                    sender_id,
                    sender_role,
                    content,
                    attachment_url,
                    attachment_kind
                ],
            );
            match res {
                Ok(_) => Ok(WriteOutcome::Done),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_chat_message(&self, id: &str) -> Result<Option<ChatMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{MESSAGE_SELECT} WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_message).optional()?;
            Ok(row)
        })
    }

    /// Newest-first page. Cursor-based pagination: pass the `created_at`
    /// and id of the oldest message from the previous page to fetch older
    /// ones. SQLite timestamps have one-second resolution, so the id is
    /// part of the cursor to keep messages sharing a second from being
    /// skipped across page boundaries.
    pub fn list_chat_messages(
        &self,
        chat_room_id: &str,
        limit: u32,
        before: Option<&str>,
        before_id: Option<&str>,
    ) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| match (before, before_id) {
            (Some(cursor), Some(cursor_id)) => {
                let mut stmt = conn.prepare(&format!(
                    "{MESSAGE_SELECT} WHERE chat_room_id = ?1
                       AND (created_at < ?2 OR (created_at = ?2 AND id < ?3))
                     ORDER BY created_at DESC, id DESC LIMIT ?4"
                ))?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![chat_room_id, cursor, cursor_id, limit],
                        map_message,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
            (Some(cursor), None) => {
                let mut stmt = conn.prepare(&format!(
                    "{MESSAGE_SELECT} WHERE chat_room_id = ?1 AND created_at < ?2
                     ORDER BY created_at DESC, id DESC LIMIT ?3"
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![chat_room_id, cursor, limit], map_message)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
            (None, _) => {
                let mut stmt = conn.prepare(&format!(
                    "{MESSAGE_SELECT} WHERE chat_room_id = ?1
                     ORDER BY created_at DESC, id DESC LIMIT ?2"
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![chat_room_id, limit], map_message)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
        })
    }

    /// Edit in place. Soft-deleted messages cannot be edited.
    pub fn edit_chat_message(&self, id: &str, content: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE chat_messages SET content = ?2 WHERE id = ?1 AND deleted = 0",
                rusqlite::params![id, content],
            )?;
            if changed == 1 {
                return Ok(WriteOutcome::Done);
            }
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE id = ?1",
                [id],
                |row| row.get(0),
            )?;
            if exists > 0 {
                Ok(WriteOutcome::Conflict)
            } else {
                Ok(WriteOutcome::NotFound)
            }
        })
    }

    /// Soft delete: the row stays for the audit trail. Idempotent.
    pub fn soft_delete_chat_message(&self, id: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE chat_messages SET deleted = 1 WHERE id = ?1", [id])?;
            if changed == 1 {
                Ok(WriteOutcome::Done)
            } else {
                Ok(WriteOutcome::NotFound)
            }
        })
    }

    /// Toggle the pin flag. Returns the new state, or None if the
    /// message does not exist.
    pub fn toggle_pin(&self, id: &str) -> Result<Option<bool>> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("UPDATE chat_messages SET pinned = 1 - pinned WHERE id = ?1", [id])?;
            if changed == 0 {
                return Ok(None);
            }
            let pinned: bool =
                conn.query_row("SELECT pinned FROM chat_messages WHERE id = ?1", [id], |row| {
                    row.get(0)
                })?;
            Ok(Some(pinned))
        })
    }

    /// Mark everything the reader did not send as read.
    pub fn mark_room_read(&self, chat_room_id: &str, reader_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE chat_messages SET read = 1
                 WHERE chat_room_id = ?1 AND sender_id != ?2 AND read = 0",
                rusqlite::params![chat_room_id, reader_id],
            )?;
            Ok(changed)
        })
    }

    // -- Reactions --

    /// Toggle a reaction: removes if exists, inserts if not.
    /// Returns (added, Option<id>) — added=true means inserted, added=false means removed.
    pub fn toggle_reaction(
        &self,
        id: &str,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<(bool, Option<String>)> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM chat_reactions
                     WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
                    rusqlite::params![message_id, user_id, emoji],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM chat_reactions WHERE id = ?1", [&existing_id])?;
                Ok((false, Some(existing_id)))
            } else {
                conn.execute(
                    "INSERT INTO chat_reactions (id, message_id, user_id, emoji)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![id, message_id, user_id, emoji],
                )?;
                Ok((true, Some(id.to_string())))
            }
        })
    }

    /// Batch-fetch reactions for a set of message IDs.
    pub fn get_reactions_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, message_id, user_id, emoji, created_at
                 FROM chat_reactions WHERE message_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ReactionRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        user_id: row.get(2)?,
                        emoji: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn seed_welcome(
    conn: &Connection,
    id: &str,
    room_id: &str,
    admin_id: &str,
    content: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_messages (id, chat_room_id, sender_id, sender_role, content)
         VALUES (?1, ?2, ?3, 'ADMIN', ?4)",
        rusqlite::params![id, room_id, admin_id, content],
    )
    .map_err(|e| anyhow!("Failed to seed welcome message: {}", e))?;
    Ok(())
}

fn list_rooms(conn: &Connection, key: &str, value: &str) -> Result<Vec<ChatRoomRow>> {
    let mut stmt = conn.prepare(&format!(
        "{ROOM_SELECT} WHERE {key} = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt
        .query_map([value], map_room)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_room(row: &rusqlite::Row<'_>) -> std::result::Result<ChatRoomRow, rusqlite::Error> {
    Ok(ChatRoomRow {
        id: row.get(0)?,
        product_id: row.get(1)?,
        rfq_id: row.get(2)?,
        seller_id: row.get(3)?,
        buyer_id: row.get(4)?,
        admin_id: row.get(5)?,
        kind: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_message(row: &rusqlite::Row<'_>) -> std::result::Result<ChatMessageRow, rusqlite::Error> {
    Ok(ChatMessageRow {
        id: row.get(0)?,
        chat_room_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_role: row.get(3)?,
        content: row.get(4)?,
        attachment_url: row.get(5)?,
        attachment_kind: row.get(6)?,
        read: row.get(7)?,
        deleted: row.get(8)?,
        pinned: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CATCH_ALL_CATEGORY_ID, CATCH_ALL_INDUSTRY_ID, CATCH_ALL_UNIT_ID};

    fn db_with_product() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_admin("a1", "ops@hub.test", "hash", "Ops", "ADMIN").unwrap();
        db.create_seller("s1", "jo@acme.test", "hash", "Acme", "Jo", "555", "1 Forge St")
            .unwrap();
        db.insert_product(
            "p1",
            "s1",
            "Hex Bolt",
            "hex-bolt-0001",
            "M8 hex bolt",
            250,
            1000,
            CATCH_ALL_UNIT_ID,
            CATCH_ALL_CATEGORY_ID,
            CATCH_ALL_INDUSTRY_ID,
        )
        .unwrap();
        db
    }

    #[test]
    fn ensure_seller_room_is_idempotent() {
        let db = db_with_product();

        let (first, created) = db
            .ensure_seller_room("room1", "p1", "s1", "a1", "w1", "Welcome!")
            .unwrap();
        assert!(created);
        assert_eq!(first, "room1");

        // Second call with a fresh candidate id lands on the same room
        let (second, created) = db
            .ensure_seller_room("room2", "p1", "s1", "a1", "w2", "Welcome!")
            .unwrap();
        assert!(!created);
        assert_eq!(second, "room1");

        // Exactly one welcome message was seeded
        let messages = db.list_chat_messages("room1", 50, None, None).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Welcome!");
        assert_eq!(messages[0].sender_role, "ADMIN");
    }

    #[test]
    fn soft_delete_keeps_the_row() {
        let db = db_with_product();
        db.ensure_seller_room("room1", "p1", "s1", "a1", "w1", "Welcome!")
            .unwrap();
        db.insert_chat_message("m1", "room1", "s1", "SELLER", "price is firm", None, None)
            .unwrap();

        assert_eq!(db.soft_delete_chat_message("m1").unwrap(), WriteOutcome::Done);
        let row = db.get_chat_message("m1").unwrap().unwrap();
        assert!(row.deleted);
        assert_eq!(row.content, "price is firm");

        // Edits after delete are rejected
        assert_eq!(
            db.edit_chat_message("m1", "new price").unwrap(),
            WriteOutcome::Conflict
        );
    }

    #[test]
    fn reaction_toggles_on_and_off() {
        let db = db_with_product();
        db.ensure_seller_room("room1", "p1", "s1", "a1", "w1", "Welcome!")
            .unwrap();

        let (added, _) = db.toggle_reaction("x1", "w1", "s1", "👍").unwrap();
        assert!(added);
        let (added, _) = db.toggle_reaction("x2", "w1", "s1", "👍").unwrap();
        assert!(!added);
        assert!(db.get_reactions_for_messages(&["w1".into()]).unwrap().is_empty());
    }

    #[test]
    fn mark_read_skips_own_messages() {
        let db = db_with_product();
        db.ensure_seller_room("room1", "p1", "s1", "a1", "w1", "Welcome!")
            .unwrap();
        db.insert_chat_message("m1", "room1", "s1", "SELLER", "hello", None, None)
            .unwrap();

        // Seller reads: only the admin welcome flips
        assert_eq!(db.mark_room_read("room1", "s1").unwrap(), 1);
        assert!(db.get_chat_message("w1").unwrap().unwrap().read);
        assert!(!db.get_chat_message("m1").unwrap().unwrap().read);
    }

    #[test]
    fn least_loaded_admin_prefers_fewest_open_rooms() {
        let db = db_with_product();
        db.create_admin("a2", "ops2@hub.test", "hash", "Ops Two", "ADMIN").unwrap();

        // a1 takes a room; the next assignment should pick a2
        db.ensure_seller_room("room1", "p1", "s1", "a1", "w1", "Welcome!")
            .unwrap();
        assert_eq!(db.least_loaded_admin().unwrap().as_deref(), Some("a2"));
    }

    #[test]
    fn pagination_does_not_skip_messages_sharing_a_second() {
        let db = db_with_product();
        db.ensure_seller_room("room1", "p1", "s1", "a1", "w1", "Welcome!")
            .unwrap();
        for id in ["m1", "m2", "m3"] {
            db.insert_chat_message(id, "room1", "s1", "SELLER", id, None, None)
                .unwrap();
        }
        // Collapse the three onto one second, newer than the welcome
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_messages SET created_at = '2030-01-05 09:00:00' WHERE id LIKE 'm%'",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let page = db.list_chat_messages("room1", 2, None, None).unwrap();
        let ids: Vec<&str> = page.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m3", "m2"]);

        // A timestamp-only cursor would jump straight past m1 here
        let last = page.last().unwrap();
        let next = db
            .list_chat_messages("room1", 2, Some(&last.created_at), Some(&last.id))
            .unwrap();
        let ids: Vec<&str> = next.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "w1"]);
    }

    #[test]
    fn toggle_pin_round_trips() {
        let db = db_with_product();
        db.ensure_seller_room("room1", "p1", "s1", "a1", "w1", "Welcome!")
            .unwrap();

        assert_eq!(db.toggle_pin("w1").unwrap(), Some(true));
        assert_eq!(db.toggle_pin("w1").unwrap(), Some(false));
        assert_eq!(db.toggle_pin("missing").unwrap(), None);
    }
}
