use crate::Database;
use crate::models::{RfqRow, StatusCountRow, WriteOutcome};
use crate::queries::accounts::row_exists;
use crate::queries::products::status_counts;
use crate::queries::{OptionalExt, is_constraint_violation};
use anyhow::Result;

const RFQ_SELECT: &str = "
    SELECT r.id, r.product_id, p.name, r.buyer_id, r.unit_id, r.quantity,
           r.payment_terms, r.delivery_terms, r.note, r.status, r.created_at
    FROM rfqs r
    JOIN products p ON r.product_id = p.id";

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_rfq(
        &self,
        id: &str,
        product_id: &str,
        buyer_id: &str,
        unit_id: &str,
        quantity: i64,
        payment_terms: &str,
        delivery_terms: &str,
        note: Option<&str>,
    ) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO rfqs (id, product_id, buyer_id, unit_id, quantity,
                                   payment_terms, delivery_terms, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    product_id,
                    buyer_id,
                    unit_id,
                    quantity,
                    payment_terms,
                    delivery_terms,
                    note
                ],
            );
            match res {
                Ok(_) => Ok(WriteOutcome::Done),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_rfq(&self, id: &str) -> Result<Option<RfqRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{RFQ_SELECT} WHERE r.id = ?1"))?;
            let row = stmt.query_row([id], map_rfq).optional()?;
            Ok(row)
        })
    }

    pub fn list_rfqs_by_buyer(&self, buyer_id: &str) -> Result<Vec<RfqRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{RFQ_SELECT} WHERE r.buyer_id = ?1 ORDER BY r.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([buyer_id], map_rfq)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// RFQs on a seller's products, visible once an admin has forwarded
    /// them. PENDING requests stay with the admin team.
    pub fn list_rfqs_for_seller(&self, seller_id: &str) -> Result<Vec<RfqRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{RFQ_SELECT} WHERE p.seller_id = ?1 AND r.status != 'PENDING'
                 ORDER BY r.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([seller_id], map_rfq)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_all_rfqs(&self) -> Result<Vec<RfqRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{RFQ_SELECT} ORDER BY r.created_at DESC"))?;
            let rows = stmt
                .query_map([], map_rfq)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Guarded transition, same contract as `set_product_status`.
    pub fn set_rfq_status(&self, id: &str, from: &str, to: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE rfqs SET status = ?3 WHERE id = ?1 AND status = ?2",
                rusqlite::params![id, from, to],
            )?;
            if changed == 1 {
                return Ok(WriteOutcome::Done);
            }
            if row_exists(conn, "rfqs", id)? {
                Ok(WriteOutcome::Conflict)
            } else {
                Ok(WriteOutcome::NotFound)
            }
        })
    }

    pub fn rfq_status_counts(&self) -> Result<Vec<StatusCountRow>> {
        self.with_conn(|conn| status_counts(conn, "rfqs"))
    }
}

fn map_rfq(row: &rusqlite::Row<'_>) -> std::result::Result<RfqRow, rusqlite::Error> {
    Ok(RfqRow {
        id: row.get(0)?,
        product_id: row.get(1)?,
        product_name: row.get(2)?,
        buyer_id: row.get(3)?,
        unit_id: row.get(4)?,
        quantity: row.get(5)?,
        payment_terms: row.get(6)?,
        delivery_terms: row.get(7)?,
        note: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CATCH_ALL_CATEGORY_ID, CATCH_ALL_INDUSTRY_ID, CATCH_ALL_UNIT_ID};

    fn db_with_rfq() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_seller("s1", "jo@acme.test", "hash", "Acme", "Jo", "555", "1 Forge St")
            .unwrap();
        db.create_buyer("b1", "pat@buy.test", "hash", "Pat", "555", "2 Dock Rd")
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
        db.insert_rfq("r1", "p1", "b1", CATCH_ALL_UNIT_ID, 500, "NET30", "FOB", None)
            .unwrap();
        db
    }

    #[test]
    fn forward_moves_pending_to_forwarded_and_shows_in_stats() {
        let db = db_with_rfq();

        assert_eq!(
            db.set_rfq_status("r1", "PENDING", "FORWARDED").unwrap(),
            WriteOutcome::Done
        );
        assert_eq!(db.get_rfq("r1").unwrap().unwrap().status, "FORWARDED");

        let counts = db.rfq_status_counts().unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].status, "FORWARDED");
        assert_eq!(counts[0].count, 1);
    }

    #[test]
    fn approve_requires_forwarded() {
        let db = db_with_rfq();

        // Straight to APPROVED skips review
        assert_eq!(
            db.set_rfq_status("r1", "FORWARDED", "APPROVED").unwrap(),
            WriteOutcome::Conflict
        );

        db.set_rfq_status("r1", "PENDING", "FORWARDED").unwrap();
        assert_eq!(
            db.set_rfq_status("r1", "FORWARDED", "APPROVED").unwrap(),
            WriteOutcome::Done
        );
        assert_eq!(
            db.set_rfq_status("missing", "FORWARDED", "APPROVED").unwrap(),
            WriteOutcome::NotFound
        );
    }

    #[test]
    fn seller_sees_only_forwarded_rfqs() {
        let db = db_with_rfq();
        assert!(db.list_rfqs_for_seller("s1").unwrap().is_empty());

        db.set_rfq_status("r1", "PENDING", "FORWARDED").unwrap();
        let visible = db.list_rfqs_for_seller("s1").unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].product_name, "Hex Bolt");
    }
}
