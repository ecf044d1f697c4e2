use crate::Database;
use crate::models::{ProductRow, StatusCountRow, WriteOutcome};
use crate::queries::accounts::row_exists;
use crate::queries::{OptionalExt, is_constraint_violation};
use anyhow::Result;
use rusqlite::Connection;

const PRODUCT_SELECT: &str = "
    SELECT p.id, p.seller_id, p.name, p.slug, p.description, p.price_cents,
           p.quantity, p.unit_id, p.category_id, p.industry_id, p.status,
           p.review_note, p.created_at, u.name, c.name, i.name
    FROM products p
    JOIN units u ON p.unit_id = u.id
    JOIN categories c ON p.category_id = c.id
    JOIN industries i ON p.industry_id = i.id";

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_product(
        &self,
        id: &str,
        seller_id: &str,
        name: &str,
        slug: &str,
        description: &str,
        price_cents: i64,
        quantity: i64,
        unit_id: &str,
        category_id: &str,
        industry_id: &str,
    ) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO products (id, seller_id, name, slug, description, price_cents,
                                       quantity, unit_id, category_id, industry_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    id,
                    seller_id,
                    name,
                    slug,
                    description,
                    price_cents,
                    quantity,
                    unit_id,
                    category_id,
                    industry_id
                ],
            );
            match res {
                Ok(_) => Ok(WriteOutcome::Done),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_product(&self, id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{PRODUCT_SELECT} WHERE p.id = ?1"))?;
            let row = stmt.query_row([id], map_product).optional()?;
            Ok(row)
        })
    }

    pub fn get_active_product_by_slug(&self, slug: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PRODUCT_SELECT} WHERE p.slug = ?1 AND p.status = 'ACTIVE'"
            ))?;
            let row = stmt.query_row([slug], map_product).optional()?;
            Ok(row)
        })
    }

    pub fn list_products_by_seller(&self, seller_id: &str) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PRODUCT_SELECT} WHERE p.seller_id = ?1 ORDER BY p.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([seller_id], map_product)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Public catalog: ACTIVE listings only, optionally narrowed to a category.
    pub fn list_active_products(&self, category_id: Option<&str>) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| match category_id {
            Some(cat) => {
                let mut stmt = conn.prepare(&format!(
                    "{PRODUCT_SELECT} WHERE p.status = 'ACTIVE' AND p.category_id = ?1
                     ORDER BY p.created_at DESC"
                ))?;
                let rows = stmt
                    .query_map([cat], map_product)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{PRODUCT_SELECT} WHERE p.status = 'ACTIVE' ORDER BY p.created_at DESC"
                ))?;
                let rows = stmt
                    .query_map([], map_product)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
        })
    }

    /// Guarded status transition: only applies when the row is currently
    /// in `from`. Any other current status is a conflict.
    pub fn set_product_status(
        &self,
        id: &str,
        from: &str,
        to: &str,
        note: Option<&str>,
    ) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE products SET status = ?3, review_note = COALESCE(?4, review_note)
                 WHERE id = ?1 AND status = ?2",
                rusqlite::params![id, from, to, note],
            )?;
            if changed == 1 {
                return Ok(WriteOutcome::Done);
            }
            if row_exists(conn, "products", id)? {
                Ok(WriteOutcome::Conflict)
            } else {
                Ok(WriteOutcome::NotFound)
            }
        })
    }

    pub fn product_status_counts(&self) -> Result<Vec<StatusCountRow>> {
        self.with_conn(|conn| status_counts(conn, "products"))
    }
}

pub(crate) fn status_counts(conn: &Connection, table: &str) -> Result<Vec<StatusCountRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT status, COUNT(*) FROM {table} GROUP BY status ORDER BY status"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StatusCountRow {
                status: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_product(row: &rusqlite::Row<'_>) -> std::result::Result<ProductRow, rusqlite::Error> {
    Ok(ProductRow {
        id: row.get(0)?,
        seller_id: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        description: row.get(4)?,
        price_cents: row.get(5)?,
        quantity: row.get(6)?,
        unit_id: row.get(7)?,
        category_id: row.get(8)?,
        industry_id: row.get(9)?,
        status: row.get(10)?,
        review_note: row.get(11)?,
        created_at: row.get(12)?,
        unit_name: row.get(13)?,
        category_name: row.get(14)?,
        industry_name: row.get(15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CATCH_ALL_CATEGORY_ID, CATCH_ALL_INDUSTRY_ID, CATCH_ALL_UNIT_ID};

    fn listing(db: &Database, id: &str, slug: &str) -> WriteOutcome {
        db.insert_product(
            id,
            "s1",
            "Hex Bolt",
            slug,
            "M8 hex bolt",
            250,
            1000,
            CATCH_ALL_UNIT_ID,
            CATCH_ALL_CATEGORY_ID,
            CATCH_ALL_INDUSTRY_ID,
        )
        .unwrap()
    }

    fn db_with_seller() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_seller("s1", "jo@acme.test", "hash", "Acme", "Jo", "555", "1 Forge St")
            .unwrap();
        db
    }

    #[test]
    fn approve_moves_pending_to_active_once() {
        let db = db_with_seller();
        listing(&db, "p1", "hex-bolt-0001");

        assert_eq!(
            db.set_product_status("p1", "PENDING", "ACTIVE", None).unwrap(),
            WriteOutcome::Done
        );
        assert_eq!(db.get_product("p1").unwrap().unwrap().status, "ACTIVE");

        // Second approval finds the row out of PENDING
        assert_eq!(
            db.set_product_status("p1", "PENDING", "ACTIVE", None).unwrap(),
            WriteOutcome::Conflict
        );
        assert_eq!(
            db.set_product_status("missing", "PENDING", "ACTIVE", None).unwrap(),
            WriteOutcome::NotFound
        );
    }

    #[test]
    fn rejected_listing_keeps_the_note() {
        let db = db_with_seller();
        listing(&db, "p1", "hex-bolt-0001");

        db.set_product_status("p1", "PENDING", "REJECTED", Some("no datasheet"))
            .unwrap();
        let row = db.get_product("p1").unwrap().unwrap();
        assert_eq!(row.status, "REJECTED");
        assert_eq!(row.review_note.as_deref(), Some("no datasheet"));
    }

    #[test]
    fn public_catalog_only_shows_active() {
        let db = db_with_seller();
        listing(&db, "p1", "hex-bolt-0001");
        listing(&db, "p2", "hex-bolt-0002");
        db.set_product_status("p2", "PENDING", "ACTIVE", None).unwrap();

        let active = db.list_active_products(None).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "p2");

        assert!(db.get_active_product_by_slug("hex-bolt-0001").unwrap().is_none());
        assert!(db.get_active_product_by_slug("hex-bolt-0002").unwrap().is_some());
    }

    #[test]
    fn duplicate_slug_is_conflict() {
        let db = db_with_seller();
        assert_eq!(listing(&db, "p1", "hex-bolt-0001"), WriteOutcome::Done);
        assert_eq!(listing(&db, "p2", "hex-bolt-0001"), WriteOutcome::Conflict);
    }
}
