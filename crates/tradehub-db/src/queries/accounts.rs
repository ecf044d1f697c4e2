use crate::Database;
use crate::models::{AdminRow, BuyerRow, SellerRow, WriteOutcome};
use crate::queries::{OptionalExt, is_constraint_violation};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Sellers --

    pub fn create_seller(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        business_name: &str,
        contact_name: &str,
        phone: &str,
        address: &str,
    ) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO sellers (id, email, password, business_name, contact_name, phone, address)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, email, password_hash, business_name, contact_name, phone, address],
            );
            match res {
                Ok(_) => Ok(WriteOutcome::Done),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_seller_by_email(&self, email: &str) -> Result<Option<SellerRow>> {
        self.with_conn(|conn| query_seller(conn, "email", email))
    }

    pub fn get_seller(&self, id: &str) -> Result<Option<SellerRow>> {
        self.with_conn(|conn| query_seller(conn, "id", id))
    }

    pub fn list_sellers(&self) -> Result<Vec<SellerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELLER_COLS} FROM sellers ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([], map_seller)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flip `is_approved` exactly once. A second approval is a conflict.
    pub fn approve_seller(&self, id: &str, note: Option<&str>) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE sellers SET is_approved = 1, approval_note = ?2
                 WHERE id = ?1 AND is_approved = 0",
                rusqlite::params![id, note],
            )?;
            if changed == 1 {
                return Ok(WriteOutcome::Done);
            }
            if row_exists(conn, "sellers", id)? {
                Ok(WriteOutcome::Conflict)
            } else {
                Ok(WriteOutcome::NotFound)
            }
        })
    }

    pub fn reject_seller(&self, id: &str, note: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE sellers SET is_approved = 0, approval_note = ?2 WHERE id = ?1",
                rusqlite::params![id, note],
            )?;
            if changed == 1 {
                Ok(WriteOutcome::Done)
            } else {
                Ok(WriteOutcome::NotFound)
            }
        })
    }

    pub fn count_sellers_by_approval(&self) -> Result<(u64, u64)> {
        self.with_conn(|conn| {
            let approved: u64 = conn.query_row(
                "SELECT COUNT(*) FROM sellers WHERE is_approved = 1",
                [],
                |row| row.get(0),
            )?;
            let pending: u64 = conn.query_row(
                "SELECT COUNT(*) FROM sellers WHERE is_approved = 0",
                [],
                |row| row.get(0),
            )?;
            Ok((approved, pending))
        })
    }

    // -- Buyers --

    pub fn create_buyer(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        name: &str,
        phone: &str,
        address: &str,
    ) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO buyers (id, email, password, name, phone, address)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, email, password_hash, name, phone, address],
            );
            match res {
                Ok(_) => Ok(WriteOutcome::Done),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_buyer_by_email(&self, email: &str) -> Result<Option<BuyerRow>> {
        self.with_conn(|conn| query_buyer(conn, "email", email))
    }

    pub fn get_buyer(&self, id: &str) -> Result<Option<BuyerRow>> {
        self.with_conn(|conn| query_buyer(conn, "id", id))
    }

    // -- Admins --

    pub fn create_admin(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        name: &str,
        role: &str,
    ) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "INSERT INTO admins (id, email, password, name, role)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, email, password_hash, name, role],
            );
            match res {
                Ok(_) => Ok(WriteOutcome::Done),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Idempotent super-admin seed, keyed on the unique email.
    pub fn ensure_super_admin(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO admins (id, email, password, name, role)
                 VALUES (?1, ?2, ?3, ?4, 'SUPER_ADMIN')",
                rusqlite::params![id, email, password_hash, name],
            )?;
            Ok(())
        })
    }

    pub fn get_admin_by_email(&self, email: &str) -> Result<Option<AdminRow>> {
        self.with_conn(|conn| query_admin(conn, "email", email))
    }

    pub fn get_admin(&self, id: &str) -> Result<Option<AdminRow>> {
        self.with_conn(|conn| query_admin(conn, "id", id))
    }

    pub fn list_admins(&self) -> Result<Vec<AdminRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, password, name, role, created_at
                 FROM admins ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map([], map_admin)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Partial update; untouched fields keep their value. The caller has
    /// already rejected edits to the super admin.
    pub fn update_admin(
        &self,
        id: &str,
        email: Option<&str>,
        password_hash: Option<&str>,
        name: Option<&str>,
    ) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "UPDATE admins SET
                     email = COALESCE(?2, email),
                     password = COALESCE(?3, password),
                     name = COALESCE(?4, name)
                 WHERE id = ?1 AND role != 'SUPER_ADMIN'",
                rusqlite::params![id, email, password_hash, name],
            );
            match res {
                Ok(1) => Ok(WriteOutcome::Done),
                Ok(_) => Ok(WriteOutcome::NotFound),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn delete_admin(&self, id: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            let res = conn.execute(
                "DELETE FROM admins WHERE id = ?1 AND role != 'SUPER_ADMIN'",
                [id],
            );
            match res {
                Ok(1) => Ok(WriteOutcome::Done),
                Ok(_) => Ok(WriteOutcome::NotFound),
                // Admins with assigned chat rooms keep their row.
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }
}

const SELLER_COLS: &str = "id, email, password, business_name, contact_name, phone, address, is_approved, approval_note, created_at";

fn map_seller(row: &rusqlite::Row<'_>) -> std::result::Result<SellerRow, rusqlite::Error> {
    Ok(SellerRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        business_name: row.get(3)?,
        contact_name: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        is_approved: row.get(7)?,
        approval_note: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn map_admin(row: &rusqlite::Row<'_>) -> std::result::Result<AdminRow, rusqlite::Error> {
    Ok(AdminRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        name: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_seller(conn: &Connection, key: &str, value: &str) -> Result<Option<SellerRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELLER_COLS} FROM sellers WHERE {key} = ?1"
    ))?;
    let row = stmt.query_row([value], map_seller).optional()?;
    Ok(row)
}

fn query_buyer(conn: &Connection, key: &str, value: &str) -> Result<Option<BuyerRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, email, password, name, phone, address, created_at
         FROM buyers WHERE {key} = ?1"
    ))?;
    let row = stmt
        .query_row([value], |row| {
            Ok(BuyerRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                name: row.get(3)?,
                phone: row.get(4)?,
                address: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_admin(conn: &Connection, key: &str, value: &str) -> Result<Option<AdminRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, email, password, name, role, created_at
         FROM admins WHERE {key} = ?1"
    ))?;
    let row = stmt.query_row([value], map_admin).optional()?;
    Ok(row)
}

pub(crate) fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"),
        [id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seller(db: &Database, id: &str, email: &str) -> WriteOutcome {
        db.create_seller(id, email, "hash", "Acme Metals", "Jo Vend", "555-0100", "1 Forge St")
            .unwrap()
    }

    #[test]
    fn duplicate_seller_email_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(seller(&db, "s1", "jo@acme.test"), WriteOutcome::Done);
        assert_eq!(seller(&db, "s2", "jo@acme.test"), WriteOutcome::Conflict);

        // No second row was created
        let all = db.list_sellers().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "s1");
    }

    #[test]
    fn approving_twice_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        seller(&db, "s1", "jo@acme.test");

        assert_eq!(
            db.approve_seller("s1", Some("docs verified")).unwrap(),
            WriteOutcome::Done
        );
        let row = db.get_seller("s1").unwrap().unwrap();
        assert!(row.is_approved);
        assert_eq!(row.approval_note.as_deref(), Some("docs verified"));

        assert_eq!(db.approve_seller("s1", None).unwrap(), WriteOutcome::Conflict);
        assert_eq!(db.approve_seller("nope", None).unwrap(), WriteOutcome::NotFound);
    }

    #[test]
    fn super_admin_is_shielded_from_management() {
        let db = Database::open_in_memory().unwrap();
        db.ensure_super_admin("a0", "root@hub.test", "hash", "Root").unwrap();
        // Second seed with a different id is a no-op
        db.ensure_super_admin("a9", "root@hub.test", "other", "Root").unwrap();
        assert_eq!(db.list_admins().unwrap().len(), 1);

        assert_eq!(
            db.update_admin("a0", None, None, Some("Hax")).unwrap(),
            WriteOutcome::NotFound
        );
        assert_eq!(db.delete_admin("a0").unwrap(), WriteOutcome::NotFound);
        assert_eq!(db.get_admin("a0").unwrap().unwrap().name, "Root");
    }

    #[test]
    fn admin_update_is_partial() {
        let db = Database::open_in_memory().unwrap();
        db.create_admin("a1", "ops@hub.test", "hash", "Ops", "ADMIN").unwrap();
        assert_eq!(
            db.update_admin("a1", None, None, Some("Ops Two")).unwrap(),
            WriteOutcome::Done
        );
        let row = db.get_admin("a1").unwrap().unwrap();
        assert_eq!(row.name, "Ops Two");
        assert_eq!(row.email, "ops@hub.test");
    }
}
