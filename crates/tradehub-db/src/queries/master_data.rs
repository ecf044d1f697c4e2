use crate::models::{NamedRow, UnitRow, WriteOutcome};
use crate::queries::is_constraint_violation;
use crate::{CATCH_ALL_CATEGORY_ID, CATCH_ALL_INDUSTRY_ID, CATCH_ALL_UNIT_ID, Database};
use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

impl Database {
    // -- Listing --

    pub fn list_categories(&self) -> Result<Vec<NamedRow>> {
        self.with_conn(|conn| list_named(conn, "categories"))
    }

    pub fn list_industries(&self) -> Result<Vec<NamedRow>> {
        self.with_conn(|conn| list_named(conn, "industries"))
    }

    pub fn list_units(&self) -> Result<Vec<UnitRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, symbol FROM units ORDER BY name ASC")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UnitRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        symbol: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Add --

    pub fn add_category(&self, id: &str, name: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            ensure_catch_all(conn, "categories", CATCH_ALL_CATEGORY_ID, "Others")?;
            insert_named(conn, "categories", id, name)
        })
    }

    pub fn add_industry(&self, id: &str, name: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            ensure_catch_all(conn, "industries", CATCH_ALL_INDUSTRY_ID, "Others")?;
            insert_named(conn, "industries", id, name)
        })
    }

    pub fn add_unit(&self, id: &str, name: &str, symbol: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO units (id, name, symbol) VALUES (?1, 'Piece', 'pc')",
                [CATCH_ALL_UNIT_ID],
            )?;
            let res = conn.execute(
                "INSERT INTO units (id, name, symbol) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, name, symbol],
            );
            match res {
                Ok(_) => Ok(WriteOutcome::Done),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    // -- Rename --
    // Catch-all protection is enforced here, not just at the handlers.

    pub fn rename_category(&self, id: &str, name: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| rename_row(conn, "categories", CATCH_ALL_CATEGORY_ID, id, name))
    }

    pub fn rename_industry(&self, id: &str, name: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| rename_row(conn, "industries", CATCH_ALL_INDUSTRY_ID, id, name))
    }

    pub fn rename_unit(&self, id: &str, name: &str, symbol: &str) -> Result<WriteOutcome> {
        self.with_conn(|conn| {
            if id == CATCH_ALL_UNIT_ID {
                return Ok(WriteOutcome::Conflict);
            }
            let res = conn.execute(
                "UPDATE units SET name = ?2, symbol = ?3 WHERE id = ?1",
                rusqlite::params![id, name, symbol],
            );
            match res {
                Ok(1) => Ok(WriteOutcome::Done),
                Ok(_) => Ok(WriteOutcome::NotFound),
                Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
                Err(e) => Err(e.into()),
            }
        })
    }

    // -- Delete --
    // One transaction: re-parent dependents onto the catch-all row, then
    // delete. The catch-all row itself is never deletable.

    pub fn delete_category(&self, id: &str) -> Result<WriteOutcome> {
        if id == CATCH_ALL_CATEGORY_ID {
            return Ok(WriteOutcome::Conflict);
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                "UPDATE products SET category_id = ?2 WHERE category_id = ?1",
                rusqlite::params![id, CATCH_ALL_CATEGORY_ID],
            )?;
            let deleted = tx.execute("DELETE FROM categories WHERE id = ?1", [id])?;
            tx.commit()?;
            if deleted == 0 {
                return Ok(WriteOutcome::NotFound);
            }
            info!("Deleted category {}, re-parented {} products", id, moved);
            Ok(WriteOutcome::Done)
        })
    }

    pub fn delete_industry(&self, id: &str) -> Result<WriteOutcome> {
        if id == CATCH_ALL_INDUSTRY_ID {
            return Ok(WriteOutcome::Conflict);
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                "UPDATE products SET industry_id = ?2 WHERE industry_id = ?1",
                rusqlite::params![id, CATCH_ALL_INDUSTRY_ID],
            )?;
            let deleted = tx.execute("DELETE FROM industries WHERE id = ?1", [id])?;
            tx.commit()?;
            if deleted == 0 {
                return Ok(WriteOutcome::NotFound);
            }
            info!("Deleted industry {}, re-parented {} products", id, moved);
            Ok(WriteOutcome::Done)
        })
    }

    /// Units are referenced by both products and RFQs; both move.
    pub fn delete_unit(&self, id: &str) -> Result<WriteOutcome> {
        if id == CATCH_ALL_UNIT_ID {
            return Ok(WriteOutcome::Conflict);
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let moved_products = tx.execute(
                "UPDATE products SET unit_id = ?2 WHERE unit_id = ?1",
                rusqlite::params![id, CATCH_ALL_UNIT_ID],
            )?;
            let moved_rfqs = tx.execute(
                "UPDATE rfqs SET unit_id = ?2 WHERE unit_id = ?1",
                rusqlite::params![id, CATCH_ALL_UNIT_ID],
            )?;
            let deleted = tx.execute("DELETE FROM units WHERE id = ?1", [id])?;
            tx.commit()?;
            if deleted == 0 {
                return Ok(WriteOutcome::NotFound);
            }
            info!(
                "Deleted unit {}, re-parented {} products and {} RFQs",
                id, moved_products, moved_rfqs
            );
            Ok(WriteOutcome::Done)
        })
    }
}

fn list_named(conn: &Connection, table: &str) -> Result<Vec<NamedRow>> {
    let mut stmt = conn.prepare(&format!("SELECT id, name FROM {table} ORDER BY name ASC"))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(NamedRow {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn ensure_catch_all(conn: &Connection, table: &str, id: &str, name: &str) -> Result<()> {
    conn.execute(
        &format!("INSERT OR IGNORE INTO {table} (id, name) VALUES (?1, ?2)"),
        rusqlite::params![id, name],
    )?;
    Ok(())
}

fn insert_named(conn: &Connection, table: &str, id: &str, name: &str) -> Result<WriteOutcome> {
    let res = conn.execute(
        &format!("INSERT INTO {table} (id, name) VALUES (?1, ?2)"),
        rusqlite::params![id, name],
    );
    match res {
        Ok(_) => Ok(WriteOutcome::Done),
        Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
        Err(e) => Err(e.into()),
    }
}

fn rename_row(
    conn: &Connection,
    table: &str,
    catch_all_id: &str,
    id: &str,
    name: &str,
) -> Result<WriteOutcome> {
    if id == catch_all_id {
        return Ok(WriteOutcome::Conflict);
    }
    let res = conn.execute(
        &format!("UPDATE {table} SET name = ?2 WHERE id = ?1"),
        rusqlite::params![id, name],
    );
    match res {
        Ok(1) => Ok(WriteOutcome::Done),
        Ok(_) => Ok(WriteOutcome::NotFound),
        Err(e) if is_constraint_violation(&e) => Ok(WriteOutcome::Conflict),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WriteOutcome;

    fn fixture(db: &Database) -> (String, String) {
        db.create_seller("s1", "jo@acme.test", "hash", "Acme", "Jo", "555", "1 Forge St")
            .unwrap();
        db.add_category("c1", "Fasteners").unwrap();
        db.insert_product(
            "p1",
            "s1",
            "Hex Bolt",
            "hex-bolt-0001",
            "M8 hex bolt",
            250,
            1000,
            CATCH_ALL_UNIT_ID,
            "c1",
            CATCH_ALL_INDUSTRY_ID,
        )
        .unwrap();
        ("c1".into(), "p1".into())
    }

    #[test]
    fn delete_reparents_products_to_catch_all() {
        let db = Database::open_in_memory().unwrap();
        let (cat, product) = fixture(&db);

        assert_eq!(db.delete_category(&cat).unwrap(), WriteOutcome::Done);

        let row = db.get_product(&product).unwrap().unwrap();
        assert_eq!(row.category_id, CATCH_ALL_CATEGORY_ID);

        // The catch-all itself is still present
        let names: Vec<String> = db
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert!(names.contains(&"Others".to_string()));
        assert!(!names.contains(&"Fasteners".to_string()));
    }

    #[test]
    fn catch_all_rows_are_protected() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            db.delete_category(CATCH_ALL_CATEGORY_ID).unwrap(),
            WriteOutcome::Conflict
        );
        assert_eq!(
            db.rename_category(CATCH_ALL_CATEGORY_ID, "Misc").unwrap(),
            WriteOutcome::Conflict
        );
        assert_eq!(
            db.delete_unit(CATCH_ALL_UNIT_ID).unwrap(),
            WriteOutcome::Conflict
        );
        assert_eq!(
            db.rename_unit(CATCH_ALL_UNIT_ID, "Each", "ea").unwrap(),
            WriteOutcome::Conflict
        );
    }

    #[test]
    fn duplicate_names_conflict() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.add_category("c1", "Fasteners").unwrap(), WriteOutcome::Done);
        assert_eq!(
            db.add_category("c2", "Fasteners").unwrap(),
            WriteOutcome::Conflict
        );
        assert_eq!(db.add_unit("u1", "Kilogram", "kg").unwrap(), WriteOutcome::Done);
        assert_eq!(
            db.add_unit("u2", "Kilogram", "kg").unwrap(),
            WriteOutcome::Conflict
        );
    }

    #[test]
    fn deleting_a_unit_moves_rfqs_too() {
        let db = Database::open_in_memory().unwrap();
        let (_, product) = fixture(&db);
        db.add_unit("u1", "Tonne", "t").unwrap();
        db.create_buyer("b1", "pat@buy.test", "hash", "Pat", "555", "2 Dock Rd")
            .unwrap();
        db.insert_rfq("r1", &product, "b1", "u1", 5, "NET30", "FOB", None)
            .unwrap();

        assert_eq!(db.delete_unit("u1").unwrap(), WriteOutcome::Done);
        let rfq = db.get_rfq("r1").unwrap().unwrap();
        assert_eq!(rfq.unit_id, CATCH_ALL_UNIT_ID);
    }
}
