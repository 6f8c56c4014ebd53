//! Keyword repository: the `keywords` table backing the rotation pool.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRow {
    /// Autoincrement id; doubles as the insertion sequence.
    pub id: i64,
    pub keyword: String,
    pub category: String,
    /// `YYYY-MM-DD` of the last rotation that picked this keyword.
    pub last_used_at: Option<String>,
    pub use_count: u32,
    pub created_at: String,
}

impl KeywordRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            keyword: row.get("keyword")?,
            category: row.get("category")?,
            last_used_at: row.get("last_used_at")?,
            use_count: row.get("use_count")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a keyword unless the category already holds it.
/// Returns `true` when a row was added.
pub fn insert_if_absent(
    db: &Database,
    category: &str,
    keyword: &str,
    created_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO keywords (keyword, category, created_at) VALUES (?1, ?2, ?3)",
            params![keyword, category, created_at],
        )?;
        Ok(changed == 1)
    })
}

/// Lists keywords in insertion order, optionally scoped to one category.
pub fn list(db: &Database, category: Option<&str>) -> Result<Vec<KeywordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let rows = match category {
            Some(category) => {
                let mut stmt =
                    conn.prepare("SELECT * FROM keywords WHERE category = ?1 ORDER BY id ASC")?;
                let rows = stmt
                    .query_map(params![category], KeywordRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM keywords ORDER BY id ASC")?;
                let rows = stmt
                    .query_map([], KeywordRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    })
}

/// Stamps the given keywords as used on `used_on` in one transaction.
pub fn mark_used(db: &Database, ids: &[i64], used_on: &str) -> Result<(), DatabaseError> {
    if ids.is_empty() {
        return Ok(());
    }
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE keywords SET last_used_at = ?2, use_count = use_count + 1 WHERE id = ?1",
            )?;
            for id in ids {
                stmt.execute(params![id, used_on])?;
            }
        }
        tx.commit()?;
        Ok(())
    })
}

/// Keyword counts per category, alphabetically.
pub fn count_by_category(db: &Database) -> Result<Vec<(String, u64)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM keywords GROUP BY category ORDER BY category ASC",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
