//! Search history: one row per executed search.

use rusqlite::params;

use super::{Database, DatabaseError};

pub fn insert(
    db: &Database,
    keyword: &str,
    result_count: u64,
    searched_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO search_history (keyword, result_count, searched_at) VALUES (?1, ?2, ?3)",
            params![keyword, result_count, searched_at],
        )?;
        Ok(())
    })
}

/// Most recently searched distinct terms that no keyword category holds yet.
pub fn recent_unpooled_terms(db: &Database, limit: usize) -> Result<Vec<String>, DatabaseError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT keyword FROM search_history
             WHERE keyword NOT IN (SELECT keyword FROM keywords)
             GROUP BY keyword
             ORDER BY MAX(id) DESC
             LIMIT ?1",
        )?;
        let terms = stmt
            .query_map(params![limit as i64], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(terms)
    })
}
