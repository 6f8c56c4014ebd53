//! Job repository: CRUD operations for the `jobs` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub id: String,
    pub source_url: String,
    pub normalized_url: String,
    pub platform: String,
    pub status: String,
    pub error: Option<String>,
    pub attempts: u32,
    /// JSON-encoded download result.
    pub result: Option<String>,
    pub cancel_requested: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            source_url: row.get("source_url")?,
            normalized_url: row.get("normalized_url")?,
            platform: row.get("platform")?,
            status: row.get("status")?,
            error: row.get("error")?,
            attempts: row.get("attempts")?,
            result: row.get("result")?,
            cancel_requested: row.get("cancel_requested")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a row, replacing any existing row with the same id.
pub fn upsert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, source_url, normalized_url, platform, status, error,
             attempts, result, cancel_requested, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                error = excluded.error,
                attempts = excluded.attempts,
                result = excluded.result,
                cancel_requested = excluded.cancel_requested,
                updated_at = excluded.updated_at",
            params![
                job.id,
                job.source_url,
                job.normalized_url,
                job.platform,
                job.status,
                job.error,
                job.attempts,
                job.result,
                job.cancel_requested,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Returns every job, oldest first.
pub fn list_all(db: &Database) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs ORDER BY created_at ASC, id ASC")?;
        let rows = stmt
            .query_map([], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes the given jobs in one transaction. Returns the number removed.
pub fn delete_many(db: &Database, ids: &[String]) -> Result<usize, DatabaseError> {
    if ids.is_empty() {
        return Ok(0);
    }
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM jobs WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_job(id: &str) -> JobRow {
        JobRow {
            id: id.to_string(),
            source_url: "https://www.tiktok.com/@a/video/1?lang=en".to_string(),
            normalized_url: "https://www.tiktok.com/@a/video/1".to_string(),
            platform: "tiktok".to_string(),
            status: "pending".to_string(),
            error: None,
            attempts: 0,
            result: None,
            cancel_requested: false,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        upsert(&db, &sample_job("job-1")).unwrap();

        let found = find_by_id(&db, "job-1").unwrap().unwrap();
        assert_eq!(found, sample_job("job-1"));
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_upsert_updates_mutable_fields_only() {
        let db = test_db();
        let mut job = sample_job("job-2");
        upsert(&db, &job).unwrap();

        job.status = "failed".to_string();
        job.error = Some("upstream returned HTTP 503".to_string());
        job.attempts = 3;
        job.updated_at = "2026-01-01T00:05:00Z".to_string();
        job.created_at = "2030-01-01T00:00:00Z".to_string();
        upsert(&db, &job).unwrap();

        let found = find_by_id(&db, "job-2").unwrap().unwrap();
        assert_eq!(found.status, "failed");
        assert_eq!(found.attempts, 3);
        assert_eq!(found.error.as_deref(), Some("upstream returned HTTP 503"));
        assert_eq!(found.created_at, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_list_all_oldest_first() {
        let db = test_db();
        for (id, ts) in [("b", "2026-01-02T00:00:00Z"), ("a", "2026-01-01T00:00:00Z")] {
            let mut job = sample_job(id);
            job.created_at = ts.to_string();
            upsert(&db, &job).unwrap();
        }
        let ids: Vec<String> = list_all(&db).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_delete_many_and_count() {
        let db = test_db();
        for id in ["d1", "d2", "d3"] {
            upsert(&db, &sample_job(id)).unwrap();
        }
        assert_eq!(count_by_status(&db, "pending").unwrap(), 3);

        let removed = delete_many(&db, &["d1".to_string(), "d3".to_string(), "zz".to_string()])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(count_by_status(&db, "pending").unwrap(), 1);
        assert_eq!(delete_many(&db, &[]).unwrap(), 0);
    }
}
