use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{history_repo, keyword_repo, Database, DatabaseError};
use crate::error::KeywordError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordEntry {
    /// Insertion sequence, used to break recency ties.
    pub seq: i64,
    pub keyword: String,
    pub category: String,
    pub last_used_at: Option<NaiveDate>,
    pub use_count: u32,
}

/// Backing storage for the keyword pool and the search history it seeds from.
pub trait KeywordStore: Send + Sync {
    /// Entries in insertion order, optionally scoped to one category.
    fn entries(&self, category: Option<&str>) -> Result<Vec<KeywordEntry>, KeywordError>;

    /// Returns `true` when the keyword was new to the category.
    fn insert(&self, category: &str, keyword: &str) -> Result<bool, KeywordError>;

    /// Sets `last_used_at = on` and bumps `use_count` for every listed entry.
    fn mark_used(&self, seqs: &[i64], on: NaiveDate) -> Result<(), KeywordError>;

    fn record_search(
        &self,
        keyword: &str,
        result_count: u64,
        at: DateTime<Utc>,
    ) -> Result<(), KeywordError>;

    /// Up to `limit` most recent distinct searched terms not held by any category.
    fn recent_unpooled_terms(&self, limit: usize) -> Result<Vec<String>, KeywordError>;

    fn category_counts(&self) -> Result<BTreeMap<String, u64>, KeywordError>;
}

impl KeywordStore for Database {
    fn entries(&self, category: Option<&str>) -> Result<Vec<KeywordEntry>, KeywordError> {
        keyword_repo::list(self, category)?
            .into_iter()
            .map(|row| -> Result<KeywordEntry, KeywordError> {
                let last_used_at = row
                    .last_used_at
                    .as_deref()
                    .map(|s| {
                        NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| {
                            DatabaseError::CorruptRow {
                                table: "keywords",
                                reason: format!("bad last_used_at '{}': {}", s, e),
                            }
                        })
                    })
                    .transpose()?;
                Ok(KeywordEntry {
                    seq: row.id,
                    keyword: row.keyword,
                    category: row.category,
                    last_used_at,
                    use_count: row.use_count,
                })
            })
            .collect()
    }

    fn insert(&self, category: &str, keyword: &str) -> Result<bool, KeywordError> {
        let now = Utc::now().to_rfc3339();
        Ok(keyword_repo::insert_if_absent(self, category, keyword, &now)?)
    }

    fn mark_used(&self, seqs: &[i64], on: NaiveDate) -> Result<(), KeywordError> {
        let date = on.format(DATE_FORMAT).to_string();
        Ok(keyword_repo::mark_used(self, seqs, &date)?)
    }

    fn record_search(
        &self,
        keyword: &str,
        result_count: u64,
        at: DateTime<Utc>,
    ) -> Result<(), KeywordError> {
        Ok(history_repo::insert(self, keyword, result_count, &at.to_rfc3339())?)
    }

    fn recent_unpooled_terms(&self, limit: usize) -> Result<Vec<String>, KeywordError> {
        Ok(history_repo::recent_unpooled_terms(self, limit)?)
    }

    fn category_counts(&self) -> Result<BTreeMap<String, u64>, KeywordError> {
        Ok(keyword_repo::count_by_category(self)?.into_iter().collect())
    }
}

/// Process-local store for tests and deployments without a database file.
#[derive(Default)]
pub struct InMemoryKeywordStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_seq: i64,
    entries: Vec<KeywordEntry>,
    /// (keyword, result_count), oldest first.
    history: Vec<(String, u64)>,
}

impl InMemoryKeywordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, KeywordError> {
        self.inner
            .lock()
            .map_err(|_| KeywordError::LockPoisoned("<store>".to_string()))
    }
}

impl KeywordStore for InMemoryKeywordStore {
    fn entries(&self, category: Option<&str>) -> Result<Vec<KeywordEntry>, KeywordError> {
        let state = self.lock()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| category.map_or(true, |c| e.category == c))
            .cloned()
            .collect())
    }

    fn insert(&self, category: &str, keyword: &str) -> Result<bool, KeywordError> {
        let mut state = self.lock()?;
        if state
            .entries
            .iter()
            .any(|e| e.category == category && e.keyword == keyword)
        {
            return Ok(false);
        }
        state.next_seq += 1;
        let seq = state.next_seq;
        state.entries.push(KeywordEntry {
            seq,
            keyword: keyword.to_string(),
            category: category.to_string(),
            last_used_at: None,
            use_count: 0,
        });
        Ok(true)
    }

    fn mark_used(&self, seqs: &[i64], on: NaiveDate) -> Result<(), KeywordError> {
        let mut state = self.lock()?;
        for entry in state.entries.iter_mut().filter(|e| seqs.contains(&e.seq)) {
            entry.last_used_at = Some(on);
            entry.use_count += 1;
        }
        Ok(())
    }

    fn record_search(
        &self,
        keyword: &str,
        result_count: u64,
        _at: DateTime<Utc>,
    ) -> Result<(), KeywordError> {
        self.lock()?
            .history
            .push((keyword.to_string(), result_count));
        Ok(())
    }

    fn recent_unpooled_terms(&self, limit: usize) -> Result<Vec<String>, KeywordError> {
        let state = self.lock()?;
        let mut terms: Vec<String> = Vec::new();
        for (keyword, _) in state.history.iter().rev() {
            if terms.len() >= limit {
                break;
            }
            if terms.contains(keyword) || state.entries.iter().any(|e| &e.keyword == keyword) {
                continue;
            }
            terms.push(keyword.clone());
        }
        Ok(terms)
    }

    fn category_counts(&self) -> Result<BTreeMap<String, u64>, KeywordError> {
        let state = self.lock()?;
        let mut counts = BTreeMap::new();
        for entry in &state.entries {
            *counts.entry(entry.category.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
