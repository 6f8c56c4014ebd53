use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::KeywordConfig;
use crate::error::KeywordError;
use crate::keywords::store::{KeywordEntry, KeywordStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub inserted: usize,
    /// Duplicates and blank inputs.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationRequest {
    pub count: usize,
    pub as_of: NaiveDate,
    /// Fill the batch with keywords still cooling down once the eligible
    /// ones run out.
    #[serde(default)]
    pub force: bool,
    /// Restrict to one category; `None` rotates across the whole pool.
    #[serde(default)]
    pub category: Option<String>,
}

impl RotationRequest {
    pub fn new(count: usize, as_of: NaiveDate) -> Self {
        Self {
            count,
            as_of,
            force: false,
            category: None,
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationResult {
    pub keywords: Vec<String>,
    /// Selected keywords that had never been used before.
    pub new_count: usize,
    pub reused_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub total: u64,
    pub by_category: BTreeMap<String, u64>,
}

/// Rotating, categorized pool of search keywords.
///
/// Seeding and rotation on the same category never interleave. Calls that
/// touch several categories take their locks in sorted order.
pub struct KeywordPool {
    store: Arc<dyn KeywordStore>,
    config: KeywordConfig,
    category_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeywordPool {
    pub fn new(store: Arc<dyn KeywordStore>, config: KeywordConfig) -> Self {
        Self {
            store,
            config,
            category_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &KeywordConfig {
        &self.config
    }

    /// Seeds the default category.
    pub fn seed<S: AsRef<str>>(&self, keywords: &[S]) -> Result<SeedReport, KeywordError> {
        let category = self.config.default_category.clone();
        self.seed_from_category(&category, keywords)
    }

    pub fn seed_from_category<S: AsRef<str>>(
        &self,
        category: &str,
        keywords: &[S],
    ) -> Result<SeedReport, KeywordError> {
        let category = normalize_category(category)?;
        let lock = self.category_lock(&category)?;
        let _guard = lock_category(&lock, &category)?;

        let mut report = SeedReport::default();
        for raw in keywords {
            match normalize_keyword(raw.as_ref()) {
                Some(keyword) if self.store.insert(&category, &keyword)? => report.inserted += 1,
                _ => report.skipped += 1,
            }
        }

        info!(
            "Seeded category '{}': {} inserted, {} skipped",
            category, report.inserted, report.skipped
        );
        Ok(report)
    }

    /// Moves up to `limit` recent search terms that aren't pooled anywhere
    /// into the history category.
    pub fn auto_seed_from_history(&self, limit: usize) -> Result<SeedReport, KeywordError> {
        let category = self.config.history_category.clone();
        let lock = self.category_lock(&category)?;
        let _guard = lock_category(&lock, &category)?;

        let terms = self.store.recent_unpooled_terms(limit)?;
        let mut report = SeedReport::default();
        for term in terms {
            match normalize_keyword(&term) {
                Some(keyword) if self.store.insert(&category, &keyword)? => report.inserted += 1,
                _ => report.skipped += 1,
            }
        }

        info!(
            "Auto-seeded {} keywords from search history into '{}'",
            report.inserted, category
        );
        Ok(report)
    }

    pub fn record_search(
        &self,
        keyword: &str,
        result_count: u64,
        at: DateTime<Utc>,
    ) -> Result<(), KeywordError> {
        let keyword = normalize_keyword(keyword)
            .ok_or_else(|| KeywordError::Validation("keyword must not be empty".to_string()))?;
        self.store.record_search(&keyword, result_count, at)
    }

    /// Picks the next batch for `as_of`.
    ///
    /// Never-used keywords come first in insertion order, then the least
    /// recently used, ties broken by insertion order. A keyword used less
    /// than `cooldown_days` before `as_of` is only picked when `force` is set
    /// and the eligible ones did not fill the batch.
    pub fn rotate(&self, request: &RotationRequest) -> Result<RotationResult, KeywordError> {
        let _span = tracing::info_span!(
            "keywords.rotate",
            count = request.count,
            as_of = %request.as_of,
            force = request.force
        )
        .entered();

        if request.count == 0 {
            return Ok(RotationResult::default());
        }

        let category = request
            .category
            .as_deref()
            .map(normalize_category)
            .transpose()?;

        let categories: Vec<String> = match &category {
            Some(c) => vec![c.clone()],
            None => self.store.category_counts()?.into_keys().collect(),
        };
        let locks = categories
            .iter()
            .map(|c| self.category_lock(c))
            .collect::<Result<Vec<_>, _>>()?;
        let _guards = locks
            .iter()
            .zip(&categories)
            .map(|(lock, c)| lock_category(lock, c))
            .collect::<Result<Vec<_>, _>>()?;

        let entries = self.store.entries(category.as_deref())?;
        let mut seqs_by_keyword: HashMap<String, Vec<i64>> = HashMap::new();
        for e in &entries {
            seqs_by_keyword
                .entry(e.keyword.clone())
                .or_default()
                .push(e.seq);
        }
        let selected = select_for_rotation(
            entries,
            request.count,
            request.as_of,
            i64::from(self.config.cooldown_days),
            request.force,
        );

        // a term pooled in several categories is used everywhere at once
        let seqs: Vec<i64> = selected
            .iter()
            .flat_map(|e| seqs_by_keyword.remove(&e.keyword).unwrap_or_default())
            .collect();
        self.store.mark_used(&seqs, request.as_of)?;

        let new_count = selected.iter().filter(|e| e.use_count == 0).count();
        let result = RotationResult {
            new_count,
            reused_count: selected.len() - new_count,
            keywords: selected.into_iter().map(|e| e.keyword).collect(),
        };

        info!(
            "Rotated {} keywords for {} ({} new, {} reused)",
            result.keywords.len(),
            request.as_of,
            result.new_count,
            result.reused_count
        );
        Ok(result)
    }

    pub fn list(&self, category: Option<&str>) -> Result<Vec<KeywordEntry>, KeywordError> {
        self.store.entries(category)
    }

    pub fn stats(&self) -> Result<PoolStats, KeywordError> {
        let by_category = self.store.category_counts()?;
        Ok(PoolStats {
            total: by_category.values().sum(),
            by_category,
        })
    }

    fn category_lock(&self, category: &str) -> Result<Arc<Mutex<()>>, KeywordError> {
        let mut locks = self
            .category_locks
            .lock()
            .map_err(|_| KeywordError::LockPoisoned(category.to_string()))?;
        Ok(locks
            .entry(category.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}

fn lock_category<'a>(
    lock: &'a Mutex<()>,
    category: &str,
) -> Result<MutexGuard<'a, ()>, KeywordError> {
    lock.lock()
        .map_err(|_| KeywordError::LockPoisoned(category.to_string()))
}

/// Pure selection step of [`KeywordPool::rotate`]. A keyword present in
/// several categories is returned once, at its first position.
fn select_for_rotation(
    mut entries: Vec<KeywordEntry>,
    count: usize,
    as_of: NaiveDate,
    cooldown_days: i64,
    force: bool,
) -> Vec<KeywordEntry> {
    // None sorts before Some, so never-used entries lead.
    entries.sort_by(|a, b| a.last_used_at.cmp(&b.last_used_at).then(a.seq.cmp(&b.seq)));
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.keyword.clone()));

    let (eligible, cooling): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| {
        e.last_used_at
            .map_or(true, |last| (as_of - last).num_days() >= cooldown_days)
    });

    let mut selected: Vec<KeywordEntry> = eligible.into_iter().take(count).collect();
    if force && selected.len() < count {
        let missing = count - selected.len();
        debug!("Forced rotation reusing {} cooling keywords", missing.min(cooling.len()));
        selected.extend(cooling.into_iter().take(missing));
    }
    selected
}

fn normalize_keyword(raw: &str) -> Option<String> {
    let keyword = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if keyword.is_empty() {
        None
    } else {
        Some(keyword)
    }
}

fn normalize_category(raw: &str) -> Result<String, KeywordError> {
    let category = raw.trim().to_lowercase();
    if category.is_empty() {
        return Err(KeywordError::Validation(
            "category must not be empty".to_string(),
        ));
    }
    Ok(category)
}
