//! Shared helpers for clipharvest integration tests.
//!
//! - `fakes`: scripted downloader, resolver and fetcher doubles
//! - `builders`: fluent builders for queue configs and candidates
//! - `http_stub`: canned HTTP responses for the reqwest clients

#![allow(dead_code)]

pub mod builders;
pub mod fakes;
pub mod http_stub;

use std::time::Duration;

use clipharvest::{Job, JobQueue};

pub use builders::*;
pub use fakes::*;
pub use http_stub::StubServer;

/// Polls until the job reaches a terminal status.
pub async fn wait_for_terminal(queue: &JobQueue, id: &str) -> Job {
    wait_until(|| queue.get_job(id).filter(|j| j.is_terminal()))
        .await
        .unwrap_or_else(|| panic!("job {} did not finish in time", id))
}

/// Polls `check` every 10ms for up to five seconds.
pub async fn wait_until<T>(mut check: impl FnMut() -> Option<T>) -> Option<T> {
    for _ in 0..500 {
        if let Some(value) = check() {
            return Some(value);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}
