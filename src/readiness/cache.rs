//! Item-level homologation status cache
//!
//! Keyed by normalized name and item kind. Last write wins per key and
//! writing the same pair twice is a no-op, so concurrent lookups can land in
//! any order.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::catalog::{HomologationLookup, ItemKind};
use crate::error::LookupError;
use crate::matching::NormalizedKey;

pub type StatusKey = (NormalizedKey, ItemKind);

/// Resolved homologation answers for the current session
pub struct StatusCache {
    statuses: Arc<RwLock<HashMap<StatusKey, bool>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self {
            statuses: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &NormalizedKey, kind: ItemKind) -> Option<bool> {
        let statuses = self.statuses.read().await;
        statuses.get(&(key.clone(), kind)).copied()
    }

    pub async fn set(&self, key: NormalizedKey, kind: ItemKind, homologated: bool) {
        let mut statuses = self.statuses.write().await;
        statuses.insert((key, kind), homologated);
    }

    /// Answers for many keys under one read lock; unresolved keys are absent
    pub async fn get_many(&self, keys: &[StatusKey]) -> HashMap<StatusKey, bool> {
        let statuses = self.statuses.read().await;
        keys.iter()
            .filter_map(|k| statuses.get(k).map(|&v| (k.clone(), v)))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.statuses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.statuses.read().await.is_empty()
    }

    /// Drop a single answer so the next recompute asks again
    pub async fn invalidate(&self, key: &NormalizedKey, kind: ItemKind) {
        let mut statuses = self.statuses.write().await;
        statuses.remove(&(key.clone(), kind));
    }

    pub async fn clear(&self) {
        let mut statuses = self.statuses.write().await;
        statuses.clear();
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Lookup that wraps another lookup with the status cache.
///
/// Only definite answers are cached. Pending answers and errors pass
/// through uncached so they are asked again next time.
pub struct CachedLookup {
    inner: Arc<dyn HomologationLookup>,
    cache: Arc<StatusCache>,
}

impl CachedLookup {
    pub fn new(inner: Arc<dyn HomologationLookup>, cache: Arc<StatusCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }
}

#[async_trait]
impl HomologationLookup for CachedLookup {
    async fn lookup(&self, key: &NormalizedKey, kind: ItemKind) -> Result<Option<bool>, LookupError> {
        if let Some(cached) = self.cache.get(key, kind).await {
            debug!("Homologation cache hit for {} ({})", key, kind.as_str());
            return Ok(Some(cached));
        }

        let answer = self.inner.lookup(key, kind).await?;
        if let Some(homologated) = answer {
            self.cache.set(key.clone(), kind, homologated).await;
        }
        Ok(answer)
    }
}
