//! Materialized document cache with single-flight synthesis
//!
//! One slot per (project, module, type). The first caller for a key installs
//! a shared synthesis future; later callers for the same snapshot attach to
//! it. Every caller waits under its own deadline. When the last waiter
//! leaves, the pending slot is dropped and the synthesis with it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use super::budget::Deadline;
use crate::error::SynthesisError;
use crate::models::metadata::{MaterializedDocument, MetadataKey};
use crate::models::project::ProjectId;
use crate::models::symbol::{Position, SymbolId};

type SynthesisOutcome = Result<Arc<MaterializedDocument>, SynthesisError>;
type SharedSynthesis = Shared<BoxFuture<'static, SynthesisOutcome>>;

enum Slot {
    Ready {
        document: Arc<MaterializedDocument>,
        last_accessed: Instant,
    },
    Pending {
        generation: u64,
        snapshot: u64,
        future: SharedSynthesis,
        waiters: usize,
    },
}

struct LocationMemo {
    key: MetadataKey,
    position: Position,
    snapshot: u64,
}

#[derive(Default)]
struct CacheState {
    slots: HashMap<MetadataKey, Slot>,
    paths: HashMap<PathBuf, MetadataKey>,
    locations: HashMap<(ProjectId, SymbolId), LocationMemo>,
    next_generation: u64,
}

impl CacheState {
    fn ready_count(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, Slot::Ready { .. }))
            .count()
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Ready { last_accessed, .. } => Some((key, *last_accessed)),
                Slot::Pending { .. } => None,
            })
            .min_by_key(|(_, accessed)| *accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.remove(&key);
            tracing::trace!("Evicted metadata document: {}", key);
        }
    }

    fn remove(&mut self, key: &MetadataKey) {
        if let Some(Slot::Ready { document, .. }) = self.slots.remove(key) {
            self.paths.remove(&document.path);
        }
        self.locations.retain(|_, memo| &memo.key != key);
    }
}

/// Thread-safe cache of synthesized documents
pub struct MetadataCache {
    state: Mutex<CacheState>,
    max_documents: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    syntheses: AtomicU64,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(crate::config::max_documents())
    }
}

impl MetadataCache {
    pub fn new(max_documents: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_documents: max_documents.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            syntheses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the document for `key` at `snapshot`, synthesizing it at most once.
    pub async fn get_or_synthesize<F>(
        &self,
        key: &MetadataKey,
        snapshot: u64,
        deadline: Deadline,
        synthesize: F,
    ) -> SynthesisOutcome
    where
        F: FnOnce() -> BoxFuture<'static, Result<MaterializedDocument, SynthesisError>>,
    {
        let (generation, future) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            match state.slots.get_mut(key) {
                Some(Slot::Ready {
                    document,
                    last_accessed,
                }) if document.snapshot == snapshot => {
                    *last_accessed = Instant::now();
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!("Metadata cache hit: {}", key);
                    return Ok(Arc::clone(document));
                }
                Some(Slot::Pending {
                    generation,
                    snapshot: pending_snapshot,
                    future,
                    waiters,
                }) if *pending_snapshot == snapshot => {
                    *waiters += 1;
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!("Joining in-flight synthesis: {}", key);
                    (*generation, future.clone())
                }
                _ => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    self.syntheses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Synthesizing metadata document: {}", key);

                    state.remove(key);
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    let future = synthesize().map(|r| r.map(Arc::new)).boxed().shared();
                    state.slots.insert(
                        key.clone(),
                        Slot::Pending {
                            generation,
                            snapshot,
                            future: future.clone(),
                            waiters: 1,
                        },
                    );
                    (generation, future)
                }
            }
        };

        let mut waiter = WaiterGuard {
            cache: self,
            key,
            generation,
            active: true,
        };
        match tokio::time::timeout_at(deadline.instant(), future).await {
            Ok(Ok(document)) => {
                waiter.active = false;
                self.promote(key, generation, &document);
                Ok(document)
            }
            Ok(Err(err)) => {
                waiter.active = false;
                self.discard(key, generation);
                Err(err)
            }
            Err(_) => Err(SynthesisError::Timeout {
                type_name: key.type_name.clone(),
                budget_ms: deadline.budget().as_millis() as u64,
            }),
        }
    }

    fn promote(&self, key: &MetadataKey, generation: u64, document: &Arc<MaterializedDocument>) {
        let mut state = self.lock();
        let pending = matches!(
            state.slots.get(key),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        );
        if !pending {
            // Already promoted by another waiter, or invalidated meanwhile.
            return;
        }
        state.slots.remove(key);
        if state.ready_count() >= self.max_documents {
            state.evict_lru();
        }
        state.paths.insert(document.path.clone(), key.clone());
        state.slots.insert(
            key.clone(),
            Slot::Ready {
                document: Arc::clone(document),
                last_accessed: Instant::now(),
            },
        );
    }

    fn discard(&self, key: &MetadataKey, generation: u64) {
        let mut state = self.lock();
        if matches!(
            state.slots.get(key),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        ) {
            state.slots.remove(key);
        }
    }

    fn leave(&self, key: &MetadataKey, generation: u64) {
        let mut state = self.lock();
        let abandoned = match state.slots.get_mut(key) {
            Some(Slot::Pending {
                generation: g,
                waiters,
                ..
            }) if *g == generation => {
                *waiters = waiters.saturating_sub(1);
                *waiters == 0
            }
            _ => false,
        };
        if abandoned {
            state.slots.remove(key);
            tracing::debug!("Synthesis abandoned by all waiters: {}", key);
        }
    }

    /// Synthesized document previously served under `path`.
    pub fn document_for_path(&self, path: &Path) -> Option<Arc<MaterializedDocument>> {
        let state = self.lock();
        let key = state.paths.get(path)?;
        match state.slots.get(key)? {
            Slot::Ready { document, .. } => Some(Arc::clone(document)),
            Slot::Pending { .. } => None,
        }
    }

    pub fn remember_location(
        &self,
        project: &ProjectId,
        symbol: &SymbolId,
        key: &MetadataKey,
        position: Position,
        snapshot: u64,
    ) {
        let mut state = self.lock();
        state.locations.insert(
            (project.clone(), symbol.clone()),
            LocationMemo {
                key: key.clone(),
                position,
                snapshot,
            },
        );
    }

    /// Location memoized for `symbol`, valid only while its document is cached for `snapshot`.
    pub fn cached_location(
        &self,
        project: &ProjectId,
        symbol: &SymbolId,
        snapshot: u64,
    ) -> Option<(Arc<MaterializedDocument>, Position)> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let memo = state.locations.get(&(project.clone(), symbol.clone()))?;
        if memo.snapshot != snapshot {
            return None;
        }
        match state.slots.get_mut(&memo.key)? {
            Slot::Ready {
                document,
                last_accessed,
            } if document.snapshot == snapshot => {
                *last_accessed = Instant::now();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some((Arc::clone(document), memo.position))
            }
            _ => None,
        }
    }

    /// Drop every document, pending synthesis and location memo of `project`.
    pub fn invalidate_project(&self, project: &ProjectId) -> usize {
        let mut guard = self.lock();
        let state = &mut *guard;
        let keys: Vec<MetadataKey> = state
            .slots
            .keys()
            .filter(|key| &key.project == project)
            .cloned()
            .collect();
        for key in &keys {
            state.remove(key);
        }
        state.locations.retain(|(owner, _), _| owner != project);
        if !keys.is_empty() {
            tracing::debug!("Invalidated {} metadata documents of {}", keys.len(), project);
        }
        keys.len()
    }

    pub fn stats(&self) -> MetadataCacheStats {
        let state = self.lock();
        let documents = state.ready_count();
        MetadataCacheStats {
            documents,
            pending: state.slots.len() - documents,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            syntheses: self.syntheses.load(Ordering::Relaxed),
        }
    }
}

struct WaiterGuard<'a> {
    cache: &'a MetadataCache,
    key: &'a MetadataKey,
    generation: u64,
    active: bool,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            self.cache.leave(self.key, self.generation);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataCacheStats {
    pub documents: usize,
    pub pending: usize,
    pub hits: u64,
    pub misses: u64,
    pub syntheses: u64,
}
