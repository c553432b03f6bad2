use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use tutor_core::Clock;
use tutor_core::model::{LessonState, LessonStateError, LessonUpdate, SessionId};

/// Errors surfaced by session storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("session not found")]
    NotFound,

    #[error(transparent)]
    InvalidUpdate(#[from] LessonStateError),

    #[error("connection error: {0}")]
    Connection(String),
}

/// How the store bounds the lifetime of idle sessions.
///
/// The default keeps every session for the life of the process; the other
/// variants bound the map for long-running deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Keep every session until the process exits.
    #[default]
    None,
    /// Keep at most this many sessions, dropping the least recently touched.
    Capacity(usize),
    /// Drop sessions idle for longer than this window.
    IdleTtl(Duration),
}

/// Repository contract for lesson sessions.
///
/// Every operation is atomic with respect to a single session id. The store
/// performs no cross-call locking: callers must serialize start/answer/resume
/// events per session (the channel adapter does).
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a fresh session state, replacing any previous attempt.
    ///
    /// A new lesson for a known user resets that user's prior state; there
    /// is no separate delete operation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be stored.
    async fn create(&self, id: SessionId, state: LessonState) -> Result<(), StorageError>;

    /// Fetch the current snapshot for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get(&self, id: SessionId) -> Result<LessonState, StorageError>;

    /// Merge a partial update and return the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or
    /// `StorageError::InvalidUpdate` if the merge violates a state invariant
    /// (in which case the stored state is unchanged).
    async fn apply_update(
        &self,
        id: SessionId,
        update: LessonUpdate,
    ) -> Result<LessonState, StorageError>;
}

struct SessionEntry {
    state: LessonState,
    touched_at: DateTime<Utc>,
}

/// In-memory session store, suitable for a single-process bot.
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
    clock: Clock,
    policy: EvictionPolicy,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            clock: Clock::default_clock(),
            policy: EvictionPolicy::None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of sessions currently held.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.len())
    }

    /// True when no sessions are held.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, SessionEntry>>, StorageError> {
        self.sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Applied while holding the lock, after the write that triggered it.
    fn evict(
        guard: &mut HashMap<SessionId, SessionEntry>,
        policy: EvictionPolicy,
        now: DateTime<Utc>,
        keep: SessionId,
    ) {
        match policy {
            EvictionPolicy::None => {}
            EvictionPolicy::Capacity(max) => {
                while guard.len() > max.max(1) {
                    let oldest = guard
                        .iter()
                        .filter(|(id, _)| **id != keep)
                        .min_by_key(|(_, entry)| entry.touched_at)
                        .map(|(id, _)| *id);
                    match oldest {
                        Some(id) => guard.remove(&id),
                        None => break,
                    };
                }
            }
            EvictionPolicy::IdleTtl(ttl) => {
                guard.retain(|id, entry| *id == keep || now - entry.touched_at <= ttl);
            }
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn create(&self, id: SessionId, state: LessonState) -> Result<(), StorageError> {
        let now = self.clock.now();
        let mut guard = self.lock()?;
        guard.insert(
            id,
            SessionEntry {
                state,
                touched_at: now,
            },
        );
        Self::evict(&mut guard, self.policy, now, id);
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<LessonState, StorageError> {
        let guard = self.lock()?;
        guard
            .get(&id)
            .map(|entry| entry.state.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn apply_update(
        &self,
        id: SessionId,
        update: LessonUpdate,
    ) -> Result<LessonState, StorageError> {
        let now = self.clock.now();
        let mut guard = self.lock()?;
        let entry = guard.get_mut(&id).ok_or(StorageError::NotFound)?;

        // Merge onto a copy so a rejected update leaves the entry untouched.
        let mut next = entry.state.clone();
        next.apply(update, now)?;
        entry.state = next.clone();
        entry.touched_at = now;

        Self::evict(&mut guard, self.policy, now, id);
        Ok(next)
    }
}
