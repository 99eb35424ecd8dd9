//! Per-user analysis sessions
//!
//! Each browser gets a session keyed by a cookie-carried UUID. A session
//! starts Idle and becomes Analyzed after the first successful analysis;
//! later analyses replace the stored result. Sessions idle for longer
//! than the configured time are dropped when a new session is created.

mod cookie;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::analysis::AnalysisOutcome;
use crate::document::{AnalysisResult, Diagnostic};

pub use cookie::{session_cookie, session_id_from_headers, SESSION_COOKIE};

/// Errors from session lookups
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),
}

/// Whether a session has a completed analysis
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Analyzed(Arc<AnalysisResult>),
}

/// One user's analysis session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub state: SessionState,
    /// Warnings from the most recent successful analysis
    pub diagnostics: Vec<Diagnostic>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            diagnostics: Vec::new(),
            created_at: now,
            last_seen: now,
        }
    }

    /// The stored result, if analysis has completed
    pub fn result(&self) -> Option<&Arc<AnalysisResult>> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Analyzed(result) => Some(result),
        }
    }

    pub fn is_analyzed(&self) -> bool {
        matches!(self.state, SessionState::Analyzed(_))
    }

    fn is_expired(&self, idle: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen > idle
    }
}

/// In-memory session storage
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    sessions: RwLock<HashMap<Uuid, Session>>,
    /// How long a session may go unused
    idle: Duration,
}

impl SessionStore {
    pub fn new(idle: Duration) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                idle,
            }),
        }
    }

    /// Create a new Idle session, pruning expired ones first
    pub async fn create(&self) -> Session {
        self.prune_expired().await;

        let session = Session::new();
        self.inner
            .sessions
            .write()
            .await
            .insert(session.id, session.clone());

        tracing::info!(session_id = %session.id, "Created session");
        session
    }

    /// Look up a live session and mark it as used.
    ///
    /// An expired session is removed and reported as missing.
    pub async fn touch(&self, id: Uuid) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.inner.sessions.write().await;

        let expired = sessions.get(&id)?.is_expired(self.inner.idle, now);
        if expired {
            sessions.remove(&id);
            tracing::debug!(session_id = %id, "Session expired");
            return None;
        }

        let session = sessions.get_mut(&id)?;
        session.last_seen = now;
        Some(session.clone())
    }

    /// Find the caller's session or start a new one.
    ///
    /// Returns the session and whether it was newly created.
    pub async fn resolve(&self, id: Option<Uuid>) -> (Session, bool) {
        if let Some(id) = id {
            if let Some(session) = self.touch(id).await {
                return (session, false);
            }
        }
        (self.create().await, true)
    }

    /// Store a completed analysis, replacing any previous one
    pub async fn store_analysis(
        &self,
        id: Uuid,
        outcome: AnalysisOutcome,
    ) -> Result<Session, SessionError> {
        let mut sessions = self.inner.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;

        session.state = SessionState::Analyzed(Arc::new(outcome.result));
        session.diagnostics = outcome.diagnostics;
        session.last_seen = Utc::now();

        Ok(session.clone())
    }

    /// Drop sessions idle past the limit; returns how many were removed
    pub async fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let idle = self.inner.idle;

        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(idle, now));
        let count = before - sessions.len();

        if count > 0 {
            tracing::info!(count = count, "Pruned expired sessions");
        }
        count
    }

    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[cfg(test)]
    async fn backdate(&self, id: Uuid, by: Duration) {
        if let Some(session) = self.inner.sessions.write().await.get_mut(&id) {
            session.last_seen = session.last_seen - by;
        }
    }
}
