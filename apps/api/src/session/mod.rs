//! Server-side Professor Doom sessions.
//!
//! One `Session` per uploaded resume. The store hands out `Arc<Mutex<Session>>`
//! and handlers hold that lock for a whole action, so actions on one session run
//! one at a time while different sessions proceed independently.

pub mod context;
pub mod handlers;
pub mod summary_flow;
pub mod unlock;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::ResumeDocument;
use context::{ChatTurn, Confession, ConversationContext, SectionKey};
use summary_flow::{SummaryFlow, SummaryState};
use unlock::UnlockStatus;

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub resume: ResumeDocument,
    /// Opening analysis; also the resume context for section answers.
    pub analysis: String,
    pub context: ConversationContext,
    pub summary: Option<SummaryFlow>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(resume: ResumeDocument, analysis: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            resume,
            analysis,
            context: ConversationContext::new(),
            summary: None,
            created_at: Utc::now(),
        }
    }

    /// Swaps in a new resume and clears everything derived from the old one.
    pub fn replace_resume(&mut self, resume: ResumeDocument, analysis: String) {
        self.resume = resume;
        self.analysis = analysis;
        self.context.reset();
        self.summary = None;
    }

    /// The running wizard. Errors if the Summary Room was never opened.
    pub fn summary_mut(&mut self) -> Result<&mut SummaryFlow, AppError> {
        self.summary
            .as_mut()
            .ok_or_else(|| AppError::Conflict("The Summary Room has not been opened".to_string()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            analysis: self.analysis.clone(),
            resume_text: self.resume.raw_text().to_string(),
            history: self.context.history().to_vec(),
            sections: self.context.cached_sections(),
            confessions: self.context.confessions().to_vec(),
            unlock: self.context.gate().status(),
            summary: self.summary.as_ref().map(SummaryFlow::state),
            created_at: self.created_at,
        }
    }
}

/// Read-only view of a session returned by `GET /api/sessions/:id`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub analysis: String,
    pub resume_text: String,
    pub history: Vec<ChatTurn>,
    pub sections: Vec<SectionKey>,
    pub confessions: Vec<Confession>,
    pub unlock: UnlockStatus,
    pub summary: Option<SummaryState>,
    pub created_at: DateTime<Utc>,
}

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<Uuid, SharedSession>,
    /// Least recently used first.
    order: VecDeque<Uuid>,
}

/// In-memory session registry with a fixed capacity.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<StoreInner>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Registers a session, evicting the least recently used ones once the store is full.
    pub async fn insert(&self, session: Session) -> (Uuid, SharedSession) {
        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        let mut w = self.inner.write().await;
        while w.sessions.len() >= self.max_sessions {
            let Some(stale) = w.order.pop_front() else {
                break;
            };
            if w.sessions.remove(&stale).is_some() {
                tracing::info!("Session store full; evicted session {stale}");
            }
        }
        w.sessions.insert(id, Arc::clone(&shared));
        w.order.push_back(id);
        (id, shared)
    }

    /// Looks up a session and marks it most recently used.
    pub async fn get(&self, id: Uuid) -> Result<SharedSession, AppError> {
        let mut w = self.inner.write().await;
        let shared = w
            .sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        w.order.retain(|existing| *existing != id);
        w.order.push_back(id);
        Ok(shared)
    }

    /// Removes a session. Returns `false` if it did not exist.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut w = self.inner.write().await;
        let removed = w.sessions.remove(&id).is_some();
        if removed {
            w.order.retain(|existing| *existing != id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}
