//! Conversation context: chat history, cached section answers, confessions and
//! the unlock gate for one resume.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::unlock::UnlockGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Confessions a session may hold at once.
pub const MAX_CONFESSIONS: usize = 20;
/// Longest accepted confession, in characters.
pub const MAX_CONFESSION_CHARS: usize = 500;

/// A resume exaggeration the user owned up to.
#[derive(Debug, Clone, Serialize)]
pub struct Confession {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// The canned analysis sections. Each is generated at most once per resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKey {
    Roast,
    AiReplace,
    Futureproof,
    Improve,
    Jobs,
}

impl SectionKey {
    pub const ALL: [SectionKey; 5] = [
        SectionKey::Roast,
        SectionKey::AiReplace,
        SectionKey::Futureproof,
        SectionKey::Improve,
        SectionKey::Jobs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Roast => "roast",
            SectionKey::AiReplace => "ai-replace",
            SectionKey::Futureproof => "futureproof",
            SectionKey::Improve => "improve",
            SectionKey::Jobs => "jobs",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| AppError::NotFound(format!("Unknown section '{s}'")))
    }
}

/// Session-scoped conversation state. `reset` clears every part together.
#[derive(Debug, Default)]
pub struct ConversationContext {
    history: Vec<ChatTurn>,
    sections: HashMap<SectionKey, String>,
    confessions: Vec<Confession>,
    gate: UnlockGate,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user_turn(&mut self, text: impl Into<String>) {
        self.history.push(ChatTurn::user(text));
    }

    pub fn append_assistant_turn(&mut self, text: impl Into<String>) {
        self.history.push(ChatTurn::assistant(text));
    }

    /// Records a completed free-form exchange and counts it toward the unlock gate.
    /// Returns `true` when this exchange opened the gate.
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) -> bool {
        self.append_user_turn(user);
        self.append_assistant_turn(assistant);
        self.gate.record_qualifying_chat()
    }

    /// The last `n` turns, oldest first.
    pub fn recent_history(&self, n: usize) -> &[ChatTurn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Stores a section answer. An existing entry for the key is kept.
    pub fn cache_section(&mut self, key: SectionKey, text: impl Into<String>) -> &str {
        self.sections.entry(key).or_insert_with(|| text.into())
    }

    pub fn cached(&self, key: SectionKey) -> Option<&str> {
        self.sections.get(&key).map(String::as_str)
    }

    /// Cached section keys in canonical order.
    pub fn cached_sections(&self) -> Vec<SectionKey> {
        SectionKey::ALL
            .into_iter()
            .filter(|key| self.sections.contains_key(key))
            .collect()
    }

    pub fn add_confession(&mut self, text: &str) -> Result<Confession, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest("Confession text cannot be empty".to_string()));
        }
        if text.chars().count() > MAX_CONFESSION_CHARS {
            return Err(AppError::BadRequest(format!(
                "Confession is too long; keep it under {MAX_CONFESSION_CHARS} characters"
            )));
        }
        if self.confessions.len() >= MAX_CONFESSIONS {
            return Err(AppError::BadRequest(format!(
                "You can hold at most {MAX_CONFESSIONS} confessions; remove one first"
            )));
        }
        let confession = Confession {
            id: Uuid::new_v4(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.confessions.push(confession.clone());
        Ok(confession)
    }

    /// Removes a confession by id. Returns `false` if no confession had that id.
    pub fn remove_confession(&mut self, id: Uuid) -> bool {
        let before = self.confessions.len();
        self.confessions.retain(|c| c.id != id);
        self.confessions.len() != before
    }

    pub fn confessions(&self) -> &[Confession] {
        &self.confessions
    }

    pub fn confession_texts(&self) -> Vec<String> {
        self.confessions.iter().map(|c| c.text.clone()).collect()
    }

    pub fn gate(&self) -> &UnlockGate {
        &self.gate
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
