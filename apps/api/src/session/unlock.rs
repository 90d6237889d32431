//! Summary Room unlock gate.
//!
//! `Locked(count)` → `Unlocked` after `UNLOCK_THRESHOLD` qualifying chats.
//! Only completed free-form chats qualify; section clicks never do.
//! Once open, the gate stays open until the whole context is reset.

use serde::Serialize;

use crate::errors::AppError;

pub const UNLOCK_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockGate {
    Locked { count: u32 },
    Unlocked,
}

impl Default for UnlockGate {
    fn default() -> Self {
        UnlockGate::Locked { count: 0 }
    }
}

/// What the client needs to draw the lock badge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockStatus {
    pub unlocked: bool,
    pub progress: u32,
    pub threshold: u32,
    pub remaining: u32,
}

impl UnlockGate {
    /// Counts one qualifying chat. Returns `true` only on the call that opens the gate.
    pub fn record_qualifying_chat(&mut self) -> bool {
        match *self {
            UnlockGate::Locked { count } if count + 1 >= UNLOCK_THRESHOLD => {
                *self = UnlockGate::Unlocked;
                true
            }
            UnlockGate::Locked { count } => {
                *self = UnlockGate::Locked { count: count + 1 };
                false
            }
            UnlockGate::Unlocked => false,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, UnlockGate::Unlocked)
    }

    /// Qualifying chats counted so far, capped at the threshold.
    pub fn count(&self) -> u32 {
        match self {
            UnlockGate::Locked { count } => *count,
            UnlockGate::Unlocked => UNLOCK_THRESHOLD,
        }
    }

    pub fn remaining(&self) -> u32 {
        UNLOCK_THRESHOLD - self.count()
    }

    pub fn ensure_unlocked(&self) -> Result<(), AppError> {
        if self.is_unlocked() {
            Ok(())
        } else {
            Err(AppError::SummaryLocked {
                remaining: self.remaining(),
            })
        }
    }

    pub fn status(&self) -> UnlockStatus {
        UnlockStatus {
            unlocked: self.is_unlocked(),
            progress: self.count(),
            threshold: UNLOCK_THRESHOLD,
            remaining: self.remaining(),
        }
    }
}
