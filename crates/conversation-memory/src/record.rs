use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};
use crate::key::MemoryKey;

/// One exchange: a user message and the assistant reply to it.
///
/// Serialized as one JSONL line `{"user": .., "assistant": .., "date": ..}`.
/// `date` is absent in records written before timestamps were stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "user")]
    pub user_text: String,

    #[serde(rename = "assistant")]
    pub assistant_text: String,

    #[serde(rename = "date", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn new(
        user_text: impl Into<String>,
        assistant_text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
            timestamp: Some(timestamp),
        }
    }
}

/// Full retained history for one memory key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    pub owner_key: MemoryKey,

    /// Chronological, append-only.
    pub turns: Vec<Turn>,

    /// Store metadata at read time; never serialized into the blob.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ConversationRecord {
    pub fn with_turns(owner_key: MemoryKey, turns: Vec<Turn>) -> Self {
        Self {
            owner_key,
            turns,
            last_modified: None,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Encode as newline-delimited JSON. Non-ASCII text is written verbatim.
    pub fn to_jsonl(&self) -> MemoryResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.turns.len() * 128);
        for (idx, turn) in self.turns.iter().enumerate() {
            serde_json::to_writer(&mut out, turn).map_err(|e| MemoryError::MalformedRecord {
                key: self.owner_key,
                line: idx + 1,
                reason: e.to_string(),
            })?;
            out.push(b'\n');
        }
        Ok(out)
    }

    /// Decode a JSONL blob. Blank lines are skipped; any other undecodable
    /// line fails the whole record.
    pub fn from_jsonl(owner_key: MemoryKey, data: &[u8]) -> MemoryResult<Self> {
        let text = std::str::from_utf8(data).map_err(|e| MemoryError::MalformedRecord {
            key: owner_key,
            line: 0,
            reason: format!("invalid UTF-8: {}", e),
        })?;

        let mut turns = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let turn: Turn =
                serde_json::from_str(line).map_err(|e| MemoryError::MalformedRecord {
                    key: owner_key,
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            turns.push(turn);
        }

        Ok(Self::with_turns(owner_key, turns))
    }
}
