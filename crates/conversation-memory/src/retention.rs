use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of the retention check for a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    Reuse,
    Expire,
}

/// Named retention presets.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPreset {
    /// 3 hours, for the assistant persona.
    Assistant,
    /// 10 minutes, for the disposable-memory variant.
    Disposable,
}

/// Age-based expiry of conversation records.
///
/// Evaluated lazily on the read path; there is no background eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    window: Duration,
}

impl RetentionPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// `None` when `minutes` is outside the range chrono can represent.
    pub fn from_minutes(minutes: i64) -> Option<Self> {
        Duration::try_minutes(minutes).map(Self::new)
    }

    pub fn preset(preset: RetentionPreset) -> Self {
        match preset {
            RetentionPreset::Assistant => Self::new(Duration::minutes(180)),
            RetentionPreset::Disposable => Self::new(Duration::minutes(10)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// A record exactly `window` old is still reused.
    pub fn decide(&self, last_modified: DateTime<Utc>, now: DateTime<Utc>) -> RetentionDecision {
        if now.signed_duration_since(last_modified) > self.window {
            RetentionDecision::Expire
        } else {
            RetentionDecision::Reuse
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::preset(RetentionPreset::Assistant)
    }
}
