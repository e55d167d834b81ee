use std::fmt;

use chrono::{DateTime, Utc};

/// Which long-running operation a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProgressTopic {
    Enrichment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProgressStatus {
    Starting,
    InProgress,
    Completed,
    Error,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProgressStatus::Starting => "starting",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Push-only progress notification; no acknowledgment is expected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressEvent {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub topic: ProgressTopic,
    pub status: ProgressStatus,
    pub current: usize,
    pub total: usize,
    pub message: String,
    pub emitted_at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        topic: ProgressTopic,
        status: ProgressStatus,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            topic,
            status,
            current,
            total,
            message: message.into(),
            emitted_at: Utc::now(),
        }
    }
}
