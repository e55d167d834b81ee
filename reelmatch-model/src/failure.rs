use chrono::{DateTime, Utc};

/// One `{query, year}` pair sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchAttempt {
    pub query: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub year: Option<u16>,
}

impl MatchAttempt {
    pub fn new(query: impl Into<String>, year: Option<u16>) -> Self {
        Self {
            query: query.into(),
            year,
        }
    }
}

/// Whether an alternate (AI-suggested) title existed and was tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FailureDiagnostics {
    pub ai_hint_available: bool,
    pub ai_hint_tried: bool,
}

/// Durable record of an identifier that did not produce a confident match.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailedMatchRecord {
    pub identifier: String,
    pub original_title: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub year: Option<u16>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attempts: Vec<MatchAttempt>,
    pub failed_at: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
    pub reason: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub diagnostics: FailureDiagnostics,
}

impl FailedMatchRecord {
    pub fn new(
        identifier: impl Into<String>,
        original_title: impl Into<String>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            original_title: original_title.into(),
            year: None,
            attempts: Vec::new(),
            failed_at: now,
            last_attempt: now,
            reason: reason.into(),
            diagnostics: FailureDiagnostics::default(),
        }
    }

    /// Appends attempts not already present (exact equality), preserving
    /// order. Returns how many were added.
    pub fn extend_attempts<I>(&mut self, attempts: I) -> usize
    where
        I: IntoIterator<Item = MatchAttempt>,
    {
        let mut added = 0;
        for attempt in attempts {
            if !self.attempts.contains(&attempt) {
                self.attempts.push(attempt);
                added += 1;
            }
        }
        added
    }
}
