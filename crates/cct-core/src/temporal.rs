//! # Event Stamps
//!
//! `Timestamp` is the wall-clock stamp carried by every event record. It
//! is UTC with whole seconds, so two logs emitted by different components
//! line up when merged and render identically everywhere.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Whole-second UTC instant at which an event was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant, sub-seconds dropped.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(0))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_whole_seconds() {
        let stamp = Timestamp::now();
        assert_eq!(stamp.0.timestamp_subsec_nanos(), 0);
        assert!(stamp.0.timestamp() > 0);
    }

    #[test]
    fn test_display_is_zulu() {
        let rendered = Timestamp::now().to_string();
        assert!(rendered.ends_with('Z'));
        assert_eq!(rendered.len(), "2026-01-15T12:00:00Z".len());
    }
}
