//! reading.session.v1 schema definition
//!
//! A recorded reading session: the article's identity, the page geometry the
//! reader saw, and the timestamped platform events that occurred while the
//! article was mounted. Recorded sessions are the input to the replay
//! pipeline and the CLI; live hosts never need them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinator::ArticleRef;
use crate::error::EngagementError;
use crate::scroll::DEFAULT_MILESTONES;

/// Current schema version
pub const SESSION_SCHEMA_VERSION: &str = "reading.session.v1";

/// One platform notification observed during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// When the notification arrived
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: SessionEventKind,
}

/// Kind-specific payload of a recorded notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventKind {
    /// Viewport scrolled to a pixel offset
    ScrollTo { offset: u32 },
    /// Page visibility change (tab backgrounded/foregrounded)
    Visibility { hidden: bool },
    /// One-second display timer tick
    Tick,
    /// Motion-reduction preference change
    MotionPreference { reduced: bool },
}

/// A complete recorded reading session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSession {
    /// Schema identifier; defaults to [`SESSION_SCHEMA_VERSION`]
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Article identity as supplied by the host page
    #[serde(default)]
    pub article: ArticleRef,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// Article container content height in pixels
    pub content_height: u32,
    /// Motion-reduction preference at mount time
    #[serde(default)]
    pub reduced_motion: bool,
    /// Milestone percentages to track; defaults to {25, 50, 75, 100}
    #[serde(default)]
    pub milestones: Option<Vec<u8>>,
    /// When the coordinator was activated
    pub started_at: DateTime<Utc>,
    /// When the article unmounted
    pub ended_at: DateTime<Utc>,
    /// Recorded platform notifications
    #[serde(default)]
    pub events: Vec<SessionEvent>,
}

fn default_schema() -> String {
    SESSION_SCHEMA_VERSION.to_string()
}

impl ReadingSession {
    /// Check structural invariants before replay.
    pub fn validate(&self) -> Result<(), EngagementError> {
        if self.schema != SESSION_SCHEMA_VERSION {
            return Err(EngagementError::InvalidSession(format!(
                "unsupported schema '{}', expected '{}'",
                self.schema, SESSION_SCHEMA_VERSION
            )));
        }
        if self.viewport_height == 0 || self.content_height == 0 {
            return Err(EngagementError::InvalidSession(
                "viewport and content heights must be non-zero".to_string(),
            ));
        }
        if self.started_at >= self.ended_at {
            return Err(EngagementError::InvalidSession(
                "session end must be after session start".to_string(),
            ));
        }
        if let Some(milestones) = &self.milestones {
            if milestones.is_empty() {
                return Err(EngagementError::InvalidSession(
                    "milestone list must not be empty".to_string(),
                ));
            }
            if let Some(&bad) = milestones.iter().find(|&&m| m == 0 || m > 100) {
                return Err(EngagementError::InvalidSession(format!(
                    "milestone {} out of range 1..=100",
                    bad
                )));
            }
        }
        if let Some(event) = self
            .events
            .iter()
            .find(|e| e.at < self.started_at || e.at > self.ended_at)
        {
            return Err(EngagementError::InvalidSession(format!(
                "event at {} falls outside the session window",
                event.at.to_rfc3339()
            )));
        }
        Ok(())
    }

    /// Milestones to track, falling back to the default set.
    pub fn effective_milestones(&self) -> Vec<u8> {
        self.milestones
            .clone()
            .unwrap_or_else(|| DEFAULT_MILESTONES.to_vec())
    }

    /// Events in arrival order regardless of how the recording serialized them.
    pub fn sorted_events(&self) -> Vec<SessionEvent> {
        let mut events = self.events.clone();
        events.sort_by_key(|event| event.at);
        events
    }
}

/// Parse one reading session JSON document.
pub fn parse_session(json: &str) -> Result<ReadingSession, EngagementError> {
    serde_json::from_str(json)
        .map_err(|e| EngagementError::ParseError(format!("Failed to parse reading session: {}", e)))
}

/// Parse newline-delimited JSON, one session per line. Blank lines are skipped.
pub fn parse_sessions_ndjson(input: &str) -> Result<Vec<ReadingSession>, EngagementError> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_session)
        .collect()
}

/// Parse a JSON array of sessions.
pub fn parse_sessions_array(input: &str) -> Result<Vec<ReadingSession>, EngagementError> {
    serde_json::from_str(input)
        .map_err(|e| EngagementError::ParseError(format!("Failed to parse session array: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample_session_json() -> &'static str {
        r#"{
            "schema": "reading.session.v1",
            "article": {
                "slug": "systems-notes",
                "topic": "engineering",
                "reading_minutes": 7
            },
            "viewport_height": 400,
            "content_height": 4000,
            "started_at": "2024-03-10T09:00:00Z",
            "ended_at": "2024-03-10T09:05:00Z",
            "events": [
                { "at": "2024-03-10T09:00:20Z", "type": "scroll_to", "offset": 900 },
                { "at": "2024-03-10T09:01:00Z", "type": "visibility", "hidden": true },
                { "at": "2024-03-10T09:02:00Z", "type": "visibility", "hidden": false },
                { "at": "2024-03-10T09:03:00Z", "type": "tick" }
            ]
        }"#
    }

    #[test]
    fn test_parse_sample_session() {
        let session = parse_session(sample_session_json()).unwrap();
        assert_eq!(session.schema, SESSION_SCHEMA_VERSION);
        assert_eq!(session.article.slug.as_deref(), Some("systems-notes"));
        assert_eq!(session.article.reading_minutes, Some(7));
        assert_eq!(session.events.len(), 4);
        assert_eq!(
            session.events[0].kind,
            SessionEventKind::ScrollTo { offset: 900 }
        );
        session.validate().unwrap();
    }

    #[test]
    fn test_defaults_apply() {
        let json = r#"{
            "viewport_height": 400,
            "content_height": 4000,
            "started_at": "2024-03-10T09:00:00Z",
            "ended_at": "2024-03-10T09:05:00Z"
        }"#;

        let session = parse_session(json).unwrap();
        assert_eq!(session.schema, SESSION_SCHEMA_VERSION);
        assert_eq!(session.article, ArticleRef::default());
        assert!(!session.reduced_motion);
        assert!(session.events.is_empty());
        assert_eq!(session.effective_milestones(), vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_event_kind_tagging() {
        let event = SessionEvent {
            at: Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 20).unwrap(),
            kind: SessionEventKind::MotionPreference { reduced: true },
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "motion_preference");
        assert_eq!(value["reduced"], true);

        let back: SessionEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let compact = serde_json::to_string(&parse_session(sample_session_json()).unwrap()).unwrap();
        let input = format!("{}\n\n{}\n", compact, compact);

        let sessions = parse_sessions_ndjson(&input).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_parse_array() {
        let session = parse_session(sample_session_json()).unwrap();
        let input = serde_json::to_string(&vec![session.clone(), session]).unwrap();

        let sessions = parse_sessions_array(&input).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        assert!(matches!(
            parse_session("not valid json"),
            Err(EngagementError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_sessions() {
        let mut session = parse_session(sample_session_json()).unwrap();
        session.viewport_height = 0;
        assert!(session.validate().is_err());

        let mut session = parse_session(sample_session_json()).unwrap();
        session.ended_at = session.started_at;
        assert!(session.validate().is_err());

        let mut session = parse_session(sample_session_json()).unwrap();
        session.milestones = Some(vec![25, 150]);
        assert!(session.validate().is_err());

        let mut session = parse_session(sample_session_json()).unwrap();
        session.events[0].at = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        assert!(session.validate().is_err());
    }

    #[test]
    fn test_sorted_events_orders_by_arrival() {
        let mut session = parse_session(sample_session_json()).unwrap();
        session.events.swap(0, 3);

        let sorted = session.sorted_events();
        assert_eq!(
            sorted[0].kind,
            SessionEventKind::ScrollTo { offset: 900 }
        );
        assert!(sorted.windows(2).all(|pair| pair[0].at <= pair[1].at));
    }
}
