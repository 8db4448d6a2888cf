//! Pagepulse - In-page reading-engagement instrumentation
//!
//! Pagepulse measures how an article actually gets read: how deep the reader
//! scrolled, how long the page was the visible foreground tab, and whether
//! the piece was read to completion, and reports each fact exactly once per
//! activation to an external telemetry sink.
//!
//! ## Modules
//!
//! - **Trackers**: scroll depth ([`scroll`]), active read time ([`duration`]),
//!   and the coordinator that composes them ([`coordinator`])
//! - **Platform boundary**: traits the host implements ([`page`]), plus a
//!   simulated page for tests and replay ([`sim`])
//! - **Replay**: recorded sessions ([`session`]) driven through the live
//!   trackers ([`replay`])

pub mod coordinator;
pub mod duration;
pub mod error;
pub mod event;
pub mod motion;
pub mod page;
pub mod replay;
pub mod scroll;
pub mod session;
pub mod sim;

pub use coordinator::{ArticleRef, ReadingAnalyticsCoordinator, ReadingSessionHandle};
pub use duration::{format_duration, ActiveInterval, ReadDurationTracker, ReadFinish};
pub use error::EngagementError;
pub use event::{EngagementEvent, EventEnvelope, EventKind, RecordingSink, TelemetrySink};
pub use motion::ReducedMotionSignal;
pub use page::{ArticleSurface, IntersectionEntry, MarkerId, MotionPreference, Position};
pub use replay::{replay_session, replay_session_json, ReplayReport};
pub use scroll::{MilestoneSet, ScrollDepthTracker, DEFAULT_MILESTONES};
pub use session::{parse_session, ReadingSession, SESSION_SCHEMA_VERSION};

/// Pagepulse version stamped on every outbound event envelope
pub const PAGEPULSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for event envelopes
pub const PRODUCER_NAME: &str = "pagepulse";
