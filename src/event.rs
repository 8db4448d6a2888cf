//! Engagement event model and telemetry sink boundary
//!
//! Every fact the instrumentation core establishes leaves it exactly once,
//! as an immutable [`EngagementEvent`] wrapped in an [`EventEnvelope`]. The
//! envelope stamps producer metadata and a per-activation UUID so downstream
//! collectors can de-duplicate and attribute events without any shared state.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use crate::error::EngagementError;

/// Kind of engagement fact carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    View,
    ScrollMilestone,
    ReadDuration,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::ScrollMilestone => "scroll-milestone",
            EventKind::ReadDuration => "read-duration",
        }
    }
}

/// Payload of the one-time `view` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPayload {
    pub slug: String,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time_minutes: Option<u32>,
}

/// Payload of a `scroll-milestone` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMilestonePayload {
    pub slug: String,
    pub depth: u8,
}

/// Payload of the final `read-duration` event.
///
/// `completed` is true iff the reader reached the 100% scroll milestone at
/// any point before teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadDurationPayload {
    pub slug: String,
    pub duration_seconds: u64,
    pub completed: bool,
}

/// An immutable outbound engagement fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum EngagementEvent {
    View(ViewPayload),
    ScrollMilestone(ScrollMilestonePayload),
    ReadDuration(ReadDurationPayload),
}

impl EngagementEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngagementEvent::View(_) => EventKind::View,
            EngagementEvent::ScrollMilestone(_) => EventKind::ScrollMilestone,
            EngagementEvent::ReadDuration(_) => EventKind::ReadDuration,
        }
    }
}

/// Producer metadata stamped on every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
    pub name: String,
    pub version: String,
}

impl Producer {
    /// Producer record for this build of the crate.
    pub fn this_crate() -> Self {
        Self {
            name: crate::PRODUCER_NAME.to_string(),
            version: crate::PAGEPULSE_VERSION.to_string(),
        }
    }
}

/// Envelope handed to the telemetry sink, one per fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub producer: Producer,
    /// Fresh UUID per coordinator activation; a de-dup key for collectors.
    pub activation_id: String,
    #[serde(flatten)]
    pub event: EngagementEvent,
}

/// External telemetry sink.
///
/// Delivery is fire-and-forget from the core's point of view: the caller
/// holds no reference to the envelope afterwards and a returned error is
/// swallowed at the call site, never retried.
pub trait TelemetrySink {
    fn deliver(&self, envelope: &EventEnvelope) -> Result<(), EngagementError>;
}

/// Sink that records every delivered envelope. Used by the replay pipeline
/// and by tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: RefCell<Vec<EventEnvelope>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, in delivery order.
    pub fn delivered(&self) -> Vec<EventEnvelope> {
        self.delivered.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.delivered.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered.borrow().is_empty()
    }
}

impl TelemetrySink for RecordingSink {
    fn deliver(&self, envelope: &EventEnvelope) -> Result<(), EngagementError> {
        self.delivered.borrow_mut().push(envelope.clone());
        Ok(())
    }
}

/// Sink that drops everything. Useful when a host wants live handle state
/// without shipping telemetry.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl TelemetrySink for DiscardSink {
    fn deliver(&self, _envelope: &EventEnvelope) -> Result<(), EngagementError> {
        Ok(())
    }
}
