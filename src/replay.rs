//! Session replay pipeline
//!
//! Drives a recorded reading session through a simulated page and a live
//! coordinator, yielding the telemetry the activation would have emitted and
//! the final handle state. Replay is stateless by design: every session gets
//! completely fresh tracker instances, exactly like a real article mount.

use std::cell::RefCell;
use std::rc::Rc;

use crate::coordinator::ReadingAnalyticsCoordinator;
use crate::error::EngagementError;
use crate::event::{EventEnvelope, RecordingSink, TelemetrySink};
use crate::motion::ReducedMotionSignal;
use crate::session::{parse_session, ReadingSession, SessionEventKind};
use crate::sim::SimulatedPage;

/// Outcome of replaying one recorded session.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// Envelopes the activation handed to the sink, in emission order
    pub telemetry: Vec<EventEnvelope>,
    /// Milestones reached, ascending
    pub reached_milestones: Vec<u8>,
    /// Maximum reached milestone, or 0
    pub final_depth: u8,
    /// Reported read duration in whole seconds (0 when nothing was reported)
    pub duration_seconds: u64,
    /// Human-readable form of `duration_seconds`
    pub formatted_duration: String,
    /// Whether the 100% milestone was reached before teardown
    pub completed: bool,
}

/// Replay a parsed session.
pub fn replay_session(session: &ReadingSession) -> Result<ReplayReport, EngagementError> {
    session.validate()?;

    let mut page = SimulatedPage::new(session.content_height, session.viewport_height);
    page.set_reduced_motion(session.reduced_motion);
    let page = Rc::new(RefCell::new(page));

    let signal = ReducedMotionSignal::new(session.reduced_motion);
    let sink = Rc::new(RecordingSink::new());

    let mut handle = ReadingAnalyticsCoordinator::activate_with_milestones(
        Rc::clone(&page),
        &signal,
        session.article.clone(),
        &session.effective_milestones(),
        Rc::<RecordingSink>::clone(&sink) as Rc<dyn TelemetrySink>,
        session.started_at,
    );

    // The platform observer fires immediately after registration, so markers
    // already inside the viewport at mount time report right away.
    let entries = page.borrow().current_entries();
    handle.intersections(&entries);

    for event in session.sorted_events() {
        match event.kind {
            SessionEventKind::ScrollTo { offset } => {
                let entries = page.borrow_mut().scroll_to(offset);
                handle.intersections(&entries);
            }
            SessionEventKind::Visibility { hidden } => {
                page.borrow_mut().set_hidden(hidden);
                handle.visibility_changed(hidden, event.at);
            }
            SessionEventKind::Tick => {
                handle.tick(event.at);
            }
            SessionEventKind::MotionPreference { reduced } => {
                page.borrow_mut().set_reduced_motion(reduced);
                signal.preference_changed(reduced);
            }
        }
    }

    let reached_milestones = handle.reached_milestones();
    let final_depth = handle.current_depth();
    let completed = handle.has_reached_milestone(100);
    let finish = handle.deactivate(session.ended_at);
    let duration_seconds = finish.as_ref().map_or(0, |f| f.duration_seconds);

    Ok(ReplayReport {
        telemetry: sink.delivered(),
        reached_milestones,
        final_depth,
        duration_seconds,
        formatted_duration: crate::duration::format_duration(duration_seconds),
        completed,
    })
}

/// Parse a session JSON document and replay it.
pub fn replay_session_json(json: &str) -> Result<ReplayReport, EngagementError> {
    let session = parse_session(json)?;
    replay_session(&session)
}
