//! Reading analytics coordination
//!
//! Composes the scroll depth and read duration trackers for one article
//! activation, fires the one-time `view` event, and forwards every fact the
//! trackers report to the telemetry sink with the article's identity
//! attached. Nothing in here is allowed to surface a failure to the host:
//! instrumentation degrades to "no telemetry", never to broken reading UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use uuid::Uuid;

use crate::duration::{ReadDurationHandle, ReadDurationTracker, ReadFinish};
use crate::event::{
    EngagementEvent, EventEnvelope, Producer, ReadDurationPayload, ScrollMilestonePayload,
    TelemetrySink, ViewPayload,
};
use crate::motion::ReducedMotionSignal;
use crate::page::{ArticleSurface, IntersectionEntry};
use crate::scroll::{ScrollDepthHandle, ScrollDepthTracker, DEFAULT_MILESTONES};

/// Milestone that marks an article as read to completion.
const COMPLETION_MILESTONE: u8 = 100;

/// Article identity supplied by the host page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    /// Estimated reading time shown on the article card.
    #[serde(default)]
    pub reading_minutes: Option<u32>,
}

/// Shared emission path: wraps an event in this activation's envelope and
/// hands it to the sink, swallowing delivery failures.
#[derive(Clone)]
struct Emitter {
    sink: Rc<dyn TelemetrySink>,
    producer: Producer,
    activation_id: String,
}

impl Emitter {
    fn emit(&self, event: EngagementEvent) {
        let envelope = EventEnvelope {
            producer: self.producer.clone(),
            activation_id: self.activation_id.clone(),
            event,
        };
        if let Err(err) = self.sink.deliver(&envelope) {
            log::debug!("engagement telemetry dropped: {}", err);
        }
    }
}

/// Coordinator entry point.
pub struct ReadingAnalyticsCoordinator;

impl ReadingAnalyticsCoordinator {
    /// Activate reading instrumentation for one article.
    ///
    /// Emits the one-time `view` event immediately when both slug and topic
    /// are present, then attaches both trackers. A platform that cannot
    /// support depth tracking degrades silently to duration-only
    /// instrumentation. Never fails.
    pub fn activate<S: ArticleSurface>(
        surface: S,
        motion: &ReducedMotionSignal,
        article: ArticleRef,
        sink: Rc<dyn TelemetrySink>,
        now: DateTime<Utc>,
    ) -> ReadingSessionHandle<S> {
        Self::activate_with_milestones(surface, motion, article, &DEFAULT_MILESTONES, sink, now)
    }

    /// [`activate`](Self::activate) with a caller-chosen milestone set.
    pub fn activate_with_milestones<S: ArticleSurface>(
        surface: S,
        motion: &ReducedMotionSignal,
        article: ArticleRef,
        milestones: &[u8],
        sink: Rc<dyn TelemetrySink>,
        now: DateTime<Utc>,
    ) -> ReadingSessionHandle<S> {
        let emitter = Emitter {
            sink,
            producer: Producer::this_crate(),
            activation_id: Uuid::new_v4().to_string(),
        };

        // One view per activation; the latch is fresh because the handle is.
        let mut view_emitted = false;
        if let (Some(slug), Some(topic)) = (article.slug.clone(), article.topic.clone()) {
            emitter.emit(EngagementEvent::View(ViewPayload {
                slug,
                topic,
                reading_time_minutes: article.reading_minutes,
            }));
            view_emitted = true;
        }

        let completed = Rc::new(Cell::new(false));

        let scroll = {
            let emitter = emitter.clone();
            let completed = Rc::clone(&completed);
            let slug = article.slug.clone();
            let on_milestone = move |depth: u8| {
                if depth == COMPLETION_MILESTONE {
                    completed.set(true);
                }
                if let Some(slug) = slug.clone() {
                    emitter.emit(EngagementEvent::ScrollMilestone(ScrollMilestonePayload {
                        slug,
                        depth,
                    }));
                }
            };
            match ScrollDepthTracker::activate(surface, milestones, motion, on_milestone) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    log::debug!("scroll depth tracking skipped: {}", err);
                    None
                }
            }
        };

        let duration = {
            let emitter = emitter.clone();
            let completed = Rc::clone(&completed);
            let on_finish = move |finish: ReadFinish| {
                // Completion is read at finish time, not re-derived later.
                emitter.emit(EngagementEvent::ReadDuration(ReadDurationPayload {
                    slug: finish.article_id,
                    duration_seconds: finish.duration_seconds,
                    completed: completed.get(),
                }));
            };
            ReadDurationTracker::activate(article.slug.as_deref(), now, on_finish)
        };

        ReadingSessionHandle {
            scroll,
            duration,
            view_emitted,
        }
    }
}

/// Live instrumentation for one article activation.
///
/// Exposes the union of both trackers' read-only state plus the platform
/// notification forwarders the host wires up.
pub struct ReadingSessionHandle<S: ArticleSurface> {
    scroll: Option<ScrollDepthHandle<S>>,
    duration: ReadDurationHandle,
    view_emitted: bool,
}

impl<S: ArticleSurface> ReadingSessionHandle<S> {
    /// Forward a batch of viewport observation entries.
    pub fn intersections(&mut self, entries: &[IntersectionEntry]) {
        if let Some(scroll) = self.scroll.as_mut() {
            scroll.intersections(entries);
        }
    }

    /// Forward a page visibility change.
    pub fn visibility_changed(&mut self, hidden: bool, now: DateTime<Utc>) {
        self.duration.visibility_changed(hidden, now);
    }

    /// Forward the one-second display timer tick.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.duration.tick(now);
    }

    pub fn current_depth(&self) -> u8 {
        self.scroll.as_ref().map_or(0, ScrollDepthHandle::current_depth)
    }

    pub fn reached_milestones(&self) -> Vec<u8> {
        self.scroll
            .as_ref()
            .map_or_else(Vec::new, ScrollDepthHandle::reached_milestones)
    }

    pub fn has_reached_milestone(&self, milestone: u8) -> bool {
        self.scroll
            .as_ref()
            .is_some_and(|scroll| scroll.has_reached(milestone))
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration.duration_seconds()
    }

    pub fn is_active(&self) -> bool {
        self.duration.is_active()
    }

    pub fn formatted_duration(&self) -> String {
        self.duration.formatted()
    }

    /// Whether this activation emitted its `view` event.
    pub fn view_emitted(&self) -> bool {
        self.view_emitted
    }

    /// Tear down both trackers: report the final read duration, remove the
    /// sentinels, and restore the container. Synchronous and complete once
    /// this returns; a new activation may begin immediately after.
    pub fn deactivate(self, now: DateTime<Utc>) -> Option<ReadFinish> {
        let ReadingSessionHandle {
            scroll, duration, ..
        } = self;
        let finish = duration.deactivate(now);
        if let Some(scroll) = scroll {
            scroll.deactivate();
        }
        finish
    }
}
