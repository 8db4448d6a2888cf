//! Scroll depth tracking
//!
//! For each configured milestone percentage, an invisible zero-height
//! sentinel marker is inserted at that vertical offset inside the article
//! container. A single zero-threshold viewport observer watches all of them;
//! the first time a sentinel intersects the viewport, its milestone is
//! recorded and reported exactly once, no matter how often the reader scrolls
//! back and forth over it afterwards.

use crate::error::EngagementError;
use crate::motion::ReducedMotionSignal;
use crate::page::{ArticleSurface, IntersectionEntry, MarkerId, Position};
use std::collections::BTreeSet;

/// Milestones tracked when the caller does not configure its own set.
pub const DEFAULT_MILESTONES: [u8; 4] = [25, 50, 75, 100];

/// Callback invoked once per milestone, with the milestone percentage.
pub type MilestoneCallback = Box<dyn FnMut(u8)>;

/// Set of reached milestone percentages.
///
/// Membership is monotonically non-decreasing for the lifetime of an
/// activation: milestones are only ever added, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MilestoneSet {
    reached: BTreeSet<u8>,
}

impl MilestoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a milestone. Returns true if it was not already present.
    pub fn insert(&mut self, milestone: u8) -> bool {
        self.reached.insert(milestone)
    }

    pub fn contains(&self, milestone: u8) -> bool {
        self.reached.contains(&milestone)
    }

    /// Maximum reached milestone, or 0 when nothing has been reached.
    pub fn current_depth(&self) -> u8 {
        self.reached.iter().next_back().copied().unwrap_or(0)
    }

    /// Reached milestones in ascending order.
    pub fn to_vec(&self) -> Vec<u8> {
        self.reached.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.reached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reached.is_empty()
    }
}

/// A sentinel marker owned by one tracker activation.
#[derive(Debug, Clone, Copy)]
struct Sentinel {
    id: MarkerId,
    milestone: u8,
}

/// Scroll depth tracker entry point.
pub struct ScrollDepthTracker;

impl ScrollDepthTracker {
    /// Attach depth tracking to an article surface.
    ///
    /// Inserts one sentinel per milestone (duplicates in `milestones` are
    /// collapsed), temporarily forcing a statically positioned container to
    /// `relative` so percentage offsets resolve against the container's own
    /// height. Fails with no partial state: if observation is unavailable or
    /// a marker cannot be placed, every already-placed marker is removed and
    /// the positioning context is restored before the error returns.
    ///
    /// The motion-reduction preference is recorded on the handle but does not
    /// gate tracking; only scroll animations elsewhere honor it.
    pub fn activate<S: ArticleSurface>(
        mut surface: S,
        milestones: &[u8],
        motion: &ReducedMotionSignal,
        on_milestone: impl FnMut(u8) + 'static,
    ) -> Result<ScrollDepthHandle<S>, EngagementError> {
        if !surface.observation_supported() {
            return Err(EngagementError::ObservationUnsupported);
        }

        let reduced_motion = motion.prefers_reduced_motion();

        let mut configured: Vec<u8> = Vec::with_capacity(milestones.len());
        for &m in milestones {
            if !configured.contains(&m) {
                configured.push(m);
            }
        }

        // Borrow the positioning context; restored exactly once on teardown.
        let restore_position = if surface.position() == Position::Static {
            surface.set_position(Position::Relative);
            Some(Position::Static)
        } else {
            None
        };

        let mut sentinels: Vec<Sentinel> = Vec::with_capacity(configured.len());
        for &milestone in &configured {
            match surface.insert_marker(milestone) {
                Ok(id) => sentinels.push(Sentinel { id, milestone }),
                Err(err) => {
                    for sentinel in &sentinels {
                        surface.remove_marker(sentinel.id);
                    }
                    if let Some(position) = restore_position {
                        surface.set_position(position);
                    }
                    return Err(err);
                }
            }
        }

        Ok(ScrollDepthHandle {
            surface,
            sentinels,
            reached: MilestoneSet::new(),
            restore_position,
            reduced_motion,
            on_milestone: Box::new(on_milestone),
            released: false,
        })
    }
}

/// Live scroll depth tracking for one activation.
///
/// The handle owns its sentinels and the borrowed positioning context;
/// dropping it without an explicit [`deactivate`](Self::deactivate) still
/// removes the markers and restores the container.
pub struct ScrollDepthHandle<S: ArticleSurface> {
    surface: S,
    sentinels: Vec<Sentinel>,
    reached: MilestoneSet,
    restore_position: Option<Position>,
    reduced_motion: bool,
    on_milestone: MilestoneCallback,
    released: bool,
}

impl<S: ArticleSurface> ScrollDepthHandle<S> {
    /// Feed a batch of observation entries from the platform.
    ///
    /// A milestone fires on its sentinel's first intersecting entry and never
    /// again within this activation. A sentinel the viewport jumped over
    /// without an intersecting frame stays unreported; there is no backfill.
    pub fn intersections(&mut self, entries: &[IntersectionEntry]) {
        for entry in entries {
            if !entry.is_intersecting {
                continue;
            }
            let milestone = match self
                .sentinels
                .iter()
                .find(|sentinel| sentinel.id == entry.marker)
            {
                Some(sentinel) => sentinel.milestone,
                None => continue,
            };
            if self.reached.insert(milestone) {
                (self.on_milestone)(milestone);
            }
        }
    }

    /// Maximum milestone reached so far, or 0.
    pub fn current_depth(&self) -> u8 {
        self.reached.current_depth()
    }

    /// Reached milestones in ascending order.
    pub fn reached_milestones(&self) -> Vec<u8> {
        self.reached.to_vec()
    }

    pub fn has_reached(&self, milestone: u8) -> bool {
        self.reached.contains(milestone)
    }

    /// Motion-reduction preference observed at activation.
    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    /// Detach: remove every sentinel and restore the container's original
    /// positioning context.
    pub fn deactivate(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for sentinel in std::mem::take(&mut self.sentinels) {
            self.surface.remove_marker(sentinel.id);
        }
        if let Some(position) = self.restore_position.take() {
            self.surface.set_position(position);
        }
    }
}

impl<S: ArticleSurface> Drop for ScrollDepthHandle<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedPage;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn shared_page(content: u32, viewport: u32) -> Rc<RefCell<SimulatedPage>> {
        Rc::new(RefCell::new(SimulatedPage::new(content, viewport)))
    }

    fn collecting_tracker(
        page: Rc<RefCell<SimulatedPage>>,
        milestones: &[u8],
    ) -> (ScrollDepthHandle<Rc<RefCell<SimulatedPage>>>, Rc<RefCell<Vec<u8>>>) {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        let signal = ReducedMotionSignal::new(false);
        let handle = ScrollDepthTracker::activate(page, milestones, &signal, move |m| {
            sink.borrow_mut().push(m)
        })
        .unwrap();
        (handle, fired)
    }

    #[test]
    fn test_milestone_set_is_monotonic() {
        let mut set = MilestoneSet::new();
        assert_eq!(set.current_depth(), 0);

        assert!(set.insert(50));
        assert!(set.insert(25));
        assert!(!set.insert(50));

        assert_eq!(set.current_depth(), 50);
        assert_eq!(set.to_vec(), vec![25, 50]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_each_milestone_fires_exactly_once() {
        let page = shared_page(4000, 400);
        let (mut handle, fired) = collecting_tracker(Rc::clone(&page), &DEFAULT_MILESTONES);

        // Scroll down past 25% and 50%, back to the top, then down again.
        for offset in [900u32, 1800, 0, 900, 1800] {
            let entries = page.borrow_mut().scroll_to(offset);
            handle.intersections(&entries);
        }

        // 25% (1000px) and 50% (2000px) each entered the viewport twice but
        // fired once.
        assert_eq!(*fired.borrow(), vec![25, 50]);
        assert_eq!(handle.current_depth(), 50);
        assert!(handle.has_reached(25));
        assert!(!handle.has_reached(75));
    }

    #[test]
    fn test_arrival_order_differs_from_value_order() {
        let page = shared_page(4000, 200);
        let (mut handle, fired) = collecting_tracker(Rc::clone(&page), &DEFAULT_MILESTONES);

        // 25% = 1000px, 50% = 2000px, 75% = 3000px, 100% = 4000px.
        for offset in [900u32, 2900, 1900, 3800] {
            let entries = page.borrow_mut().scroll_to(offset);
            handle.intersections(&entries);
        }

        assert_eq!(*fired.borrow(), vec![25, 75, 50, 100]);
        assert_eq!(handle.reached_milestones(), vec![25, 50, 75, 100]);
        assert_eq!(handle.current_depth(), 100);
    }

    #[test]
    fn test_fast_jump_scroll_skips_unseen_sentinels() {
        let page = shared_page(4000, 400);
        let (mut handle, fired) = collecting_tracker(Rc::clone(&page), &DEFAULT_MILESTONES);

        // One frame straight to the bottom: only the 100% sentinel is inside
        // the viewport window, so the intermediate milestones never fire.
        let entries = page.borrow_mut().scroll_to(3600);
        handle.intersections(&entries);

        assert_eq!(*fired.borrow(), vec![100]);
        assert_eq!(handle.reached_milestones(), vec![100]);
    }

    #[test]
    fn test_static_position_is_borrowed_and_restored() {
        let page = shared_page(2000, 500);
        assert_eq!(page.borrow().position(), Position::Static);

        let (handle, _fired) = collecting_tracker(Rc::clone(&page), &DEFAULT_MILESTONES);
        assert_eq!(page.borrow().position(), Position::Relative);
        assert_eq!(page.borrow().marker_count(), 4);

        handle.deactivate();
        assert_eq!(page.borrow().position(), Position::Static);
        assert_eq!(page.borrow().marker_count(), 0);
    }

    #[test]
    fn test_positioned_container_left_untouched() {
        let page = shared_page(2000, 500);
        page.borrow_mut().set_position(Position::Sticky);

        let (handle, _fired) = collecting_tracker(Rc::clone(&page), &DEFAULT_MILESTONES);
        assert_eq!(page.borrow().position(), Position::Sticky);

        handle.deactivate();
        assert_eq!(page.borrow().position(), Position::Sticky);
    }

    #[test]
    fn test_drop_tears_down_like_deactivate() {
        let page = shared_page(2000, 500);
        {
            let (_handle, _fired) = collecting_tracker(Rc::clone(&page), &[25, 100]);
            assert_eq!(page.borrow().marker_count(), 2);
        }
        assert_eq!(page.borrow().marker_count(), 0);
        assert_eq!(page.borrow().position(), Position::Static);
    }

    #[test]
    fn test_unsupported_observation_leaves_no_state() {
        let page = Rc::new(RefCell::new(
            SimulatedPage::new(2000, 500).without_observation(),
        ));
        let signal = ReducedMotionSignal::new(false);

        let result =
            ScrollDepthTracker::activate(Rc::clone(&page), &DEFAULT_MILESTONES, &signal, |_| {});
        assert!(matches!(result, Err(EngagementError::ObservationUnsupported)));
        assert_eq!(page.borrow().marker_count(), 0);
        assert_eq!(page.borrow().position(), Position::Static);
    }

    #[test]
    fn test_failed_marker_placement_rolls_back() {
        // Zero-height content box rejects marker insertion.
        let page = Rc::new(RefCell::new(SimulatedPage::new(0, 500)));
        let signal = ReducedMotionSignal::new(false);

        let result =
            ScrollDepthTracker::activate(Rc::clone(&page), &DEFAULT_MILESTONES, &signal, |_| {});
        assert!(result.is_err());
        assert_eq!(page.borrow().marker_count(), 0);
        assert_eq!(page.borrow().position(), Position::Static);
    }

    #[test]
    fn test_duplicate_milestones_collapse() {
        let page = shared_page(2000, 500);
        let (handle, _fired) = collecting_tracker(Rc::clone(&page), &[25, 25, 50, 100]);

        assert_eq!(page.borrow().marker_count(), 3);
        handle.deactivate();
    }

    #[test]
    fn test_reduced_motion_is_recorded_but_does_not_gate() {
        let page = Rc::new(RefCell::new(
            SimulatedPage::new(4000, 400).with_reduced_motion(),
        ));
        let signal = ReducedMotionSignal::from_source(&*page.borrow());
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);

        let mut handle =
            ScrollDepthTracker::activate(Rc::clone(&page), &DEFAULT_MILESTONES, &signal, move |m| {
                sink.borrow_mut().push(m)
            })
            .unwrap();
        assert!(handle.reduced_motion());

        // Tracking still runs.
        let entries = page.borrow_mut().scroll_to(900);
        handle.intersections(&entries);
        assert_eq!(*fired.borrow(), vec![25]);
    }
}
