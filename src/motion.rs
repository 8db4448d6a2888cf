//! Reduced-motion preference signal

use crate::page::MotionPreference;
use std::cell::Cell;

/// Reactive boolean mirroring the platform's motion-reduction preference.
///
/// The host forwards platform change notifications via
/// [`preference_changed`](Self::preference_changed); readers see the latest
/// value through [`prefers_reduced_motion`](Self::prefers_reduced_motion).
#[derive(Debug, Default)]
pub struct ReducedMotionSignal {
    current: Cell<bool>,
}

impl ReducedMotionSignal {
    pub fn new(initial: bool) -> Self {
        Self {
            current: Cell::new(initial),
        }
    }

    /// Seed the signal from a platform preference source.
    pub fn from_source<M: MotionPreference>(source: &M) -> Self {
        Self::new(source.prefers_reduced_motion())
    }

    pub fn prefers_reduced_motion(&self) -> bool {
        self.current.get()
    }

    /// Platform change notification.
    pub fn preference_changed(&self, reduced: bool) {
        self.current.set(reduced);
    }
}
