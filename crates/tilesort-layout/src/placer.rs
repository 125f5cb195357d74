#![forbid(unsafe_code)]

//! Throttled, zone-tracking wrapper around a placement strategy.

use std::time::Duration;

use tilesort_core::Throttle;
use web_time::Instant;

use crate::{Point, Rect, Zone};

/// Geometry-only placement decision for one container kind.
pub trait PlacementStrategy {
    /// Compute the zone for `pointer` given sibling bounds in DOM order.
    ///
    /// Must return a zone in `0..=siblings.len()`.
    fn place(&self, pointer: Point, siblings: &[Rect]) -> Zone;
}

/// Applies a [`PlacementStrategy`] at most once per interval and reports a
/// zone only when it differs from the tracked one.
#[derive(Debug, Clone)]
pub struct Placer<S> {
    strategy: S,
    throttle: Throttle<Point>,
    zone: Zone,
    moves: u64,
}

impl<S: PlacementStrategy> Placer<S> {
    /// `initial` is the zone the placeholder occupies at activation.
    #[must_use]
    pub const fn new(strategy: S, interval: Duration, initial: Zone) -> Self {
        Self {
            strategy,
            throttle: Throttle::new(interval),
            zone: initial,
            moves: 0,
        }
    }

    #[must_use]
    pub const fn zone(&self) -> Zone {
        self.zone
    }

    /// Number of zone changes reported so far.
    #[must_use]
    pub const fn moves(&self) -> u64 {
        self.moves
    }

    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.throttle.has_pending()
    }

    /// When a throttled pointer position becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// Feed a pointer move. Returns the new zone if the placeholder must move.
    pub fn pointer_moved(&mut self, now: Instant, pointer: Point, siblings: &[Rect]) -> Option<Zone> {
        let pointer = self.throttle.offer(now, pointer)?;
        self.evaluate(pointer, siblings)
    }

    /// Evaluate the trailing throttled position once its interval has elapsed.
    pub fn tick(&mut self, now: Instant, siblings: &[Rect]) -> Option<Zone> {
        let pointer = self.throttle.flush(now)?;
        self.evaluate(pointer, siblings)
    }

    /// Evaluate `pointer` immediately, discarding any throttled position.
    pub fn settle(&mut self, pointer: Point, siblings: &[Rect]) -> Option<Zone> {
        self.throttle.take_pending();
        self.evaluate(pointer, siblings)
    }

    fn evaluate(&mut self, pointer: Point, siblings: &[Rect]) -> Option<Zone> {
        let zone = self.strategy.place(pointer, siblings);
        debug_assert!(zone.0 <= siblings.len());
        tracing::trace!(
            target: "tilesort.placement",
            x = pointer.x,
            y = pointer.y,
            zone = zone.0,
            current = self.zone.0,
            "placement evaluated"
        );
        if zone == self.zone {
            return None;
        }
        self.zone = zone;
        self.moves += 1;
        Some(zone)
    }
}
