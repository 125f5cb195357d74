#![forbid(unsafe_code)]

//! Gesture normalization: mouse and touch input into one drag gesture stream.
//!
//! [`GestureNormalizer`] accepts raw press / move / release input for an item
//! and emits [`GestureEvent`]s of a single shape regardless of input source.
//! Source-specific policy (when a press activates, how far it may wander
//! first) lives in two adapters behind [`GestureAdapter`].
//!
//! # State Machine
//!
//! Each item has at most one tracked press:
//!
//! ```text
//! (none) --press--> Pending --delay elapsed--> Activated --release--> (none)
//!                      |                          |
//!                      +--moved / released--> Cancel
//! ```
//!
//! Mouse presses skip `Pending`: [`MouseAdapter`] activates on contact.
//!
//! # Invariants
//!
//! 1. Every tracked press emits exactly one `Start`, then either `Activate`
//!    (followed by zero or more `Move` and one `End`) or one `Cancel`.
//! 2. `Activate` never follows a `Cancel` for the same press.
//! 3. A press inside an item's exclusion rects is never tracked.
//! 4. A new press on an item whose press is still pending replaces it; the old
//!    one is cancelled first with [`CancelReason::Superseded`].
//!
//! # Failure Modes
//!
//! - Move or release for an item without a tracked press is ignored; the
//!   caller's session cleanup must still be idempotent.
//! - Timers are not self-driving. The host calls [`GestureNormalizer::poll`]
//!   at or after [`GestureNormalizer::next_deadline`].

use std::time::Duration;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::config::ReorderConfig;
use crate::geometry::{Point, Rect};

// ---------------------------------------------------------------------------
// Input vocabulary
// ---------------------------------------------------------------------------

/// Engine-internal handle for one item, stable across re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey(pub u64);

/// Where a press came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Mouse,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
}

/// Why a tracked press ended without a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Pointer left the tolerance circle before the long-press delay elapsed.
    MovedBeforeActivation,
    /// Pointer lifted before the long-press delay elapsed.
    ReleasedBeforeActivation,
    /// A newer press on the same item replaced this one.
    Superseded,
    /// The host tore the gesture down.
    Interrupted,
}

/// Normalized gesture stream for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GestureEvent {
    Start {
        item: ItemKey,
        source: InputSource,
        pos: Point,
    },
    Activate {
        item: ItemKey,
        source: InputSource,
        pos: Point,
    },
    Move {
        item: ItemKey,
        pos: Point,
    },
    End {
        item: ItemKey,
        pos: Point,
    },
    Cancel {
        item: ItemKey,
        reason: CancelReason,
    },
}

impl GestureEvent {
    /// Item this event belongs to.
    #[must_use]
    pub const fn item(&self) -> ItemKey {
        match *self {
            Self::Start { item, .. }
            | Self::Activate { item, .. }
            | Self::Move { item, .. }
            | Self::End { item, .. }
            | Self::Cancel { item, .. } => item,
        }
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Source-specific activation policy.
pub trait GestureAdapter {
    fn source(&self) -> InputSource;

    /// When a press made at `pressed_at` activates. `None` activates on contact.
    fn activation_deadline(&self, pressed_at: Instant) -> Option<Instant>;

    /// Whether moving from `origin` to `pos` abandons a pending press.
    fn abandons_pending(&self, origin: Point, pos: Point) -> bool;
}

/// Mouse: primary-button press activates immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct MouseAdapter;

impl GestureAdapter for MouseAdapter {
    fn source(&self) -> InputSource {
        InputSource::Mouse
    }

    fn activation_deadline(&self, _pressed_at: Instant) -> Option<Instant> {
        None
    }

    fn abandons_pending(&self, _origin: Point, _pos: Point) -> bool {
        false
    }
}

/// Touch: long-press with a movement tolerance, so scrolls and taps pass through.
#[derive(Debug, Clone, Copy)]
pub struct TouchAdapter {
    delay: Duration,
    tolerance: f64,
}

impl TouchAdapter {
    #[must_use]
    pub const fn new(delay: Duration, tolerance: f64) -> Self {
        Self { delay, tolerance }
    }
}

impl GestureAdapter for TouchAdapter {
    fn source(&self) -> InputSource {
        InputSource::Touch
    }

    fn activation_deadline(&self, pressed_at: Instant) -> Option<Instant> {
        Some(pressed_at + self.delay)
    }

    fn abandons_pending(&self, origin: Point, pos: Point) -> bool {
        origin.distance(pos) > self.tolerance
    }
}

// ---------------------------------------------------------------------------
// GestureNormalizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Press {
    source: InputSource,
    origin: Point,
    last: Point,
    deadline: Option<Instant>,
    activated: bool,
}

/// Stateful normalizer that tracks at most one press per item.
#[derive(Debug, Clone)]
pub struct GestureNormalizer {
    mouse: MouseAdapter,
    touch: TouchAdapter,
    presses: AHashMap<ItemKey, Press>,
}

impl GestureNormalizer {
    #[must_use]
    pub fn new(config: &ReorderConfig) -> Self {
        Self {
            mouse: MouseAdapter,
            touch: TouchAdapter::new(config.long_press_delay(), config.touch_move_tolerance_px),
            presses: AHashMap::new(),
        }
    }

    /// Mouse button press on `item`. Non-primary buttons are ignored.
    pub fn mouse_down(
        &mut self,
        item: ItemKey,
        button: MouseButton,
        pos: Point,
        exclusions: &[Rect],
        now: Instant,
    ) -> Vec<GestureEvent> {
        if button != MouseButton::Primary {
            return Vec::new();
        }
        let adapter = self.mouse;
        self.press(&adapter, item, pos, exclusions, now)
    }

    /// Finger contact on `item`.
    pub fn touch_start(
        &mut self,
        item: ItemKey,
        pos: Point,
        exclusions: &[Rect],
        now: Instant,
    ) -> Vec<GestureEvent> {
        let adapter = self.touch;
        self.press(&adapter, item, pos, exclusions, now)
    }

    /// Pointer or finger motion for `item`.
    pub fn pointer_move(&mut self, item: ItemKey, pos: Point) -> Vec<GestureEvent> {
        let Some(press) = self.presses.get_mut(&item) else {
            return Vec::new();
        };
        press.last = pos;
        if press.activated {
            return vec![GestureEvent::Move { item, pos }];
        }
        let abandoned = match press.source {
            InputSource::Mouse => self.mouse.abandons_pending(press.origin, pos),
            InputSource::Touch => self.touch.abandons_pending(press.origin, pos),
        };
        if abandoned {
            self.presses.remove(&item);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                target: "tilesort.gesture",
                item = item.0,
                "pending press moved past tolerance"
            );
            return vec![GestureEvent::Cancel {
                item,
                reason: CancelReason::MovedBeforeActivation,
            }];
        }
        Vec::new()
    }

    /// Pointer or finger release for `item`.
    pub fn pointer_up(&mut self, item: ItemKey, pos: Point) -> Vec<GestureEvent> {
        let Some(press) = self.presses.remove(&item) else {
            return Vec::new();
        };
        if press.activated {
            vec![GestureEvent::End { item, pos }]
        } else {
            vec![GestureEvent::Cancel {
                item,
                reason: CancelReason::ReleasedBeforeActivation,
            }]
        }
    }

    /// Fire `Activate` for every pending press whose deadline has passed.
    ///
    /// Events are ordered by item key so polling is deterministic.
    pub fn poll(&mut self, now: Instant) -> Vec<GestureEvent> {
        let mut due: Vec<ItemKey> = self
            .presses
            .iter()
            .filter(|(_, press)| !press.activated && press.deadline.is_some_and(|d| d <= now))
            .map(|(key, _)| *key)
            .collect();
        due.sort_unstable();
        let mut out = Vec::with_capacity(due.len());
        for item in due {
            if let Some(press) = self.presses.get_mut(&item) {
                press.activated = true;
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "tilesort.gesture", item = item.0, "long press activated");
                out.push(GestureEvent::Activate {
                    item,
                    source: press.source,
                    pos: press.last,
                });
            }
        }
        out
    }

    /// Earliest pending activation deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.presses
            .values()
            .filter(|press| !press.activated)
            .filter_map(|press| press.deadline)
            .min()
    }

    /// Drop the press tracked for `item`, emitting `Cancel` if one existed.
    pub fn cancel(&mut self, item: ItemKey, reason: CancelReason) -> Option<GestureEvent> {
        self.presses
            .remove(&item)
            .map(|_| GestureEvent::Cancel { item, reason })
    }

    #[must_use]
    pub fn is_pending(&self, item: ItemKey) -> bool {
        self.presses.get(&item).is_some_and(|press| !press.activated)
    }

    #[must_use]
    pub fn is_activated(&self, item: ItemKey) -> bool {
        self.presses.get(&item).is_some_and(|press| press.activated)
    }

    /// Number of tracked presses, pending or activated.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.presses.len()
    }

    /// Forget every tracked press without emitting events.
    pub fn reset(&mut self) {
        self.presses.clear();
    }

    fn press(
        &mut self,
        adapter: &dyn GestureAdapter,
        item: ItemKey,
        pos: Point,
        exclusions: &[Rect],
        now: Instant,
    ) -> Vec<GestureEvent> {
        if exclusions.iter().any(|rect| rect.contains(pos)) {
            #[cfg(feature = "tracing")]
            tracing::trace!(target: "tilesort.gesture", item = item.0, "press inside exclusion");
            return Vec::new();
        }

        let mut out = Vec::with_capacity(3);
        if let Some(existing) = self.presses.get(&item) {
            if existing.activated {
                return out;
            }
            self.presses.remove(&item);
            out.push(GestureEvent::Cancel {
                item,
                reason: CancelReason::Superseded,
            });
        }

        let source = adapter.source();
        let deadline = adapter.activation_deadline(now);
        let activated = deadline.is_none();
        self.presses.insert(
            item,
            Press {
                source,
                origin: pos,
                last: pos,
                deadline,
                activated,
            },
        );
        out.push(GestureEvent::Start { item, source, pos });
        if activated {
            out.push(GestureEvent::Activate { item, source, pos });
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
