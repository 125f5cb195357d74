#![forbid(unsafe_code)]

//! Drag session lifecycle.
//!
//! # State Machine
//!
//! ```text
//! Idle ──touch press──▶ PendingActivation ──long press──▶ Active
//!  │  ◀──cancel/lift────────┘                               │
//!  └──────────────mouse press──────────────────────────────▶│
//!                                                           ▼ release
//! Idle ◀──────────order resolved────────────────────── Settling
//! ```
//!
//! # Invariants
//!
//! 1. At most one [`DragSession`] exists per engine; it is owned by the
//!    engine and only reachable through `&mut` engine methods.
//! 2. While a session exists its placeholder zone is within
//!    `0..=siblings.len()` of its container.
//! 3. `PendingActivation` never owns a placeholder; cancelling it only
//!    reverts the press affordance.
//! 4. Every transition is recorded as a [`DragTransition`] with a
//!    monotonically increasing `transition_id`.

use serde::{Deserialize, Serialize};
use tilesort_core::{CancelReason, InputSource, ItemKey, Point, Rect, ReorderConfig, Size};
use tilesort_layout::{
    AutoScroller, CarouselStrategy, GridStrategy, Placer, ScrollDirection, Zone,
    carousel_placeholder_size,
};
use web_time::Instant;

use crate::container::{Container, ContainerId, ContainerKind, ScrollRegion};

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DragPhase {
    Idle,
    PendingActivation { item: ItemKey },
    Active { item: ItemKey },
    Settling { item: ItemKey },
}

/// Effect carried by one lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    PressStarted {
        item: ItemKey,
    },
    PressReverted {
        item: ItemKey,
        reason: CancelReason,
    },
    Activated {
        item: ItemKey,
        container: ContainerId,
        zone: Zone,
    },
    PlaceholderMoved {
        item: ItemKey,
        from: Zone,
        to: Zone,
    },
    Dropped {
        item: ItemKey,
        container: ContainerId,
        from_index: usize,
        to_index: usize,
    },
    OrderResolved {
        container: ContainerId,
        order: Vec<String>,
    },
    Interrupted {
        item: ItemKey,
    },
}

/// One lifecycle transition with its effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragTransition {
    pub transition_id: u64,
    pub from: DragPhase,
    pub to: DragPhase,
    pub effect: DragEffect,
}

#[derive(Debug, Clone)]
pub(crate) enum SessionPlacer {
    Grid(Placer<GridStrategy>),
    Carousel {
        placer: Placer<CarouselStrategy>,
        scroller: AutoScroller,
        velocity: f64,
    },
}

/// Ephemeral state of one in-flight drag.
#[derive(Debug, Clone)]
pub(crate) struct DragSession {
    pub(crate) item: ItemKey,
    pub(crate) container: ContainerId,
    pub(crate) source: InputSource,
    pub(crate) pointer: Point,
    /// On-screen size captured at activation.
    pub(crate) size: Size,
    pub(crate) placeholder_size: Size,
    pub(crate) original_index: usize,
    pub(crate) placer: SessionPlacer,
}

impl DragSession {
    /// Begin a session for `item` at `pointer`.
    ///
    /// Returns `None` when `item` is not in `container`.
    pub(crate) fn activate(
        config: &ReorderConfig,
        container: &Container,
        item: ItemKey,
        source: InputSource,
        pointer: Point,
    ) -> Option<Self> {
        let original_index = container.position(item)?;
        let dragged = container.item(item)?;
        let size = dragged.rect().size();
        let initial = Zone(original_index);
        let (placer, placeholder_size) = match container.kind() {
            ContainerKind::Grid => (
                SessionPlacer::Grid(Placer::new(
                    GridStrategy::from_config(config),
                    config.grid_throttle(),
                    initial,
                )),
                size,
            ),
            ContainerKind::Carousel => {
                let scroller = AutoScroller::from_config(config);
                // A press held inside an edge band scrolls without further moves.
                let velocity = container
                    .scroll()
                    .map_or(0.0, |region| scroller.velocity(pointer, region.viewport));
                (
                    SessionPlacer::Carousel {
                        placer: Placer::new(CarouselStrategy, config.carousel_throttle(), initial),
                        scroller,
                        velocity,
                    },
                    carousel_placeholder_size(size, dragged.content_size()),
                )
            }
        };
        Some(Self {
            item,
            container: container.id().clone(),
            source,
            pointer,
            size,
            placeholder_size,
            original_index,
            placer,
        })
    }

    #[must_use]
    pub(crate) const fn zone(&self) -> Zone {
        match &self.placer {
            SessionPlacer::Grid(placer) => placer.zone(),
            SessionPlacer::Carousel { placer, .. } => placer.zone(),
        }
    }

    /// Surface bounds of the lifted item, centered on the pointer.
    #[must_use]
    pub(crate) fn lifted_rect(&self) -> Rect {
        Rect::centered_on(self.pointer, self.size)
    }

    #[must_use]
    pub(crate) const fn velocity(&self) -> f64 {
        match &self.placer {
            SessionPlacer::Grid(_) => 0.0,
            SessionPlacer::Carousel { velocity, .. } => *velocity,
        }
    }

    #[must_use]
    pub(crate) fn placement_deadline(&self) -> Option<Instant> {
        match &self.placer {
            SessionPlacer::Grid(placer) => placer.deadline(),
            SessionPlacer::Carousel { placer, .. } => placer.deadline(),
        }
    }

    /// Record a pointer move and return a new zone if the placeholder moves.
    pub(crate) fn pointer_moved(
        &mut self,
        now: Instant,
        pointer: Point,
        container: &Container,
    ) -> Option<Zone> {
        self.pointer = pointer;
        let siblings = container.sibling_rects(self.item);
        match &mut self.placer {
            SessionPlacer::Grid(placer) => placer.pointer_moved(now, pointer, &siblings),
            SessionPlacer::Carousel {
                placer,
                scroller,
                velocity,
            } => {
                let region = container.scroll()?;
                *velocity = scroller.velocity(pointer, region.viewport);
                placer.pointer_moved(now, region.to_content(pointer), &siblings)
            }
        }
    }

    /// Re-offer the current pointer, e.g. after the content scrolled under it.
    pub(crate) fn reoffer(&mut self, now: Instant, container: &Container) -> Option<Zone> {
        let pointer = self.pointer;
        self.pointer_moved(now, pointer, container)
    }

    /// Evaluate a throttled position that has become due.
    pub(crate) fn tick(&mut self, now: Instant, container: &Container) -> Option<Zone> {
        let siblings = container.sibling_rects(self.item);
        match &mut self.placer {
            SessionPlacer::Grid(placer) => placer.tick(now, &siblings),
            SessionPlacer::Carousel { placer, .. } => placer.tick(now, &siblings),
        }
    }

    /// Final unthrottled placement at the release coordinate.
    pub(crate) fn settle(&mut self, pointer: Point, container: &Container) -> Zone {
        self.pointer = pointer;
        let siblings = container.sibling_rects(self.item);
        match &mut self.placer {
            SessionPlacer::Grid(placer) => {
                placer.settle(pointer, &siblings);
                placer.zone()
            }
            SessionPlacer::Carousel {
                placer, velocity, ..
            } => {
                *velocity = 0.0;
                let content = container
                    .scroll()
                    .map_or(pointer, |region| region.to_content(pointer));
                placer.settle(content, &siblings);
                placer.zone()
            }
        }
    }

    /// Whether another auto-scroll frame would move the region.
    #[must_use]
    pub(crate) fn wants_frame(&self, region: Option<&ScrollRegion>) -> bool {
        let velocity = self.velocity();
        if velocity == 0.0 {
            return false;
        }
        let direction = if velocity < 0.0 {
            ScrollDirection::Backward
        } else {
            ScrollDirection::Forward
        };
        region.is_some_and(|region| region.state.can_scroll(direction))
    }
}
