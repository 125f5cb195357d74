#![forbid(unsafe_code)]

//! Placeholder placement for grid and carousel containers.
//!
//! Both engines answer one question: given the pointer and the bounding boxes
//! of the dragged item's siblings, at which sibling index should the
//! placeholder sit? The answer is a [`Zone`]. [`Placer`] wraps a
//! [`PlacementStrategy`] with time throttling and zone tracking so the
//! placeholder only moves when the answer actually changes.

pub mod autoscroll;
pub mod carousel;
pub mod grid;
pub mod placer;

pub use autoscroll::{AutoScroller, ScrollDirection, ScrollState};
pub use carousel::{CarouselStrategy, carousel_placeholder_size};
pub use grid::{GridStrategy, reading_order};
pub use placer::{PlacementStrategy, Placer};
pub use tilesort_core::geometry::{Point, Rect, Size};

use serde::{Deserialize, Serialize};

/// Candidate insertion slot: the index among the dragged item's siblings
/// (placeholder and dragged item excluded) before which the placeholder sits.
///
/// `Zone(siblings.len())` means "after the last sibling".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Zone(pub usize);

impl Zone {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}
