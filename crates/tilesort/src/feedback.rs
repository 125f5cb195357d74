#![forbid(unsafe_code)]

//! Visual feedback contract for hosts rendering a drag.
//!
//! While a session is active the dragged item floats above every sibling,
//! follows the pointer with no animation, and lets pointer events fall
//! through to the surface. The placeholder is an inert empty slot sized like
//! the item. Once the session settles every override is gone and the item is
//! back to [`ItemVisual::Normal`].

use serde::{Deserialize, Serialize};
use tilesort_core::{Rect, Size};

/// Stacking order for the lifted item; above any sibling.
pub const LIFTED_Z_INDEX: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "visual", rename_all = "snake_case")]
pub enum ItemVisual {
    /// Normal flow layout, no overrides.
    Normal,
    /// Touch press pending; shrink slightly as an affordance.
    Pressed { scale: f64 },
    /// Detached from flow and pinned under the pointer.
    Lifted {
        /// Surface-space bounds, centered on the pointer.
        rect: Rect,
        z_index: i32,
        /// Always `false`: the lifted item must not intercept input.
        pointer_events: bool,
        /// Always `false`: position tracks the pointer with no easing.
        transition: bool,
    },
}

impl ItemVisual {
    #[must_use]
    pub fn lifted(rect: Rect) -> Self {
        Self::Lifted {
            rect,
            z_index: LIFTED_Z_INDEX,
            pointer_events: false,
            transition: false,
        }
    }

    #[must_use]
    pub const fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Reserved slot marking the candidate drop position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderVisual {
    pub size: Size,
    /// Always `true`: no interactive affordances.
    pub inert: bool,
}

impl PlaceholderVisual {
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self { size, inert: true }
    }
}
