#![forbid(unsafe_code)]

//! Edge-triggered auto-scroll for carousel drags.
//!
//! Inside a band of `threshold` pixels at either horizontal edge of the
//! scroll viewport, the per-frame speed ramps linearly from `min_speed` at
//! the band's inner boundary to `max_speed` at the edge (and beyond it).
//! Outside both bands the speed is exactly zero.

use serde::{Deserialize, Serialize};
use tilesort_core::ReorderConfig;

use crate::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Backward,
    Forward,
}

/// Speed model for edge auto-scroll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoScroller {
    pub threshold: f64,
    pub min_speed: f64,
    pub max_speed: f64,
}

impl AutoScroller {
    #[must_use]
    pub fn from_config(config: &ReorderConfig) -> Self {
        Self {
            threshold: config.edge_scroll_threshold_px,
            min_speed: config.edge_scroll_min_speed,
            max_speed: config.edge_scroll_max_speed,
        }
    }

    /// Signed scroll velocity in px per frame for `pointer` over `viewport`.
    ///
    /// Negative scrolls toward the start of the strip. When the viewport is
    /// narrow enough for both bands to overlap, the nearer edge wins.
    #[must_use]
    pub fn velocity(&self, pointer: Point, viewport: Rect) -> f64 {
        let from_left = pointer.x - viewport.left();
        let from_right = viewport.right() - pointer.x;
        if from_left <= from_right {
            -self.speed_at(from_left)
        } else {
            self.speed_at(from_right)
        }
    }

    /// Unsigned speed at `distance` px inside the viewport from an edge.
    #[must_use]
    pub fn speed_at(&self, distance: f64) -> f64 {
        if distance >= self.threshold {
            return 0.0;
        }
        let proximity = 1.0 - distance.max(0.0) / self.threshold;
        self.min_speed + (self.max_speed - self.min_speed) * proximity
    }
}

impl Default for AutoScroller {
    fn default() -> Self {
        Self::from_config(&ReorderConfig::default())
    }
}

/// Scroll position of a carousel's scroll region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollState {
    pub offset: f64,
    pub max_offset: f64,
}

impl ScrollState {
    #[must_use]
    pub fn new(offset: f64, max_offset: f64) -> Self {
        let max_offset = max_offset.max(0.0);
        Self {
            offset: offset.clamp(0.0, max_offset),
            max_offset,
        }
    }

    /// Scroll by `delta`, clamped to the scrollable range.
    ///
    /// Returns the distance actually scrolled.
    pub fn scroll_by(&mut self, delta: f64) -> f64 {
        let before = self.offset;
        self.offset = (self.offset + delta).clamp(0.0, self.max_offset);
        self.offset - before
    }

    /// Replace the scrollable range, pulling the offset back inside it.
    pub fn set_max_offset(&mut self, max_offset: f64) {
        self.max_offset = max_offset.max(0.0);
        self.offset = self.offset.clamp(0.0, self.max_offset);
    }

    /// Map a surface point into content space: x relative to the viewport's
    /// left edge at scroll offset 0.
    #[must_use]
    pub fn to_content(&self, point: Point, viewport: Rect) -> Point {
        Point::new(point.x - viewport.left() + self.offset, point.y)
    }

    #[must_use]
    pub fn can_scroll(&self, direction: ScrollDirection) -> bool {
        match direction {
            ScrollDirection::Backward => self.offset > 0.0,
            ScrollDirection::Forward => self.offset < self.max_offset,
        }
    }
}
