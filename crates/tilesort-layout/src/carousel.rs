#![forbid(unsafe_code)]

//! Closest-center placement for single-row horizontally scrolling strips.
//!
//! Sibling rects are in content space (x measured from the scroll viewport's
//! left edge at scroll offset 0); callers map the pointer into content space
//! with [`ScrollState::to_content`](crate::ScrollState::to_content) first.

use crate::{PlacementStrategy, Point, Rect, Size, Zone};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarouselStrategy;

impl PlacementStrategy for CarouselStrategy {
    fn place(&self, pointer: Point, siblings: &[Rect]) -> Zone {
        let closest = siblings.iter().enumerate().min_by(|(_, a), (_, b)| {
            (a.center_x() - pointer.x)
                .abs()
                .total_cmp(&(b.center_x() - pointer.x).abs())
        });
        match closest {
            Some((index, rect)) if pointer.x < rect.center_x() => Zone(index),
            Some((index, _)) => Zone(index + 1),
            None => Zone(0),
        }
    }
}

/// Size of the placeholder reserved for a dragged carousel item.
///
/// Compound items (a wrapper around a visual card) report the inner card's
/// size as `content`; that size wins so the strip does not jump.
#[must_use]
pub fn carousel_placeholder_size(outer: Size, content: Option<Size>) -> Size {
    content.unwrap_or(outer)
}
