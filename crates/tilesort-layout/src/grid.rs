#![forbid(unsafe_code)]

//! Nearest-slot placement for multi-column flow layouts.
//!
//! # Algorithm
//!
//! 1. Sort siblings into reading order. Siblings are bucketed into rows by
//!    sweeping top edges: a sibling joins the current row when its top is
//!    within `row_tolerance` of the row's first top, otherwise it opens a new
//!    row. Rows are then ordered by left edge.
//! 2. Walk the sorted list. On the first sibling whose vertical extent (grown
//!    by `row_margin`) contains the pointer:
//!    - pointer left of its center: insert before it;
//!    - otherwise, if the next sibling is on the same row and the pointer is
//!      left of that sibling's center: insert after the current one;
//!    - otherwise, if the next sibling is on the same row: keep walking;
//!    - otherwise (row ends): insert after the current one.
//! 3. No row matched: pick the sibling with the nearest center (Euclidean)
//!    and insert before it when the pointer is left of its center, else after.
//! 4. No siblings: zone 0.
//!
//! Rows of uneven width resolve by the same rule; a pointer between a short
//! last row and the row above it can match either depending on margin.

use std::cmp::Ordering;

use tilesort_core::ReorderConfig;

use crate::{PlacementStrategy, Point, Rect, Zone};

/// Grid placement tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStrategy {
    pub row_tolerance: f64,
    pub row_margin: f64,
}

impl GridStrategy {
    #[must_use]
    pub fn from_config(config: &ReorderConfig) -> Self {
        Self {
            row_tolerance: config.grid_row_tolerance_px,
            row_margin: config.grid_row_margin_px,
        }
    }
}

impl Default for GridStrategy {
    fn default() -> Self {
        Self::from_config(&ReorderConfig::default())
    }
}

/// A sibling annotated with its DOM index and reading-order row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ordered {
    pub dom_index: usize,
    pub row: usize,
    pub rect: Rect,
}

/// Sort `siblings` into row-major reading order.
#[must_use]
pub fn reading_order(siblings: &[Rect], row_tolerance: f64) -> Vec<Ordered> {
    let mut by_top: Vec<(usize, Rect)> = siblings.iter().copied().enumerate().collect();
    by_top.sort_by(|a, b| a.1.top().total_cmp(&b.1.top()).then(a.0.cmp(&b.0)));

    let mut ordered = Vec::with_capacity(by_top.len());
    let mut row = 0;
    let mut row_top = None;
    for (dom_index, rect) in by_top {
        match row_top {
            Some(top) if rect.top() - top <= row_tolerance => {}
            Some(_) => {
                row += 1;
                row_top = Some(rect.top());
            }
            None => row_top = Some(rect.top()),
        }
        ordered.push(Ordered {
            dom_index,
            row,
            rect,
        });
    }

    ordered.sort_by(|a, b| match a.row.cmp(&b.row) {
        Ordering::Equal => a
            .rect
            .left()
            .total_cmp(&b.rect.left())
            .then(a.dom_index.cmp(&b.dom_index)),
        other => other,
    });
    ordered
}

impl PlacementStrategy for GridStrategy {
    fn place(&self, pointer: Point, siblings: &[Rect]) -> Zone {
        if siblings.is_empty() {
            return Zone(0);
        }
        let ordered = reading_order(siblings, self.row_tolerance);

        for (i, current) in ordered.iter().enumerate() {
            if !current.rect.spans_y(pointer.y, self.row_margin) {
                continue;
            }
            if pointer.x < current.rect.center_x() {
                return Zone(current.dom_index);
            }
            match ordered.get(i + 1) {
                Some(next) if next.row == current.row => {
                    if pointer.x < next.rect.center_x() {
                        return Zone(current.dom_index + 1);
                    }
                }
                _ => return Zone(current.dom_index + 1),
            }
        }

        nearest_center(pointer, &ordered)
    }
}

fn nearest_center(pointer: Point, ordered: &[Ordered]) -> Zone {
    let nearest = ordered.iter().min_by(|a, b| {
        pointer
            .distance(a.rect.center())
            .total_cmp(&pointer.distance(b.rect.center()))
    });
    match nearest {
        Some(item) if pointer.x < item.rect.center_x() => Zone(item.dom_index),
        Some(item) => Zone(item.dom_index + 1),
        None => Zone(0),
    }
}
