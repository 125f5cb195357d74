#![forbid(unsafe_code)]

//! Containers and the items they order.

use std::fmt;

use serde::{Deserialize, Serialize};
use tilesort_core::{ItemKey, Point, Rect, Size};
use tilesort_layout::{ScrollState, Zone};

/// Caller-chosen container identifier, forwarded to the order sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub String);

impl ContainerId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ContainerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Multi-column flow; placement by reading order.
    Grid,
    /// Single horizontally scrolling row; placement by closest center.
    Carousel,
}

/// One draggable tile.
///
/// The engine assigns [`Item::key`] at registration. Until then it is
/// [`Item::UNASSIGNED`].
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    key: ItemKey,
    id: Option<String>,
    rect: Rect,
    content_size: Option<Size>,
    exclusions: Vec<Rect>,
    draggable: bool,
}

impl Item {
    pub const UNASSIGNED: ItemKey = ItemKey(u64::MAX);

    /// Item with a caller-assigned identifier and on-screen bounds.
    #[must_use]
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            key: Self::UNASSIGNED,
            id: Some(id.into()),
            rect,
            content_size: None,
            exclusions: Vec::new(),
            draggable: false,
        }
    }

    /// Item the caller never tagged with an identifier.
    ///
    /// It can be dragged, but is left out of the resolved order.
    #[must_use]
    pub fn untagged(rect: Rect) -> Self {
        Self {
            id: None,
            ..Self::new(String::new(), rect)
        }
    }

    /// Size of the inner visual element for wrapped items.
    #[must_use]
    pub fn with_content_size(mut self, size: Size) -> Self {
        self.content_size = Some(size);
        self
    }

    /// Region (e.g. an embedded control) where presses never start a drag.
    #[must_use]
    pub fn with_exclusion(mut self, rect: Rect) -> Self {
        self.exclusions.push(rect);
        self
    }

    #[must_use]
    pub const fn key(&self) -> ItemKey {
        self.key
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    #[must_use]
    pub const fn content_size(&self) -> Option<Size> {
        self.content_size
    }

    #[must_use]
    pub fn exclusions(&self) -> &[Rect] {
        &self.exclusions
    }

    #[must_use]
    pub const fn is_draggable(&self) -> bool {
        self.draggable
    }

    pub(crate) fn assign_key(&mut self, key: ItemKey) {
        self.key = key;
    }

    pub(crate) fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub(crate) fn set_draggable(&mut self, draggable: bool) {
        self.draggable = draggable;
    }
}

/// Scrollable ancestor of a carousel strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRegion {
    /// On-surface bounds of the visible strip.
    pub viewport: Rect,
    pub state: ScrollState,
    /// Range reported by the host; item extents may widen it.
    declared_max: f64,
    user_scroll_suspended: bool,
}

impl ScrollRegion {
    #[must_use]
    pub fn new(viewport: Rect, max_offset: f64) -> Self {
        let state = ScrollState::new(0.0, max_offset);
        Self {
            viewport,
            declared_max: state.max_offset,
            state,
            user_scroll_suspended: false,
        }
    }

    #[must_use]
    pub const fn max_offset(&self) -> f64 {
        self.state.max_offset
    }

    pub(crate) fn set_extent(&mut self, viewport: Rect, max_offset: f64) {
        self.viewport = viewport;
        self.declared_max = max_offset.max(0.0);
    }

    /// Widen the range so content ending at `content_right` can be reached.
    pub(crate) fn fit_content(&mut self, content_right: f64) {
        let fitted = content_right - self.viewport.width;
        self.state.set_max_offset(self.declared_max.max(fitted));
    }

    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.state.offset
    }

    /// Whether user-driven scrolling is ignored (a drag owns the region).
    #[must_use]
    pub const fn is_user_scroll_suspended(&self) -> bool {
        self.user_scroll_suspended
    }

    pub(crate) fn set_user_scroll_suspended(&mut self, suspended: bool) {
        self.user_scroll_suspended = suspended;
    }

    pub(crate) fn to_content(&self, point: Point) -> Point {
        self.state.to_content(point, self.viewport)
    }
}

/// One rendered slot of a container while a drag is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum Slot {
    Item { key: ItemKey },
    Placeholder,
}

/// An ordered, caller-managed sequence of items.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    id: ContainerId,
    kind: ContainerKind,
    context: Option<String>,
    items: Vec<Item>,
    scroll: Option<ScrollRegion>,
    nested: Vec<Container>,
}

impl Container {
    /// Fixed-column grid container.
    #[must_use]
    pub fn grid(id: impl Into<ContainerId>) -> Self {
        Self {
            id: id.into(),
            kind: ContainerKind::Grid,
            context: None,
            items: Vec::new(),
            scroll: None,
            nested: Vec::new(),
        }
    }

    /// Carousel strip inside a scroll region.
    #[must_use]
    pub fn carousel(id: impl Into<ContainerId>, scroll: ScrollRegion) -> Self {
        Self {
            kind: ContainerKind::Carousel,
            scroll: Some(scroll),
            ..Self::grid(id)
        }
    }

    /// Opaque routing tag forwarded to the order sink.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        self.items.extend(items);
        self
    }

    /// Scrollable sub-container registered and removed together with this one.
    #[must_use]
    pub fn with_nested(mut self, nested: Container) -> Self {
        self.nested.push(nested);
        self
    }

    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.id
    }

    #[must_use]
    pub const fn kind(&self) -> ContainerKind {
        self.kind
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub const fn scroll(&self) -> Option<&ScrollRegion> {
        self.scroll.as_ref()
    }

    /// Caller identifiers in current order; untagged items are skipped.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().filter_map(Item::id).collect()
    }

    #[must_use]
    pub fn position(&self, key: ItemKey) -> Option<usize> {
        self.items.iter().position(|item| item.key == key)
    }

    #[must_use]
    pub fn item(&self, key: ItemKey) -> Option<&Item> {
        self.items.iter().find(|item| item.key == key)
    }

    pub(crate) fn item_mut(&mut self, key: ItemKey) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.key == key)
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.items
    }

    pub(crate) fn scroll_mut(&mut self) -> Option<&mut ScrollRegion> {
        self.scroll.as_mut()
    }

    /// Recompute a carousel's scroll range from its item extents.
    pub(crate) fn refit_scroll(&mut self) {
        let content_right = self
            .items
            .iter()
            .map(|item| item.rect().right())
            .fold(0.0, f64::max);
        if let Some(region) = self.scroll.as_mut() {
            region.fit_content(content_right);
        }
    }

    pub(crate) fn take_nested(&mut self) -> Vec<Container> {
        std::mem::take(&mut self.nested)
    }

    /// Bounds of every item except `dragged`, in DOM order.
    pub(crate) fn sibling_rects(&self, dragged: ItemKey) -> Vec<Rect> {
        self.items
            .iter()
            .filter(|item| item.key != dragged)
            .map(Item::rect)
            .collect()
    }

    /// Move `key` so it sits before the sibling at `zone`.
    ///
    /// Returns `false` if `key` is not in this container.
    pub(crate) fn relocate(&mut self, key: ItemKey, zone: Zone) -> bool {
        let Some(from) = self.position(key) else {
            return false;
        };
        let item = self.items.remove(from);
        let to = zone.index().min(self.items.len());
        self.items.insert(to, item);
        true
    }

    /// Slot sequence with the placeholder at `zone` and `dragged` lifted out.
    pub(crate) fn slots_with_placeholder(&self, dragged: ItemKey, zone: Zone) -> Vec<Slot> {
        let mut slots: Vec<Slot> = self
            .items
            .iter()
            .filter(|item| item.key != dragged)
            .map(|item| Slot::Item { key: item.key })
            .collect();
        let at = zone.index().min(slots.len());
        slots.insert(at, Slot::Placeholder);
        slots
    }
}
