#![forbid(unsafe_code)]

//! Reorder engine facade.
//!
//! [`ReorderEngine`] owns every registered container, the gesture normalizer
//! and the single optional drag session. Hosts feed it raw input and clock
//! signals; each call returns a [`Dispatch`] record describing what the input
//! did, in the manner of a pointer-capture adapter log:
//!
//! - `pointer_down` / `touch_start` on an item start a gesture;
//! - `pointer_move` / `pointer_up` route to the item currently pressed
//!   (document-level listeners, no item target needed);
//! - `tick(now)` fires due long-press activations and trailing throttled
//!   placements;
//! - `animation_frame(now)` advances carousel auto-scroll by one frame.
//!
//! A rejected input is never an error. It is reported as
//! [`DispatchOutcome::Ignored`] with the reason and leaves state unchanged.
//!
//! # Drop ordering
//!
//! On release the item is moved to the placeholder's slot, every visual
//! override and listener is cleared, the order is resolved, and only then is
//! the container's [`OrderSink`] invoked. A failing or panicking sink cannot
//! observe or disturb a half-settled engine.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use tilesort_core::{
    CancelReason, ConfigError, GestureEvent, GestureNormalizer, InputSource, ItemKey, MouseButton,
    Point, Rect, ReorderConfig,
};
use tilesort_layout::Zone;
use web_time::Instant;

use crate::container::{Container, ContainerId, ContainerKind, Item, ScrollRegion, Slot};
use crate::error::RegistryError;
use crate::feedback::{ItemVisual, PlaceholderVisual};
use crate::resolver::{OrderSink, OrderUpdate, SharedSink, deliver, resolve_order};
use crate::session::{DragEffect, DragPhase, DragSession, DragTransition};

/// Input signal that produced a [`Dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
    PointerDown,
    TouchStart,
    PointerMove,
    PointerUp,
    Tick,
    AnimationFrame,
    Interrupt,
}

/// Why an input was dropped without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    UnknownItem,
    NotDraggable,
    ButtonNotAllowed,
    InsideExclusion,
    ActiveSessionInProgress,
    ContainerDetached,
    NoActiveGesture,
    NothingDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Forwarded,
    Ignored(IgnoredReason),
}

/// Result of one input or clock dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub phase: InputPhase,
    /// Normalized gesture events produced by this input.
    pub gestures: Vec<GestureEvent>,
    pub transitions: Vec<DragTransition>,
    /// New placeholder zone, when the placeholder moved.
    pub placement: Option<Zone>,
    /// Distance auto-scrolled this frame.
    pub scrolled: Option<f64>,
    /// Order handed to the sink, when a drop settled.
    pub saved: Option<OrderUpdate>,
    pub outcome: DispatchOutcome,
}

impl Dispatch {
    fn forwarded(phase: InputPhase) -> Self {
        Self {
            phase,
            gestures: Vec::new(),
            transitions: Vec::new(),
            placement: None,
            scrolled: None,
            saved: None,
            outcome: DispatchOutcome::Forwarded,
        }
    }

    fn ignored(phase: InputPhase, reason: IgnoredReason) -> Self {
        Self {
            outcome: DispatchOutcome::Ignored(reason),
            ..Self::forwarded(phase)
        }
    }

    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Ignored(_))
    }

    fn is_empty(&self) -> bool {
        self.gestures.is_empty()
            && self.transitions.is_empty()
            && self.placement.is_none()
            && self.scrolled.is_none()
            && self.saved.is_none()
    }
}

struct Registered {
    container: Container,
    sink: SharedSink,
    parent: Option<ContainerId>,
    nested: Vec<ContainerId>,
}

impl fmt::Debug for Registered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("container", &self.container)
            .field("parent", &self.parent)
            .field("nested", &self.nested)
            .finish_non_exhaustive()
    }
}

/// Headless drag-to-reorder engine for grid and carousel containers.
#[derive(Debug)]
pub struct ReorderEngine {
    config: ReorderConfig,
    containers: AHashMap<ContainerId, Registered>,
    owners: AHashMap<ItemKey, ContainerId>,
    normalizer: GestureNormalizer,
    /// Item whose press the normalizer currently tracks.
    gesture: Option<ItemKey>,
    session: Option<DragSession>,
    phase: DragPhase,
    listeners: bool,
    next_key: u64,
    next_transition_id: u64,
}

impl ReorderEngine {
    /// Build an engine; the configuration is validated first.
    pub fn new(config: ReorderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            normalizer: GestureNormalizer::new(&config),
            config,
            containers: AHashMap::new(),
            owners: AHashMap::new(),
            gesture: None,
            session: None,
            phase: DragPhase::Idle,
            listeners: false,
            next_key: 1,
            next_transition_id: 1,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ReorderConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register `container` (and its nested containers) and make every item
    /// in it draggable. Drops are reported to `sink`.
    pub fn enable<S>(&mut self, container: Container, sink: S) -> Result<(), RegistryError>
    where
        S: OrderSink + 'static,
    {
        let sink: SharedSink = Rc::new(RefCell::new(sink));
        let mut flat = Vec::new();
        flatten(container, None, &mut flat);

        let mut seen = AHashSet::with_capacity(flat.len());
        for (container, _) in &flat {
            let id = container.id();
            if self.containers.contains_key(id) || !seen.insert(id.clone()) {
                return Err(RegistryError::DuplicateContainer(id.clone()));
            }
        }

        for (mut container, parent) in flat {
            let id = container.id().clone();
            for item in container.items_mut() {
                let key = ItemKey(self.next_key);
                self.next_key += 1;
                item.assign_key(key);
                item.set_draggable(true);
                self.owners.insert(key, id.clone());
            }
            container.refit_scroll();
            if let Some(parent) = parent.as_ref().and_then(|p| self.containers.get_mut(p)) {
                parent.nested.push(id.clone());
            }
            tracing::debug!(
                target: "tilesort.session",
                container = %id,
                kind = ?container.kind(),
                items = container.items().len(),
                "container enabled"
            );
            self.containers.insert(
                id,
                Registered {
                    container,
                    sink: Rc::clone(&sink),
                    parent,
                    nested: Vec::new(),
                },
            );
        }
        Ok(())
    }

    /// Unregister `id` and its nested containers, returning them.
    ///
    /// An active drag or pending press inside them is interrupted first.
    pub fn disable(&mut self, id: &ContainerId) -> Result<Container, RegistryError> {
        let Some(registered) = self.containers.get(id) else {
            return Err(RegistryError::UnknownContainer(id.clone()));
        };
        let parent = registered.parent.clone();

        let subtree = self.subtree(id);
        let touched = self
            .gesture
            .and_then(|item| self.owners.get(&item))
            .is_some_and(|owner| subtree.contains(owner));
        let dragging = self
            .session
            .as_ref()
            .is_some_and(|session| subtree.contains(&session.container));
        if touched || dragging {
            self.interrupt();
        }

        if let Some(parent) = parent.and_then(|p| self.containers.get_mut(&p)) {
            parent.nested.retain(|child| child != id);
        }
        self.detach(id)
            .ok_or_else(|| RegistryError::UnknownContainer(id.clone()))
    }

    pub fn make_draggable(&mut self, key: ItemKey) -> Result<(), RegistryError> {
        self.item_entry_mut(key)?.set_draggable(true);
        Ok(())
    }

    /// Stop `key` from starting new drags. A pending press on it is dropped.
    pub fn make_not_draggable(&mut self, key: ItemKey) -> Result<(), RegistryError> {
        self.item_entry_mut(key)?.set_draggable(false);
        if self.phase == (DragPhase::PendingActivation { item: key }) {
            self.interrupt();
        }
        Ok(())
    }

    /// Add `item` at `index` (clamped). It starts non-draggable.
    pub fn insert_item(
        &mut self,
        container: &ContainerId,
        index: usize,
        mut item: Item,
    ) -> Result<ItemKey, RegistryError> {
        self.ensure_idle(container)?;
        let registered = self
            .containers
            .get_mut(container)
            .ok_or_else(|| RegistryError::UnknownContainer(container.clone()))?;
        let key = ItemKey(self.next_key);
        self.next_key += 1;
        item.assign_key(key);
        item.set_draggable(false);
        let items = registered.container.items_mut();
        let at = index.min(items.len());
        items.insert(at, item);
        registered.container.refit_scroll();
        self.owners.insert(key, container.clone());
        Ok(key)
    }

    /// Remove an item. If it is being dragged the drag is interrupted.
    pub fn remove_item(&mut self, key: ItemKey) -> Result<Item, RegistryError> {
        let owner = self
            .owners
            .get(&key)
            .cloned()
            .ok_or(RegistryError::UnknownItem(key))?;
        let dragging_here = self
            .session
            .as_ref()
            .is_some_and(|session| session.container == owner);
        if dragging_here || self.gesture == Some(key) {
            self.interrupt();
        }
        let registered = self
            .containers
            .get_mut(&owner)
            .ok_or_else(|| RegistryError::UnknownContainer(owner.clone()))?;
        let position = registered
            .container
            .position(key)
            .ok_or(RegistryError::UnknownItem(key))?;
        self.owners.remove(&key);
        let removed = registered.container.items_mut().remove(position);
        registered.container.refit_scroll();
        Ok(removed)
    }

    pub fn set_item_rect(&mut self, key: ItemKey, rect: Rect) -> Result<(), RegistryError> {
        let owner = self.owners.get(&key).ok_or(RegistryError::UnknownItem(key))?;
        let container = self
            .containers
            .get_mut(owner)
            .map(|registered| &mut registered.container)
            .ok_or(RegistryError::UnknownItem(key))?;
        container
            .item_mut(key)
            .ok_or(RegistryError::UnknownItem(key))?
            .set_rect(rect);
        container.refit_scroll();
        Ok(())
    }

    /// Report post-reflow geometry for items of `container`.
    ///
    /// Every key is checked before any rect is applied.
    pub fn update_layout(
        &mut self,
        container: &ContainerId,
        rects: &[(ItemKey, Rect)],
    ) -> Result<(), RegistryError> {
        let registered = self
            .containers
            .get_mut(container)
            .ok_or_else(|| RegistryError::UnknownContainer(container.clone()))?;
        if let Some((key, _)) = rects
            .iter()
            .find(|(key, _)| registered.container.item(*key).is_none())
        {
            return Err(RegistryError::UnknownItem(*key));
        }
        for (key, rect) in rects {
            if let Some(item) = registered.container.item_mut(*key) {
                item.set_rect(*rect);
            }
        }
        registered.container.refit_scroll();
        Ok(())
    }

    /// Report a carousel's viewport and scroll range after the host resized it.
    ///
    /// The range still widens to reach every item, and the current offset is
    /// clamped into it.
    pub fn set_scroll_extent(
        &mut self,
        container: &ContainerId,
        viewport: Rect,
        max_offset: f64,
    ) -> Result<(), RegistryError> {
        let registered = self
            .containers
            .get_mut(container)
            .ok_or_else(|| RegistryError::UnknownContainer(container.clone()))?;
        let region = registered
            .container
            .scroll_mut()
            .ok_or_else(|| RegistryError::NotACarousel {
                container: container.clone(),
            })?;
        region.set_extent(viewport, max_offset);
        registered.container.refit_scroll();
        tracing::debug!(
            target: "tilesort.autoscroll",
            container = %container,
            max_offset = registered.container.scroll().map(ScrollRegion::max_offset),
            "scroll extent updated"
        );
        Ok(())
    }

    /// Scroll a carousel on behalf of the user.
    ///
    /// Returns the distance scrolled; zero while a drag owns the region.
    pub fn user_scroll(&mut self, container: &ContainerId, delta: f64) -> Result<f64, RegistryError> {
        let registered = self
            .containers
            .get_mut(container)
            .ok_or_else(|| RegistryError::UnknownContainer(container.clone()))?;
        let region = registered
            .container
            .scroll_mut()
            .ok_or_else(|| RegistryError::NotACarousel {
                container: container.clone(),
            })?;
        if region.is_user_scroll_suspended() {
            tracing::trace!(
                target: "tilesort.autoscroll",
                container = %container,
                delta,
                "user scroll suspended during drag"
            );
            return Ok(0.0);
        }
        Ok(region.state.scroll_by(delta))
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Mouse button press on `item` at surface coordinate `pos`.
    pub fn pointer_down(
        &mut self,
        item: ItemKey,
        button: MouseButton,
        pos: Point,
        now: Instant,
    ) -> Dispatch {
        if button != MouseButton::Primary {
            return Dispatch::ignored(InputPhase::PointerDown, IgnoredReason::ButtonNotAllowed);
        }
        self.press(InputPhase::PointerDown, InputSource::Mouse, item, pos, now)
    }

    /// Finger contact on `item` at surface coordinate `pos`.
    pub fn touch_start(&mut self, item: ItemKey, pos: Point, now: Instant) -> Dispatch {
        self.press(InputPhase::TouchStart, InputSource::Touch, item, pos, now)
    }

    /// Pointer or finger motion anywhere on the surface.
    pub fn pointer_move(&mut self, pos: Point, now: Instant) -> Dispatch {
        let Some(item) = self.gesture else {
            return Dispatch::ignored(InputPhase::PointerMove, IgnoredReason::NoActiveGesture);
        };
        let mut dispatch = Dispatch::forwarded(InputPhase::PointerMove);
        for event in self.normalizer.pointer_move(item, pos) {
            self.apply(event, now, &mut dispatch);
        }
        dispatch
    }

    /// Pointer or finger release anywhere on the surface.
    ///
    /// A release with no tracked gesture still runs cleanup.
    pub fn pointer_up(&mut self, pos: Point, now: Instant) -> Dispatch {
        let Some(item) = self.gesture else {
            self.cleanup();
            return Dispatch::ignored(InputPhase::PointerUp, IgnoredReason::NoActiveGesture);
        };
        let mut dispatch = Dispatch::forwarded(InputPhase::PointerUp);
        let events = self.normalizer.pointer_up(item, pos);
        if events.is_empty() {
            self.gesture = None;
            self.abort_session(&mut dispatch);
            self.cleanup();
        }
        for event in events {
            self.apply(event, now, &mut dispatch);
        }
        dispatch
    }

    /// Fire due long-press activations and trailing throttled placements.
    pub fn tick(&mut self, now: Instant) -> Dispatch {
        let mut dispatch = Dispatch::forwarded(InputPhase::Tick);
        for event in self.normalizer.poll(now) {
            self.apply(event, now, &mut dispatch);
        }
        self.update_placement(&mut dispatch, |session, container| {
            session.tick(now, container)
        });
        if dispatch.is_empty() {
            dispatch.outcome = DispatchOutcome::Ignored(IgnoredReason::NothingDue);
        }
        dispatch
    }

    /// Advance carousel auto-scroll by one frame.
    pub fn animation_frame(&mut self, now: Instant) -> Dispatch {
        let phase = InputPhase::AnimationFrame;
        let scrolled = {
            let Some(session) = self.session.as_ref() else {
                return Dispatch::ignored(phase, IgnoredReason::NoActiveGesture);
            };
            let velocity = session.velocity();
            let region = self
                .containers
                .get_mut(&session.container)
                .and_then(|registered| registered.container.scroll_mut());
            match region {
                Some(region) if velocity != 0.0 => region.state.scroll_by(velocity),
                _ => 0.0,
            }
        };
        if scrolled == 0.0 {
            return Dispatch::ignored(phase, IgnoredReason::NothingDue);
        }
        tracing::trace!(target: "tilesort.autoscroll", scrolled, "auto-scroll frame");
        let mut dispatch = Dispatch::forwarded(phase);
        dispatch.scrolled = Some(scrolled);
        self.update_placement(&mut dispatch, |session, container| {
            session.reoffer(now, container)
        });
        dispatch
    }

    /// Whether the host should schedule another animation frame.
    #[must_use]
    pub fn wants_animation_frame(&self) -> bool {
        self.session.as_ref().is_some_and(|session| {
            session.wants_frame(
                self.containers
                    .get(&session.container)
                    .and_then(|registered| registered.container.scroll()),
            )
        })
    }

    /// Abruptly end any pending press or active drag.
    ///
    /// The dragged item stays at its original index and the sink is not
    /// invoked. Cleanup runs even when nothing was tracked.
    pub fn interrupt(&mut self) -> Dispatch {
        let mut dispatch = Dispatch::forwarded(InputPhase::Interrupt);
        if let Some(item) = self.gesture.take() {
            if let Some(event) = self.normalizer.cancel(item, CancelReason::Interrupted) {
                dispatch.gestures.push(event);
            }
            if self.phase == (DragPhase::PendingActivation { item }) {
                self.record(
                    &mut dispatch,
                    DragPhase::Idle,
                    DragEffect::PressReverted {
                        item,
                        reason: CancelReason::Interrupted,
                    },
                );
            }
        }
        self.abort_session(&mut dispatch);
        self.normalizer.reset();
        self.cleanup();
        if dispatch.is_empty() {
            dispatch.outcome = DispatchOutcome::Ignored(IgnoredReason::NoActiveGesture);
        }
        dispatch
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn phase(&self) -> DragPhase {
        self.phase
    }

    /// Whether document-level move/end listeners are attached.
    #[must_use]
    pub const fn listeners_registered(&self) -> bool {
        self.listeners
    }

    #[must_use]
    pub fn dragged_item(&self) -> Option<ItemKey> {
        self.session.as_ref().map(|session| session.item)
    }

    /// Container and zone of the placeholder while a drag is active.
    #[must_use]
    pub fn placeholder(&self) -> Option<(&ContainerId, Zone)> {
        self.session
            .as_ref()
            .map(|session| (&session.container, session.zone()))
    }

    #[must_use]
    pub fn placeholder_visual(&self) -> Option<PlaceholderVisual> {
        self.session
            .as_ref()
            .map(|session| PlaceholderVisual::new(session.placeholder_size))
    }

    #[must_use]
    pub fn item_visual(&self, key: ItemKey) -> ItemVisual {
        match &self.session {
            Some(session) if session.item == key => ItemVisual::lifted(session.lifted_rect()),
            _ if self.phase == (DragPhase::PendingActivation { item: key }) => {
                ItemVisual::Pressed {
                    scale: self.config.press_scale,
                }
            }
            _ => ItemVisual::Normal,
        }
    }

    /// Slot sequence to render for `container`.
    pub fn slots(&self, container: &ContainerId) -> Result<Vec<Slot>, RegistryError> {
        let registered = self
            .containers
            .get(container)
            .ok_or_else(|| RegistryError::UnknownContainer(container.clone()))?;
        Ok(match &self.session {
            Some(session) if &session.container == container => registered
                .container
                .slots_with_placeholder(session.item, session.zone()),
            _ => registered
                .container
                .items()
                .iter()
                .map(|item| Slot::Item { key: item.key() })
                .collect(),
        })
    }

    #[must_use]
    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.get(id).map(|registered| &registered.container)
    }

    #[must_use]
    pub fn owner(&self, key: ItemKey) -> Option<&ContainerId> {
        self.owners.get(&key)
    }

    /// Engine key of the item tagged `id` in `container`.
    #[must_use]
    pub fn item_key(&self, container: &ContainerId, id: &str) -> Option<ItemKey> {
        self.container(container)?
            .items()
            .iter()
            .find(|item| item.id() == Some(id))
            .map(Item::key)
    }

    /// Earliest instant at which [`ReorderEngine::tick`] has work to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        let placement = self.session.as_ref().and_then(DragSession::placement_deadline);
        match (self.normalizer.next_deadline(), placement) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn press(
        &mut self,
        phase: InputPhase,
        source: InputSource,
        item: ItemKey,
        pos: Point,
        now: Instant,
    ) -> Dispatch {
        if self.session.is_some() {
            tracing::debug!(
                target: "tilesort.session",
                item = item.0,
                "press rejected: drag already active"
            );
            return Dispatch::ignored(phase, IgnoredReason::ActiveSessionInProgress);
        }
        let exclusions = match self.press_target(item, pos) {
            Ok(exclusions) => exclusions,
            Err(reason) => return Dispatch::ignored(phase, reason),
        };

        let mut dispatch = Dispatch::forwarded(phase);
        if let Some(previous) = self.gesture.filter(|previous| *previous != item)
            && let Some(event) = self.normalizer.cancel(previous, CancelReason::Superseded)
        {
            self.apply(event, now, &mut dispatch);
        }
        let events = match source {
            InputSource::Mouse => {
                self.normalizer
                    .mouse_down(item, MouseButton::Primary, pos, &exclusions, now)
            }
            InputSource::Touch => self.normalizer.touch_start(item, pos, &exclusions, now),
        };
        for event in events {
            self.apply(event, now, &mut dispatch);
        }
        dispatch
    }

    /// Surface-space exclusion rects of a pressable item.
    fn press_target(&self, item: ItemKey, pos: Point) -> Result<Vec<Rect>, IgnoredReason> {
        let container = self
            .owners
            .get(&item)
            .and_then(|id| self.containers.get(id))
            .map(|registered| &registered.container)
            .ok_or(IgnoredReason::UnknownItem)?;
        let entry = container.item(item).ok_or(IgnoredReason::UnknownItem)?;
        if !entry.is_draggable() {
            return Err(IgnoredReason::NotDraggable);
        }
        // Carousel item geometry is in content space.
        let shift = container
            .scroll()
            .map_or(0.0, |region| region.viewport.left() - region.offset());
        let exclusions: Vec<Rect> = entry
            .exclusions()
            .iter()
            .map(|rect| rect.translate(shift, 0.0))
            .collect();
        if exclusions.iter().any(|rect| rect.contains(pos)) {
            return Err(IgnoredReason::InsideExclusion);
        }
        Ok(exclusions)
    }

    fn apply(&mut self, event: GestureEvent, now: Instant, dispatch: &mut Dispatch) {
        dispatch.gestures.push(event);
        match event {
            GestureEvent::Start { item, source, .. } => {
                self.gesture = Some(item);
                if source == InputSource::Touch {
                    self.record(
                        dispatch,
                        DragPhase::PendingActivation { item },
                        DragEffect::PressStarted { item },
                    );
                }
            }
            GestureEvent::Activate { item, source, pos } => {
                self.activate(item, source, pos, dispatch);
            }
            GestureEvent::Move { item, pos } => {
                if self.dragged_item() == Some(item) {
                    self.update_placement(dispatch, |session, container| {
                        session.pointer_moved(now, pos, container)
                    });
                }
            }
            GestureEvent::End { item, pos } => {
                self.gesture = None;
                if self.dragged_item() == Some(item) {
                    self.settle(pos, dispatch);
                } else {
                    self.cleanup();
                }
            }
            GestureEvent::Cancel { item, reason } => {
                if self.gesture == Some(item) {
                    self.gesture = None;
                }
                if self.dragged_item() == Some(item) {
                    self.abort_session(dispatch);
                    self.cleanup();
                } else if self.phase == (DragPhase::PendingActivation { item }) {
                    self.record(
                        dispatch,
                        DragPhase::Idle,
                        DragEffect::PressReverted { item, reason },
                    );
                }
            }
        }
    }

    fn activate(&mut self, item: ItemKey, source: InputSource, pos: Point, dispatch: &mut Dispatch) {
        let session = self
            .owners
            .get(&item)
            .and_then(|id| self.containers.get(id))
            .and_then(|registered| {
                DragSession::activate(&self.config, &registered.container, item, source, pos)
            });
        let Some(session) = session else {
            tracing::debug!(
                target: "tilesort.session",
                item = item.0,
                "activation aborted: container detached"
            );
            if let Some(event) = self.normalizer.cancel(item, CancelReason::Interrupted) {
                dispatch.gestures.push(event);
            }
            self.gesture = None;
            if self.phase != DragPhase::Idle {
                self.record(
                    dispatch,
                    DragPhase::Idle,
                    DragEffect::PressReverted {
                        item,
                        reason: CancelReason::Interrupted,
                    },
                );
            }
            dispatch.outcome = DispatchOutcome::Ignored(IgnoredReason::ContainerDetached);
            return;
        };

        let container = session.container.clone();
        let zone = session.zone();
        tracing::debug!(
            target: "tilesort.session",
            item = item.0,
            container = %container,
            source = ?session.source,
            zone = zone.index(),
            "drag activated"
        );
        if let Some(registered) = self.containers.get_mut(&container)
            && registered.container.kind() == ContainerKind::Carousel
            && let Some(region) = registered.container.scroll_mut()
        {
            region.set_user_scroll_suspended(true);
        }
        self.session = Some(session);
        self.listeners = true;
        self.record(
            dispatch,
            DragPhase::Active { item },
            DragEffect::Activated {
                item,
                container,
                zone,
            },
        );
    }

    fn update_placement<F>(&mut self, dispatch: &mut Dispatch, place: F)
    where
        F: FnOnce(&mut DragSession, &Container) -> Option<Zone>,
    {
        let moved = {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            let Some(registered) = self.containers.get(&session.container) else {
                return;
            };
            let from = session.zone();
            place(session, &registered.container).map(|to| (session.item, from, to))
        };
        if let Some((item, from, to)) = moved {
            dispatch.placement = Some(to);
            self.record(
                dispatch,
                DragPhase::Active { item },
                DragEffect::PlaceholderMoved { item, from, to },
            );
        }
    }

    fn settle(&mut self, pos: Point, dispatch: &mut Dispatch) {
        let Some(mut session) = self.session.take() else {
            self.cleanup();
            return;
        };
        let item = session.item;
        let settled = self.containers.get_mut(&session.container).map(|registered| {
            let before = session.zone();
            let zone = session.settle(pos, &registered.container);
            registered.container.relocate(item, zone);
            let resolved = resolve_order(&registered.container);
            let update = OrderUpdate {
                container: session.container.clone(),
                order: resolved.ids,
                context: registered.container.context().map(str::to_owned),
            };
            (before, zone, update, Rc::clone(&registered.sink))
        });
        let Some((before, zone, update, sink)) = settled else {
            self.cleanup();
            self.record(dispatch, DragPhase::Idle, DragEffect::Interrupted { item });
            return;
        };

        if zone != before {
            dispatch.placement = Some(zone);
        }
        self.record(
            dispatch,
            DragPhase::Settling { item },
            DragEffect::Dropped {
                item,
                container: session.container.clone(),
                from_index: session.original_index,
                to_index: zone.index(),
            },
        );
        self.cleanup();
        self.record(
            dispatch,
            DragPhase::Idle,
            DragEffect::OrderResolved {
                container: update.container.clone(),
                order: update.order.clone(),
            },
        );
        deliver(&sink, &update);
        dispatch.saved = Some(update);
    }

    /// End the active session in place; the item keeps its original index.
    fn abort_session(&mut self, dispatch: &mut Dispatch) {
        if let Some(session) = self.session.take() {
            tracing::debug!(
                target: "tilesort.session",
                item = session.item.0,
                container = %session.container,
                "drag interrupted"
            );
            self.record(
                dispatch,
                DragPhase::Idle,
                DragEffect::Interrupted { item: session.item },
            );
        }
    }

    /// Detach listeners and release suspended scroll regions. Idempotent.
    fn cleanup(&mut self) {
        let dragging = self
            .session
            .as_ref()
            .map(|session| session.container.clone());
        for (id, registered) in &mut self.containers {
            if dragging.as_ref() == Some(id) {
                continue;
            }
            if let Some(region) = registered.container.scroll_mut()
                && region.is_user_scroll_suspended()
            {
                region.set_user_scroll_suspended(false);
            }
        }
        if dragging.is_none() && self.listeners {
            self.listeners = false;
            tracing::debug!(target: "tilesort.session", "drag listeners released");
        }
    }

    fn record(&mut self, dispatch: &mut Dispatch, to: DragPhase, effect: DragEffect) {
        let transition = DragTransition {
            transition_id: self.next_transition_id,
            from: self.phase,
            to,
            effect,
        };
        self.next_transition_id += 1;
        self.phase = to;
        tracing::debug!(
            target: "tilesort.session",
            transition_id = transition.transition_id,
            from = ?transition.from,
            to = ?transition.to,
            effect = ?transition.effect,
            "drag transition"
        );
        dispatch.transitions.push(transition);
    }

    fn ensure_idle(&self, container: &ContainerId) -> Result<(), RegistryError> {
        match &self.session {
            Some(session) if &session.container == container => {
                Err(RegistryError::ContainerBusy(container.clone()))
            }
            _ => Ok(()),
        }
    }

    fn item_entry_mut(&mut self, key: ItemKey) -> Result<&mut Item, RegistryError> {
        let owner = self.owners.get(&key).ok_or(RegistryError::UnknownItem(key))?;
        self.containers
            .get_mut(owner)
            .and_then(|registered| registered.container.item_mut(key))
            .ok_or(RegistryError::UnknownItem(key))
    }

    fn subtree(&self, id: &ContainerId) -> Vec<ContainerId> {
        let mut out = vec![id.clone()];
        let mut cursor = 0;
        while let Some(current) = out.get(cursor) {
            if let Some(registered) = self.containers.get(current) {
                let children = registered.nested.clone();
                out.extend(children);
            }
            cursor += 1;
        }
        out
    }

    fn detach(&mut self, id: &ContainerId) -> Option<Container> {
        let registered = self.containers.remove(id)?;
        let mut container = registered.container;
        for item in container.items_mut() {
            self.owners.remove(&item.key());
            item.set_draggable(false);
        }
        for child in registered.nested {
            if let Some(nested) = self.detach(&child) {
                container = container.with_nested(nested);
            }
        }
        tracing::debug!(target: "tilesort.session", container = %id, "container disabled");
        Some(container)
    }
}

fn flatten(
    mut container: Container,
    parent: Option<ContainerId>,
    out: &mut Vec<(Container, Option<ContainerId>)>,
) {
    let nested = container.take_nested();
    let id = container.id().clone();
    out.push((container, parent));
    for child in nested {
        flatten(child, Some(id.clone()), out);
    }
}
