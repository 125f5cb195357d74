#![forbid(unsafe_code)]

//! Tilesort: direct-manipulation reordering for tile containers.
//!
//! A host registers [`Container`]s (a fixed-column grid or a horizontally
//! scrolling carousel) with a [`ReorderEngine`], feeds it pointer and touch
//! input plus timer ticks and animation frames, renders whatever
//! [`ReorderEngine::slots`] and the visual accessors describe, and receives
//! the new identifier order through an [`OrderSink`] once a drop settles.
//!
//! ```text
//! raw input ─▶ GestureNormalizer ─▶ drag session ─▶ Placer<Grid|Carousel>
//!                                         │
//!                                   release ─▶ resolve_order ─▶ OrderSink
//! ```
//!
//! The engine never touches a DOM or a renderer. It tracks one ordered item
//! list per container and one placeholder zone; re-parenting is the host's
//! concern.

pub mod container;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod resolver;
pub mod session;

pub use container::{Container, ContainerId, ContainerKind, Item, ScrollRegion, Slot};
pub use engine::{Dispatch, DispatchOutcome, IgnoredReason, InputPhase, ReorderEngine};
pub use error::RegistryError;
pub use feedback::{ItemVisual, LIFTED_Z_INDEX, PlaceholderVisual};
pub use resolver::{OrderSink, OrderUpdate, PersistError, ResolvedOrder, resolve_order};
pub use session::{DragEffect, DragPhase, DragTransition};

pub use tilesort_core::{
    CancelReason, GestureEvent, InputSource, ItemKey, MouseButton, Point, Rect, ReorderConfig,
    Size,
};
pub use tilesort_layout::{ScrollState, Zone};
