#![forbid(unsafe_code)]

//! Core: geometry, tunables, gesture normalization, and time throttling.
//!
//! # Role in Tilesort
//! `tilesort-core` is the input layer. It turns raw pointer and touch input
//! into one normalized gesture stream and owns the named constants every
//! other layer is tuned by.
//!
//! # Primary responsibilities
//! - **Geometry**: `f64` logical-pixel points, sizes and rectangles.
//! - **ReorderConfig**: every timing and distance threshold, loadable from
//!   TOML or JSON.
//! - **GestureNormalizer**: mouse and touch adapters emitting the same
//!   `Start` / `Activate` / `Move` / `End` / `Cancel` shape.
//! - **Throttle**: leading plus trailing edge rate limiting for placement
//!   recomputation.
//!
//! # How it fits in the system
//! `tilesort-layout` consumes geometry and config to place the placeholder;
//! `tilesort` consumes gesture events to drive the drag session.

pub mod config;
pub mod geometry;
pub mod gesture;
pub mod throttle;

pub use config::{ConfigError, ReorderConfig};
pub use geometry::{Point, Rect, Size};
pub use gesture::{
    CancelReason, GestureAdapter, GestureEvent, GestureNormalizer, InputSource, ItemKey,
    MouseAdapter, MouseButton, TouchAdapter,
};
pub use throttle::Throttle;
