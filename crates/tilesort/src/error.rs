#![forbid(unsafe_code)]

//! Registration API errors.
//!
//! Input handling never returns these: rejected gestures surface as
//! [`IgnoredReason`](crate::IgnoredReason) on the dispatch record instead.

use tilesort_core::ItemKey;

use crate::container::ContainerId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("container `{0}` is already enabled")]
    DuplicateContainer(ContainerId),
    #[error("container `{0}` is not enabled")]
    UnknownContainer(ContainerId),
    #[error("item {0:?} is not registered")]
    UnknownItem(ItemKey),
    #[error("container `{0}` hosts the active drag")]
    ContainerBusy(ContainerId),
    #[error("container `{container}` is not a carousel")]
    NotACarousel { container: ContainerId },
}
