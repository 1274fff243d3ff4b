//! Plans the container's filesystem view.
//!
//! The [`ExportsPlanner`] accumulates `(path, mode)` requests against a
//! [`vessel_core::HostRoot`], rejects anything in the reserved set,
//! mirrors host symlink ancestors, and guards against unresponsive
//! autofs mounts, then finalizes everything into a deterministic
//! sequence of mount [`Op`]s for the Wrap supervisor to turn into a
//! container-helper argument vector.

#![warn(missing_docs)]

pub use self::{
    entry::Entry,
    mode::Mode,
    op::Op,
    planner::{ExportsPlanner, Visibility},
};

pub mod autofs;
mod entry;
mod mode;
mod op;
mod planner;
