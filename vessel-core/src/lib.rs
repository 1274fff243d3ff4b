//! Shared types for the container-launcher core.
//!
//! This crate holds the pieces several of the launcher's components
//! need in common: the table of known architectures, the host lookup
//! root abstraction, the error vocabulary, and the trait interfaces to
//! the out-of-core collaborators (runtime provisioning, graphics
//! driver selection).

#![warn(missing_docs)]

pub use self::{
    arch::{Architecture, ARCHITECTURES, I386, X86_64},
    collaborators::{GraphicsMountPoint, GraphicsProvider, RuntimeProvider},
    error::{AlreadyWarned, Error, Result, Severity},
    host_root::HostRoot,
};

pub mod arch;
mod collaborators;
mod error;
mod host_root;
