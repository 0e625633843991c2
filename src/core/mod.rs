//! Core data structures for build-dep.
//!
//! This module contains the configuration model:
//! - Host triples, platforms and host groups
//! - Library configuration
//! - Workspace layout

pub mod host;
pub mod library;
pub mod workspace;

pub use host::{Host, HostGroup, HostSelector, HostSpec, Platform};
pub use library::LibrarySpec;
pub use workspace::Workspace;
