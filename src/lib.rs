//! build-dep - fetch, cross-compile and package native libraries
//!
//! This crate provides the library functionality behind the `build-dep`
//! binary: host and library configuration, toolchain resolution for
//! Android, iOS and macOS, the per-host build pipeline, and packaging of
//! install trees into distributable archives.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test fixtures for build-dep unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides on-disk workspaces, upstream archives and a
/// fake Android SDK.
#[cfg(test)]
pub mod test_support;

pub use core::{
    host::{Host, HostGroup, HostSelector, HostSpec, Platform},
    library::LibrarySpec,
    workspace::Workspace,
};

pub use builder::errors::BuildError;
pub use ops::{build_dep, BuildOptions, BuildReport};
