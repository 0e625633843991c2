//! High-level operations.
//!
//! This module contains the implementation of the `build-dep` command.

pub mod build_dep;
pub mod fetch;
pub mod package;

pub use build_dep::{build_dep, BuildOptions, BuildReport, HostOutcome};
pub use fetch::{archive_file_name, fetch};
pub use package::{package, relativize_symlinks, PackageOptions};
