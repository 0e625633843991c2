//! Build environment construction and build script execution.
//!
//! This module turns host and library configuration into the environment a
//! library's build script runs with, and runs it.

pub mod env;
pub mod errors;
pub mod runner;
pub mod toolchain;

pub use env::{render, BuildEnvironment, TemplateError};
pub use errors::BuildError;
pub use runner::BuildRunner;
pub use toolchain::{Toolchain, ToolchainResolver};
