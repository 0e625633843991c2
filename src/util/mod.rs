//! Shared utilities

pub mod archive;
pub mod fs;
pub mod hash;
pub mod process;
pub mod shell;

pub use shell::{ColorChoice, Shell, Status, Verbosity};
