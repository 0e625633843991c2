//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use build_dep::util::ColorChoice;
use build_dep::HostSelector;

/// Build binary dependencies for Android, iOS and macOS
#[derive(Parser)]
#[command(name = "build-dep")]
#[command(author, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Name of the library to build (a directory under the workspace root)
    pub libname: String,

    /// Build number recorded in the archive name
    #[arg(long, default_value = "0")]
    pub build: String,

    /// Host triple or group (android, iOS, macOS, all); omit to only fetch
    #[arg(long, value_parser = parse_host)]
    pub host: Option<HostSelector>,

    /// Library version (defaults to the version in config.toml)
    #[arg(long)]
    pub version: Option<String>,

    /// Workspace root holding library, host and output directories
    #[arg(long, env = "BUILD_DEP_ROOT")]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, default_value = "auto", value_parser = parse_color)]
    pub color: ColorChoice,
}

fn parse_host(s: &str) -> Result<HostSelector, String> {
    s.parse()
}

fn parse_color(s: &str) -> Result<ColorChoice, String> {
    s.parse()
}
