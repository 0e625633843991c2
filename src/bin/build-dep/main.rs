//! build-dep CLI - fetch, cross-compile and package native libraries

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

use build_dep::builder::toolchain::ToolchainResolver;
use build_dep::ops::{self, BuildOptions};
use build_dep::util::Shell;
use build_dep::{BuildError, Workspace};

mod cli;

use cli::Cli;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            if let Some(help) = e.downcast_ref::<BuildError>().and_then(|err| err.help()) {
                eprintln!("  help: {}", help);
            }
            ExitCode::FAILURE
        }
    }
}

/// Run the command, returning whether every host succeeded.
fn run() -> Result<bool> {
    let cli = Cli::parse();

    let filter = match std::env::var("BUILD_DEP_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ if cli.verbose => EnvFilter::new("build_dep=debug"),
        _ => EnvFilter::new("build_dep=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color);

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("failed to determine the current directory")?,
    };
    let ws = Workspace::new(&root)?;
    tracing::debug!("workspace root: {}", ws.root().display());

    let resolver = ToolchainResolver::from_env(ws.shim_dir());
    let opts = BuildOptions {
        libname: cli.libname,
        version: cli.version,
        build: cli.build,
        hosts: cli.host,
    };

    let report = ops::build_dep(&ws, &opts, &resolver, &shell)?;

    let failed: Vec<&str> = report.failures().map(|o| o.host.as_str()).collect();
    if !failed.is_empty() {
        shell.error(format!(
            "{} of {} host(s) failed: {}",
            failed.len(),
            report.outcomes.len(),
            failed.join(", ")
        ));
    }

    Ok(report.is_success())
}
