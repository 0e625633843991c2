//! Implementation of `build-dep <libname>`.
//!
//! The library config is loaded and its archive fetched once; each selected
//! host then runs its own pipeline (host config, toolchain, environment,
//! build script, packaging). A failure in one host's pipeline is recorded
//! in the [`BuildReport`] and does not stop the remaining hosts.

use std::path::{Path, PathBuf};

use crate::builder::errors::BuildError;
use crate::builder::runner::BuildRunner;
use crate::builder::toolchain::ToolchainResolver;
use crate::core::host::{Host, HostSelector, HostSpec};
use crate::core::library::LibrarySpec;
use crate::core::workspace::Workspace;
use crate::ops::fetch::fetch;
use crate::ops::package::{package, PackageOptions};
use crate::util::shell::{Shell, Status};

/// Width of the separator printed between hosts.
const SEPARATOR_WIDTH: usize = 80;

/// Options for a build-dep run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Library directory name under the workspace root.
    pub libname: String,
    /// Version overriding the library config's default.
    pub version: Option<String>,
    /// Build number recorded in archive names.
    pub build: String,
    /// Hosts to build for; `None` only fetches the source.
    pub hosts: Option<HostSelector>,
}

impl BuildOptions {
    pub fn new(libname: impl Into<String>) -> Self {
        BuildOptions {
            libname: libname.into(),
            version: None,
            build: "0".to_string(),
            hosts: None,
        }
    }
}

/// Result of one host's pipeline.
#[derive(Debug)]
pub struct HostOutcome {
    pub host: String,
    /// Path of the packaged archive on success.
    pub result: Result<PathBuf, BuildError>,
}

/// Summary of a run.
#[derive(Debug)]
pub struct BuildReport {
    /// The cached source archive.
    pub archive: PathBuf,
    /// One entry per processed host, in build order.
    pub outcomes: Vec<HostOutcome>,
}

impl BuildReport {
    /// Hosts whose pipeline failed.
    pub fn failures(&self) -> impl Iterator<Item = &HostOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Packaged archives, in build order.
    pub fn packages(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(PathBuf::as_path)
            .collect()
    }
}

/// Fetch a library and build it for every selected host.
///
/// Errors returned directly are fatal to the whole run; per-host failures
/// are reported through [`BuildReport::outcomes`].
pub fn build_dep(
    ws: &Workspace,
    opts: &BuildOptions,
    resolver: &ToolchainResolver,
    shell: &Shell,
) -> Result<BuildReport, BuildError> {
    let lib = LibrarySpec::load(
        &opts.libname,
        &ws.library_config(&opts.libname),
        opts.version.as_deref(),
    )?;

    shell.note(format!("{} v{} build {}", lib.name, lib.version, opts.build));
    let archive = fetch(&lib, ws, shell)?;

    let Some(selector) = &opts.hosts else {
        shell.line("");
        shell.line("No host specified; source has been downloaded but not built.");
        return Ok(BuildReport {
            archive,
            outcomes: Vec::new(),
        });
    };

    let triples = selector.triples();
    let mut outcomes = Vec::with_capacity(triples.len());

    for triple in &triples {
        if triples.len() > 1 {
            shell.line("=".repeat(SEPARATOR_WIDTH));
        }

        let result = Host::new(*triple).and_then(|host| {
            shell.note(format!("{} v{} for {}", lib.name, lib.version, host));
            build_host(ws, &lib, &archive, &host, opts, resolver, shell)
        });

        match &result {
            Ok(path) => shell.status(
                Status::Finished,
                format!("{} for {} ({})", lib.source_dir_name(), triple, path.display()),
            ),
            Err(err) => {
                if err.is_build_failure() {
                    shell.error("*** BUILD FAILED ***");
                }
                shell.error(format!("{}: {}", triple, err));
            }
        }

        outcomes.push(HostOutcome {
            host: triple.to_string(),
            result,
        });
    }

    Ok(BuildReport { archive, outcomes })
}

/// Run the pipeline for one host, returning the packaged archive.
fn build_host(
    ws: &Workspace,
    lib: &LibrarySpec,
    archive: &Path,
    host: &Host,
    opts: &BuildOptions,
    resolver: &ToolchainResolver,
    shell: &Shell,
) -> Result<PathBuf, BuildError> {
    let spec = HostSpec::load(host.clone(), &ws.host_config(host))?;
    let toolchain = resolver.resolve(&spec, shell)?;

    let runner = BuildRunner::new(ws, host, lib, shell);
    let env = toolchain.into_environment(&spec, lib, &runner.install_dir())?;
    let install_dir = runner.run(archive, &env)?;

    let package_opts = PackageOptions {
        lib,
        host,
        build: &opts.build,
    };
    package(ws, &install_dir, &package_opts, shell)
}
