//! Build runner: fresh build directories, source unpacking and the
//! library's build script.

use std::path::{Path, PathBuf};

use crate::builder::env::BuildEnvironment;
use crate::builder::errors::BuildError;
use crate::core::host::Host;
use crate::core::library::LibrarySpec;
use crate::core::workspace::Workspace;
use crate::util::archive::unpack_archive;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};

/// Runs one library build for one host.
pub struct BuildRunner<'a> {
    ws: &'a Workspace,
    host: &'a Host,
    lib: &'a LibrarySpec,
    shell: &'a Shell,
}

impl<'a> BuildRunner<'a> {
    pub fn new(ws: &'a Workspace, host: &'a Host, lib: &'a LibrarySpec, shell: &'a Shell) -> Self {
        BuildRunner {
            ws,
            host,
            lib,
            shell,
        }
    }

    /// Directory the build script runs in.
    pub fn build_dir(&self) -> PathBuf {
        self.ws.build_dir(self.host, self.lib)
    }

    /// Directory the build script installs into (`PREFIX`).
    pub fn install_dir(&self) -> PathBuf {
        self.ws.install_dir(self.host, self.lib)
    }

    /// Delete any previous build and install directories for this host.
    pub fn clean(&self) -> Result<(), BuildError> {
        for dir in [self.build_dir(), self.install_dir()] {
            if remove_dir_all_if_exists(&dir)? {
                self.shell
                    .status(Status::Removed, format!("old {}", dir.display()));
            }
        }
        Ok(())
    }

    /// Unpack the source archive, producing a fresh build directory.
    pub fn unpack(&self, archive: &Path) -> Result<PathBuf, BuildError> {
        let build_dir = self.build_dir();
        let parent = self.ws.host_build_dir(self.host);

        self.shell.status(
            Status::Unpacking,
            format!("{} into {}", self.lib.source_dir_name(), parent.display()),
        );
        unpack_archive(archive, &parent)?;

        if !build_dir.is_dir() {
            return Err(BuildError::MissingSourceDir { path: build_dir });
        }
        Ok(build_dir)
    }

    /// Clean, unpack, and run the library's build script with `env`.
    pub fn run(&self, archive: &Path, env: &BuildEnvironment) -> Result<PathBuf, BuildError> {
        self.clean()?;
        let build_dir = self.unpack(archive)?;

        if !self.shell.is_quiet() {
            self.shell.line("");
            self.shell.line("Build environment:");
            for line in env.export_lines() {
                self.shell.line(line);
            }
            self.shell.line("");
        }

        let script = self.ws.build_script(&self.lib.name);
        self.shell.status(
            Status::Building,
            format!("{} v{} for {}", self.lib.name, self.lib.version, self.host),
        );
        run_build_script(&script, &build_dir, env)?;

        Ok(self.install_dir())
    }
}

/// Run a build script in `cwd` with exactly `env` as its environment.
pub fn run_build_script(
    script: &Path,
    cwd: &Path,
    env: &BuildEnvironment,
) -> Result<(), BuildError> {
    if !script.is_file() {
        return Err(BuildError::ToolNotFound {
            tool: script.display().to_string(),
        });
    }

    let status = ProcessBuilder::new(script)
        .cwd(cwd)
        .build_env(env)
        .status()?;

    if !status.success() {
        return Err(BuildError::BuildFailed {
            script: script.to_path_buf(),
            status: status.code(),
        });
    }
    Ok(())
}
