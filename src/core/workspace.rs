//! Workspace layout.
//!
//! Every path the pipeline reads or writes is derived from one explicit
//! workspace root:
//!
//! ```text
//! <root>/
//!   <libname>/config.toml     library config
//!   <libname>/build.sh        library build script
//!   host/<host>.toml          host config
//!   bin/                      compiler shims for Apple platforms
//!   downloads/<filename>      archive cache
//!   build/<host>/<libname>-<version>/
//!   install/<host>/<libname>/
//!   dist/<libname>-<version>-<build>-<host>.tar.gz
//! ```

use std::path::{Path, PathBuf};

use crate::builder::errors::{BuildError, IoResultExt};
use crate::core::host::Host;
use crate::core::library::LibrarySpec;

/// Resolved workspace paths.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace rooted at `root`.
    ///
    /// The root is canonicalized so that every derived path, including
    /// `PREFIX`, is absolute.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, BuildError> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .io_context(|| format!("workspace root not found: {}", root.display()))?;
        Ok(Workspace { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<libname>/config.toml`
    pub fn library_config(&self, libname: &str) -> PathBuf {
        self.root.join(libname).join("config.toml")
    }

    /// `<root>/<libname>/build.sh`
    pub fn build_script(&self, libname: &str) -> PathBuf {
        self.root.join(libname).join("build.sh")
    }

    /// `<root>/host/<host>.toml`
    pub fn host_config(&self, host: &Host) -> PathBuf {
        self.root.join("host").join(format!("{}.toml", host))
    }

    /// Compiler shim directory used as the tools path on Apple platforms.
    pub fn shim_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Archive cache shared by all hosts and libraries.
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    /// Parent of every per-host build directory.
    pub fn host_build_dir(&self, host: &Host) -> PathBuf {
        self.root.join("build").join(host.triple())
    }

    /// `<root>/build/<host>/<libname>-<version>`
    pub fn build_dir(&self, host: &Host, lib: &LibrarySpec) -> PathBuf {
        self.host_build_dir(host).join(lib.source_dir_name())
    }

    /// `<root>/install/<host>/<libname>`
    pub fn install_dir(&self, host: &Host, lib: &LibrarySpec) -> PathBuf {
        self.root.join("install").join(host.triple()).join(&lib.name)
    }

    /// Flat output directory for packaged archives.
    pub fn dist_dir(&self) -> PathBuf {
        self.root.join("dist")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_layout() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        let root = tmp.path().canonicalize().unwrap();

        let lib = LibrarySpec::parse(
            "bzip2",
            "version = \"1.0.8\"\ndownload_url = \"https://example.com/bzip2-{version}.tar.gz\"\n",
            Path::new("bzip2/config.toml"),
            None,
        )
        .unwrap();
        let host = Host::new("x86_64-linux-android").unwrap();

        assert_eq!(ws.library_config("bzip2"), root.join("bzip2/config.toml"));
        assert_eq!(ws.build_script("bzip2"), root.join("bzip2/build.sh"));
        assert_eq!(
            ws.host_config(&host),
            root.join("host/x86_64-linux-android.toml")
        );
        assert_eq!(
            ws.build_dir(&host, &lib),
            root.join("build/x86_64-linux-android/bzip2-1.0.8")
        );
        assert_eq!(
            ws.install_dir(&host, &lib),
            root.join("install/x86_64-linux-android/bzip2")
        );
        assert_eq!(ws.downloads_dir(), root.join("downloads"));
        assert_eq!(ws.dist_dir(), root.join("dist"));
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(Workspace::new(tmp.path().join("nope")).is_err());
    }
}
