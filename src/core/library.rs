//! Library configuration (`<libname>/config.toml`).

use std::path::Path;

use serde::Deserialize;
use toml::{Table, Value};

use crate::builder::env::render;
use crate::builder::errors::{BuildError, IoResultExt};
use crate::core::host::Host;

/// Raw `config.toml` contents.
#[derive(Debug, Clone, Deserialize)]
struct LibraryConfig {
    version: String,
    download_url: String,
    #[serde(default)]
    sha256: Option<String>,
    #[serde(default)]
    env: Table,
}

/// A library to fetch and build, with its version already selected.
#[derive(Debug, Clone)]
pub struct LibrarySpec {
    pub name: String,
    pub version: String,
    /// Download URL template; `{version}` is the only placeholder.
    pub download_url_template: String,
    /// Expected sha256 of the source archive, if pinned.
    pub sha256: Option<String>,
    /// Common entries (strings) and per-host entries (tables keyed by triple).
    pub env: Table,
}

impl LibrarySpec {
    /// Load a library spec, optionally overriding the configured version.
    pub fn load(name: &str, path: &Path, version: Option<&str>) -> Result<Self, BuildError> {
        let contents = std::fs::read_to_string(path)
            .io_context(|| format!("failed to read library config: {}", path.display()))?;
        Self::parse(name, &contents, path, version)
    }

    /// Parse a library spec from TOML source.
    pub fn parse(
        name: &str,
        contents: &str,
        path: &Path,
        version: Option<&str>,
    ) -> Result<Self, BuildError> {
        let config: LibraryConfig =
            toml::from_str(contents).map_err(|e| BuildError::config(path, e))?;

        Ok(LibrarySpec {
            name: name.to_string(),
            version: version.map(str::to_string).unwrap_or(config.version),
            download_url_template: config.download_url,
            sha256: config.sha256.map(|s| s.to_ascii_lowercase()),
            env: config.env,
        })
    }

    /// The download URL for the selected version.
    pub fn download_url(&self) -> Result<String, BuildError> {
        render(&self.download_url_template, |key| {
            (key == "version").then_some(self.version.as_str())
        })
        .map_err(|source| BuildError::Template {
            key: "download_url".to_string(),
            source,
        })
    }

    /// `<name>-<version>`, the expected top-level directory of the archive.
    pub fn source_dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Name of the distributable archive (without extension).
    pub fn dist_name(&self, build: &str, host: &Host) -> String {
        format!("{}-{}-{}-{}", self.name, self.version, build, host)
    }

    /// Per-host env entries for `host`, if the library defines any.
    pub fn host_env(&self, host: &Host) -> Option<&Table> {
        match self.env.get(host.triple()) {
            Some(Value::Table(table)) => Some(table),
            _ => None,
        }
    }
}
