//! Workspace fixtures.
//!
//! A [`WorkspaceFixture`] owns a temporary directory laid out as:
//!
//! ```text
//! <tmp>/ws/<lib>/config.toml          download_url points at upstream/
//! <tmp>/ws/<lib>/build.sh
//! <tmp>/upstream/<lib>-<version>.tar.gz
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use crate::core::library::LibrarySpec;
use crate::core::workspace::Workspace;

use super::write_executable;

/// Default build script: installs a header and a versioned shared library
/// with an absolute symlink, plus `bin/` and `man/` trees that packaging
/// is expected to drop.
pub const DEFAULT_BUILD_SCRIPT: &str = r#"#!/bin/sh
set -e
./configure
mkdir -p "$PREFIX/include" "$PREFIX/lib" "$PREFIX/bin" "$PREFIX/man/man1"
cp *.h "$PREFIX/include/"
echo "shared object" > "$PREFIX/lib/libfixture.so.1"
ln -s "$PREFIX/lib/libfixture.so.1" "$PREFIX/lib/libfixture.so"
echo "tool" > "$PREFIX/bin/fixture-tool"
echo "page" > "$PREFIX/man/man1/fixture-tool.1"
"#;

/// A throwaway workspace holding one library.
pub struct WorkspaceFixture {
    tmp: TempDir,
    pub name: String,
    pub version: String,
}

impl WorkspaceFixture {
    /// Create a workspace for `name` at `version` with the default build
    /// script and a matching upstream source archive.
    pub fn new(name: &str, version: &str) -> Self {
        let fixture = WorkspaceFixture {
            tmp: TempDir::new().expect("failed to create temp dir"),
            name: name.to_string(),
            version: version.to_string(),
        };

        fs::create_dir_all(fixture.root()).expect("failed to create workspace root");
        fixture.write_source_archive(version);
        fixture.write_config(&format!(
            "version = \"{}\"\ndownload_url = \"{}\"\n\n[env]\nCFLAGS = \"-O2\"\n",
            version,
            fixture.download_url_template()
        ));
        fixture.write_build_script(DEFAULT_BUILD_SCRIPT);
        fixture
    }

    /// The temporary directory holding the workspace and upstream files.
    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    /// The workspace root.
    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("ws")
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.root()).expect("failed to open workspace")
    }

    pub fn library(&self) -> LibrarySpec {
        let ws = self.workspace();
        LibrarySpec::load(&self.name, &ws.library_config(&self.name), None)
            .expect("failed to load library config")
    }

    /// Directory serving upstream archives.
    pub fn upstream_dir(&self) -> PathBuf {
        self.tmp.path().join("upstream")
    }

    /// The upstream source archive for the fixture's version.
    pub fn archive(&self) -> PathBuf {
        self.archive_for(&self.version)
    }

    pub fn archive_for(&self, version: &str) -> PathBuf {
        self.upstream_dir()
            .join(format!("{}-{}.tar.gz", self.name, version))
    }

    /// `file://` URL template with a `{version}` placeholder.
    pub fn download_url_template(&self) -> String {
        format!("file://{}/{}-{{version}}.tar.gz", self.upstream_dir().display(), self.name)
    }

    pub fn write_config(&self, contents: &str) {
        let dir = self.root().join(&self.name);
        fs::create_dir_all(&dir).expect("failed to create library dir");
        fs::write(dir.join("config.toml"), contents).expect("failed to write config.toml");
    }

    pub fn write_build_script(&self, contents: &str) {
        write_executable(&self.root().join(&self.name).join("build.sh"), contents);
    }

    /// Write `host/<triple>.toml`.
    pub fn write_host(&self, triple: &str, contents: &str) {
        let dir = self.root().join("host");
        fs::create_dir_all(&dir).expect("failed to create host dir");
        fs::write(dir.join(format!("{}.toml", triple)), contents)
            .expect("failed to write host config");
    }

    /// Package `<name>-<version>/` sources as an upstream tar.gz.
    pub fn write_source_archive(&self, version: &str) -> PathBuf {
        let path = self.archive_for(version);
        fs::create_dir_all(self.upstream_dir()).expect("failed to create upstream dir");

        let top = format!("{}-{}", self.name, version);
        let file = File::create(&path).expect("failed to create archive");
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        let configure = "#!/bin/sh\necho configured > configured.txt\n";
        let header_name = format!("{}.h", self.name);
        let header = format!("#define {}_VERSION \"{}\"\n", self.name.to_uppercase(), version);
        for (name, contents, mode) in [
            ("configure", configure.as_bytes(), 0o755),
            (header_name.as_str(), header.as_bytes(), 0o644),
        ] {
            let mut entry = tar::Header::new_gnu();
            entry.set_size(contents.len() as u64);
            entry.set_mode(mode);
            entry.set_cksum();
            builder
                .append_data(&mut entry, format!("{}/{}", top, name), contents)
                .expect("failed to append archive entry");
        }

        builder
            .into_inner()
            .and_then(|gz| gz.finish())
            .expect("failed to finish archive");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = WorkspaceFixture::new("zlib", "1.3.1");
        assert!(fixture.root().join("zlib/config.toml").is_file());
        assert!(fixture.root().join("zlib/build.sh").is_file());
        assert!(fixture.archive().is_file());

        let lib = fixture.library();
        assert_eq!(lib.version, "1.3.1");
        assert_eq!(
            lib.download_url().unwrap(),
            format!("file://{}", fixture.archive().display())
        );
    }
}
