//! Test utilities for build-dep unit tests.
//!
//! Provides on-disk fixtures instead of mocks: a workspace with a library
//! config, a build script and a source archive served over `file://`, and a
//! fake Android SDK whose `sdkmanager` records its invocations.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::{android_host_toml, FakeAndroidSdk, WorkspaceFixture};
//!
//! #[test]
//! fn test_example() {
//!     let fixture = WorkspaceFixture::new("xz", "5.4.7");
//!     let sdk = FakeAndroidSdk::new(fixture.path(), "27.1.12297006");
//!     fixture.write_host("aarch64-linux-android", &android_host_toml("27.1.12297006"));
//!     // Run the pipeline against fixture.workspace()...
//! }
//! ```

pub mod fixtures;

use std::fs;
use std::path::{Path, PathBuf};

pub use fixtures::*;

/// An Android SDK layout with a scripted `sdkmanager` and one NDK.
#[derive(Debug, Clone)]
pub struct FakeAndroidSdk {
    /// Value to use for `ANDROID_HOME`.
    pub root: PathBuf,
    /// The NDK version laid out on disk.
    pub ndk_version: String,
}

impl FakeAndroidSdk {
    /// Lay out an SDK under `<base>/android-sdk`.
    pub fn new(base: &Path, ndk_version: &str) -> Self {
        let sdk = FakeAndroidSdk {
            root: base.join("android-sdk"),
            ndk_version: ndk_version.to_string(),
        };

        fs::create_dir_all(sdk.toolchain_bin()).expect("failed to create NDK toolchain dir");
        write_executable(
            &sdk.sdkmanager(),
            &format!(
                "#!/bin/sh\necho \"$@\" >> \"{}\"\n",
                sdk.log_path().display()
            ),
        );
        sdk
    }

    /// `cmdline-tools/latest/bin/sdkmanager`
    pub fn sdkmanager(&self) -> PathBuf {
        self.root.join("cmdline-tools/latest/bin/sdkmanager")
    }

    /// The NDK's prebuilt LLVM `bin` directory.
    pub fn toolchain_bin(&self) -> PathBuf {
        self.root
            .join("ndk")
            .join(&self.ndk_version)
            .join("toolchains/llvm/prebuilt/linux-x86_64/bin")
    }

    /// Arguments of every `sdkmanager` invocation so far.
    pub fn sdkmanager_calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Make every later `sdkmanager` invocation exit with status 1.
    pub fn fail_sdkmanager(&self) {
        write_executable(&self.sdkmanager(), "#!/bin/sh\necho \"license not accepted\" >&2\nexit 1\n");
    }

    fn log_path(&self) -> PathBuf {
        self.root.join("sdkmanager.log")
    }
}

/// Write a file and mark it executable.
pub fn write_executable(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    fs::write(path, contents).expect("failed to write executable");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .expect("failed to set permissions");
    }
}

/// Host config for an Android host using `ndk_version`.
pub fn android_host_toml(ndk_version: &str) -> String {
    format!(
        r#"ndk_version = "{ndk_version}"
CC = "clang"
CFLAGS = "-fPIC"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_fake_sdk_layout() {
        let tmp = TempDir::new().unwrap();
        let sdk = FakeAndroidSdk::new(tmp.path(), "26.3.11579264");

        assert!(sdk.sdkmanager().is_file());
        assert!(sdk.toolchain_bin().is_dir());
        assert!(sdk.sdkmanager_calls().is_empty());

        let status = std::process::Command::new(sdk.sdkmanager())
            .arg("ndk;26.3.11579264")
            .status()
            .unwrap();
        assert!(status.success());
        assert_eq!(sdk.sdkmanager_calls(), vec!["ndk;26.3.11579264"]);
    }

    #[test]
    fn test_android_host_toml() {
        let toml = android_host_toml("27.1.12297006");
        assert!(toml.contains("ndk_version = \"27.1.12297006\""));
    }
}
