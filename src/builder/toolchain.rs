//! Platform toolchain resolution.
//!
//! Each platform contributes a partial environment and a tools path:
//!
//! - Android: ensures the host's NDK version is installed through the SDK
//!   manager, and uses the NDK's prebuilt LLVM `bin` directory.
//! - iOS / macOS: asks `xcrun` for the SDK path and uses the workspace's
//!   compiler shim directory.
//!
//! The partial environment is then merged with the host config and the
//! library config, and finalized with `PATH`, `PREFIX` and `CPU_COUNT`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};

use crate::builder::env::BuildEnvironment;
use crate::builder::errors::BuildError;
use crate::core::host::HostSpec;
use crate::core::library::LibrarySpec;
use crate::util::process::{find_executable, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// Environment variable naming the Android SDK root.
pub const ANDROID_HOME: &str = "ANDROID_HOME";

/// System directories appended to `PATH` after the tools path.
pub const SYSTEM_PATHS: &[&str] = &[
    "/usr/bin",
    "/bin",
    "/usr/sbin",
    "/sbin",
    "/Library/Apple/usr/bin",
];

/// Platform-specific part of a build environment.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Variables contributed by the platform (`ANDROID_HOME`, `SDK_ROOT`).
    pub env: BuildEnvironment,
    /// Directory holding the compilers, placed first on `PATH`.
    pub tools_path: PathBuf,
}

impl Toolchain {
    /// Merge host and library configuration on top of the platform values
    /// and finalize `PATH`, `PREFIX` and `CPU_COUNT`.
    pub fn into_environment(
        self,
        host: &HostSpec,
        lib: &LibrarySpec,
        prefix: &Path,
    ) -> Result<BuildEnvironment, BuildError> {
        let mut env = self.env;

        env.update(&host.env)?;
        env.update(&lib.env)?;
        if let Some(host_env) = lib.host_env(&host.host) {
            env.update(host_env)?;
        }

        let cargo_bin =
            directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".cargo").join("bin"));
        env.set("PATH", search_path(&self.tools_path, cargo_bin.as_deref()));
        env.set("PREFIX", prefix.display().to_string());
        env.set("CPU_COUNT", cpu_count().to_string());

        Ok(env)
    }
}

/// Build the executable search path: tools, cargo bin, then system dirs.
pub fn search_path(tools_path: &Path, cargo_bin: Option<&Path>) -> String {
    let mut entries: Vec<PathBuf> = vec![tools_path.to_path_buf()];
    entries.extend(cargo_bin.map(Path::to_path_buf));
    entries.extend(SYSTEM_PATHS.iter().map(PathBuf::from));

    std::env::join_paths(&entries)
        .unwrap_or_else(|_| {
            OsString::from(
                entries
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(":"),
            )
        })
        .to_string_lossy()
        .into_owned()
}

/// Number of logical CPUs available to the build.
pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// Resolves the toolchain for a host.
#[derive(Debug, Clone)]
pub struct ToolchainResolver {
    android_home: Option<PathBuf>,
    shim_dir: PathBuf,
}

impl ToolchainResolver {
    /// Create a resolver with an explicit Android SDK root.
    pub fn new(shim_dir: impl Into<PathBuf>, android_home: Option<PathBuf>) -> Self {
        ToolchainResolver {
            android_home,
            shim_dir: shim_dir.into(),
        }
    }

    /// Create a resolver reading the Android SDK root from `ANDROID_HOME`.
    pub fn from_env(shim_dir: impl Into<PathBuf>) -> Self {
        let android_home = std::env::var_os(ANDROID_HOME)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(shim_dir, android_home)
    }

    /// Resolve the toolchain for `host`.
    pub fn resolve(&self, host: &HostSpec, shell: &Shell) -> Result<Toolchain, BuildError> {
        match host.host.platform().apple_sdk() {
            Some(sdk) => self.resolve_apple(sdk, shell),
            None => {
                let ndk_version = host.ndk_version.as_deref().ok_or_else(|| {
                    BuildError::config(
                        format!("host/{}.toml", host.host),
                        "`ndk_version` is required for Android hosts",
                    )
                })?;
                self.resolve_android(ndk_version, shell)
            }
        }
    }

    fn resolve_android(&self, ndk_version: &str, shell: &Shell) -> Result<Toolchain, BuildError> {
        let android_home = self
            .android_home
            .as_deref()
            .ok_or(BuildError::MissingEnv { var: ANDROID_HOME })?;

        shell.status(
            Status::Resolving,
            format!("NDK {} (ensuring it is installed)", ndk_version),
        );
        install_ndk(android_home, ndk_version)?;

        let toolchain_dir = find_ndk_toolchain(android_home, ndk_version)?;
        tracing::debug!("using NDK toolchain {}", toolchain_dir.display());

        let mut env = BuildEnvironment::new();
        env.set(ANDROID_HOME, android_home.display().to_string());

        Ok(Toolchain {
            env,
            tools_path: toolchain_dir.join("bin"),
        })
    }

    fn resolve_apple(&self, sdk: &str, shell: &Shell) -> Result<Toolchain, BuildError> {
        shell.status(Status::Resolving, format!("{} SDK", sdk));
        let sdk_root = apple_sdk_path(sdk)?;
        tracing::debug!("SDK_ROOT={}", sdk_root);

        let mut env = BuildEnvironment::new();
        env.set("SDK_ROOT", sdk_root);

        Ok(Toolchain {
            env,
            tools_path: self.shim_dir.clone(),
        })
    }
}

/// Path of the SDK manager inside an Android SDK.
pub fn sdkmanager_path(android_home: &Path) -> PathBuf {
    android_home
        .join("cmdline-tools")
        .join("latest")
        .join("bin")
        .join("sdkmanager")
}

/// Install (or confirm) an NDK version with the SDK manager.
pub fn install_ndk(android_home: &Path, ndk_version: &str) -> Result<(), BuildError> {
    let sdkmanager = sdkmanager_path(android_home);
    if !sdkmanager.is_file() {
        return Err(BuildError::ToolNotFound {
            tool: sdkmanager.display().to_string(),
        });
    }

    ProcessBuilder::new(&sdkmanager)
        .arg(format!("ndk;{}", ndk_version))
        .status_and_check()
}

/// Locate the single prebuilt LLVM toolchain directory of an NDK.
///
/// The directory name depends on the machine running the build
/// (`linux-x86_64`, `darwin-x86_64`, ...); exactly one must exist.
pub fn find_ndk_toolchain(android_home: &Path, ndk_version: &str) -> Result<PathBuf, BuildError> {
    let prebuilt = android_home
        .join("ndk")
        .join(ndk_version)
        .join("toolchains")
        .join("llvm")
        .join("prebuilt");

    let pattern = format!("{}/*", Pattern::escape(&prebuilt.to_string_lossy()));
    let entries = glob(&pattern).map_err(|e| BuildError::ToolchainResolution {
        path: prebuilt.clone(),
        message: e.to_string(),
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|p| p.is_dir())
        .collect();
    candidates.sort();

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(BuildError::ToolchainResolution {
            path: prebuilt,
            message: "no prebuilt toolchain directory found".to_string(),
        }),
        n => Err(BuildError::ToolchainResolution {
            path: prebuilt,
            message: format!(
                "expected one prebuilt toolchain directory, found {}: {}",
                n,
                candidates
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

/// Ask `xcrun` for the path of an Apple SDK.
pub fn apple_sdk_path(sdk: &str) -> Result<String, BuildError> {
    let xcrun = find_executable("xcrun")?;
    let output = ProcessBuilder::new(xcrun)
        .args(["--sdk", sdk, "--show-sdk-path"])
        .exec_and_check()?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
