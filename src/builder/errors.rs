//! Build error types.
//!
//! Every external process invocation and filesystem operation in the
//! pipeline produces a [`BuildError`]. The driver decides per call site
//! whether an error ends the whole run or only the current host.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::env::TemplateError;

/// Error raised anywhere in the fetch/build/package pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("invalid configuration in {}: {message}", .path.display())]
    #[diagnostic(code(build_dep::config))]
    Config { path: PathBuf, message: String },

    #[error("cannot expand `{key}`: {source}")]
    #[diagnostic(
        code(build_dep::template),
        help("placeholders can only reference keys merged earlier: host config, then library env, then per-host library env")
    )]
    Template {
        key: String,
        #[source]
        source: TemplateError,
    },

    #[error("unsupported host `{0}`")]
    #[diagnostic(
        code(build_dep::host),
        help("host triples must contain `-android`, `-ios` or `-darwin`")
    )]
    UnsupportedHost(String),

    #[error("{var} not defined")]
    #[diagnostic(
        code(build_dep::env),
        help("export ANDROID_HOME to point at your Android SDK installation")
    )]
    MissingEnv { var: &'static str },

    #[error("`{tool}` not found")]
    #[diagnostic(code(build_dep::tool_not_found))]
    ToolNotFound { tool: String },

    #[error("`{command}` failed ({}){}", describe_exit(.status), stderr_suffix(.stderr))]
    #[diagnostic(code(build_dep::tool_failed))]
    ToolFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("could not resolve toolchain in {}: {message}", .path.display())]
    #[diagnostic(code(build_dep::toolchain))]
    ToolchainResolution { path: PathBuf, message: String },

    #[error("failed to download {url}: {message}")]
    #[diagnostic(
        code(build_dep::download),
        help("check your network connection and the library's `download_url`")
    )]
    Download { url: String, message: String },

    #[error(
        "checksum mismatch for {}\n  expected: {expected}\n  actual:   {actual}",
        .path.display()
    )]
    #[diagnostic(
        code(build_dep::checksum),
        help("delete the cached archive to download it again, or update `sha256` in config.toml")
    )]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to unpack {}: {message}", .path.display())]
    #[diagnostic(code(build_dep::unpack))]
    Unpack { path: PathBuf, message: String },

    #[error("archive did not produce the source directory {}", .path.display())]
    #[diagnostic(
        code(build_dep::source_dir),
        help("the archive is expected to contain a top-level `<libname>-<version>` directory")
    )]
    MissingSourceDir { path: PathBuf },

    #[error("build script {} failed ({})", .script.display(), describe_exit(.status))]
    #[diagnostic(code(build_dep::build_failed))]
    BuildFailed {
        script: PathBuf,
        status: Option<i32>,
    },

    #[error("failed to package {}: {message}", .path.display())]
    #[diagnostic(code(build_dep::package))]
    Package { path: PathBuf, message: String },

    #[error("{context}")]
    #[diagnostic(code(build_dep::io))]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// Create a configuration error for a file.
    pub fn config(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        BuildError::Config {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Wrap an I/O error with a description of what was being done.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error came from the library's own build script.
    pub fn is_build_failure(&self) -> bool {
        matches!(self, BuildError::BuildFailed { .. })
    }
}

/// Attach context to I/O results, converting them into [`BuildError::Io`].
pub trait IoResultExt<T> {
    fn io_context<F, S>(self, f: F) -> Result<T, BuildError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn io_context<F, S>(self, f: F) -> Result<T, BuildError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| BuildError::io(f(), e))
    }
}

fn describe_exit(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_failed_message() {
        let err = BuildError::BuildFailed {
            script: PathBuf::from("/ws/xz/build.sh"),
            status: Some(2),
        };
        assert_eq!(err.to_string(), "build script /ws/xz/build.sh failed (exit code 2)");
        assert!(err.is_build_failure());
    }

    #[test]
    fn test_tool_failed_message() {
        let quiet = BuildError::ToolFailed {
            command: "sdkmanager ndk;27.1.12297006".into(),
            status: Some(1),
            stderr: String::new(),
        };
        assert_eq!(
            quiet.to_string(),
            "`sdkmanager ndk;27.1.12297006` failed (exit code 1)"
        );

        let noisy = BuildError::ToolFailed {
            command: "xcrun --sdk iphoneos --show-sdk-path".into(),
            status: Some(1),
            stderr: "xcrun: error: SDK \"iphoneos\" cannot be located".into(),
        };
        assert_eq!(
            noisy.to_string(),
            "`xcrun --sdk iphoneos --show-sdk-path` failed (exit code 1)\nxcrun: error: SDK \"iphoneos\" cannot be located"
        );
    }

    #[test]
    fn test_io_context() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.io_context(|| "failed to read config.toml").unwrap_err();

        assert_eq!(err.to_string(), "failed to read config.toml");
        assert!(!err.is_build_failure());
    }

    #[test]
    fn test_missing_env_has_help() {
        let err = BuildError::MissingEnv { var: "ANDROID_HOME" };
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("ANDROID_HOME"));
    }
}
