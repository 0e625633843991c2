//! Host triples, platforms and host configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use toml::{Table, Value};

use crate::builder::errors::{BuildError, IoResultExt};

/// Android host triples.
pub const ANDROID_HOSTS: &[&str] = &[
    "arm-linux-androideabi",
    "aarch64-linux-android",
    "i686-linux-android",
    "x86_64-linux-android",
];

/// iOS host triples (device and simulator).
pub const IOS_HOSTS: &[&str] = &[
    "arm64-apple-ios",
    "arm64-apple-ios-simulator",
    "x86_64-apple-ios-simulator",
];

/// macOS host triples.
pub const MACOS_HOSTS: &[&str] = &["universal2-apple-darwin"];

/// Target platform, selected once from the host triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Android,
    IosDevice,
    IosSimulator,
    MacOS,
}

impl Platform {
    /// Detect the platform for a host triple.
    pub fn from_triple(triple: &str) -> Option<Platform> {
        if triple.contains("-android") {
            Some(Platform::Android)
        } else if triple.contains("-ios") {
            if triple.contains("-simulator") {
                Some(Platform::IosSimulator)
            } else {
                Some(Platform::IosDevice)
            }
        } else if triple.contains("-darwin") {
            Some(Platform::MacOS)
        } else {
            None
        }
    }

    /// The Apple SDK name passed to `xcrun --sdk`, if this is an Apple platform.
    pub fn apple_sdk(&self) -> Option<&'static str> {
        match self {
            Platform::Android => None,
            Platform::IosDevice => Some("iphoneos"),
            Platform::IosSimulator => Some("iphonesimulator"),
            Platform::MacOS => Some("macosx"),
        }
    }
}

/// A compiler target triple with its detected platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Host {
    triple: String,
    platform: Platform,
}

impl Host {
    /// Create a host from a triple, detecting its platform.
    pub fn new(triple: impl Into<String>) -> Result<Self, BuildError> {
        let triple = triple.into();
        let platform =
            Platform::from_triple(&triple).ok_or_else(|| BuildError::UnsupportedHost(triple.clone()))?;
        Ok(Host { triple, platform })
    }

    pub fn triple(&self) -> &str {
        &self.triple
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triple)
    }
}

/// A named group of hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostGroup {
    Android,
    Ios,
    MacOS,
    All,
}

impl HostGroup {
    /// The command-line alias for this group.
    pub fn alias(&self) -> &'static str {
        match self {
            HostGroup::Android => "android",
            HostGroup::Ios => "iOS",
            HostGroup::MacOS => "macOS",
            HostGroup::All => "all",
        }
    }

    /// Host triples in this group, in build order.
    pub fn triples(&self) -> Vec<&'static str> {
        let mut triples: Vec<&'static str> = match self {
            HostGroup::Android => ANDROID_HOSTS.to_vec(),
            HostGroup::Ios => IOS_HOSTS.to_vec(),
            HostGroup::MacOS => MACOS_HOSTS.to_vec(),
            HostGroup::All => ANDROID_HOSTS
                .iter()
                .chain(IOS_HOSTS)
                .chain(MACOS_HOSTS)
                .copied()
                .collect(),
        };

        let mut seen = Vec::with_capacity(triples.len());
        triples.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(*t);
                true
            }
        });
        triples
    }

    const ALL_GROUPS: [HostGroup; 4] = [
        HostGroup::Android,
        HostGroup::Ios,
        HostGroup::MacOS,
        HostGroup::All,
    ];
}

/// The `--host` selector: a single known triple or a group alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSelector {
    Single(&'static str),
    Group(HostGroup),
}

impl HostSelector {
    /// Every accepted value for `--host`.
    pub fn possible_values() -> Vec<&'static str> {
        let mut values: Vec<&'static str> = HostGroup::All.triples();
        values.extend(HostGroup::ALL_GROUPS.iter().map(|g| g.alias()));
        values
    }

    /// Expand to concrete host triples.
    pub fn triples(&self) -> Vec<&'static str> {
        match self {
            HostSelector::Single(triple) => vec![*triple],
            HostSelector::Group(group) => group.triples(),
        }
    }
}

impl FromStr for HostSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(group) = HostGroup::ALL_GROUPS.iter().find(|g| g.alias() == s) {
            return Ok(HostSelector::Group(*group));
        }

        if let Some(triple) = HostGroup::All.triples().into_iter().find(|t| *t == s) {
            return Ok(HostSelector::Single(triple));
        }

        Err(format!(
            "unknown host '{}'; expected one of: {}",
            s,
            HostSelector::possible_values().join(", ")
        ))
    }
}

/// Per-host configuration loaded from `host/<triple>.toml`.
#[derive(Debug, Clone)]
pub struct HostSpec {
    pub host: Host,
    /// NDK version to install; always present for Android hosts.
    pub ndk_version: Option<String>,
    /// Base environment entries, merged before the library's entries.
    pub env: Table,
}

impl HostSpec {
    /// Load a host spec from its config file.
    pub fn load(host: Host, path: &Path) -> Result<Self, BuildError> {
        let contents = std::fs::read_to_string(path)
            .io_context(|| format!("failed to read host config: {}", path.display()))?;
        Self::parse(host, &contents, path)
    }

    /// Parse a host spec from TOML source.
    pub fn parse(host: Host, contents: &str, path: &Path) -> Result<Self, BuildError> {
        let env: Table = toml::from_str(contents).map_err(|e| BuildError::config(path, e))?;

        let ndk_version = match env.get("ndk_version") {
            Some(Value::String(v)) => Some(v.clone()),
            Some(_) => return Err(BuildError::config(path, "`ndk_version` must be a string")),
            None => None,
        };

        if host.platform() == Platform::Android && ndk_version.is_none() {
            return Err(BuildError::config(
                path,
                format!("`ndk_version` is required for Android host `{}`", host),
            ));
        }

        Ok(HostSpec {
            host,
            ndk_version,
            env,
        })
    }
}
