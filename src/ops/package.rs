//! Post-build packaging of an install tree.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::builder::errors::{BuildError, IoResultExt};
use crate::core::host::Host;
use crate::core::library::LibrarySpec;
use crate::core::workspace::Workspace;
use crate::util::archive::pack_tar_gz;
use crate::util::fs::{is_contained, relative_path, remove_dir_all_if_exists, symlink};
use crate::util::shell::{Shell, Status};

/// Install subdirectories that are not redistributed.
pub const PURGED_DIRS: &[&str] = &["bin", "man"];

/// Options for packaging one host's install tree.
#[derive(Debug, Clone)]
pub struct PackageOptions<'a> {
    pub lib: &'a LibrarySpec,
    pub host: &'a Host,
    /// Build number recorded in the archive name.
    pub build: &'a str,
}

/// Prune, relativize and archive `install_dir` into the dist directory.
///
/// Returns the path of the written `.tar.gz`.
pub fn package(
    ws: &Workspace,
    install_dir: &Path,
    opts: &PackageOptions<'_>,
    shell: &Shell,
) -> Result<PathBuf, BuildError> {
    if !install_dir.is_dir() {
        return Err(BuildError::Package {
            path: install_dir.to_path_buf(),
            message: "the build script did not create the install directory".to_string(),
        });
    }

    shell.status(
        Status::Packaging,
        format!("{} v{} for {}", opts.lib.name, opts.lib.version, opts.host),
    );

    purge_unwanted(install_dir, shell)?;
    relativize_symlinks(install_dir, shell)?;

    let output = ws
        .dist_dir()
        .join(format!("{}.tar.gz", opts.lib.dist_name(opts.build, opts.host)));
    pack_tar_gz(install_dir, &output)?;

    shell.status(Status::Packaged, output.display());
    Ok(output)
}

/// Remove installed tool binaries and manual pages.
pub fn purge_unwanted(install_dir: &Path, shell: &Shell) -> Result<(), BuildError> {
    for name in PURGED_DIRS {
        let dir = install_dir.join(name);
        if remove_dir_all_if_exists(&dir)? {
            shell.status(Status::Removed, format!("installed {}/", name));
        }
    }
    Ok(())
}

/// Rewrite every symlink under `dir` to point at its target relative to
/// the link's own directory.
///
/// Returns the number of links rewritten.
pub fn relativize_symlinks(dir: &Path, shell: &Shell) -> Result<usize, BuildError> {
    let root = dir
        .canonicalize()
        .io_context(|| format!("failed to resolve {}", dir.display()))?;

    let links: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path_is_symlink())
        .map(|entry| entry.into_path())
        .collect();

    let mut rewritten = 0;
    for link in links {
        let Some(parent) = link.parent() else {
            continue;
        };
        let parent = parent
            .canonicalize()
            .io_context(|| format!("failed to resolve {}", parent.display()))?;
        let literal = fs::read_link(&link)
            .io_context(|| format!("failed to read symlink {}", link.display()))?;

        let resolved = match link.canonicalize() {
            Ok(target) => target,
            Err(_) if literal.is_absolute() => literal.clone(),
            Err(_) => {
                shell.warn(format!(
                    "leaving dangling symlink {} -> {}",
                    link.display(),
                    literal.display()
                ));
                continue;
            }
        };

        if !is_contained(&root, &resolved) {
            shell.warn(format!(
                "symlink {} points outside the install tree ({})",
                link.display(),
                resolved.display()
            ));
        }

        let relative = relative_path(&parent, &resolved);
        if relative == literal {
            continue;
        }

        tracing::debug!(
            "rewriting symlink {}: {} -> {}",
            link.display(),
            literal.display(),
            relative.display()
        );
        fs::remove_file(&link)
            .io_context(|| format!("failed to remove symlink {}", link.display()))?;
        symlink(&relative, &link)
            .io_context(|| format!("failed to create symlink {}", link.display()))?;
        rewritten += 1;
    }

    Ok(rewritten)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::util::archive::unpack_archive;
    use std::os::unix::fs::symlink as unix_symlink;
    use tempfile::TempDir;

    fn install_tree(root: &Path) -> PathBuf {
        let install = root.join("install/aarch64-linux-android/libfoo");
        fs::create_dir_all(install.join("lib")).unwrap();
        fs::create_dir_all(install.join("include")).unwrap();
        fs::create_dir_all(install.join("bin")).unwrap();
        fs::create_dir_all(install.join("man/man3")).unwrap();
        fs::write(install.join("lib/libfoo.so.1"), "elf").unwrap();
        fs::write(install.join("include/foo.h"), "int foo(void);").unwrap();
        fs::write(install.join("bin/foo-config"), "#!/bin/sh").unwrap();
        fs::write(install.join("man/man3/foo.3"), ".TH foo").unwrap();
        install
    }

    #[test]
    fn test_absolute_symlink_becomes_relative() {
        let tmp = TempDir::new().unwrap();
        let install = install_tree(tmp.path());
        let absolute = install.canonicalize().unwrap().join("lib/libfoo.so.1");
        unix_symlink(&absolute, install.join("lib/libfoo.so")).unwrap();

        let count = relativize_symlinks(&install, &Shell::quiet()).unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            fs::read_link(install.join("lib/libfoo.so")).unwrap(),
            PathBuf::from("libfoo.so.1")
        );
        assert_eq!(fs::read_to_string(install.join("lib/libfoo.so")).unwrap(), "elf");
    }

    #[test]
    fn test_cross_directory_symlink() {
        let tmp = TempDir::new().unwrap();
        let install = install_tree(tmp.path());
        let absolute = install.canonicalize().unwrap().join("include/foo.h");
        fs::create_dir_all(install.join("lib/include")).unwrap();
        unix_symlink(&absolute, install.join("lib/include/foo.h")).unwrap();

        relativize_symlinks(&install, &Shell::quiet()).unwrap();
        assert_eq!(
            fs::read_link(install.join("lib/include/foo.h")).unwrap(),
            PathBuf::from("../../include/foo.h")
        );
    }

    #[test]
    fn test_relative_dangling_symlink_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        let install = install_tree(tmp.path());
        unix_symlink("libmissing.so.2", install.join("lib/libmissing.so")).unwrap();

        let count = relativize_symlinks(&install, &Shell::quiet()).unwrap();
        assert_eq!(count, 0);
        assert_eq!(
            fs::read_link(install.join("lib/libmissing.so")).unwrap(),
            PathBuf::from("libmissing.so.2")
        );
    }

    #[test]
    fn test_package_survives_extraction_elsewhere() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("ws")).unwrap();
        let ws = Workspace::new(tmp.path().join("ws")).unwrap();
        let install = install_tree(ws.root());
        let absolute = install.join("lib/libfoo.so.1");
        unix_symlink(&absolute, install.join("lib/libfoo.so")).unwrap();

        let lib = LibrarySpec::parse(
            "libfoo",
            "version = \"1.2.3\"\ndownload_url = \"https://example.com/libfoo-{version}.tar.gz\"\n",
            Path::new("libfoo/config.toml"),
            None,
        )
        .unwrap();
        let host = Host::new("aarch64-linux-android").unwrap();
        let opts = PackageOptions {
            lib: &lib,
            host: &host,
            build: "3",
        };

        let archive = package(&ws, &install, &opts, &Shell::quiet()).unwrap();
        assert_eq!(
            archive,
            ws.dist_dir().join("libfoo-1.2.3-3-aarch64-linux-android.tar.gz")
        );
        assert!(!install.join("bin").exists());
        assert!(!install.join("man").exists());

        let elsewhere = TempDir::new().unwrap();
        unpack_archive(&archive, elsewhere.path()).unwrap();
        let link = elsewhere.path().join("lib/libfoo.so");
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("libfoo.so.1"));
        assert_eq!(fs::read_to_string(&link).unwrap(), "elf");
        assert!(elsewhere.path().join("include/foo.h").is_file());
        assert!(!elsewhere.path().join("bin").exists());
    }

    #[test]
    fn test_package_requires_install_dir() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        let lib = LibrarySpec::parse(
            "libfoo",
            "version = \"1.2.3\"\ndownload_url = \"https://example.com/libfoo.tar.gz\"\n",
            Path::new("libfoo/config.toml"),
            None,
        )
        .unwrap();
        let host = Host::new("arm64-apple-ios").unwrap();
        let opts = PackageOptions {
            lib: &lib,
            host: &host,
            build: "0",
        };

        let err = package(&ws, &ws.install_dir(&host, &lib), &opts, &Shell::quiet()).unwrap_err();
        assert!(matches!(err, BuildError::Package { .. }));
    }
}
