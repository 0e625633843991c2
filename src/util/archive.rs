//! Archive extraction and packaging.
//!
//! Extraction applies a data-only filter: entries may not escape the
//! destination (by path or by link target), device files and FIFOs are
//! refused, and set-uid/set-gid/sticky and group/other write bits are
//! cleared. Zip entries are also checked against what is already on disk,
//! so links extracted earlier cannot redirect later entries.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::EntryType;
use walkdir::WalkDir;
use xz2::read::XzDecoder;

use crate::builder::errors::{BuildError, IoResultExt};
use crate::util::fs::{ensure_dir, is_contained, normalize_lexically, resolve_on_disk, symlink};

/// Archive formats understood by [`unpack_archive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarBz2,
    TarXz,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from the file name.
    pub fn detect(path: &Path) -> Option<ArchiveFormat> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".tbz") {
            Some(ArchiveFormat::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(ArchiveFormat::TarXz)
        } else if name.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Unpack `archive` into `dest`, detecting the format from its extension.
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<(), BuildError> {
    let format = ArchiveFormat::detect(archive).ok_or_else(|| BuildError::Unpack {
        path: archive.to_path_buf(),
        message: "unrecognized archive format (expected .tar.gz, .tar.bz2, .tar.xz, .tar or .zip)".into(),
    })?;

    ensure_dir(dest)?;

    let open = || {
        File::open(archive)
            .map(BufReader::new)
            .io_context(|| format!("failed to open archive: {}", archive.display()))
    };

    match format {
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(open()?), archive, dest),
        ArchiveFormat::TarBz2 => unpack_tar(BzDecoder::new(open()?), archive, dest),
        ArchiveFormat::TarXz => unpack_tar(XzDecoder::new(open()?), archive, dest),
        ArchiveFormat::Tar => unpack_tar(open()?, archive, dest),
        ArchiveFormat::Zip => unpack_zip(archive, dest),
    }
}

fn unpack_error(archive: &Path, message: impl ToString) -> BuildError {
    BuildError::Unpack {
        path: archive.to_path_buf(),
        message: message.to_string(),
    }
}

/// Reject paths that are absolute or climb out of the extraction root.
fn check_member_path(archive: &Path, member: &Path) -> Result<(), BuildError> {
    let normalized = normalize_lexically(member);
    if member.has_root() || normalized.starts_with("..") {
        return Err(unpack_error(
            archive,
            format!("entry `{}` escapes the destination", member.display()),
        ));
    }
    Ok(())
}

/// Reject link targets that are absolute or resolve outside the extraction root.
///
/// Symlink targets are relative to the link's directory; hard link targets
/// are relative to the archive root.
fn check_link_target(
    archive: &Path,
    member: &Path,
    target: &Path,
    symbolic: bool,
) -> Result<(), BuildError> {
    let resolved = if symbolic {
        member.parent().unwrap_or(Path::new("")).join(target)
    } else {
        target.to_path_buf()
    };

    if target.has_root() || normalize_lexically(&resolved).starts_with("..") {
        return Err(unpack_error(
            archive,
            format!(
                "link `{}` -> `{}` points outside the destination",
                member.display(),
                target.display()
            ),
        ));
    }
    Ok(())
}

/// Strip high and group/other write bits; keep files owner read/writable.
fn filtered_mode(mode: u32, is_dir: bool) -> u32 {
    let base = mode & 0o755;
    if is_dir {
        base | 0o700
    } else {
        base | 0o600
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<(), BuildError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .io_context(|| format!("failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> Result<(), BuildError> {
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<(), BuildError> {
    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(false);
    tar.set_unpack_xattrs(false);
    tar.set_overwrite(true);

    let entries = tar.entries().map_err(|e| unpack_error(archive, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| unpack_error(archive, e))?;
        let member: PathBuf = entry
            .path()
            .map_err(|e| unpack_error(archive, e))?
            .into_owned();
        check_member_path(archive, &member)?;

        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse | EntryType::Directory => {}
            EntryType::Symlink | EntryType::Link => {
                let target = entry
                    .link_name()
                    .map_err(|e| unpack_error(archive, e))?
                    .ok_or_else(|| {
                        unpack_error(archive, format!("link `{}` has no target", member.display()))
                    })?
                    .into_owned();
                check_link_target(archive, &member, &target, entry_type == EntryType::Symlink)?;
            }
            EntryType::Char | EntryType::Block | EntryType::Fifo => {
                return Err(unpack_error(
                    archive,
                    format!("refusing to extract special file `{}`", member.display()),
                ));
            }
            other => {
                tracing::debug!("skipping {:?} entry `{}`", other, member.display());
                continue;
            }
        }

        let mode = entry.header().mode().unwrap_or(0o644);
        entry
            .unpack_in(dest)
            .map_err(|e| unpack_error(archive, format!("{}: {}", member.display(), e)))?;

        match entry_type {
            EntryType::Directory => apply_mode(&dest.join(&member), filtered_mode(mode, true))?,
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                apply_mode(&dest.join(&member), filtered_mode(mode, false))?
            }
            _ => {}
        }
    }

    Ok(())
}

/// Reject `path` if it leaves `root` once the part of it already on disk
/// is resolved.
fn check_on_disk(archive: &Path, root: &Path, name: &str, path: &Path) -> Result<(), BuildError> {
    let resolved = resolve_on_disk(path)
        .map_err(|e| unpack_error(archive, format!("{}: {}", name, e)))?;
    if !is_contained(root, &resolved) {
        return Err(unpack_error(
            archive,
            format!("entry `{}` escapes the destination through a symlink", name),
        ));
    }
    Ok(())
}

fn unpack_zip(archive: &Path, dest: &Path) -> Result<(), BuildError> {
    let root = dest
        .canonicalize()
        .io_context(|| format!("failed to resolve {}", dest.display()))?;
    let file = File::open(archive)
        .io_context(|| format!("failed to open archive: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| unpack_error(archive, e))?;

    for index in 0..zip.len() {
        let mut member = zip.by_index(index).map_err(|e| unpack_error(archive, e))?;
        let name = member.name().to_string();
        let relative = member.enclosed_name().ok_or_else(|| {
            unpack_error(archive, format!("entry `{}` escapes the destination", name))
        })?;
        let out = root.join(&relative);

        if member.is_symlink() {
            let mut target = String::new();
            member
                .read_to_string(&mut target)
                .map_err(|e| unpack_error(archive, e))?;
            let target = PathBuf::from(target);
            check_link_target(archive, &relative, &target, true)?;

            let parent = out.parent().unwrap_or(root.as_path());
            check_on_disk(archive, &root, &name, parent)?;
            check_on_disk(archive, &root, &name, &parent.join(&target))?;

            ensure_dir(parent)?;
            symlink(&target, &out)
                .io_context(|| format!("failed to create symlink: {}", out.display()))?;
            continue;
        }

        check_on_disk(archive, &root, &name, &out)?;

        if member.is_dir() {
            ensure_dir(&out)?;
        } else {
            if let Some(parent) = out.parent() {
                ensure_dir(parent)?;
            }
            let mut writer = File::create(&out)
                .io_context(|| format!("failed to create {}", out.display()))?;
            io::copy(&mut member, &mut writer)
                .io_context(|| format!("failed to extract {}", out.display()))?;
        }

        if let Some(mode) = member.unix_mode() {
            apply_mode(&out, filtered_mode(mode, member.is_dir()))?;
        }
    }

    Ok(())
}

/// Package the contents of `src_dir` into a gzip-compressed tarball.
///
/// Entries are stored relative to `src_dir` in sorted order; symlinks are
/// stored as links, not followed.
pub fn pack_tar_gz(src_dir: &Path, output: &Path) -> Result<PathBuf, BuildError> {
    let package_error = |message: String| BuildError::Package {
        path: output.to_path_buf(),
        message,
    };

    if let Some(parent) = output.parent() {
        ensure_dir(parent)?;
    }

    let file = File::create(output)
        .io_context(|| format!("failed to create archive: {}", output.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    builder
        .append_dir(".", src_dir)
        .map_err(|e| package_error(e.to_string()))?;

    for entry in WalkDir::new(src_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| package_error(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(src_dir)
            .map_err(|e| package_error(e.to_string()))?;

        builder
            .append_path_with_name(entry.path(), relative)
            .map_err(|e| package_error(format!("{}: {}", relative.display(), e)))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| package_error(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| package_error(e.to_string()))?;

    Ok(output.to_path_buf())
}
