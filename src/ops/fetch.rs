//! Source archive fetching.
//!
//! Archives are cached in `<root>/downloads/<filename>`, where the filename
//! is the last segment of the download URL path. A cached archive is reused
//! without any network access. New downloads are streamed into a temporary
//! file next to the cache entry and only moved into place once complete
//! (and verified, when the library pins a `sha256`).

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use url::Url;

use crate::builder::errors::{BuildError, IoResultExt};
use crate::core::library::LibrarySpec;
use crate::core::workspace::Workspace;
use crate::util::fs::ensure_dir;
use crate::util::hash::verify_sha256;
use crate::util::shell::{Shell, Status};

const CHUNK_SIZE: usize = 64 * 1024;

fn download_error(url: &str, message: impl ToString) -> BuildError {
    BuildError::Download {
        url: url.to_string(),
        message: message.to_string(),
    }
}

/// File name an archive is cached under: the last URL path segment.
pub fn archive_file_name(url: &str) -> Result<String, BuildError> {
    let parsed = Url::parse(url).map_err(|e| download_error(url, e))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| download_error(url, "URL path has no file name"))
}

/// Make the library's source archive available locally.
///
/// Returns the path of the cached archive.
pub fn fetch(lib: &LibrarySpec, ws: &Workspace, shell: &Shell) -> Result<PathBuf, BuildError> {
    let url = lib.download_url()?;
    let file_name = archive_file_name(&url)?;

    let downloads = ws.downloads_dir();
    ensure_dir(&downloads)?;
    let path = downloads.join(&file_name);

    if path.is_file() {
        shell.status(Status::Cached, &file_name);
        if let Some(expected) = &lib.sha256 {
            verify_sha256(&path, expected)?;
        }
        return Ok(path);
    }

    shell.status(Status::Fetching, &url);
    let mut tmp = NamedTempFile::new_in(&downloads)
        .io_context(|| format!("failed to create temporary file in {}", downloads.display()))?;
    let size = download_to(&url, tmp.as_file_mut(), &file_name, shell)?;
    tracing::debug!("downloaded {} bytes from {}", size, url);

    if let Some(expected) = &lib.sha256 {
        verify_sha256(tmp.path(), expected)?;
    }

    tmp.persist(&path)
        .map_err(|e| BuildError::io(format!("failed to store {}", path.display()), e.error))?;

    Ok(path)
}

/// Stream `url` into `out`, returning the number of bytes written.
///
/// `file://` URLs are read from the local filesystem; everything else goes
/// through HTTP.
fn download_to(url: &str, out: &mut File, label: &str, shell: &Shell) -> Result<u64, BuildError> {
    let parsed = Url::parse(url).map_err(|e| download_error(url, e))?;

    let (mut reader, total): (Box<dyn Read>, Option<u64>) = if parsed.scheme() == "file" {
        let source = parsed
            .to_file_path()
            .map_err(|_| download_error(url, "not a local file path"))?;
        let file = File::open(&source).map_err(|e| download_error(url, e))?;
        let len = file.metadata().ok().map(|m| m.len());
        (Box::new(file), len)
    } else {
        let response = reqwest::blocking::get(url).map_err(|e| download_error(url, e))?;
        if !response.status().is_success() {
            return Err(download_error(url, format!("HTTP {}", response.status())));
        }
        let len = response.content_length();
        (Box::new(response), len)
    };

    let mut progress = shell.bytes_progress(label, total);
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer).map_err(|e| download_error(url, e))?;
        if n == 0 {
            break;
        }
        out.write_all(&buffer[..n])
            .io_context(|| format!("failed to write download of {}", label))?;
        progress.inc(n as u64);
    }
    progress.finish();

    out.flush()
        .io_context(|| format!("failed to write download of {}", label))?;
    Ok(progress.position())
}
