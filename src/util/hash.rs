//! Hashing utilities for archive checksums.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::builder::errors::{BuildError, IoResultExt};

/// Compute SHA256 hash of a file.
pub fn sha256_file(path: &Path) -> Result<String, BuildError> {
    let file = File::open(path)
        .io_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .io_context(|| format!("failed to read {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify that the file at `path` has the expected digest.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<(), BuildError> {
    let actual = sha256_file(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(BuildError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    tracing::debug!("checksum verified: {}", &actual[..16]);
    Ok(())
}
