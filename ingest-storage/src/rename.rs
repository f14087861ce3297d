//! Raw file renaming (§4.7 "Raw renaming").

use std::fs;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::error::{Result, StorageError};

/// Number of trailing dot-separated components to preserve, when not
/// inferred from the input name: 2 for level-0 streams, 0 otherwise.
#[must_use]
pub fn default_preserve_dots(is_level_zero: bool) -> usize {
    if is_level_zero { 2 } else { 0 }
}

/// Infers `preserve_dots` from an input file name that already carries
/// the canonical `{ds_name}.{YYYYMMDD}.{hhmmss}.{ext...}` prefix: strips
/// the prefix and counts the remaining dot-separated components.
#[must_use]
pub fn infer_preserve_dots(input_name: &str, ds_name: &str) -> Option<usize> {
    let prefix = format!("{ds_name}.");
    let rest = input_name.strip_prefix(&prefix)?;
    let mut parts = rest.splitn(3, '.');
    let _yyyymmdd = parts.next()?;
    let _hhmmss = parts.next()?;
    match parts.next() {
        None | Some("") => Some(0),
        Some(remainder) => Some(remainder.matches('.').count() + 1),
    }
}

/// Builds the canonical raw-level name
/// `{ds_name}.{yyyymmdd}.{hhmmss}.{ext}[.{preserved}]`.
#[must_use]
pub fn canonical_name(ds_name: &str, yyyymmdd: &str, hhmmss: &str, ext: &str, preserved: &[&str]) -> String {
    let mut name = format!("{ds_name}.{yyyymmdd}.{hhmmss}.{ext}");
    for part in preserved {
        name.push('.');
        name.push_str(part);
    }
    name
}

fn file_md5(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Md5::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

const MAX_SUFFIX_ATTEMPTS: u32 = 10_000;

fn next_unique_suffix(dest_dir: &Path, dest_name: &str) -> Result<PathBuf> {
    for n in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate = dest_dir.join(format!("{dest_name},{n}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(StorageError::RenameCollisionExhausted {
        dest: dest_dir.join(dest_name).display().to_string(),
    })
}

/// Moves `src` into `dest_dir` under `dest_name`. If the destination
/// already exists: matching MD5 removes the source with a warning (no
/// error); mismatched MD5 fails with [`StorageError::FileMd5Mismatch`],
/// unless `into_done` is set (moving into a `.done` subdirectory), in
/// which case a unique `,N` suffix is appended and the move retried.
pub fn raw_rename(src: &Path, dest_dir: &Path, dest_name: &str, into_done: bool) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir)?;
    let mut dest = dest_dir.join(dest_name);

    if dest.exists() {
        let src_md5 = file_md5(src)?;
        let dest_md5 = file_md5(&dest)?;
        if src_md5 == dest_md5 {
            tracing::warn!(src = %src.display(), dest = %dest.display(), "duplicate raw file, removing source");
            fs::remove_file(src)?;
            return Ok(dest);
        }
        if !into_done {
            return Err(StorageError::FileMd5Mismatch {
                src: src.display().to_string(),
                dest: dest.display().to_string(),
            });
        }
        dest = next_unique_suffix(dest_dir, dest_name)?;
    }

    fs::rename(src, &dest)?;
    Ok(dest)
}

/// Renames a bad input file in place, replacing its extension with
/// `bad`.
pub fn rename_bad_file(path: &Path) -> Result<PathBuf> {
    let bad = path.with_extension("bad");
    fs::rename(path, &bad)?;
    Ok(bad)
}
