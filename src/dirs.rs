//! Output directory creation. Knows nothing about items or the menu; callers
//! pass already sanitized names.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const COLLISION_SUFFIX: &str = "-1";

/// Create `parent/name` unless it already exists.
pub fn ensure_dir(parent: &Path, name: &str) -> io::Result<PathBuf> {
    let path = parent.join(name);
    match fs::create_dir(&path) {
        Ok(()) => Ok(path),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(path),
        Err(e) => Err(e),
    }
}

/// Create a fresh directory for `name` under `parent`. On collision `-1` is
/// appended until the name is free: `name`, `name-1`, `name-1-1`, ...
pub fn ensure_unique_dir(parent: &Path, name: &str) -> io::Result<PathBuf> {
    let mut candidate = name.to_string();
    loop {
        let path = parent.join(&candidate);
        match fs::create_dir(&path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate.push_str(COLLISION_SUFFIX);
            }
            Err(e) => return Err(e),
        }
    }
}

// ── Tests ──
