//! Checks on parsed settings that need the filesystem or the group size.

use super::error::ParseError;
use crate::algs::communicator::Communicator;
use std::fs;
use std::path::{Path, PathBuf};

pub struct Validator<'c, C: Communicator> {
    comm: &'c C,
}

impl<'c, C: Communicator> Validator<'c, C> {
    pub fn new(comm: &'c C) -> Self {
        Self { comm }
    }

    /// Local check; the caller agrees on the outcome across the group.
    pub fn require_file_exists(&self, path: &str) -> Result<(), ParseError> {
        if Path::new(path).is_file() {
            Ok(())
        } else {
            Err(ParseError::MissingInput(path.to_string()))
        }
    }

    /// A one-process run whose output would land on its own input.
    pub fn serial_input_equals_output(&self, input: &str, output: &str) -> bool {
        if self.comm.size() != 1 {
            return false;
        }
        match (canonical(Path::new(input)), canonical(Path::new(output))) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Canonical form of `path`; a path that does not exist yet resolves through
/// its parent directory.
fn canonical(path: &Path) -> Option<PathBuf> {
    if let Ok(p) = fs::canonicalize(path) {
        return Some(p);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|p| p.join(name))
}
