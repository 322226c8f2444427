// Licensed under the Apache-2.0 license

//! All-or-nothing output writing.
//!
//! Every file is rendered in memory first. [`OutputSet::write_all`] writes
//! each one to a temporary sibling and only renames them into place once
//! every temporary has been written, so a failed run never leaves a partial
//! output behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::error::{GenError, Result};

/// Rendered output files, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputSet {
    files: Vec<(PathBuf, String)>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `contents` for `path`. A later add for the same path replaces it.
    pub fn add(&mut self, path: impl Into<PathBuf>, contents: String) {
        let path = path.into();
        match self.files.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = contents,
            None => self.files.push((path, contents)),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|(p, _)| p.as_path())
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: OutputSet) {
        for (path, contents) in other.files {
            self.add(path, contents);
        }
    }

    /// Write every file. Nothing is renamed into place unless all temporaries
    /// were written.
    pub fn write_all(&self) -> Result<()> {
        let mut staged = Vec::with_capacity(self.files.len());
        for (path, contents) in &self.files {
            staged.push((stage(path, contents)?, path));
        }
        for (temp, path) in staged {
            temp.persist(path)
                .map_err(|e| GenError::io(format!("failed to write {}", path.display()), e.error))?;
            info!("wrote {}", path.display());
        }
        Ok(())
    }
}

fn stage(path: &Path, contents: &str) -> Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .map_err(|e| GenError::io(format!("failed to create {}", parent.display()), e))?;
    let mut temp = NamedTempFile::new_in(&parent)
        .map_err(|e| GenError::io(format!("failed to stage {}", path.display()), e))?;
    temp.write_all(contents.as_bytes())
        .and_then(|_| temp.flush())
        .map_err(|e| GenError::io(format!("failed to stage {}", path.display()), e))?;
    debug!("staged {} ({} bytes)", path.display(), contents.len());
    Ok(temp)
}
