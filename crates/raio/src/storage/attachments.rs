use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::StorageError;

/// What happened to the file on disk when an attachment was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No file existed under that name.
    Created,
    /// A byte-identical file from an earlier cycle was left in place.
    Unchanged,
    /// A file with different content existed and was replaced.
    Replaced,
}

#[derive(Debug, Clone)]
pub struct SavedFile {
    pub path: PathBuf,
    pub outcome: SaveOutcome,
}

/// Writes attachment payloads into the attachments directory.
pub struct AttachmentStore {
    directory: PathBuf,
}

impl AttachmentStore {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name an attachment of message `uid` is stored under.
    pub fn stored_name(uid: u32, original: &str) -> String {
        format!("mail{}_{}", uid, original)
    }

    /// Picks a name not yet in `taken`, numbering the stem on collision
    /// (`mail7_pic.png`, `mail7_pic_2.png`, ...), and records it.
    pub fn claim_name(name: &str, taken: &mut HashSet<String>) -> String {
        if taken.insert(name.to_string()) {
            return name.to_string();
        }

        let (base, ext) = match name.rfind('.') {
            Some(dot_pos) if dot_pos > 0 => (&name[..dot_pos], &name[dot_pos..]),
            _ => (name, ""),
        };

        let mut counter = 2;
        loop {
            let candidate = format!("{}_{}{}", base, counter, ext);
            if taken.insert(candidate.clone()) {
                warn!(
                    "Attachment name '{}' already used in this message, storing as '{}'",
                    name, candidate
                );
                return candidate;
            }
            counter += 1;
        }
    }

    /// Writes `content` to `<directory>/<name>`, creating the directory if needed.
    pub fn save(&self, name: &str, content: &[u8]) -> Result<SavedFile, StorageError> {
        self.ensure_directory()?;

        let path = self.directory.join(name);

        let outcome = if path.exists() {
            let existing = std::fs::read(&path).map_err(|e| StorageError::ReadFile {
                path: path.clone(),
                source: e,
            })?;

            if existing == content {
                debug!("Attachment {} already stored", path.display());
                return Ok(SavedFile {
                    path,
                    outcome: SaveOutcome::Unchanged,
                });
            }

            warn!(
                "Replacing {} with different content ({} -> {} bytes)",
                path.display(),
                existing.len(),
                content.len()
            );
            SaveOutcome::Replaced
        } else {
            SaveOutcome::Created
        };

        debug!("Saving attachment to {}", path.display());
        std::fs::write(&path, content).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        Ok(SavedFile { path, outcome })
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.directory.exists() {
            std::fs::create_dir_all(&self.directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: self.directory.clone(),
                    source: e,
                }
            })?;
        }
        Ok(())
    }
}
