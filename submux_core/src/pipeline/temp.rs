//! Per-session temp files. Every artifact a session materializes is owned by
//! exactly one `TempSet`; release is deterministic on all terminal paths.

use std::path::{Path, PathBuf};

use crate::chat::PrincipalId;

/// Naming scheme for session-scoped files under the work directory. Names
/// embed the principal id so concurrent sessions never collide.
#[derive(Debug, Clone)]
pub struct WorkDir {
    base: PathBuf,
}

impl WorkDir {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn video(&self, principal: PrincipalId) -> PathBuf {
        self.base.join(format!("vid_{principal}.tmp"))
    }

    pub fn subtitle(&self, principal: PrincipalId) -> PathBuf {
        self.base.join(format!("sub_{principal}.ass"))
    }

    /// Foreign-format subtitle before its conversion pass.
    pub fn subtitle_raw(&self, principal: PrincipalId, ext: &str) -> PathBuf {
        self.base.join(format!("sub_{principal}.{ext}"))
    }

    /// Intermediate container with embedded subtitles stripped.
    pub fn stripped(&self, principal: PrincipalId) -> PathBuf {
        self.base.join(format!("out_{principal}.mkv"))
    }

    pub fn still(&self, principal: PrincipalId) -> PathBuf {
        self.base.join(format!("shot_{principal}.png"))
    }

    pub fn thumbnail(&self, principal: PrincipalId) -> PathBuf {
        self.base.join(format!("thumb_{principal}.jpg"))
    }

    /// Operator-uploaded font for this session.
    pub fn font(&self, principal: PrincipalId, ext: &str) -> PathBuf {
        self.base.join(format!("font_{principal}.{ext}"))
    }

    /// Final artifact, named by the operator.
    pub fn output(&self, name: &str) -> PathBuf {
        self.base.join(format!("{}.mkv", sanitize_name(name)))
    }
}

/// Strip anything that would let an operator-chosen name escape the work
/// directory.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "output".to_string()
    } else {
        trimmed.to_string()
    }
}

/// The set of temp files a session has materialized so far.
#[derive(Debug, Default)]
pub struct TempSet {
    files: Vec<PathBuf>,
}

impl TempSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` for release. Returns it back for call-site convenience.
    pub fn register(&mut self, path: PathBuf) -> PathBuf {
        if !self.files.contains(&path) {
            self.files.push(path.clone());
        }
        path
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }

    /// Unlink everything registered. Best-effort and idempotent; cheap
    /// unlinks are fine inline on the event loop.
    pub fn release_all(&mut self) {
        for path in self.files.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("[temp] removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("[temp] failed to remove {}: {e}", path.display()),
            }
        }
    }
}

impl Drop for TempSet {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_separators_and_dots() {
        assert_eq!(sanitize_name("Episode 1"), "Episode 1");
        assert_eq!(sanitize_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_name("  "), "output");
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vid_1.tmp");
        std::fs::write(&file, b"x").unwrap();

        let mut set = TempSet::new();
        set.register(file.clone());
        set.release_all();
        assert!(!file.exists());
        // Second release sees an empty set and missing files; never errors.
        set.release_all();
    }
}
