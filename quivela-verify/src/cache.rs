#![forbid(unsafe_code)]

//! Digests of programs the verifier has already accepted.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use sha2::Digest;
use tracing::debug;

pub const DEFAULT_CACHE_FILE: &str = "quivela.cache.boogie";

#[derive(Debug, Default)]
pub struct ProofCache {
    path: Option<PathBuf>,
    digests: HashSet<String>,
}

impl ProofCache {
    /// Reads `path` if it exists; later inserts are appended to it.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let digests = match fs::read_to_string(&path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(err) => return Err(err),
        };
        debug!(path = %path.display(), entries = digests.len(), "loaded proof cache");
        Ok(Self {
            path: Some(path),
            digests,
        })
    }

    /// Never hits and never writes.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn contains(&self, program: &str) -> bool {
        self.contains_digest(&digest(program))
    }

    pub fn contains_digest(&self, digest: &str) -> bool {
        self.path.is_some() && self.digests.contains(digest)
    }

    pub fn insert(&mut self, program: &str) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let digest = digest(program);
        if self.digests.contains(&digest) {
            return Ok(());
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{digest}")?;
        self.digests.insert(digest);
        Ok(())
    }
}

/// Base64 of the SHA-384 of the program text.
pub fn digest(program: &str) -> String {
    let mut hasher = sha2::Sha384::new();
    hasher.update(program.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_base64() {
        let d = digest("procedure both() {}");
        assert_eq!(d, digest("procedure both() {}"));
        assert_ne!(d, digest("procedure both() { }"));
        // 48 bytes encode to 64 characters without padding.
        assert_eq!(d.len(), 64);
    }

    #[test]
    fn disabled_cache_never_hits() {
        let mut cache = ProofCache::disabled();
        cache.insert("x").unwrap();
        assert!(!cache.contains("x"));
        assert!(cache.is_empty());
    }
}
