//! Local copies of the server's library database and cover art.
//!
//! ```text
//! <dir>/<server id>.db      library database of a server
//! <dir>/covers/<art id>     cover image
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BansheeError;
use crate::server::ServerId;

const DB_EXT: &str = "db";
const COVER_DIR: &str = "covers";

/// Library database files, keyed by the server owning the library.
pub trait LibraryCache: Send + Sync {
    fn has_database(&self, owner: ServerId) -> bool;

    fn store_database(&self, owner: ServerId, data: &[u8]) -> Result<(), BansheeError>;

    /// Hand a database over to another server (an alias taking over).
    fn move_database(&self, from: ServerId, to: ServerId) -> Result<(), BansheeError>;

    fn remove_database(&self, owner: ServerId) -> Result<(), BansheeError>;
}

pub trait CoverStore: Send + Sync {
    fn has_cover(&self, art_id: &str) -> bool;

    fn store_cover(&self, art_id: &str, data: &[u8]) -> Result<(), BansheeError>;
}

/// Both caches in one directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn database_path(&self, owner: ServerId) -> PathBuf {
        self.dir.join(format!("{owner}.{DB_EXT}"))
    }

    /// Art ids are server-chosen. Every byte outside `[A-Za-z0-9_-]` is
    /// written as `%XX`, so distinct ids never share a file and none can
    /// leave the cover dir.
    pub fn cover_path(&self, art_id: &str) -> PathBuf {
        let mut name = String::with_capacity(art_id.len());
        for b in art_id.bytes() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                name.push(b as char);
            } else {
                name.push_str(&format!("%{b:02X}"));
            }
        }
        self.dir.join(COVER_DIR).join(name)
    }

    /// Write through a temporary file so readers never see half a file.
    fn write_file(path: &Path, data: &[u8]) -> Result<(), BansheeError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("part");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), len = data.len(), "cache file written");
        Ok(())
    }
}

fn ignore_missing(result: io::Result<()>) -> Result<(), BansheeError> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => Ok(other?),
    }
}

impl LibraryCache for DiskCache {
    fn has_database(&self, owner: ServerId) -> bool {
        self.database_path(owner).is_file()
    }

    fn store_database(&self, owner: ServerId, data: &[u8]) -> Result<(), BansheeError> {
        Self::write_file(&self.database_path(owner), data)
    }

    fn move_database(&self, from: ServerId, to: ServerId) -> Result<(), BansheeError> {
        ignore_missing(fs::rename(self.database_path(from), self.database_path(to)))
    }

    fn remove_database(&self, owner: ServerId) -> Result<(), BansheeError> {
        ignore_missing(fs::remove_file(self.database_path(owner)))
    }
}

impl CoverStore for DiskCache {
    fn has_cover(&self, art_id: &str) -> bool {
        !art_id.is_empty() && self.cover_path(art_id).is_file()
    }

    fn store_cover(&self, art_id: &str, data: &[u8]) -> Result<(), BansheeError> {
        if art_id.is_empty() {
            return Err(BansheeError::InvalidParams("empty art id"));
        }
        Self::write_file(&self.cover_path(art_id), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn database_lifecycle() {
        let temp_dir = tempdir().unwrap();
        let cache = DiskCache::new(temp_dir.path());
        assert!(!cache.has_database(1));

        cache.store_database(1, b"SQLite format 3\0").unwrap();
        assert!(cache.has_database(1));
        assert_eq!(fs::read(cache.database_path(1)).unwrap(), b"SQLite format 3\0");

        cache.move_database(1, 2).unwrap();
        assert!(!cache.has_database(1));
        assert!(cache.has_database(2));

        cache.remove_database(2).unwrap();
        assert!(!cache.has_database(2));
        // Removing or moving what is not there is fine.
        cache.remove_database(2).unwrap();
        cache.move_database(5, 6).unwrap();
    }

    #[test]
    fn covers_stay_inside_cover_dir() {
        let temp_dir = tempdir().unwrap();
        let cache = DiskCache::new(temp_dir.path());
        let path = cache.cover_path("../../etc/passwd");
        assert_eq!(path.parent().unwrap(), cache.dir().join(COVER_DIR));

        cache.store_cover("album-1f3a", &[0xFF, 0xD8, 0xFF]).unwrap();
        assert!(cache.has_cover("album-1f3a"));
        assert!(!cache.has_cover("album-0000"));
    }

    #[test]
    fn similar_art_ids_get_separate_files() {
        let temp_dir = tempdir().unwrap();
        let cache = DiskCache::new(temp_dir.path());
        assert_ne!(cache.cover_path("a.b"), cache.cover_path("a_b"));
        assert_ne!(cache.cover_path("a%2Eb"), cache.cover_path("a.b"));

        cache.store_cover("a.b", &[1, 2, 3]).unwrap();
        assert!(cache.has_cover("a.b"));
        assert!(!cache.has_cover("a_b"));
    }

    #[test]
    fn empty_art_id_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let cache = DiskCache::new(temp_dir.path());
        assert!(matches!(
            cache.store_cover("", &[1, 2, 3]),
            Err(BansheeError::InvalidParams(_))
        ));
        assert!(!cache.has_cover(""));
    }
}
