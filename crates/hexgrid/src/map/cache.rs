use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::atomic_io::write_bytes_atomic;
use super::format::{MapBlob, MapFormatError, MapHeader};
use super::hashing::MapHashes;

pub const ROOT_ENV_VAR: &str = "HEXGRID_ROOT";

const MAPS_DIR: &str = "maps";
const MAP_EXTENSION: &str = "fomap";

#[derive(Debug, Error)]
pub enum MapCacheError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[source] io::Error),
    #[error("failed to read/write map file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("map file {path} is invalid: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: MapFormatError,
    },
}

/// Raw map blobs kept on disk by proto id, as received from the server.
#[derive(Debug, Clone)]
pub struct MapCache {
    root: PathBuf,
}

impl MapCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses `HEXGRID_ROOT` when set, `<cwd>/cache` otherwise.
    pub fn from_env() -> Result<Self, MapCacheError> {
        match env::var(ROOT_ENV_VAR) {
            Ok(value) => Ok(Self::new(value)),
            Err(env::VarError::NotPresent) => {
                let cwd = env::current_dir().map_err(MapCacheError::CurrentDir)?;
                Ok(Self::new(cwd.join("cache")))
            }
            Err(source) => Err(MapCacheError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn map_path(&self, map_pid: u32) -> PathBuf {
        self.root
            .join(MAPS_DIR)
            .join(format!("{map_pid}.{MAP_EXTENSION}"))
    }

    /// Validates the header against `map_pid` and stores the blob.
    pub fn store(&self, map_pid: u32, bytes: &[u8]) -> Result<MapHashes, MapCacheError> {
        let path = self.map_path(map_pid);
        let format_error = |source| MapCacheError::Format {
            path: path.clone(),
            source,
        };
        let header = MapHeader::parse(bytes).map_err(format_error)?;
        if header.proto_id != map_pid {
            return Err(format_error(MapFormatError::ProtoMismatch {
                found: header.proto_id,
                expected: map_pid,
            }));
        }
        let hashes = MapHashes::compute(bytes).map_err(format_error)?;

        write_bytes_atomic(&path, bytes).map_err(|source| MapCacheError::Io {
            path: path.clone(),
            source,
        })?;
        info!(
            map_pid,
            bytes = bytes.len(),
            path = %path.display(),
            "map_cached"
        );
        Ok(hashes)
    }

    pub fn load_bytes(&self, map_pid: u32) -> Result<Vec<u8>, MapCacheError> {
        let path = self.map_path(map_pid);
        fs::read(&path).map_err(|source| MapCacheError::Io { path, source })
    }

    pub fn load(&self, map_pid: u32) -> Result<MapBlob, MapCacheError> {
        let bytes = self.load_bytes(map_pid)?;
        MapBlob::decode(&bytes, Some(map_pid)).map_err(|source| MapCacheError::Format {
            path: self.map_path(map_pid),
            source,
        })
    }

    /// Hashes of the cached blob, or `None` when nothing is cached.
    pub fn cached_hashes(&self, map_pid: u32) -> Result<Option<MapHashes>, MapCacheError> {
        let path = self.map_path(map_pid);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(MapCacheError::Io { path, source }),
        };
        MapHashes::compute(&bytes)
            .map(Some)
            .map_err(|source| MapCacheError::Format { path, source })
    }

    /// Whether the cached blob matches a combined hash advertised by the
    /// server. A missing or corrupt entry is simply stale.
    pub fn is_current(&self, map_pid: u32, combined_hash: &str) -> Result<bool, MapCacheError> {
        match self.cached_hashes(map_pid) {
            Ok(Some(hashes)) => Ok(hashes.combined == combined_hash),
            Ok(None) => Ok(false),
            Err(MapCacheError::Format { path, source }) => {
                debug!(map_pid, path = %path.display(), error = %source, "cached_map_invalid");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    pub fn remove(&self, map_pid: u32) -> Result<bool, MapCacheError> {
        let path = self.map_path(map_pid);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(MapCacheError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::format::TileRecord;
    use crate::resources::SpriteHash;

    fn blob(pid: u32) -> MapBlob {
        let mut blob = MapBlob::new(pid, 30, 30);
        blob.tiles.push(TileRecord {
            hex_x: 4,
            hex_y: 4,
            sprite: SpriteHash(11),
            ..TileRecord::default()
        });
        blob
    }

    #[test]
    fn store_then_load_by_pid() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let cache = MapCache::new(temp.path());
        let bytes = blob(12).encode();
        let hashes = cache.store(12, &bytes).expect("store");
        assert!(cache.map_path(12).ends_with("maps/12.fomap"));
        assert_eq!(cache.load(12).expect("load"), blob(12));
        assert!(cache.is_current(12, &hashes.combined).expect("compare"));
        assert!(!cache.is_current(12, "00").expect("compare"));
    }

    #[test]
    fn store_rejects_blob_for_other_map() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let cache = MapCache::new(temp.path());
        let error = cache.store(3, &blob(4).encode()).expect_err("pid mismatch");
        assert!(matches!(
            error,
            MapCacheError::Format {
                source: MapFormatError::ProtoMismatch { .. },
                ..
            }
        ));
        assert!(!cache.map_path(3).exists());
    }

    #[test]
    fn missing_and_corrupt_entries_are_stale() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let cache = MapCache::new(temp.path());
        assert_eq!(cache.cached_hashes(9).expect("lookup"), None);
        assert!(matches!(cache.load(9), Err(MapCacheError::Io { .. })));

        let path = cache.map_path(9);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"garbage").expect("write garbage");
        assert!(!cache.is_current(9, "abc").expect("compare"));
        assert!(matches!(cache.load(9), Err(MapCacheError::Format { .. })));
        assert!(cache.remove(9).expect("remove"));
        assert!(!cache.remove(9).expect("remove again"));
    }
}
