//! Binary map blobs: record layout, section hashing and the on-disk cache.

mod atomic_io;
mod cache;
mod format;
mod hashing;

pub use cache::{MapCache, MapCacheError, ROOT_ENV_VAR};
pub use format::{
    MapBlob, MapFormatError, MapHeader, SceneryRecord, TileRecord, FORMAT_VERSION, HEADER_SIZE,
    SCENERY_RECORD_SIZE, TILE_RECORD_SIZE,
};
pub use hashing::MapHashes;
