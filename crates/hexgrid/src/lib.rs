pub mod config;
pub mod draw;
pub mod entity;
pub mod field;
pub mod geometry;
pub mod light;
pub mod manager;
pub mod map;
pub mod path;
pub mod resources;
pub mod trace;
pub mod view;

pub use config::{Capabilities, ConfigError, HexSettings};
pub use draw::{DrawEntry, DrawList, DrawOrder, DrawSubject};
pub use entity::{
    Contour, Critter, CritterCondition, CritterFind, CritterId, Item, ItemFlags, ItemKind,
    ItemProto, ItemId, ProtoError, ProtoId, ProtoRegistry,
};
pub use field::{Corner, Field, FieldFlags, FieldGrid, FieldItem, Tile};
pub use geometry::{GridTopology, Hex, HexLayout, HexOffsets};
pub use light::{LightCapacity, LightParams, LightPoint, LightSource};
pub use manager::{
    BulletReport, FogBorders, FogRequest, HexManager, MapLoadError, MapState, PixelHit, ShowLayer,
    STATIC_ITEM_ID_BASE,
};
pub use map::{MapBlob, MapCache, MapCacheError, MapFormatError, MapHashes};
pub use path::{PathRequest, PathResult, Pathfinder};
pub use resources::{HexMask, HexMaskError, SpriteHash, SpriteInfo, SpriteSource, SpriteTable};
pub use trace::{BulletOutcome, BulletTrace};
pub use view::{CritterLock, ScrollInput};
