use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{decode_json, JsonError};
use crate::draw::DrawOrder;
use crate::field::{Corner, FieldItem};
use crate::geometry::{GridTopology, Hex};
use crate::light::LightParams;
use crate::resources::SpriteHash;

use super::{ItemId, ProtoId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Wall,
    Scenery,
    Grid { exit: bool },
    Generic,
}

impl ItemKind {
    pub fn is_any_scenery(self) -> bool {
        !matches!(self, Self::Generic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFlags {
    pub hidden: bool,
    pub flat: bool,
    pub no_block: bool,
    pub shoot_thru: bool,
    pub light_thru: bool,
    pub scroll_block: bool,
    pub no_light_influence: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProto {
    pub id: ProtoId,
    pub kind: ItemKind,
    #[serde(default)]
    pub flags: ItemFlags,
    #[serde(default)]
    pub corner: Corner,
    /// Packed `dir << 4 | steps` segments walked from the item's hex.
    #[serde(default)]
    pub block_lines: Vec<u8>,
    #[serde(default)]
    pub sprite: SpriteHash,
    #[serde(default)]
    pub light: Option<LightParams>,
    #[serde(default)]
    pub draw_order_offset_y: i8,
}

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("failed to read proto table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error("proto table {path} defines proto {id} twice")]
    Duplicate { path: PathBuf, id: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct ProtoRegistry {
    protos: HashMap<ProtoId, Arc<ItemProto>>,
}

impl ProtoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ProtoError> {
        let raw = fs::read_to_string(path).map_err(|source| ProtoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw, path)
    }

    pub fn from_json_str(raw: &str, origin: &Path) -> Result<Self, ProtoError> {
        let protos = decode_json::<Vec<ItemProto>>(raw, origin)?;
        let mut registry = Self::new();
        for proto in protos {
            let id = proto.id;
            if !registry.insert(proto) {
                return Err(ProtoError::Duplicate {
                    path: origin.to_path_buf(),
                    id: id.0,
                });
            }
        }
        Ok(registry)
    }

    /// Returns false when a proto with the same id already exists.
    pub fn insert(&mut self, proto: ItemProto) -> bool {
        if self.protos.contains_key(&proto.id) {
            return false;
        }
        self.protos.insert(proto.id, Arc::new(proto));
        true
    }

    pub fn get(&self, id: ProtoId) -> Option<Arc<ItemProto>> {
        self.protos.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }
}

/// A hex-attached item: a shared proto plus per-instance overrides.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub proto: Arc<ItemProto>,
    pub hex: Hex,
    pub offset_x: i16,
    pub offset_y: i16,
    pub sprite: SpriteHash,
    pub sprite_cut: u8,
    pub dir: u8,
    pub light: Option<LightParams>,
    pub locker: u8,
    pub hidden: bool,
    /// Map-baked walls and scenery; dynamic ground items are not static.
    pub is_static: bool,
    pub is_transparent: bool,
    pub is_fully_transparent: bool,
    pub can_use: bool,
    pub can_talk: bool,
}

impl Item {
    pub fn new(id: ItemId, proto: Arc<ItemProto>, hex: Hex) -> Self {
        Self {
            id,
            hex,
            offset_x: 0,
            offset_y: 0,
            sprite: proto.sprite,
            sprite_cut: 0,
            dir: 0,
            light: proto.light,
            locker: 0,
            hidden: proto.flags.hidden,
            is_static: false,
            is_transparent: false,
            is_fully_transparent: false,
            can_use: false,
            can_talk: false,
            proto,
        }
    }

    pub fn proto_id(&self) -> ProtoId {
        self.proto.id
    }

    pub fn kind(&self) -> ItemKind {
        self.proto.kind
    }

    pub fn is_wall(&self) -> bool {
        self.kind() == ItemKind::Wall
    }

    pub fn flags(&self) -> ItemFlags {
        self.proto.flags
    }

    pub fn is_light_source(&self) -> bool {
        self.light.is_some_and(|light| light.is_active())
    }

    /// Whether adding or removing this item changes how light propagates.
    pub fn affects_light(&self) -> bool {
        self.is_light_source() || !self.proto.flags.light_thru
    }

    pub fn field_item(&self) -> FieldItem {
        let flags = self.proto.flags;
        FieldItem {
            id: self.id,
            kind: self.proto.kind,
            no_block: flags.no_block,
            shoot_thru: flags.shoot_thru,
            light_thru: flags.light_thru,
            scroll_block: flags.scroll_block,
            corner: self.proto.corner,
        }
    }

    pub fn draw_order(&self) -> DrawOrder {
        let is_item = !self.kind().is_any_scenery();
        match (self.proto.flags.flat, is_item) {
            (true, true) => DrawOrder::FLAT_ITEM,
            (true, false) => DrawOrder::FLAT_SCENERY,
            (false, true) => DrawOrder::ITEM,
            (false, false) => DrawOrder::SCENERY,
        }
    }

    /// Hexes covered by the proto's block lines, skipping positions outside
    /// the grid while still walking through them.
    pub fn block_line_hexes(&self, topology: GridTopology, width: u16, height: u16) -> Vec<Hex> {
        block_line_hexes(&self.proto.block_lines, self.hex, topology, width, height)
    }
}

pub(crate) fn block_line_hexes(
    lines: &[u8],
    origin: Hex,
    topology: GridTopology,
    width: u16,
    height: u16,
) -> Vec<Hex> {
    let mut hexes = Vec::new();
    let (mut x, mut y) = (i32::from(origin.x), i32::from(origin.y));
    for &segment in lines {
        let dir = segment >> 4;
        let steps = segment & 0x0F;
        if dir >= topology.dirs_count() || steps == 0 {
            break;
        }
        for _ in 0..steps {
            (x, y) = topology.move_unchecked(x, y, dir);
            if let Some(hex) = Hex::from_i32(x, y, width, height) {
                hexes.push(hex);
            }
        }
    }
    hexes
}
