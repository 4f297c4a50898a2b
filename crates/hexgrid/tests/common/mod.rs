#![allow(dead_code)]

use hexgrid::map::SceneryRecord;
use hexgrid::{
    Capabilities, Corner, HexManager, HexSettings, ItemFlags, ItemKind, ItemProto, LightParams,
    MapBlob, ProtoId, ProtoRegistry, SpriteHash, SpriteInfo, SpriteTable,
};

pub const WALL_PAIR: ProtoId = ProtoId(1);
pub const ROCK: ProtoId = ProtoId(2);
pub const LAMP: ProtoId = ProtoId(3);
pub const SPRITE: SpriteHash = SpriteHash(77);

fn proto(id: ProtoId, kind: ItemKind, flags: ItemFlags) -> ItemProto {
    ItemProto {
        id,
        kind,
        flags,
        corner: Corner::NorthSouth,
        block_lines: Vec::new(),
        sprite: SPRITE,
        light: None,
        draw_order_offset_y: 0,
    }
}

pub fn protos() -> ProtoRegistry {
    let mut protos = ProtoRegistry::new();
    protos.insert(ItemProto {
        // Also blocks the neighbor in direction 3.
        block_lines: vec![0x31],
        ..proto(WALL_PAIR, ItemKind::Wall, ItemFlags::default())
    });
    protos.insert(proto(ROCK, ItemKind::Scenery, ItemFlags::default()));
    protos.insert(ItemProto {
        light: Some(LightParams {
            color: 0xFF_FF_FF,
            distance: 3,
            intensity: 100,
            flags: 0,
        }),
        ..proto(
            LAMP,
            ItemKind::Scenery,
            ItemFlags {
                no_block: true,
                shoot_thru: true,
                light_thru: true,
                ..ItemFlags::default()
            },
        )
    });
    protos
}

pub fn sprites() -> SpriteTable {
    let mut table = SpriteTable::new();
    table.insert(
        SPRITE,
        SpriteInfo {
            width: 32,
            height: 16,
            offset_x: 0,
            offset_y: 0,
        },
    );
    table
}

pub fn manager() -> HexManager {
    HexManager::new(
        HexSettings::default(),
        Capabilities::default(),
        protos(),
        Box::new(sprites()),
    )
    .expect("default settings are valid")
}

pub fn loaded(blob: &MapBlob) -> HexManager {
    let mut manager = manager();
    manager.load_map(blob).expect("map loads");
    manager
}

pub fn scenery(proto_id: ProtoId, x: u16, y: u16) -> SceneryRecord {
    SceneryRecord {
        proto_id,
        hex_x: x,
        hex_y: y,
        ..SceneryRecord::default()
    }
}

/// Small deterministic generator so property sweeps are reproducible.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self, bound: u32) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) % u64::from(bound)) as u32
    }
}
