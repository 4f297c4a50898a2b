//! Composition root: owns the grid, the entities standing on it, the light
//! buffer and the view of one loaded map.

mod critters;
mod draw;
mod fog;
mod items;
mod lighting;
mod paths;
mod picking;
mod roofs;
mod view;

use std::collections::{BTreeMap, BTreeSet, HashMap, TryReserveError};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Capabilities, ConfigError, HexSettings};
use crate::draw::DrawList;
use crate::entity::{Contour, Critter, CritterId, Item, ItemId, ItemKind, ProtoId, ProtoRegistry};
use crate::field::{FieldGrid, Tile};
use crate::geometry::{GridTopology, Hex, HexOffsets};
use crate::light::{LightAccumulator, LightCapacity, LightSource};
use crate::map::{MapBlob, MapCache, MapCacheError, MapFormatError, SceneryRecord, TileRecord};
use crate::path::Pathfinder;
use crate::resources::{HexMask, SpriteHash, SpriteSource};
use crate::view::{ScrollState, ViewWindow};

pub use draw::ShowLayer;
pub use fog::{FogBorders, FogRequest};
pub use paths::BulletReport;
pub use picking::PixelHit;

/// Ids handed to walls and scenery created from map data; network items
/// use the lower half of the range.
pub const STATIC_ITEM_ID_BASE: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error(transparent)]
    Format(#[from] MapFormatError),
    #[error(transparent)]
    Cache(#[from] MapCacheError),
    #[error("map {map_pid} has invalid dimensions {width}x{height}")]
    Dimensions {
        map_pid: u32,
        width: u16,
        height: u16,
    },
    #[error("failed to allocate {what}: {source}")]
    Allocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },
    #[error("operation requires a loaded map, manager is {state:?}")]
    State { state: MapState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StaticSection {
    Walls,
    Scenery,
}

pub struct HexManager {
    settings: HexSettings,
    capabilities: Capabilities,
    protos: ProtoRegistry,
    sprites: Box<dyn SpriteSource>,
    hex_mask: Option<HexMask>,
    state: MapState,
    map_pid: u32,
    grid: FieldGrid,
    offsets: HexOffsets,
    pathfinder: Pathfinder,
    light: LightAccumulator,
    light_capacity: LightCapacity,
    rebuild_light_requested: bool,
    static_lights: Vec<LightSource>,
    view: ViewWindow,
    scroll: ScrollState,
    /// Cell pixel of every in-bounds hex currently inside the view window.
    view_positions: HashMap<Hex, (i32, i32)>,
    critters: BTreeMap<CritterId, Critter>,
    chosen: Option<CritterId>,
    items: BTreeMap<ItemId, Item>,
    tiles_list: DrawList,
    main_list: DrawList,
    roofs_list: DrawList,
    roof_skip: u32,
    critter_contour: Option<(CritterId, Contour)>,
    crowd_contour: Contour,
    tracks: BTreeMap<Hex, u8>,
    show_tracks: bool,
    fast_pids: BTreeSet<ProtoId>,
    ignore_pids: BTreeSet<ProtoId>,
}

impl HexManager {
    pub fn new(
        settings: HexSettings,
        capabilities: Capabilities,
        protos: ProtoRegistry,
        sprites: Box<dyn SpriteSource>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            offsets: HexOffsets::new(settings.topology),
            pathfinder: Pathfinder::new(settings.max_find_path, settings.smooth_path),
            light: LightAccumulator::new(settings.soft_light_length()),
            view: ViewWindow::new(&settings),
            settings,
            capabilities,
            protos,
            sprites,
            hex_mask: None,
            state: MapState::Unloaded,
            map_pid: 0,
            grid: FieldGrid::default(),
            light_capacity: LightCapacity::default(),
            rebuild_light_requested: false,
            static_lights: Vec::new(),
            scroll: ScrollState::new(),
            view_positions: HashMap::new(),
            critters: BTreeMap::new(),
            chosen: None,
            items: BTreeMap::new(),
            tiles_list: DrawList::new(),
            main_list: DrawList::new(),
            roofs_list: DrawList::new(),
            roof_skip: 0,
            critter_contour: None,
            crowd_contour: Contour::None,
            tracks: BTreeMap::new(),
            show_tracks: false,
            fast_pids: BTreeSet::new(),
            ignore_pids: BTreeSet::new(),
        })
    }

    /// Enables pixel-exact hex picking; `None` falls back to cell rectangles.
    pub fn set_hex_mask(&mut self, mask: Option<HexMask>) {
        self.hex_mask = mask;
    }

    pub fn settings(&self) -> &HexSettings {
        &self.settings
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn protos(&self) -> &ProtoRegistry {
        &self.protos
    }

    pub fn protos_mut(&mut self) -> &mut ProtoRegistry {
        &mut self.protos
    }

    pub fn grid(&self) -> &FieldGrid {
        &self.grid
    }

    pub fn topology(&self) -> GridTopology {
        self.settings.topology
    }

    pub fn view(&self) -> &ViewWindow {
        &self.view
    }

    pub fn state(&self) -> MapState {
        self.state
    }

    pub fn is_map_loaded(&self) -> bool {
        self.state == MapState::Loaded
    }

    /// Proto id of the loaded map, zero when unloaded.
    pub fn map_pid(&self) -> u32 {
        self.map_pid
    }

    pub fn width(&self) -> u16 {
        self.grid.width()
    }

    pub fn height(&self) -> u16 {
        self.grid.height()
    }

    pub fn load_map_bytes(&mut self, map_pid: u32, bytes: &[u8]) -> Result<(), MapLoadError> {
        let blob = MapBlob::decode(bytes, Some(map_pid))?;
        self.load_map(&blob)
    }

    pub fn load_cached_map(&mut self, cache: &MapCache, map_pid: u32) -> Result<(), MapLoadError> {
        let blob = cache.load(map_pid)?;
        self.load_map(&blob)
    }

    /// Replaces whatever is loaded with `blob`. On failure the manager is
    /// left unloaded.
    pub fn load_map(&mut self, blob: &MapBlob) -> Result<(), MapLoadError> {
        self.unload_map();
        if blob.width == 0 || blob.height == 0 {
            return Err(MapLoadError::Dimensions {
                map_pid: blob.proto_id,
                width: blob.width,
                height: blob.height,
            });
        }

        self.state = MapState::Loading;
        self.map_pid = blob.proto_id;
        if let Err(error) = self.populate(blob) {
            self.reset();
            return Err(error);
        }
        self.state = MapState::Loaded;
        self.scroll.reset();

        let center = Hex::new(blob.width / 2, blob.height / 2);
        self.rebuild_map(center);
        info!(
            map_pid = blob.proto_id,
            width = blob.width,
            height = blob.height,
            tiles = blob.tiles.len(),
            items = self.items.len(),
            lights = self.static_lights.len(),
            "map_loaded"
        );
        Ok(())
    }

    fn populate(&mut self, blob: &MapBlob) -> Result<(), MapLoadError> {
        self.grid
            .resize(blob.width, blob.height)
            .map_err(|source| MapLoadError::Allocation {
                what: "field grid",
                source,
            })?;

        for (index, record) in blob.tiles.iter().enumerate() {
            self.load_tile(index, record);
        }
        self.number_roofs();

        let records = blob
            .walls
            .iter()
            .map(|record| (StaticSection::Walls, record))
            .chain(blob.scenery.iter().map(|record| (StaticSection::Scenery, record)));
        for (index, (section, record)) in records.enumerate() {
            self.load_static_item(index as u32, section, record);
        }
        self.bake_static_lights();
        self.mark_scroll_block_borders();

        self.view
            .resize()
            .map_err(|source| MapLoadError::Allocation {
                what: "view window",
                source,
            })?;
        Ok(())
    }

    fn load_tile(&mut self, index: usize, record: &TileRecord) {
        let hex = Hex::new(record.hex_x, record.hex_y);
        if !self.grid.contains(hex) {
            warn!(
                map_pid = self.map_pid,
                index,
                hex_x = record.hex_x,
                hex_y = record.hex_y,
                "tile_out_of_bounds"
            );
            return;
        }
        let Some(info) = self.sprites.sprite_info(record.sprite) else {
            warn!(
                map_pid = self.map_pid,
                index,
                sprite = record.sprite.0,
                "tile_sprite_unknown"
            );
            return;
        };
        let tile = Tile {
            sprite: record.sprite,
            offset_x: record.offset_x,
            offset_y: record.offset_y,
            layer: record.layer,
        };
        let (ox, oy) = self.tile_anchor(&tile, record.is_roof);
        self.grid.field_mut(hex).add_tile(tile, record.is_roof);
        self.view.process_hex_borders(&info, ox, oy);
    }

    fn load_static_item(&mut self, index: u32, section: StaticSection, record: &SceneryRecord) {
        let hex = Hex::new(record.hex_x, record.hex_y);
        if !self.grid.contains(hex) {
            warn!(
                map_pid = self.map_pid,
                index,
                proto = record.proto_id.0,
                hex_x = record.hex_x,
                hex_y = record.hex_y,
                "scenery_out_of_bounds"
            );
            return;
        }
        let Some(proto) = self.protos.get(record.proto_id) else {
            warn!(
                map_pid = self.map_pid,
                index,
                proto = record.proto_id.0,
                "scenery_proto_unknown"
            );
            return;
        };
        if (section == StaticSection::Walls) != (proto.kind == ItemKind::Wall) {
            warn!(
                map_pid = self.map_pid,
                index,
                proto = record.proto_id.0,
                "scenery_section_mismatch"
            );
        }

        let mut item = Item::new(ItemId(STATIC_ITEM_ID_BASE + index), proto, hex);
        item.is_static = true;
        item.offset_x = record.offset_x;
        item.offset_y = record.offset_y;
        item.sprite_cut = record.sprite_cut;
        item.dir = record.dir;
        item.locker = record.locker;
        if !record.sprite.is_none() {
            item.sprite = record.sprite;
        }
        if let Some(light) = record.light() {
            item.light = Some(light);
        }
        self.place_item(item);
    }

    /// Client builds never change static items, so their lights are
    /// collected once per load.
    fn bake_static_lights(&mut self) {
        self.static_lights = self
            .items
            .values()
            .filter(|item| item.is_static && item.is_light_source())
            .filter_map(|item| {
                item.light
                    .map(|light| LightSource::from_params(item.hex, light, None))
            })
            .collect();
    }

    /// Hexes around a scroll-blocking hex become impassable so nothing can
    /// walk to the edge of the scrollable area.
    fn mark_scroll_block_borders(&mut self) {
        let (width, height) = (self.grid.width(), self.grid.height());
        let topology = self.settings.topology;
        let blockers: Vec<Hex> = self
            .grid
            .iter()
            .filter(|(_, field)| field.flags().scroll_block)
            .map(|(hex, _)| hex)
            .collect();
        for hex in blockers {
            for dir in 0..topology.dirs_count() {
                if let Some(next) = topology.move_in_bounds(hex, dir, width, height) {
                    self.grid.field_mut(next).set_scroll_block_border(true);
                }
            }
        }
    }

    pub fn unload_map(&mut self) {
        if self.state == MapState::Unloaded {
            return;
        }
        info!(map_pid = self.map_pid, "map_unloaded");
        self.reset();
    }

    fn reset(&mut self) {
        self.state = MapState::Unloaded;
        self.map_pid = 0;
        self.items.clear();
        self.critters.clear();
        self.chosen = None;
        self.critter_contour = None;
        self.crowd_contour = Contour::None;
        self.grid.release();
        self.light.clear();
        self.static_lights.clear();
        self.rebuild_light_requested = false;
        self.view = ViewWindow::new(&self.settings);
        self.view_positions.clear();
        self.scroll.reset();
        self.tiles_list.clear();
        self.main_list.clear();
        self.roofs_list.clear();
        self.roof_skip = 0;
        self.tracks.clear();
    }

    /// Writes the current tiles and static items back into a blob, for the
    /// map editor.
    pub fn export_map(&self) -> Result<MapBlob, MapLoadError> {
        if !self.is_map_loaded() {
            return Err(MapLoadError::State { state: self.state });
        }
        let mut blob = MapBlob::new(self.map_pid, self.grid.width(), self.grid.height());
        for (hex, field) in self.grid.iter() {
            for roof in [false, true] {
                blob.tiles.extend(field.tiles(roof).iter().map(|tile| TileRecord {
                    hex_x: hex.x,
                    hex_y: hex.y,
                    offset_x: tile.offset_x,
                    offset_y: tile.offset_y,
                    layer: tile.layer,
                    is_roof: roof,
                    sprite: tile.sprite,
                }));
            }
        }
        for item in self.items.values().filter(|item| item.is_static) {
            let light = item.light.unwrap_or_default();
            let record = SceneryRecord {
                proto_id: item.proto_id(),
                hex_x: item.hex.x,
                hex_y: item.hex.y,
                offset_x: item.offset_x,
                offset_y: item.offset_y,
                light_color: light.color,
                light_intensity: light.intensity.clamp(i32::from(i16::MIN), i32::from(i16::MAX))
                    as i16,
                light_distance: light.distance,
                light_flags: light.flags,
                sprite_cut: item.sprite_cut,
                dir: item.dir,
                locker: item.locker,
                sprite: if item.sprite == item.proto.sprite {
                    SpriteHash::NONE
                } else {
                    item.sprite
                },
            };
            if item.is_wall() {
                blob.walls.push(record);
            } else {
                blob.scenery.push(record);
            }
        }
        Ok(blob)
    }

    fn tile_anchor(&self, tile: &Tile, roof: bool) -> (i32, i32) {
        let (base_x, base_y) = if roof {
            (self.settings.roof_offset_x, self.settings.roof_offset_y)
        } else {
            (self.settings.tile_offset_x, self.settings.tile_offset_y)
        };
        (
            base_x + i32::from(tile.offset_x),
            base_y + i32::from(tile.offset_y),
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::light::LightParams;

    fn sample_blob() -> MapBlob {
        let mut blob = MapBlob::new(77, 40, 40);
        blob.tiles.push(TileRecord {
            hex_x: 3,
            hex_y: 4,
            sprite: TILE_SPRITE,
            ..TileRecord::default()
        });
        blob.tiles.push(TileRecord {
            hex_x: 300,
            hex_y: 4,
            sprite: TILE_SPRITE,
            ..TileRecord::default()
        });
        blob.tiles.push(TileRecord {
            hex_x: 5,
            hex_y: 5,
            sprite: SpriteHash(9999),
            ..TileRecord::default()
        });
        blob.walls.push(scenery(WALL, 10, 10));
        blob.scenery.push(scenery(LAMP, 20, 20));
        blob.scenery.push(scenery(ProtoId(404), 21, 20));
        blob
    }

    #[test]
    fn load_skips_bad_records_and_keeps_the_rest() {
        let mut manager = manager_with(Capabilities::default());
        manager.load_map(&sample_blob()).expect("load");
        assert!(manager.is_map_loaded());
        assert_eq!(manager.map_pid(), 77);
        assert_eq!(manager.grid().field(Hex::new(3, 4)).tiles(false).len(), 1);
        assert!(manager.grid().field(Hex::new(5, 5)).tiles(false).is_empty());
        assert_eq!(manager.items.len(), 2);
        assert!(manager.grid().field(Hex::new(10, 10)).flags().is_wall);
        assert_eq!(manager.static_lights.len(), 1);
    }

    #[test]
    fn zero_sized_map_is_rejected_and_manager_stays_unloaded() {
        let mut manager = manager_with(Capabilities::default());
        let error = manager
            .load_map(&MapBlob::new(3, 0, 10))
            .expect_err("zero width");
        assert!(matches!(error, MapLoadError::Dimensions { width: 0, .. }));
        assert_eq!(manager.state(), MapState::Unloaded);
        assert!(manager.grid().is_empty());
    }

    #[test]
    fn unload_releases_everything() {
        let mut manager = manager_with(Capabilities::default());
        manager.load_map(&sample_blob()).expect("load");
        manager.add_critter(critter(1, 5, 5));
        manager.unload_map();
        assert_eq!(manager.state(), MapState::Unloaded);
        assert_eq!(manager.map_pid(), 0);
        assert!(manager.critter(CritterId(1)).is_none());
        assert!(manager.items.is_empty());
        assert!(manager.grid().is_empty());
        assert!(manager.main_draw_list().is_empty());
    }

    #[test]
    fn export_round_trips_static_content() {
        let mut manager = manager_with(Capabilities::default());
        let mut blob = MapBlob::new(5, 30, 30);
        blob.tiles.push(TileRecord {
            hex_x: 1,
            hex_y: 2,
            layer: 1,
            sprite: TILE_SPRITE,
            ..TileRecord::default()
        });
        blob.walls.push(scenery(WALL, 4, 4));
        let mut lamp = scenery(LAMP, 8, 8);
        lamp.light_distance = 5;
        lamp.light_intensity = 50;
        blob.scenery.push(lamp);
        assert!(matches!(
            manager.export_map(),
            Err(MapLoadError::State {
                state: MapState::Unloaded
            })
        ));

        manager.load_map(&blob).expect("load");
        let exported = manager.export_map().expect("export");
        assert_eq!(exported, blob);
        let lamp_item = manager
            .items_at(Hex::new(8, 8))
            .into_iter()
            .next()
            .expect("lamp placed");
        assert_eq!(
            lamp_item.light,
            Some(LightParams {
                color: 0,
                distance: 5,
                intensity: 50,
                flags: 0,
            })
        );
    }

    #[test]
    fn scroll_blockers_make_their_ring_impassable() {
        let mut manager = manager_with(Capabilities::default());
        let mut blob = MapBlob::new(9, 20, 20);
        blob.scenery.push(scenery(SCROLL_BLOCKER, 10, 10));
        manager.load_map(&blob).expect("load");

        let grid = manager.grid();
        assert!(!grid.field(Hex::new(10, 10)).flags().is_not_passed);
        for dir in 0..6 {
            let next = GridTopology::Hexagonal
                .move_in_bounds(Hex::new(10, 10), dir, 20, 20)
                .expect("neighbor");
            assert!(grid.field(next).flags().is_not_passed, "dir {dir}");
        }
    }
}
