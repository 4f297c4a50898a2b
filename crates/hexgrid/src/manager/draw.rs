use tracing::{debug, info, warn};

use crate::draw::{DrawEntry, DrawList, DrawOrder, DrawSubject};
use crate::entity::{Critter, CritterId, Item, ItemId, ProtoId};
use crate::geometry::Hex;
use crate::resources::SpriteHash;

use super::HexManager;

/// Visibility toggles of the draw lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowLayer {
    Tiles,
    Roofs,
    Items,
    Scenery,
    Walls,
    Critters,
    /// Editor "fast" protos.
    Fast,
}

impl HexManager {
    pub fn is_shown(&self, layer: ShowLayer) -> bool {
        let settings = &self.settings;
        match layer {
            ShowLayer::Tiles => settings.show_tiles,
            ShowLayer::Roofs => settings.show_roofs,
            ShowLayer::Items => settings.show_items,
            ShowLayer::Scenery => settings.show_scenery,
            ShowLayer::Walls => settings.show_walls,
            ShowLayer::Critters => settings.show_critters,
            ShowLayer::Fast => settings.show_fast,
        }
    }

    pub fn set_show(&mut self, layer: ShowLayer, show: bool) {
        let settings = &mut self.settings;
        let slot = match layer {
            ShowLayer::Tiles => &mut settings.show_tiles,
            ShowLayer::Roofs => &mut settings.show_roofs,
            ShowLayer::Items => &mut settings.show_items,
            ShowLayer::Scenery => &mut settings.show_scenery,
            ShowLayer::Walls => &mut settings.show_walls,
            ShowLayer::Critters => &mut settings.show_critters,
            ShowLayer::Fast => &mut settings.show_fast,
        };
        if *slot == show {
            return;
        }
        *slot = show;
        if self.is_map_loaded() {
            self.refresh_map();
        }
    }

    pub fn tiles_draw_list(&self) -> &DrawList {
        &self.tiles_list
    }

    pub fn main_draw_list(&self) -> &DrawList {
        &self.main_list
    }

    pub fn roofs_draw_list(&self) -> &DrawList {
        &self.roofs_list
    }

    pub fn refresh_map(&mut self) {
        self.rebuild_map(self.view.screen_hex());
    }

    /// Recenters the view on `center` and rebuilds light and all three
    /// draw lists.
    pub fn rebuild_map(&mut self, center: Hex) {
        if !self.is_map_loaded() {
            return;
        }
        self.view.init_view(center);
        self.view_positions.clear();
        for cell in self.view.cells() {
            if let Some(hex) = self.grid.hex_at(cell.hex_x, cell.hex_y) {
                self.view_positions
                    .insert(hex, (cell.screen_x, cell.screen_y));
            }
        }

        self.rebuild_light();
        self.rebuild_main();
        self.rebuild_tiles();
        self.rebuild_roofs();
        debug!(
            center_x = center.x,
            center_y = center.y,
            cells = self.view.cells().len(),
            tiles = self.tiles_list.len(),
            main = self.main_list.len(),
            roofs = self.roofs_list.len(),
            "map_rebuilt"
        );
    }

    fn rebuild_main(&mut self) {
        let mut list = DrawList::new();
        let mut hexes: Vec<(Hex, (i32, i32))> =
            self.view_positions.iter().map(|(hex, pos)| (*hex, *pos)).collect();
        hexes.sort_unstable_by_key(|(hex, _)| (hex.y, hex.x));

        for (hex, cell) in hexes {
            if self.show_tracks {
                if let Some(&track) = self.tracks.get(&hex) {
                    list.push(self.track_entry(hex, track, cell));
                }
            }
            let field = self.grid.field(hex);
            for field_item in field.items() {
                let Some(item) = self.items.get(&field_item.id) else {
                    continue;
                };
                if self.is_item_drawn(item) {
                    list.push(self.item_entry(item, cell));
                }
            }
            if self.settings.show_critters {
                let occupants = field.critter().into_iter().chain(field.dead_critters().iter().copied());
                for id in occupants {
                    if let Some(critter) = self.critters.get(&id).filter(|critter| critter.visible) {
                        list.push(self.critter_entry(critter, cell));
                    }
                }
            }
        }
        list.sort_by_map_pos();
        self.main_list = list;
    }

    pub(super) fn rebuild_tiles(&mut self) {
        self.tiles_list = self.build_tile_list(false);
    }

    pub(super) fn rebuild_roofs(&mut self) {
        self.roofs_list = self.build_tile_list(true);
    }

    fn build_tile_list(&self, roof: bool) -> DrawList {
        let mut list = DrawList::new();
        let shown = if roof {
            self.settings.show_roofs
        } else {
            self.settings.show_tiles
        };
        if !shown || !self.is_map_loaded() {
            return list;
        }

        let mut hexes: Vec<(&Hex, &(i32, i32))> = self.view_positions.iter().collect();
        hexes.sort_unstable_by_key(|(hex, _)| (hex.y, hex.x));
        for (&hex, &(cell_x, cell_y)) in hexes {
            let field = self.grid.field(hex);
            if roof && self.roof_skip != 0 && self.roof_skip == field.roof_num {
                continue;
            }
            for tile in field.tiles(roof) {
                let subject = if roof {
                    DrawSubject::Roof {
                        layer: tile.layer,
                        roof_group: field.roof_num,
                    }
                } else {
                    DrawSubject::Tile { layer: tile.layer }
                };
                let (ox, oy) = self.tile_anchor(tile, roof);
                let mut entry =
                    DrawEntry::new(subject, DrawOrder::tile_layer(tile.layer), hex, tile.sprite);
                entry.screen_x = cell_x + ox;
                entry.screen_y = cell_y + oy;
                if roof {
                    entry.alpha = self.settings.roof_alpha;
                }
                list.push(entry);
            }
        }
        list.sort_by_map_pos();
        list
    }

    fn is_item_drawn(&self, item: &Item) -> bool {
        let pid = item.proto_id();
        let fast = self.capabilities.editing_features && self.fast_pids.contains(&pid);
        if self.capabilities.editing_features {
            if self.ignore_pids.contains(&pid) || (fast && !self.settings.show_fast) {
                return false;
            }
            if fast {
                return true;
            }
        }
        if item.hidden && !self.capabilities.show_hidden_by_default && !self.capabilities.editing_features {
            return false;
        }
        if item.is_fully_transparent {
            return false;
        }
        if item.is_wall() {
            self.settings.show_walls
        } else if item.kind().is_any_scenery() {
            self.settings.show_scenery
        } else {
            self.settings.show_items
        }
    }

    fn item_entry(&self, item: &Item, (cell_x, cell_y): (i32, i32)) -> DrawEntry {
        let layout = self.view.layout();
        let mut entry = DrawEntry::new(
            DrawSubject::Item(item.id),
            item.draw_order(),
            item.hex,
            item.sprite,
        )
        .with_row_offset(i32::from(item.proto.draw_order_offset_y));
        entry.screen_x = cell_x + layout.half_width() + i32::from(item.offset_x);
        entry.screen_y = cell_y + layout.half_height() + i32::from(item.offset_y);
        entry.sprite_cut = item.sprite_cut;
        if !item.flags().no_light_influence {
            entry.light = Some(self.light.light_at(item.hex));
        }
        entry
    }

    fn critter_entry(&self, critter: &Critter, (cell_x, cell_y): (i32, i32)) -> DrawEntry {
        let layout = self.view.layout();
        let order = if critter.is_dead() {
            DrawOrder::DEAD_CRITTER
        } else {
            DrawOrder::CRITTER
        };
        let mut entry = DrawEntry::new(
            DrawSubject::Critter(critter.id),
            order,
            critter.hex,
            critter.sprite,
        );
        entry.screen_x = cell_x + layout.half_width() + critter.sprite_offset.0;
        entry.screen_y = cell_y + layout.half_height() + critter.sprite_offset.1;
        entry.light = Some(self.light.light_at(critter.hex));
        entry.contour = self.effective_contour(critter);
        entry
    }

    fn track_entry(&self, hex: Hex, track: u8, (cell_x, cell_y): (i32, i32)) -> DrawEntry {
        let layout = self.view.layout();
        let mut entry =
            DrawEntry::new(DrawSubject::Track(track), DrawOrder::TRACK, hex, SpriteHash::NONE);
        entry.screen_x = cell_x + layout.half_width();
        entry.screen_y = cell_y + layout.half_height();
        entry
    }

    /// Adds one item to the main list without a full rebuild.
    pub(super) fn insert_item_entry(&mut self, id: ItemId) {
        let entry = self
            .items
            .get(&id)
            .filter(|item| self.is_item_drawn(item))
            .and_then(|item| {
                let cell = *self.view_positions.get(&item.hex)?;
                Some(self.item_entry(item, cell))
            });
        if let Some(entry) = entry {
            self.main_list.insert_sorted(entry);
        }
    }

    /// Replaces the critter's main-list entry with one for its current
    /// state, or drops it when the critter left the view.
    pub(super) fn refresh_critter_entry(&mut self, id: CritterId) {
        self.main_list.remove(DrawSubject::Critter(id));
        if !self.settings.show_critters {
            return;
        }
        let entry = self
            .critters
            .get(&id)
            .filter(|critter| critter.visible && self.is_critter_placed(critter))
            .and_then(|critter| {
                let cell = *self.view_positions.get(&critter.hex)?;
                Some(self.critter_entry(critter, cell))
            });
        if let Some(entry) = entry {
            self.main_list.insert_sorted(entry);
        }
    }

    /// Resizes the window after a margin grew and rebuilds around the same
    /// center.
    pub(super) fn resize_view(&mut self) {
        if let Err(error) = self.view.resize() {
            warn!(error = %error, "view_resize_failed");
            return;
        }
        info!(
            rows = self.view.rows(),
            cols = self.view.cols(),
            margins = ?self.view.margins(),
            "view_resized"
        );
        self.refresh_map();
    }

    /// Puts a path-track marker on `hex`; `0` removes it.
    pub fn set_track(&mut self, hex: Hex, track: u8) {
        if !self.grid.contains(hex) {
            return;
        }
        if track == 0 {
            self.tracks.remove(&hex);
        } else {
            self.tracks.insert(hex, track);
        }
    }

    pub fn tracks(&self) -> impl Iterator<Item = (Hex, u8)> + '_ {
        self.tracks.iter().map(|(hex, track)| (*hex, *track))
    }

    pub fn clear_tracks(&mut self) {
        self.tracks.clear();
    }

    pub fn show_tracks(&self) -> bool {
        self.show_tracks
    }

    pub fn set_show_tracks(&mut self, show: bool) {
        if self.show_tracks != show {
            self.show_tracks = show;
            self.refresh_map();
        }
    }

    pub fn add_fast_pid(&mut self, pid: ProtoId) {
        self.fast_pids.insert(pid);
    }

    pub fn is_fast_pid(&self, pid: ProtoId) -> bool {
        self.fast_pids.contains(&pid)
    }

    pub fn clear_fast_pids(&mut self) {
        self.fast_pids.clear();
    }

    pub fn add_ignore_pid(&mut self, pid: ProtoId) {
        self.ignore_pids.insert(pid);
    }

    /// Toggles whether items of `pid` are left out of the draw lists.
    pub fn switch_ignore_pid(&mut self, pid: ProtoId) {
        if !self.ignore_pids.remove(&pid) {
            self.ignore_pids.insert(pid);
        }
    }

    pub fn is_ignore_pid(&self, pid: ProtoId) -> bool {
        self.ignore_pids.contains(&pid)
    }

    pub fn clear_ignore_pids(&mut self) {
        self.ignore_pids.clear();
    }
}
