use tracing::debug;

use crate::field::Tile;
use crate::geometry::Hex;

use super::HexManager;

impl HexManager {
    /// Renumbers every roofed area from scratch, scanning columns first.
    /// Groups are numbered densely from 1.
    pub(super) fn number_roofs(&mut self) {
        let (width, height) = (self.grid.width(), self.grid.height());
        for x in 0..width {
            for y in 0..height {
                self.grid.field_mut(Hex::new(x, y)).roof_num = 0;
            }
        }
        let mut roof_num = 1u32;
        for x in 0..width {
            for y in 0..height {
                let field = self.grid.field(Hex::new(x, y));
                if !field.tiles(true).is_empty() && field.roof_num == 0 {
                    self.mark_roof_num(Hex::new(x, y), roof_num);
                    roof_num += 1;
                }
            }
        }
        debug!(groups = roof_num - 1, "roofs_numbered");
    }

    /// Flood-fills `num` over the roofed area containing `start`, stepping
    /// in blocks of `roof_skip_size` hexes. Hexes already numbered stop the
    /// fill.
    pub fn mark_roof_num(&mut self, start: Hex, num: u32) {
        let skip = i32::from(self.settings.roof_skip_size);
        let mut pending = vec![(i32::from(start.x), i32::from(start.y))];
        while let Some((x, y)) = pending.pop() {
            let Some(hex) = self.grid.hex_at(x, y) else {
                continue;
            };
            let field = self.grid.field(hex);
            if field.tiles(true).is_empty() || field.roof_num != 0 {
                continue;
            }
            for dx in 0..skip {
                for dy in 0..skip {
                    if let Some(block) = self.grid.hex_at(x + dx, y + dy) {
                        self.grid.field_mut(block).roof_num = num;
                    }
                }
            }
            pending.extend([(x + skip, y), (x - skip, y), (x, y + skip), (x, y - skip)]);
        }
    }

    /// Roof group hidden because the cursor is under it; zero when every
    /// roof is drawn.
    pub fn roof_skip(&self) -> u32 {
        self.roof_skip
    }

    /// Hides the roof group covering `hex`.
    pub fn set_skip_roof(&mut self, hex: Hex) {
        if !self.settings.hide_cursor_roof {
            return;
        }
        let Some(field) = self.grid.get(hex) else {
            return;
        };
        if self.roof_skip != field.roof_num {
            self.roof_skip = field.roof_num;
            self.rebuild_roofs();
        }
    }

    pub fn clear_skip_roof(&mut self) {
        if self.roof_skip != 0 {
            self.roof_skip = 0;
            self.rebuild_roofs();
        }
    }

    /// Puts a tile on `hex`, replacing the tile of the same layer. Only
    /// available with editing features.
    pub fn add_tile(&mut self, hex: Hex, tile: Tile, roof: bool) -> bool {
        if !self.capabilities.editing_features || !self.is_map_loaded() || !self.grid.contains(hex)
        {
            return false;
        }
        let Some(info) = self.sprites.sprite_info(tile.sprite) else {
            debug!(sprite = tile.sprite.0, "tile_sprite_unknown");
            return false;
        };
        self.erase_tile(hex, tile.layer, roof);
        let (ox, oy) = self.tile_anchor(&tile, roof);
        self.grid.field_mut(hex).add_tile(tile, roof);
        if roof {
            self.number_roofs();
        }

        if self.view.process_hex_borders(&info, ox, oy) {
            self.resize_view();
        } else if roof {
            self.rebuild_roofs();
        } else {
            self.rebuild_tiles();
        }
        true
    }

    /// Removes the first tile of `layer` on `hex`.
    pub fn erase_tile(&mut self, hex: Hex, layer: u8, roof: bool) -> Option<Tile> {
        if !self.capabilities.editing_features {
            return None;
        }
        let field = self.grid.get_mut(hex)?;
        let index = field.tiles(roof).iter().position(|tile| tile.layer == layer)?;
        let removed = field.erase_tile(index, roof);
        if roof {
            self.number_roofs();
            self.rebuild_roofs();
        } else {
            self.rebuild_tiles();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::Capabilities;
    use crate::draw::DrawSubject;
    use crate::map::{MapBlob, TileRecord};

    fn roof(x: u16, y: u16) -> TileRecord {
        TileRecord {
            hex_x: x,
            hex_y: y,
            is_roof: true,
            sprite: TILE_SPRITE,
            ..TileRecord::default()
        }
    }

    fn roofed_map() -> MapBlob {
        let mut blob = MapBlob::new(2, 30, 30);
        for x in [10, 12, 14] {
            for y in [10, 12] {
                blob.tiles.push(roof(x, y));
            }
        }
        blob.tiles.push(roof(20, 20));
        blob
    }

    #[test]
    fn contiguous_roofs_share_one_group() {
        let mut manager = manager_with(Capabilities::default());
        manager.load_map(&roofed_map()).expect("load");
        let grid = manager.grid();
        let group = grid.field(Hex::new(10, 10)).roof_num;
        assert_eq!(group, 1);
        assert_eq!(grid.field(Hex::new(14, 12)).roof_num, group);
        assert_eq!(grid.field(Hex::new(15, 13)).roof_num, group);
        assert_eq!(grid.field(Hex::new(20, 20)).roof_num, 2);
        assert_eq!(grid.field(Hex::new(5, 5)).roof_num, 0);
    }

    #[test]
    fn roof_groups_are_numbered_densely() {
        let mut blob = roofed_map();
        blob.tiles.push(roof(26, 4));
        let mut manager = manager_with(Capabilities::default());
        manager.load_map(&blob).expect("load");
        let mut groups: Vec<u32> = manager
            .grid()
            .iter()
            .map(|(_, field)| field.roof_num)
            .filter(|num| *num != 0)
            .collect();
        groups.sort_unstable();
        groups.dedup();
        assert_eq!(groups, vec![1, 2, 3]);
    }

    #[test]
    fn skipping_a_roof_hides_its_whole_group() {
        let mut manager = manager_with(Capabilities::default());
        manager.load_map(&roofed_map()).expect("load");
        let roof_count = |manager: &HexManager| manager.roofs_draw_list().len();
        let before = roof_count(&manager);
        assert_eq!(before, 7);

        manager.set_skip_roof(Hex::new(11, 11));
        assert_eq!(manager.roof_skip(), 1);
        assert_eq!(roof_count(&manager), 1);
        assert!(manager
            .roofs_draw_list()
            .entries()
            .iter()
            .all(|entry| matches!(entry.subject, DrawSubject::Roof { roof_group: 2, .. })));

        manager.clear_skip_roof();
        assert_eq!(roof_count(&manager), before);
    }

    #[test]
    fn tiles_are_editable_only_in_editing_mode() {
        let tile = Tile {
            sprite: TILE_SPRITE,
            offset_x: 0,
            offset_y: 0,
            layer: 2,
        };
        let mut client = loaded_manager(20, 20);
        assert!(!client.add_tile(Hex::new(4, 4), tile, false));

        let mut editor = manager_with(Capabilities {
            editing_features: true,
            ..Capabilities::default()
        });
        editor.load_map(&MapBlob::new(1, 20, 20)).expect("load");
        assert!(editor.add_tile(Hex::new(4, 4), tile, false));
        assert!(editor.add_tile(Hex::new(4, 4), tile, false));
        assert_eq!(editor.grid().field(Hex::new(4, 4)).tiles(false).len(), 1);
        assert_eq!(editor.erase_tile(Hex::new(4, 4), 2, false), Some(tile));
        assert_eq!(editor.erase_tile(Hex::new(4, 4), 2, false), None);
    }
}
