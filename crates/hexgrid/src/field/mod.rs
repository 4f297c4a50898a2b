mod grid;

use serde::{Deserialize, Serialize};

use crate::entity::{CritterId, ItemId, ItemKind};
use crate::resources::SpriteHash;

pub use grid::FieldGrid;

/// Which hex edge a wall sprite covers; gates light leaking along the wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    #[default]
    NorthSouth,
    West,
    East,
    South,
    North,
    EastWest,
}

impl Corner {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NorthSouth),
            1 => Some(Self::West),
            2 => Some(Self::East),
            3 => Some(Self::South),
            4 => Some(Self::North),
            5 => Some(Self::EastWest),
            _ => None,
        }
    }

    pub(crate) fn faces_north_south(self) -> bool {
        matches!(self, Self::NorthSouth | Self::North | Self::West)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldFlags {
    pub is_wall: bool,
    pub is_wall_shoot_through: bool,
    pub is_wall_transparent: bool,
    pub is_scenery: bool,
    pub is_exit_grid: bool,
    pub is_not_passed: bool,
    pub is_not_raked: bool,
    pub is_no_light: bool,
    pub scroll_block: bool,
    pub is_multihex: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub sprite: SpriteHash,
    pub offset_x: i16,
    pub offset_y: i16,
    pub layer: u8,
}

/// Blocking traits of an item, copied onto every Field the item touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub no_block: bool,
    pub shoot_thru: bool,
    pub light_thru: bool,
    pub scroll_block: bool,
    pub corner: Corner,
}

impl FieldItem {
    fn sort_rank(&self) -> u8 {
        match self.kind {
            ItemKind::Wall => 0,
            ItemKind::Scenery | ItemKind::Grid { .. } => 1,
            ItemKind::Generic => 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Field {
    critter: Option<CritterId>,
    dead_critters: Vec<CritterId>,
    tiles: Vec<Tile>,
    roofs: Vec<Tile>,
    pub roof_num: u32,
    items: Vec<FieldItem>,
    block_lines: Vec<FieldItem>,
    multihex_refs: u16,
    scroll_block_border: bool,
    flags: FieldFlags,
    corner: Corner,
}

impl Field {
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    pub fn corner(&self) -> Corner {
        self.corner
    }

    pub fn critter(&self) -> Option<CritterId> {
        self.critter
    }

    pub fn dead_critters(&self) -> &[CritterId] {
        &self.dead_critters
    }

    pub fn items(&self) -> &[FieldItem] {
        &self.items
    }

    pub fn block_line_items(&self) -> &[FieldItem] {
        &self.block_lines
    }

    pub fn tiles(&self, roof: bool) -> &[Tile] {
        if roof {
            &self.roofs
        } else {
            &self.tiles
        }
    }

    pub fn set_critter(&mut self, critter: Option<CritterId>) {
        self.critter = critter;
        self.process_cache();
    }

    pub fn add_dead_critter(&mut self, id: CritterId) {
        if !self.dead_critters.contains(&id) {
            self.dead_critters.push(id);
        }
    }

    pub fn erase_dead_critter(&mut self, id: CritterId) -> bool {
        let before = self.dead_critters.len();
        self.dead_critters.retain(|dead| *dead != id);
        before != self.dead_critters.len()
    }

    /// Inserts the item after every item of the same or a more blocking kind:
    /// walls first, then scenery and grids, then generic items.
    pub fn add_item(&mut self, item: FieldItem) {
        let rank = item.sort_rank();
        let position = self
            .items
            .iter()
            .position(|existing| existing.sort_rank() > rank)
            .unwrap_or(self.items.len());
        self.items.insert(position, item);
        self.process_cache();
    }

    pub fn erase_item(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = before != self.items.len();
        if removed {
            self.process_cache();
        }
        removed
    }

    pub fn add_block_line(&mut self, item: FieldItem) {
        self.block_lines.push(item);
        self.process_cache();
    }

    pub fn erase_block_line(&mut self, id: ItemId) -> bool {
        let before = self.block_lines.len();
        self.block_lines.retain(|item| item.id != id);
        let removed = before != self.block_lines.len();
        if removed {
            self.process_cache();
        }
        removed
    }

    pub fn add_tile(&mut self, tile: Tile, roof: bool) {
        if roof {
            self.roofs.push(tile);
        } else {
            self.tiles.push(tile);
        }
    }

    pub fn erase_tile(&mut self, index: usize, roof: bool) -> Option<Tile> {
        let list = if roof { &mut self.roofs } else { &mut self.tiles };
        (index < list.len()).then(|| list.remove(index))
    }

    pub fn set_multihex(&mut self, occupied: bool) {
        if occupied {
            self.multihex_refs = self.multihex_refs.saturating_add(1);
        } else {
            self.multihex_refs = self.multihex_refs.saturating_sub(1);
        }
        self.process_cache();
    }

    pub fn set_scroll_block_border(&mut self, value: bool) {
        self.scroll_block_border = value;
        self.process_cache();
    }

    pub fn is_scroll_block_border(&self) -> bool {
        self.scroll_block_border
    }

    /// Recomputes every cached flag from the item lists and occupancy.
    pub fn process_cache(&mut self) {
        let is_multihex = self.multihex_refs > 0;
        let mut flags = FieldFlags {
            is_multihex,
            is_not_passed: self.critter.is_some() || is_multihex || self.scroll_block_border,
            ..FieldFlags::default()
        };
        let mut corner = Corner::default();

        for item in &self.items {
            match item.kind {
                ItemKind::Wall => {
                    flags.is_wall = true;
                    flags.is_wall_transparent = item.light_thru;
                    flags.is_wall_shoot_through = item.shoot_thru;
                    corner = item.corner;
                }
                ItemKind::Scenery => flags.is_scenery = true,
                ItemKind::Grid { exit } => {
                    flags.is_scenery = true;
                    flags.is_exit_grid |= exit;
                }
                ItemKind::Generic => {}
            }
            flags.is_not_passed |= !item.no_block;
            flags.is_not_raked |= !item.shoot_thru;
            flags.scroll_block |= item.scroll_block;
            flags.is_no_light |= !item.light_thru;
        }

        for item in &self.block_lines {
            flags.is_not_passed = true;
            flags.is_not_raked |= !item.shoot_thru;
            flags.is_no_light |= !item.light_thru;
        }

        self.flags = flags;
        self.corner = corner;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32, kind: ItemKind) -> FieldItem {
        FieldItem {
            id: ItemId(id),
            kind,
            no_block: false,
            shoot_thru: false,
            light_thru: false,
            scroll_block: false,
            corner: Corner::default(),
        }
    }

    fn expected_not_passed(field: &Field) -> bool {
        field.critter().is_some()
            || field.flags().is_multihex
            || field.items().iter().any(|item| !item.no_block)
            || !field.block_line_items().is_empty()
    }

    #[test]
    fn flags_follow_item_list() {
        let mut field = Field::default();
        let mut wall = item(1, ItemKind::Wall);
        wall.corner = Corner::West;
        wall.light_thru = true;
        field.add_item(wall);
        assert!(field.flags().is_wall);
        assert!(field.flags().is_wall_transparent);
        assert!(field.flags().is_not_passed);
        assert!(field.flags().is_not_raked);
        assert!(!field.flags().is_no_light);
        assert_eq!(field.corner(), Corner::West);

        assert!(field.erase_item(ItemId(1)));
        assert_eq!(field.flags(), FieldFlags::default());
        assert_eq!(field.corner(), Corner::NorthSouth);
        assert!(!field.erase_item(ItemId(1)));
    }

    #[test]
    fn not_passed_matches_definition_through_mutations() {
        let mut field = Field::default();
        let mut passable = item(1, ItemKind::Generic);
        passable.no_block = true;
        passable.shoot_thru = true;
        passable.light_thru = true;

        field.add_item(passable);
        assert_eq!(field.flags().is_not_passed, expected_not_passed(&field));
        field.set_critter(Some(CritterId(9)));
        assert_eq!(field.flags().is_not_passed, expected_not_passed(&field));
        field.set_critter(None);
        assert_eq!(field.flags().is_not_passed, expected_not_passed(&field));
        field.add_item(item(2, ItemKind::Scenery));
        assert_eq!(field.flags().is_not_passed, expected_not_passed(&field));
        field.erase_item(ItemId(2));
        field.set_multihex(true);
        assert_eq!(field.flags().is_not_passed, expected_not_passed(&field));
        field.set_multihex(false);
        assert!(!field.flags().is_not_passed);
    }

    #[test]
    fn block_lines_always_block_movement() {
        let mut field = Field::default();
        let mut line = item(4, ItemKind::Wall);
        line.no_block = true;
        line.shoot_thru = true;
        field.add_block_line(line);
        assert!(field.flags().is_not_passed);
        assert!(!field.flags().is_not_raked);
        assert!(field.flags().is_no_light);
        assert!(!field.flags().is_wall);
        assert!(field.erase_block_line(ItemId(4)));
        assert!(!field.flags().is_not_passed);
    }

    #[test]
    fn items_are_kept_walls_first() {
        let mut field = Field::default();
        field.add_item(item(1, ItemKind::Generic));
        field.add_item(item(2, ItemKind::Scenery));
        field.add_item(item(3, ItemKind::Wall));
        field.add_item(item(4, ItemKind::Grid { exit: true }));
        let ids = field.items().iter().map(|item| item.id.0).collect::<Vec<_>>();
        assert_eq!(ids, vec![3, 2, 4, 1]);
        assert!(field.flags().is_exit_grid);
        assert!(field.flags().is_scenery);
    }

    #[test]
    fn overlapping_multihex_footprints_are_counted() {
        let mut field = Field::default();
        field.set_multihex(true);
        field.set_multihex(true);
        field.set_multihex(false);
        assert!(field.flags().is_multihex);
        field.set_multihex(false);
        assert!(!field.flags().is_multihex);
    }

    #[test]
    fn scroll_block_border_persists_across_cache_rebuilds() {
        let mut field = Field::default();
        field.set_scroll_block_border(true);
        field.add_item(item(1, ItemKind::Generic));
        field.erase_item(ItemId(1));
        assert!(field.flags().is_not_passed);
    }
}
