use crate::entity::{Contour, CritterId, ItemId};
use crate::geometry::Hex;
use crate::resources::SpriteHash;

/// Paint layer of a sprite. Orders below [`DrawOrder::DRAW_ORDER`] are flat
/// and always paint under everything standing on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawOrder(pub u8);

impl DrawOrder {
    pub const FLAT: Self = Self(0);
    pub const TILE: Self = Self(0);
    pub const TILE_END: Self = Self(4);
    pub const HEX_GRID: Self = Self(5);
    pub const FLAT_SCENERY: Self = Self(8);
    pub const LIGHT: Self = Self(9);
    pub const DEAD_CRITTER: Self = Self(10);
    pub const FLAT_ITEM: Self = Self(13);
    pub const TRACK: Self = Self(16);
    pub const DRAW_ORDER: Self = Self(20);
    pub const SCENERY: Self = Self(23);
    pub const ITEM: Self = Self(26);
    pub const CRITTER: Self = Self(29);
    pub const RAIN: Self = Self(32);
    pub const LAST: Self = Self(39);

    pub fn tile_layer(layer: u8) -> Self {
        Self((Self::TILE.0 + layer).min(Self::TILE_END.0))
    }

    pub fn is_flat(self) -> bool {
        self < Self::DRAW_ORDER
    }

    /// Sort key placing flat sprites by layer then row, and standing sprites
    /// by row with the layer as the finest key.
    pub fn map_position(self, x: u16, y: i32) -> u64 {
        const ROW: i64 = 10_000;
        let (x, y, order) = (i64::from(x), i64::from(y), i64::from(self.0));
        let key = if self.is_flat() {
            y * ROW + x + ROW * ROW * order
        } else {
            let base = i64::from(Self::DRAW_ORDER.0);
            ROW * ROW * base + y * base * ROW + x * base + (order - base)
        };
        key.max(0) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawSubject {
    Tile { layer: u8 },
    Roof { layer: u8, roof_group: u32 },
    Item(ItemId),
    Critter(CritterId),
    /// Hex track marker; `1` for the hex a path ends on, `2` for the others.
    Track(u8),
}

/// One queued sprite. Screen coordinates are in map space (before scroll
/// and zoom) and already include every offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEntry {
    pub subject: DrawSubject,
    pub order: DrawOrder,
    pub hex: Hex,
    pub sprite: SpriteHash,
    pub screen_x: i32,
    pub screen_y: i32,
    pub sprite_cut: u8,
    /// Hex light modulating the sprite; `None` draws it unlit.
    pub light: Option<[u8; 3]>,
    pub alpha: u8,
    pub contour: Contour,
    /// Insertion index; breaks ties between equal map positions and ranks
    /// hits when picking.
    pub tree_index: u32,
    position: u64,
}

impl DrawEntry {
    pub fn new(subject: DrawSubject, order: DrawOrder, hex: Hex, sprite: SpriteHash) -> Self {
        Self {
            subject,
            order,
            hex,
            sprite,
            screen_x: 0,
            screen_y: 0,
            sprite_cut: 0,
            light: None,
            alpha: 255,
            contour: Contour::None,
            tree_index: 0,
            position: order.map_position(hex.x, i32::from(hex.y)),
        }
    }

    /// Draws the sprite as if it stood `offset` rows lower.
    pub fn with_row_offset(mut self, offset: i32) -> Self {
        self.position = self
            .order
            .map_position(self.hex.x, i32::from(self.hex.y) + offset);
        self
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

#[derive(Debug, Clone, Default)]
pub struct DrawList {
    entries: Vec<DrawEntry>,
    next_index: u32,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_index = 0;
    }

    pub fn push(&mut self, mut entry: DrawEntry) -> u32 {
        entry.tree_index = self.next_index;
        self.next_index += 1;
        self.entries.push(entry);
        entry.tree_index
    }

    pub fn sort_by_map_pos(&mut self) {
        self.entries
            .sort_by_key(|entry| (entry.position, entry.tree_index));
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.tree_index = index as u32;
        }
    }

    /// Inserts after every entry with the same or a lower map position and
    /// renumbers the entries behind it.
    pub fn insert_sorted(&mut self, mut entry: DrawEntry) -> u32 {
        let index = self
            .entries
            .partition_point(|existing| existing.position <= entry.position);
        entry.tree_index = index as u32;
        self.entries.insert(index, entry);
        for (offset, later) in self.entries[index + 1..].iter_mut().enumerate() {
            later.tree_index = (index + 1 + offset) as u32;
        }
        self.next_index = self.entries.len() as u32;
        index as u32
    }

    /// Drops every entry of `subject`; the remaining order is kept.
    pub fn remove(&mut self, subject: DrawSubject) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.subject != subject);
        if before == self.entries.len() {
            return false;
        }
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.tree_index = index as u32;
        }
        self.next_index = self.entries.len() as u32;
        true
    }

    pub fn entries(&self) -> &[DrawEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [DrawEntry] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, subject: DrawSubject) -> Option<&DrawEntry> {
        self.entries.iter().find(|entry| entry.subject == subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_layers_paint_under_standing_sprites() {
        let far_flat = DrawOrder::FLAT_ITEM.map_position(399, 399);
        let near_standing = DrawOrder::SCENERY.map_position(0, 0);
        assert!(far_flat < near_standing);
        assert!(DrawOrder::TILE.map_position(5, 5) < DrawOrder::FLAT_SCENERY.map_position(0, 0));
    }

    #[test]
    fn standing_sprites_sort_by_row_then_column_then_layer() {
        let item = DrawOrder::ITEM.map_position(10, 10);
        let critter = DrawOrder::CRITTER.map_position(10, 10);
        let next_column = DrawOrder::SCENERY.map_position(11, 10);
        let next_row = DrawOrder::SCENERY.map_position(0, 11);
        assert!(item < critter);
        assert!(critter < next_column);
        assert!(next_column < next_row);
    }

    #[test]
    fn sorting_keeps_insertion_order_for_ties() {
        let mut list = DrawList::new();
        let hex = Hex::new(3, 3);
        list.push(DrawEntry::new(
            DrawSubject::Item(ItemId(2)),
            DrawOrder::ITEM,
            hex,
            SpriteHash(1),
        ));
        list.push(DrawEntry::new(
            DrawSubject::Item(ItemId(1)),
            DrawOrder::ITEM,
            hex,
            SpriteHash(1),
        ));
        list.push(DrawEntry::new(
            DrawSubject::Tile { layer: 0 },
            DrawOrder::TILE,
            hex,
            SpriteHash(1),
        ));
        list.sort_by_map_pos();
        let subjects: Vec<_> = list.entries().iter().map(|entry| entry.subject).collect();
        assert_eq!(
            subjects,
            vec![
                DrawSubject::Tile { layer: 0 },
                DrawSubject::Item(ItemId(2)),
                DrawSubject::Item(ItemId(1)),
            ]
        );
        assert_eq!(list.entries()[2].tree_index, 2);
    }

    #[test]
    fn insert_and_remove_keep_the_list_ordered() {
        let mut list = DrawList::new();
        for x in [2, 6] {
            list.push(DrawEntry::new(
                DrawSubject::Item(ItemId(u32::from(x))),
                DrawOrder::ITEM,
                Hex::new(x, 4),
                SpriteHash(1),
            ));
        }
        list.sort_by_map_pos();
        let index = list.insert_sorted(DrawEntry::new(
            DrawSubject::Critter(CritterId(9)),
            DrawOrder::CRITTER,
            Hex::new(4, 4),
            SpriteHash(2),
        ));
        assert_eq!(index, 1);
        assert_eq!(list.entries()[2].subject, DrawSubject::Item(ItemId(6)));
        assert_eq!(list.entries()[2].tree_index, 2);

        assert!(list.remove(DrawSubject::Item(ItemId(2))));
        assert!(!list.remove(DrawSubject::Item(ItemId(2))));
        assert_eq!(
            list.find(DrawSubject::Critter(CritterId(9))).map(|entry| entry.tree_index),
            Some(0)
        );
    }
}
