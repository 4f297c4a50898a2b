use tracing::{debug, warn};

use crate::draw::DrawSubject;
use crate::entity::{Item, ItemId, ProtoId};
use crate::geometry::Hex;

use super::{HexManager, MapState, STATIC_ITEM_ID_BASE};

impl HexManager {
    /// Adds a ground item sent by the server. An item already known under
    /// `id` is kept when nothing changed and replaced otherwise. Ids in the
    /// static range belong to map scenery and are refused.
    pub fn add_item(&mut self, id: ItemId, proto_id: ProtoId, hex: Hex) -> Option<&Item> {
        if id.0 == 0
            || id.0 >= STATIC_ITEM_ID_BASE
            || !self.is_map_loaded()
            || !self.grid.contains(hex)
        {
            warn!(
                item = id.0,
                proto = proto_id.0,
                hex_x = hex.x,
                hex_y = hex.y,
                "item_rejected"
            );
            return None;
        }
        let Some(proto) = self.protos.get(proto_id) else {
            warn!(item = id.0, proto = proto_id.0, "item_proto_unknown");
            return None;
        };

        let unchanged = self
            .items
            .get(&id)
            .map(|existing| existing.proto_id() == proto_id && existing.hex == hex);
        match unchanged {
            Some(true) => return self.items.get(&id),
            Some(false) => {
                self.erase_item(id);
            }
            None => {}
        }

        self.place_item(Item::new(id, proto, hex));
        self.items.get(&id)
    }

    /// Links an item into its field and block-line hexes and, once the map
    /// is loaded, into the main draw list.
    pub(super) fn place_item(&mut self, item: Item) -> bool {
        let hex = item.hex;
        if !self.grid.contains(hex) {
            return false;
        }
        let id = item.id;
        let field_item = item.field_item();
        self.grid.field_mut(hex).add_item(field_item);
        let (width, height) = (self.grid.width(), self.grid.height());
        for line_hex in item.block_line_hexes(self.settings.topology, width, height) {
            self.grid.field_mut(line_hex).add_block_line(field_item);
        }

        let grew = self.sprites.sprite_info(item.sprite).is_some_and(|info| {
            self.view.process_hex_borders(
                &info,
                i32::from(item.offset_x),
                i32::from(item.offset_y),
            )
        });
        let affects_light = item.affects_light();
        self.items.insert(id, item);

        if self.state == MapState::Loaded {
            if grew {
                self.resize_view();
            } else {
                self.insert_item_entry(id);
            }
        }
        if affects_light {
            self.request_rebuild_light();
        }
        true
    }

    pub fn erase_item(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id)?;
        if let Some(field) = self.grid.get_mut(item.hex) {
            field.erase_item(id);
        }
        let (width, height) = (self.grid.width(), self.grid.height());
        for line_hex in item.block_line_hexes(self.settings.topology, width, height) {
            self.grid.field_mut(line_hex).erase_block_line(id);
        }
        self.main_list.remove(DrawSubject::Item(id));
        if item.is_static && item.is_light_source() {
            self.bake_static_lights();
        }
        if item.affects_light() {
            self.request_rebuild_light();
        }
        debug!(item = id.0, hex_x = item.hex.x, hex_y = item.hex.y, "item_erased");
        Some(item)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.values()
    }

    /// Items on `hex` in field order: walls, scenery, then the rest.
    pub fn items_at(&self, hex: Hex) -> Vec<&Item> {
        let Some(field) = self.grid.get(hex) else {
            return Vec::new();
        };
        field
            .items()
            .iter()
            .filter_map(|field_item| self.items.get(&field_item.id))
            .collect()
    }

    pub fn item_by_proto_at(&self, hex: Hex, proto_id: ProtoId) -> Option<&Item> {
        self.items_at(hex)
            .into_iter()
            .find(|item| item.proto_id() == proto_id)
    }

    /// Applies a property change to an item and relinks it, so flags,
    /// block lines, position and light follow the new state. A change that
    /// moves the item off the grid keeps it where it was.
    pub fn change_item(&mut self, id: ItemId, change: impl FnOnce(&mut Item)) -> bool {
        let Some(mut item) = self.erase_item(id) else {
            return false;
        };
        let old_hex = item.hex;
        change(&mut item);
        item.id = id;
        if !self.grid.contains(item.hex) {
            item.hex = old_hex;
        }
        let is_static = item.is_static;
        let placed = self.place_item(item);
        if is_static {
            self.bake_static_lights();
            self.request_rebuild_light();
        }
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::geometry::GridTopology;

    #[test]
    fn invalid_items_are_rejected() {
        let mut manager = loaded_manager(20, 20);
        assert!(manager.add_item(ItemId(0), GENERIC, Hex::new(1, 1)).is_none());
        assert!(manager.add_item(ItemId(1), ProtoId(999), Hex::new(1, 1)).is_none());
        assert!(manager.add_item(ItemId(1), GENERIC, Hex::new(20, 1)).is_none());
        assert_eq!(manager.items().count(), 0);
    }

    #[test]
    fn server_items_cannot_take_static_ids() {
        let mut blob = crate::map::MapBlob::new(1, 20, 20);
        blob.walls.push(scenery(WALL, 5, 5));
        let mut manager = manager_with(Default::default());
        manager.load_map(&blob).expect("load");
        let wall = ItemId(STATIC_ITEM_ID_BASE);
        assert!(manager.item(wall).is_some());

        assert!(manager.add_item(wall, GENERIC, Hex::new(9, 9)).is_none());
        assert!(manager
            .add_item(ItemId(STATIC_ITEM_ID_BASE + 7), GENERIC, Hex::new(9, 9))
            .is_none());
        assert_eq!(manager.item(wall).map(|item| item.hex), Some(Hex::new(5, 5)));
        assert!(manager.grid().field(Hex::new(5, 5)).flags().is_wall);
    }

    #[test]
    fn same_id_is_kept_or_replaced() {
        let mut manager = loaded_manager(20, 20);
        manager.add_item(ItemId(3), GENERIC, Hex::new(4, 4));
        manager.add_item(ItemId(3), GENERIC, Hex::new(4, 4));
        assert_eq!(manager.items_at(Hex::new(4, 4)).len(), 1);

        manager.add_item(ItemId(3), GENERIC, Hex::new(6, 6));
        assert!(manager.items_at(Hex::new(4, 4)).is_empty());
        assert_eq!(
            manager.item_by_proto_at(Hex::new(6, 6), GENERIC).map(|item| item.id),
            Some(ItemId(3))
        );
        assert!(manager
            .main_draw_list()
            .find(DrawSubject::Item(ItemId(3)))
            .is_some_and(|entry| entry.hex == Hex::new(6, 6)));
    }

    #[test]
    fn walls_block_their_lines_until_erased() {
        let mut manager = loaded_manager(20, 20);
        let wall = manager
            .add_item(ItemId(8), WALL, Hex::new(5, 5))
            .expect("wall added");
        let lines = wall.block_line_hexes(GridTopology::Hexagonal, 20, 20);
        assert_eq!(lines.len(), 1);
        assert!(manager.grid().field(Hex::new(5, 5)).flags().is_wall);
        assert!(manager.grid().field(lines[0]).flags().is_not_passed);
        assert!(manager.is_light_rebuild_requested());

        let erased = manager.erase_item(ItemId(8)).expect("erased");
        assert_eq!(erased.proto_id(), WALL);
        assert!(!manager.grid().field(Hex::new(5, 5)).flags().is_not_passed);
        assert!(!manager.grid().field(lines[0]).flags().is_not_passed);
        assert!(manager
            .main_draw_list()
            .find(DrawSubject::Item(ItemId(8)))
            .is_none());
    }

    #[test]
    fn change_item_relinks_the_item() {
        let mut manager = loaded_manager(20, 20);
        manager.add_item(ItemId(2), GENERIC, Hex::new(3, 3));
        assert!(manager.change_item(ItemId(2), |item| item.hex = Hex::new(7, 7)));
        assert_eq!(manager.item(ItemId(2)).map(|item| item.hex), Some(Hex::new(7, 7)));
        assert!(manager.change_item(ItemId(2), |item| item.hex = Hex::new(70, 7)));
        assert_eq!(manager.item(ItemId(2)).map(|item| item.hex), Some(Hex::new(7, 7)));
        assert!(!manager.change_item(ItemId(9), |_| {}));
    }

    #[test]
    fn tall_sprites_grow_the_view_margins() {
        let mut manager = loaded_manager(30, 30);
        manager.add_item(ItemId(1), GENERIC, Hex::new(15, 15));
        let before = manager.view().margins();
        assert!(manager.change_item(ItemId(1), |item| item.offset_y = -400));
        let after = manager.view().margins();
        assert!(after.bottom > before.bottom);
        assert_eq!(
            manager.view().rows(),
            manager.view().view_height() + after.top + after.bottom
        );
        assert!(manager
            .main_draw_list()
            .find(DrawSubject::Item(ItemId(1)))
            .is_some());
    }
}
