use std::cmp::Reverse;

use crate::draw::{DrawEntry, DrawSubject};
use crate::entity::{CritterId, ItemId};
use crate::geometry::Hex;

use super::HexManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelHit {
    Item(ItemId),
    Critter(CritterId),
}

#[derive(Debug, Clone, Copy)]
struct ItemHit {
    id: ItemId,
    tree_index: u32,
    transparent: bool,
}

impl HexManager {
    /// Hex under a screen pixel, or `None` off the map.
    pub fn hex_at_pixel(&self, x: i32, y: i32) -> Option<Hex> {
        if !self.is_map_loaded() {
            return None;
        }
        self.view.hex_at_pixel(
            x,
            y,
            self.scroll.offset(),
            self.hex_mask.as_ref(),
            self.grid.width(),
            self.grid.height(),
        )
    }

    /// Screen pixel of the middle of `hex` with scroll and zoom applied.
    pub fn hex_screen_position(&self, hex: Hex) -> Option<(i32, i32)> {
        if !self.is_map_loaded() {
            return None;
        }
        let (ox, oy) = self.scroll.offset();
        self.view.hex_center_position(hex, ox, oy)
    }

    pub fn item_at_pixel(&self, x: i32, y: i32) -> Option<ItemId> {
        self.item_hit(x, y).map(|hit| hit.id)
    }

    /// Topmost critter sprite under a screen pixel.
    pub fn critter_at_pixel(&self, x: i32, y: i32, ignore_dead_and_chosen: bool) -> Option<CritterId> {
        self.critter_hit(x, y, ignore_dead_and_chosen)
            .map(|(id, _)| id)
    }

    /// Item or critter under a screen pixel. The critter wins unless the
    /// item is opaque and drawn above it.
    pub fn something_at_pixel(&self, x: i32, y: i32) -> Option<PixelHit> {
        let item = self.item_hit(x, y);
        let critter = self.critter_hit(x, y, false);
        match (item, critter) {
            (Some(item), Some((critter, tree_index))) => {
                if item.transparent || item.tree_index <= tree_index {
                    Some(PixelHit::Critter(critter))
                } else {
                    Some(PixelHit::Item(item.id))
                }
            }
            (Some(item), None) => Some(PixelHit::Item(item.id)),
            (None, Some((critter, _))) => Some(PixelHit::Critter(critter)),
            (None, None) => None,
        }
    }

    fn map_point(&self, x: i32, y: i32) -> (i32, i32) {
        let zoom = self.view.zoom();
        let (scroll_x, scroll_y) = self.scroll.offset();
        (
            (x as f32 * zoom) as i32 - scroll_x,
            (y as f32 * zoom) as i32 - scroll_y,
        )
    }

    fn entry_contains(&self, entry: &DrawEntry, (px, py): (i32, i32)) -> bool {
        let Some(info) = self.sprites.sprite_info(entry.sprite) else {
            return false;
        };
        let rect = info.rect_at(entry.screen_x, entry.screen_y);
        rect.contains(px, py)
            && self
                .sprites
                .is_pixel_opaque(entry.sprite, px - rect.left, py - rect.top)
    }

    fn item_hit(&self, x: i32, y: i32) -> Option<ItemHit> {
        if !self.is_map_loaded() {
            return None;
        }
        let point = self.map_point(x, y);
        let mut hits: Vec<ItemHit> = self
            .main_list
            .entries()
            .iter()
            .filter_map(|entry| {
                let DrawSubject::Item(id) = entry.subject else {
                    return None;
                };
                let item = self.items.get(&id)?;
                self.entry_contains(entry, point).then_some(ItemHit {
                    id,
                    tree_index: entry.tree_index,
                    transparent: item.is_transparent,
                })
            })
            .collect();
        hits.sort_by_key(|hit| (hit.transparent, Reverse(hit.tree_index)));
        hits.first().copied()
    }

    fn critter_hit(&self, x: i32, y: i32, ignore_dead_and_chosen: bool) -> Option<(CritterId, u32)> {
        if !self.is_map_loaded() || !self.settings.show_critters {
            return None;
        }
        let point = self.map_point(x, y);
        self.main_list
            .entries()
            .iter()
            .filter_map(|entry| {
                let DrawSubject::Critter(id) = entry.subject else {
                    return None;
                };
                let critter = self.critters.get(&id)?;
                if ignore_dead_and_chosen && (critter.is_dead() || critter.is_chosen) {
                    return None;
                }
                self.entry_contains(entry, point)
                    .then_some((id, entry.tree_index))
            })
            .max_by_key(|(_, tree_index)| *tree_index)
    }
}
