use tracing::{debug, warn};

use crate::draw::DrawSubject;
use crate::entity::{Contour, Critter, CritterCondition, CritterFind, CritterId};
use crate::geometry::Hex;
use crate::light::LightParams;

use super::HexManager;

/// Hexes remembered per critter for forced displacement.
const MAX_LAST_HEXES: usize = 8;

impl HexManager {
    /// Registers a critter and stands it on its hex. A critter whose hex is
    /// held by another live critter stays registered but is not placed until
    /// it moves.
    pub fn add_critter(&mut self, critter: Critter) -> bool {
        if !self.is_map_loaded() || !self.grid.contains(critter.hex) {
            warn!(
                critter = critter.id.0,
                hex_x = critter.hex.x,
                hex_y = critter.hex.y,
                loaded = self.is_map_loaded(),
                "critter_rejected"
            );
            return false;
        }
        if self.critters.contains_key(&critter.id) {
            debug!(critter = critter.id.0, "critter_already_added");
            return false;
        }

        let id = critter.id;
        if critter.is_chosen {
            if let Some(previous) = self.chosen.and_then(|chosen| self.critters.get_mut(&chosen)) {
                previous.is_chosen = false;
            }
            self.chosen = Some(id);
        }
        self.critters.insert(id, critter);
        self.place_critter(id);
        true
    }

    pub fn erase_critter(&mut self, id: CritterId) -> Option<Critter> {
        if !self.critters.contains_key(&id) {
            return None;
        }
        self.unplace_critter(id);
        if self.chosen == Some(id) {
            self.chosen = None;
        }
        if self.critter_contour.is_some_and(|(target, _)| target == id) {
            self.critter_contour = None;
        }
        self.critters.remove(&id)
    }

    pub fn erase_all_critters(&mut self) {
        let ids: Vec<CritterId> = self.critters.keys().copied().collect();
        for id in ids {
            self.erase_critter(id);
        }
    }

    pub fn critter(&self, id: CritterId) -> Option<&Critter> {
        self.critters.get(&id)
    }

    pub fn critters(&self) -> impl Iterator<Item = &Critter> + '_ {
        self.critters.values()
    }

    pub fn chosen(&self) -> Option<&Critter> {
        self.chosen.and_then(|id| self.critters.get(&id))
    }

    /// The live occupant of `hex` followed by its dead critters, filtered
    /// by `find`.
    pub fn critters_at(&self, hex: Hex, find: CritterFind) -> Vec<CritterId> {
        let Some(field) = self.grid.get(hex) else {
            return Vec::new();
        };
        field
            .critter()
            .into_iter()
            .chain(field.dead_critters().iter().copied())
            .filter(|id| {
                self.critters
                    .get(id)
                    .is_some_and(|critter| find.matches(critter))
            })
            .collect()
    }

    /// Marks or clears the multihex footprint around `hex`.
    pub fn set_multihex(&mut self, hex: Hex, multihex: u32, occupied: bool) {
        if multihex == 0 {
            return;
        }
        let (width, height) = (self.grid.width(), self.grid.height());
        for around in self.offsets.around(hex, multihex, width, height) {
            self.grid.field_mut(around).set_multihex(occupied);
        }
    }

    /// Highlights one critter, returning the previous target to the crowd
    /// contour. `None` clears the highlight.
    pub fn set_critter_contour(&mut self, target: Option<CritterId>, contour: Contour) {
        let previous = self.critter_contour.map(|(id, _)| id);
        if previous == target && self.critter_contour.map(|(_, old)| old) == Some(contour) {
            return;
        }
        self.critter_contour = target.map(|id| (id, contour));
        if let Some(previous) = previous.filter(|previous| Some(*previous) != target) {
            self.refresh_contours_of(Some(previous));
        }
        if target.is_some() {
            self.refresh_contours_of(target);
        }
    }

    /// Contour of every living critter other than the chosen one.
    pub fn set_crowd_contour(&mut self, contour: Contour) {
        if self.crowd_contour != contour {
            self.crowd_contour = contour;
            self.refresh_contours_of(None);
        }
    }

    pub(super) fn effective_contour(&self, critter: &Critter) -> Contour {
        contour_for(critter, self.critter_contour, self.crowd_contour)
    }

    /// Updates contours in the main list, for one critter or all of them.
    fn refresh_contours_of(&mut self, only: Option<CritterId>) {
        let critters = &self.critters;
        let (specific, crowd) = (self.critter_contour, self.crowd_contour);
        for entry in self.main_list.entries_mut() {
            let DrawSubject::Critter(id) = entry.subject else {
                continue;
            };
            if only.is_some_and(|only| only != id) {
                continue;
            }
            if let Some(critter) = critters.get(&id) {
                entry.contour = contour_for(critter, specific, crowd);
            }
        }
    }

    /// Moves a critter to `hex`. Dead critters are teleported. A live
    /// occupant of the destination is pushed back to its previous hex when
    /// `force` is set; otherwise the move fails. With `animate` the critter
    /// faces the move and keeps a sprite offset to walk off.
    pub fn transit_critter(&mut self, id: CritterId, hex: Hex, animate: bool, force: bool) -> bool {
        if !self.is_map_loaded() || !self.grid.contains(hex) {
            return false;
        }
        let Some(critter) = self.critters.get(&id) else {
            return false;
        };
        let old = critter.hex;
        if old == hex {
            return true;
        }

        if critter.is_dead() {
            self.unplace_critter(id);
            if let Some(critter) = self.critters.get_mut(&id) {
                critter.hex = hex;
            }
            self.place_critter(id);
            self.request_rebuild_light();
            return true;
        }

        if let Some(occupant) = self.occupant_other_than(hex, id) {
            if !force {
                return false;
            }
            let back = self
                .critters
                .get_mut(&occupant)
                .and_then(|occupant| occupant.last_hexes.pop());
            if let Some(back) = back {
                self.transit_critter(occupant, back, false, true);
            }
            if self.occupant_other_than(hex, id).is_some() {
                debug!(critter = id.0, occupant = occupant.0, "transit_blocked");
                return false;
            }
        }

        self.unplace_critter(id);
        let layout = self.view.layout();
        let topology = self.settings.topology;
        let (width, height) = (self.grid.width(), self.grid.height());
        if let Some(critter) = self.critters.get_mut(&id) {
            critter.hex = hex;
            critter.last_hexes.push(old);
            if critter.last_hexes.len() > MAX_LAST_HEXES {
                critter.last_hexes.remove(0);
            }
            let dir = topology.far_dir(old, hex);
            let (dx, dy) = if animate {
                critter.dir = dir;
                if topology.distance(old, hex) > 1 {
                    let behind = topology
                        .move_in_bounds(hex, topology.reverse_dir(dir), width, height)
                        .unwrap_or(hex);
                    layout.interval(behind, old)
                } else {
                    (0, 0)
                }
            } else {
                layout.interval(hex, old)
            };
            critter.sprite_offset.0 += dx;
            critter.sprite_offset.1 += dy;
        }
        self.place_critter(id)
    }

    pub fn set_critter_position(&mut self, id: CritterId, hex: Hex) -> bool {
        self.transit_critter(id, hex, false, false)
    }

    pub fn set_critter_condition(&mut self, id: CritterId, condition: CritterCondition) -> bool {
        if !self.critters.get(&id).is_some_and(|critter| critter.condition != condition) {
            return false;
        }
        self.unplace_critter(id);
        if let Some(critter) = self.critters.get_mut(&id) {
            critter.condition = condition;
        }
        self.place_critter(id);
        self.request_rebuild_light();
        true
    }

    /// Replaces the lights carried by a critter.
    pub fn set_critter_lights(&mut self, id: CritterId, lights: Vec<LightParams>) -> bool {
        let Some(critter) = self.critters.get_mut(&id) else {
            return false;
        };
        critter.lights = lights;
        self.request_rebuild_light();
        true
    }

    pub fn set_critter_visible(&mut self, id: CritterId, visible: bool) -> bool {
        let Some(critter) = self.critters.get_mut(&id) else {
            return false;
        };
        critter.visible = visible;
        self.refresh_critter_entry(id);
        true
    }

    /// Clears the animation offset once the walk is drawn.
    pub fn reset_critter_offset(&mut self, id: CritterId) {
        if let Some(critter) = self.critters.get_mut(&id) {
            critter.sprite_offset = (0, 0);
            self.refresh_critter_entry(id);
        }
    }

    pub(super) fn is_critter_placed(&self, critter: &Critter) -> bool {
        self.grid.get(critter.hex).is_some_and(|field| {
            if critter.is_dead() {
                field.dead_critters().contains(&critter.id)
            } else {
                field.critter() == Some(critter.id)
            }
        })
    }

    fn occupant_other_than(&self, hex: Hex, id: CritterId) -> Option<CritterId> {
        self.grid
            .get(hex)
            .and_then(|field| field.critter())
            .filter(|occupant| *occupant != id)
    }

    fn place_critter(&mut self, id: CritterId) -> bool {
        let Some(critter) = self.critters.get(&id) else {
            return false;
        };
        let (hex, multihex) = (critter.hex, critter.multihex);
        let lit = critter.is_chosen || critter.has_lights();
        if !self.grid.contains(hex) {
            return false;
        }

        if critter.is_dead() {
            self.grid.field_mut(hex).add_dead_critter(id);
        } else {
            if let Some(occupant) = self.occupant_other_than(hex, id) {
                warn!(
                    critter = id.0,
                    occupant = occupant.0,
                    hex_x = hex.x,
                    hex_y = hex.y,
                    "hex_busy"
                );
                return false;
            }
            self.grid.field_mut(hex).set_critter(Some(id));
            self.set_multihex(hex, multihex, true);
        }

        self.refresh_critter_entry(id);
        if lit {
            self.request_rebuild_light();
        }
        true
    }

    fn unplace_critter(&mut self, id: CritterId) {
        let Some(critter) = self.critters.get(&id) else {
            return;
        };
        let (hex, multihex) = (critter.hex, critter.multihex);
        let lit = critter.is_chosen || critter.has_lights();

        if self.grid.get(hex).is_some_and(|field| field.critter() == Some(id)) {
            self.grid.field_mut(hex).set_critter(None);
            self.set_multihex(hex, multihex, false);
        } else if let Some(field) = self.grid.get_mut(hex) {
            field.erase_dead_critter(id);
        }

        self.main_list.remove(DrawSubject::Critter(id));
        if lit {
            self.request_rebuild_light();
        }
    }
}

fn contour_for(critter: &Critter, specific: Option<(CritterId, Contour)>, crowd: Contour) -> Contour {
    match specific {
        Some((id, contour)) if id == critter.id => contour,
        _ if !critter.is_chosen && !critter.is_dead() && crowd != Contour::None => crowd,
        _ => critter.contour,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::geometry::GridTopology;

    #[test]
    fn busy_hex_keeps_the_first_occupant() {
        let mut manager = loaded_manager(30, 30);
        assert!(manager.add_critter(critter(1, 5, 5)));
        assert!(manager.add_critter(critter(2, 5, 5)));
        assert!(!manager.add_critter(critter(2, 6, 6)));
        assert_eq!(manager.grid().field(Hex::new(5, 5)).critter(), Some(CritterId(1)));
        assert!(manager
            .main_draw_list()
            .find(DrawSubject::Critter(CritterId(2)))
            .is_none());

        assert!(manager.set_critter_position(CritterId(2), Hex::new(6, 5)));
        assert!(manager
            .main_draw_list()
            .find(DrawSubject::Critter(CritterId(2)))
            .is_some());
    }

    #[test]
    fn out_of_bounds_and_unloaded_critters_are_rejected() {
        let mut manager = loaded_manager(10, 10);
        assert!(!manager.add_critter(critter(1, 10, 3)));
        manager.unload_map();
        assert!(!manager.add_critter(critter(2, 3, 3)));
        assert_eq!(manager.critters().count(), 0);
    }

    #[test]
    fn transit_moves_occupancy_and_keeps_the_sprite_in_place() {
        let mut manager = loaded_manager(30, 30);
        manager.add_critter(critter(1, 10, 10));
        assert!(manager.transit_critter(CritterId(1), Hex::new(11, 10), false, false));
        assert!(manager.grid().field(Hex::new(10, 10)).critter().is_none());
        assert_eq!(manager.grid().field(Hex::new(11, 10)).critter(), Some(CritterId(1)));

        let moved = manager.critter(CritterId(1)).expect("critter");
        let layout = manager.view().layout();
        assert_eq!(moved.sprite_offset, layout.interval(Hex::new(11, 10), Hex::new(10, 10)));
        assert_eq!(moved.last_hexes, vec![Hex::new(10, 10)]);
        assert!(!manager.transit_critter(CritterId(1), Hex::new(30, 10), false, false));
    }

    #[test]
    fn animated_step_turns_the_critter() {
        let mut manager = loaded_manager(30, 30);
        manager.add_critter(critter(1, 10, 10));
        let target = GridTopology::Hexagonal
            .move_in_bounds(Hex::new(10, 10), 2, 30, 30)
            .expect("neighbor");
        assert!(manager.transit_critter(CritterId(1), target, true, false));
        let moved = manager.critter(CritterId(1)).expect("critter");
        assert_eq!(moved.dir, 2);
        assert_eq!(moved.sprite_offset, (0, 0));
    }

    #[test]
    fn forced_transit_pushes_the_occupant_back() {
        let mut manager = loaded_manager(30, 30);
        manager.add_critter(critter(1, 8, 8));
        assert!(manager.set_critter_position(CritterId(1), Hex::new(9, 8)));
        manager.add_critter(critter(2, 12, 12));

        assert!(!manager.transit_critter(CritterId(2), Hex::new(9, 8), false, false));
        assert!(manager.transit_critter(CritterId(2), Hex::new(9, 8), false, true));
        assert_eq!(manager.critter(CritterId(1)).map(|c| c.hex), Some(Hex::new(8, 8)));
        assert_eq!(manager.grid().field(Hex::new(9, 8)).critter(), Some(CritterId(2)));
    }

    #[test]
    fn dead_critters_share_hexes_and_skip_blocking() {
        let mut manager = loaded_manager(30, 30);
        manager.add_critter(critter(1, 5, 5));
        let mut body = critter(2, 5, 5);
        body.condition = CritterCondition::Dead;
        assert!(manager.add_critter(body));
        assert_eq!(manager.grid().field(Hex::new(5, 5)).dead_critters(), &[CritterId(2)]);
        assert_eq!(
            manager.critters_at(Hex::new(5, 5), CritterFind::ALL),
            vec![CritterId(1), CritterId(2)]
        );
        assert_eq!(
            manager.critters_at(Hex::new(5, 5), CritterFind::DEAD),
            vec![CritterId(2)]
        );

        assert!(manager.set_critter_condition(CritterId(1), CritterCondition::Dead));
        assert!(!manager.grid().field(Hex::new(5, 5)).flags().is_not_passed);
        assert!(manager.transit_critter(CritterId(2), Hex::new(20, 20), true, false));
        assert_eq!(manager.grid().field(Hex::new(20, 20)).dead_critters(), &[CritterId(2)]);
    }

    #[test]
    fn multihex_footprint_follows_the_critter() {
        let mut manager = loaded_manager(30, 30);
        let mut big = critter(1, 10, 10);
        big.multihex = 1;
        manager.add_critter(big);
        for dir in 0..6 {
            let around = GridTopology::Hexagonal
                .move_in_bounds(Hex::new(10, 10), dir, 30, 30)
                .expect("neighbor");
            assert!(manager.grid().field(around).flags().is_multihex);
        }
        manager.erase_critter(CritterId(1)).expect("erased");
        assert!(!manager.grid().field(Hex::new(11, 10)).flags().is_multihex);
        assert!(!manager.grid().field(Hex::new(10, 10)).flags().is_not_passed);
    }

    #[test]
    fn contours_prefer_the_highlighted_critter() {
        let mut manager = loaded_manager(30, 30);
        let mut chosen = critter(1, 10, 10);
        chosen.is_chosen = true;
        manager.add_critter(chosen);
        manager.add_critter(critter(2, 12, 12));
        let contour_of = |manager: &HexManager, id: u32| {
            manager
                .main_draw_list()
                .find(DrawSubject::Critter(CritterId(id)))
                .map(|entry| entry.contour)
        };

        manager.set_crowd_contour(Contour::Yellow);
        assert_eq!(contour_of(&manager, 1), Some(Contour::None));
        assert_eq!(contour_of(&manager, 2), Some(Contour::Yellow));

        manager.set_critter_contour(Some(CritterId(2)), Contour::Red);
        assert_eq!(contour_of(&manager, 2), Some(Contour::Red));
        manager.set_critter_contour(Some(CritterId(1)), Contour::Red);
        assert_eq!(contour_of(&manager, 1), Some(Contour::Red));
        assert_eq!(contour_of(&manager, 2), Some(Contour::Yellow));

        manager.erase_critter(CritterId(1));
        assert!(manager.chosen().is_none());
    }
}
