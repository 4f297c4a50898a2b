use tracing::debug;

use crate::draw::DrawSubject;
use crate::geometry::Hex;
use crate::light::{LightBounds, LightCapacity, LightPoint, LightScene, LightSource};

use super::HexManager;

impl HexManager {
    /// Marks the light buffer stale; the next
    /// [`HexManager::process_pending_light`] rebuilds it.
    pub fn request_rebuild_light(&mut self) {
        self.rebuild_light_requested = true;
    }

    pub fn is_light_rebuild_requested(&self) -> bool {
        self.rebuild_light_requested
    }

    /// Rebuilds light if something requested it since the last rebuild.
    /// Returns whether a rebuild ran.
    pub fn process_pending_light(&mut self) -> bool {
        if !self.rebuild_light_requested {
            return false;
        }
        self.rebuild_light();
        true
    }

    pub fn light_capacity(&self) -> LightCapacity {
        self.light_capacity
    }

    /// Sets the time-of-day light level used by later rebuilds.
    pub fn set_light_capacity(&mut self, capacity: LightCapacity) {
        if self.light_capacity != capacity {
            self.light_capacity = capacity;
            self.request_rebuild_light();
        }
    }

    pub fn light_at(&self, hex: Hex) -> [u8; 3] {
        self.light.light_at(hex)
    }

    pub fn light_fans(&self) -> impl Iterator<Item = &[LightPoint]> + '_ {
        self.light.fans()
    }

    pub fn light_soft_points(&self) -> &[LightPoint] {
        self.light.soft_points()
    }

    /// Every emitter on the map right now. Never cached: items and critters
    /// change between rebuilds.
    pub fn light_sources(&self) -> Vec<LightSource> {
        let mut sources = Vec::new();
        if self.capabilities.editing_features {
            sources.extend(
                self.items
                    .values()
                    .filter(|item| item.is_static)
                    .filter_map(|item| item.light.map(|light| (item.hex, light)))
                    .filter(|(_, light)| light.is_active())
                    .map(|(hex, light)| LightSource::from_params(hex, light, None)),
            );
        } else {
            sources.extend_from_slice(&self.static_lights);
        }

        sources.extend(
            self.items
                .values()
                .filter(|item| !item.is_static)
                .filter_map(|item| item.light.map(|light| (item.hex, light)))
                .filter(|(_, light)| light.is_active())
                .map(|(hex, light)| LightSource::from_params(hex, light, None)),
        );

        for critter in self.critters.values() {
            let mut lit = false;
            for light in critter.lights.iter().filter(|light| light.is_active()) {
                sources.push(LightSource::from_params(critter.hex, *light, Some(critter.id)));
                lit = true;
            }
            if critter.is_chosen && !lit && !self.capabilities.editing_features {
                sources.push(LightSource::from_params(
                    critter.hex,
                    self.settings.chosen_light,
                    Some(critter.id),
                ));
            }
        }
        sources
    }

    /// Recomputes the whole light buffer and relights the main draw list.
    pub fn rebuild_light(&mut self) {
        self.rebuild_light_requested = false;
        if !self.is_map_loaded() {
            self.light.clear();
            return;
        }

        let sources = self.light_sources();
        let bounds = self
            .view
            .light_bounds()
            .unwrap_or_else(|| LightBounds::whole_grid(&self.grid));
        let view = &self.view;
        let layout = view.layout();
        let hex_position = |hex: Hex| {
            view.hex_current_position(hex)
                .unwrap_or_else(|| layout.interval(Hex::default(), hex))
        };
        self.light.rebuild(&LightScene {
            grid: &self.grid,
            layout,
            sources: &sources,
            capacity: self.light_capacity,
            bounds,
            hex_position: &hex_position,
        });

        let light = &self.light;
        let items = &self.items;
        for entry in self.main_list.entries_mut() {
            if entry.light.is_none() {
                continue;
            }
            let hex = match entry.subject {
                DrawSubject::Item(id) => items.get(&id).map_or(entry.hex, |item| item.hex),
                _ => entry.hex,
            };
            entry.light = Some(light.light_at(hex));
        }
        debug!(
            sources = sources.len(),
            min_x = bounds.min_x,
            max_x = bounds.max_x,
            min_y = bounds.min_y,
            max_y = bounds.max_y,
            "light_sources_collected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::{Capabilities, HexSettings};
    use crate::entity::{CritterId, ItemId};
    use crate::light::LightParams;
    use crate::map::MapBlob;

    fn lamp_map() -> MapBlob {
        let mut blob = MapBlob::new(4, 40, 40);
        blob.scenery.push(scenery(LAMP, 20, 20));
        blob
    }

    #[test]
    fn static_lamp_lights_its_radius_only() {
        let mut manager = manager_with(Capabilities::default());
        manager.load_map(&lamp_map()).expect("load");
        assert_ne!(manager.light_at(Hex::new(20, 20)), [0; 3]);
        assert_ne!(manager.light_at(Hex::new(22, 20)), [0; 3]);
        assert_eq!(manager.light_at(Hex::new(30, 20)), [0; 3]);
        assert_eq!(manager.light_fans().count(), 1);
    }

    #[test]
    fn chosen_critter_carries_the_configured_light() {
        let settings = HexSettings {
            chosen_light: LightParams {
                color: 0xFF_C0_80,
                ..HexSettings::default().chosen_light
            },
            ..HexSettings::default()
        };
        let mut manager =
            HexManager::new(settings, Capabilities::default(), protos(), Box::new(sprites()))
                .expect("manager");
        manager.load_map(&MapBlob::new(1, 40, 40)).expect("load");
        let mut chosen = critter(7, 10, 10);
        chosen.is_chosen = true;
        assert!(manager.add_critter(chosen));
        assert!(manager.is_light_rebuild_requested());
        assert!(manager.process_pending_light());
        assert!(!manager.process_pending_light());

        let sources = manager.light_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].anchor, Some(CritterId(7)));
        assert_eq!(sources[0].distance, 4);
        assert_ne!(manager.light_at(Hex::new(10, 10)), [0; 3]);
    }

    #[test]
    fn capacity_change_dims_the_buffer() {
        let mut manager = manager_with(Capabilities::default());
        manager.load_map(&lamp_map()).expect("load");
        let bright = manager.light_at(Hex::new(21, 20));
        manager.set_light_capacity(LightCapacity::uniform(20));
        manager.process_pending_light();
        let dim = manager.light_at(Hex::new(21, 20));
        assert!(dim.iter().zip(bright).all(|(dim, bright)| *dim <= bright));
        assert_ne!(dim, bright);
    }

    #[test]
    fn dynamic_item_lights_are_collected_live() {
        let mut manager = loaded_manager(40, 40);
        let item = manager
            .add_item(ItemId(5), GENERIC, Hex::new(5, 5))
            .map(|item| item.id)
            .expect("item added");
        assert!(manager.light_sources().is_empty());
        assert!(manager.change_item(item, |item| {
            item.light = Some(LightParams {
                color: 0x00FF00,
                distance: 2,
                intensity: 100,
                flags: 0,
            })
        }));
        assert_eq!(manager.light_sources().len(), 1);
        manager.process_pending_light();
        assert_eq!(manager.light_at(Hex::new(5, 5))[0], 0);
        assert_ne!(manager.light_at(Hex::new(5, 5))[1], 0);
    }
}
