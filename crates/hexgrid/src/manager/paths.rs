use tracing::debug;

use crate::entity::{CritterFind, CritterId};
use crate::geometry::Hex;
use crate::path::{PathRequest, PathResult};
use crate::trace::{BulletOutcome, BulletTrace};

use super::HexManager;

/// Result of a trace run against the loaded map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulletReport {
    pub outcome: BulletOutcome,
    /// Critters standing on the passed hexes, in trace order.
    pub critters: Vec<CritterId>,
}

impl HexManager {
    pub fn find_path(&mut self, from: Hex, to: Hex, multihex: u32, cut: Option<u32>) -> Option<PathResult> {
        if !self.is_map_loaded() {
            return None;
        }
        let request = PathRequest {
            from,
            to,
            multihex,
            cut,
        };
        let result = self
            .pathfinder
            .find_path(&self.grid, self.settings.topology, &request);
        match &result {
            Some(path) => {
                debug!(
                    from_x = from.x,
                    from_y = from.y,
                    end_x = path.end.x,
                    end_y = path.end.y,
                    steps = path.steps.len(),
                    "path_found"
                );
                if self.show_tracks {
                    self.mark_path_tracks(from, &path.steps);
                }
            }
            None => debug!(from_x = from.x, from_y = from.y, to_x = to.x, to_y = to.y, "path_not_found"),
        }
        result
    }

    /// End hex of a path that stops within `cut` hexes of `to`.
    pub fn cut_path(&mut self, from: Hex, to: Hex, multihex: u32, cut: u32) -> Option<Hex> {
        if !self.is_map_loaded() {
            return None;
        }
        let request = PathRequest {
            from,
            to,
            multihex,
            cut: Some(cut),
        };
        self.pathfinder
            .find_path(&self.grid, self.settings.topology, &request)
            .map(|path| path.end)
    }

    fn mark_path_tracks(&mut self, from: Hex, steps: &[u8]) {
        self.tracks.clear();
        let topology = self.settings.topology;
        let (width, height) = (self.grid.width(), self.grid.height());
        let mut hex = from;
        for (index, dir) in steps.iter().enumerate() {
            let Some(next) = topology.move_in_bounds(hex, *dir, width, height) else {
                break;
            };
            hex = next;
            self.tracks
                .insert(hex, if index + 1 == steps.len() { 1 } else { 2 });
        }
        self.refresh_map();
    }

    /// Traces a line over the loaded map. With `find` set, every critter
    /// matching it on a passed hex is reported.
    pub fn trace_bullet(&mut self, trace: &BulletTrace, find: Option<CritterFind>) -> BulletReport {
        if !self.is_map_loaded() {
            return BulletReport::default();
        }
        let outcome = crate::trace::trace_bullet(&self.grid, self.settings.topology, trace);
        let critters: Vec<CritterId> = find
            .map(|find| {
                outcome
                    .passed
                    .iter()
                    .flat_map(|hex| self.critters_at(*hex, find))
                    .collect()
            })
            .unwrap_or_default();

        if self.show_tracks {
            self.tracks.clear();
            let walked = if trace.collect_steps {
                &outcome.steps
            } else {
                &outcome.passed
            };
            for hex in walked {
                self.tracks.insert(*hex, if *hex == trace.to { 1 } else { 2 });
            }
            self.refresh_map();
        }
        debug!(
            from_x = trace.from.x,
            from_y = trace.from.y,
            block_x = outcome.block.x,
            block_y = outcome.block.y,
            hit = outcome.hit,
            critters = critters.len(),
            "bullet_traced"
        );
        BulletReport { outcome, critters }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::map::MapBlob;

    #[test]
    fn open_map_paths_are_as_long_as_the_distance() {
        let mut manager = loaded_manager(60, 60);
        let (from, to) = (Hex::new(10, 10), Hex::new(25, 18));
        let path = manager.find_path(from, to, 0, None).expect("path");
        assert_eq!(path.end, to);
        assert_eq!(path.steps.len() as u32, manager.topology().distance(from, to));
        assert!(manager.tracks().next().is_none());
    }

    #[test]
    fn walls_force_a_detour() {
        let mut blob = MapBlob::new(3, 40, 40);
        for y in 0..35 {
            blob.walls.push(scenery(WALL, 20, y));
        }
        let mut manager = manager_with(Default::default());
        manager.load_map(&blob).expect("load");
        let (from, to) = (Hex::new(15, 10), Hex::new(25, 10));
        let path = manager.find_path(from, to, 0, None).expect("path around the wall");
        assert!(path.steps.len() as u32 > manager.topology().distance(from, to));
    }

    #[test]
    fn cut_path_stops_near_the_target() {
        let mut manager = loaded_manager(60, 60);
        let (from, to) = (Hex::new(10, 10), Hex::new(30, 30));
        let end = manager.cut_path(from, to, 0, 3).expect("reachable");
        assert!(manager.topology().distance(end, to) <= 3);
        assert_ne!(end, to);
        assert!(manager_with(Default::default())
            .cut_path(from, to, 0, 3)
            .is_none());
    }

    #[test]
    fn path_tracks_mark_the_route() {
        let mut manager = loaded_manager(40, 40);
        manager.set_show_tracks(true);
        let to = Hex::new(14, 12);
        let path = manager.find_path(Hex::new(10, 10), to, 0, None).expect("path");
        let tracks: Vec<_> = manager.tracks().collect();
        assert_eq!(tracks.len(), path.steps.len());
        assert!(tracks.contains(&(to, 1)));
    }

    #[test]
    fn traces_report_critters_on_the_line() {
        let mut manager = loaded_manager(40, 40);
        let (from, to) = (Hex::new(10, 10), Hex::new(20, 10));
        let first = manager.trace_bullet(&BulletTrace::new(from, to), None);
        let middle = first.outcome.passed[4];
        manager.add_critter(critter(7, middle.x, middle.y));

        let report = manager.trace_bullet(&BulletTrace::new(from, to), Some(CritterFind::ALL));
        assert_eq!(report.critters, vec![CritterId(7)]);
        assert_eq!(report.outcome.block, to);

        let aimed = BulletTrace {
            find_critter: Some(CritterId(7)),
            ..BulletTrace::new(from, to)
        };
        let report = manager.trace_bullet(&aimed, None);
        assert!(report.outcome.hit);
        assert_eq!(report.outcome.block, middle);
        assert!(report.critters.is_empty());
    }
}
