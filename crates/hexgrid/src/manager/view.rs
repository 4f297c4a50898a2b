use tracing::{debug, info};

use crate::geometry::{GridTopology, Hex};
use crate::view::{CritterLock, ScrollInput, ScrollState, CRITTER_LOCK_SPEED};

use super::HexManager;

/// Walks tried by [`HexManager::find_set_center`]: direction cycle plus
/// whether the walk spans half the view width (otherwise half the height).
const HEX_CENTER_WALKS: [(&[u8], bool); 8] = [
    (&[0, 5], false),
    (&[3, 2], false),
    (&[1], true),
    (&[4], true),
    (&[0], false),
    (&[3], false),
    (&[5], false),
    (&[2], false),
];
const SQUARE_CENTER_WALKS: [(&[u8], bool); 8] = [
    (&[0, 6], false),
    (&[4, 2], false),
    (&[1], true),
    (&[5], true),
    (&[0], false),
    (&[4], false),
    (&[6], false),
    (&[2, 1], false),
];

impl HexManager {
    pub fn scroll_state(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn screen_hex(&self) -> Hex {
        self.view.screen_hex()
    }

    /// Top-left pixel of a hex's cell before zoom and scroll.
    pub fn hex_current_position(&self, hex: Hex) -> Option<(i32, i32)> {
        if !self.is_map_loaded() {
            return None;
        }
        self.view.hex_current_position(hex)
    }

    pub fn set_critter_lock(&mut self, lock: CritterLock) {
        self.scroll.set_critter_lock(lock);
    }

    /// Steps the zoom once in the direction of `step`, or toward 1.0 when
    /// `step` is zero. Returns whether the zoom changed.
    pub fn change_zoom(&mut self, step: i32) -> bool {
        let (min, max) = (self.settings.min_zoom, self.settings.max_zoom);
        if !self.is_map_loaded() || min == max {
            return false;
        }

        let mut changed = false;
        loop {
            let zoom = self.view.zoom();
            if step == 0 && zoom == 1.0 {
                break;
            }
            if (step > 0 && zoom >= max) || (step < 0 && zoom <= min) {
                break;
            }
            if self.settings.scroll_check
                && (step > 0 || (step == 0 && zoom < 1.0))
                && self.any_scroll_blocked()
            {
                debug!(zoom, step, "zoom_blocked");
                break;
            }

            let next = if step != 0 || zoom < 1.0 {
                let (screen_width, _) = self.view.screen_size();
                let hex_width = self.settings.hex_width;
                let columns = (screen_width / hex_width + i32::from(screen_width % hex_width != 0)) as f32;
                let delta = if step >= 0 { 2.0 } else { -2.0 };
                let next = (columns * zoom + delta) / columns;
                if next < min || next > max {
                    break;
                }
                next
            } else {
                1.0
            };

            self.view.set_zoom(next);
            self.resize_view();
            info!(from = zoom, to = next, "zoom_changed");
            changed = true;
            if step != 0 || next == 1.0 {
                break;
            }
        }
        changed
    }

    fn any_scroll_blocked(&self) -> bool {
        (-1..=1)
            .flat_map(|x| (-1..=1).map(move |y| (x, y)))
            .filter(|&(x, y)| x != 0 || y != 0)
            .any(|(x, y)| self.view.scroll_blocked(&self.grid, x, y))
    }

    /// Advances the scroll by one frame, following a locked critter first.
    /// Returns whether the view moved to a new center hex.
    pub fn scroll(&mut self, input: ScrollInput, time_k: f32) -> bool {
        if !self.is_map_loaded() {
            return false;
        }
        match self.scroll.critter_lock() {
            CritterLock::Hard(id) if !input.is_scrolling() && !self.scroll.is_auto_scrolling() => {
                let target = self.critters.get(&id).map(|critter| critter.hex);
                if let Some(hex) = target.filter(|hex| *hex != self.view.screen_hex()) {
                    self.scroll_to_hex(hex, CRITTER_LOCK_SPEED, true);
                }
            }
            CritterLock::Soft { critter, last_hex } if !input.is_scrolling() => {
                let target = self.critters.get(&critter).map(|critter| critter.hex);
                if let Some(hex) = target.filter(|hex| *hex != last_hex) {
                    let (ox, oy) = self.view.layout().interval(last_hex, hex);
                    self.scroll.scroll_offset(ox, oy, CRITTER_LOCK_SPEED, true);
                    self.scroll.update_soft_lock(hex);
                }
            }
            _ => {}
        }

        let layout = self.view.layout();
        let zoom = self.view.zoom();
        let step = self.settings.scroll_step;
        let (view, grid) = (&self.view, &self.grid);
        let blocked = |xmod: i32, ymod: i32| view.scroll_blocked(grid, xmod, ymod);
        let check: Option<&dyn Fn(i32, i32) -> bool> = if self.settings.scroll_check {
            Some(&blocked)
        } else {
            None
        };
        let Some((xmod, ymod)) = self.scroll.advance(input, time_k, &layout, zoom, step, check) else {
            return false;
        };

        self.rebuild_map_offset(xmod, ymod);
        if self.settings.scroll_check {
            let (view, grid) = (&self.view, &self.grid);
            self.scroll
                .settle(&|xmod, ymod| view.scroll_blocked(grid, xmod, ymod));
        }
        true
    }

    /// Recenters by the cell step `(xmod, ymod)`; `xmod > 0` moves left.
    /// A step that would leave the grid keeps the current center.
    pub fn rebuild_map_offset(&mut self, xmod: i32, ymod: i32) {
        let (row, col) = (self.view.rows() / 2, self.view.cols() / 2);
        let (Some(center), Some(moved)) = (
            self.view.cell_at(row, col),
            self.view.cell_at(row + ymod, col + xmod),
        ) else {
            return;
        };
        let screen = self.view.screen_hex();
        let x = i32::from(screen.x) + moved.hex_x - center.hex_x;
        let y = i32::from(screen.y) + moved.hex_y - center.hex_y;
        match self.grid.hex_at(x, y) {
            Some(hex) => self.rebuild_map(hex),
            None => debug!(x, y, "scroll_off_grid"),
        }
    }

    /// Starts an animated scroll that brings `hex` to the screen center.
    pub fn scroll_to_hex(&mut self, hex: Hex, speed: f32, can_stop: bool) -> bool {
        if !self.is_map_loaded() || !self.grid.contains(hex) {
            return false;
        }
        self.scroll.stop_auto_scroll();
        let (ox, oy) = self.view.layout().interval(self.view.screen_hex(), hex);
        self.scroll.scroll_offset(ox, oy, speed, can_stop);
        true
    }

    pub fn scroll_offset(&mut self, ox: i32, oy: i32, speed: f32, can_stop: bool) {
        self.scroll.scroll_offset(ox, oy, speed, can_stop);
    }

    /// Centers the view on `hex`, then pulls the center away from any
    /// scroll-blocking hex that would show inside the screen.
    pub fn find_set_center(&mut self, hex: Hex) {
        if !self.is_map_loaded() || !self.grid.contains(hex) {
            return;
        }
        self.rebuild_map(hex);
        if self.capabilities.editing_features {
            return;
        }

        let half_width = self.view.view_width() / 2 + 2;
        let half_height = self.view.view_height() / 2 + 2;
        let walks = match self.settings.topology {
            GridTopology::Hexagonal => HEX_CENTER_WALKS,
            GridTopology::Square => SQUARE_CENTER_WALKS,
        };
        let mut center = hex;
        for (dirs, horizontal) in walks {
            let steps = if horizontal { half_width } else { half_height };
            self.pull_center(&mut center, dirs, steps.max(0) as usize);
        }
        self.rebuild_map(center);
    }

    /// Walks from `center` along the direction cycle; every step left
    /// unwalked before a scroll blocker moves the center back the other way.
    fn pull_center(&mut self, center: &mut Hex, dirs: &[u8], steps: usize) {
        let topology = self.settings.topology;
        let (width, height) = (self.grid.width(), self.grid.height());
        let mut walker = *center;
        let mut walked = 0;
        while walked < steps {
            if let Some(next) = topology.move_in_bounds(walker, dirs[walked % dirs.len()], width, height) {
                walker = next;
            }
            let blocked = self.grid.field(walker).flags().scroll_block;
            if self.show_tracks {
                self.tracks.insert(walker, if blocked { 1 } else { 2 });
            }
            if blocked {
                break;
            }
            walked += 1;
        }
        for index in walked..steps {
            let back = topology.reverse_dir(dirs[index % dirs.len()]);
            if let Some(next) = topology.move_in_bounds(*center, back, width, height) {
                *center = next;
            }
        }
    }
}
