use crate::field::FieldGrid;
use crate::geometry::{GridTopology, Hex};

/// Back-directions tried while walking from the target to the start. The
/// first neighbor one BFS layer closer wins, so the order picks a single
/// canonical path among equally short ones.
const HEX_BACK_ORDER: [u8; 6] = [1, 4, 5, 0, 3, 2];
const HEX_BACK_ORDER_ALT: [u8; 6] = [0, 5, 2, 3, 1, 4];
const SQUARE_BACK_ORDER: [u8; 8] = [0, 6, 2, 4, 1, 5, 3, 7];
const SQUARE_BACK_ORDER_STRAIGHT: [u8; 8] = [0, 2, 4, 6, 3, 7, 1, 5];
const SQUARE_BACK_ORDER_DIAGONAL: [u8; 8] = [3, 7, 0, 2, 4, 6, 1, 5];

const BLOCKED: i16 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRequest {
    pub from: Hex,
    pub to: Hex,
    /// Footprint radius of the mover; zero for single-hex critters.
    pub multihex: u32,
    /// Accept the first hex within this distance of `to` instead of `to`
    /// itself.
    pub cut: Option<u32>,
}

impl PathRequest {
    pub fn exact(from: Hex, to: Hex) -> Self {
        Self {
            from,
            to,
            multihex: 0,
            cut: None,
        }
    }

    pub fn within(from: Hex, to: Hex, cut: u32) -> Self {
        Self {
            from,
            to,
            multihex: 0,
            cut: Some(cut),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    /// Hex actually reached; differs from the requested target in cut mode.
    pub end: Hex,
    /// One direction per step, starting at the request origin.
    pub steps: Vec<u8>,
}

/// Breadth-first path search over a [`FieldGrid`].
///
/// The depth-stamp window is `2 * max_find_path + 2` hexes wide, centered
/// on the start, and is reused across calls. Searches deeper than
/// `max_find_path` layers fail.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    max_find_path: u32,
    smooth: bool,
    stamps: Vec<i16>,
    coords: Vec<Hex>,
    origin: (i32, i32),
}

impl Pathfinder {
    pub fn new(max_find_path: u32, smooth: bool) -> Self {
        Self {
            max_find_path: max_find_path.clamp(1, i16::MAX as u32 - 1),
            smooth,
            stamps: Vec::new(),
            coords: Vec::new(),
            origin: (0, 0),
        }
    }

    pub fn max_find_path(&self) -> u32 {
        self.max_find_path
    }

    pub fn set_smooth(&mut self, smooth: bool) {
        self.smooth = smooth;
    }

    fn side(&self) -> i32 {
        self.max_find_path as i32 * 2 + 2
    }

    fn slot(&self, x: i32, y: i32) -> Option<usize> {
        let half = self.max_find_path as i32 + 1;
        let side = self.side();
        let gx = half + x - self.origin.0;
        let gy = half + y - self.origin.1;
        if gx < 0 || gy < 0 || gx >= side || gy >= side {
            return None;
        }
        Some((gy * side + gx) as usize)
    }

    fn stamp(&self, x: i32, y: i32) -> i16 {
        self.slot(x, y).map_or(0, |index| self.stamps[index])
    }

    fn set_stamp(&mut self, x: i32, y: i32, value: i16) {
        if let Some(index) = self.slot(x, y) {
            self.stamps[index] = value;
        }
    }

    fn reset(&mut self, origin: Hex) {
        let side = self.side() as usize;
        if self.stamps.len() != side * side {
            self.stamps = vec![0; side * side];
        } else {
            self.stamps.fill(0);
        }
        self.coords.clear();
        self.origin = (i32::from(origin.x), i32::from(origin.y));
    }

    /// Returns `None` when the target is unreachable within the search limit.
    pub fn find_path(
        &mut self,
        grid: &FieldGrid,
        topology: GridTopology,
        request: &PathRequest,
    ) -> Option<PathResult> {
        if grid.is_empty() || !grid.contains(request.from) {
            return None;
        }
        if request.from == request.to {
            return Some(PathResult {
                end: request.to,
                steps: Vec::new(),
            });
        }
        if let Some(cut) = request.cut {
            if topology.check_distance(request.from, request.to, cut) {
                return Some(PathResult {
                    end: request.from,
                    steps: Vec::new(),
                });
            }
        }

        self.reset(request.from);
        let (end, depth) = self.flood(grid, topology, request)?;
        let steps = self.reconstruct(topology, request.from, end, depth)?;
        Some(PathResult { end, steps })
    }

    fn flood(
        &mut self,
        grid: &FieldGrid,
        topology: GridTopology,
        request: &PathRequest,
    ) -> Option<(Hex, i16)> {
        let mut depth: i16 = 1;
        self.set_stamp(i32::from(request.from.x), i32::from(request.from.y), depth);
        self.coords.push(request.from);
        let mut cursor = 0;

        loop {
            depth += 1;
            if depth as u32 > self.max_find_path {
                return None;
            }
            let layer_end = self.coords.len();
            if cursor == layer_end {
                return None;
            }

            while cursor < layer_end {
                let current = self.coords[cursor];
                cursor += 1;
                for dir in 0..topology.dirs_count() {
                    let (nx, ny) =
                        topology.move_unchecked(i32::from(current.x), i32::from(current.y), dir);
                    let Some(next) = grid.hex_at(nx, ny) else {
                        continue;
                    };
                    if self.stamp(nx, ny) != 0 {
                        continue;
                    }
                    self.set_stamp(nx, ny, BLOCKED);
                    if !footprint_passable(grid, topology, next, dir, request.multihex) {
                        continue;
                    }

                    self.set_stamp(nx, ny, depth);
                    self.coords.push(next);
                    let reached = match request.cut {
                        Some(cut) => topology.check_distance(next, request.to, cut),
                        None => next == request.to,
                    };
                    if reached {
                        return Some((next, depth));
                    }
                }
            }
        }
    }

    fn reconstruct(
        &self,
        topology: GridTopology,
        from: Hex,
        end: Hex,
        depth: i16,
    ) -> Option<Vec<u8>> {
        let mut steps = vec![0u8; (depth - 1) as usize];
        let (mut x, mut y) = (i32::from(end.x), i32::from(end.y));
        let mut index = depth;

        match topology {
            GridTopology::Hexagonal => {
                let mut alternate = false;
                while index > 1 {
                    if self.smooth && index & 1 == 1 {
                        alternate = !alternate;
                    }
                    index -= 1;
                    let order = if alternate {
                        &HEX_BACK_ORDER_ALT
                    } else {
                        &HEX_BACK_ORDER
                    };
                    (x, y) = self.step_back(topology, order, (x, y), index, &mut steps)?;
                }
            }
            GridTopology::Square => {
                let (switch_count, switch_begin) = if self.smooth {
                    square_smoothing(from, end)
                } else {
                    (0, 0)
                };
                let mut counter = switch_begin;
                while index > 1 {
                    index -= 1;
                    let order = if !self.smooth {
                        &SQUARE_BACK_ORDER
                    } else if switch_count < 2 || counter % switch_count != 0 {
                        &SQUARE_BACK_ORDER_STRAIGHT
                    } else {
                        &SQUARE_BACK_ORDER_DIAGONAL
                    };
                    (x, y) = self.step_back(topology, order, (x, y), index, &mut steps)?;
                    counter += 1;
                }
            }
        }
        Some(steps)
    }

    fn step_back(
        &self,
        topology: GridTopology,
        order: &[u8],
        (x, y): (i32, i32),
        index: i16,
        steps: &mut [u8],
    ) -> Option<(i32, i32)> {
        order.iter().find_map(|&back| {
            let (px, py) = topology.move_unchecked(x, y, back);
            (self.stamp(px, py) == index).then(|| {
                steps[(index - 1) as usize] = topology.reverse_dir(back);
                (px, py)
            })
        })
    }
}

/// Cadence at which smoothing swaps straight and diagonal preference, and
/// the phase it starts at.
fn square_smoothing(from: Hex, end: Hex) -> (i32, i32) {
    let dx = (i32::from(end.x) - i32::from(from.x)).abs();
    let dy = (i32::from(end.y) - i32::from(from.y)).abs();
    let d = dx.max(dy);
    let h1 = (dx - dy).abs();
    let h2 = d - h1;
    if h1 == 0 || h2 == 0 {
        return (0, 0);
    }
    let count = (h1.max(h2) / h1.min(h2) + 1).max(2);
    (count, h1.min(h2) % h1.max(h2))
}

/// A multihex mover entering `hex` by `dir` needs its leading edge free:
/// the hex `multihex` steps ahead plus the side hexes fanning out from it.
fn footprint_passable(
    grid: &FieldGrid,
    topology: GridTopology,
    hex: Hex,
    dir: u8,
    multihex: u32,
) -> bool {
    let blocked = |x: i32, y: i32| {
        grid.hex_at(x, y)
            .map_or(true, |hex| grid.field(hex).flags().is_not_passed)
    };
    let (mut x, mut y) = (i32::from(hex.x), i32::from(hex.y));
    if multihex == 0 {
        return !blocked(x, y);
    }

    for _ in 0..multihex {
        (x, y) = topology.move_unchecked(x, y, dir);
    }
    if blocked(x, y) {
        return false;
    }

    let corner = !topology.is_hexagonal() && dir % 2 == 1;
    let side_steps = if corner { multihex * 2 } else { multihex };
    let (clockwise, counter_clockwise) = match topology {
        GridTopology::Hexagonal => ((dir + 2) % 6, (dir + 4) % 6),
        GridTopology::Square if corner => (((dir + 2) % 8 + 1) % 8, ((dir + 6) % 8 + 7) % 8),
        GridTopology::Square => ((dir + 2) % 8, (dir + 6) % 8),
    };
    for side in [clockwise, counter_clockwise] {
        let (mut sx, mut sy) = (x, y);
        for _ in 0..side_steps {
            (sx, sy) = topology.move_unchecked(sx, sy, side);
            if blocked(sx, sy) {
                return false;
            }
        }
    }
    true
}
