use tracing::debug;

use crate::entity::CritterId;
use crate::field::{Corner, FieldGrid};
use crate::geometry::{distance_sqrt, rotate_steps, steps_xy, GridTopology, Hex, HexLayout};

use super::source::{light_disable_dir, LightCapacity, LightSource, LIGHT_DISABLE_ALL_DIRS};

const MAX_LIGHT_VALUE: i32 = 10_000;
const MAX_LIGHT_HEX: i32 = 200;
const MAX_LIGHT_ALPHA: i32 = 255;
const SOFT_EDGE_DEGREES: f32 = 2.5;

/// Vertex of a light polygon in unzoomed screen pixels. `color` is packed
/// `0xAARRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightPoint {
    pub x: i32,
    pub y: i32,
    pub color: u32,
    /// Critter whose sprite offset must be added when the point is drawn.
    pub anchor: Option<CritterId>,
}

/// Inclusive hex window outside of which the per-hex buffer is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl LightBounds {
    pub fn whole_grid(grid: &FieldGrid) -> Self {
        Self {
            min_x: 0,
            max_x: i32::from(grid.width()) - 1,
            min_y: 0,
            max_y: i32::from(grid.height()) - 1,
        }
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Everything a rebuild reads. `hex_position` maps a hex to the top-left
/// pixel of its cell.
pub struct LightScene<'a> {
    pub grid: &'a FieldGrid,
    pub layout: HexLayout,
    pub sources: &'a [LightSource],
    pub capacity: LightCapacity,
    pub bounds: LightBounds,
    pub hex_position: &'a dyn Fn(Hex) -> (i32, i32),
}

/// Per-hex RGB light plus the triangle fans used to draw it. Buffers are
/// kept across rebuilds and only cleared.
#[derive(Debug, Clone, Default)]
pub struct LightAccumulator {
    width: u16,
    height: u16,
    values: Vec<[u8; 3]>,
    fans: Vec<Vec<LightPoint>>,
    fan_count: usize,
    soft_points: Vec<LightPoint>,
    soft_length: u32,
}

impl LightAccumulator {
    pub fn new(soft_length: u32) -> Self {
        Self {
            soft_length,
            ..Self::default()
        }
    }

    pub fn light_at(&self, hex: Hex) -> [u8; 3] {
        if hex.x >= self.width || hex.y >= self.height {
            return [0; 3];
        }
        self.values[usize::from(hex.y) * usize::from(self.width) + usize::from(hex.x)]
    }

    pub fn fans(&self) -> impl Iterator<Item = &[LightPoint]> + '_ {
        self.fans[..self.fan_count].iter().map(Vec::as_slice)
    }

    pub fn soft_points(&self) -> &[LightPoint] {
        &self.soft_points
    }

    pub fn clear(&mut self) {
        self.values.fill([0; 3]);
        self.fan_count = 0;
        self.soft_points.clear();
    }

    pub fn rebuild(&mut self, scene: &LightScene<'_>) {
        let (width, height) = (scene.grid.width(), scene.grid.height());
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.values = vec![[0; 3]; usize::from(width) * usize::from(height)];
        }
        self.clear();
        if scene.grid.is_empty() {
            return;
        }

        for source in scene.sources {
            self.cast_fan(scene, source);
        }

        debug!(
            sources = scene.sources.len(),
            fans = self.fan_count,
            soft_points = self.soft_points.len(),
            "light_rebuilt"
        );
    }

    fn next_fan(&mut self) -> &mut Vec<LightPoint> {
        self.fan_count += 1;
        if self.fans.len() < self.fan_count {
            self.fans.push(Vec::new());
        }
        let fan = &mut self.fans[self.fan_count - 1];
        fan.clear();
        fan
    }

    fn cast_fan(&mut self, scene: &LightScene<'_>, source: &LightSource) {
        if source.flags & LIGHT_DISABLE_ALL_DIRS == LIGHT_DISABLE_ALL_DIRS || source.distance < 1 {
            return;
        }
        if !scene.grid.contains(source.hex) {
            return;
        }

        let dist = source.distance as i32;
        let inten = source.intensity.unsigned_abs().min(100) as i32 * 100;
        let capacity = scene.capacity.for_source(source);
        let alpha = MAX_LIGHT_ALPHA * capacity / 100 * inten / MAX_LIGHT_VALUE;
        let rgb = source.color & 0x00FF_FFFF;
        let procent = [
            ((rgb >> 16) & 0xFF) as i32 * 100 / 0xFF,
            ((rgb >> 8) & 0xFF) as i32 * 100 / 0xFF,
            (rgb & 0xFF) as i32 * 100 / 0xFF,
        ];

        let center = source.hex;
        let mut painter = HexPainter {
            grid: scene.grid,
            topology: scene.layout.topology,
            values: &mut self.values,
            width: i32::from(self.width),
            height: i32::from(self.height),
            capacity,
            procent,
            bounds: scene.bounds,
        };
        painter.mark_light(i32::from(center.x), i32::from(center.y), inten);

        let (mut base_x, mut base_y) = (scene.hex_position)(center);
        base_x += scene.layout.half_width();
        base_y += scene.layout.half_height();

        let mut rays = Vec::with_capacity(1 + dist as usize * 8);
        let topology = scene.layout.topology;
        let (sides, side_len, start_dir) = match topology {
            GridTopology::Hexagonal => (6u8, dist, 0u8),
            GridTopology::Square => (4u8, dist * 2, 7u8),
        };
        let (mut far_x, mut far_y) = (i32::from(center.x), i32::from(center.y));
        for _ in 0..dist {
            (far_x, far_y) = topology.move_unchecked(far_x, far_y, start_dir);
        }
        rays.push((far_x, far_y, false));
        for side in 0..sides {
            let dir = match topology {
                GridTopology::Hexagonal => (side + 2) % 6,
                GridTopology::Square => ((side + 1) * 2) % 8,
            };
            let disabled = source.flags & light_disable_dir(side) != 0;
            for _ in 0..side_len {
                (far_x, far_y) = topology.move_unchecked(far_x, far_y, dir);
                rays.push((far_x, far_y, disabled));
            }
        }

        let mut points = Vec::with_capacity(rays.len() + 1);
        points.push(LightPoint {
            x: base_x,
            y: base_y,
            color: pack_argb(alpha, rgb),
            anchor: source.anchor,
        });

        let mut last: Option<(i32, i32)> = None;
        for (far_x, far_y, disabled) in rays {
            let target_x = far_x.clamp(0, painter.width - 1);
            let target_y = far_y.clamp(0, painter.height - 1);
            let (end_x, end_y) = if disabled {
                (i32::from(center.x), i32::from(center.y))
            } else {
                painter.trace_light(center, (target_x, target_y), dist, inten as u32)
            };
            if last == Some((end_x, end_y)) {
                continue;
            }
            last = Some((end_x, end_y));

            let (point_alpha, anchor) = if end_x != far_x || end_y != far_y {
                let traveled = crate::geometry::distance_i32(
                    topology,
                    i32::from(center.x),
                    i32::from(center.y),
                    end_x,
                    end_y,
                ) as i32;
                ((alpha - traveled * alpha / dist).clamp(0, alpha), None)
            } else {
                (0, source.anchor)
            };
            let (dx, dy) = scene.layout.interval_i32(
                i32::from(center.x),
                i32::from(center.y),
                end_x,
                end_y,
            );
            points.push(LightPoint {
                x: base_x + dx,
                y: base_y + dy,
                color: pack_argb(point_alpha, rgb),
                anchor,
            });
        }

        self.append_soft_edges(base_x, base_y, &points);
        let fan = self.next_fan();
        fan.extend_from_slice(&points);
    }

    /// Adds a quad seam between rim points that are farther apart than the
    /// soft length, with a slightly rotated third vertex.
    fn append_soft_edges(&mut self, base_x: i32, base_y: i32, points: &[LightPoint]) {
        let rim = points.len();
        if rim < 2 {
            return;
        }
        for index in 1..rim {
            let cur = points[index];
            let next = points[if index + 1 >= rim { 1 } else { index + 1 }];
            if distance_sqrt(cur.x, cur.y, next.x, next.y) <= self.soft_length {
                continue;
            }
            let cur_is_farther = distance_sqrt(base_x, base_y, cur.x, cur.y)
                > distance_sqrt(base_x, base_y, next.x, next.y);
            self.soft_points.push(next);
            self.soft_points.push(cur);
            let (dx, dy) = if cur_is_farther {
                ((next.x - cur.x) as f32, (next.y - cur.y) as f32)
            } else {
                ((cur.x - next.x) as f32, (cur.y - next.y) as f32)
            };
            let degrees = if cur_is_farther {
                -SOFT_EDGE_DEGREES
            } else {
                SOFT_EDGE_DEGREES
            };
            let (rx, ry) = rotate_steps(dx, dy, degrees);
            let pivot = if cur_is_farther { cur } else { next };
            self.soft_points.push(LightPoint {
                x: pivot.x + rx as i32,
                y: pivot.y + ry as i32,
                ..pivot
            });
        }
    }
}

fn pack_argb(alpha: i32, rgb: u32) -> u32 {
    ((alpha.clamp(0, 255) as u32) << 24) | (rgb & 0x00FF_FFFF)
}

fn round_half_up(value: f32) -> i32 {
    let truncated = value as i32;
    if value - truncated as f32 >= 0.5 {
        truncated + 1
    } else {
        truncated
    }
}

/// Per-source painting state over the shared light buffer.
struct HexPainter<'a> {
    grid: &'a FieldGrid,
    topology: GridTopology,
    values: &'a mut [[u8; 3]],
    width: i32,
    height: i32,
    capacity: i32,
    procent: [i32; 3],
    bounds: LightBounds,
}

impl HexPainter<'_> {
    fn hex(&self, x: i32, y: i32) -> Hex {
        Hex::new(x as u16, y as u16)
    }

    fn in_grid(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn slot(&mut self, x: i32, y: i32) -> &mut [u8; 3] {
        let index = (y * self.width + x) as usize;
        &mut self.values[index]
    }

    fn scaled(&self, inten: i32) -> i32 {
        inten * MAX_LIGHT_HEX / MAX_LIGHT_VALUE * self.capacity / 100
    }

    fn mark_light(&mut self, x: i32, y: i32, inten: i32) {
        let light = self.scaled(inten);
        let procent = self.procent;
        let slot = self.slot(x, y);
        for (channel, pct) in slot.iter_mut().zip(procent) {
            let value = (light * pct / 100).clamp(0, 255) as u8;
            *channel = (*channel).max(value);
        }
    }

    /// Light grazing along a wall face spills half strength onto the
    /// neighboring wall segment, never above the full value.
    fn mark_light_end_neighbor(&mut self, x: i32, y: i32, north_south: bool, inten: i32) {
        if !self.in_grid(x, y) {
            return;
        }
        let field = self.grid.field(self.hex(x, y));
        if !field.flags().is_wall {
            return;
        }
        let corner = field.corner();
        let grazes = (north_south
            && matches!(corner, Corner::NorthSouth | Corner::North | Corner::West))
            || (!north_south && matches!(corner, Corner::EastWest | Corner::East))
            || corner == Corner::South;
        if !grazes {
            return;
        }

        let light_full = self.scaled(inten);
        let light_self = self.scaled(inten / 2);
        let procent = self.procent;
        let slot = self.slot(x, y);
        for (channel, pct) in slot.iter_mut().zip(procent) {
            let full = light_full * pct / 100;
            let value = (i32::from(*channel) + light_self * pct / 100).min(full);
            if value > i32::from(*channel) {
                *channel = value.clamp(0, 255) as u8;
            }
        }
    }

    /// Whether light arriving from `from` lights the wall face of `to`.
    fn wall_accepts(&self, from: (i32, i32), to: (i32, i32), north_south: bool) -> bool {
        let dir = self
            .topology
            .far_dir(self.hex(from.0, from.1), self.hex(to.0, to.1));
        dir == 0 || (north_south && dir == 1) || (!north_south && (dir == 4 || dir == 5))
    }

    fn mark_light_end(&mut self, from: (i32, i32), to: (i32, i32), inten: i32) {
        let field = self.grid.field(self.hex(to.0, to.1));
        let is_wall = field.flags().is_wall;
        if !is_wall {
            self.mark_light(to.0, to.1, inten);
            return;
        }

        let north_south = field.corner().faces_north_south();
        if !self.wall_accepts(from, to, north_south) {
            return;
        }
        self.mark_light(to.0, to.1, inten);
        let (x, y) = to;
        if north_south {
            self.mark_light_end_neighbor(x, y - 1, true, inten);
            self.mark_light_end_neighbor(x, y + 1, true, inten);
        } else {
            for nx in [x - 1, x + 1] {
                self.mark_light_end_neighbor(nx, y, false, inten);
                self.mark_light_end_neighbor(nx, y - 1, false, inten);
                self.mark_light_end_neighbor(nx, y + 1, false, inten);
            }
        }
    }

    fn mark_light_step(&mut self, from: (i32, i32), to: (i32, i32), inten: i32) {
        let field = self.grid.field(self.hex(to.0, to.1));
        if field.flags().is_wall_transparent {
            let north_south = field.corner().faces_north_south();
            if self.wall_accepts(from, to, north_south) {
                self.mark_light(to.0, to.1, inten);
            }
        } else {
            self.mark_light(to.0, to.1, inten);
        }
    }

    fn blocks(&self, x: i32, y: i32) -> bool {
        self.grid.field(self.hex(x, y)).flags().is_no_light
    }

    /// Walks from `from` toward `target` with fractional steps, fading the
    /// intensity linearly over `dist` steps, and returns the last hex light
    /// reached.
    fn trace_light(&mut self, from: Hex, target: (i32, i32), dist: i32, inten: u32) -> (i32, i32) {
        let (from_x, from_y) = (i32::from(from.x), i32::from(from.y));
        if (from_x, from_y) == target {
            return target;
        }
        let (sx, sy) = steps_xy(
            from_x as f32,
            from_y as f32,
            target.0 as f32,
            target.1 as f32,
        );
        let max_steps = (target.0 - from_x).abs().max((target.1 - from_y).abs()) + 1;
        let (mut cur_xf, mut cur_yf) = (from_x as f32, from_y as f32);
        let (mut cur_x, mut cur_y) = (from_x, from_y);
        let inten_sub = inten / dist.max(1) as u32;
        let mut inten = inten;

        for _ in 0..max_steps {
            inten = inten.saturating_sub(inten_sub);
            let level = inten as i32;
            cur_xf += sx;
            cur_yf += sy;
            let (old_x, old_y) = (cur_x, cur_y);
            cur_x = round_half_up(cur_xf);
            cur_y = round_half_up(cur_yf);
            let can_mark = self.bounds.contains(cur_x, cur_y);

            let (side_x, side_y) = if old_x & 1 == 1 {
                if old_x + 1 == cur_x && old_y + 1 == cur_y {
                    (1, 1)
                } else if old_x - 1 == cur_x && old_y + 1 == cur_y {
                    (-1, 1)
                } else {
                    (0, 0)
                }
            } else if old_x - 1 == cur_x && old_y - 1 == cur_y {
                (-1, -1)
            } else if old_x + 1 == cur_x && old_y - 1 == cur_y {
                (1, -1)
            } else {
                (0, 0)
            };

            if side_x != 0 {
                let left_x = old_x + side_x;
                if left_x < 0 || left_x >= self.width || self.blocks(left_x, old_y) {
                    let end_x = if left_x < 0 || left_x >= self.width {
                        old_x
                    } else {
                        left_x
                    };
                    if can_mark {
                        self.mark_light_end((old_x, old_y), (end_x, old_y), level);
                    }
                    return (end_x, old_y);
                }
                if can_mark {
                    self.mark_light_step((old_x, old_y), (left_x, old_y), level);
                }

                let right_y = old_y + side_y;
                if right_y < 0 || right_y >= self.height || self.blocks(old_x, right_y) {
                    let end_y = if right_y < 0 || right_y >= self.height {
                        old_y
                    } else {
                        right_y
                    };
                    if can_mark {
                        self.mark_light_end((old_x, old_y), (old_x, end_y), level);
                    }
                    return (old_x, end_y);
                }
                if can_mark {
                    self.mark_light_step((old_x, old_y), (old_x, right_y), level);
                }
            }

            let outside_x = cur_x < 0 || cur_x >= self.width;
            let outside_y = cur_y < 0 || cur_y >= self.height;
            if outside_x || outside_y || self.blocks(cur_x, cur_y) {
                let end = (
                    if outside_x { old_x } else { cur_x },
                    if outside_y { old_y } else { cur_y },
                );
                if can_mark {
                    self.mark_light_end((old_x, old_y), end, level);
                }
                return end;
            }
            if can_mark {
                self.mark_light_end((old_x, old_y), (cur_x, cur_y), level);
            }
            if (cur_x, cur_y) == target {
                break;
            }
        }
        (cur_x, cur_y)
    }
}
