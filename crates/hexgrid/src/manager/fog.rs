use crate::geometry::{GridTopology, Hex};
use crate::light::LightPoint;
use crate::trace::{trace_bullet, BulletTrace};

use super::HexManager;

/// How far the chosen critter sees and shoots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FogRequest {
    pub look_distance: u32,
    /// Attack range of the active weapon; the shoot border never passes the
    /// look border.
    pub shoot_distance: u32,
    /// Stop the look border at sight blockers instead of drawing a full ring.
    pub trace_look: bool,
}

/// Closed polygons for the look and shoot borders, each starting with the
/// center point. Point colors carry the reached fraction of the distance in
/// the green channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FogBorders {
    pub look: Vec<LightPoint>,
    pub shoot: Vec<LightPoint>,
}

const fn argb(a: u32, r: u32, g: u32, b: u32) -> u32 {
    (a << 24) | (r << 16) | (g << 8) | b
}

impl HexManager {
    /// Look and shoot borders around the chosen critter, or `None` without
    /// a loaded map or a chosen critter.
    pub fn fog_borders(&self, request: &FogRequest) -> Option<FogBorders> {
        if !self.is_map_loaded() {
            return None;
        }
        let chosen = self.chosen()?;
        let base = chosen.hex;
        let anchor = Some(chosen.id);
        let topology = self.settings.topology;
        let layout = self.view.layout();
        let dist = request.look_distance.max(1);
        let (width, height) = (i32::from(self.grid.width()), i32::from(self.grid.height()));

        let screen_point = |hex: Hex| {
            let (x, y) = self
                .view
                .hex_current_position(hex)
                .unwrap_or_else(|| layout.interval(Hex::default(), hex));
            (x + layout.half_width(), y + layout.half_height())
        };

        let (sides, side_len, start_dir) = match topology {
            GridTopology::Hexagonal => (6u8, dist, 0u8),
            GridTopology::Square => (4u8, dist * 2, 7u8),
        };
        let (mut x, mut y) = (i32::from(base.x), i32::from(base.y));
        for _ in 0..dist {
            (x, y) = topology.move_unchecked(x, y, start_dir);
        }
        let mut ring = vec![(x, y)];
        for side in 0..sides {
            let dir = match topology {
                GridTopology::Hexagonal => (side + 2) % 6,
                GridTopology::Square => ((side + 1) * 2) % 8,
            };
            for _ in 0..side_len {
                (x, y) = topology.move_unchecked(x, y, dir);
                ring.push((x, y));
            }
        }

        let mut borders = FogBorders::default();
        for (x, y) in ring {
            let target = Hex::new(
                x.clamp(0, width - 1) as u16,
                y.clamp(0, height - 1) as u16,
            );
            let look_hex = if request.trace_look {
                let trace = BulletTrace {
                    distance: dist,
                    check_passed: true,
                    ..BulletTrace::new(base, target)
                };
                trace_bullet(&self.grid, topology, &trace).block
            } else {
                target
            };
            let dist_look = topology.distance(base, look_hex);
            let (px, py) = screen_point(look_hex);
            borders.look.push(LightPoint {
                x: px,
                y: py,
                color: argb(0, 255, dist_look * 255 / dist, 0),
                anchor: (dist_look == dist).then_some(chosen.id),
            });

            let max_shoot = dist_look.min(request.shoot_distance) + 1;
            let trace = BulletTrace {
                distance: max_shoot,
                check_passed: true,
                ..BulletTrace::new(base, target)
            };
            let shoot_hex = trace_bullet(&self.grid, topology, &trace).block;
            let dist_shoot = topology.distance(base, shoot_hex).min(max_shoot);
            let (px, py) = screen_point(shoot_hex);
            borders.shoot.push(LightPoint {
                x: px,
                y: py,
                color: argb(255, 255, dist_shoot * 255 / max_shoot, 0),
                anchor: (dist_shoot == max_shoot).then_some(chosen.id),
            });
        }

        let (cx, cy) = screen_point(base);
        for (points, center_color) in [
            (&mut borders.look, argb(0, 0, 0, 0)),
            (&mut borders.shoot, argb(255, 0, 0, 0)),
        ] {
            if let Some(first) = points.first().copied() {
                points.push(first);
            }
            points.insert(
                0,
                LightPoint {
                    x: cx,
                    y: cy,
                    color: center_color,
                    anchor,
                },
            );
        }
        Some(borders)
    }
}
