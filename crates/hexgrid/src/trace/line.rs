use crate::geometry::{normalize_degrees, GridTopology, Hex};

const SQRT3: f32 = 1.732_050_8;
const SQRT3_X2: f32 = SQRT3 * 2.0;
const BIAS: f32 = 0.02;

/// Walks a straight line across the grid one neighbor at a time.
///
/// On hexes the walker picks, every step, whichever of two candidate
/// directions keeps it closer to the ideal line in cartesian space. On
/// squares it advances a normalized vector along the major axis and floors
/// the position. Neither variant leaves the grid: a step that would cross
/// the border leaves the position unchanged.
#[derive(Debug, Clone)]
pub struct LineTracer {
    topology: GridTopology,
    width: u16,
    height: u16,
    dir1: u8,
    dir2: u8,
    x1: f32,
    y1: f32,
    dx: f32,
    dy: f32,
}

impl LineTracer {
    /// `deviation_deg` rotates the line around `from`, used for spread shots.
    pub fn new(
        topology: GridTopology,
        from: Hex,
        to: Hex,
        width: u16,
        height: u16,
        deviation_deg: f32,
    ) -> Self {
        let (hx, hy) = (f32::from(from.x), f32::from(from.y));
        let (tx, ty) = (f32::from(to.x), f32::from(to.y));
        match topology {
            GridTopology::Hexagonal => {
                let angle = normalize_degrees(topology.angle_between(from, to) + deviation_deg);
                let (dir1, dir2) = if (30.0..90.0).contains(&angle) {
                    (5, 0)
                } else if (90.0..150.0).contains(&angle) {
                    (4, 5)
                } else if (150.0..210.0).contains(&angle) {
                    (3, 4)
                } else if (210.0..270.0).contains(&angle) {
                    (2, 3)
                } else if (270.0..330.0).contains(&angle) {
                    (1, 2)
                } else {
                    (0, 1)
                };

                let x1 = 3.0 * hx + BIAS;
                let y1 = SQRT3_X2 * hy - SQRT3 * f32::from(from.x & 1) + BIAS;
                let mut x2 = 3.0 * tx + BIAS + BIAS;
                let mut y2 = SQRT3_X2 * ty - SQRT3 * f32::from(to.x & 1) + BIAS;
                if deviation_deg != 0.0 {
                    let (rx, ry) = crate::geometry::rotate_steps(x2 - x1, y2 - y1, deviation_deg);
                    x2 = x1 + rx;
                    y2 = y1 + ry;
                }
                Self {
                    topology,
                    width,
                    height,
                    dir1,
                    dir2,
                    x1,
                    y1,
                    dx: x2 - x1,
                    dy: y2 - y1,
                }
            }
            GridTopology::Square => {
                let heading = (ty - hy).atan2(tx - hx) + deviation_deg.to_radians();
                let (mut dx, mut dy) = (heading.cos(), heading.sin());
                if dx.abs() > dy.abs() {
                    dy /= dx.abs();
                    dx = dx.signum();
                } else {
                    dx /= dy.abs();
                    dy = dy.signum();
                }
                Self {
                    topology,
                    width,
                    height,
                    dir1: 0,
                    dir2: 0,
                    x1: hx + 0.5,
                    y1: hy + 0.5,
                    dx,
                    dy,
                }
            }
        }
    }

    pub fn next_hex(&mut self, current: Hex) -> Hex {
        match self.topology {
            GridTopology::Hexagonal => self.next_hexagonal(current),
            GridTopology::Square => self.next_square(),
        }
    }

    fn next_hexagonal(&self, current: Hex) -> Hex {
        let first = self
            .topology
            .move_in_bounds(current, self.dir1, self.width, self.height)
            .unwrap_or(current);
        let second = self
            .topology
            .move_in_bounds(current, self.dir2, self.width, self.height)
            .unwrap_or(current);
        if self.deviation(first) <= self.deviation(second) {
            first
        } else {
            second
        }
    }

    /// Scaled perpendicular distance from the ideal line.
    fn deviation(&self, hex: Hex) -> f32 {
        let px = 3.0 * f32::from(hex.x);
        let py = SQRT3_X2 * f32::from(hex.y) - SQRT3 * f32::from(hex.x & 1);
        (self.dx * (self.y1 - py) - self.dy * (self.x1 - px)).abs()
    }

    fn next_square(&mut self) -> Hex {
        self.x1 += self.dx;
        self.y1 += self.dy;
        let x = (self.x1.floor().max(0.0) as u16).min(self.width.saturating_sub(1));
        let y = (self.y1.floor().max(0.0) as u16).min(self.height.saturating_sub(1));
        Hex::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(topology: GridTopology, from: Hex, to: Hex, steps: u32) -> Vec<Hex> {
        let mut tracer = LineTracer::new(topology, from, to, 100, 100, 0.0);
        let mut current = from;
        (0..steps)
            .map(|_| {
                current = tracer.next_hex(current);
                current
            })
            .collect()
    }

    #[test]
    fn hex_walk_reaches_target_in_distance_steps() {
        let topology = GridTopology::Hexagonal;
        for (from, to) in [
            (Hex::new(10, 10), Hex::new(20, 14)),
            (Hex::new(30, 30), Hex::new(25, 18)),
            (Hex::new(7, 40), Hex::new(40, 40)),
            (Hex::new(50, 50), Hex::new(50, 60)),
        ] {
            let steps = topology.distance(from, to);
            let path = walk(topology, from, to, steps);
            assert_eq!(path.last().copied(), Some(to), "{from:?} -> {to:?}");
            let mut previous = from;
            for hex in path {
                assert_eq!(topology.distance(previous, hex), 1);
                previous = hex;
            }
        }
    }

    #[test]
    fn square_walk_follows_major_axis() {
        let path = walk(GridTopology::Square, Hex::new(5, 5), Hex::new(15, 5), 10);
        assert_eq!(path.first().copied(), Some(Hex::new(6, 5)));
        assert_eq!(path.last().copied(), Some(Hex::new(15, 5)));
        assert!(path.iter().all(|hex| hex.y == 5));
    }

    #[test]
    fn walker_stalls_on_grid_border() {
        let mut tracer =
            LineTracer::new(GridTopology::Hexagonal, Hex::new(2, 5), Hex::new(0, 5), 10, 10, 0.0);
        let mut current = Hex::new(2, 5);
        for _ in 0..6 {
            current = tracer.next_hex(current);
        }
        assert_eq!(current.x, 0);
        assert!(current.y < 10);
    }

    #[test]
    fn deviation_bends_the_line() {
        let straight = walk(GridTopology::Hexagonal, Hex::new(20, 20), Hex::new(30, 20), 10);
        let mut tracer = LineTracer::new(
            GridTopology::Hexagonal,
            Hex::new(20, 20),
            Hex::new(30, 20),
            100,
            100,
            30.0,
        );
        let mut current = Hex::new(20, 20);
        for _ in 0..10 {
            current = tracer.next_hex(current);
        }
        assert_ne!(straight.last().copied(), Some(current));
    }
}
