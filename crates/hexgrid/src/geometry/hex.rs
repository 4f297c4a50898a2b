use serde::{Deserialize, Serialize};

const SQRT3: f32 = 1.732_050_8;
const SQRT3_X2: f32 = SQRT3 * 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hex {
    pub x: u16,
    pub y: u16,
}

impl Hex {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub(crate) fn from_i32(x: i32, y: i32, width: u16, height: u16) -> Option<Self> {
        if x < 0 || y < 0 || x >= i32::from(width) || y >= i32::from(height) {
            return None;
        }
        Some(Self {
            x: x as u16,
            y: y as u16,
        })
    }

    pub(crate) fn is_odd_column(self) -> bool {
        self.x & 1 == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridTopology {
    #[default]
    Hexagonal,
    Square,
}

impl GridTopology {
    pub const fn dirs_count(self) -> u8 {
        match self {
            Self::Hexagonal => 6,
            Self::Square => 8,
        }
    }

    pub const fn is_hexagonal(self) -> bool {
        matches!(self, Self::Hexagonal)
    }

    /// Moves one step without any bounds check. Hex parity is taken from the
    /// column after the horizontal move.
    pub fn move_unchecked(self, x: i32, y: i32, dir: u8) -> (i32, i32) {
        let (mut x, mut y) = (x, y);
        match self {
            Self::Hexagonal => match dir {
                0 => {
                    x -= 1;
                    if x & 1 == 0 {
                        y -= 1;
                    }
                }
                1 => {
                    x -= 1;
                    if x & 1 == 1 {
                        y += 1;
                    }
                }
                2 => y += 1,
                3 => {
                    x += 1;
                    if x & 1 == 1 {
                        y += 1;
                    }
                }
                4 => {
                    x += 1;
                    if x & 1 == 0 {
                        y -= 1;
                    }
                }
                5 => y -= 1,
                _ => {}
            },
            Self::Square => match dir {
                0 => x -= 1,
                1 => {
                    x -= 1;
                    y += 1;
                }
                2 => y += 1,
                3 => {
                    x += 1;
                    y += 1;
                }
                4 => x += 1,
                5 => {
                    x += 1;
                    y -= 1;
                }
                6 => y -= 1,
                7 => {
                    x -= 1;
                    y -= 1;
                }
                _ => {}
            },
        }
        (x, y)
    }

    pub fn move_in_bounds(self, hex: Hex, dir: u8, width: u16, height: u16) -> Option<Hex> {
        let (x, y) = self.move_unchecked(i32::from(hex.x), i32::from(hex.y), dir);
        Hex::from_i32(x, y, width, height)
    }

    pub fn distance(self, a: Hex, b: Hex) -> u32 {
        distance_i32(self, i32::from(a.x), i32::from(a.y), i32::from(b.x), i32::from(b.y))
    }

    pub fn check_distance(self, a: Hex, b: Hex, dist: u32) -> bool {
        self.distance(a, b) <= dist
    }

    pub fn reverse_dir(self, dir: u8) -> u8 {
        let count = self.dirs_count();
        (dir + count / 2) % count
    }

    /// Direction to an adjacent hex; 0 when `to` is not a neighbor.
    pub fn near_dir(self, from: Hex, to: Hex) -> u8 {
        let (x1, y1, x2, y2) = (from.x, from.y, to.x, to.y);
        match self {
            Self::Hexagonal if from.is_odd_column() => {
                if x1 > x2 && y1 > y2 {
                    0
                } else if x1 > x2 && y1 == y2 {
                    1
                } else if x1 == x2 && y1 < y2 {
                    2
                } else if x1 < x2 && y1 == y2 {
                    3
                } else if x1 < x2 && y1 > y2 {
                    4
                } else if x1 == x2 && y1 > y2 {
                    5
                } else {
                    0
                }
            }
            Self::Hexagonal => {
                if x1 > x2 && y1 == y2 {
                    0
                } else if x1 > x2 && y1 < y2 {
                    1
                } else if x1 == x2 && y1 < y2 {
                    2
                } else if x1 < x2 && y1 < y2 {
                    3
                } else if x1 < x2 && y1 == y2 {
                    4
                } else if x1 == x2 && y1 > y2 {
                    5
                } else {
                    0
                }
            }
            Self::Square => {
                if x1 > x2 && y1 == y2 {
                    0
                } else if x1 > x2 && y1 < y2 {
                    1
                } else if x1 == x2 && y1 < y2 {
                    2
                } else if x1 < x2 && y1 < y2 {
                    3
                } else if x1 < x2 && y1 == y2 {
                    4
                } else if x1 < x2 && y1 > y2 {
                    5
                } else if x1 == x2 && y1 > y2 {
                    6
                } else if x1 > x2 && y1 > y2 {
                    7
                } else {
                    0
                }
            }
        }
    }

    pub fn far_dir(self, from: Hex, to: Hex) -> u8 {
        self.far_dir_with_offset(from, to, 0.0)
    }

    /// Direction toward an arbitrary hex, with the angle shifted by
    /// `offset_deg` before it is bucketed into a sector.
    pub fn far_dir_with_offset(self, from: Hex, to: Hex, offset_deg: f32) -> u8 {
        let angle = normalize_degrees(self.angle_between(from, to) + offset_deg);
        match self {
            Self::Hexagonal => {
                if (60.0..120.0).contains(&angle) {
                    5
                } else if (120.0..180.0).contains(&angle) {
                    4
                } else if (180.0..240.0).contains(&angle) {
                    3
                } else if (240.0..300.0).contains(&angle) {
                    2
                } else if angle >= 300.0 {
                    1
                } else {
                    0
                }
            }
            Self::Square => {
                if (22.5..67.5).contains(&angle) {
                    7
                } else if (67.5..112.5).contains(&angle) {
                    0
                } else if (112.5..157.5).contains(&angle) {
                    1
                } else if (157.5..202.5).contains(&angle) {
                    2
                } else if (202.5..247.5).contains(&angle) {
                    3
                } else if (247.5..292.5).contains(&angle) {
                    4
                } else if (292.5..337.5).contains(&angle) {
                    5
                } else {
                    6
                }
            }
        }
    }

    /// Raw angle in degrees used for far-direction bucketing.
    pub(crate) fn angle_between(self, from: Hex, to: Hex) -> f32 {
        let (x1, y1) = (f32::from(from.x), f32::from(from.y));
        let (x2, y2) = (f32::from(to.x), f32::from(to.y));
        match self {
            Self::Hexagonal => {
                let nx = 3.0 * (x2 - x1);
                let parity = f32::from(to.x & 1) - f32::from(from.x & 1);
                let ny = (y2 - y1) * SQRT3_X2 - parity * SQRT3;
                180.0 + ny.atan2(nx).to_degrees()
            }
            Self::Square => 180.0 + (x2 - x1).atan2(y2 - y1).to_degrees(),
        }
    }
}

pub(crate) fn distance_i32(topology: GridTopology, x1: i32, y1: i32, x2: i32, y2: i32) -> u32 {
    let dx = (x1 - x2).abs();
    match topology {
        GridTopology::Hexagonal => {
            let rx = if x1 & 1 == 0 {
                if y2 <= y1 {
                    y1 - y2 - dx / 2
                } else {
                    y2 - y1 - (dx + 1) / 2
                }
            } else if y2 >= y1 {
                y2 - y1 - dx / 2
            } else {
                y1 - y2 - (dx + 1) / 2
            };
            (dx + rx.max(0)) as u32
        }
        GridTopology::Square => dx.max((y1 - y2).abs()) as u32,
    }
}

pub(crate) fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Integer euclidean length of a pixel delta.
pub fn distance_sqrt(x1: i32, y1: i32, x2: i32, y2: i32) -> u32 {
    let dx = f64::from(x1 - x2);
    let dy = f64::from(y1 - y2);
    (dx * dx + dy * dy).sqrt() as u32
}

/// Per-step increments that walk from `(x1, y1)` toward `(x2, y2)` with the
/// major axis advancing by exactly one unit.
pub fn steps_xy(x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32) {
    let dx = (x2 - x1).abs();
    let dy = (y2 - y1).abs();
    let (mut sx, mut sy) = (1.0f32, 1.0f32);
    if dx < dy {
        sx = if dy == 0.0 { 0.0 } else { dx / dy };
    } else {
        sy = if dx == 0.0 { 0.0 } else { dy / dx };
    }
    if x2 < x1 {
        sx = -sx;
    }
    if y2 < y1 {
        sy = -sy;
    }
    (sx, sy)
}

pub fn rotate_steps(sx: f32, sy: f32, degrees: f32) -> (f32, f32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (sx * cos - sy * sin, sx * sin + sy * cos)
}

pub const fn triangular(n: u32) -> u32 {
    n * (n + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_moves_depend_on_column_parity() {
        let topology = GridTopology::Hexagonal;
        assert_eq!(topology.move_unchecked(5, 5, 0), (4, 4));
        assert_eq!(topology.move_unchecked(4, 5, 0), (3, 5));
        assert_eq!(topology.move_unchecked(5, 5, 1), (4, 5));
        assert_eq!(topology.move_unchecked(4, 5, 1), (3, 6));
        assert_eq!(topology.move_unchecked(5, 5, 3), (6, 5));
        assert_eq!(topology.move_unchecked(4, 5, 3), (5, 6));
        assert_eq!(topology.move_unchecked(5, 5, 4), (6, 4));
        assert_eq!(topology.move_unchecked(4, 5, 4), (5, 5));
        assert_eq!(topology.move_unchecked(4, 5, 2), (4, 6));
        assert_eq!(topology.move_unchecked(4, 5, 5), (4, 4));
    }

    #[test]
    fn every_hex_direction_is_reversible() {
        let topology = GridTopology::Hexagonal;
        for (x, y) in [(4, 4), (5, 4), (10, 11), (11, 10)] {
            for dir in 0..6 {
                let (nx, ny) = topology.move_unchecked(x, y, dir);
                let back = topology.move_unchecked(nx, ny, topology.reverse_dir(dir));
                assert_eq!(back, (x, y), "dir {dir} from ({x},{y})");
            }
        }
    }

    #[test]
    fn every_square_direction_is_reversible() {
        let topology = GridTopology::Square;
        for dir in 0..8 {
            let (nx, ny) = topology.move_unchecked(7, 7, dir);
            assert_eq!(
                topology.move_unchecked(nx, ny, topology.reverse_dir(dir)),
                (7, 7)
            );
        }
    }

    #[test]
    fn move_in_bounds_refuses_leaving_grid() {
        let topology = GridTopology::Hexagonal;
        assert_eq!(topology.move_in_bounds(Hex::new(0, 0), 0, 10, 10), None);
        assert_eq!(topology.move_in_bounds(Hex::new(0, 0), 5, 10, 10), None);
        assert_eq!(
            topology.move_in_bounds(Hex::new(0, 0), 2, 10, 10),
            Some(Hex::new(0, 1))
        );
        assert_eq!(topology.move_in_bounds(Hex::new(9, 9), 2, 10, 10), None);
    }

    #[test]
    fn neighbors_are_at_distance_one() {
        for topology in [GridTopology::Hexagonal, GridTopology::Square] {
            for origin in [Hex::new(6, 6), Hex::new(7, 6)] {
                for dir in 0..topology.dirs_count() {
                    let next = topology
                        .move_in_bounds(origin, dir, 20, 20)
                        .expect("neighbor inside grid");
                    assert_eq!(topology.distance(origin, next), 1);
                    assert_eq!(topology.near_dir(origin, next), dir);
                    assert_eq!(topology.far_dir(origin, next), dir);
                }
            }
        }
    }

    #[test]
    fn hex_distance_matches_walk_length() {
        let topology = GridTopology::Hexagonal;
        assert_eq!(topology.distance(Hex::new(0, 0), Hex::new(10, 10)), 15);
        assert_eq!(topology.distance(Hex::new(10, 10), Hex::new(0, 0)), 15);
        assert_eq!(topology.distance(Hex::new(0, 0), Hex::new(10, 5)), 10);
        assert_eq!(topology.distance(Hex::new(3, 3), Hex::new(3, 3)), 0);
        assert_eq!(topology.distance(Hex::new(0, 0), Hex::new(6, 0)), 6);
        assert_eq!(topology.distance(Hex::new(0, 0), Hex::new(0, 7)), 7);
    }

    #[test]
    fn square_distance_is_chebyshev() {
        let topology = GridTopology::Square;
        assert_eq!(topology.distance(Hex::new(2, 3), Hex::new(9, 5)), 7);
        assert!(topology.check_distance(Hex::new(2, 3), Hex::new(4, 4), 2));
        assert!(!topology.check_distance(Hex::new(2, 3), Hex::new(5, 4), 2));
    }

    #[test]
    fn far_dir_offset_wraps_around() {
        let topology = GridTopology::Hexagonal;
        let from = Hex::new(10, 10);
        let to = topology
            .move_in_bounds(from, 2, 40, 40)
            .expect("neighbor inside grid");
        assert_eq!(topology.far_dir_with_offset(from, to, 60.0), 1);
        assert_eq!(topology.far_dir_with_offset(from, to, 360.0), 2);
        assert_eq!(topology.far_dir_with_offset(from, to, -60.0), 3);
    }

    #[test]
    fn steps_keep_major_axis_unit_length() {
        let (sx, sy) = steps_xy(0.0, 0.0, 10.0, -5.0);
        assert_eq!(sx, 1.0);
        assert_eq!(sy, -0.5);
        let (sx, sy) = steps_xy(4.0, 4.0, 2.0, 12.0);
        assert_eq!(sx, -0.25);
        assert_eq!(sy, 1.0);
    }

    #[test]
    fn rotated_steps_keep_length() {
        let (sx, sy) = rotate_steps(1.0, 0.0, 90.0);
        assert!(sx.abs() < 1e-5);
        assert!((sy - 1.0).abs() < 1e-5);
    }

    #[test]
    fn triangular_numbers() {
        assert_eq!(triangular(0), 0);
        assert_eq!(triangular(1), 1);
        assert_eq!(triangular(4), 10);
        assert_eq!(distance_sqrt(0, 0, 3, 4), 5);
    }
}
