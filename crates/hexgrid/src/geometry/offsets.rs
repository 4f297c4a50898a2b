use super::hex::{triangular, GridTopology, Hex};

/// Rings stored per parity table.
pub const MAX_HEX_OFFSET: u32 = 50;

/// Ring-ordered neighbor offsets around a hex. Ring `r` (0-based) holds
/// `dirs_count * (r + 1)` entries, so the first `triangular(n) * dirs_count`
/// entries cover every hex within distance `n`.
#[derive(Debug, Clone)]
pub struct HexOffsets {
    topology: GridTopology,
    even: Vec<(i16, i16)>,
    odd: Vec<(i16, i16)>,
}

impl HexOffsets {
    pub fn new(topology: GridTopology) -> Self {
        let even = build_rings(topology, false, MAX_HEX_OFFSET);
        let odd = match topology {
            GridTopology::Hexagonal => build_rings(topology, true, MAX_HEX_OFFSET),
            GridTopology::Square => even.clone(),
        };
        Self {
            topology,
            even,
            odd,
        }
    }

    pub fn topology(&self) -> GridTopology {
        self.topology
    }

    /// Offsets of every hex within `rings` steps of `center`, excluding the
    /// center itself. Radii above [`MAX_HEX_OFFSET`] are clamped.
    pub fn ring_span(&self, center: Hex, rings: u32) -> &[(i16, i16)] {
        let rings = rings.min(MAX_HEX_OFFSET);
        let count = triangular(rings) as usize * usize::from(self.topology.dirs_count());
        let table = if center.is_odd_column() {
            &self.odd
        } else {
            &self.even
        };
        &table[..count.min(table.len())]
    }

    pub fn around(
        &self,
        center: Hex,
        rings: u32,
        width: u16,
        height: u16,
    ) -> impl Iterator<Item = Hex> + '_ {
        self.ring_span(center, rings).iter().filter_map(move |&(ox, oy)| {
            Hex::from_i32(
                i32::from(center.x) + i32::from(ox),
                i32::from(center.y) + i32::from(oy),
                width,
                height,
            )
        })
    }
}

fn build_rings(topology: GridTopology, odd: bool, rings: u32) -> Vec<(i16, i16)> {
    let base_x = i32::from(odd);
    let (mut x, mut y) = (base_x, 0i32);
    let dirs = topology.dirs_count() as usize;
    let mut table = Vec::with_capacity(triangular(rings) as usize * dirs);
    let record = |x: i32, y: i32, table: &mut Vec<(i16, i16)>| {
        table.push(((x - base_x) as i16, y as i16));
    };

    for ring in 0..rings as usize {
        (x, y) = topology.move_unchecked(x, y, 0);
        match topology {
            GridTopology::Hexagonal => {
                for side in 0..6u8 {
                    let dir = (side + 2) % 6;
                    for _ in 0..=ring {
                        record(x, y, &mut table);
                        (x, y) = topology.move_unchecked(x, y, dir);
                    }
                }
            }
            GridTopology::Square => {
                let side = ring + 1;
                for (dir, steps) in [
                    (2u8, side),
                    (4, side * 2),
                    (6, side * 2),
                    (0, side * 2),
                    (2, side),
                ] {
                    for _ in 0..steps {
                        record(x, y, &mut table);
                        (x, y) = topology.move_unchecked(x, y, dir);
                    }
                }
            }
        }
    }
    table
}
