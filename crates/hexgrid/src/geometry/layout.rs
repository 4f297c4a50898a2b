use super::hex::{GridTopology, Hex};

/// Pixel metrics of one grid cell, paired with the grid topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexLayout {
    pub topology: GridTopology,
    pub hex_width: i32,
    pub hex_height: i32,
    pub line_height: i32,
}

impl Default for HexLayout {
    fn default() -> Self {
        Self {
            topology: GridTopology::Hexagonal,
            hex_width: 32,
            hex_height: 16,
            line_height: 12,
        }
    }
}

impl HexLayout {
    pub fn half_width(&self) -> i32 {
        self.hex_width / 2
    }

    pub fn half_height(&self) -> i32 {
        self.hex_height / 2
    }

    /// Height of the pickable cell rectangle.
    pub fn hex_real_height(&self) -> i32 {
        self.hex_height
    }

    /// Horizontal scroll distance that moves the view by one hex column.
    pub fn scroll_ox(&self) -> i32 {
        self.hex_width
    }

    /// Vertical scroll distance that moves the view by one hex row pair.
    pub fn scroll_oy(&self) -> i32 {
        self.line_height * 2
    }

    /// Screen pixel delta from hex `from` to hex `to`.
    pub fn interval(&self, from: Hex, to: Hex) -> (i32, i32) {
        self.interval_i32(
            i32::from(from.x),
            i32::from(from.y),
            i32::from(to.x),
            i32::from(to.y),
        )
    }

    pub(crate) fn interval_i32(&self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> (i32, i32) {
        let mut dx = to_x - from_x;
        let dy = to_y - from_y;
        match self.topology {
            GridTopology::Hexagonal => {
                let mut x = dy * self.half_width() - dx * self.hex_width;
                let mut y = dy * self.line_height;
                if from_x & 1 == 1 {
                    if dx > 0 {
                        dx += 1;
                    }
                } else if dx < 0 {
                    dx -= 1;
                }
                dx /= 2;
                x += self.half_width() * dx;
                y += self.line_height * dx;
                (x, y)
            }
            GridTopology::Square => (
                (dy - dx) * self.hex_width / 2,
                (dy + dx) * self.line_height,
            ),
        }
    }
}
