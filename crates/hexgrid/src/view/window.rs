use std::collections::TryReserveError;

use crate::config::HexSettings;
use crate::field::FieldGrid;
use crate::geometry::{GridTopology, Hex, HexLayout};
use crate::light::LightBounds;
use crate::resources::{HexMask, SpriteInfo};

/// One screen slot of the view window: the hex it shows and the top-left
/// pixel of its cell, before zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewCell {
    pub hex_x: i32,
    pub hex_y: i32,
    pub screen_x: i32,
    pub screen_y: i32,
}

/// Overdraw around the visible area, in rows (top/bottom) and columns
/// (left/right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewMargins {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

/// Grid of screen cells covering the screen plus margins, centered on
/// `screen_hex`. Cells are stored row-major; columns advance right to left.
#[derive(Debug, Clone)]
pub struct ViewWindow {
    layout: HexLayout,
    screen_width: i32,
    screen_height: i32,
    zoom: f32,
    margins: ViewMargins,
    rows: i32,
    cols: i32,
    cells: Vec<ViewCell>,
    screen_hex: Hex,
}

impl ViewWindow {
    pub fn new(settings: &HexSettings) -> Self {
        Self {
            layout: settings.layout(),
            screen_width: settings.screen_width,
            screen_height: settings.screen_height,
            zoom: settings.sprites_zoom,
            margins: ViewMargins::default(),
            rows: 0,
            cols: 0,
            cells: Vec::new(),
            screen_hex: Hex::default(),
        }
    }

    pub fn layout(&self) -> HexLayout {
        self.layout
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub(crate) fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    pub fn screen_size(&self) -> (i32, i32) {
        (self.screen_width, self.screen_height)
    }

    pub fn margins(&self) -> ViewMargins {
        self.margins
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn cells(&self) -> &[ViewCell] {
        &self.cells
    }

    pub fn screen_hex(&self) -> Hex {
        self.screen_hex
    }

    /// Visible columns at the current zoom, margins excluded.
    pub fn view_width(&self) -> i32 {
        Self::zoomed_span(self.screen_width, self.layout.hex_width, self.zoom)
    }

    /// Visible rows at the current zoom, margins excluded.
    pub fn view_height(&self) -> i32 {
        Self::zoomed_span(self.screen_height, self.layout.line_height, self.zoom)
    }

    fn zoomed_span(pixels: i32, step: i32, zoom: f32) -> i32 {
        let units = pixels / step + i32::from(pixels % step != 0);
        (units as f32 * zoom) as i32
    }

    /// Reallocates the cell buffer for the current zoom and margins. Cell
    /// contents are stale until the next [`ViewWindow::init_view`].
    pub fn resize(&mut self) -> Result<(), TryReserveError> {
        let rows = self.view_height() + self.margins.top + self.margins.bottom;
        let cols = self.view_width() + self.margins.left + self.margins.right;
        let len = (rows.max(0) as usize) * (cols.max(0) as usize);
        let mut cells = Vec::new();
        cells.try_reserve_exact(len)?;
        cells.resize(len, ViewCell::default());
        self.cells = cells;
        self.rows = rows.max(0);
        self.cols = cols.max(0);
        Ok(())
    }

    /// Assigns every cell its hex and screen position for a view centered
    /// on `center`.
    pub fn init_view(&mut self, center: Hex) {
        self.screen_hex = center;
        let (cx, cy) = (i32::from(center.x), i32::from(center.y));
        match self.layout.topology {
            GridTopology::Hexagonal => self.init_hexagonal(cx, cy),
            GridTopology::Square => self.init_square(cx, cy),
        }
    }

    fn init_hexagonal(&mut self, mut cx: i32, mut cy: i32) {
        let w = self.layout.hex_width;
        let line = self.layout.line_height;
        let hw = self.view_width() / 2 + self.margins.right;
        let hv = self.view_height() / 2 + self.margins.top;
        let mut vw = hv / 2 + (hv & 1) + 1;
        let mut vh = hv - vw / 2 - 1;
        for _ in 0..hw {
            if vw & 1 == 1 {
                vh -= 1;
            }
            vw += 1;
        }
        cx -= vw.abs();
        cy -= vh.abs();

        let xa = -(self.margins.right * w);
        let xb = -(w / 2) - self.margins.right * w;
        let mut oy = -line * self.margins.top;
        let wx = (self.screen_width as f32 * self.zoom) as i32;
        let cols = self.cols.max(0) as usize;

        for (yv, row) in (0_i32..).zip(self.cells.chunks_mut(cols.max(1))) {
            let mut hx = cx + yv / 2 + (yv & 1);
            let mut hy = cy + (yv - (hx - cx - (cx & 1)) / 2);
            let mut ox = if yv & 1 == 1 { xa } else { xb };
            if yv == 0 && cx & 1 == 1 {
                hy += 1;
            }
            for cell in row {
                *cell = ViewCell {
                    hex_x: hx,
                    hex_y: hy,
                    screen_x: wx - ox,
                    screen_y: oy,
                };
                if hx & 1 == 1 {
                    hy -= 1;
                }
                hx += 1;
                ox += w;
            }
            oy += line;
        }
    }

    fn init_square(&mut self, cx: i32, cy: i32) {
        let w = self.layout.hex_width;
        let line = self.layout.line_height;
        let half_w = self.view_width() / 2 + self.margins.right;
        let half_h = self.view_height() / 2 + self.margins.top;
        let mut base_x = cx - half_h / 2 - half_w;
        let mut base_y = cy - half_h / 2 + half_w;
        let xa = -w * self.margins.right;
        let xb = -w * self.margins.right - w / 2;
        let mut y = -line * self.margins.top;
        let wx = (self.screen_width as f32 * self.zoom) as i32;
        let cols = self.cols.max(0) as usize;

        for (j, row) in (0_i32..).zip(self.cells.chunks_mut(cols.max(1))) {
            let mut x = if j & 1 == 1 { xa } else { xb };
            let (mut hx, mut hy) = (base_x, base_y);
            for cell in row {
                *cell = ViewCell {
                    hex_x: hx,
                    hex_y: hy,
                    screen_x: wx - x,
                    screen_y: y,
                };
                hx += 1;
                hy -= 1;
                x += w;
            }
            if j & 1 == 1 {
                base_y += 1;
            } else {
                base_x += 1;
            }
            y += line;
        }
    }

    pub fn center_cell(&self) -> Option<&ViewCell> {
        let index = (self.rows / 2) * self.cols + self.cols / 2;
        self.cells.get(usize::try_from(index).ok()?)
    }

    pub fn cell_at(&self, row: i32, col: i32) -> Option<&ViewCell> {
        if row < 0 || col < 0 || row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get((row * self.cols + col) as usize)
    }

    /// Top-left pixel of a hex's cell (before zoom and scroll), derived
    /// from the center cell so it also works for hexes off the window.
    pub fn hex_current_position(&self, hex: Hex) -> Option<(i32, i32)> {
        let center = self.center_cell()?;
        let (dx, dy) = self.layout.interval_i32(
            center.hex_x,
            center.hex_y,
            i32::from(hex.x),
            i32::from(hex.y),
        );
        Some((center.screen_x + dx, center.screen_y + dy))
    }

    /// Screen pixel of the middle of a hex with scroll and zoom applied;
    /// the inverse of [`ViewWindow::hex_at_pixel`].
    pub fn hex_center_position(&self, hex: Hex, scroll_ox: i32, scroll_oy: i32) -> Option<(i32, i32)> {
        let (x, y) = self.hex_current_position(hex)?;
        let x = (x + self.layout.half_width() + scroll_ox) as f32 / self.zoom;
        let y = (y + self.layout.hex_real_height() / 2 + scroll_oy) as f32 / self.zoom;
        Some((x as i32, y as i32))
    }

    /// Hex under a screen pixel. The optional mask reassigns the cell's
    /// corner pixels to the neighbor that actually owns them.
    pub fn hex_at_pixel(
        &self,
        x: i32,
        y: i32,
        scroll: (i32, i32),
        mask: Option<&HexMask>,
        grid_width: u16,
        grid_height: u16,
    ) -> Option<Hex> {
        let xf = x as f32 - scroll.0 as f32 / self.zoom;
        let yf = y as f32 - scroll.1 as f32 / self.zoom;
        let cell_w = self.layout.hex_width as f32 / self.zoom;
        let cell_h = self.layout.hex_real_height() as f32 / self.zoom;

        for cell in &self.cells {
            let x_ = cell.screen_x as f32 / self.zoom;
            let y_ = cell.screen_y as f32 / self.zoom;
            if !(xf >= x_ && xf < x_ + cell_w && yf >= y_ && yf < y_ + cell_h) {
                continue;
            }
            let (mut hx, mut hy) = (cell.hex_x, cell.hex_y);
            if let Some(red) = mask.and_then(|mask| mask.red_at((xf - x_) as i32, (yf - y_) as i32)) {
                let hexagonal = self.layout.topology.is_hexagonal();
                let dir = match red {
                    50 => Some(if hexagonal { 5 } else { 6 }),
                    100 => Some(0),
                    150 => Some(if hexagonal { 3 } else { 4 }),
                    200 => Some(2),
                    _ => None,
                };
                if let Some(dir) = dir {
                    (hx, hy) = self.layout.topology.move_unchecked(hx, hy, dir);
                }
            }
            if let Some(hex) = Hex::from_i32(hx, hy, grid_width, grid_height) {
                return Some(hex);
            }
        }
        None
    }

    /// Grows the margins until a sprite drawn with anchor offset `(ox, oy)`
    /// fits. Returns whether any margin grew; the caller then resizes and
    /// rebuilds the view.
    pub fn process_hex_borders(&mut self, info: &SpriteInfo, ox: i32, oy: i32) -> bool {
        let w = self.layout.hex_width;
        let line = self.layout.line_height;
        let scroll_ox = self.layout.scroll_ox();
        let scroll_oy = self.layout.scroll_oy();

        let top = (info.offset_y + oy - self.margins.top * line + scroll_oy).max(0);
        let bottom =
            (info.height - info.offset_y - oy - self.margins.bottom * line + scroll_oy).max(0);
        let left = (info.width / 2 + info.offset_x + ox - self.margins.left * w + scroll_ox).max(0);
        let right =
            (info.width / 2 - info.offset_x - ox - self.margins.right * w + scroll_ox).max(0);

        let mut grew = false;
        for (overflow, step, margin) in [
            (top, line, &mut self.margins.top),
            (bottom, line, &mut self.margins.bottom),
            (left, w, &mut self.margins.left),
            (right, w, &mut self.margins.right),
        ] {
            if overflow > 0 {
                *margin += (overflow + step - 1) / step;
                grew = true;
            }
        }
        grew
    }

    /// Whether a sprite anchored at screen `(ox, oy)` touches the screen.
    pub fn is_visible(&self, info: &SpriteInfo, ox: i32, oy: i32) -> bool {
        let top = oy + info.offset_y - info.height - self.layout.scroll_oy();
        let bottom = oy + info.offset_y + self.layout.scroll_oy();
        let left = ox + info.offset_x - info.width / 2 - self.layout.scroll_ox();
        let right = ox + info.offset_x + info.width / 2 + self.layout.scroll_ox();
        let max_x = self.screen_width as f32 * self.zoom;
        let max_y = self.screen_height as f32 * self.zoom;
        !(top as f32 > max_y || bottom < 0 || left as f32 > max_x || right < 0)
    }

    /// Hex range covered by the window corners.
    pub fn light_bounds(&self) -> Option<LightBounds> {
        let last = self.cells.len().checked_sub(1)?;
        let cols = self.cols.max(1) as usize;
        Some(LightBounds {
            min_x: self.cells[0].hex_x,
            max_x: self.cells[last].hex_x,
            min_y: self.cells[cols - 1].hex_y,
            max_y: self.cells[last + 1 - cols].hex_y,
        })
    }

    /// Whether scrolling one step along `(xmod, ymod)` would bring a
    /// scroll-blocking hex (or the grid edge) into view. `ymod < 0` is up,
    /// `xmod > 0` is left.
    pub fn scroll_blocked(&self, grid: &FieldGrid, xmod: i32, ymod: i32) -> bool {
        let cols = self.cols;
        let (top, right) = (self.margins.top, self.margins.right);
        let (vw, vh) = (self.view_width(), self.view_height());
        // First column past the visible area, or the last column when there
        // is no left margin.
        let left_col = (right + vw).min(cols - 1);
        let mut left_edge = [
            top * cols + left_col,
            (top + vh - 1) * cols + left_col,
            (top + 1) * cols + left_col,
            (top + vh - 2) * cols + left_col,
        ];
        let mut right_edge = [
            (top + vh - 1) * cols + right + 1,
            top * cols + right + 1,
            (top + vh - 2) * cols + right + 1,
            (top + 1) * cols + right + 1,
        ];

        if self.check_directions(grid, &left_edge, &right_edge, xmod, ymod) {
            return true;
        }
        if self.zoom != 1.0 {
            left_edge.iter_mut().for_each(|pos| *pos -= 1);
            right_edge.iter_mut().for_each(|pos| *pos += 1);
            return self.check_directions(grid, &left_edge, &right_edge, xmod, ymod);
        }
        false
    }

    fn check_directions(
        &self,
        grid: &FieldGrid,
        left: &[i32; 4],
        right: &[i32; 4],
        xmod: i32,
        ymod: i32,
    ) -> bool {
        // (left dirs, right dirs) for up, down, leftward and rightward moves.
        let (up, down, leftward, rightward) = match self.layout.topology {
            GridTopology::Hexagonal => (
                ((0, Some(5)), (5, Some(0))),
                ((2, Some(3)), (3, Some(2))),
                ((4, None), (4, None)),
                ((1, None), (1, None)),
            ),
            GridTopology::Square => (
                ((0, Some(6)), (6, Some(0))),
                ((2, Some(4)), (4, Some(2))),
                ((6, Some(4)), (4, Some(6))),
                ((2, Some(0)), (0, Some(2))),
            ),
        };
        let blocked = |positions: &[i32; 4], (d1, d2): (u8, Option<u8>)| {
            self.edge_blocked(grid, positions, d1, d2)
        };

        if ymod < 0 && (blocked(left, up.0) || blocked(right, up.1)) {
            return true;
        }
        if ymod > 0 && (blocked(left, down.0) || blocked(right, down.1)) {
            return true;
        }
        if xmod > 0 && (blocked(left, leftward.0) || blocked(right, leftward.1)) {
            return true;
        }
        xmod < 0 && (blocked(right, rightward.1) || blocked(left, rightward.0))
    }

    fn edge_blocked(&self, grid: &FieldGrid, positions: &[i32; 4], d1: u8, d2: Option<u8>) -> bool {
        let topology = self.layout.topology;
        let (width, height) = (grid.width(), grid.height());
        positions.iter().any(|&pos| {
            let Some(cell) = usize::try_from(pos).ok().and_then(|pos| self.cells.get(pos)) else {
                return true;
            };
            let Some(mut hex) = Hex::from_i32(cell.hex_x, cell.hex_y, width, height) else {
                return true;
            };
            hex = topology.move_in_bounds(hex, d1, width, height).unwrap_or(hex);
            if grid.field(hex).flags().scroll_block {
                return true;
            }
            if let Some(d2) = d2 {
                hex = topology.move_in_bounds(hex, d2, width, height).unwrap_or(hex);
                if grid.field(hex).flags().scroll_block {
                    return true;
                }
            }
            false
        })
    }
}
