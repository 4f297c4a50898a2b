use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name hash of a sprite or animation resource. Zero means "no sprite".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SpriteHash(pub u32);

impl SpriteHash {
    pub const NONE: Self = Self(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteInfo {
    pub width: i32,
    pub height: i32,
    pub offset_x: i32,
    pub offset_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.top <= other.bottom
            && other.top <= self.bottom
    }
}

impl SpriteInfo {
    /// Bounding box of the sprite drawn at a hex anchor point. Sprites are
    /// centered horizontally on the anchor and stand on it vertically.
    pub fn rect_at(&self, anchor_x: i32, anchor_y: i32) -> ScreenRect {
        let x = anchor_x + self.offset_x;
        let y = anchor_y + self.offset_y;
        ScreenRect {
            left: x - self.width / 2,
            right: x + self.width / 2,
            top: y - self.height,
            bottom: y,
        }
    }
}

/// Sprite metrics and per-pixel opacity supplied by the renderer.
pub trait SpriteSource {
    fn sprite_info(&self, sprite: SpriteHash) -> Option<SpriteInfo>;

    /// Opacity of the pixel at `(x, y)` measured from the sprite's top-left corner.
    fn is_pixel_opaque(&self, sprite: SpriteHash, x: i32, y: i32) -> bool;
}

/// In-memory sprite metrics; every pixel inside a known sprite counts as opaque.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpriteTable {
    entries: HashMap<SpriteHash, SpriteInfo>,
}

impl SpriteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sprite: SpriteHash, info: SpriteInfo) {
        self.entries.insert(sprite, info);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SpriteSource for SpriteTable {
    fn sprite_info(&self, sprite: SpriteHash) -> Option<SpriteInfo> {
        self.entries.get(&sprite).copied()
    }

    fn is_pixel_opaque(&self, sprite: SpriteHash, x: i32, y: i32) -> bool {
        self.entries
            .get(&sprite)
            .is_some_and(|info| x >= 0 && y >= 0 && x <= info.width && y <= info.height)
    }
}

#[derive(Debug, Error)]
pub enum HexMaskError {
    #[error("failed to decode hex mask image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("hex mask {path} is {width}x{height}, expected {expected_width}x{expected_height}")]
    Dimensions {
        path: PathBuf,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
}

/// Red channel of a hex-sized picture marking which neighbor owns each
/// corner pixel of a hex cell.
#[derive(Debug, Clone)]
pub struct HexMask {
    width: u32,
    height: u32,
    red: Vec<u8>,
}

impl HexMask {
    pub fn from_png(path: &Path, hex_width: u32, hex_height: u32) -> Result<Self, HexMaskError> {
        let image = image::open(path)
            .map_err(|source| HexMaskError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        if width != hex_width || height != hex_height {
            return Err(HexMaskError::Dimensions {
                path: path.to_path_buf(),
                width,
                height,
                expected_width: hex_width,
                expected_height: hex_height,
            });
        }
        let red = image.pixels().map(|pixel| pixel.0[0]).collect();
        Ok(Self { width, height, red })
    }

    pub fn from_fn(width: u32, height: u32, red_at: impl Fn(u32, u32) -> u8) -> Self {
        let mut red = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                red.push(red_at(x, y));
            }
        }
        Self { width, height, red }
    }

    pub fn red_at(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        self.red
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprite_rect_stands_on_anchor() {
        let info = SpriteInfo {
            width: 20,
            height: 40,
            offset_x: 2,
            offset_y: -3,
        };
        let rect = info.rect_at(100, 200);
        assert_eq!(
            rect,
            ScreenRect {
                left: 92,
                right: 112,
                top: 157,
                bottom: 197,
            }
        );
        assert!(rect.contains(100, 180));
        assert!(!rect.contains(100, 198));
    }

    #[test]
    fn sprite_table_reports_known_sprites_opaque() {
        let mut table = SpriteTable::new();
        table.insert(
            SpriteHash(7),
            SpriteInfo {
                width: 4,
                height: 4,
                ..SpriteInfo::default()
            },
        );
        assert!(table.is_pixel_opaque(SpriteHash(7), 2, 2));
        assert!(!table.is_pixel_opaque(SpriteHash(7), 5, 2));
        assert!(!table.is_pixel_opaque(SpriteHash(8), 0, 0));
    }

    #[test]
    fn hex_mask_reads_red_channel_from_png() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let path = temp.path().join("hex_mask.png");
        let mut image = image::RgbaImage::new(4, 2);
        image.put_pixel(0, 0, image::Rgba([50, 0, 0, 255]));
        image.put_pixel(3, 1, image::Rgba([200, 0, 0, 255]));
        image.save(&path).expect("save png");

        let mask = HexMask::from_png(&path, 4, 2).expect("load mask");
        assert_eq!(mask.red_at(0, 0), Some(50));
        assert_eq!(mask.red_at(3, 1), Some(200));
        assert_eq!(mask.red_at(1, 1), Some(0));
        assert_eq!(mask.red_at(4, 0), None);

        assert!(matches!(
            HexMask::from_png(&path, 32, 16),
            Err(HexMaskError::Dimensions { .. })
        ));
    }
}
