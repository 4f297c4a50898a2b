use thiserror::Error;

use crate::entity::ProtoId;
use crate::light::LightParams;
use crate::resources::SpriteHash;

pub const FORMAT_VERSION: u32 = 7;
pub const HEADER_SIZE: usize = 44;
pub const TILE_RECORD_SIZE: usize = 14;
pub const SCENERY_RECORD_SIZE: usize = 28;

/// Legacy width/height markers standing for the default 400-hex side.
const WIDTH_SENTINEL: u16 = 0xAABB;
const HEIGHT_SENTINEL: u16 = 0xCCDD;
const SENTINEL_SIDE: u16 = 400;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapFormatError {
    #[error("map data truncated: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("map format version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("map proto {found} does not match requested {expected}")]
    ProtoMismatch { found: u32, expected: u32 },
    #[error("{section} section declares {declared_len} bytes for {count} records of {record_size} bytes")]
    SectionLength {
        section: &'static str,
        count: u32,
        declared_len: u32,
        record_size: usize,
    },
    #[error("map has {count} unexpected trailing bytes")]
    TrailingBytes { count: usize },
    #[error("map dimensions {width}x{height} are invalid")]
    Dimensions { width: u16, height: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileRecord {
    pub hex_x: u16,
    pub hex_y: u16,
    pub offset_x: i16,
    pub offset_y: i16,
    pub layer: u8,
    pub is_roof: bool,
    pub sprite: SpriteHash,
}

/// A wall or scenery placement. Light fields override the proto light when
/// `light_distance` is non-zero; a zero sprite keeps the proto sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneryRecord {
    pub proto_id: ProtoId,
    pub hex_x: u16,
    pub hex_y: u16,
    pub offset_x: i16,
    pub offset_y: i16,
    pub light_color: u32,
    pub light_intensity: i16,
    pub light_distance: u8,
    pub light_flags: u8,
    pub sprite_cut: u8,
    pub dir: u8,
    pub locker: u8,
    pub sprite: SpriteHash,
}

impl SceneryRecord {
    pub fn light(&self) -> Option<LightParams> {
        (self.light_distance > 0).then_some(LightParams {
            color: self.light_color,
            distance: self.light_distance,
            intensity: i32::from(self.light_intensity),
            flags: self.light_flags,
        })
    }
}

/// Section boundaries read from a header, enough to hash a blob without
/// decoding its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub version: u32,
    pub proto_id: u32,
    pub width: u16,
    pub height: u16,
    pub tile_count: u32,
    pub wall_count: u32,
    pub scenery_count: u32,
    pub tiles_len: u32,
    pub walls_len: u32,
    pub scenery_len: u32,
}

impl MapHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, MapFormatError> {
        let mut cursor = 0usize;
        let version = read_u32(bytes, &mut cursor)?;
        if version != FORMAT_VERSION {
            return Err(MapFormatError::Version {
                found: version,
                expected: FORMAT_VERSION,
            });
        }
        let proto_id = read_u32(bytes, &mut cursor)?;
        let width = match read_u16(bytes, &mut cursor)? {
            WIDTH_SENTINEL => SENTINEL_SIDE,
            width => width,
        };
        let height = match read_u16(bytes, &mut cursor)? {
            HEIGHT_SENTINEL => SENTINEL_SIDE,
            height => height,
        };
        read_exact(bytes, &mut cursor, 8)?;
        let header = Self {
            version,
            proto_id,
            width,
            height,
            tile_count: read_u32(bytes, &mut cursor)?,
            wall_count: read_u32(bytes, &mut cursor)?,
            scenery_count: read_u32(bytes, &mut cursor)?,
            tiles_len: read_u32(bytes, &mut cursor)?,
            walls_len: read_u32(bytes, &mut cursor)?,
            scenery_len: read_u32(bytes, &mut cursor)?,
        };
        header.check_section("tiles", header.tile_count, header.tiles_len, TILE_RECORD_SIZE)?;
        header.check_section("walls", header.wall_count, header.walls_len, SCENERY_RECORD_SIZE)?;
        header.check_section(
            "scenery",
            header.scenery_count,
            header.scenery_len,
            SCENERY_RECORD_SIZE,
        )?;
        Ok(header)
    }

    fn check_section(
        &self,
        section: &'static str,
        count: u32,
        declared_len: u32,
        record_size: usize,
    ) -> Result<(), MapFormatError> {
        if (count as u64) * (record_size as u64) != u64::from(declared_len) {
            return Err(MapFormatError::SectionLength {
                section,
                count,
                declared_len,
                record_size,
            });
        }
        Ok(())
    }

    /// Byte ranges of the tile, wall and scenery sections.
    pub fn section_ranges(&self) -> [std::ops::Range<usize>; 3] {
        let tiles = HEADER_SIZE..HEADER_SIZE + self.tiles_len as usize;
        let walls = tiles.end..tiles.end + self.walls_len as usize;
        let scenery = walls.end..walls.end + self.scenery_len as usize;
        [tiles, walls, scenery]
    }

    /// Rejects input whose size disagrees with the declared sections, so
    /// record buffers are only sized from counts the data can back.
    pub fn check_len(&self, available: usize) -> Result<(), MapFormatError> {
        let declared = HEADER_SIZE as u64
            + u64::from(self.tiles_len)
            + u64::from(self.walls_len)
            + u64::from(self.scenery_len);
        let available_u64 = available as u64;
        if available_u64 < declared {
            return Err(MapFormatError::Truncated {
                offset: available,
                needed: (declared - available_u64) as usize,
                available: 0,
            });
        }
        if available_u64 > declared {
            return Err(MapFormatError::TrailingBytes {
                count: (available_u64 - declared) as usize,
            });
        }
        Ok(())
    }

    pub fn total_len(&self) -> usize {
        HEADER_SIZE + self.tiles_len as usize + self.walls_len as usize + self.scenery_len as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapBlob {
    pub proto_id: u32,
    pub width: u16,
    pub height: u16,
    pub tiles: Vec<TileRecord>,
    pub walls: Vec<SceneryRecord>,
    pub scenery: Vec<SceneryRecord>,
}

impl MapBlob {
    pub fn new(proto_id: u32, width: u16, height: u16) -> Self {
        Self {
            proto_id,
            width,
            height,
            ..Self::default()
        }
    }

    /// Decodes a blob. `expected_pid` rejects a blob recorded for another map.
    pub fn decode(bytes: &[u8], expected_pid: Option<u32>) -> Result<Self, MapFormatError> {
        let header = MapHeader::parse(bytes)?;
        if let Some(expected) = expected_pid {
            if header.proto_id != expected {
                return Err(MapFormatError::ProtoMismatch {
                    found: header.proto_id,
                    expected,
                });
            }
        }
        if header.width == 0 || header.height == 0 {
            return Err(MapFormatError::Dimensions {
                width: header.width,
                height: header.height,
            });
        }

        header.check_len(bytes.len())?;

        let mut cursor = HEADER_SIZE;
        let mut tiles = Vec::with_capacity(header.tile_count as usize);
        for _ in 0..header.tile_count {
            tiles.push(read_tile(bytes, &mut cursor)?);
        }
        let mut walls = Vec::with_capacity(header.wall_count as usize);
        for _ in 0..header.wall_count {
            walls.push(read_scenery(bytes, &mut cursor)?);
        }
        let mut scenery = Vec::with_capacity(header.scenery_count as usize);
        for _ in 0..header.scenery_count {
            scenery.push(read_scenery(bytes, &mut cursor)?);
        }
        if cursor != bytes.len() {
            return Err(MapFormatError::TrailingBytes {
                count: bytes.len() - cursor,
            });
        }

        Ok(Self {
            proto_id: header.proto_id,
            width: header.width,
            height: header.height,
            tiles,
            walls,
            scenery,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let tiles_len = self.tiles.len() * TILE_RECORD_SIZE;
        let walls_len = self.walls.len() * SCENERY_RECORD_SIZE;
        let scenery_len = self.scenery.len() * SCENERY_RECORD_SIZE;
        let mut bytes = Vec::with_capacity(HEADER_SIZE + tiles_len + walls_len + scenery_len);
        bytes.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        bytes.extend_from_slice(&self.proto_id.to_be_bytes());
        bytes.extend_from_slice(&self.width.to_be_bytes());
        bytes.extend_from_slice(&self.height.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        for count in [self.tiles.len(), self.walls.len(), self.scenery.len()] {
            bytes.extend_from_slice(&(count as u32).to_be_bytes());
        }
        for len in [tiles_len, walls_len, scenery_len] {
            bytes.extend_from_slice(&(len as u32).to_be_bytes());
        }
        for tile in &self.tiles {
            write_tile(&mut bytes, tile);
        }
        for record in self.walls.iter().chain(&self.scenery) {
            write_scenery(&mut bytes, record);
        }
        bytes
    }
}

fn read_tile(bytes: &[u8], cursor: &mut usize) -> Result<TileRecord, MapFormatError> {
    Ok(TileRecord {
        hex_x: read_u16(bytes, cursor)?,
        hex_y: read_u16(bytes, cursor)?,
        offset_x: read_u16(bytes, cursor)? as i16,
        offset_y: read_u16(bytes, cursor)? as i16,
        layer: read_u8(bytes, cursor)?,
        is_roof: read_u8(bytes, cursor)? != 0,
        sprite: SpriteHash(read_u32(bytes, cursor)?),
    })
}

fn write_tile(bytes: &mut Vec<u8>, tile: &TileRecord) {
    bytes.extend_from_slice(&tile.hex_x.to_be_bytes());
    bytes.extend_from_slice(&tile.hex_y.to_be_bytes());
    bytes.extend_from_slice(&tile.offset_x.to_be_bytes());
    bytes.extend_from_slice(&tile.offset_y.to_be_bytes());
    bytes.push(tile.layer);
    bytes.push(u8::from(tile.is_roof));
    bytes.extend_from_slice(&tile.sprite.0.to_be_bytes());
}

fn read_scenery(bytes: &[u8], cursor: &mut usize) -> Result<SceneryRecord, MapFormatError> {
    let record = SceneryRecord {
        proto_id: ProtoId(read_u32(bytes, cursor)?),
        hex_x: read_u16(bytes, cursor)?,
        hex_y: read_u16(bytes, cursor)?,
        offset_x: read_u16(bytes, cursor)? as i16,
        offset_y: read_u16(bytes, cursor)? as i16,
        light_color: read_u32(bytes, cursor)?,
        light_intensity: read_u16(bytes, cursor)? as i16,
        light_distance: read_u8(bytes, cursor)?,
        light_flags: read_u8(bytes, cursor)?,
        sprite_cut: read_u8(bytes, cursor)?,
        dir: read_u8(bytes, cursor)?,
        locker: read_u8(bytes, cursor)?,
        sprite: SpriteHash::NONE,
    };
    read_u8(bytes, cursor)?;
    Ok(SceneryRecord {
        sprite: SpriteHash(read_u32(bytes, cursor)?),
        ..record
    })
}

fn write_scenery(bytes: &mut Vec<u8>, record: &SceneryRecord) {
    bytes.extend_from_slice(&record.proto_id.0.to_be_bytes());
    bytes.extend_from_slice(&record.hex_x.to_be_bytes());
    bytes.extend_from_slice(&record.hex_y.to_be_bytes());
    bytes.extend_from_slice(&record.offset_x.to_be_bytes());
    bytes.extend_from_slice(&record.offset_y.to_be_bytes());
    bytes.extend_from_slice(&record.light_color.to_be_bytes());
    bytes.extend_from_slice(&record.light_intensity.to_be_bytes());
    bytes.extend_from_slice(&[
        record.light_distance,
        record.light_flags,
        record.sprite_cut,
        record.dir,
        record.locker,
        0,
    ]);
    bytes.extend_from_slice(&record.sprite.0.to_be_bytes());
}

fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8, MapFormatError> {
    Ok(read_exact(bytes, cursor, 1)?[0])
}

fn read_u16(bytes: &[u8], cursor: &mut usize) -> Result<u16, MapFormatError> {
    let raw = read_exact(bytes, cursor, 2)?;
    Ok(u16::from_be_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, MapFormatError> {
    let raw = read_exact(bytes, cursor, 4)?;
    Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn read_exact<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], MapFormatError> {
    let end = cursor.saturating_add(len);
    if end > bytes.len() {
        return Err(MapFormatError::Truncated {
            offset: *cursor,
            needed: len,
            available: bytes.len().saturating_sub(*cursor),
        });
    }
    let out = &bytes[*cursor..end];
    *cursor = end;
    Ok(out)
}
