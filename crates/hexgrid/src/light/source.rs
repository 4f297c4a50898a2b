use serde::{Deserialize, Serialize};

use crate::entity::CritterId;
use crate::geometry::Hex;

pub const LIGHT_DISABLE_ALL_DIRS: u8 = 0x3F;
pub const LIGHT_GLOBAL: u8 = 0x40;
pub const LIGHT_INVERSE: u8 = 0x80;

pub const fn light_disable_dir(dir: u8) -> u8 {
    1 << dir
}

/// Light emitted by an item or carried by a critter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightParams {
    /// Packed `0xRRGGBB`.
    pub color: u32,
    pub distance: u8,
    /// Percent of full strength; negative values ignore the time of day.
    pub intensity: i32,
    pub flags: u8,
}

impl LightParams {
    pub fn is_active(&self) -> bool {
        self.distance > 0
            && self.intensity != 0
            && self.flags & LIGHT_DISABLE_ALL_DIRS != LIGHT_DISABLE_ALL_DIRS
    }
}

/// Ambient light level in percent: `local` scales ordinary sources,
/// `global` scales sources flagged [`LIGHT_GLOBAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCapacity {
    pub local: u8,
    pub global: u8,
}

impl Default for LightCapacity {
    fn default() -> Self {
        Self::uniform(100)
    }
}

impl LightCapacity {
    pub const fn uniform(percent: u8) -> Self {
        Self {
            local: percent,
            global: percent,
        }
    }

    pub(crate) fn for_source(&self, source: &LightSource) -> i32 {
        let base = if source.flags & LIGHT_GLOBAL != 0 {
            i32::from(self.global.min(100))
        } else if source.intensity >= 0 {
            i32::from(self.local.min(100))
        } else {
            100
        };
        if source.flags & LIGHT_INVERSE != 0 {
            100 - base
        } else {
            base
        }
    }
}

/// One emitter collected for a single rebuild pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSource {
    pub hex: Hex,
    pub color: u32,
    pub distance: u32,
    pub intensity: i32,
    pub flags: u8,
    /// Critter whose sprite offset the fan follows while it animates.
    pub anchor: Option<CritterId>,
}

impl LightSource {
    pub fn from_params(hex: Hex, params: LightParams, anchor: Option<CritterId>) -> Self {
        Self {
            hex,
            color: params.color,
            distance: u32::from(params.distance),
            intensity: params.intensity,
            flags: params.flags,
            anchor,
        }
    }
}
