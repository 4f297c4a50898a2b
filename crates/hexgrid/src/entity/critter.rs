use crate::geometry::Hex;
use crate::light::LightParams;
use crate::resources::SpriteHash;

use super::CritterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CritterCondition {
    #[default]
    Alive,
    Knockout,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Contour {
    #[default]
    None,
    Red,
    Yellow,
    Custom(u32),
}

/// Filter for critter queries: condition bits plus player/npc restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CritterFind(pub u8);

impl CritterFind {
    pub const LIFE: Self = Self(0x01);
    pub const KNOCKOUT: Self = Self(0x02);
    pub const DEAD: Self = Self(0x04);
    pub const ALL: Self = Self(0x07);
    pub const ONLY_PLAYERS: Self = Self(0x10);
    pub const ONLY_NPC: Self = Self(0x20);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    const fn has(self, bit: Self) -> bool {
        self.0 & bit.0 != 0
    }

    pub fn matches(self, critter: &Critter) -> bool {
        if critter.is_player {
            if self.has(Self::ONLY_NPC) {
                return false;
            }
        } else if self.has(Self::ONLY_PLAYERS) {
            return false;
        }
        match critter.condition {
            CritterCondition::Alive => self.has(Self::LIFE),
            CritterCondition::Knockout => self.has(Self::KNOCKOUT),
            CritterCondition::Dead => self.has(Self::DEAD),
        }
    }
}

/// Grid-facing view of a critter.
#[derive(Debug, Clone)]
pub struct Critter {
    pub id: CritterId,
    pub hex: Hex,
    pub dir: u8,
    pub multihex: u32,
    pub condition: CritterCondition,
    pub is_chosen: bool,
    pub is_player: bool,
    pub visible: bool,
    pub sprite: SpriteHash,
    /// Animation offset applied on top of the hex anchor.
    pub sprite_offset: (i32, i32),
    /// Light items held in hand slots.
    pub lights: Vec<LightParams>,
    /// Hexes recently left, newest last; used to push a critter back when
    /// another one needs its hex.
    pub last_hexes: Vec<Hex>,
    pub contour: Contour,
}

impl Critter {
    pub fn new(id: CritterId, hex: Hex) -> Self {
        Self {
            id,
            hex,
            dir: 0,
            multihex: 0,
            condition: CritterCondition::Alive,
            is_chosen: false,
            is_player: false,
            visible: true,
            sprite: SpriteHash::default(),
            sprite_offset: (0, 0),
            lights: Vec::new(),
            last_hexes: Vec::new(),
            contour: Contour::None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.condition == CritterCondition::Dead
    }

    pub fn has_lights(&self) -> bool {
        self.lights.iter().any(|light| light.is_active())
    }
}
