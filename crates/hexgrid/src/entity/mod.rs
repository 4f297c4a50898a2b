mod critter;
mod item;

use serde::{Deserialize, Serialize};

pub use critter::{Contour, Critter, CritterCondition, CritterFind};
pub use item::{Item, ItemFlags, ItemKind, ItemProto, ProtoError, ProtoRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CritterId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProtoId(pub u32);
