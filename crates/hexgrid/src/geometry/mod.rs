mod hex;
mod layout;
mod offsets;

pub use hex::{distance_sqrt, rotate_steps, steps_xy, triangular, GridTopology, Hex};
pub(crate) use hex::{distance_i32, normalize_degrees};
pub use layout::HexLayout;
pub use offsets::{HexOffsets, MAX_HEX_OFFSET};
