//! Screen projection of the grid: the window of visible cells and the
//! scroll offset that moves it.

mod scroll;
mod window;

pub use scroll::{CritterLock, ScrollInput, ScrollState, CRITTER_LOCK_SPEED};
pub use window::{ViewCell, ViewMargins, ViewWindow};
