mod finder;

pub use finder::{PathRequest, PathResult, Pathfinder};
