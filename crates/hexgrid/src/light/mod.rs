mod accumulator;
mod source;

pub use accumulator::{LightAccumulator, LightBounds, LightPoint, LightScene};
pub use source::{
    light_disable_dir, LightCapacity, LightParams, LightSource, LIGHT_DISABLE_ALL_DIRS,
    LIGHT_GLOBAL, LIGHT_INVERSE,
};
