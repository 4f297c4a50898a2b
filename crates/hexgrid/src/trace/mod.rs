mod bullet;
mod line;

pub use bullet::{trace_bullet, BulletOutcome, BulletTrace};
pub use line::LineTracer;
