use crate::entity::CritterId;
use crate::field::FieldGrid;
use crate::geometry::{GridTopology, Hex};

use super::line::LineTracer;

/// Parameters of one bullet or sight trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulletTrace {
    pub from: Hex,
    pub to: Hex,
    /// Number of steps; zero walks the distance between `from` and `to`.
    pub distance: u32,
    pub deviation_deg: f32,
    /// Stop with a hit as soon as this critter is met.
    pub find_critter: Option<CritterId>,
    /// With `find_critter`, any other critter standing in the way ends the
    /// trace as a miss.
    pub find_critter_safe: bool,
    /// Stop on the first hex that blocks sight.
    pub check_passed: bool,
    /// Only record the walked hexes; nothing is tested.
    pub collect_steps: bool,
}

impl BulletTrace {
    pub fn new(from: Hex, to: Hex) -> Self {
        Self {
            from,
            to,
            distance: 0,
            deviation_deg: 0.0,
            find_critter: None,
            find_critter_safe: false,
            check_passed: false,
            collect_steps: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulletOutcome {
    /// The searched critter was reached.
    pub hit: bool,
    /// Last hex fully passed.
    pub pre_block: Hex,
    /// Hex where the trace ended: a sight blocker, the grid border, a
    /// critter, or simply the last step.
    pub block: Hex,
    /// Every hex walked, in order. Filled only in step collection mode.
    pub steps: Vec<Hex>,
    /// Hexes tested for critters, in order.
    pub passed: Vec<Hex>,
}

pub fn trace_bullet(grid: &FieldGrid, topology: GridTopology, trace: &BulletTrace) -> BulletOutcome {
    let distance = if trace.distance == 0 {
        topology.distance(trace.from, trace.to)
    } else {
        trace.distance
    };

    let mut outcome = BulletOutcome {
        pre_block: trace.from,
        block: trace.from,
        ..BulletOutcome::default()
    };
    if !grid.contains(trace.from) {
        return outcome;
    }

    let mut tracer = LineTracer::new(
        topology,
        trace.from,
        trace.to,
        grid.width(),
        grid.height(),
        trace.deviation_deg,
    );
    let mut previous = trace.from;
    let mut current = trace.from;
    for _ in 0..distance {
        let next = tracer.next_hex(current);
        if next == current {
            // Border reached; the walk cannot advance any further.
            break;
        }
        previous = current;
        current = next;

        if trace.collect_steps {
            outcome.steps.push(current);
            continue;
        }

        let field = grid.field(current);
        if trace.check_passed
            && (field.flags().is_not_raked || clips_corner(grid, topology, previous, current))
        {
            break;
        }
        outcome.passed.push(current);
        if let (Some(target), Some(occupant)) = (trace.find_critter, field.critter()) {
            if occupant == target {
                outcome.hit = true;
                break;
            }
            if trace.find_critter_safe {
                break;
            }
        }
    }

    outcome.pre_block = previous;
    outcome.block = current;
    outcome
}

/// A diagonal square step squeezing between two sight blockers that share
/// the corner it crosses.
fn clips_corner(grid: &FieldGrid, topology: GridTopology, from: Hex, to: Hex) -> bool {
    if topology.is_hexagonal() || from.x == to.x || from.y == to.y {
        return false;
    }
    let blocks = |hex: Hex| grid.field(hex).flags().is_not_raked;
    blocks(Hex::new(from.x, to.y)) && blocks(Hex::new(to.x, from.y))
}
