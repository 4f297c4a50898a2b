use crate::entity::CritterId;
use crate::geometry::{distance_sqrt, Hex, HexLayout};

/// Speed used when the camera follows a locked critter.
pub const CRITTER_LOCK_SPEED: f32 = 0.02;

/// Scroll requests held this frame, from keyboard or screen edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl ScrollInput {
    pub fn is_scrolling(&self) -> bool {
        self.left || self.right || self.up || self.down
    }

    fn axes(&self) -> (i32, i32) {
        let x = i32::from(self.left) - i32::from(self.right);
        let y = i32::from(self.up) - i32::from(self.down);
        (x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CritterLock {
    #[default]
    None,
    /// Keep the critter's hex at the screen center.
    Hard(CritterId),
    /// Follow the critter's moves without re-centering on it.
    Soft { critter: CritterId, last_hex: Hex },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct AutoScroll {
    active: bool,
    can_stop: bool,
    speed: f32,
    offs_x: f32,
    offs_y: f32,
    step_x: f32,
    step_y: f32,
}

/// Sub-hex scroll offset plus the animated and manual scroll drivers.
/// Offsets stay within one scroll unit; crossing it is reported to the
/// caller, which re-centers the view by one hex step.
#[derive(Debug, Clone, Default)]
pub struct ScrollState {
    offset_x: i32,
    offset_y: i32,
    auto: AutoScroll,
    lock: CritterLock,
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    pub fn reset(&mut self) {
        self.offset_x = 0;
        self.offset_y = 0;
        self.auto = AutoScroll::default();
    }

    pub fn is_auto_scrolling(&self) -> bool {
        self.auto.active
    }

    pub fn critter_lock(&self) -> CritterLock {
        self.lock
    }

    pub fn set_critter_lock(&mut self, lock: CritterLock) {
        self.lock = lock;
    }

    pub(crate) fn update_soft_lock(&mut self, hex: Hex) {
        if let CritterLock::Soft { last_hex, .. } = &mut self.lock {
            *last_hex = hex;
        }
    }

    pub fn stop_auto_scroll(&mut self) {
        self.auto.active = false;
    }

    /// Queues an animated scroll by a pixel delta. Successive requests add
    /// up while the animation runs.
    pub fn scroll_offset(&mut self, ox: i32, oy: i32, speed: f32, can_stop: bool) {
        if !self.auto.active {
            self.auto = AutoScroll {
                active: true,
                ..AutoScroll::default()
            };
        }
        self.auto.can_stop = can_stop;
        self.auto.speed = speed;
        self.auto.offs_x -= ox as f32;
        self.auto.offs_y -= oy as f32;
    }

    /// Advances one frame and applies the resulting pixel delta. With
    /// `blocked` set, movement toward a scroll-blocked edge is cancelled per
    /// axis. Returns the hex step `(xmod, ymod)` when the offset crossed a
    /// full scroll unit; `xmod` is -1..=1 and `ymod` -2..=2.
    pub fn advance(
        &mut self,
        input: ScrollInput,
        time_k: f32,
        layout: &HexLayout,
        zoom: f32,
        scroll_step: i32,
        blocked: Option<&dyn Fn(i32, i32) -> bool>,
    ) -> Option<(i32, i32)> {
        let (unit_x, unit_y) = (layout.scroll_ox(), layout.scroll_oy());
        if input.is_scrolling() && self.auto.can_stop {
            self.auto.active = false;
        }

        let (xscroll, yscroll) = if self.auto.active {
            let auto = &mut self.auto;
            auto.step_x += auto.offs_x * auto.speed * time_k;
            auto.step_y += auto.offs_y * auto.speed * time_k;
            auto.step_x = auto.step_x.clamp(-unit_x as f32, unit_x as f32);
            auto.step_y = auto.step_y.clamp(-unit_y as f32, unit_y as f32);
            let (xscroll, yscroll) = (auto.step_x as i32, auto.step_y as i32);
            auto.offs_x -= xscroll as f32;
            auto.offs_y -= yscroll as f32;
            auto.step_x -= xscroll as f32;
            auto.step_y -= yscroll as f32;
            if xscroll == 0 && yscroll == 0 {
                return None;
            }
            if distance_sqrt(0, 0, auto.offs_x as i32, auto.offs_y as i32) == 0 {
                auto.active = false;
            }
            (xscroll, yscroll)
        } else {
            let (x, y) = input.axes();
            if x == 0 && y == 0 {
                return None;
            }
            let step = scroll_step as f32;
            (
                (x as f32 * step * zoom * time_k) as i32,
                (y as f32 * (step * unit_y as f32 / unit_x as f32) * zoom * time_k) as i32,
            )
        };

        let mut scr_ox = self.offset_x + xscroll;
        let mut scr_oy = self.offset_y + yscroll;

        if let Some(blocked) = blocked {
            let xmod = xscroll.signum();
            let ymod = -yscroll.signum();
            if (xmod != 0 || ymod != 0) && blocked(xmod, ymod) {
                if xmod != 0 && ymod != 0 && !blocked(0, ymod) {
                    scr_ox = 0;
                } else if xmod != 0 && ymod != 0 && !blocked(xmod, 0) {
                    scr_oy = 0;
                } else {
                    if xmod != 0 {
                        scr_ox = 0;
                    }
                    if ymod != 0 {
                        scr_oy = 0;
                    }
                }
            }
        }

        let mut xmod = 0;
        let mut ymod = 0;
        if scr_ox >= unit_x {
            xmod = 1;
            scr_ox = (scr_ox - unit_x).min(unit_x);
        } else if scr_ox <= -unit_x {
            xmod = -1;
            scr_ox = (scr_ox + unit_x).max(-unit_x);
        }
        if scr_oy >= unit_y {
            ymod = -2;
            scr_oy = (scr_oy - unit_y).min(unit_y);
        } else if scr_oy <= -unit_y {
            ymod = 2;
            scr_oy = (scr_oy + unit_y).max(-unit_y);
        }

        self.offset_x = scr_ox;
        self.offset_y = scr_oy;
        (xmod != 0 || ymod != 0).then_some((xmod, ymod))
    }

    /// Drops the leftover offset on any axis that now faces a blocked edge.
    /// Called after the view moved by one hex.
    pub fn settle(&mut self, blocked: &dyn Fn(i32, i32) -> bool) {
        if (self.offset_x > 0 && blocked(1, 0)) || (self.offset_x < 0 && blocked(-1, 0)) {
            self.offset_x = 0;
        }
        if (self.offset_y > 0 && blocked(0, -1)) || (self.offset_y < 0 && blocked(0, 1)) {
            self.offset_y = 0;
        }
    }
}
