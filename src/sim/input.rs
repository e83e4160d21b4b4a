//! Per-tick input
//!
//! Raw key capture happens outside the simulation. The latch turns held-key
//! state into a snapshot where `fire` and `pause` are true only on the tick the
//! key goes down.

use serde::{Deserialize, Serialize};

/// Keys currently held, as reported by the platform layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
    pub pause: bool,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Edge-triggered: once per press
    pub fire: bool,
    /// Edge-triggered pause toggle
    pub pause: bool,
}

impl InputSnapshot {
    /// Net movement direction (-1, 0, 1) on each axis; screen y grows downward
    pub fn direction(&self) -> (f32, f32) {
        let axis = |neg: bool, pos: bool| match (neg, pos) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        (axis(self.left, self.right), axis(self.up, self.down))
    }
}

/// Edge detector for fire and pause
#[derive(Debug, Clone, Default)]
pub struct InputLatch {
    fire_held: bool,
    pause_held: bool,
}

impl InputLatch {
    pub fn sample(&mut self, keys: RawKeys) -> InputSnapshot {
        let fire = keys.fire && !self.fire_held;
        let pause = keys.pause && !self.pause_held;
        self.fire_held = keys.fire;
        self.pause_held = keys.pause;
        InputSnapshot {
            up: keys.up,
            down: keys.down,
            left: keys.left,
            right: keys.right,
            fire,
            pause,
        }
    }
}
