//! Block occupancy counting.
//!
//! A layout divides into blocks of track bordered by wheel sensors. Each
//! sensor edge (a wheel arriving over or leaving the sensor) transfers half
//! a car between the neighbouring blocks: the trigger edge books the half
//! now straddling the boundary, the release edge books the other half. A
//! full crossing is therefore exactly one car moved.
//!
//! Which neighbour gains depends on the layout-frame direction of travel,
//! which the caller reads from
//! [`Locomotive::movement_direction`](crate::locomotive::Locomotive::movement_direction).
//!
//! Blocks live in one slice owned by the control loop; counters refer to
//! them by index. Counts are updated only from the loop thread, so no
//! locking is involved.

use heapless::String;

use crate::behaviour::SensorEvent;
use crate::locomotive::AbsoluteDirection;

/// Maximum block name length.
const MAX_NAME: usize = 16;

/// A block of track with a count of cars currently on it.
#[derive(Clone, Debug)]
pub struct Block {
    name: String<MAX_NAME>,
    count: f32,
}

impl Block {
    /// Create an empty block. Over-long names are truncated.
    pub fn new(name: &str) -> Self {
        let mut s = String::new();
        for c in name.chars() {
            if s.push(c).is_err() {
                break;
            }
        }
        Self { name: s, count: 0.0 }
    }

    /// The block's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cars currently counted on this block. Halves mean a car is
    /// straddling a boundary.
    pub fn count(&self) -> f32 {
        self.count
    }

    /// Adjust the count. A negative total indicates a missed edge
    /// somewhere; it is reported but counting continues.
    pub fn add_count(&mut self, amount: f32) {
        self.count += amount;
        if self.count < 0.0 {
            tracing::warn!(block = %self.name, count = self.count, "negative block count");
        }
    }
}

/// Transfers car counts between two blocks on sensor edges.
///
/// `left_block` / `right_block` are indices into the block slice passed to
/// [`update`](Self::update); either side may be absent at the edge of the
/// modelled layout.
#[derive(Clone, Copy, Debug)]
pub struct WheelCounter {
    left_block: Option<usize>,
    right_block: Option<usize>,
}

impl WheelCounter {
    /// Create a counter between two blocks.
    pub fn new(left_block: Option<usize>, right_block: Option<usize>) -> Self {
        Self {
            left_block,
            right_block,
        }
    }

    /// Apply one sensor event given the current direction of travel.
    ///
    /// Leftward movement increases the left block and decreases the right
    /// block; each edge carries half a car.
    pub fn update(
        &self,
        event: SensorEvent,
        direction: AbsoluteDirection,
        blocks: &mut [Block],
    ) {
        if event == SensorEvent::None {
            return;
        }
        let amount = match direction {
            AbsoluteDirection::Left => 0.5,
            AbsoluteDirection::Right => -0.5,
        };
        if let Some(idx) = self.left_block {
            blocks[idx].add_count(amount);
        }
        if let Some(idx) = self.right_block {
            blocks[idx].add_count(-amount);
        }
    }
}
