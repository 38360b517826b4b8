//! Published frames for concurrent readers.
//!
//! The scheduler publishes each completed tick as an immutable `FlockFrame`
//! by swapping one `Arc` under a lock. Readers clone the `Arc` and keep a
//! consistent view of a single tick for as long as they hold it.

use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::RwLock;

use super::store::AgentBuffer;

/// Unit heading along `velocity`; +Y for a stationary agent.
#[inline]
pub fn heading_of(velocity: Vec3) -> Vec3 {
    velocity.try_normalize().unwrap_or(Vec3::Y)
}

/// Rotation taking the +Y axis onto the agent's heading.
#[inline]
pub fn orientation_of(velocity: Vec3) -> Quat {
    Quat::from_rotation_arc(Vec3::Y, heading_of(velocity))
}

/// Complete agent state after one tick.
#[derive(Debug)]
pub struct FlockFrame {
    tick: u64,
    buffer: Arc<AgentBuffer>,
    flock_ids: Arc<[u32]>,
}

impl FlockFrame {
    pub(crate) fn new(tick: u64, buffer: Arc<AgentBuffer>, flock_ids: Arc<[u32]>) -> Self {
        FlockFrame {
            tick,
            buffer,
            flock_ids,
        }
    }

    /// Number of ticks completed when this frame was published.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn agent_count(&self) -> usize {
        self.flock_ids.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.buffer.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.buffer.velocities
    }

    /// Panics when `i >= agent_count()`.
    pub fn position(&self, i: usize) -> Vec3 {
        self.buffer.positions[i]
    }

    /// Panics when `i >= agent_count()`.
    pub fn velocity(&self, i: usize) -> Vec3 {
        self.buffer.velocities[i]
    }

    /// Panics when `i >= agent_count()`.
    pub fn flock_id(&self, i: usize) -> u32 {
        self.flock_ids[i]
    }

    pub fn heading(&self, i: usize) -> Vec3 {
        heading_of(self.velocity(i))
    }

    pub fn orientation(&self, i: usize) -> Quat {
        orientation_of(self.velocity(i))
    }

    pub fn try_position(&self, i: usize) -> Option<Vec3> {
        self.buffer.positions.get(i).copied()
    }

    pub fn try_velocity(&self, i: usize) -> Option<Vec3> {
        self.buffer.velocities.get(i).copied()
    }

    pub fn try_flock_id(&self, i: usize) -> Option<u32> {
        self.flock_ids.get(i).copied()
    }
}

/// Cloneable handle to the most recently published frame.
#[derive(Clone, Debug)]
pub struct FlockObserver {
    slot: Arc<RwLock<Arc<FlockFrame>>>,
}

impl FlockObserver {
    pub(crate) fn new(frame: FlockFrame) -> Self {
        FlockObserver {
            slot: Arc::new(RwLock::new(Arc::new(frame))),
        }
    }

    pub(crate) fn publish(&self, frame: FlockFrame) {
        let frame = Arc::new(frame);
        let retired = std::mem::replace(&mut *self.slot.write(), frame);
        // Release the lock before the old frame drops.
        drop(retired);
    }

    /// The latest complete frame. Never a partially written tick.
    pub fn latest(&self) -> Arc<FlockFrame> {
        Arc::clone(&self.slot.read())
    }

    pub fn tick(&self) -> u64 {
        self.slot.read().tick()
    }
}
