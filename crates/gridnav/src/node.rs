//! The node module contains the [`Node`] type, the vertex of a [`NodeNavmesh`](crate::NodeNavmesh).

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;
use glam::Vec3;
use slotmap::SlotMap;

/// The cost assigned to freshly generated terrain nodes and restored by every revert.
pub const DEFAULT_NODE_COST: f32 = 100.0;

slotmap::new_key_type! {
    /// Handle to a [`Node`] stored in a [`NodeNavmesh`](crate::NodeNavmesh).
    pub struct NodeKey;
}

pub(crate) type Nodes = SlotMap<NodeKey, Node>;

/// A single traversable (or blocked) point of the navigation graph.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct Node {
    /// The fixed world location of the node. Doubles as its identity.
    pub position: Vec3,
    /// The traversal weight. `[Limit: >= 0]`
    pub cost: f32,
    /// Blocked nodes are never part of a path.
    pub passable: bool,
}

impl Node {
    /// Creates a passable node with the given cost.
    pub fn new(position: Vec3, cost: f32) -> Self {
        Self {
            position,
            cost,
            passable: true,
        }
    }

    /// Restores the default passability and cost.
    #[inline]
    pub fn reset(&mut self) {
        self.passable = true;
        self.cost = DEFAULT_NODE_COST;
    }
}

impl From<Vec3> for Node {
    fn from(position: Vec3) -> Self {
        Self::new(position, DEFAULT_NODE_COST)
    }
}

/// A position snapped to a fixed grid resolution, used as the lookup key of nodes.
///
/// Inserts and lookups go through the same quantization, so `position + offset` arithmetic
/// finds the neighbouring node even when it picked up float error on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey([i64; 3]);

impl PositionKey {
    /// Snaps `position` to a grid with cells of `resolution` world units.
    #[inline]
    pub fn new(position: Vec3, resolution: f32) -> Self {
        let snapped = (position / resolution).round();
        Self([snapped.x as i64, snapped.y as i64, snapped.z as i64])
    }
}
