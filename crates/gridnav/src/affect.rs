//! Region affects: box volumes that block or re-weight the nodes they cover, and undo their
//! previous mutation whenever they move.

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;
use tracing::trace;

use crate::{
    navmesh::NodeNavmesh,
    node::NodeKey,
    volume::{Aabb3d, AffectorPose},
};

/// How a [`RegionAffect`] selects and mutates nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub enum AffectType {
    /// Blocks every node in the vertical slab of the volume's bounds.
    #[default]
    AabbBlock,
    /// Sets the cost of every node in the vertical slab of the volume's bounds.
    AabbCostSet,
    /// Blocks every node inside the oriented volume.
    Block,
    /// Sets the cost of every node inside the oriented volume.
    CostSet,
}

/// A volume that mutates the nodes of a [`NodeNavmesh`] it covers.
///
/// Only the nodes recorded by the last application are ever reverted, so an affect never
/// touches a node it did not mutate itself. Overlapping affects are last-writer-wins.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct RegionAffect {
    /// How the affect selects and mutates nodes.
    pub affect_type: AffectType,
    /// Expansion applied to the axis-aligned variants. `[Units: wu]`
    pub margin: f32,
    /// The cost applied by the cost-setting variants.
    pub set_weight: f32,
    #[cfg_attr(feature = "bevy_reflect", reflect(ignore))]
    previously_affected: Vec<NodeKey>,
    last_position: Option<glam::Vec3>,
    last_bounds: Option<Aabb3d>,
    applied_type: Option<AffectType>,
}

impl Default for RegionAffect {
    fn default() -> Self {
        Self::new(AffectType::default())
    }
}

impl RegionAffect {
    /// Creates an affect that has not been applied yet.
    pub fn new(affect_type: AffectType) -> Self {
        Self {
            affect_type,
            margin: 0.1,
            set_weight: 0.0,
            previously_affected: Vec::new(),
            last_position: None,
            last_bounds: None,
            applied_type: None,
        }
    }

    /// Sets [`RegionAffect::margin`].
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Sets [`RegionAffect::set_weight`].
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.set_weight = weight;
        self
    }

    /// The nodes mutated by the most recent application.
    pub fn affected_nodes(&self) -> &[NodeKey] {
        &self.previously_affected
    }

    /// Whether `pose` differs from the pose of the last application.
    pub fn has_moved(&self, pose: &AffectorPose) -> bool {
        self.last_position != Some(pose.position) || self.last_bounds != Some(pose.bounds)
    }

    /// Re-applies the affect if it moved, resized or changed type since the last application.
    ///
    /// Does nothing while the navmesh has no nodes, so the affect applies as soon as they appear.
    /// Returns whether the affect was applied.
    pub fn reconcile(&mut self, navmesh: &mut NodeNavmesh, pose: &AffectorPose) -> bool {
        if navmesh.is_empty() {
            return false;
        }
        if self.applied_type == Some(self.affect_type) && !self.has_moved(pose) {
            return false;
        }

        navmesh.revert(&self.previously_affected);

        let corners = pose.corners;
        self.previously_affected = match self.affect_type {
            AffectType::Block => navmesh.set_dynamic_passable(
                corners.p1, corners.p2, corners.p4, corners.p5, false,
            ),
            AffectType::CostSet => navmesh.set_dynamic_weight(
                corners.p1,
                corners.p2,
                corners.p4,
                corners.p5,
                self.set_weight,
            ),
            AffectType::AabbCostSet => navmesh.set_weight(
                pose.bounds.min,
                pose.bounds.max,
                self.margin,
                self.set_weight,
            ),
            AffectType::AabbBlock => {
                // Blocks the bounds recorded by the previous application.
                let bounds = self.last_bounds.unwrap_or(pose.bounds);
                navmesh.set_passable(bounds.min, bounds.max, self.margin, false)
            }
        };
        trace!(
            "Region affect {:?} mutated {} nodes",
            self.affect_type,
            self.previously_affected.len()
        );

        self.last_position = Some(pose.position);
        self.last_bounds = Some(pose.bounds);
        self.applied_type = Some(self.affect_type);
        true
    }

    /// Changes the affect type. An actual change reverts all nodes mutated so far and makes
    /// the next [`RegionAffect::reconcile`] apply the new type.
    pub fn set_affect_type(&mut self, navmesh: &mut NodeNavmesh, affect_type: AffectType) {
        if self.affect_type == affect_type {
            return;
        }
        self.revert(navmesh);
        self.affect_type = affect_type;
    }

    /// Restores every node mutated by the last application to its default passability and cost,
    /// and forgets the last pose.
    pub fn revert(&mut self, navmesh: &mut NodeNavmesh) {
        navmesh.revert(&self.previously_affected);
        self.forget();
    }

    /// Drops the record of the last application without touching any navmesh, so the next
    /// [`RegionAffect::reconcile`] applies from scratch. Use this when the navmesh the affect was
    /// applied to is gone.
    pub fn forget(&mut self) {
        self.previously_affected.clear();
        self.last_position = None;
        self.last_bounds = None;
        self.applied_type = None;
    }
}
