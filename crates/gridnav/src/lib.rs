#![doc = include_str!("../../../readme.md")]

mod affect;
mod config;
mod navigator;
mod navmesh;
mod node;
mod path;
pub mod persistence;
mod volume;

pub use affect::{AffectType, RegionAffect};
pub use config::{NavigatorSettings, NodeNavmeshConfig};
pub use navigator::{ArriveCallback, Navigator, NavigatorEvent};
pub use navmesh::{
    AffectorId, GenerationSource, MESH_NODE_COST, NEIGHBOUR_OFFSETS, NodeNavmesh, TerrainSampler,
};
pub use node::{DEFAULT_NODE_COST, Node, NodeKey, PositionKey};
pub use path::{Path, find_path};
pub use persistence::{NodeRecord, NodeSnapshot, PersistenceError};
pub use volume::{Aabb3d, AffectorPose, OrientedBox};

pub use glam;

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Vec3;

    use crate::{Node, NodeNavmesh, NodeNavmeshConfig};

    /// A flat grid of default nodes at integer coordinates `0..width` by `0..depth`.
    pub(crate) fn flat_grid(width: i32, depth: i32) -> NodeNavmesh {
        flat_grid_with(NodeNavmeshConfig::default(), width, depth)
    }

    pub(crate) fn flat_grid_with(config: NodeNavmeshConfig, width: i32, depth: i32) -> NodeNavmesh {
        let mut navmesh = NodeNavmesh::new(config);
        for z in 0..depth {
            for x in 0..width {
                navmesh.insert(Node::from(Vec3::new(x as f32, 0.0, z as f32)));
            }
        }
        navmesh
    }
}
