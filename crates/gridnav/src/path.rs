//! Greedy path search over a [`NodeNavmesh`].
//!
//! The search walks forward from the start node, always stepping to the neighbour with the
//! lowest score, and never backtracks. It can stop short of the target: when every neighbour is
//! blocked, absent or already on the path, the path walked so far is returned.

use glam::Vec3;
use tracing::debug;

use crate::{navmesh::NodeNavmesh, node::NodeKey};

/// The result of [`find_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// The waypoints to visit, in order. The start node is not included.
    pub waypoints: Vec<NodeKey>,
    /// The node closest to the requested destination.
    pub target: NodeKey,
    /// Whether the walk ended on [`Path::target`].
    pub complete: bool,
}

/// Finds a path from the node closest to `from` toward the node closest to `destination`.
///
/// Returns `None` if the navmesh has no nodes.
pub fn find_path(navmesh: &NodeNavmesh, from: Vec3, destination: Vec3) -> Option<Path> {
    let target = navmesh.closest_node(destination)?;
    let mut current = navmesh.closest_node(from)?;
    let target_position = navmesh.node(target)?.position;
    let distance_weight = navmesh.config().distance_weight;

    let start_distance = navmesh.node(current)?.position.distance(target_position) as i32;
    if start_distance <= 1 {
        return Some(Path {
            waypoints: vec![target],
            target,
            complete: true,
        });
    }

    let mut waypoints: Vec<NodeKey> = Vec::new();
    let complete = loop {
        if current == target {
            break true;
        }

        let mut fittest: Option<(NodeKey, f32)> = None;
        for neighbour in navmesh.neighbours(current).into_iter().flatten() {
            if neighbour == current || waypoints.contains(&neighbour) {
                continue;
            }
            let Some(node) = navmesh.node(neighbour) else {
                continue;
            };
            if !node.passable {
                continue;
            }
            let score = node.position.distance(target_position) * distance_weight + node.cost;
            if fittest.is_none_or(|(_, best)| score < best) {
                fittest = Some((neighbour, score));
            }
        }

        let Some((next, _)) = fittest else {
            debug!("Path search ran out of neighbours after {} steps", waypoints.len());
            break false;
        };
        waypoints.push(next);
        current = next;
    };

    Some(Path {
        waypoints,
        target,
        complete,
    })
}
