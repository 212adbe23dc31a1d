//! The graph store: owns the nodes, generates and persists them, and answers spatial queries.
//!
//! All queries are linear scans over the node set.

use std::collections::HashMap;

use glam::Vec3;
use tracing::{debug, info};

use crate::{
    config::NodeNavmeshConfig,
    node::{DEFAULT_NODE_COST, Node, NodeKey, Nodes, PositionKey},
    persistence::{self, NodeRecord, NodeSnapshot, PersistenceError},
    volume::{Aabb3d, OrientedBox},
};

/// The planar offsets of the eight neighbour slots returned by [`NodeNavmesh::neighbours`], in order.
pub const NEIGHBOUR_OFFSETS: [Vec3; 8] = [
    Vec3::new(-1.0, 0.0, 1.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(-1.0, 0.0, -1.0),
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(1.0, 0.0, -1.0),
];

/// The cost of nodes generated from mesh vertices.
pub const MESH_NODE_COST: f32 = 1.0;

/// Source of terrain heights used by [`GenerationSource::Terrain`].
pub trait TerrainSampler {
    /// The extent of the terrain. Nodes are generated for every integer `x` in `0..size.x`
    /// and `z` in `0..size.z`.
    fn size(&self) -> Vec3;
    /// The terrain height at the given planar coordinates.
    fn sample_height(&self, x: f32, z: f32) -> f32;
}

/// What [`NodeNavmesh::generate`] builds nodes from.
pub enum GenerationSource<'a> {
    /// One node per integer cell of a terrain whose height lies within the bounds.
    Terrain {
        /// The terrain to sample
        sampler: &'a dyn TerrainSampler,
        /// Cells sampled below this height get no node.
        min_height: f32,
        /// Cells sampled above this height get no node.
        max_height: f32,
    },
    /// One node per vertex.
    Vertices(&'a [Vec3]),
}

/// Non-owning identifier of a region affect bound to a [`NodeNavmesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AffectorId(pub u64);

/// A point-cloud navigation graph.
#[derive(Debug, Clone, Default)]
pub struct NodeNavmesh {
    config: NodeNavmeshConfig,
    nodes: Nodes,
    lookup: HashMap<PositionKey, NodeKey>,
    affect_areas: Vec<AffectorId>,
    showing_debug: bool,
}

impl NodeNavmesh {
    /// Creates an empty navmesh.
    pub fn new(config: NodeNavmeshConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// The configuration of this navmesh.
    pub fn config(&self) -> &NodeNavmeshConfig {
        &self.config
    }

    /// Mutable access to the configuration.
    ///
    /// Changing [`NodeNavmeshConfig::key_resolution`] only affects nodes inserted afterwards.
    pub fn config_mut(&mut self) -> &mut NodeNavmeshConfig {
        &mut self.config
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether there are no nodes, e.g. because none were generated or loaded yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node with the given key.
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Returns the node with the given key mutably.
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Iterates over all nodes in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    /// Inserts a node. If a node already occupies the same position key, nothing is inserted
    /// and the key of the existing node is returned.
    pub fn insert(&mut self, node: Node) -> NodeKey {
        let position_key = self.position_key(node.position);
        if let Some(&existing) = self.lookup.get(&position_key) {
            return existing;
        }
        let key = self.nodes.insert(node);
        self.lookup.insert(position_key, key);
        key
    }

    /// Removes every node and stops showing debug output.
    pub fn clear(&mut self) {
        self.disable_debug();
        self.nodes.clear();
        self.lookup.clear();
    }

    /// Replaces all nodes with freshly generated ones.
    ///
    /// Returns a snapshot of the new nodes, addressed to this navmesh's node file, which the
    /// caller is expected to [save](NodeSnapshot::save) off the main loop.
    pub fn generate(&mut self, source: GenerationSource<'_>) -> NodeSnapshot {
        self.clear();
        match source {
            GenerationSource::Terrain {
                sampler,
                min_height,
                max_height,
            } => {
                let size = sampler.size();
                let width = size.x.ceil() as i32;
                let depth = size.z.ceil() as i32;
                for z in 0..depth {
                    for x in 0..width {
                        let (x, z) = (x as f32, z as f32);
                        let height = sampler.sample_height(x, z);
                        if height >= min_height && height <= max_height {
                            self.insert(Node::new(Vec3::new(x, height, z), DEFAULT_NODE_COST));
                        }
                    }
                }
            }
            GenerationSource::Vertices(vertices) => {
                for &vertex in vertices {
                    self.insert(Node::new(vertex, MESH_NODE_COST));
                }
                let duplicates = vertices.len() - self.len();
                if duplicates > 0 {
                    debug!("Skipped {duplicates} duplicate vertices while generating nodes");
                }
            }
        }
        info!(
            "Generated {} nodes for navmesh {}",
            self.len(),
            self.config.id
        );
        self.snapshot()
    }

    /// Copies the current nodes into a snapshot addressed to this navmesh's node file.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            path: self.config.node_file_path(),
            records: self.nodes.values().map(NodeRecord::from).collect(),
        }
    }

    /// Writes the current nodes to this navmesh's node file on the calling thread.
    pub fn save(&self) -> Result<(), PersistenceError> {
        let snapshot = self.snapshot();
        snapshot.save()?;
        info!("Saved navmesh nodes to {}", snapshot.path.display());
        Ok(())
    }

    /// Replaces all nodes with the ones stored in this navmesh's node file.
    ///
    /// A missing file is not an error: the navmesh is left empty and `Ok(0)` is returned.
    /// Otherwise returns the number of nodes read.
    pub fn load(&mut self) -> Result<usize, PersistenceError> {
        self.clear();
        let path = self.config.node_file_path();
        let Some(records) = persistence::read_node_file(&path)? else {
            info!(
                "Couldn't load node data, there's no such file: {}",
                path.display()
            );
            return Ok(0);
        };
        let count = records.len();
        for record in records {
            self.insert(record.into());
        }
        info!("Read {count} nodes successfully.");
        Ok(count)
    }

    /// Looks up the node at exactly `position`, up to [`NodeNavmeshConfig::key_resolution`].
    pub fn node_at(&self, position: Vec3) -> Option<NodeKey> {
        self.lookup.get(&self.position_key(position)).copied()
    }

    /// Finds the node closest to `position`.
    /// Returns `None` if the navmesh is empty.
    pub fn closest_node(&self, position: Vec3) -> Option<NodeKey> {
        self.nodes
            .iter()
            .map(|(key, node)| (key, node.position.distance(position)))
            .fold(None, |closest: Option<(NodeKey, f32)>, (key, distance)| {
                match closest {
                    Some((_, closest_distance)) if closest_distance <= distance => closest,
                    _ => Some((key, distance)),
                }
            })
            .map(|(key, _)| key)
    }

    /// Returns the nodes at the [`NEIGHBOUR_OFFSETS`] around `key`.
    /// Slots without a node, or all slots if `key` is unknown, are `None`.
    pub fn neighbours(&self, key: NodeKey) -> [Option<NodeKey>; 8] {
        let Some(node) = self.nodes.get(key) else {
            return [None; 8];
        };
        let position = node.position;
        NEIGHBOUR_OFFSETS.map(|offset| self.node_at(position + offset))
    }

    /// Sets the passability of all nodes whose xz-coordinates lie within `[min - margin, max + margin]`.
    /// Returns the mutated nodes.
    pub fn set_passable(&mut self, min: Vec3, max: Vec3, margin: f32, passable: bool) -> Vec<NodeKey> {
        let aabb = Aabb3d::new(min, max);
        self.mutate_where(
            |position| aabb.contains_xz(position, margin),
            |node| node.passable = passable,
        )
    }

    /// Sets the cost of all nodes whose xz-coordinates lie within `[min - margin, max + margin]`.
    /// Returns the mutated nodes.
    pub fn set_weight(&mut self, min: Vec3, max: Vec3, margin: f32, weight: f32) -> Vec<NodeKey> {
        let aabb = Aabb3d::new(min, max);
        self.mutate_where(
            |position| aabb.contains_xz(position, margin),
            |node| node.cost = weight,
        )
    }

    /// Sets the passability of all nodes inside the [`OrientedBox`] spanned by the corners.
    /// Returns the mutated nodes.
    pub fn set_dynamic_passable(
        &mut self,
        p1: Vec3,
        p2: Vec3,
        p4: Vec3,
        p5: Vec3,
        passable: bool,
    ) -> Vec<NodeKey> {
        let volume = OrientedBox::new(p1, p2, p4, p5);
        self.mutate_where(
            |position| volume.contains(position),
            |node| node.passable = passable,
        )
    }

    /// Sets the cost of all nodes inside the [`OrientedBox`] spanned by the corners.
    /// Returns the mutated nodes.
    pub fn set_dynamic_weight(
        &mut self,
        p1: Vec3,
        p2: Vec3,
        p4: Vec3,
        p5: Vec3,
        weight: f32,
    ) -> Vec<NodeKey> {
        let volume = OrientedBox::new(p1, p2, p4, p5);
        self.mutate_where(
            |position| volume.contains(position),
            |node| node.cost = weight,
        )
    }

    /// Restores the default passability and cost of the given nodes.
    /// Keys that no longer exist are ignored.
    pub fn revert(&mut self, keys: &[NodeKey]) {
        for &key in keys {
            if let Some(node) = self.nodes.get_mut(key) {
                node.reset();
            }
        }
    }

    /// Binds a region affect to this navmesh.
    /// Returns `false` if it was already bound.
    pub fn register_affect(&mut self, id: AffectorId) -> bool {
        if self.affect_areas.contains(&id) {
            return false;
        }
        self.affect_areas.push(id);
        true
    }

    /// Unbinds a region affect.
    /// Returns `false` if it was not bound.
    pub fn unregister_affect(&mut self, id: AffectorId) -> bool {
        let before = self.affect_areas.len();
        self.affect_areas.retain(|&bound| bound != id);
        self.affect_areas.len() != before
    }

    /// The region affects bound to this navmesh.
    pub fn affect_areas(&self) -> &[AffectorId] {
        &self.affect_areas
    }

    /// Starts showing debug output for this navmesh.
    pub fn enable_debug(&mut self) {
        self.showing_debug = true;
    }

    /// Stops showing debug output for this navmesh.
    pub fn disable_debug(&mut self) {
        self.showing_debug = false;
    }

    /// Whether debug output is currently shown.
    pub fn is_showing_debug(&self) -> bool {
        self.showing_debug
    }

    #[inline]
    fn position_key(&self, position: Vec3) -> PositionKey {
        PositionKey::new(position, self.config.key_resolution)
    }

    fn mutate_where(
        &mut self,
        qualifies: impl Fn(Vec3) -> bool,
        mut mutate: impl FnMut(&mut Node),
    ) -> Vec<NodeKey> {
        self.nodes
            .iter_mut()
            .filter(|(_, node)| qualifies(node.position))
            .map(|(key, node)| {
                mutate(node);
                key
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::flat_grid;

    struct SlopedTerrain;

    impl TerrainSampler for SlopedTerrain {
        fn size(&self) -> Vec3 {
            Vec3::new(4.0, 10.0, 3.0)
        }

        fn sample_height(&self, x: f32, _z: f32) -> f32 {
            x
        }
    }

    #[test]
    fn terrain_generation_respects_height_bounds() {
        let mut navmesh = NodeNavmesh::default();
        let snapshot = navmesh.generate(GenerationSource::Terrain {
            sampler: &SlopedTerrain,
            min_height: 1.0,
            max_height: 2.0,
        });
        // x in {1, 2} for each of the 3 rows
        assert_eq!(navmesh.len(), 6);
        assert_eq!(snapshot.records.len(), 6);
        assert!(navmesh.node_at(Vec3::new(0.0, 0.0, 0.0)).is_none());
        let key = navmesh.node_at(Vec3::new(2.0, 2.0, 1.0)).unwrap();
        assert_eq!(navmesh.node(key).unwrap().cost, DEFAULT_NODE_COST);
    }

    #[test]
    fn mesh_generation_uses_unit_cost_and_skips_duplicates() {
        let mut navmesh = flat_grid(3, 3);
        let vertices = [Vec3::ZERO, Vec3::X, Vec3::ZERO];
        navmesh.generate(GenerationSource::Vertices(&vertices));
        assert_eq!(navmesh.len(), 2);
        assert!(
            navmesh
                .iter()
                .all(|(_, node)| node.cost == MESH_NODE_COST && node.passable)
        );
    }

    #[test]
    fn generation_snapshot_targets_node_file() {
        let mut navmesh = NodeNavmesh::new(NodeNavmeshConfig {
            id: 12,
            ..Default::default()
        });
        let snapshot = navmesh.generate(GenerationSource::Vertices(&[Vec3::ONE]));
        assert!(snapshot.path.ends_with("12_nodes.nav"));
    }

    #[test]
    fn clear_disables_debug() {
        let mut navmesh = flat_grid(2, 2);
        navmesh.enable_debug();
        assert!(navmesh.is_showing_debug());
        navmesh.clear();
        assert!(navmesh.is_empty());
        assert!(!navmesh.is_showing_debug());
        assert!(navmesh.node_at(Vec3::ZERO).is_none());
    }

    #[test]
    fn closest_node_on_empty_navmesh_is_none() {
        assert!(NodeNavmesh::default().closest_node(Vec3::ZERO).is_none());
    }

    #[test]
    fn closest_node_minimizes_distance() {
        let navmesh = flat_grid(5, 5);
        let key = navmesh.closest_node(Vec3::new(3.2, 4.0, 0.9)).unwrap();
        assert_eq!(navmesh.node(key).unwrap().position, Vec3::new(3.0, 0.0, 1.0));
    }

    #[test]
    fn neighbours_follow_slot_order() {
        let navmesh = flat_grid(3, 3);
        let center = navmesh.node_at(Vec3::new(1.0, 0.0, 1.0)).unwrap();
        let neighbours = navmesh.neighbours(center);
        for (slot, offset) in neighbours.iter().zip(NEIGHBOUR_OFFSETS) {
            let node = navmesh.node(slot.unwrap()).unwrap();
            assert_eq!(node.position, Vec3::new(1.0, 0.0, 1.0) + offset);
        }
    }

    #[test]
    fn missing_neighbours_are_absent() {
        let navmesh = flat_grid(2, 2);
        let corner = navmesh.node_at(Vec3::ZERO).unwrap();
        let neighbours = navmesh.neighbours(corner);
        // (0,0,1), (1,0,0) and (1,0,1) exist
        assert_eq!(neighbours.iter().flatten().count(), 3);
        assert!(neighbours[0].is_none());
        assert!(neighbours[1].is_some());
        assert!(neighbours[2].is_some());
        assert!(neighbours[4].is_some());
        assert!(neighbours[6].is_none());
    }

    #[test]
    fn set_passable_uses_margin_on_xz_only() {
        let mut navmesh = NodeNavmesh::default();
        let inside = navmesh.insert(Node::from(Vec3::new(-0.5, 50.0, 5.0)));
        let outside = navmesh.insert(Node::from(Vec3::new(-1.5, 0.0, 5.0)));
        let mutated =
            navmesh.set_passable(Vec3::ZERO, Vec3::new(10.0, 0.0, 10.0), 1.0, false);
        assert_eq!(mutated, vec![inside]);
        assert!(!navmesh.node(inside).unwrap().passable);
        assert!(navmesh.node(outside).unwrap().passable);
    }

    #[test]
    fn set_weight_reports_mutated_nodes() {
        let mut navmesh = flat_grid(4, 4);
        let mutated = navmesh.set_weight(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0), 0.0, 7.0);
        assert_eq!(mutated.len(), 4);
        for key in mutated {
            assert_eq!(navmesh.node(key).unwrap().cost, 7.0);
        }
    }

    #[test]
    fn dynamic_mutation_selects_oriented_box() {
        let mut navmesh = NodeNavmesh::default();
        let inside = navmesh.insert(Node::from(Vec3::new(2.0, 1.0, 2.0)));
        let outside = navmesh.insert(Node::from(Vec3::new(5.0, 0.0, 2.0)));
        let (p1, p2, p4, p5) = (
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        );
        assert_eq!(navmesh.set_dynamic_passable(p1, p2, p4, p5, false), vec![inside]);
        assert_eq!(navmesh.set_dynamic_weight(p1, p2, p4, p5, 3.0), vec![inside]);
        assert!(!navmesh.node(inside).unwrap().passable);
        assert_eq!(navmesh.node(inside).unwrap().cost, 3.0);
        assert_eq!(*navmesh.node(outside).unwrap(), Node::from(Vec3::new(5.0, 0.0, 2.0)));
    }

    #[test]
    fn mutations_on_empty_navmesh_are_empty() {
        let mut navmesh = NodeNavmesh::default();
        assert!(navmesh.set_passable(Vec3::ZERO, Vec3::ONE, 1.0, false).is_empty());
        assert!(
            navmesh
                .set_dynamic_weight(Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z, 1.0)
                .is_empty()
        );
    }

    #[test]
    fn affect_registration_happens_once() {
        let mut navmesh = NodeNavmesh::default();
        assert!(navmesh.register_affect(AffectorId(3)));
        assert!(!navmesh.register_affect(AffectorId(3)));
        assert_eq!(navmesh.affect_areas(), &[AffectorId(3)]);
        assert!(navmesh.unregister_affect(AffectorId(3)));
        assert!(!navmesh.unregister_affect(AffectorId(3)));
    }

    #[test]
    fn save_then_load_round_trips_positions_and_costs() {
        let data_dir = std::env::temp_dir().join(format!(
            "gridnav_round_trip_{}",
            std::process::id()
        ));
        let config = NodeNavmeshConfig {
            id: 4,
            data_dir: data_dir.clone(),
            ..Default::default()
        };
        let mut navmesh = NodeNavmesh::new(config.clone());
        navmesh.insert(Node::new(Vec3::new(1.0, 2.5, 3.0), 100.0));
        navmesh.insert(Node::new(Vec3::new(-4.0, 0.0, 8.0), 12.5));
        let blocked = navmesh.insert(Node::new(Vec3::new(0.0, 0.0, 0.0), 1.0));
        navmesh.node_mut(blocked).unwrap().passable = false;
        navmesh.save().unwrap();

        let mut loaded = NodeNavmesh::new(config);
        assert_eq!(loaded.load().unwrap(), 3);
        let mut expected: Vec<_> = navmesh
            .iter()
            .map(|(_, node)| (node.position.to_array(), node.cost))
            .collect();
        let mut actual: Vec<_> = loaded
            .iter()
            .map(|(_, node)| (node.position.to_array(), node.cost))
            .collect();
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        actual.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(expected, actual);
        // passability is not persisted
        assert!(loaded.iter().all(|(_, node)| node.passable));

        std::fs::remove_dir_all(data_dir).unwrap();
    }

    #[test]
    fn load_without_file_leaves_navmesh_empty() {
        let mut navmesh = NodeNavmesh::new(NodeNavmeshConfig {
            id: 99,
            data_dir: std::env::temp_dir().join("gridnav_no_such_dir"),
            ..Default::default()
        });
        navmesh.insert(Node::from(Vec3::ZERO));
        assert_eq!(navmesh.load().unwrap(), 0);
        assert!(navmesh.is_empty());
    }
}
