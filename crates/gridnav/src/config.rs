use std::path::PathBuf;

#[cfg(feature = "bevy_reflect")]
use bevy_reflect::prelude::*;

/// Specifies how a [`NodeNavmesh`](crate::NodeNavmesh) is identified, persisted and searched.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
#[cfg_attr(
    all(feature = "serialize", feature = "bevy_reflect"),
    reflect(Serialize, Deserialize)
)]
pub struct NodeNavmeshConfig {
    /// The ID of the navmesh. Node files are named `<id>_nodes.nav`.
    pub id: i32,

    /// How strongly the distance to the target outweighs node costs during path search. `[Limit: >= 0]`
    ///
    /// A neighbour's score is `distance_to_target * distance_weight + cost`, so with the default
    /// of 500 a single world unit of progress is worth five default node costs.
    pub distance_weight: f32,

    /// The grid resolution node positions are snapped to for lookups. `[Limit: > 0] [Units: wu]`
    ///
    /// Two positions closer than this are treated as the same node.
    pub key_resolution: f32,

    /// The directory node files are written to and read from.
    pub data_dir: PathBuf,
}

impl Default for NodeNavmeshConfig {
    fn default() -> Self {
        Self {
            id: 0,
            distance_weight: 500.0,
            key_resolution: 1.0 / 1024.0,
            data_dir: PathBuf::from("game_data"),
        }
    }
}

impl NodeNavmeshConfig {
    /// The path of the node file for this navmesh.
    pub fn node_file_path(&self) -> PathBuf {
        self.data_dir.join(crate::persistence::node_file_name(self.id))
    }
}

/// Movement settings of a [`Navigator`](crate::Navigator).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bevy_reflect", derive(Reflect))]
pub struct NavigatorSettings {
    /// How close the agent must get to a waypoint before moving on to the next one. `[Units: wu]`
    pub next_node_distance_radius: f32,
    /// The travel speed of the agent. `[Units: wu/s]`
    pub speed: f32,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            next_node_distance_radius: 0.2,
            speed: 2.0,
        }
    }
}
