#![doc = include_str!("../../../readme.md")]

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;

pub mod affect;
#[cfg(feature = "bevy_mesh")]
mod mesh;
pub mod navigator;
pub mod navmesh;

#[cfg(feature = "bevy_mesh")]
pub use mesh::NodeVerticesFromBevyMesh;

pub use gridnav;

/// Everything needed to drive navigation from a Bevy app.
pub mod prelude {
    pub use crate::{
        GridnavPlugin, GridnavSystems,
        affect::{AffectVolume, RegionAffect},
        navigator::{Arrived, GoTo, Navigator},
        navmesh::{
            GenerateNodes, HeightmapTerrain, LoadNodes, Navmesh, NavmeshHeightBounds,
            NavmeshVertices,
        },
    };
    pub use gridnav::{AffectType, NavigatorSettings, NodeNavmeshConfig};
}

/// The main plugin of the crate. Adds observers for generating and loading nodes, keeps region
/// affects applied to their navmesh, and moves navigators along their paths.
///
/// Navigators advance by [`Time`](bevy_time::Time), so the app needs `TimePlugin` (part of both
/// `DefaultPlugins` and `MinimalPlugins`) or a manually advanced `Time` resource.
#[non_exhaustive]
#[derive(Default)]
pub struct GridnavPlugin;

impl Plugin for GridnavPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (GridnavSystems::Affects, GridnavSystems::Navigation).chain(),
        );
        app.add_plugins((navmesh::plugin, affect::plugin, navigator::plugin));
    }
}

/// System sets run by [`GridnavPlugin`] in [`Update`], in this order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridnavSystems {
    /// Binds region affects to their navmesh and re-applies the ones that moved.
    Affects,
    /// Advances navigators along their paths.
    Navigation,
}
