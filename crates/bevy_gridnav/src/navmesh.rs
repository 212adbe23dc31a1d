//! The [`Navmesh`] component and the events that fill it with nodes.

use anyhow::Context as _;
use bevy_app::prelude::*;
use bevy_derive::{Deref, DerefMut};
use bevy_ecs::{prelude::*, system::SystemParam};
use bevy_reflect::Reflect;
use bevy_tasks::{IoTaskPool, TaskPool};
use bevy_transform::prelude::*;
use glam::{UVec2, Vec3};
use gridnav::{GenerationSource, NodeNavmesh, NodeNavmeshConfig, NodeSnapshot, TerrainSampler};
use thiserror::Error;
use tracing::{error, info};

#[cfg(feature = "bevy_mesh")]
use {
    crate::mesh::NodeVerticesFromBevyMesh as _, bevy_asset::prelude::*, bevy_mesh::Mesh,
    bevy_render::prelude::*,
};

use crate::affect::RegionAffect;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<HeightmapTerrain>()
        .register_type::<NavmeshHeightBounds>()
        .register_type::<NavmeshVertices>();
    app.add_observer(generate_nodes).add_observer(load_nodes);
}

/// A navigation graph living on an entity.
///
/// Fill it by triggering [`GenerateNodes`] or [`LoadNodes`] on the entity.
#[derive(Component, Debug, Clone, Default, Deref, DerefMut)]
pub struct Navmesh(pub NodeNavmesh);

impl Navmesh {
    /// Creates an empty navmesh with the given config.
    pub fn new(config: NodeNavmeshConfig) -> Self {
        Self(NodeNavmesh::new(config))
    }
}

/// A grid of terrain heights that [`GenerateNodes`] places one node per cell on.
///
/// Cell `(x, z)` sits at world position `(x, height, z)`.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
pub struct HeightmapTerrain {
    /// The number of cells along x and z.
    pub size: UVec2,
    /// Row-major heights, `size.x` per row, one row per z.
    pub heights: Vec<f32>,
}

impl HeightmapTerrain {
    /// Creates a terrain where every cell has the same height.
    pub fn flat(size: UVec2, height: f32) -> Self {
        Self {
            size,
            heights: vec![height; size.x as usize * size.y as usize],
        }
    }

    /// Creates a terrain by evaluating `height` for every `(x, z)` cell.
    pub fn from_fn(size: UVec2, mut height: impl FnMut(u32, u32) -> f32) -> Self {
        let heights = (0..size.y)
            .flat_map(|z| (0..size.x).map(move |x| (x, z)))
            .map(|(x, z)| height(x, z))
            .collect();
        Self { size, heights }
    }

    /// The height of cell `(x, z)`, if it is on the terrain.
    pub fn height(&self, x: u32, z: u32) -> Option<f32> {
        if x >= self.size.x || z >= self.size.y {
            return None;
        }
        self.heights
            .get(z as usize * self.size.x as usize + x as usize)
            .copied()
    }
}

impl TerrainSampler for HeightmapTerrain {
    fn size(&self) -> Vec3 {
        let max_height = self.heights.iter().copied().fold(0.0, f32::max);
        Vec3::new(self.size.x as f32, max_height, self.size.y as f32)
    }

    fn sample_height(&self, x: f32, z: f32) -> f32 {
        if x < 0.0 || z < 0.0 {
            return f32::NAN;
        }
        self.height(x as u32, z as u32).unwrap_or(f32::NAN)
    }
}

/// Terrain cells outside of these heights get no node. Unbounded by default.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
pub struct NavmeshHeightBounds {
    /// The lowest walkable height. `[Units: wu]`
    pub min: f32,
    /// The highest walkable height. `[Units: wu]`
    pub max: f32,
}

impl Default for NavmeshHeightBounds {
    fn default() -> Self {
        Self {
            min: f32::MIN,
            max: f32::MAX,
        }
    }
}

/// Vertices that [`GenerateNodes`] places one node each on, in the entity's local space.
///
/// Only used when the entity has no [`HeightmapTerrain`]. With the `bevy_mesh` feature, an entity's
/// [`Mesh3d`](bevy_render::prelude::Mesh3d) is used instead when this component is missing.
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect, Deref, DerefMut)]
pub struct NavmeshVertices(pub Vec<Vec3>);

/// Regenerates the nodes of the targeted [`Navmesh`] and saves them in the background.
///
/// Nodes come from the entity's [`HeightmapTerrain`], clamped by its [`NavmeshHeightBounds`], or
/// from its [`NavmeshVertices`] or mesh otherwise.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct GenerateNodes;

/// Replaces the nodes of the targeted [`Navmesh`] with the ones stored in its node file.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct LoadNodes;

/// Errors returned by the [`GenerateNodes`] and [`LoadNodes`] observers.
#[derive(Debug, Error)]
pub enum NavmeshEventError {
    /// The event targeted an entity without a [`Navmesh`].
    #[error("Entity {0} has no `Navmesh` component")]
    MissingNavmesh(Entity),
    /// The entity has nothing to generate nodes from.
    #[error("Entity {0} has neither a `HeightmapTerrain` nor vertices to generate nodes from")]
    MissingSource(Entity),
}

fn generate_nodes(
    trigger: Trigger<GenerateNodes>,
    mut navmeshes: Query<(
        &mut Navmesh,
        Option<&HeightmapTerrain>,
        Option<&NavmeshHeightBounds>,
    )>,
    mut affects: Query<&mut RegionAffect>,
    vertex_sources: VertexSources,
) -> Result {
    let entity = trigger.target();
    let Ok((mut navmesh, terrain, bounds)) = navmeshes.get_mut(entity) else {
        return Err(NavmeshEventError::MissingNavmesh(entity).into());
    };

    let vertices;
    let source = if let Some(terrain) = terrain {
        let bounds = bounds.copied().unwrap_or_default();
        GenerationSource::Terrain {
            sampler: terrain,
            min_height: bounds.min,
            max_height: bounds.max,
        }
    } else if let Some(found) = vertex_sources.vertices(entity) {
        vertices = found;
        GenerationSource::Vertices(&vertices)
    } else {
        return Err(NavmeshEventError::MissingSource(entity).into());
    };

    forget_bound_affects(entity, &mut navmesh, &mut affects);
    let snapshot = navmesh.generate(source);
    save_in_background(snapshot);
    Ok(())
}

fn load_nodes(
    trigger: Trigger<LoadNodes>,
    mut navmeshes: Query<&mut Navmesh>,
    mut affects: Query<&mut RegionAffect>,
) -> Result {
    let entity = trigger.target();
    let Ok(mut navmesh) = navmeshes.get_mut(entity) else {
        return Err(NavmeshEventError::MissingNavmesh(entity).into());
    };
    forget_bound_affects(entity, &mut navmesh, &mut affects);
    navmesh.load()?;
    Ok(())
}

/// Makes every affect bound to the navmesh re-apply itself once the new nodes are in place.
fn forget_bound_affects(
    navmesh_entity: Entity,
    navmesh: &mut NodeNavmesh,
    affects: &mut Query<&mut RegionAffect>,
) {
    for mut affect in affects.iter_mut() {
        if affect.bound_navmesh() == Some(navmesh_entity) {
            affect.revert(navmesh);
        }
    }
}

/// Writes a node snapshot to its file on the calling thread.
pub fn save_nodes(snapshot: &NodeSnapshot) -> anyhow::Result<()> {
    snapshot.save().with_context(|| {
        format!(
            "Failed to save navmesh nodes to {}",
            snapshot.path.display()
        )
    })?;
    info!(
        "Saved {} navmesh nodes to {}",
        snapshot.records.len(),
        snapshot.path.display()
    );
    Ok(())
}

/// Saves a node snapshot on the [`IoTaskPool`] without waiting for it.
fn save_in_background(snapshot: NodeSnapshot) {
    IoTaskPool::get_or_init(TaskPool::new)
        .spawn(async move {
            if let Err(err) = save_nodes(&snapshot) {
                error!("{err:?}");
            }
        })
        .detach();
}

/// Looks up the vertices a navmesh entity generates mesh nodes from, in world space.
#[derive(SystemParam)]
struct VertexSources<'w, 's> {
    transforms: Query<'w, 's, &'static GlobalTransform>,
    vertices: Query<'w, 's, &'static NavmeshVertices>,
    #[cfg(feature = "bevy_mesh")]
    meshes: Option<Res<'w, Assets<Mesh>>>,
    #[cfg(feature = "bevy_mesh")]
    mesh_handles: Query<'w, 's, &'static Mesh3d>,
}

impl VertexSources<'_, '_> {
    fn vertices(&self, entity: Entity) -> Option<Vec<Vec3>> {
        let transform = self.transforms.get(entity).copied().unwrap_or_default();
        let to_world = |local: &[Vec3]| {
            local
                .iter()
                .map(|&vertex| transform.transform_point(vertex))
                .collect::<Vec<_>>()
        };

        if let Ok(vertices) = self.vertices.get(entity) {
            return Some(to_world(vertices));
        }

        #[cfg(feature = "bevy_mesh")]
        if let (Ok(handle), Some(meshes)) = (self.mesh_handles.get(entity), &self.meshes) {
            let vertices = NavmeshVertices::from_mesh(meshes.get(handle)?)?;
            return Some(to_world(&vertices));
        }

        None
    }
}
