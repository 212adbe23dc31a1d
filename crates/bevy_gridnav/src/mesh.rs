use bevy_mesh::Mesh;
use glam::Vec3;

use crate::navmesh::NavmeshVertices;

/// Used to add [`NodeVerticesFromBevyMesh::from_mesh`] to [`NavmeshVertices`].
pub trait NodeVerticesFromBevyMesh: Sized {
    /// Collects the vertex positions of a [`Mesh`]. Returns `None` if the mesh has no
    /// `f32x3` position attribute.
    fn from_mesh(mesh: &Mesh) -> Option<Self>;
}

impl NodeVerticesFromBevyMesh for NavmeshVertices {
    fn from_mesh(mesh: &Mesh) -> Option<Self> {
        let positions = mesh.attribute(Mesh::ATTRIBUTE_POSITION)?.as_float3()?;
        Some(Self(positions.iter().map(|&v| Vec3::from(v)).collect()))
    }
}

#[cfg(test)]
mod tests {
    use bevy_asset::prelude::*;
    use bevy_mesh::{Mesh, PrimitiveTopology};
    use bevy_render::{prelude::*, render_asset::RenderAssetUsages};

    use super::*;
    use crate::{
        navmesh::{GenerateNodes, Navmesh},
        test_support::{app, config},
    };

    fn quad() -> Mesh {
        Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        )
        .with_inserted_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0],
            ],
        )
    }

    #[test]
    fn collects_mesh_positions() {
        let vertices = NavmeshVertices::from_mesh(&quad()).unwrap();
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[2], Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn mesh_without_positions_has_no_vertices() {
        let mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        assert!(NavmeshVertices::from_mesh(&mesh).is_none());
    }

    #[test]
    fn generates_nodes_from_mesh3d() {
        let mut app = app();
        app.init_resource::<Assets<Mesh>>();
        let handle = app.world_mut().resource_mut::<Assets<Mesh>>().add(quad());
        let navmesh = app
            .world_mut()
            .spawn((Navmesh::new(config("mesh3d")), Mesh3d(handle)))
            .id();
        app.world_mut().trigger_targets(GenerateNodes, navmesh);

        let navmesh = app.world().get::<Navmesh>(navmesh).unwrap();
        assert_eq!(navmesh.len(), 4);
        assert!(navmesh.node_at(Vec3::new(0.0, 0.0, 1.0)).is_some());
    }
}
