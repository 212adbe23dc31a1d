//! Region affects as components: box volumes that follow their entity's [`GlobalTransform`] and
//! keep the nodes they cover blocked or re-weighted.

use bevy_app::prelude::*;
use bevy_derive::{Deref, DerefMut};
use bevy_ecs::prelude::*;
use bevy_reflect::Reflect;
use bevy_transform::prelude::*;
use glam::Vec3;
use gridnav::{AffectType, AffectorId, AffectorPose};
use tracing::debug;

use crate::{GridnavSystems, navmesh::Navmesh};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<AffectVolume>();
    app.add_systems(
        Update,
        (bind_region_affects, reconcile_region_affects)
            .chain()
            .in_set(GridnavSystems::Affects),
    );
    app.add_observer(unbind_removed_affect);
}

/// Blocks or re-weights the nodes of a [`Navmesh`] covered by the entity's [`AffectVolume`].
///
/// The affect binds to the entity in [`RegionAffect::navmesh`] once that entity holds a
/// [`Navmesh`], and from then on re-applies itself whenever it moves. Removing the component
/// restores the nodes it mutated.
#[derive(Component, Debug, Clone, Deref, DerefMut)]
#[require(AffectVolume, Transform)]
pub struct RegionAffect {
    /// The entity holding the [`Navmesh`] to affect.
    pub navmesh: Option<Entity>,
    #[deref]
    state: gridnav::RegionAffect,
    bound_to: Option<Entity>,
}

impl RegionAffect {
    /// Creates an affect of the given type for the navmesh on `navmesh`.
    pub fn new(navmesh: Entity, affect_type: AffectType) -> Self {
        Self {
            navmesh: Some(navmesh),
            state: gridnav::RegionAffect::new(affect_type),
            bound_to: None,
        }
    }

    /// Sets the margin applied by the axis-aligned affect types.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.state.margin = margin;
        self
    }

    /// Sets the cost applied by the cost-setting affect types.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.state.set_weight = weight;
        self
    }

    /// The navmesh entity this affect is registered with, if any.
    pub fn bound_navmesh(&self) -> Option<Entity> {
        self.bound_to
    }
}

/// The box a [`RegionAffect`] covers, in the entity's local space.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
pub struct AffectVolume {
    /// The center of the box. `[Units: wu]`
    pub center: Vec3,
    /// The full extents of the box. `[Units: wu]`
    pub size: Vec3,
}

impl Default for AffectVolume {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            size: Vec3::ONE,
        }
    }
}

impl AffectVolume {
    /// A box of the given size centered on the entity.
    pub fn from_size(size: Vec3) -> Self {
        Self {
            center: Vec3::ZERO,
            size,
        }
    }
}

fn affector_id(entity: Entity) -> AffectorId {
    AffectorId(entity.to_bits())
}

fn bind_region_affects(
    mut affects: Query<(Entity, &mut RegionAffect)>,
    mut navmeshes: Query<&mut Navmesh>,
) {
    for (entity, mut affect) in &mut affects {
        if affect.bound_to == affect.navmesh {
            continue;
        }
        let affect = &mut *affect;
        let id = affector_id(entity);

        if let Some(previous) = affect.bound_to.take() {
            if let Ok(mut navmesh) = navmeshes.get_mut(previous) {
                affect.state.revert(&mut navmesh);
                navmesh.unregister_affect(id);
            } else {
                affect.state.forget();
            }
            debug!("Unbound region affect {entity} from navmesh {previous}");
        }

        let Some(target) = affect.navmesh else {
            continue;
        };
        // Not a navmesh yet, try again next frame.
        let Ok(mut navmesh) = navmeshes.get_mut(target) else {
            continue;
        };
        if navmesh.register_affect(id) {
            debug!("Bound region affect {entity} to navmesh {target}");
        }
        affect.bound_to = Some(target);
    }
}

fn reconcile_region_affects(
    mut affects: Query<(&mut RegionAffect, &AffectVolume, &GlobalTransform)>,
    mut navmeshes: Query<&mut Navmesh>,
) {
    for (mut affect, volume, transform) in &mut affects {
        let Some(navmesh_entity) = affect.bound_to else {
            continue;
        };
        let Ok(mut navmesh) = navmeshes.get_mut(navmesh_entity) else {
            continue;
        };
        let pose = AffectorPose::from_box(transform.affine(), volume.center, volume.size);
        let applied = affect
            .bypass_change_detection()
            .state
            .reconcile(&mut navmesh.bypass_change_detection().0, &pose);
        if applied {
            affect.set_changed();
            navmesh.set_changed();
        }
    }
}

fn unbind_removed_affect(
    trigger: Trigger<OnRemove, RegionAffect>,
    mut affects: Query<&mut RegionAffect>,
    mut navmeshes: Query<&mut Navmesh>,
) {
    let entity = trigger.target();
    let Ok(mut affect) = affects.get_mut(entity) else {
        return;
    };
    let Some(navmesh_entity) = affect.bound_to.take() else {
        return;
    };
    let Ok(mut navmesh) = navmeshes.get_mut(navmesh_entity) else {
        affect.state.forget();
        return;
    };
    affect.state.revert(&mut navmesh);
    navmesh.unregister_affect(affector_id(entity));
}
