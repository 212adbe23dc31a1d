//! Agents that walk their [`Transform`] along paths searched on a [`Navmesh`].

use std::fmt;

use bevy_app::prelude::*;
use bevy_derive::{Deref, DerefMut};
use bevy_ecs::prelude::*;
use bevy_time::Time;
use bevy_transform::prelude::*;
use glam::Vec3;
use gridnav::{ArriveCallback, NavigatorEvent, NavigatorSettings};
use thiserror::Error;
use tracing::warn;

use crate::{GridnavSystems, navmesh::Navmesh};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Update, follow_paths.in_set(GridnavSystems::Navigation));
    app.add_observer(start_travel);
}

/// Moves the entity's [`Transform`] along paths requested with [`GoTo`].
#[derive(Component, Debug, Default, Deref, DerefMut)]
#[require(Transform)]
pub struct Navigator {
    /// The entity holding the [`Navmesh`] paths are searched on.
    pub navmesh: Option<Entity>,
    #[deref]
    state: gridnav::Navigator,
}

impl Navigator {
    /// Creates an idle navigator searching paths on the navmesh on `navmesh`.
    pub fn new(navmesh: Entity) -> Self {
        Self {
            navmesh: Some(navmesh),
            state: gridnav::Navigator::default(),
        }
    }

    /// Replaces the movement settings.
    pub fn with_settings(mut self, settings: NavigatorSettings) -> Self {
        self.state.settings = settings;
        self
    }
}

/// Sends the targeted [`Navigator`] toward `destination`, replacing its current path.
#[derive(Event)]
pub struct GoTo {
    /// Where to go. The path ends at the node closest to this point.
    pub destination: Vec3,
    on_arrive: Option<ArriveCallback>,
}

impl fmt::Debug for GoTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoTo")
            .field("destination", &self.destination)
            .field("on_arrive", &self.on_arrive.is_some())
            .finish()
    }
}

impl GoTo {
    /// Creates a request to travel to `destination`.
    pub fn new(destination: Vec3) -> Self {
        Self {
            destination,
            on_arrive: None,
        }
    }

    /// Runs `on_arrive` once the navigator reaches the end of this path. It is dropped without
    /// running if another [`GoTo`] replaces the path first.
    pub fn on_arrive(mut self, on_arrive: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_arrive = Some(Box::new(on_arrive));
        self
    }
}

/// Triggered on a [`Navigator`] entity when it reaches the end of its path.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrived;

/// Errors returned by the [`GoTo`] observer.
#[derive(Debug, Error)]
pub enum NavigatorError {
    /// The event targeted an entity without a [`Navigator`].
    #[error("Entity {0} has no `Navigator` component")]
    MissingNavigator(Entity),
}

fn start_travel(
    mut trigger: Trigger<GoTo>,
    mut navigators: Query<(&mut Navigator, &Transform)>,
    navmeshes: Query<&Navmesh>,
) -> Result {
    let entity = trigger.target();
    let on_arrive = trigger.event_mut().on_arrive.take();
    let destination = trigger.event().destination;
    let Ok((mut navigator, transform)) = navigators.get_mut(entity) else {
        return Err(NavigatorError::MissingNavigator(entity).into());
    };
    let Some(navmesh) = navigator
        .navmesh
        .and_then(|navmesh| navmeshes.get(navmesh).ok())
    else {
        warn!("Navigator {entity} has no navmesh to search, ignoring `GoTo`");
        return Ok(());
    };
    navigator.go_to(navmesh, transform.translation, destination, on_arrive);
    Ok(())
}

fn follow_paths(
    time: Res<Time>,
    mut navigators: Query<(Entity, &mut Navigator, &mut Transform)>,
    mut commands: Commands,
) {
    let delta = time.delta_secs();
    for (entity, mut navigator, mut transform) in &mut navigators {
        if !navigator.is_traveling() {
            continue;
        }
        if navigator.update(&mut transform.translation, delta) == NavigatorEvent::Arrived {
            commands.trigger_targets(Arrived, entity);
        }
    }
}
