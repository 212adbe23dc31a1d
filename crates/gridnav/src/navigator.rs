//! Drives an agent along a path produced by [`find_path`].

use std::{collections::VecDeque, fmt};

use glam::Vec3;
use tracing::debug;

use crate::{
    config::NavigatorSettings,
    navmesh::NodeNavmesh,
    path::{Path, find_path},
};

/// Invoked once when a [`Navigator`] runs out of waypoints.
pub type ArriveCallback = Box<dyn FnOnce() + Send + Sync>;

/// What happened during a [`Navigator::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigatorEvent {
    /// The navigator is not traveling.
    Idle,
    /// The agent is on its way.
    Traveling,
    /// The last waypoint was reached during this update.
    Arrived,
}

/// Path-following state machine for a single agent.
pub struct Navigator {
    /// Movement settings.
    pub settings: NavigatorSettings,
    path_queue: VecDeque<Vec3>,
    current_target: Option<Vec3>,
    reached_current: bool,
    traveling: bool,
    on_arrive: Option<ArriveCallback>,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("settings", &self.settings)
            .field("path_queue", &self.path_queue)
            .field("current_target", &self.current_target)
            .field("reached_current", &self.reached_current)
            .field("traveling", &self.traveling)
            .field("on_arrive", &self.on_arrive.is_some())
            .finish()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(NavigatorSettings::default())
    }
}

impl Navigator {
    /// Creates an idle navigator.
    pub fn new(settings: NavigatorSettings) -> Self {
        Self {
            settings,
            path_queue: VecDeque::new(),
            current_target: None,
            reached_current: true,
            traveling: false,
            on_arrive: None,
        }
    }

    /// Searches a path from `from` to `destination` and starts traveling along it.
    ///
    /// Replaces any path and callback from a previous call. The search result is returned so
    /// callers can tell whether the path reaches the destination's node; an empty navmesh yields
    /// `None` and the navigator arrives on its next update without moving.
    pub fn go_to(
        &mut self,
        navmesh: &NodeNavmesh,
        from: Vec3,
        destination: Vec3,
        on_arrive: Option<ArriveCallback>,
    ) -> Option<Path> {
        let path = find_path(navmesh, from, destination);
        self.path_queue = path
            .iter()
            .flat_map(|path| &path.waypoints)
            .filter_map(|&key| navmesh.node(key))
            .map(|node| node.position)
            .collect();
        if let Some(path) = &path {
            if !path.complete {
                debug!(
                    "Path toward {destination} stops short after {} waypoints",
                    path.waypoints.len()
                );
            }
        }
        self.current_target = None;
        self.reached_current = true;
        self.on_arrive = on_arrive;
        self.traveling = true;
        path
    }

    /// Stops following the current path without invoking the arrive callback.
    pub fn stop(&mut self) {
        self.path_queue.clear();
        self.current_target = None;
        self.reached_current = true;
        self.traveling = false;
        self.on_arrive = None;
    }

    /// Whether the navigator is following a path.
    pub fn is_traveling(&self) -> bool {
        self.traveling
    }

    /// The waypoint the agent is currently heading to.
    pub fn current_target(&self) -> Option<Vec3> {
        self.current_target
    }

    /// The waypoints after the current one.
    pub fn remaining_waypoints(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.path_queue.iter().copied()
    }

    /// Advances the agent at `position` by `delta_secs` seconds of travel.
    pub fn update(&mut self, position: &mut Vec3, delta_secs: f32) -> NavigatorEvent {
        if !self.traveling {
            return NavigatorEvent::Idle;
        }

        if self.reached_current {
            match self.path_queue.pop_front() {
                Some(next) => {
                    self.current_target = Some(next);
                    self.reached_current = false;
                }
                None => {
                    self.current_target = None;
                    self.traveling = false;
                    if let Some(on_arrive) = self.on_arrive.take() {
                        on_arrive();
                    }
                    return NavigatorEvent::Arrived;
                }
            }
        }

        if let Some(target) = self.current_target {
            *position = position.move_towards(target, self.settings.speed * delta_secs);
            if position.distance(target) <= self.settings.next_node_distance_radius {
                self.reached_current = true;
            }
        }
        NavigatorEvent::Traveling
    }
}
