use std::collections::HashMap;

use bevy_derive::{Deref, DerefMut};
use serde::Serialize;

use crate::{isec::IsecMap, Coordinate};

/// A named point that geometry lines may use instead of literal coordinates.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Waypoint {
    pub designator: String,
    pub coordinate: Coordinate,
}

/// Waypoints known so far in the current pass.
///
/// Lookups only see waypoints declared on earlier lines (or seeded before the
/// pass), a name used before its declaration does not resolve.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deref, DerefMut)]
pub struct WaypointRegistry(pub HashMap<String, Waypoint>);

impl WaypointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, waypoint: Waypoint) {
        self.0.insert(waypoint.designator.clone(), waypoint);
    }

    pub fn resolve(&self, designator: &str) -> Option<&Waypoint> {
        self.0.get(designator)
    }
}

impl FromIterator<Waypoint> for WaypointRegistry {
    fn from_iter<T: IntoIterator<Item = Waypoint>>(iter: T) -> Self {
        let mut registry = Self::new();
        for waypoint in iter {
            registry.register(waypoint);
        }
        registry
    }
}

impl From<&IsecMap> for WaypointRegistry {
    fn from(isec: &IsecMap) -> Self {
        isec.iter_all()
            .flat_map(|(_, waypoints)| waypoints.iter().cloned())
            .collect()
    }
}
