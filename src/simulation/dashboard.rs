//! Read-only views of the world for dashboards and frame consumers

use std::collections::BTreeMap;

use serde::Serialize;

use super::analytics::Analytics;
use super::signal::{LightState, SignalState, TrafficLight};
use super::types::{Direction, Orientation, Position, VehicleCategory};
use super::vehicle::SimVehicle;

/// Vehicles either side of the vertical centre line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SideCounts {
    pub left: usize,
    pub right: usize,
}

/// Per-category, per-side vehicle counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VehicleCounts(pub BTreeMap<VehicleCategory, SideCounts>);

impl VehicleCounts {
    pub fn count(vehicles: &[SimVehicle], center: &Position) -> Self {
        let mut counts: BTreeMap<VehicleCategory, SideCounts> = VehicleCategory::ALL
            .iter()
            .map(|category| (*category, SideCounts::default()))
            .collect();
        for vehicle in vehicles {
            let side = counts.entry(vehicle.category).or_default();
            if vehicle.position.x < center.x {
                side.left += 1;
            } else {
                side.right += 1;
            }
        }
        Self(counts)
    }

    pub fn get(&self, category: VehicleCategory) -> SideCounts {
        self.0.get(&category).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.0.values().map(|side| side.left + side.right).sum()
    }
}

/// Vehicles per approach, named by where they are heading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApproachCounts {
    pub north: usize,
    pub south: usize,
    pub east: usize,
    pub west: usize,
}

impl ApproachCounts {
    pub fn count(vehicles: &[SimVehicle]) -> Self {
        let mut counts = Self::default();
        for vehicle in vehicles {
            match vehicle.direction {
                Direction::Up => counts.north += 1,
                Direction::Down => counts.south += 1,
                Direction::Right => counts.east += 1,
                Direction::Left => counts.west += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightStatus {
    pub direction: Orientation,
    pub state: LightState,
    pub time_to_change: u64,
    pub position: &'static str,
}

impl From<&TrafficLight> for LightStatus {
    fn from(light: &TrafficLight) -> Self {
        Self {
            direction: light.orientation,
            state: light.state,
            time_to_change: light.time_to_change.max(0.0) as u64,
            position: match light.orientation {
                Orientation::Vertical => "N/S",
                Orientation::Horizontal => "E/W",
            },
        }
    }
}

/// Everything a dashboard polls, copied out of the world at query time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub tick: u64,
    pub time: f64,
    pub traffic_stats: VehicleCounts,
    pub current_signal_phase: Orientation,
    pub signal_state: SignalState,
    /// Seconds the current phase has held
    pub signal_duration: f64,
    pub seconds_remaining: f64,
    pub emergency_mode: bool,
    pub emergency_vehicles: usize,
    pub priority_direction: Option<Orientation>,
    pub total_vehicles: usize,
    pub waiting_vehicles: usize,
    pub average_speed: f64,
    pub congestion_level: usize,
    pub intersection_status: ApproachCounts,
    pub traffic_lights: Vec<LightStatus>,
    pub analytics: Analytics,
}
