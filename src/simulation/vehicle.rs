//! Vehicle movement for the intersection simulation
//!
//! Each tick a vehicle either holds (red light ahead or a conflict) or
//! advances by its nominal speed. Nothing outside the vehicle is mutated.

use serde::Serialize;

use super::collision::ConflictZone;
use super::signal::{LightState, TrafficLight};
use super::types::{Direction, Position, VehicleCategory, VehicleId};

/// A vehicle in the simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub position: Position,
    pub direction: Direction,
    pub category: VehicleCategory,
    pub length: f32,
    pub width: f32,
    pub speed: f32,
    pub stopped: bool,
    /// Consecutive ticks spent holding
    pub waiting_time: u32,
}

impl SimVehicle {
    pub fn new(
        id: VehicleId,
        category: VehicleCategory,
        direction: Direction,
        position: Position,
    ) -> Self {
        let spec = category.spec();
        Self {
            id,
            position,
            direction,
            category,
            length: spec.length,
            width: spec.width,
            speed: spec.speed,
            stopped: false,
            waiting_time: 0,
        }
    }

    pub fn is_emergency(&self) -> bool {
        self.category.is_emergency()
    }

    /// Where the vehicle would be after one unobstructed tick
    pub fn next_position(&self) -> Position {
        let (ux, uy) = self.direction.unit();
        Position::new(
            self.position.x + ux * self.speed,
            self.position.y + uy * self.speed,
        )
    }

    /// Any red light of this vehicle's orientation within `lookahead`
    /// units ahead. Both stop lines count, so a vehicle still short of the
    /// far-side line holds inside the box.
    pub fn should_stop(&self, lights: &[TrafficLight], lookahead: f32) -> bool {
        let orientation = self.direction.orientation();
        let here = self.direction.progress(&self.position);
        lights
            .iter()
            .filter(|light| light.orientation == orientation && light.state == LightState::Red)
            .any(|light| {
                let gap = self.direction.progress(&light.position) - here;
                gap > 0.0 && gap < lookahead
            })
    }

    pub fn check_collision<'a>(
        &self,
        others: impl IntoIterator<Item = &'a SimVehicle>,
        zone: &ConflictZone,
    ) -> bool {
        let next = self.next_position();
        others
            .into_iter()
            .any(|other| zone.conflicts(self, &next, other))
    }

    /// Advance one tick. Returns true if the vehicle moved.
    pub fn update<'a>(
        &mut self,
        lights: &[TrafficLight],
        others: impl IntoIterator<Item = &'a SimVehicle>,
        zone: &ConflictZone,
        lookahead: f32,
    ) -> bool {
        if self.should_stop(lights, lookahead) || self.check_collision(others, zone) {
            self.stopped = true;
            self.waiting_time += 1;
            return false;
        }

        self.stopped = false;
        self.waiting_time = 0;
        self.position = self.next_position();
        true
    }
}
