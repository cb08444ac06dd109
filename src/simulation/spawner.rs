//! Stochastic arrival process at the four boundary entry points

use log::warn;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;

use super::config::SimConfig;
use super::types::{Direction, Position, VehicleCategory};
use super::vehicle::SimVehicle;

/// Arrival mix for regular traffic. Emergency categories only enter
/// through external injection.
pub const ARRIVAL_MIX: [(VehicleCategory, f64); 3] = [
    (VehicleCategory::Car, 0.7),
    (VehicleCategory::Bus, 0.15),
    (VehicleCategory::Truck, 0.15),
];

/// Entry coordinate for a direction. Each direction drives on its own side
/// of the centre line.
pub fn spawn_point(direction: Direction, config: &SimConfig) -> Position {
    let center = config.center();
    let lane = config.road_width / 2.0;
    let offset = config.spawn_offset;
    match direction {
        Direction::Right => Position::new(-offset, center.y - lane),
        Direction::Left => Position::new(config.world_width + offset, center.y + lane),
        Direction::Up => Position::new(center.x + lane, config.world_height + offset),
        Direction::Down => Position::new(center.x - lane, -offset),
    }
}

/// No existing vehicle within `min_spacing` of `point`
pub fn is_clear(point: &Position, vehicles: &[SimVehicle], min_spacing: f32) -> bool {
    vehicles
        .iter()
        .all(|vehicle| vehicle.position.distance(point) >= min_spacing)
}

pub struct SpawnGenerator {
    probability: f64,
    /// Optional seeded RNG for reproducible arrivals
    rng: Option<StdRng>,
}

impl SpawnGenerator {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            probability: config.spawn_probability,
            rng: config.seed.map(StdRng::seed_from_u64),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    fn random_bool(&mut self, p: f64) -> bool {
        match &mut self.rng {
            Some(rng) => rng.random_bool(p),
            None => rand::rng().random_bool(p),
        }
    }

    fn choose_direction(&mut self) -> Direction {
        let choice = match &mut self.rng {
            Some(rng) => Direction::ALL.choose(rng),
            None => Direction::ALL.choose(&mut rand::rng()),
        };
        choice.copied().unwrap_or(Direction::Right)
    }

    fn choose_category(&mut self) -> Option<VehicleCategory> {
        let choice = match &mut self.rng {
            Some(rng) => ARRIVAL_MIX.choose_weighted(rng, |entry| entry.1),
            None => ARRIVAL_MIX.choose_weighted(&mut rand::rng(), |entry| entry.1),
        };
        match choice {
            Ok((category, _)) => Some(*category),
            Err(err) => {
                warn!("Arrival mix is unusable: {err}");
                None
            }
        }
    }

    /// Roll for an arrival this tick. Returns the direction, entry point and
    /// category when one should be created; the entry must be clear of
    /// `vehicles`.
    pub fn attempt(
        &mut self,
        vehicles: &[SimVehicle],
        config: &SimConfig,
    ) -> Option<(Direction, Position, VehicleCategory)> {
        if self.probability <= 0.0 || !self.random_bool(self.probability) {
            return None;
        }

        let direction = self.choose_direction();
        let point = spawn_point(direction, config);
        if !is_clear(&point, vehicles, config.min_spacing) {
            return None;
        }

        let category = self.choose_category()?;
        Some((direction, point, category))
    }
}
