//! Main simulation world that ties everything together
//!
//! `SimWorld` owns every piece of mutable state. Only `tick` and the two
//! inbound hooks (`inject_vehicle`, `apply_decision`) change it; everything
//! else hands out copies.

use anyhow::{ensure, Result};
use log::{debug, info, warn};
use serde::Serialize;

use super::analytics::{Analytics, AnalyticsInput};
use super::collision::ConflictZone;
use super::config::SimConfig;
use super::dashboard::{ApproachCounts, DashboardSnapshot, LightStatus, VehicleCounts};
use super::signal::{
    preemption_target, PhaseDemand, PhaseEvent, SignalController, SignalState, TrafficLight,
};
use super::spawner::{is_clear, spawn_point, SpawnGenerator};
use super::types::{Direction, Orientation, Position, SimId, VehicleCategory, VehicleId};
use super::vehicle::SimVehicle;

/// An owned copy of the world published to the perception side each tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub tick: u64,
    pub time: f64,
    pub phase: Orientation,
    pub signal_state: SignalState,
    pub vehicles: Vec<SimVehicle>,
    pub lights: Vec<TrafficLight>,
}

impl Frame {
    /// Vehicles per approach as seen in this frame
    pub fn orientation_counts(&self) -> (usize, usize) {
        let horizontal = self
            .vehicles
            .iter()
            .filter(|v| v.direction.orientation() == Orientation::Horizontal)
            .count();
        (horizontal, self.vehicles.len() - horizontal)
    }
}

/// The main simulation world
pub struct SimWorld {
    config: SimConfig,

    /// Active vehicles in spawn order
    pub vehicles: Vec<SimVehicle>,

    controller: SignalController,
    zone: ConflictZone,
    spawner: SpawnGenerator,

    /// Ids of the emergency vehicles currently on the map
    emergency_vehicles: Vec<VehicleId>,
    emergency_mode: bool,

    vehicle_counts: VehicleCounts,
    analytics: Analytics,

    /// Vehicles that have left the world
    vehicles_processed: u64,

    /// Next ID to assign
    next_id: usize,

    /// Simulation time in seconds
    pub time: f64,

    /// Ticks executed so far
    pub tick_count: u64,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new_internal(SimConfig::default())
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig) -> Self {
        let vehicle_counts = VehicleCounts::count(&[], &config.center());
        Self {
            controller: SignalController::new(&config),
            zone: ConflictZone::from_config(&config),
            spawner: SpawnGenerator::new(&config),
            vehicles: Vec::new(),
            emergency_vehicles: Vec::new(),
            emergency_mode: false,
            vehicle_counts,
            analytics: Analytics::default(),
            vehicles_processed: 0,
            next_id: 0,
            time: 0.0,
            tick_count: 0,
            config,
        }
    }

    /// Create a world from a validated configuration
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new_internal(config))
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(SimConfig::seeded(seed))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn lights(&self) -> &[TrafficLight] {
        self.controller.lights()
    }

    pub fn phase(&self) -> Orientation {
        self.controller.phase()
    }

    pub fn signal_state(&self) -> SignalState {
        self.controller.state()
    }

    pub fn controller(&self) -> &SignalController {
        &self.controller
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn vehicle_counts(&self) -> &VehicleCounts {
        &self.vehicle_counts
    }

    pub fn emergency_mode(&self) -> bool {
        self.emergency_mode
    }

    pub fn emergency_vehicles(&self) -> &[VehicleId] {
        &self.emergency_vehicles
    }

    pub fn vehicles_processed(&self) -> u64 {
        self.vehicles_processed
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&SimVehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    fn next_vehicle_id(&mut self) -> VehicleId {
        let id = VehicleId(SimId(self.next_id));
        self.next_id += 1;
        id
    }

    /// Place a vehicle at an arbitrary position, bypassing the clearance
    /// check. Meant for scenario setup.
    pub fn place_vehicle(
        &mut self,
        category: VehicleCategory,
        direction: Direction,
        position: Position,
    ) -> VehicleId {
        let id = self.next_vehicle_id();
        self.vehicles
            .push(SimVehicle::new(id, category, direction, position));
        self.refresh_emergency();
        id
    }

    /// Bring a vehicle of any category in at the boundary entry for
    /// `direction`. Fails when the entry point is occupied.
    pub fn inject_vehicle(
        &mut self,
        direction: Direction,
        category: VehicleCategory,
    ) -> Result<VehicleId> {
        let point = spawn_point(direction, &self.config);
        ensure!(
            is_clear(&point, &self.vehicles, self.config.min_spacing),
            "entry point for {direction:?} traffic is occupied"
        );
        let id = self.place_vehicle(category, direction, point);
        debug!("Injected {category:?} {:?} heading {direction:?}", id.0 .0);
        Ok(id)
    }

    fn spawn_vehicle(&mut self) {
        if let Some((direction, point, category)) =
            self.spawner.attempt(&self.vehicles, &self.config)
        {
            let id = self.place_vehicle(category, direction, point);
            debug!("Spawned {category:?} {:?} heading {direction:?}", id.0 .0);
        }
    }

    /// Move every vehicle once, in spawn order. Later vehicles see the
    /// updated positions of earlier ones.
    fn update_vehicles(&mut self) {
        let lights = self.controller.lights();
        let lookahead = self.config.stop_lookahead;
        for index in 0..self.vehicles.len() {
            let (before, rest) = self.vehicles.split_at_mut(index);
            if let Some((vehicle, after)) = rest.split_first_mut() {
                vehicle.update(
                    lights,
                    before.iter().chain(after.iter()),
                    &self.zone,
                    lookahead,
                );
            }
        }
    }

    fn is_departed(&self, position: &Position) -> bool {
        let margin = self.config.despawn_margin;
        position.x < -margin
            || position.x > self.config.world_width + margin
            || position.y < -margin
            || position.y > self.config.world_height + margin
    }

    fn despawn_departed(&mut self) {
        let before = self.vehicles.len();
        let departed: Vec<VehicleId> = self
            .vehicles
            .iter()
            .filter(|v| self.is_departed(&v.position))
            .map(|v| v.id)
            .collect();
        if departed.is_empty() {
            return;
        }
        self.vehicles.retain(|v| !departed.contains(&v.id));
        let removed = before - self.vehicles.len();
        self.vehicles_processed += removed as u64;
        debug!("{removed} vehicle(s) left the intersection");
    }

    fn refresh_emergency(&mut self) {
        self.emergency_vehicles = self
            .vehicles
            .iter()
            .filter(|v| v.is_emergency())
            .map(|v| v.id)
            .collect();
        let active = !self.emergency_vehicles.is_empty();
        if active != self.emergency_mode {
            if active {
                info!(
                    "Emergency mode on: {} emergency vehicle(s)",
                    self.emergency_vehicles.len()
                );
            } else {
                info!("Emergency mode off");
            }
        }
        self.emergency_mode = active;
    }

    /// Orientation needed by the closest emergency vehicle
    pub fn preemption_target(&self) -> Option<Orientation> {
        let center = self.config.center();
        preemption_target(self.vehicles.iter().filter(|v| v.is_emergency()), &center)
    }

    fn update_signals(&mut self) {
        let demand = PhaseDemand::measure(&self.vehicles, self.preemption_target());
        match self.controller.update(self.time, &demand) {
            Ok(Some(event)) => self.log_phase_event(event),
            Ok(None) => {}
            Err(err) => warn!(
                "Signal evaluation skipped at t={:.2}s: {err:#}",
                self.time
            ),
        }
    }

    fn log_phase_event(&self, event: PhaseEvent) {
        match event {
            PhaseEvent::YellowStarted { leaving, reason } => info!(
                "t={:.2}s yellow: leaving {leaving} ({reason:?}), H={} V={}",
                self.time,
                self.vehicles
                    .iter()
                    .filter(|v| v.direction.orientation() == Orientation::Horizontal)
                    .count(),
                self.vehicles
                    .iter()
                    .filter(|v| v.direction.orientation() == Orientation::Vertical)
                    .count(),
            ),
            PhaseEvent::GreenStarted { phase } => {
                info!("t={:.2}s green: {phase}", self.time)
            }
        }
    }

    fn count_vehicles(&mut self) {
        self.vehicle_counts = VehicleCounts::count(&self.vehicles, &self.config.center());
    }

    fn update_analytics(&mut self) {
        let input = AnalyticsInput {
            vehicles: &self.vehicles,
            now: self.time,
            phase_started_at: self.controller.phase_started_at(),
            vehicles_processed: self.vehicles_processed,
        };
        if let Err(err) = self.analytics.update(&input, &self.config) {
            warn!("Analytics skipped at t={:.2}s: {err:#}", self.time);
        }
    }

    /// Main simulation tick. The clock is recomputed from the tick count
    /// rather than accumulated, so it does not drift.
    pub fn tick(&mut self, delta_secs: f64) {
        self.tick_count += 1;
        self.time = self.tick_count as f64 * delta_secs;

        self.spawn_vehicle();
        self.update_vehicles();
        self.despawn_departed();
        self.refresh_emergency();
        self.update_signals();
        self.count_vehicles();
        self.update_analytics();
    }

    /// Apply a phase recommendation from outside. Malformed labels are
    /// logged and dropped; during emergency preemption the recommendation is
    /// ignored.
    pub fn apply_decision(&mut self, label: &str) -> Option<PhaseEvent> {
        let orientation: Orientation = match label.parse() {
            Ok(orientation) => orientation,
            Err(err) => {
                warn!("Ignoring external decision: {err:#}");
                return None;
            }
        };
        if self.emergency_mode {
            debug!("Ignoring external decision {orientation} during emergency preemption");
            return None;
        }
        match self.controller.request(orientation, self.time) {
            Ok(event) => {
                if let Some(event) = event {
                    self.log_phase_event(event);
                }
                event
            }
            Err(err) => {
                warn!("External decision {orientation} rejected: {err:#}");
                None
            }
        }
    }

    /// Owned copy of the state a frame consumer needs
    pub fn snapshot(&self) -> Frame {
        Frame {
            tick: self.tick_count,
            time: self.time,
            phase: self.controller.phase(),
            signal_state: self.controller.state(),
            vehicles: self.vehicles.clone(),
            lights: self.controller.lights().to_vec(),
        }
    }

    /// Read-only dashboard view
    pub fn dashboard(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            tick: self.tick_count,
            time: self.time,
            traffic_stats: self.vehicle_counts.clone(),
            current_signal_phase: self.controller.phase(),
            signal_state: self.controller.state(),
            signal_duration: (self.time - self.controller.phase_started_at()).max(0.0),
            seconds_remaining: self.controller.seconds_remaining(self.time),
            emergency_mode: self.emergency_mode,
            emergency_vehicles: self.emergency_vehicles.len(),
            priority_direction: self.emergency_mode.then(|| self.controller.phase()),
            total_vehicles: self.vehicles.len(),
            waiting_vehicles: self.vehicles.iter().filter(|v| v.waiting_time > 0).count(),
            average_speed: self.analytics.average_speed,
            congestion_level: self.analytics.congestion_points.len(),
            intersection_status: ApproachCounts::count(&self.vehicles),
            traffic_lights: self.controller.lights().iter().map(LightStatus::from).collect(),
            analytics: self.analytics.clone(),
        }
    }

    /// One-line status for periodic logging
    pub fn summary_line(&self) -> String {
        format!(
            "t={:.1}s tick={} phase={} state={:?} vehicles={} waiting={} processed={} emergency={}",
            self.time,
            self.tick_count,
            self.controller.phase(),
            self.controller.state(),
            self.vehicles.len(),
            self.analytics.waiting_vehicles,
            self.vehicles_processed,
            self.emergency_vehicles.len(),
        )
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Intersection Summary ===");
        println!("Time: {:.2}s ({} ticks)", self.time, self.tick_count);
        println!(
            "Phase: {} ({:?}), {:.1}s remaining",
            self.controller.phase(),
            self.controller.state(),
            self.controller.seconds_remaining(self.time)
        );
        println!(
            "Vehicles: {} active, {} processed",
            self.vehicles.len(),
            self.vehicles_processed
        );
        println!();

        println!("--- Vehicle Counts ---");
        for (category, side) in &self.vehicle_counts.0 {
            println!(
                "  {:<10} left={} right={}",
                format!("{category:?}"),
                side.left,
                side.right
            );
        }

        println!("--- Analytics ---");
        println!("  Average wait: {:.2} ticks", self.analytics.average_wait_time);
        println!("  Signal efficiency: {:.3}", self.analytics.signal_efficiency);
        println!(
            "  Congestion points: {}",
            self.analytics.congestion_points.len()
        );
        println!("  Density: {:.6}", self.analytics.latest_density());
        if self.emergency_mode {
            println!(
                "  EMERGENCY: {} vehicle(s), priority {}",
                self.emergency_vehicles.len(),
                self.controller.phase()
            );
        }
    }
}
