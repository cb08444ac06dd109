//! Standalone intersection simulation
//!
//! The simulation core: vehicle movement, the signal phase controller,
//! analytics and the hand-off slots to an outside perception task. Nothing
//! here draws anything.

mod analytics;
mod channel;
mod collision;
mod config;
mod dashboard;
mod perception;
mod runner;
mod signal;
mod spawner;
mod types;
mod vehicle;
mod world;

pub use analytics::{hour_of_day, Analytics, AnalyticsInput};
pub use channel::{slot, Delivery, SlotReceiver, SlotSender};
pub use collision::ConflictZone;
pub use config::SimConfig;
pub use dashboard::{ApproachCounts, DashboardSnapshot, LightStatus, SideCounts, VehicleCounts};
pub use perception::{
    spawn_perception, CountingPerception, PerceptionReport, DOMINANCE_RATIO,
    MIN_DECISION_INTERVAL,
};
pub use runner::{LoopStats, PerceptionLink, RunOptions, SimulationLoop};
pub use signal::{
    preemption_target, LightState, PhaseDemand, PhaseEvent, SignalController, SignalState,
    SwitchReason, TrafficLight,
};
pub use spawner::{is_clear, spawn_point, SpawnGenerator, ARRIVAL_MIX};
pub use types::{
    CategorySpec, Direction, Orientation, Position, SimId, VehicleCategory, VehicleId,
    CONGESTION_WAIT_TICKS, DESPAWN_MARGIN, MIN_SPACING, ROAD_WIDTH, SIGNAL_MAX_TIME,
    SIGNAL_MIN_TIME, SPAWN_OFFSET, SPAWN_PROBABILITY, STOP_LOOKAHEAD, SWITCH_RATIO, TICK_RATE,
    WORLD_HEIGHT, WORLD_WIDTH, YELLOW_TIME,
};
pub use vehicle::SimVehicle;
pub use world::{Frame, SimWorld};
