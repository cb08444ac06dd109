//! Derived traffic metrics
//!
//! Recomputed from world state every tick. The peak-hour histogram and the
//! density history are the only running accumulators.

use std::collections::{BTreeMap, VecDeque};

use anyhow::{ensure, Result};
use serde::Serialize;

use super::config::SimConfig;
use super::types::Position;
use super::vehicle::SimVehicle;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analytics {
    /// Vehicles that have left the world since start
    pub total_vehicles_processed: u64,
    /// Mean waiting ticks across active vehicles
    pub average_wait_time: f64,
    pub waiting_vehicles: usize,
    pub average_speed: f64,
    pub emergency_vehicles_count: usize,
    /// Hour of day -> accumulated vehicle volume
    pub peak_hour_data: BTreeMap<u32, u64>,
    /// Vehicles per square unit, oldest first
    pub traffic_density_history: VecDeque<f64>,
    /// Vehicles processed per second of the current green
    pub signal_efficiency: f64,
    pub congestion_points: Vec<Position>,
}

/// The slice of world state the aggregate is computed from
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsInput<'a> {
    pub vehicles: &'a [SimVehicle],
    pub now: f64,
    pub phase_started_at: f64,
    pub vehicles_processed: u64,
}

/// Hour of day at simulated time `now`
pub fn hour_of_day(start_hour: u32, now: f64) -> u32 {
    let hours = start_hour as f64 + now / 3600.0;
    (hours.floor() as u64 % 24) as u32
}

impl Analytics {
    /// Recompute from `input`. All values are derived before anything is
    /// written, so an error leaves the previous aggregate intact.
    pub fn update(&mut self, input: &AnalyticsInput<'_>, config: &SimConfig) -> Result<()> {
        ensure!(input.now.is_finite(), "clock reading {} is not finite", input.now);
        let area = config.area();
        ensure!(area > 0.0, "world area must be positive, got {area}");

        let vehicles = input.vehicles;
        let total = vehicles.len();

        let (average_wait_time, average_speed) = if total == 0 {
            (0.0, 0.0)
        } else {
            let wait: u64 = vehicles.iter().map(|v| v.waiting_time as u64).sum();
            let speed: f64 = vehicles.iter().map(|v| v.speed as f64).sum();
            (wait as f64 / total as f64, speed / total as f64)
        };

        let density = total as f64 / area;
        ensure!(density.is_finite(), "density sample is not finite");

        let green_time = input.now - input.phase_started_at;
        let signal_efficiency = if green_time > 0.0 {
            input.vehicles_processed as f64 / green_time
        } else {
            0.0
        };

        let congestion_points = vehicles
            .iter()
            .filter(|v| v.waiting_time > config.congestion_wait_ticks)
            .map(|v| v.position)
            .collect();

        let hour = hour_of_day(config.start_hour, input.now);

        self.total_vehicles_processed = input.vehicles_processed;
        self.average_wait_time = average_wait_time;
        self.waiting_vehicles = vehicles.iter().filter(|v| v.waiting_time > 0).count();
        self.average_speed = average_speed;
        self.emergency_vehicles_count = vehicles.iter().filter(|v| v.is_emergency()).count();
        *self.peak_hour_data.entry(hour).or_insert(0) += total as u64;
        self.traffic_density_history.push_back(density);
        while self.traffic_density_history.len() > config.density_history_len {
            self.traffic_density_history.pop_front();
        }
        self.signal_efficiency = signal_efficiency;
        self.congestion_points = congestion_points;
        Ok(())
    }

    pub fn latest_density(&self) -> f64 {
        self.traffic_density_history.back().copied().unwrap_or(0.0)
    }
}
