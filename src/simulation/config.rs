//! Simulation configuration
//!
//! Every tunable the engine reads lives here. The binary fills it from CLI
//! flags; tests build it directly.

use anyhow::{ensure, Result};

use super::types::{
    Position, CONGESTION_WAIT_TICKS, DESPAWN_MARGIN, MIN_SPACING, ROAD_WIDTH, SIGNAL_MAX_TIME,
    SIGNAL_MIN_TIME, SPAWN_OFFSET, SPAWN_PROBABILITY, STOP_LOOKAHEAD, TICK_RATE, WORLD_HEIGHT,
    WORLD_WIDTH, YELLOW_TIME,
};

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub world_width: f32,
    pub world_height: f32,
    pub road_width: f32,
    pub min_spacing: f32,
    pub stop_lookahead: f32,
    pub despawn_margin: f32,
    pub spawn_offset: f32,
    /// Chance per tick that the generator attempts an arrival
    pub spawn_probability: f64,
    pub signal_min_time: f64,
    pub signal_max_time: f64,
    pub yellow_time: f64,
    pub tick_rate: u32,
    pub congestion_wait_ticks: u32,
    /// Maximum number of density samples kept
    pub density_history_len: usize,
    /// Hour of day at simulated time zero
    pub start_hour: u32,
    /// Seed for reproducible arrivals; `None` uses the thread RNG
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            road_width: ROAD_WIDTH,
            min_spacing: MIN_SPACING,
            stop_lookahead: STOP_LOOKAHEAD,
            despawn_margin: DESPAWN_MARGIN,
            spawn_offset: SPAWN_OFFSET,
            spawn_probability: SPAWN_PROBABILITY,
            signal_min_time: SIGNAL_MIN_TIME,
            signal_max_time: SIGNAL_MAX_TIME,
            yellow_time: YELLOW_TIME,
            tick_rate: TICK_RATE,
            congestion_wait_ticks: CONGESTION_WAIT_TICKS,
            density_history_len: 3600,
            start_hour: 0,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Default configuration with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("world_width", self.world_width),
            ("world_height", self.world_height),
            ("road_width", self.road_width),
        ] {
            ensure!(
                value.is_finite() && value > 0.0,
                "{name} must be positive, got {value}"
            );
        }
        for (name, value) in [
            ("min_spacing", self.min_spacing),
            ("stop_lookahead", self.stop_lookahead),
            ("despawn_margin", self.despawn_margin),
            ("spawn_offset", self.spawn_offset),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                "{name} must be non-negative, got {value}"
            );
        }
        ensure!(
            2.0 * self.road_width <= self.world_width.min(self.world_height),
            "road width {} does not fit a {}x{} world",
            self.road_width,
            self.world_width,
            self.world_height
        );
        ensure!(
            (0.0..=1.0).contains(&self.spawn_probability),
            "spawn_probability must be within [0, 1], got {}",
            self.spawn_probability
        );
        ensure!(
            self.signal_min_time.is_finite() && self.signal_min_time >= 0.0,
            "signal_min_time must be non-negative"
        );
        ensure!(
            self.signal_max_time.is_finite() && self.signal_max_time >= self.signal_min_time,
            "signal_max_time ({}) must not be shorter than signal_min_time ({})",
            self.signal_max_time,
            self.signal_min_time
        );
        ensure!(
            self.yellow_time.is_finite() && self.yellow_time > 0.0,
            "yellow_time must be positive"
        );
        ensure!(self.tick_rate > 0, "tick_rate must be positive");
        ensure!(
            self.density_history_len > 0,
            "density_history_len must be positive"
        );
        ensure!(self.start_hour < 24, "start_hour must be below 24");
        Ok(())
    }

    /// Seconds of simulated time per tick
    pub fn tick_delta(&self) -> f64 {
        1.0 / self.tick_rate as f64
    }

    pub fn center(&self) -> Position {
        Position::new(self.world_width / 2.0, self.world_height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.world_width as f64 * self.world_height as f64
    }
}
