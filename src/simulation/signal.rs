//! Signal phase state machine
//!
//! One orientation holds green at a time. Handing priority to the other
//! orientation always goes through a yellow interval of fixed length. A
//! hand-off is triggered by emergency preemption, by the demand scores of
//! the two approaches, by the maximum green time, or by an external
//! decision.

use anyhow::{ensure, Result};
use ordered_float::OrderedFloat;
use serde::Serialize;

use super::config::SimConfig;
use super::types::{Orientation, Position, SWITCH_RATIO};
use super::vehicle::SimVehicle;

/// Slack on phase-duration comparisons. Tick times are multiples of an
/// inexact delta, so a whole number of seconds can land a hair short.
const CLOCK_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    Red,
    Yellow,
    Green,
}

/// A signal head at one corner of the intersection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficLight {
    pub position: Position,
    pub orientation: Orientation,
    pub state: LightState,
    /// Seconds until the next scheduled change
    pub time_to_change: f64,
}

impl TrafficLight {
    pub fn new(position: Position, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
            state: LightState::Red,
            time_to_change: 0.0,
        }
    }
}

/// Observable state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalState {
    GreenHorizontal,
    GreenVertical,
    YellowTransition { leaving: Orientation },
}

/// Why a yellow interval was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchReason {
    Emergency,
    MaxTime,
    Demand,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    YellowStarted {
        leaving: Orientation,
        reason: SwitchReason,
    },
    GreenStarted {
        phase: Orientation,
    },
}

/// Inputs to one evaluation of the controller
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseDemand {
    pub horizontal_score: u32,
    pub vertical_score: u32,
    /// Orientation needed by the closest emergency vehicle, if any
    pub emergency: Option<Orientation>,
}

impl PhaseDemand {
    /// Score each approach: every vehicle counts once, waiting ones count
    /// three times.
    pub fn measure(vehicles: &[SimVehicle], emergency: Option<Orientation>) -> Self {
        let mut demand = PhaseDemand {
            emergency,
            ..Default::default()
        };
        for vehicle in vehicles {
            let weight = if vehicle.waiting_time > 0 { 3 } else { 1 };
            match vehicle.direction.orientation() {
                Orientation::Horizontal => demand.horizontal_score += weight,
                Orientation::Vertical => demand.vertical_score += weight,
            }
        }
        demand
    }

    pub fn score(&self, orientation: Orientation) -> u32 {
        match orientation {
            Orientation::Horizontal => self.horizontal_score,
            Orientation::Vertical => self.vertical_score,
        }
    }
}

/// Orientation needed by the emergency vehicle closest (Manhattan) to `center`
pub fn preemption_target<'a>(
    emergency_vehicles: impl IntoIterator<Item = &'a SimVehicle>,
    center: &Position,
) -> Option<Orientation> {
    emergency_vehicles
        .into_iter()
        .min_by_key(|vehicle| OrderedFloat(vehicle.position.manhattan(center)))
        .map(|vehicle| vehicle.direction.orientation())
}

/// The phase controller and the lights it drives
#[derive(Debug, Clone)]
pub struct SignalController {
    phase: Orientation,
    phase_started_at: f64,
    /// Set while a yellow interval is in flight
    yellow_started_at: Option<f64>,
    lights: Vec<TrafficLight>,
    min_time: f64,
    max_time: f64,
    yellow_time: f64,
}

impl SignalController {
    pub fn new(config: &SimConfig) -> Self {
        let center = config.center();
        let r = config.road_width;
        let lights = vec![
            TrafficLight::new(
                Position::new(center.x - r, center.y - r),
                Orientation::Horizontal,
            ),
            TrafficLight::new(
                Position::new(center.x + r, center.y + r),
                Orientation::Horizontal,
            ),
            TrafficLight::new(
                Position::new(center.x - r, center.y + r),
                Orientation::Vertical,
            ),
            TrafficLight::new(
                Position::new(center.x + r, center.y - r),
                Orientation::Vertical,
            ),
        ];

        let mut controller = Self {
            phase: Orientation::Horizontal,
            phase_started_at: 0.0,
            yellow_started_at: None,
            lights,
            min_time: config.signal_min_time,
            max_time: config.signal_max_time,
            yellow_time: config.yellow_time,
        };
        controller.refresh_lights(0.0);
        controller
    }

    pub fn phase(&self) -> Orientation {
        self.phase
    }

    pub fn phase_started_at(&self) -> f64 {
        self.phase_started_at
    }

    pub fn yellow_started_at(&self) -> Option<f64> {
        self.yellow_started_at
    }

    pub fn is_switching(&self) -> bool {
        self.yellow_started_at.is_some()
    }

    pub fn lights(&self) -> &[TrafficLight] {
        &self.lights
    }

    pub fn state(&self) -> SignalState {
        match (self.yellow_started_at, self.phase) {
            (Some(_), leaving) => SignalState::YellowTransition { leaving },
            (None, Orientation::Horizontal) => SignalState::GreenHorizontal,
            (None, Orientation::Vertical) => SignalState::GreenVertical,
        }
    }

    /// Seconds until the next scheduled change, never negative
    pub fn seconds_remaining(&self, now: f64) -> f64 {
        let remaining = match self.yellow_started_at {
            Some(started) => self.yellow_time - (now - started),
            None => {
                let elapsed = now - self.phase_started_at;
                if elapsed > self.min_time + CLOCK_TOLERANCE {
                    self.max_time - elapsed
                } else {
                    self.min_time - elapsed
                }
            }
        };
        remaining.max(0.0)
    }

    fn check_clock(&self, now: f64) -> Result<()> {
        ensure!(now.is_finite(), "clock reading {now} is not finite");
        ensure!(
            now >= self.phase_started_at,
            "clock reading {now:.3}s precedes phase start {:.3}s",
            self.phase_started_at
        );
        if let Some(started) = self.yellow_started_at {
            ensure!(
                now >= started,
                "clock reading {now:.3}s precedes yellow start {started:.3}s"
            );
        }
        Ok(())
    }

    /// Evaluate the state machine at `now` and refresh every light.
    ///
    /// On error nothing is changed, lights included.
    pub fn update(&mut self, now: f64, demand: &PhaseDemand) -> Result<Option<PhaseEvent>> {
        self.check_clock(now)?;

        let event = if let Some(started) = self.yellow_started_at {
            if now - started >= self.yellow_time - CLOCK_TOLERANCE {
                self.phase = self.phase.opposite();
                self.phase_started_at = now;
                self.yellow_started_at = None;
                Some(PhaseEvent::GreenStarted { phase: self.phase })
            } else {
                None
            }
        } else if let Some(needed) = demand.emergency {
            (needed != self.phase).then(|| self.begin_yellow(now, SwitchReason::Emergency))
        } else {
            self.evaluate_demand(now, demand)
                .map(|reason| self.begin_yellow(now, reason))
        };

        self.refresh_lights(now);
        Ok(event)
    }

    fn evaluate_demand(&self, now: f64, demand: &PhaseDemand) -> Option<SwitchReason> {
        let elapsed = now - self.phase_started_at;
        if elapsed > self.max_time + CLOCK_TOLERANCE {
            return Some(SwitchReason::MaxTime);
        }
        if elapsed > self.min_time + CLOCK_TOLERANCE {
            let current = demand.score(self.phase) as f64;
            let opposing = demand.score(self.phase.opposite()) as f64;
            if opposing > current * SWITCH_RATIO {
                return Some(SwitchReason::Demand);
            }
        }
        None
    }

    /// Hand priority to `orientation` on behalf of an outside decision.
    /// Ignored when it already holds the phase or a hand-off is in flight.
    pub fn request(&mut self, orientation: Orientation, now: f64) -> Result<Option<PhaseEvent>> {
        self.check_clock(now)?;
        if self.is_switching() || orientation == self.phase {
            return Ok(None);
        }
        let event = self.begin_yellow(now, SwitchReason::External);
        self.refresh_lights(now);
        Ok(Some(event))
    }

    fn begin_yellow(&mut self, now: f64, reason: SwitchReason) -> PhaseEvent {
        self.yellow_started_at = Some(now);
        PhaseEvent::YellowStarted {
            leaving: self.phase,
            reason,
        }
    }

    fn refresh_lights(&mut self, now: f64) {
        let remaining = self.seconds_remaining(now);
        let switching = self.is_switching();
        for light in &mut self.lights {
            light.state = if switching {
                LightState::Yellow
            } else if light.orientation == self.phase {
                LightState::Green
            } else {
                LightState::Red
            };
            light.time_to_change = remaining;
        }
    }
}
