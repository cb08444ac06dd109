//! Fixed-rate simulation loop
//!
//! Each step ticks the world, publishes a frame to the perception side and
//! drains one pending phase decision. Neither channel operation can block.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, trace};

use super::channel::{slot, Delivery, SlotReceiver, SlotSender};
use super::signal::PhaseEvent;
use super::world::{Frame, SimWorld};

/// The perception side of the two hand-off slots
pub struct PerceptionLink {
    pub frames: SlotReceiver<Frame>,
    pub decisions: SlotSender<String>,
}

/// Counters the loop keeps about its own hand-offs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub frames_delivered: u64,
    pub frames_replaced: u64,
    pub frames_dropped: u64,
    pub decisions_received: u64,
    pub decisions_applied: u64,
}

/// Limits on a `run`
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
    /// Sleep to hold the configured tick rate
    pub paced: bool,
}

pub struct SimulationLoop {
    world: SimWorld,
    frames: SlotSender<Frame>,
    decisions: SlotReceiver<String>,
    stats: LoopStats,
}

impl SimulationLoop {
    /// Wrap `world` and hand back the perception ends of both slots
    pub fn connect(world: SimWorld) -> (Self, PerceptionLink) {
        let (frame_tx, frame_rx) = slot();
        let (decision_tx, decision_rx) = slot();
        let sim_loop = Self {
            world,
            frames: frame_tx,
            decisions: decision_rx,
            stats: LoopStats::default(),
        };
        let link = PerceptionLink {
            frames: frame_rx,
            decisions: decision_tx,
        };
        (sim_loop, link)
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SimWorld {
        &mut self.world
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn into_world(self) -> SimWorld {
        self.world
    }

    /// One tick: simulate, export a frame, import a decision.
    /// Returns the transition the decision triggered, if any.
    pub fn step(&mut self) -> Option<PhaseEvent> {
        let delta = self.world.config().tick_delta();
        self.world.tick(delta);
        self.stats.ticks += 1;

        match self.frames.publish(self.world.snapshot()) {
            Delivery::Delivered => self.stats.frames_delivered += 1,
            Delivery::Replaced => {
                self.stats.frames_replaced += 1;
                trace!("unread frame replaced at tick {}", self.world.tick_count);
            }
            Delivery::Dropped => self.stats.frames_dropped += 1,
        }

        let label = self.decisions.try_take()?;
        self.stats.decisions_received += 1;
        let event = self.world.apply_decision(&label);
        if event.is_some() {
            self.stats.decisions_applied += 1;
        }
        event
    }

    /// Step until `stop` fires (a message or all senders dropped) or the
    /// tick limit is reached. `on_tick` runs on the loop thread after every
    /// step and may inject vehicles.
    pub fn run(
        &mut self,
        stop: &Receiver<()>,
        options: RunOptions,
        mut on_tick: impl FnMut(&mut SimWorld),
    ) -> LoopStats {
        let period = Duration::from_secs_f64(self.world.config().tick_delta());
        let mut deadline = Instant::now() + period;
        let mut remaining = options.max_ticks;

        loop {
            match stop.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => {
                    debug!("Stop signal received after {} ticks", self.stats.ticks);
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }
            if let Some(left) = remaining.as_mut() {
                if *left == 0 {
                    break;
                }
                *left -= 1;
            }

            self.step();
            on_tick(&mut self.world);

            if options.paced {
                let now = Instant::now();
                if now < deadline {
                    std::thread::sleep(deadline - now);
                    deadline += period;
                } else {
                    // Fell behind; restart the clock instead of bursting
                    deadline = now + period;
                }
            }
        }

        self.stats
    }
}
