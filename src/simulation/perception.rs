//! Reference perception task
//!
//! Stands in for the external detector: it reads published frames, counts
//! vehicles per approach and recommends a phase when one approach clearly
//! dominates. It never touches the world directly.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use log::{debug, info};

use super::channel::Delivery;
use super::runner::PerceptionLink;
use super::types::Orientation;
use super::world::Frame;

/// Ratio one approach must exceed (count / (other + 1)) to be recommended
pub const DOMINANCE_RATIO: f64 = 1.5;

/// Minimum simulated seconds between two recommendations
pub const MIN_DECISION_INTERVAL: f64 = 30.0;

/// Recommendation logic, separated from the thread so it can be driven
/// frame by frame.
#[derive(Debug, Clone)]
pub struct CountingPerception {
    min_interval: f64,
    ratio: f64,
    last_decision_at: Option<f64>,
}

impl Default for CountingPerception {
    fn default() -> Self {
        Self::new(MIN_DECISION_INTERVAL, DOMINANCE_RATIO)
    }
}

impl CountingPerception {
    pub fn new(min_interval: f64, ratio: f64) -> Self {
        Self {
            min_interval,
            ratio,
            last_decision_at: None,
        }
    }

    /// Look at one frame and maybe recommend the other orientation
    pub fn observe(&mut self, frame: &Frame) -> Option<Orientation> {
        let since = frame.time - *self.last_decision_at.get_or_insert(frame.time);
        if since < self.min_interval {
            return None;
        }

        let (horizontal, vertical) = frame.orientation_counts();
        let horizontal_ratio = horizontal as f64 / (vertical as f64 + 1.0);
        let vertical_ratio = vertical as f64 / (horizontal as f64 + 1.0);

        let recommendation = match frame.phase {
            Orientation::Vertical if horizontal_ratio > self.ratio => Orientation::Horizontal,
            Orientation::Horizontal if vertical_ratio > self.ratio => Orientation::Vertical,
            _ => return None,
        };
        self.last_decision_at = Some(frame.time);
        Some(recommendation)
    }
}

/// Totals reported when the perception thread exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerceptionReport {
    pub frames_seen: u64,
    pub decisions_sent: u64,
}

/// Run `perception` on its own thread until the frame slot disconnects.
/// `interval` is the processing cadence between frames.
pub fn spawn_perception(
    link: PerceptionLink,
    mut perception: CountingPerception,
    interval: Duration,
) -> std::io::Result<JoinHandle<PerceptionReport>> {
    thread::Builder::new()
        .name("perception".into())
        .spawn(move || {
            let mut report = PerceptionReport::default();
            loop {
                let frame = match link.frames.wait(interval) {
                    Ok(frame) => frame,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                };
                report.frames_seen += 1;

                if let Some(orientation) = perception.observe(&frame) {
                    let (horizontal, vertical) = frame.orientation_counts();
                    info!(
                        "Perception recommends {orientation} (H={horizontal} V={vertical}) at t={:.1}s",
                        frame.time
                    );
                    if link.decisions.publish(orientation.to_string()) != Delivery::Dropped {
                        report.decisions_sent += 1;
                    }
                }

                thread::sleep(interval);
            }
            debug!(
                "Perception stopped after {} frames, {} decisions",
                report.frames_seen, report.decisions_sent
            );
            report
        })
}
