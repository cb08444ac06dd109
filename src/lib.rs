//! Traffic Signal Simulation Library
//!
//! A single four-way intersection with an adaptive signal controller that can
//! run headless or hand frames to an outside perception task.

pub mod simulation;
