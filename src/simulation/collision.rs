//! Pairwise conflict checks between vehicles
//!
//! Same-direction traffic keeps a following gap; cross traffic only
//! conflicts inside the intersection box.

use super::config::SimConfig;
use super::types::Position;
use super::vehicle::SimVehicle;

/// The shared intersection square plus the spacing rule
#[derive(Debug, Clone, Copy)]
pub struct ConflictZone {
    pub center: Position,
    /// Half the side of the intersection box
    pub half_extent: f32,
    pub min_spacing: f32,
}

impl ConflictZone {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            center: config.center(),
            half_extent: config.road_width,
            min_spacing: config.min_spacing,
        }
    }

    /// Strictly inside the intersection box
    pub fn contains(&self, position: &Position) -> bool {
        (position.x - self.center.x).abs() < self.half_extent
            && (position.y - self.center.y).abs() < self.half_extent
    }

    /// Centre distance below which two vehicles are too close
    pub fn threshold(&self, a: &SimVehicle, b: &SimVehicle) -> f32 {
        self.min_spacing + (a.length + b.length) / 2.0
    }

    /// Whether `vehicle`, about to move to `next`, must hold for `other`.
    ///
    /// For same-direction pairs only the trailing vehicle is blocked, and the
    /// check uses the post-move position so spacing survives the tick. Cross
    /// traffic conflicts only when both bodies are inside the box, and then
    /// both hold. A vehicle outside the box never yields to cross traffic
    /// inside it.
    pub fn conflicts(&self, vehicle: &SimVehicle, next: &Position, other: &SimVehicle) -> bool {
        if vehicle.id == other.id {
            return false;
        }
        let threshold = self.threshold(vehicle, other);

        if vehicle.direction == other.direction {
            if !is_ahead(vehicle, other) {
                return false;
            }
            return next.distance(&other.position) < threshold;
        }

        self.contains(&vehicle.position)
            && self.contains(&other.position)
            && vehicle.position.distance(&other.position) < threshold
    }
}

/// `other` leads `vehicle` along their shared direction. Equal progress goes
/// to the older vehicle.
fn is_ahead(vehicle: &SimVehicle, other: &SimVehicle) -> bool {
    let mine = vehicle.direction.progress(&vehicle.position);
    let theirs = vehicle.direction.progress(&other.position);
    theirs > mine || (theirs == mine && other.id < vehicle.id)
}
