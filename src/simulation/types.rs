//! Core types for the intersection simulation
//!
//! Geometry, directions, vehicle categories and the constants every other
//! module shares.

use serde::Serialize;

/// A unique identifier for simulation entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SimId(pub usize);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VehicleId(pub SimId);

/// A 2D position in world units (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn manhattan(&self, other: &Position) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Travel direction of a vehicle. Vehicles never turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Up,
        Direction::Down,
    ];

    /// The approach this direction belongs to
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Unit step along the travel axis
    pub fn unit(self) -> (f32, f32) {
        match self {
            Direction::Right => (1.0, 0.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
        }
    }

    /// Signed progress of `position` along this direction's axis.
    /// Larger means further along the route.
    pub fn progress(self, position: &Position) -> f32 {
        let (ux, uy) = self.unit();
        position.x * ux + position.y * uy
    }
}

/// Which approach a light governs, and which approach holds the phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn opposite(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Orientation {
    type Err = anyhow::Error;

    fn from_str(label: &str) -> anyhow::Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Orientation::Horizontal),
            "vertical" => Ok(Orientation::Vertical),
            other => anyhow::bail!("unknown phase label {other:?}"),
        }
    }
}

/// Physical and behavioural parameters of a vehicle category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategorySpec {
    pub length: f32,
    pub width: f32,
    pub speed: f32,
    pub emergency: bool,
}

/// Type of vehicle in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleCategory {
    Car,
    Bus,
    Truck,
    Ambulance,
    Police,
    Fire,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 6] = [
        VehicleCategory::Car,
        VehicleCategory::Bus,
        VehicleCategory::Truck,
        VehicleCategory::Ambulance,
        VehicleCategory::Police,
        VehicleCategory::Fire,
    ];

    pub fn spec(self) -> CategorySpec {
        let (length, width, speed, emergency) = match self {
            VehicleCategory::Car => (40.0, 20.0, 3.0, false),
            VehicleCategory::Bus => (60.0, 25.0, 2.0, false),
            VehicleCategory::Truck => (55.0, 25.0, 2.0, false),
            VehicleCategory::Ambulance => (50.0, 25.0, 5.0, true),
            VehicleCategory::Police => (45.0, 22.0, 5.0, true),
            VehicleCategory::Fire => (55.0, 25.0, 5.0, true),
        };
        CategorySpec {
            length,
            width,
            speed,
            emergency,
        }
    }

    pub fn is_emergency(self) -> bool {
        self.spec().emergency
    }
}

/// Default world size in units
pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 800.0;

/// Half of the paved cross; the intersection box is 2x this on each side
pub const ROAD_WIDTH: f32 = 100.0;

/// Minimum gap between vehicle bodies, and the spawn clearance radius
pub const MIN_SPACING: f32 = 50.0;

/// How far before a red light a vehicle starts holding
pub const STOP_LOOKAHEAD: f32 = 100.0;

/// Vehicles are removed once this far outside the world
pub const DESPAWN_MARGIN: f32 = 100.0;

/// Spawn points sit this far outside the world edge
pub const SPAWN_OFFSET: f32 = 50.0;

/// Per-tick arrival probability
pub const SPAWN_PROBABILITY: f64 = 0.05;

/// Signal timings in seconds
pub const SIGNAL_MIN_TIME: f64 = 10.0;
pub const SIGNAL_MAX_TIME: f64 = 45.0;
pub const YELLOW_TIME: f64 = 3.0;

/// Opposing score must exceed current score by this factor to switch early
pub const SWITCH_RATIO: f64 = 1.2;

/// Waiting ticks after which a vehicle marks a congestion point
pub const CONGESTION_WAIT_TICKS: u32 = 30;

pub const TICK_RATE: u32 = 60;
