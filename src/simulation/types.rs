//! Core types for the car wash simulation
//!
//! These are standalone types shared by every simulation module.

use serde::{Deserialize, Serialize};

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimId(pub usize);

/// A wrapper type for vehicle IDs
///
/// IDs are handed out in spawn order, so ordering by ID is ordering by spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub SimId);

/// A 3D position in the simulation
///
/// Also used as a direction vector; movement and steering happen in the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        (*other - *self).length()
    }

    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Position) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn scale(&self, factor: f32) -> Position {
        Position::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    pub fn normalized(&self) -> Option<Position> {
        let len = self.length();
        if len > f32::EPSILON {
            Some(self.scale(1.0 / len))
        } else {
            None
        }
    }

    /// Calculate the angle from this position to another (Y-axis rotation)
    pub fn angle_to(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        dx.atan2(dz)
    }

    /// Heading angle of this vector around the Y axis
    pub fn yaw(&self) -> f32 {
        self.x.atan2(self.z)
    }

    /// Unit heading in the XZ plane for a Y-axis angle
    pub fn from_yaw(yaw: f32) -> Position {
        Position::new(yaw.sin(), 0.0, yaw.cos())
    }

    /// Rotate this heading toward `target` by at most `max_radians`
    ///
    /// Both vectors are treated as XZ-plane headings; the result is a unit vector.
    pub fn rotate_towards(&self, target: &Position, max_radians: f32) -> Position {
        let current = self.yaw();
        let desired = target.yaw();
        let mut delta = desired - current;
        while delta > std::f32::consts::PI {
            delta -= std::f32::consts::TAU;
        }
        while delta < -std::f32::consts::PI {
            delta += std::f32::consts::TAU;
        }
        let step = delta.clamp(-max_radians.abs(), max_radians.abs());
        Position::from_yaw(current + step)
    }

    /// Shortest distance from this point to the segment `start`..`end`
    pub fn distance_to_segment(&self, start: &Position, end: &Position) -> f32 {
        let segment = *end - *start;
        let len_sq = segment.dot(&segment);
        if len_sq <= f32::EPSILON {
            return self.distance(start);
        }
        let t = ((*self - *start).dot(&segment) / len_sq).clamp(0.0, 1.0);
        self.distance(&(*start + segment.scale(t)))
    }
}

impl std::ops::Add for Position {
    type Output = Position;

    fn add(self, other: Position) -> Position {
        Position::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Sub for Position {
    type Output = Position;

    fn sub(self, other: Position) -> Position {
        Position::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// Half-width of the forward probe used for neighbor detection
pub const PROBE_HALF_WIDTH: f32 = 0.5;

/// Distance at which an exiting vehicle counts as gone
pub const EXIT_ARRIVAL_DISTANCE: f32 = 1.0;
