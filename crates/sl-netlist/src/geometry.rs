//! Placement transforms: terminal offsets to absolute canvas positions.

use sl_core::{SlError, SlResult};

/// A point on the schematic canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Rotation in quarter turns, from +x toward +y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Build a rotation from degrees. Only multiples of 90 are accepted;
    /// negative angles and full turns wrap.
    pub fn from_degrees(degrees: i32) -> SlResult<Self> {
        if degrees % 90 != 0 {
            return Err(SlError::InvalidArg {
                what: format!("rotation must be a multiple of 90 degrees, got {degrees}"),
            });
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Self::R0,
            90 => Self::R90,
            180 => Self::R180,
            _ => Self::R270,
        })
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// Rotate a vector. Exact: no trigonometry involved.
    pub fn apply(self, p: Point) -> Point {
        match self {
            Self::R0 => p,
            Self::R90 => Point::new(-p.y, p.x),
            Self::R180 => Point::new(-p.x, -p.y),
            Self::R270 => Point::new(p.y, -p.x),
        }
    }
}

/// Where and how a component sits on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub position: Point,
    pub rotation: Rotation,
    /// Mirror across the component's vertical axis (negates local x).
    pub mirror_h: bool,
    /// Mirror across the component's horizontal axis (negates local y).
    pub mirror_v: bool,
}

impl Placement {
    pub fn at(position: impl Into<Point>) -> Self {
        Self {
            position: position.into(),
            ..Self::default()
        }
    }

    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn mirrored(mut self, horizontal: bool, vertical: bool) -> Self {
        self.mirror_h = horizontal;
        self.mirror_v = vertical;
        self
    }

    /// Map a terminal offset (component frame) to an absolute position.
    ///
    /// Mirroring happens in the local frame, then rotation, then translation.
    pub fn transform(&self, offset: Point) -> Point {
        let mut local = offset;
        if self.mirror_h {
            local.x = -local.x;
        }
        if self.mirror_v {
            local.y = -local.y;
        }
        let rotated = self.rotation.apply(local);
        Point::new(
            self.position.x + rotated.x,
            self.position.y + rotated.y,
        )
    }
}
