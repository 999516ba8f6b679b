//! Data models shared across the interpreter
//!
//! This module provides:
//! - 6-axis positions (X, Y, Z, A, B, C)
//! - Modal enums (motion kind, plane, distance mode, units, work offsets)
//! - Spindle and coolant state
//! - Move identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Program coordinate units (millimeters or inches)
///
/// Coordinates are never converted between unit systems; the active unit is
/// recorded alongside each state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    /// Millimeters (G21)
    #[default]
    MM,
    /// Inches (G20)
    INCH,
}

impl Units {
    /// The G-code that selects this unit system
    pub fn gcode(&self) -> u16 {
        match self {
            Units::INCH => 20,
            Units::MM => 21,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::MM => write!(f, "mm"),
            Units::INCH => write!(f, "in"),
        }
    }
}

/// Machine axis identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    /// X-axis (typically left-right).
    X,
    /// Y-axis (typically front-back).
    Y,
    /// Z-axis (typically up-down).
    Z,
    /// A-axis (rotational around X).
    A,
    /// B-axis (rotational around Y).
    B,
    /// C-axis (rotational around Z).
    C,
}

impl Axis {
    /// All axes in storage order
    pub const ALL: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    /// Map an address letter to an axis
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'A' => Some(Axis::A),
            'B' => Some(Axis::B),
            'C' => Some(Axis::C),
            _ => None,
        }
    }

    /// The address letter of this axis
    pub fn letter(&self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::A => 'A',
            Axis::B => 'B',
            Axis::C => 'C',
        }
    }

    /// Storage slot of this axis
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// 6-axis machine position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
    /// A-axis (4th axis) position
    pub a: f64,
    /// B-axis (5th axis) position
    pub b: f64,
    /// C-axis (6th axis) position
    pub c: f64,
}

impl Position {
    /// Position at the origin on every axis
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        a: 0.0,
        b: 0.0,
        c: 0.0,
    };

    /// Create a position from linear axes only
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            ..Self::ORIGIN
        }
    }

    /// Create a position with all six axes
    pub fn with_axes(x: f64, y: f64, z: f64, a: f64, b: f64, c: f64) -> Self {
        debug_assert!(
            x.is_finite()
                && y.is_finite()
                && z.is_finite()
                && a.is_finite()
                && b.is_finite()
                && c.is_finite(),
            "Position axes must be finite: x={x}, y={y}, z={z}, a={a}, b={b}, c={c}"
        );
        Self { x, y, z, a, b, c }
    }

    /// Read one axis
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::A => self.a,
            Axis::B => self.b,
            Axis::C => self.c,
        }
    }

    /// Write one axis
    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
            Axis::A => self.a = value,
            Axis::B => self.b = value,
            Axis::C => self.c = value,
        }
    }

    /// Axis-wise sum of two positions
    pub fn offset_by(&self, other: &Position) -> Position {
        Position {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            a: self.a + other.a,
            b: self.b + other.b,
            c: self.c + other.c,
        }
    }

    /// Euclidean distance over the linear axes
    pub fn distance_xyz(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X:{:.3} Y:{:.3} Z:{:.3} A:{:.3} B:{:.3} C:{:.3}",
            self.x, self.y, self.z, self.a, self.b, self.c
        )
    }
}

/// Motion mode - modal group 1 (G00, G01, G02, G03)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    /// Rapid positioning (G00)
    #[default]
    Rapid,
    /// Linear interpolation (G01)
    Linear,
    /// Clockwise arc (G02)
    ArcClockwise,
    /// Counter-clockwise arc (G03)
    ArcCounterClockwise,
}

impl MotionKind {
    /// Map a G-code number to a motion kind
    pub fn from_gcode(code: u16) -> Option<Self> {
        match code {
            0 => Some(MotionKind::Rapid),
            1 => Some(MotionKind::Linear),
            2 => Some(MotionKind::ArcClockwise),
            3 => Some(MotionKind::ArcCounterClockwise),
            _ => None,
        }
    }

    /// The G-code number of this motion kind
    pub fn gcode(&self) -> u16 {
        match self {
            MotionKind::Rapid => 0,
            MotionKind::Linear => 1,
            MotionKind::ArcClockwise => 2,
            MotionKind::ArcCounterClockwise => 3,
        }
    }

    /// Whether this kind is a circular interpolation
    pub fn is_arc(&self) -> bool {
        matches!(
            self,
            MotionKind::ArcClockwise | MotionKind::ArcCounterClockwise
        )
    }
}

impl fmt::Display for MotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionKind::Rapid => write!(f, "Rapid positioning (G00)"),
            MotionKind::Linear => write!(f, "Linear interpolation (G01)"),
            MotionKind::ArcClockwise => write!(f, "Clockwise arc (G02)"),
            MotionKind::ArcCounterClockwise => write!(f, "Counter-clockwise arc (G03)"),
        }
    }
}

/// Plane selection - modal group 2 (G17, G18, G19)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Plane {
    /// XY plane (G17)
    #[default]
    XY,
    /// XZ plane (G18)
    XZ,
    /// YZ plane (G19)
    YZ,
}

impl Plane {
    /// Map a G-code number to a plane
    pub fn from_gcode(code: u16) -> Option<Self> {
        match code {
            17 => Some(Plane::XY),
            18 => Some(Plane::XZ),
            19 => Some(Plane::YZ),
            _ => None,
        }
    }

    /// The in-plane axes and the normal axis, as (first, second, normal)
    pub fn axes(&self) -> (Axis, Axis, Axis) {
        match self {
            Plane::XY => (Axis::X, Axis::Y, Axis::Z),
            Plane::XZ => (Axis::X, Axis::Z, Axis::Y),
            Plane::YZ => (Axis::Y, Axis::Z, Axis::X),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::XY => write!(f, "XY plane (G17)"),
            Plane::XZ => write!(f, "XZ plane (G18)"),
            Plane::YZ => write!(f, "YZ plane (G19)"),
        }
    }
}

/// Distance mode - modal group 3 (G90, G91)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    /// Absolute positioning (G90)
    #[default]
    Absolute,
    /// Incremental positioning (G91)
    Incremental,
}

impl fmt::Display for DistanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMode::Absolute => write!(f, "Absolute positioning (G90)"),
            DistanceMode::Incremental => write!(f, "Incremental positioning (G91)"),
        }
    }
}

/// Work coordinate system - modal group 12 (G54-G59)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkOffset {
    #[default]
    G54,
    G55,
    G56,
    G57,
    G58,
    G59,
}

impl WorkOffset {
    /// All coordinate systems in table order
    pub const ALL: [WorkOffset; 6] = [
        WorkOffset::G54,
        WorkOffset::G55,
        WorkOffset::G56,
        WorkOffset::G57,
        WorkOffset::G58,
        WorkOffset::G59,
    ];

    /// Map a G-code number to a coordinate system
    pub fn from_gcode(code: u16) -> Option<Self> {
        match code {
            54..=59 => Some(Self::ALL[(code - 54) as usize]),
            _ => None,
        }
    }

    /// Slot of this coordinate system in an offset table
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for WorkOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", 54 + self.index())
    }
}

/// Spindle rotation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpindleState {
    #[default]
    Off,
    /// M3
    Clockwise,
    /// M4
    CounterClockwise,
}

/// Coolant state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoolantState {
    #[default]
    Off,
    /// M7
    Mist,
    /// M8
    Flood,
}

/// Unique identifier of a simulated move
///
/// Identifiers are freshly generated every time a program is processed and
/// are never reused within one move list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoveId(Uuid);

impl MoveId {
    /// Create a new unique move identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MoveId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for MoveId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for MoveId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_letters_round_trip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_letter(axis.letter()), Some(axis));
            assert_eq!(Axis::from_letter(axis.letter().to_ascii_lowercase()), Some(axis));
        }
        assert_eq!(Axis::from_letter('I'), None);
    }

    #[test]
    fn test_position_get_set() {
        let mut pos = Position::ORIGIN;
        pos.set(Axis::B, 12.5);
        assert_eq!(pos.get(Axis::B), 12.5);
        assert_eq!(pos.get(Axis::X), 0.0);
    }

    #[test]
    fn test_position_offset_by() {
        let pos = Position::new(1.0, 2.0, 3.0);
        let shifted = pos.offset_by(&Position::new(10.0, -2.0, 0.5));
        assert_eq!(shifted, Position::new(11.0, 0.0, 3.5));
    }

    #[test]
    fn test_plane_axes() {
        assert_eq!(Plane::XY.axes(), (Axis::X, Axis::Y, Axis::Z));
        assert_eq!(Plane::XZ.axes(), (Axis::X, Axis::Z, Axis::Y));
        assert_eq!(Plane::YZ.axes(), (Axis::Y, Axis::Z, Axis::X));
    }

    #[test]
    fn test_work_offset_from_gcode() {
        assert_eq!(WorkOffset::from_gcode(54), Some(WorkOffset::G54));
        assert_eq!(WorkOffset::from_gcode(59), Some(WorkOffset::G59));
        assert_eq!(WorkOffset::from_gcode(60), None);
        assert_eq!(WorkOffset::G57.to_string(), "G57");
    }

    #[test]
    fn test_move_ids_are_unique() {
        let a = MoveId::new();
        let b = MoveId::new();
        assert_ne!(a, b);
        let parsed: MoveId = a.to_string().parse().expect("valid uuid");
        assert_eq!(parsed, a);
    }
}
