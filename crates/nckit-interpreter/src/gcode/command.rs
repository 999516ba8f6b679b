//! Structured commands produced by the line parser

use nckit_core::{
    Axis, CoolantState, DistanceMode, MotionKind, Plane, Position, SpindleState, Units, WorkOffset,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sparse set of explicitly programmed axis values
///
/// Axes that were not written on the line stay `None`; the simulator keeps
/// their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisWords {
    values: [Option<f64>; 6],
}

impl AxisWords {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    /// Value for one axis, if programmed
    pub fn get(&self, axis: Axis) -> Option<f64> {
        self.values[axis.index()]
    }

    /// Set one axis
    pub fn set(&mut self, axis: Axis, value: f64) {
        self.values[axis.index()] = Some(value);
    }

    /// Whether an axis was programmed
    pub fn contains(&self, axis: Axis) -> bool {
        self.values[axis.index()].is_some()
    }

    /// True when no axis was programmed
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Programmed axes in X, Y, Z, A, B, C order
    pub fn iter(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        Axis::ALL
            .into_iter()
            .filter_map(|axis| self.get(axis).map(|value| (axis, value)))
    }

    /// Overlay the programmed axes onto a base position
    pub fn merged_over(&self, base: &Position) -> Position {
        let mut merged = *base;
        for (axis, value) in self.iter() {
            merged.set(axis, value);
        }
        merged
    }
}

impl fmt::Display for AxisWords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (axis, value) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}{}", axis, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Arc center offsets (I, J, K), relative to the arc start point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CenterOffsets {
    pub i: Option<f64>,
    pub j: Option<f64>,
    pub k: Option<f64>,
}

impl CenterOffsets {
    /// True when no offset word was given
    pub fn is_empty(&self) -> bool {
        self.i.is_none() && self.j.is_none() && self.k.is_none()
    }

    /// Offset along a linear axis (I=X, J=Y, K=Z)
    pub fn along(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.i,
            Axis::Y => self.j,
            Axis::Z => self.k,
            _ => None,
        }
    }
}

/// Non-motion machine actions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxiliaryAction {
    /// G4 P<seconds>
    Dwell { seconds: f64 },
    /// S<rpm>
    SpindleSpeed(f64),
    /// M3 / M4 / M5
    Spindle(SpindleState),
    /// T<n>
    SelectTool(u32),
    /// M6
    ToolChange,
    /// M7 / M8 / M9
    Coolant(CoolantState),
    /// M0 (mandatory) / M1 (optional)
    Pause { optional: bool },
    /// M2 / M30
    ProgramEnd,
}

impl fmt::Display for AuxiliaryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuxiliaryAction::Dwell { seconds } => write!(f, "G4 P{}", seconds),
            AuxiliaryAction::SpindleSpeed(rpm) => write!(f, "S{}", rpm),
            AuxiliaryAction::Spindle(SpindleState::Clockwise) => write!(f, "M3"),
            AuxiliaryAction::Spindle(SpindleState::CounterClockwise) => write!(f, "M4"),
            AuxiliaryAction::Spindle(SpindleState::Off) => write!(f, "M5"),
            AuxiliaryAction::SelectTool(tool) => write!(f, "T{}", tool),
            AuxiliaryAction::ToolChange => write!(f, "M6"),
            AuxiliaryAction::Coolant(CoolantState::Mist) => write!(f, "M7"),
            AuxiliaryAction::Coolant(CoolantState::Flood) => write!(f, "M8"),
            AuxiliaryAction::Coolant(CoolantState::Off) => write!(f, "M9"),
            AuxiliaryAction::Pause { optional: false } => write!(f, "M0"),
            AuxiliaryAction::Pause { optional: true } => write!(f, "M1"),
            AuxiliaryAction::ProgramEnd => write!(f, "M2"),
        }
    }
}

/// What a command does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Change the modal motion mode
    SetMotionMode(MotionKind),
    /// Straight move, rapid (G0) or feed (G1)
    LinearMove { rapid: bool, target: AxisWords },
    /// Circular or helical move (G2/G3)
    ArcMove {
        clockwise: bool,
        target: AxisWords,
        center: CenterOffsets,
        radius: Option<f64>,
    },
    /// F word
    SetFeedRate(f64),
    /// G20 / G21
    SetUnits(Units),
    /// G17 / G18 / G19
    SelectPlane(Plane),
    /// G90 / G91
    SetDistanceMode(DistanceMode),
    /// G54 - G59
    SelectWorkOffset(WorkOffset),
    /// G92: make the current position read as the given values
    SetAxisOffset(AxisWords),
    /// G92.1
    ClearAxisOffset,
    /// Spindle, coolant, tool, dwell and program flow
    Auxiliary(AuxiliaryAction),
    /// Comment text
    Comment(String),
    /// Accepted code with no effect on the simulation (e.g. G94, `%`)
    NoOp,
}

impl CommandKind {
    /// Whether applying this command can produce a move
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            CommandKind::LinearMove { .. } | CommandKind::ArcMove { .. }
        )
    }
}

/// One structured instruction tagged with its source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// 0-based source line index
    pub line: usize,
    /// The instruction
    pub kind: CommandKind,
}

impl Command {
    pub fn new(line: usize, kind: CommandKind) -> Self {
        Self { line, kind }
    }

    pub fn is_motion(&self) -> bool {
        self.kind.is_motion()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.line)?;
        match &self.kind {
            CommandKind::SetMotionMode(kind) => write!(f, "G{}", kind.gcode()),
            CommandKind::LinearMove { rapid, target } => {
                write!(f, "{} {}", if *rapid { "G0" } else { "G1" }, target)
            }
            CommandKind::ArcMove {
                clockwise,
                target,
                center,
                radius,
            } => {
                write!(f, "{} {}", if *clockwise { "G2" } else { "G3" }, target)?;
                for (letter, value) in [('I', center.i), ('J', center.j), ('K', center.k)] {
                    if let Some(value) = value {
                        write!(f, " {}{}", letter, value)?;
                    }
                }
                if let Some(r) = radius {
                    write!(f, " R{}", r)?;
                }
                Ok(())
            }
            CommandKind::SetFeedRate(rate) => write!(f, "F{}", rate),
            CommandKind::SetUnits(units) => write!(f, "G{}", units.gcode()),
            CommandKind::SelectPlane(plane) => write!(f, "{}", plane),
            CommandKind::SetDistanceMode(DistanceMode::Absolute) => write!(f, "G90"),
            CommandKind::SetDistanceMode(DistanceMode::Incremental) => write!(f, "G91"),
            CommandKind::SelectWorkOffset(offset) => write!(f, "{}", offset),
            CommandKind::SetAxisOffset(words) => write!(f, "G92 {}", words),
            CommandKind::ClearAxisOffset => write!(f, "G92.1"),
            CommandKind::Auxiliary(action) => write!(f, "{}", action),
            CommandKind::Comment(text) => write!(f, "({})", text),
            CommandKind::NoOp => write!(f, "no-op"),
        }
    }
}
