//! Machine state tracked by the simulator

use nckit_core::{
    CoolantState, DistanceMode, MotionKind, Plane, Position, SpindleState, Units, WorkOffset,
};
use serde::{Deserialize, Serialize};

use crate::config::InterpreterConfig;

/// Cumulative machine state after some prefix of a program
///
/// Tracks all modal groups and execution state the simulator needs:
/// - Motion group (G00, G01, G02, G03)
/// - Plane selection group (G17, G18, G19)
/// - Distance mode group (G90, G91)
/// - Units group (G20, G21)
/// - Coordinate system group (G54-G59) and the G92 axis offset
/// - Spindle, coolant and tool
///
/// `position` is in machine coordinates. The state is `Copy` so every
/// emitted move can carry its own snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    /// Tool position in machine coordinates
    pub position: Position,
    /// Motion mode - Group 1
    pub motion_mode: MotionKind,
    /// Current feed rate (F value)
    pub feed_rate: f64,
    /// Current spindle speed (S value)
    pub spindle_speed: f64,
    /// Spindle rotation
    pub spindle: SpindleState,
    /// Selected tool number (T value)
    pub tool: u32,
    /// Coolant
    pub coolant: CoolantState,
    /// Units mode - Group 6
    pub units: Units,
    /// Plane selection - Group 2
    pub plane: Plane,
    /// Distance mode - Group 3
    pub distance_mode: DistanceMode,
    /// Active coordinate system - Group 12
    pub work_offset: WorkOffset,
    /// G92 offset added on top of the work offset
    pub axis_offset: Position,
    /// Set by M2/M30
    pub program_ended: bool,
}

impl Default for MachineState {
    fn default() -> Self {
        Self::from_config(&InterpreterConfig::default())
    }
}

impl MachineState {
    /// Power-on state for a configuration
    pub fn from_config(config: &InterpreterConfig) -> Self {
        Self {
            position: Position::ORIGIN,
            motion_mode: config.initial_motion_mode,
            feed_rate: 0.0,
            spindle_speed: 0.0,
            spindle: SpindleState::Off,
            tool: 0,
            coolant: CoolantState::Off,
            units: config.initial_units,
            plane: config.initial_plane,
            distance_mode: config.initial_distance_mode,
            work_offset: WorkOffset::G54,
            axis_offset: Position::ORIGIN,
            program_ended: false,
        }
    }

    /// Modal context handed to the line parser for the next line
    pub fn modal_context(&self) -> ModalContext {
        ModalContext {
            motion_mode: self.motion_mode,
        }
    }

    /// Get a human-readable description of the modal state
    pub fn description(&self) -> String {
        format!(
            "G{} {} {} G{} {} F{} S{} T{}",
            self.motion_mode.gcode(),
            match self.plane {
                Plane::XY => "G17",
                Plane::XZ => "G18",
                Plane::YZ => "G19",
            },
            match self.distance_mode {
                DistanceMode::Absolute => "G90",
                DistanceMode::Incremental => "G91",
            },
            self.units.gcode(),
            self.work_offset,
            self.feed_rate,
            self.spindle_speed,
            self.tool
        )
    }
}

/// Modal information the parser needs from preceding lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModalContext {
    /// Motion mode applied to axis words with no motion code on their line
    pub motion_mode: MotionKind,
}
