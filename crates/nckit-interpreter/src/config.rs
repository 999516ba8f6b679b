//! Interpreter configuration
//!
//! Initial modal state, arc tolerance and the work offset table used by the
//! simulator. Loaded as the `interpreter` section of the settings file.

use nckit_core::{DistanceMode, MotionKind, Plane, Position, Units, WorkOffset};
use serde::{Deserialize, Serialize};

/// Default absolute tolerance for arc radius checks, in program units
pub const DEFAULT_ARC_TOLERANCE: f64 = 0.05;

/// Relative tolerance for arc radius checks (0.1 %)
pub const ARC_RELATIVE_TOLERANCE: f64 = 0.001;

/// Settings that shape how a program is simulated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Units active before the first G20/G21
    pub initial_units: Units,
    /// Plane active before the first G17/G18/G19
    pub initial_plane: Plane,
    /// Distance mode active before the first G90/G91
    pub initial_distance_mode: DistanceMode,
    /// Motion mode used by axis words before the first motion code
    pub initial_motion_mode: MotionKind,
    /// Absolute arc radius tolerance
    pub arc_tolerance: f64,
    /// Origins of G54 through G59, in machine coordinates
    pub work_offsets: [Position; 6],
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            initial_units: Units::MM,
            initial_plane: Plane::XY,
            initial_distance_mode: DistanceMode::Absolute,
            initial_motion_mode: MotionKind::Rapid,
            arc_tolerance: DEFAULT_ARC_TOLERANCE,
            work_offsets: [Position::ORIGIN; 6],
        }
    }
}

impl InterpreterConfig {
    /// Origin of one work coordinate system
    pub fn work_offset(&self, offset: WorkOffset) -> Position {
        self.work_offsets[offset.index()]
    }

    /// Set the origin of one work coordinate system
    pub fn set_work_offset(&mut self, offset: WorkOffset, origin: Position) {
        self.work_offsets[offset.index()] = origin;
    }

    /// Check the configuration for values the simulator cannot use
    pub fn validate(&self) -> Result<(), String> {
        if !self.arc_tolerance.is_finite() || self.arc_tolerance < 0.0 {
            return Err(format!(
                "Arc tolerance must be a non-negative number, got {}",
                self.arc_tolerance
            ));
        }
        for (slot, origin) in WorkOffset::ALL.iter().zip(self.work_offsets.iter()) {
            let finite = [origin.x, origin.y, origin.z, origin.a, origin.b, origin.c]
                .iter()
                .all(|v| v.is_finite());
            if !finite {
                return Err(format!("Work offset {} has a non-finite axis", slot));
            }
        }
        Ok(())
    }
}
