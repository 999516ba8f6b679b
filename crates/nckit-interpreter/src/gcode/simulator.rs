//! Machine state simulator
//!
//! A strict left fold over commands: each command is applied to the state
//! left by the previous one. Motion commands also produce a
//! [`MotionRecord`] describing the move.

use nckit_core::{Axis, DistanceMode, MotionKind, Plane, Position, SimulationError};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use super::command::{AuxiliaryAction, AxisWords, CenterOffsets, Command, CommandKind};
use super::state::MachineState;
use crate::config::{InterpreterConfig, ARC_RELATIVE_TOLERANCE};

const EPSILON: f64 = 1e-9;

/// Resolved circular geometry of an arc move
///
/// Angles are measured in the active plane, from the first plane axis
/// towards the second. `sweep` is negative for clockwise arcs and has a
/// magnitude of 2π for full circles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcGeometry {
    pub plane: Plane,
    /// Arc center; off-plane axes hold the start position values
    pub center: Position,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep: f64,
}

impl ArcGeometry {
    pub fn is_clockwise(&self) -> bool {
        self.sweep < 0.0
    }

    pub fn is_full_circle(&self) -> bool {
        (self.sweep.abs() - TAU).abs() < EPSILON
    }

    /// Point at fraction `t` (0..=1) of the way from `start` to `end`
    ///
    /// Axes outside the plane move linearly, so helices come out right.
    pub fn point_at(&self, start: &Position, end: &Position, t: f64) -> Position {
        if t <= 0.0 {
            return *start;
        }
        if t >= 1.0 {
            return *end;
        }
        let (u, v, _) = self.plane.axes();
        let mut point = *start;
        for axis in Axis::ALL {
            let a = start.get(axis);
            point.set(axis, a + (end.get(axis) - a) * t);
        }
        let angle = self.start_angle + self.sweep * t;
        point.set(u, self.center.get(u) + self.radius * angle.cos());
        point.set(v, self.center.get(v) + self.radius * angle.sin());
        point
    }

    /// Path length including the helical component
    pub fn length(&self, start: &Position, end: &Position) -> f64 {
        let (_, _, normal) = self.plane.axes();
        let planar = self.sweep.abs() * self.radius;
        let rise = end.get(normal) - start.get(normal);
        (planar * planar + rise * rise).sqrt()
    }
}

/// Description of one emitted move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRecord {
    pub kind: MotionKind,
    pub start: Position,
    pub end: Position,
    pub arc: Option<ArcGeometry>,
    /// State after the command
    pub state: MachineState,
}

/// Outcome of applying one command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Applied {
    pub state: MachineState,
    pub motion: Option<MotionRecord>,
}

/// Applies commands to machine state
#[derive(Debug, Clone)]
pub struct Simulator {
    work_offsets: [Position; 6],
    arc_tolerance: f64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(&InterpreterConfig::default())
    }
}

impl Simulator {
    pub fn new(config: &InterpreterConfig) -> Self {
        Self {
            work_offsets: config.work_offsets,
            arc_tolerance: config.arc_tolerance,
        }
    }

    /// Apply one command to a state
    ///
    /// On error the input state is untouched and the command is dropped.
    pub fn apply(
        &self,
        state: &MachineState,
        command: &Command,
    ) -> Result<Applied, SimulationError> {
        let mut next = *state;
        let mut motion = None;

        match &command.kind {
            CommandKind::SetMotionMode(kind) => next.motion_mode = *kind,
            CommandKind::LinearMove { rapid, target } => {
                let kind = if *rapid {
                    MotionKind::Rapid
                } else {
                    MotionKind::Linear
                };
                let end = self.destination(state, target)?;
                next.motion_mode = kind;
                next.position = end;
                motion = Some(MotionRecord {
                    kind,
                    start: state.position,
                    end,
                    arc: None,
                    state: next,
                });
            }
            CommandKind::ArcMove {
                clockwise,
                target,
                center,
                radius,
            } => {
                let kind = if *clockwise {
                    MotionKind::ArcClockwise
                } else {
                    MotionKind::ArcCounterClockwise
                };
                let end = self.destination(state, target)?;
                let arc = self.resolve_arc(
                    &state.position,
                    &end,
                    state.plane,
                    *clockwise,
                    center,
                    *radius,
                )?;
                next.motion_mode = kind;
                next.position = end;
                motion = Some(MotionRecord {
                    kind,
                    start: state.position,
                    end,
                    arc: Some(arc),
                    state: next,
                });
            }
            CommandKind::SetFeedRate(rate) => next.feed_rate = *rate,
            CommandKind::SetUnits(units) => next.units = *units,
            CommandKind::SelectPlane(plane) => next.plane = *plane,
            CommandKind::SetDistanceMode(mode) => next.distance_mode = *mode,
            CommandKind::SelectWorkOffset(offset) => next.work_offset = *offset,
            CommandKind::SetAxisOffset(words) => {
                let origin = self.work_offsets[state.work_offset.index()];
                for (axis, value) in words.iter() {
                    let offset = state.position.get(axis) - origin.get(axis) - value;
                    if !offset.is_finite() {
                        return Err(SimulationError::NonFinitePosition { axis });
                    }
                    next.axis_offset.set(axis, offset);
                }
            }
            CommandKind::ClearAxisOffset => next.axis_offset = Position::ORIGIN,
            CommandKind::Auxiliary(action) => apply_auxiliary(&mut next, action),
            CommandKind::Comment(_) | CommandKind::NoOp => {}
        }

        Ok(Applied {
            state: next,
            motion,
        })
    }

    /// Axis-merge rule: programmed axes move, the others keep their value
    fn destination(
        &self,
        state: &MachineState,
        target: &AxisWords,
    ) -> Result<Position, SimulationError> {
        let origin = self.work_offsets[state.work_offset.index()];
        let mut end = state.position;
        for (axis, value) in target.iter() {
            let resolved = match state.distance_mode {
                DistanceMode::Absolute => {
                    value + origin.get(axis) + state.axis_offset.get(axis)
                }
                DistanceMode::Incremental => state.position.get(axis) + value,
            };
            if !resolved.is_finite() {
                return Err(SimulationError::NonFinitePosition { axis });
            }
            end.set(axis, resolved);
        }
        Ok(end)
    }

    fn resolve_arc(
        &self,
        start: &Position,
        end: &Position,
        plane: Plane,
        clockwise: bool,
        offsets: &CenterOffsets,
        radius: Option<f64>,
    ) -> Result<ArcGeometry, SimulationError> {
        let (u, v, normal) = plane.axes();
        for (word, value, axis) in [
            ('I', offsets.i, Axis::X),
            ('J', offsets.j, Axis::Y),
            ('K', offsets.k, Axis::Z),
        ] {
            if value.is_some() && axis == normal {
                return Err(SimulationError::InvalidArcWord { word, plane });
            }
        }

        let (su, sv) = (start.get(u), start.get(v));
        let (eu, ev) = (end.get(u), end.get(v));

        let (cu, cv, r, full) = if !offsets.is_empty() {
            let cu = su + offsets.along(u).unwrap_or(0.0);
            let cv = sv + offsets.along(v).unwrap_or(0.0);
            let start_radius = (su - cu).hypot(sv - cv);
            let end_radius = (eu - cu).hypot(ev - cv);
            if start_radius < EPSILON {
                return Err(SimulationError::ArcZeroRadius);
            }
            let diff = (start_radius - end_radius).abs();
            if diff > self.arc_tolerance && diff > ARC_RELATIVE_TOLERANCE * start_radius {
                return Err(SimulationError::ArcRadiusMismatch {
                    start_radius,
                    end_radius,
                });
            }
            let full = (eu - su).abs() < EPSILON && (ev - sv).abs() < EPSILON;
            (cu, cv, start_radius, full)
        } else if let Some(r) = radius {
            let (du, dv) = (eu - su, ev - sv);
            let chord = du.hypot(dv);
            if chord < EPSILON {
                return Err(SimulationError::ArcFullCircleRadius);
            }
            if r.abs() < EPSILON {
                return Err(SimulationError::ArcZeroRadius);
            }
            let half = chord / 2.0;
            let mut h_squared = r * r - half * half;
            if h_squared < 0.0 {
                if half - r.abs() > self.arc_tolerance {
                    return Err(SimulationError::ArcRadiusTooSmall { radius: r, chord });
                }
                h_squared = 0.0;
            }
            let h = h_squared.sqrt();
            // clockwise short arcs have their center right of the chord
            let mut side = if clockwise { -1.0 } else { 1.0 };
            if r < 0.0 {
                side = -side;
            }
            let (mu, mv) = ((su + eu) / 2.0, (sv + ev) / 2.0);
            let (left_u, left_v) = (-dv / chord, du / chord);
            let cu = mu + side * h * left_u;
            let cv = mv + side * h * left_v;
            (cu, cv, (su - cu).hypot(sv - cv), false)
        } else {
            return Err(SimulationError::ArcUnderspecified);
        };

        let start_angle = (sv - cv).atan2(su - cu);
        let end_angle = (ev - cv).atan2(eu - cu);
        let sweep = if full {
            if clockwise {
                -TAU
            } else {
                TAU
            }
        } else {
            let mut sweep = end_angle - start_angle;
            if clockwise {
                if sweep >= 0.0 {
                    sweep -= TAU;
                }
            } else if sweep <= 0.0 {
                sweep += TAU;
            }
            sweep.clamp(-TAU, TAU)
        };

        let mut center = *start;
        center.set(u, cu);
        center.set(v, cv);

        Ok(ArcGeometry {
            plane,
            center,
            radius: r,
            start_angle,
            sweep,
        })
    }
}

fn apply_auxiliary(state: &mut MachineState, action: &AuxiliaryAction) {
    match *action {
        AuxiliaryAction::SpindleSpeed(rpm) => state.spindle_speed = rpm,
        AuxiliaryAction::Spindle(spindle) => state.spindle = spindle,
        AuxiliaryAction::SelectTool(tool) => state.tool = tool,
        AuxiliaryAction::Coolant(coolant) => state.coolant = coolant,
        AuxiliaryAction::ProgramEnd => {
            state.program_ended = true;
            state.spindle = Default::default();
            state.coolant = Default::default();
        }
        AuxiliaryAction::Dwell { .. }
        | AuxiliaryAction::ToolChange
        | AuxiliaryAction::Pause { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nckit_core::WorkOffset;
    use std::f64::consts::PI;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    }

    fn at(x: f64, y: f64, z: f64) -> MachineState {
        MachineState {
            position: Position::new(x, y, z),
            ..Default::default()
        }
    }

    fn linear(words: AxisWords) -> Command {
        Command::new(
            0,
            CommandKind::LinearMove {
                rapid: false,
                target: words,
            },
        )
    }

    fn arc(
        clockwise: bool,
        words: AxisWords,
        center: CenterOffsets,
        radius: Option<f64>,
    ) -> Command {
        Command::new(
            0,
            CommandKind::ArcMove {
                clockwise,
                target: words,
                center,
                radius,
            },
        )
    }

    fn ij(i: f64, j: f64) -> CenterOffsets {
        CenterOffsets {
            i: Some(i),
            j: Some(j),
            k: None,
        }
    }

    #[test]
    fn test_linear_absolute_merges_axes() {
        let sim = Simulator::default();
        let applied = sim
            .apply(&at(1.0, 2.0, 3.0), &linear(AxisWords::new().with(Axis::X, 10.0)))
            .expect("valid move");
        let record = applied.motion.expect("motion");
        assert_eq!(record.kind, MotionKind::Linear);
        assert_eq!(record.start, Position::new(1.0, 2.0, 3.0));
        assert_eq!(record.end, Position::new(10.0, 2.0, 3.0));
        assert_eq!(record.state, applied.state);
        assert_eq!(applied.state.motion_mode, MotionKind::Linear);
    }

    #[test]
    fn test_incremental_moves() {
        let sim = Simulator::default();
        let mut state = at(1.0, 1.0, 0.0);
        state.distance_mode = DistanceMode::Incremental;
        let applied = sim
            .apply(&state, &linear(AxisWords::new().with(Axis::X, 2.0).with(Axis::Z, -1.0)))
            .expect("valid move");
        assert_eq!(applied.state.position, Position::new(3.0, 1.0, -1.0));
    }

    #[test]
    fn test_mode_commands_emit_no_motion() {
        let sim = Simulator::default();
        let state = MachineState::default();
        let applied = sim
            .apply(&state, &Command::new(0, CommandKind::SelectPlane(Plane::XZ)))
            .expect("valid");
        assert!(applied.motion.is_none());
        assert_eq!(applied.state.plane, Plane::XZ);
        assert_eq!(applied.state.position, state.position);
    }

    #[test]
    fn test_work_offset_and_axis_offset() {
        let mut config = InterpreterConfig::default();
        config.set_work_offset(WorkOffset::G55, Position::new(100.0, 0.0, 0.0));
        let sim = Simulator::new(&config);

        let state = sim
            .apply(
                &MachineState::default(),
                &Command::new(0, CommandKind::SelectWorkOffset(WorkOffset::G55)),
            )
            .expect("valid")
            .state;
        let state = sim
            .apply(&state, &linear(AxisWords::new().with(Axis::X, 5.0)))
            .expect("valid")
            .state;
        assert_eq!(state.position.x, 105.0);

        // G92 X0: the current point now reads as zero
        let state = sim
            .apply(
                &state,
                &Command::new(
                    0,
                    CommandKind::SetAxisOffset(AxisWords::new().with(Axis::X, 0.0)),
                ),
            )
            .expect("valid")
            .state;
        assert_eq!(state.position.x, 105.0);
        let moved = sim
            .apply(&state, &linear(AxisWords::new().with(Axis::X, 1.0)))
            .expect("valid")
            .state;
        assert_eq!(moved.position.x, 106.0);

        let cleared = sim
            .apply(&moved, &Command::new(0, CommandKind::ClearAxisOffset))
            .expect("valid")
            .state;
        let back = sim
            .apply(&cleared, &linear(AxisWords::new().with(Axis::X, 1.0)))
            .expect("valid")
            .state;
        assert_eq!(back.position.x, 101.0);
    }

    #[test]
    fn test_quarter_arc_center_form() {
        let sim = Simulator::default();
        let cmd = arc(
            false,
            AxisWords::new().with(Axis::X, 0.0).with(Axis::Y, 10.0),
            ij(-10.0, 0.0),
            None,
        );
        let record = sim
            .apply(&at(10.0, 0.0, 0.0), &cmd)
            .expect("valid arc")
            .motion
            .expect("motion");
        let geometry = record.arc.expect("arc geometry");
        assert_eq!(record.kind, MotionKind::ArcCounterClockwise);
        assert_close(geometry.radius, 10.0);
        assert_close(geometry.sweep, PI / 2.0);
        assert!(!geometry.is_clockwise());

        let mid = geometry.point_at(&record.start, &record.end, 0.5);
        assert_close(mid.x, 10.0 * (PI / 4.0).cos());
        assert_close(mid.y, 10.0 * (PI / 4.0).sin());
        assert_close(geometry.length(&record.start, &record.end), 5.0 * PI);
    }

    #[test]
    fn test_full_circle_helix() {
        let sim = Simulator::default();
        let cmd = arc(
            true,
            AxisWords::new().with(Axis::Z, -5.0),
            ij(5.0, 0.0),
            None,
        );
        let record = sim
            .apply(&MachineState::default(), &cmd)
            .expect("valid arc")
            .motion
            .expect("motion");
        let geometry = record.arc.expect("arc geometry");
        assert!(geometry.is_full_circle());
        assert!(geometry.is_clockwise());
        assert_eq!(record.end, Position::new(0.0, 0.0, -5.0));

        let half = geometry.point_at(&record.start, &record.end, 0.5);
        assert_close(half.x, 10.0);
        assert_close(half.y, 0.0);
        assert_close(half.z, -2.5);
    }

    #[test]
    fn test_radius_form_picks_short_or_long_arc() {
        let sim = Simulator::default();
        let r = 50f64.sqrt();
        let target = AxisWords::new().with(Axis::X, 10.0).with(Axis::Y, 0.0);

        let short = sim
            .apply(&MachineState::default(), &arc(true, target, CenterOffsets::default(), Some(r)))
            .expect("valid arc")
            .motion
            .and_then(|m| m.arc)
            .expect("arc geometry");
        assert_close(short.center.x, 5.0);
        assert_close(short.center.y, -5.0);
        assert_close(short.sweep, -PI / 2.0);

        let long = sim
            .apply(&MachineState::default(), &arc(true, target, CenterOffsets::default(), Some(-r)))
            .expect("valid arc")
            .motion
            .and_then(|m| m.arc)
            .expect("arc geometry");
        assert_close(long.center.y, 5.0);
        assert_close(long.sweep, -1.5 * PI);
    }

    #[test]
    fn test_radius_within_tolerance_becomes_semicircle() {
        let sim = Simulator::default();
        let target = AxisWords::new().with(Axis::X, 10.0);
        let semicircle = arc(false, target, CenterOffsets::default(), Some(4.99));
        let geometry = sim
            .apply(&MachineState::default(), &semicircle)
            .expect("valid arc")
            .motion
            .and_then(|m| m.arc)
            .expect("arc geometry");
        assert_close(geometry.radius, 5.0);
        assert_close(geometry.sweep, PI);

        let too_small = arc(false, target, CenterOffsets::default(), Some(4.0));
        let err = sim
            .apply(&MachineState::default(), &too_small)
            .unwrap_err();
        assert!(matches!(err, SimulationError::ArcRadiusTooSmall { .. }));
    }

    #[test]
    fn test_arc_errors() {
        let sim = Simulator::default();
        let origin = MachineState::default();
        let target = AxisWords::new().with(Axis::X, 10.0);

        assert_eq!(
            sim.apply(&origin, &arc(true, target, CenterOffsets::default(), None)),
            Err(SimulationError::ArcUnderspecified)
        );
        assert_eq!(
            sim.apply(&origin, &arc(true, AxisWords::new(), CenterOffsets::default(), Some(5.0))),
            Err(SimulationError::ArcFullCircleRadius)
        );
        let mismatched = arc(true, AxisWords::new().with(Axis::X, 11.0), ij(5.0, 0.0), None);
        assert!(matches!(
            sim.apply(&origin, &mismatched),
            Err(SimulationError::ArcRadiusMismatch { .. })
        ));
        // small mismatch is tolerated
        assert!(sim
            .apply(&origin, &arc(true, AxisWords::new().with(Axis::X, 10.01), ij(5.0, 0.0), None))
            .is_ok());

        let mut xz = origin;
        xz.plane = Plane::XZ;
        assert_eq!(
            sim.apply(&xz, &arc(true, target, ij(5.0, 0.0), None)),
            Err(SimulationError::InvalidArcWord {
                word: 'J',
                plane: Plane::XZ
            })
        );
    }

    #[test]
    fn test_center_offsets_win_over_radius() {
        let sim = Simulator::default();
        let target = AxisWords::new().with(Axis::X, 10.0);
        let geometry = sim
            .apply(&MachineState::default(), &arc(true, target, ij(5.0, 0.0), Some(100.0)))
            .expect("valid arc")
            .motion
            .and_then(|m| m.arc)
            .expect("arc geometry");
        assert_close(geometry.radius, 5.0);
    }

    #[test]
    fn test_non_finite_destination_rejected() {
        let sim = Simulator::default();
        let mut state = at(1.5e308, 0.0, 0.0);
        state.distance_mode = DistanceMode::Incremental;
        assert_eq!(
            sim.apply(&state, &linear(AxisWords::new().with(Axis::X, 1.0e308))),
            Err(SimulationError::NonFinitePosition { axis: Axis::X })
        );
    }

    #[test]
    fn test_program_end() {
        let sim = Simulator::default();
        let mut state = MachineState::default();
        state.spindle = nckit_core::SpindleState::Clockwise;
        let applied = sim
            .apply(
                &state,
                &Command::new(0, CommandKind::Auxiliary(AuxiliaryAction::ProgramEnd)),
            )
            .expect("valid");
        assert!(applied.state.program_ended);
        assert_eq!(applied.state.spindle, nckit_core::SpindleState::Off);
    }
}
