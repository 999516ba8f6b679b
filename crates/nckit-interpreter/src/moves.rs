//! Simulated moves and the ordered move list

use nckit_core::{Axis, MotionKind, MoveId, Position};
use serde::{Deserialize, Serialize};

use crate::gcode::{ArcGeometry, MachineState};

/// One atomic machine move
///
/// Created once by the pipeline and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub id: MoveId,
    /// Position in execution order
    pub index: usize,
    /// 0-based source line that produced the move
    pub line: usize,
    pub kind: MotionKind,
    pub start: Position,
    pub end: Position,
    pub arc: Option<ArcGeometry>,
    /// Machine state after the move
    pub state: MachineState,
}

impl Move {
    pub fn is_rapid(&self) -> bool {
        self.kind == MotionKind::Rapid
    }

    /// Point at fraction `t` along the move
    pub fn point_at(&self, t: f64) -> Position {
        match &self.arc {
            Some(arc) => arc.point_at(&self.start, &self.end, t),
            None => {
                let t = t.clamp(0.0, 1.0);
                let mut point = self.start;
                for axis in Axis::ALL {
                    let a = self.start.get(axis);
                    point.set(axis, a + (self.end.get(axis) - a) * t);
                }
                point
            }
        }
    }

    /// Tool path length over X, Y and Z
    pub fn length(&self) -> f64 {
        match &self.arc {
            Some(arc) => arc.length(&self.start, &self.end),
            None => self.start.distance_xyz(&self.end),
        }
    }

    /// Whether this move has the same geometry and state as another
    ///
    /// Identifiers are ignored; they differ between processing runs.
    pub fn same_motion(&self, other: &Move) -> bool {
        self.index == other.index
            && self.line == other.line
            && self.kind == other.kind
            && self.start == other.start
            && self.end == other.end
            && self.arc == other.arc
            && self.state == other.state
    }
}

/// Axis-aligned XYZ bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    fn around(point: &Position) -> Self {
        Self {
            min: Position::new(point.x, point.y, point.z),
            max: Position::new(point.x, point.y, point.z),
        }
    }

    fn include(&mut self, point: &Position) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Edge lengths as (x, y, z)
    pub fn size(&self) -> (f64, f64, f64) {
        (
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }
}

/// Moves in execution order
///
/// Never reordered; shared between readers behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveList {
    moves: Vec<Move>,
}

impl MoveList {
    pub fn new(moves: Vec<Move>) -> Self {
        Self { moves }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Move> {
        self.moves.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves.iter()
    }

    pub fn as_slice(&self) -> &[Move] {
        &self.moves
    }

    /// Bounding box of the tool path, or `None` for an empty list
    ///
    /// Arcs contribute the full extent of their circle in the arc plane,
    /// which is enough for a renderer to frame the view.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.moves.first()?;
        let mut bounds = Bounds::around(&first.start);
        for mv in &self.moves {
            bounds.include(&mv.start);
            bounds.include(&mv.end);
            if let Some(arc) = &mv.arc {
                let (u, v, _) = arc.plane.axes();
                for (du, dv) in [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
                    let mut point = arc.center;
                    point.set(u, arc.center.get(u) + du * arc.radius);
                    point.set(v, arc.center.get(v) + dv * arc.radius);
                    bounds.include(&point);
                }
            }
        }
        Some(bounds)
    }

    /// Serialize the moves as a JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.moves)
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}
