//! Published processing result

use std::sync::Arc;

use crate::diagnostics::Diagnostic;
use crate::gcode::MachineState;
use crate::moves::MoveList;
use crate::program::Program;
use crate::selection::SelectionIndex;

/// Immutable result of one successful processing run
///
/// Published by swapping a single `Arc`, so readers either see the whole
/// snapshot or none of it.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub generation: u64,
    pub identity: String,
    pub program: Arc<Program>,
    pub moves: Arc<MoveList>,
    pub index: SelectionIndex,
    pub diagnostics: Vec<Diagnostic>,
    pub final_state: MachineState,
}

impl JobSnapshot {
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// Highest index a scrubber can select
    pub fn max_index(&self) -> usize {
        self.moves.len().saturating_sub(1)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Diagnostics reported for one source line
    pub fn diagnostics_on_line(&self, line: usize) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.line == Some(line))
    }
}
