//! Program pipeline
//!
//! Runs tokenizer, line parser and simulator over a whole program as one
//! sequential fold, checking for cancellation between lines.

use nckit_core::{JobError, MoveId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::command::CommandKind;
use super::parser::LineParser;
use super::simulator::Simulator;
use super::state::MachineState;
use crate::config::InterpreterConfig;
use crate::diagnostics::Diagnostic;
use crate::moves::{Move, MoveList};
use crate::program::Program;

/// Cooperative cancellation flag shared between a job and its run
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one complete run produces
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub moves: MoveList,
    pub diagnostics: Vec<Diagnostic>,
    pub final_state: MachineState,
}

/// Process a whole program
///
/// Per-line problems become diagnostics and never stop the run. The only
/// failure is cancellation, checked before each line, so a line's commands
/// are applied completely or not at all.
pub fn run_pipeline(
    program: &Program,
    config: &InterpreterConfig,
    cancel: &CancelToken,
) -> Result<PipelineOutput, JobError> {
    let simulator = Simulator::new(config);
    let mut state = MachineState::from_config(config);
    let mut moves = Vec::new();
    let mut diagnostics = Vec::new();
    let mut warned_after_end = false;

    for (line, text) in program.lines() {
        if cancel.is_cancelled() {
            tracing::debug!(
                "Cancelled processing of {} at line {}",
                program.identity(),
                line
            );
            return Err(JobError::Cancelled {
                identity: program.identity().to_string(),
            });
        }

        let parsed = LineParser::parse_line(line, text, &state.modal_context());
        diagnostics.extend(parsed.diagnostics);

        // motion mode in force before the current group's G0-G3 word
        let mut mode_before_group = None;
        for command in &parsed.commands {
            if let CommandKind::SetMotionMode(_) = command.kind {
                mode_before_group = Some(state.motion_mode);
            }

            if command.is_motion() && state.program_ended && !warned_after_end {
                warned_after_end = true;
                diagnostics.push(Diagnostic::simulation_warning(
                    line,
                    "motion after program end",
                ));
            }

            match simulator.apply(&state, command) {
                Ok(applied) => {
                    if let Some(record) = applied.motion {
                        tracing::trace!("line {}: {} -> {}", line, record.start, record.end);
                        moves.push(Move {
                            id: MoveId::new(),
                            index: moves.len(),
                            line,
                            kind: record.kind,
                            start: record.start,
                            end: record.end,
                            arc: record.arc,
                            state: record.state,
                        });
                    }
                    if command.is_motion() {
                        mode_before_group = None;
                    }
                    state = applied.state;
                }
                Err(err) => {
                    tracing::trace!("line {}: skipped {}: {}", line, command, err);
                    diagnostics.push(Diagnostic::simulation(line, &err));
                    // a skipped move must not leave its motion mode behind
                    if command.is_motion() {
                        if let Some(mode) = mode_before_group.take() {
                            state.motion_mode = mode;
                        }
                    }
                }
            }
        }
    }

    tracing::debug!(
        "Processed {}: {} lines, {} moves, {} diagnostics",
        program.identity(),
        program.line_count(),
        moves.len(),
        diagnostics.len()
    );

    Ok(PipelineOutput {
        moves: MoveList::new(moves),
        diagnostics,
        final_state: state,
    })
}
