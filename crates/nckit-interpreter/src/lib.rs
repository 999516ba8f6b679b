//! # NCKit Interpreter
//!
//! Turns NC program text into an ordered, selectable timeline of machine
//! moves. Includes the tokenizer, line parser, machine state simulator,
//! background job orchestration, the selection index and a playback cursor.

pub mod config;
pub mod diagnostics;
pub mod gcode;
pub mod job;
pub mod moves;
pub mod playback;
pub mod program;
pub mod selection;

pub use config::{InterpreterConfig, DEFAULT_ARC_TOLERANCE};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use gcode::{
    run_pipeline, tokenize, Applied, ArcGeometry, AuxiliaryAction, AxisWords, CancelToken,
    CenterOffsets, Command, CommandKind, LineParser, MachineState, ModalContext, MotionRecord,
    ParsedLine, PipelineOutput, Simulator, Token, Tokenizer,
};
pub use job::{Job, JobSnapshot, JobState, ProcessingHandle};
pub use moves::{Bounds, Move, MoveList};
pub use playback::{Playback, DEFAULT_STEP_INTERVAL};
pub use program::{has_known_extension, Program, KNOWN_EXTENSIONS};
pub use selection::SelectionIndex;
