//! G-code interpretation
//!
//! This module provides:
//! - Line tokenizing
//! - Line parsing into structured commands
//! - Machine state tracking and move simulation
//! - The whole-program pipeline with cooperative cancellation

pub mod command;
pub mod parser;
pub mod pipeline;
pub mod simulator;
pub mod state;
pub mod tokenizer;

pub use command::{AuxiliaryAction, AxisWords, CenterOffsets, Command, CommandKind};
pub use parser::{LineParser, ParsedLine};
pub use pipeline::{run_pipeline, CancelToken, PipelineOutput};
pub use simulator::{Applied, ArcGeometry, MotionRecord, Simulator};
pub use state::{MachineState, ModalContext};
pub use tokenizer::{tokenize, Token, Tokenizer};
