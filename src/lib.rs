//! # NCKit
//!
//! Headless NC program interpreter. Turns G-code text into an ordered,
//! selectable timeline of machine moves with per-line diagnostics.
//!
//! ## Architecture
//!
//! NCKit is organized as a workspace with multiple crates:
//!
//! 1. **nckit-core** - Shared data types, error enums, the event bus
//! 2. **nckit-interpreter** - Tokenizer, line parser, machine simulator,
//!    job orchestration, selection index and playback cursor
//! 3. **nckit-settings** - Configuration files
//! 4. **nckit** - Library facade and the command-line tool
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! let job = nckit::Job::default();
//! let snapshot = job.load("G1 X10 Y0\nG1 Y10", "part.nc")?.wait().await?;
//! for mv in snapshot.moves.iter() {
//!     println!("line {} ends at {}", mv.line, mv.end);
//! }
//! # Ok(())
//! # }
//! ```

pub mod report;

pub use nckit_core::{
    AppEvent, Axis, CoolantState, DistanceMode, EventBus, EventBusConfig, EventCategory,
    EventFilter, IndexError, JobError, JobEvent, LexError, MotionKind, MoveId, ParseError, Plane,
    PlaybackEvent, Position, SelectionEvent, SimulationError, SpindleState, Units, WorkOffset,
};

pub use nckit_interpreter::{
    run_pipeline, tokenize, Bounds, CancelToken, Command, CommandKind, Diagnostic,
    DiagnosticKind, InterpreterConfig, Job, JobSnapshot, JobState, LineParser, MachineState,
    Move, MoveList, Playback, ProcessingHandle, Program, SelectionIndex, Severity, Simulator,
    Token, DEFAULT_STEP_INTERVAL,
};

pub use nckit_settings::{Config, SettingsError};

pub use report::{Report, ReportFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// `RUST_LOG` wins over `level` when set. Logs go to stderr so reports on
/// stdout stay machine-readable.
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .json();
        registry.with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true);
        registry.with(fmt_layer).try_init()?;
    }

    Ok(())
}
