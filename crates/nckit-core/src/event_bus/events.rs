//! Event type definitions for the event bus.
//!
//! Events are the typed replacement for GUI callbacks: a renderer, editor,
//! scrubber or test harness subscribes to them without any UI framework.
//! Events are cloneable and serializable for logging/replay.

use serde::{Deserialize, Serialize};

use crate::data::MoveId;

/// Root event enum for all application events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// Job lifecycle events
    Job(JobEvent),
    /// Move selection events
    Selection(SelectionEvent),
    /// Playback control events
    Playback(PlaybackEvent),
}

impl AppEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Job(_) => EventCategory::Job,
            AppEvent::Selection(_) => EventCategory::Selection,
            AppEvent::Playback(_) => EventCategory::Playback,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Job(e) => e.description(),
            AppEvent::Selection(e) => e.description(),
            AppEvent::Playback(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Job lifecycle events.
    Job,
    /// Move selection events.
    Selection,
    /// Playback control events.
    Playback,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Job => write!(f, "Job"),
            EventCategory::Selection => write!(f, "Selection"),
            EventCategory::Playback => write!(f, "Playback"),
        }
    }
}

/// Job lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobEvent {
    /// New program text bound to the job.
    Loaded {
        /// Processing generation the program was loaded for.
        generation: u64,
        /// File identity of the program.
        identity: String,
        /// Number of source lines.
        line_count: usize,
    },
    /// Background processing started.
    ProcessingStarted {
        /// Processing generation.
        generation: u64,
        /// File identity of the program.
        identity: String,
    },
    /// Processing finished and a move list was published.
    ProcessingFinished {
        /// Generation of the published snapshot.
        generation: u64,
        /// File identity of the program.
        identity: String,
        /// Number of moves in the published list.
        move_count: usize,
        /// Number of per-line diagnostics.
        diagnostic_count: usize,
    },
    /// Processing ended without publishing.
    ProcessingFailed {
        /// Generation of the failed run.
        generation: u64,
        /// File identity of the program.
        identity: String,
        /// Error message describing the failure.
        reason: String,
    },
    /// Job returned to idle; previously published data is gone.
    Reset,
}

impl JobEvent {
    fn description(&self) -> String {
        match self {
            JobEvent::Loaded {
                identity,
                line_count,
                ..
            } => format!("Loaded {} ({} lines)", identity, line_count),
            JobEvent::ProcessingStarted {
                generation,
                identity,
            } => format!("Processing {} (run {})", identity, generation),
            JobEvent::ProcessingFinished {
                identity,
                move_count,
                diagnostic_count,
                ..
            } => format!(
                "Processed {}: {} moves, {} diagnostics",
                identity, move_count, diagnostic_count
            ),
            JobEvent::ProcessingFailed {
                identity, reason, ..
            } => format!("Processing {} failed: {}", identity, reason),
            JobEvent::Reset => "Job reset".to_string(),
        }
    }
}

/// Move selection events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionEvent {
    /// A move was selected by a renderer pick or a scrubber.
    MoveSelected {
        /// Generation of the move list the selection refers to.
        generation: u64,
        /// Index of the move in execution order.
        index: usize,
        /// Source line of the move.
        line: usize,
        /// Identifier of the move.
        move_id: MoveId,
    },
}

impl SelectionEvent {
    fn description(&self) -> String {
        match self {
            SelectionEvent::MoveSelected { index, line, .. } => {
                format!("Selected move {} (line {})", index, line)
            }
        }
    }
}

/// Playback control events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Play/pause toggled.
    PlayStateChanged {
        /// Whether playback is now running.
        playing: bool,
    },
    /// The scrubber range changed after a new move list was published.
    RangeChanged {
        /// Highest selectable index.
        maximum: usize,
    },
    /// Playback reached the last move.
    ReachedEnd,
}

impl PlaybackEvent {
    fn description(&self) -> String {
        match self {
            PlaybackEvent::PlayStateChanged { playing } => {
                format!("Playback {}", if *playing { "started" } else { "paused" })
            }
            PlaybackEvent::RangeChanged { maximum } => format!("Playback range 0..={}", maximum),
            PlaybackEvent::ReachedEnd => "Playback reached end".to_string(),
        }
    }
}
