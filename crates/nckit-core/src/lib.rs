//! # NCKit Core
//!
//! Core types, errors, and notifications for NCKit.
//! Provides the data model shared by the interpreter and its consumers,
//! the error taxonomy, and the typed event bus.

pub mod data;
pub mod error;
pub mod event_bus;

pub use data::{
    Axis, CoolantState, DistanceMode, MotionKind, MoveId, Plane, Position, SpindleState, Units,
    WorkOffset,
};

pub use error::{IndexError, JobError, LexError, ParseError, SimulationError};

pub use event_bus::{
    AppEvent, EventBus, EventBusConfig, EventBusError, EventCategory, EventFilter, JobEvent,
    PlaybackEvent, SelectionEvent, SubscriptionId,
};
