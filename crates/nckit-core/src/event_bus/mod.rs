//! # Event Bus Module
//!
//! Typed notifications for decoupled communication between the job and its
//! consumers (renderer, editor, scrubber, headless harnesses).
//!
//! ## Overview
//!
//! - Publishers emit typed events without knowing subscribers
//! - Subscribers filter and receive events of interest
//! - Supports both sync handlers and async `broadcast` receivers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nckit_core::event_bus::{AppEvent, EventBus, EventCategory, EventFilter, JobEvent};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Job]),
//!     |event| {
//!         if let AppEvent::Job(JobEvent::ProcessingFinished { move_count, .. }) = event {
//!             println!("{} moves ready", move_count);
//!         }
//!     },
//! );
//!
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
