// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline engine for stagehand.
//!
//! This crate orders independent, timed property mutations into
//! deterministic sequences:
//! - Sequential steps (`to`, `from`, `from_to`, `wait`)
//! - Parallel groups that start together and settle with their slowest member
//! - Play / pause / resume / stop / restart transport
//! - Repeat with a delay and start/complete/repeat notifications
//!
//! ## Architecture
//!
//! The engine is built on:
//! - An [`Animator`] that writes property sets onto opaque targets
//! - Tokio timers, one cancellable task per scheduled step
//! - A shared, lock-protected timeline state with an execution cursor
//!
//! Rendering, interpolation and layout are the animator's business; the
//! engine only decides *when* a property set is written.

pub mod animator;
pub mod config;
pub mod error;
pub mod factory;
pub mod memory;
pub mod property;
pub mod step;
pub mod timeline;
mod timers;

pub use animator::Animator;
pub use config::TimelineConfig;
pub use error::{AnimatorError, ConfigError, TimelineError};
pub use factory::TimelineFactory;
pub use memory::{Mutation, MutationKind, StyleRecorder};
pub use property::PropertySet;
pub use step::{Easing, Step, StepId, Timing};
pub use timeline::{
    GroupBuilder, PlayHandle, PlayOutcome, Timeline, TimelineId, TimelineOptions, Transport,
};
