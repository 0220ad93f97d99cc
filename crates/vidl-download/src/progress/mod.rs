//! Concurrent progress rendering.
//!
//! Any number of transfer workers report progress for their file; one
//! rendering actor owns the terminal and all display state.
//!
//! # Architecture
//!
//! - **Handle**: [`ProgressRenderer`], cloned into every worker; translates
//!   each call into one event on the actor's queue
//! - **Actor**: a single task owning the bar set, display order, and the
//!   output stream; the only place rendering happens
//! - **Events**: the sole channel through which producers affect render
//!   state, which is why bar state needs no locks
//!
//! # Delivery tiers
//!
//! `update` is best-effort (dropped under queue pressure rather than
//! stalling a worker); `register`, `finish`, and `log` are delivered;
//! `flush` additionally waits for the actor to drain and render, giving an
//! "all output prior to this point is visible" barrier before process exit.

mod bar;
mod renderer;

pub use renderer::{BarId, ProgressRenderer};
