//! Single-slot payload launch and observation core.
//!
//! This crate implements the control core behind the payload API: a device
//! runs at most one payload at a time, and everything else follows from that
//! constraint. The architecture keeps three concerns apart:
//!
//! - **[`guard`]**: the mutual-exclusion state machine over the single
//!   "a payload is running" fact. The only shared mutable state in the system.
//! - **[`launch`]**: admission (name canonicalization, catalog validation,
//!   guard acquisition) and dispatch of the execution onto a background path
//!   that releases the guard when it ends, however it ends.
//! - **[`tail`]**: a polling follower over the append-only payload log,
//!   independent of the guard and of execution.
//!
//! The [`catalog`] and [`execute`] providers are the seams to the outside:
//! tests script them, the server wires the directory- and process-backed
//! implementations from [`config`].

pub mod catalog;
pub mod config;
pub mod execute;
pub mod guard;
pub mod launch;
pub mod tail;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
