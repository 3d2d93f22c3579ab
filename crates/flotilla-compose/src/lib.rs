//! # flotilla-compose
//!
//! Bulk lifecycle operations over the containers of a project.
//!
//! Every mutating operation follows the same pipeline:
//!
//! 1. **Directory** ([`directory`]): list the project's containers by label.
//! 2. **Selection** ([`containers`]): narrow to the requested services.
//! 3. **Reconciliation** ([`reconcile`]): re-inspect each candidate and keep
//!    the ones whose live state admits the operation.
//! 4. **Confirmation** ([`prompt`]): ask before destructive operations.
//! 5. **Execution** ([`executor`]): mutate all containers concurrently,
//!    streaming [`progress`] events and reporting the first failure in
//!    discovery order.
//!
//! A container that disappears at any point is treated as already handled.
//! The entry point is [`ComposeService`](service::ComposeService).

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod containers;
pub mod directory;
pub mod executor;
pub mod graph;
pub mod kill;
pub mod pause;
pub mod progress;
pub mod project;
pub mod prompt;
pub mod ps;
pub mod reconcile;
pub mod remove;
pub mod service;
pub mod stop;
