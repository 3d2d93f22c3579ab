//! Container runtime client for Flotilla.
//!
//! The lifecycle engine never talks to a container runtime directly; it
//! goes through the [`RuntimeClient`](backend::RuntimeClient) contract
//! defined here. Three implementations ship with the crate:
//!
//! - [`LocalRuntime`](backend::local::LocalRuntime): a JSON state index on disk.
//! - [`InMemoryRuntime`](backend::memory::InMemoryRuntime): a scriptable fake.
//! - [`DryRunClient`](backend::dry_run::DryRunClient): passes reads through and
//!   turns mutations into no-ops.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod state;
