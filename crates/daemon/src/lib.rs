// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebJobs daemon library
//!
//! Environment-derived configuration and the daemon lifecycle, shared by the
//! `wjd` binary and the `wj` CLI.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;

pub use env::EnvSettings;
pub use lifecycle::{startup, Config, Daemon, LifecycleError};
