// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod history;
pub mod list;
pub mod logs;
pub mod run;
pub mod show;
pub mod toggle;
