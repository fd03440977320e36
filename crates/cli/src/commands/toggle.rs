// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wj enable` / `wj disable` - Toggle a continuous job
//!
//! Only the `disable.job` sentinel is written here; a running `wjd` notices
//! the change and starts or stops the job.

use anyhow::Result;
use clap::Args;
use wj_core::JobType;

use crate::color;
use crate::context::Context;

#[derive(Args)]
pub struct ToggleArgs {
    /// Continuous job name
    pub name: String,
}

pub async fn enable(args: ToggleArgs, ctx: &Context) -> Result<()> {
    ctx.resolve(&args.name, Some(JobType::Continuous))?;
    ctx.continuous.enable_job(&args.name).await?;
    println!("Continuous job '{}' enabled", color::header(&args.name));
    Ok(())
}

pub async fn disable(args: ToggleArgs, ctx: &Context) -> Result<()> {
    ctx.resolve(&args.name, Some(JobType::Continuous))?;
    ctx.continuous.disable_job(&args.name).await?;
    println!("Continuous job '{}' disabled", color::header(&args.name));
    Ok(())
}
