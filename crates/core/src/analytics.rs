// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort telemetry sink.

use crate::job::JobDescriptor;

/// Receives job telemetry. Implementations must not fail or block.
pub trait Analytics: Send + Sync {
    /// A job process was launched, or failed to launch with `error`.
    fn job_started(&self, job: &JobDescriptor, error: Option<&str>);

    fn unexpected_error(&self, context: &str, error: &str);
}

/// Forwards telemetry to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl Analytics for TracingAnalytics {
    fn job_started(&self, job: &JobDescriptor, error: Option<&str>) {
        let extension = job.script_path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        tracing::debug!(
            job = %job.name,
            job_type = %job.job_type,
            host = %job.script_host.name,
            extension,
            error = error.unwrap_or_default(),
            "job started"
        );
    }

    fn unexpected_error(&self, context: &str, error: &str) {
        tracing::debug!(context, error, "unexpected error");
    }
}
