// quarry-common/src/pipeline.rs
// Shared install pipeline event types. Events carry error text as String so
// they stay cheap to clone across the broadcast channel.

use serde::{Deserialize, Serialize};

use crate::error::QuarryError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    PipelineStarted {
        total_jobs: usize,
    },
    PipelineFinished {
        duration_secs: f64,
        success_count: usize,
        fail_count: usize,
        skip_count: usize,
    },
    JobProcessingStarted {
        target_id: String,
    },
    JobSuccess {
        target_id: String,
    },
    /// The prefix for this (name, version) already existed; nothing was
    /// reinstalled.
    JobReused {
        target_id: String,
    },
    JobFailed {
        target_id: String,
        error: String,
    },
    /// A dependency failed, so this node was never attempted.
    JobSkipped {
        target_id: String,
        failed_dependency: String,
    },
    LogInfo {
        message: String,
    },
    LogWarn {
        message: String,
    },
}

impl PipelineEvent {
    pub fn job_failed(target_id: String, error: &QuarryError) -> Self {
        PipelineEvent::JobFailed {
            target_id,
            error: error.to_string(),
        }
    }
}
