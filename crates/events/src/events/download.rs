use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FailureContext;

/// Archive download events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// Response headers received, body about to stream
    Started {
        url: String,
        total_size: Option<u64>,
    },

    /// Download retrying after a transient failure
    Retrying {
        url: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
        backoff_delay: Duration,
    },

    /// Archive written to its final location
    Completed {
        url: String,
        final_size: u64,
        total_time: Duration,
        hash: String,
    },

    /// Download gave up
    Failed {
        url: String,
        failure: FailureContext,
    },
}
