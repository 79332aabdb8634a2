use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Migration discovery and execution events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MigrationEvent {
    /// A discovery candidate was queried
    CandidateChecked { target: String, pending: usize },

    /// Pending migrations are about to run
    Started { target: String, count: usize },

    /// Migrations committed
    Completed { target: String, applied: usize },

    /// Migrations rolled back
    Failed {
        target: String,
        failure: FailureContext,
    },
}
