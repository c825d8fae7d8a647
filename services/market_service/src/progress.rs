//! Step-boundary progress reporting.
//!
//! Each workflow step emits a notification; the host decides how to
//! surface them (toasts, status bars, nothing). The default sink logs
//! through `tracing`.

use tracing::{error, info};

/// One user-visible step of a purchase or mint-copy workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressStep {
    Preparing,
    AwaitingSignature,
    Submitting,
    Confirming,
    UpdatingOwnership,
    MintingOnChain,
    RecordingHistory,
    Succeeded(String),
    Failed(String),
}

pub trait ProgressSink: Send + Sync {
    fn step(&self, step: ProgressStep);
}

/// Default sink: structured log lines instead of toasts.
#[derive(Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn step(&self, step: ProgressStep) {
        match step {
            ProgressStep::Succeeded(msg) => info!(%msg, "workflow succeeded"),
            ProgressStep::Failed(msg) => error!(%msg, "workflow failed"),
            other => info!(step = ?other, "workflow step"),
        }
    }
}
