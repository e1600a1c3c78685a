use std::panic::{self, AssertUnwindSafe};

use crate::pipeline::batch_result::{ProcessError, SourceOutcome};

/// Per-source work unit: `(index, descriptor) -> outcome`.
pub type ProcessFn<'a> = dyn Fn(usize, &str) -> SourceOutcome + Sync + 'a;

/// Abstracts how a batch of sources is scheduled.
///
/// Implementations must return exactly one outcome per source, ordered by
/// index, whatever order the work actually ran in.
pub trait BatchExecutor: Send + Sync {
    fn execute(&self, sources: &[String], process: &ProcessFn<'_>) -> Vec<SourceOutcome>;
}

/// Processes sources one after another on the calling thread.
pub struct SequentialBatchExecutor;

impl SequentialBatchExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SequentialBatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchExecutor for SequentialBatchExecutor {
    fn execute(&self, sources: &[String], process: &ProcessFn<'_>) -> Vec<SourceOutcome> {
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| process_isolated(process, index, source))
            .collect()
    }
}

/// Runs one unit of work, converting a panic into a failed outcome so a
/// single bad source cannot take down the batch.
pub fn process_isolated(process: &ProcessFn<'_>, index: usize, source: &str) -> SourceOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| process(index, source))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            log::error!("Source {} panicked: {reason}", index + 1);
            SourceOutcome::failed(index, source, ProcessError::Panicked(reason))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
