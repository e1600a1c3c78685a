use crate::pipeline::batch_executor::{process_isolated, BatchExecutor, ProcessFn};
use crate::pipeline::batch_result::{ProcessError, SourceOutcome};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// Fans sources out to a fixed pool of scoped worker threads.
///
/// Layout: `feeder → [worker × N] → collector`
///
/// Jobs travel over a bounded channel so the feeder never runs far ahead
/// of the workers. Outcomes arrive in completion order and are re-sorted
/// by source index before returning.
pub struct ThreadedBatchExecutor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedBatchExecutor {
    /// `workers == 0` means one worker per available core.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            workers
        };
        Self {
            workers,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(&self, sources: &[String], process: &ProcessFn<'_>) -> Vec<SourceOutcome> {
        if sources.is_empty() {
            return Vec::new();
        }
        let workers = self.workers.clamp(1, sources.len());
        log::debug!("Processing {} source(s) on {workers} worker(s)", sources.len());

        let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, &str)>(self.channel_capacity);
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<SourceOutcome>();

        std::thread::scope(|scope| {
            for worker_id in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, source) in job_rx {
                        log::trace!("Worker {worker_id} took source {}", index + 1);
                        if result_tx.send(process_isolated(process, index, source)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            for (index, source) in sources.iter().enumerate() {
                if job_tx.send((index, source.as_str())).is_err() {
                    break;
                }
            }
            drop(job_tx);
        });

        collect_in_order(sources, result_rx.iter())
    }
}

/// Places each outcome at its source index. A slot left empty (worker lost
/// before reporting) becomes a failed outcome rather than a gap.
fn collect_in_order(
    sources: &[String],
    outcomes: impl Iterator<Item = SourceOutcome>,
) -> Vec<SourceOutcome> {
    let mut slots: Vec<Option<SourceOutcome>> = sources.iter().map(|_| None).collect();
    for outcome in outcomes {
        let index = outcome.index;
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(outcome);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                SourceOutcome::failed(
                    index,
                    sources[index].as_str(),
                    ProcessError::Panicked("worker exited without reporting".to_string()),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::batch_executor::tests::{ok_outcome, sources};
    use crate::pipeline::batch_executor::SequentialBatchExecutor;
    use rstest::rstest;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(16)]
    fn test_outcomes_follow_input_order(#[case] workers: usize) {
        // Early sources sleep longest so they finish last.
        let process = |index: usize, source: &str| {
            std::thread::sleep(Duration::from_millis((10 - index as u64) * 3));
            ok_outcome(index, source)
        };
        let outcomes = ThreadedBatchExecutor::new(workers).execute(&sources(10), &process);
        let indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
        assert!(outcomes.iter().zip(sources(10)).all(|(o, s)| o.source == s));
    }

    #[test]
    fn test_matches_sequential_results() {
        let process = |index: usize, source: &str| {
            if index % 3 == 0 {
                SourceOutcome::failed(
                    index,
                    source,
                    ProcessError::Panicked(format!("bad {index}")),
                )
            } else {
                ok_outcome(index, source)
            }
        };
        let threaded = ThreadedBatchExecutor::new(4).execute(&sources(9), &process);
        let sequential = SequentialBatchExecutor::new().execute(&sources(9), &process);
        let summary = |v: &[SourceOutcome]| -> Vec<(usize, bool)> {
            v.iter().map(|o| (o.index, o.processed().is_some())).collect()
        };
        assert_eq!(summary(&threaded), summary(&sequential));
    }

    #[test]
    fn test_uses_multiple_threads() {
        let seen = Mutex::new(HashSet::new());
        let process = |index: usize, source: &str| {
            seen.lock().unwrap().insert(std::thread::current().id());
            std::thread::sleep(Duration::from_millis(20));
            ok_outcome(index, source)
        };
        ThreadedBatchExecutor::new(4).execute(&sources(8), &process);
        assert!(seen.lock().unwrap().len() > 1);
    }

    #[test]
    fn test_panicking_source_does_not_abort_batch() {
        let process = |index: usize, source: &str| {
            if index == 2 {
                panic!("boom");
            }
            ok_outcome(index, source)
        };
        let outcomes = ThreadedBatchExecutor::new(2).execute(&sources(5), &process);
        assert_eq!(outcomes.len(), 5);
        assert!(matches!(outcomes[2].error(), Some(ProcessError::Panicked(_))));
        assert_eq!(outcomes.iter().filter(|o| o.processed().is_some()).count(), 4);
    }

    #[test]
    fn test_empty_batch_spawns_nothing() {
        let outcomes = ThreadedBatchExecutor::new(4).execute(&[], &ok_outcome);
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_zero_workers_uses_available_parallelism() {
        assert!(ThreadedBatchExecutor::new(0).workers() >= 1);
        assert_eq!(ThreadedBatchExecutor::new(3).workers(), 3);
    }

    #[test]
    fn test_missing_slot_becomes_failure() {
        let srcs = sources(3);
        let outcomes = collect_in_order(
            &srcs,
            vec![ok_outcome(2, "img2.png"), ok_outcome(0, "img0.png")].into_iter(),
        );
        assert!(outcomes[0].processed().is_some());
        assert!(matches!(outcomes[1].error(), Some(ProcessError::Panicked(_))));
        assert_eq!(outcomes[1].source, "img1.png");
        assert!(outcomes[2].processed().is_some());
    }
}
