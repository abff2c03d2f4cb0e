use std::sync::Arc;

use tally_core::{PartialResult, WorkUnit};
use tally_logging::{tally_debug, tally_warn};

use crate::{Aggregator, Fetcher, GateSlot, OccurrenceCounter, PipelineEvent, ProgressSink};

/// A work unit together with the gate slot it was admitted under.
#[derive(Debug)]
pub struct Admitted {
    pub unit: WorkUnit,
    pub slot: GateSlot,
}

/// Fetch-and-count logic shared by every executor.
pub struct Worker {
    fetcher: Arc<dyn Fetcher>,
    counter: Arc<dyn OccurrenceCounter>,
    sink: Arc<dyn ProgressSink>,
}

impl Worker {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        counter: Arc<dyn OccurrenceCounter>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            fetcher,
            counter,
            sink,
        }
    }

    /// Fetches the unit's URL and counts pattern occurrences in the body.
    ///
    /// Fetch failures are logged and turned into a zero result; they never
    /// fail the pipeline.
    pub async fn process(&self, unit: WorkUnit) -> PartialResult {
        match self.fetcher.fetch(unit.url()).await {
            Ok(output) => {
                let count = self.counter.count(&output.bytes);
                let metadata = &output.metadata;
                if metadata.final_url != metadata.original_url {
                    tally_debug!("seq={} redirected to {}", unit.seq(), metadata.final_url);
                }
                tally_debug!(
                    "seq={} url={} bytes={} type={} count={}",
                    unit.seq(),
                    unit.url(),
                    metadata.byte_len,
                    metadata.content_type.as_deref().unwrap_or("-"),
                    count
                );
                self.sink.emit(PipelineEvent::Counted {
                    seq: unit.seq(),
                    url: unit.url().to_string(),
                    count,
                });
                unit.counted(count)
            }
            Err(error) => {
                tally_warn!("{:?} failure for {}: {}", error.class(), unit.url(), error);
                self.sink.emit(PipelineEvent::Failed {
                    seq: unit.seq(),
                    url: unit.url().to_string(),
                    error,
                });
                unit.failed()
            }
        }
    }
}

/// Runs one admitted unit to completion: process, report, then release.
///
/// The slot is released only after the result is in the aggregator, so a free
/// slot always implies an accounted result.
pub(crate) async fn execute_admitted(
    worker: &Worker,
    aggregator: &Arc<dyn Aggregator>,
    admitted: Admitted,
) {
    let Admitted { unit, slot } = admitted;
    let mut guard = ReportGuard {
        aggregator,
        pending: Some(unit.clone()),
    };
    let result = worker.process(unit).await;
    guard.pending = None;
    aggregator.report(result);
    drop(slot);
}

/// Reports a zero result if the worker unwinds before reporting.
struct ReportGuard<'a> {
    aggregator: &'a Arc<dyn Aggregator>,
    pending: Option<WorkUnit>,
}

impl Drop for ReportGuard<'_> {
    fn drop(&mut self) {
        if let Some(unit) = self.pending.take() {
            tally_warn!("worker for {} stopped before reporting", unit.url());
            self.aggregator.report(unit.failed());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;
    use std::sync::Mutex;

    use futures_util::FutureExt;
    use pretty_assertions::assert_eq;
    use tally_core::{Tally, UnitStatus};

    use super::*;
    use crate::{
        AggregateError, ConcurrencyGate, FailureKind, FetchError, FetchMetadata, FetchOutput,
        NullSink, SubstringCounter,
    };

    struct StaticFetcher;

    #[async_trait::async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
            match url {
                "panic" => panic!("fetch blew up"),
                "down" => Err(FetchError::new(FailureKind::Network, "refused")),
                _ => Ok(FetchOutput {
                    bytes: b"go go".to_vec(),
                    metadata: FetchMetadata {
                        original_url: url.to_string(),
                        final_url: url.to_string(),
                        content_type: None,
                        byte_len: 5,
                    },
                }),
            }
        }
    }

    /// Records the gate occupancy seen at the moment each result arrives.
    struct OccupancyRecorder {
        gate: ConcurrencyGate,
        seen: Mutex<Vec<(UnitStatus, u64, usize)>>,
    }

    #[async_trait::async_trait]
    impl Aggregator for OccupancyRecorder {
        fn dispatched(&self, _unit: &WorkUnit) {}

        fn report(&self, result: PartialResult) {
            let in_flight = self.gate.in_flight();
            self.seen
                .lock()
                .unwrap()
                .push((result.status, result.count, in_flight));
        }

        fn input_ended(&self, _error: Option<String>) {}

        async fn total(&self) -> Result<Tally, AggregateError> {
            Ok(Tally::default())
        }
    }

    async fn run_one(url: &str) -> (Vec<(UnitStatus, u64, usize)>, usize) {
        let gate = ConcurrencyGate::new(1);
        let recorder = Arc::new(OccupancyRecorder {
            gate: gate.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let aggregator: Arc<dyn Aggregator> = recorder.clone();
        let worker = Worker::new(
            Arc::new(StaticFetcher),
            Arc::new(SubstringCounter::new("go")),
            Arc::new(NullSink),
        );

        let slot = gate.acquire().await.unwrap();
        let admitted = Admitted {
            unit: WorkUnit::new(1, url),
            slot,
        };
        let _ = AssertUnwindSafe(execute_admitted(&worker, &aggregator, admitted))
            .catch_unwind()
            .await;

        let seen = recorder.seen.lock().unwrap().clone();
        (seen, gate.in_flight())
    }

    #[tokio::test]
    async fn result_is_reported_while_the_slot_is_still_held() {
        let (seen, after) = run_one("https://example.com").await;
        assert_eq!(seen, vec![(UnitStatus::Counted, 2, 1)]);
        assert_eq!(after, 0);
    }

    #[tokio::test]
    async fn failed_fetch_is_reported_before_release() {
        let (seen, after) = run_one("down").await;
        assert_eq!(seen, vec![(UnitStatus::Failed, 0, 1)]);
        assert_eq!(after, 0);
    }

    #[tokio::test]
    async fn panicking_fetch_is_reported_before_release() {
        let (seen, after) = run_one("panic").await;
        assert_eq!(seen, vec![(UnitStatus::Failed, 0, 1)]);
        assert_eq!(after, 0);
    }
}
