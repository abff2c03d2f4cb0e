use std::io;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tally_core::{urls_in_line, Seq, WorkUnit};
use tally_logging::{tally_error, tally_warn};

use crate::{Admitted, Aggregator, ConcurrencyGate, WorkerPool};

/// Why dispatch stopped reading input.
#[derive(Debug)]
pub enum StopReason {
    EndOfInput,
    InputError(io::Error),
    GateClosed,
    PoolClosed,
}

impl StopReason {
    /// Message recorded in the tally for anything but a clean end of input.
    pub fn error_message(&self) -> Option<String> {
        match self {
            StopReason::EndOfInput => None,
            StopReason::InputError(err) => Some(format!("input read failed: {err}")),
            StopReason::GateClosed => Some("concurrency gate closed".to_string()),
            StopReason::PoolClosed => Some("worker pool stopped accepting work".to_string()),
        }
    }
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub dispatched: u64,
    pub stop: StopReason,
}

/// Turns a line stream into gated work units.
pub struct Dispatcher<'a, P: WorkerPool + ?Sized> {
    gate: &'a ConcurrencyGate,
    pool: &'a mut P,
    aggregator: Arc<dyn Aggregator>,
}

impl<'a, P: WorkerPool + ?Sized> Dispatcher<'a, P> {
    pub fn new(
        gate: &'a ConcurrencyGate,
        pool: &'a mut P,
        aggregator: Arc<dyn Aggregator>,
    ) -> Self {
        Self {
            gate,
            pool,
            aggregator,
        }
    }

    /// Reads lines until the stream ends or fails, admitting one unit per URL.
    ///
    /// Each URL waits for a gate slot before its unit is created, so reading
    /// stalls while `k` units are in flight. The caller still owns the
    /// completion protocol: it must end input on the aggregator and drain the
    /// pool afterwards.
    pub async fn run<S>(self, mut lines: S) -> DispatchOutcome
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        let mut seq: Seq = 0;
        let stop = 'read: loop {
            let line = match lines.next().await {
                None => break StopReason::EndOfInput,
                Some(Err(err)) => {
                    tally_warn!("stopping dispatch after input error: {}", err);
                    break StopReason::InputError(err);
                }
                Some(Ok(line)) => line,
            };

            for url in urls_in_line(&line) {
                let slot = match self.gate.acquire().await {
                    Ok(slot) => slot,
                    Err(err) => {
                        tally_error!("{}", err);
                        break 'read StopReason::GateClosed;
                    }
                };
                seq += 1;
                let unit = WorkUnit::new(seq, url);
                self.aggregator.dispatched(&unit);
                if let Err(rejected) = self.pool.execute(Admitted { unit, slot }).await {
                    // Already outstanding in the aggregator; settle it so the
                    // total can still complete.
                    let Admitted { unit, slot } = rejected;
                    tally_error!("worker pool rejected {}", unit.url());
                    self.aggregator.report(unit.failed());
                    drop(slot);
                    break 'read StopReason::PoolClosed;
                }
            }
        };

        DispatchOutcome {
            dispatched: seq,
            stop,
        }
    }
}
