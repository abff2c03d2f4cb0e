//! Aggregation strategies for per-unit results.
//!
//! Every strategy drives the same pure completion protocol from `tally_core`;
//! they differ only in how concurrent reports are serialized.

use std::sync::{Arc, Mutex, PoisonError};

use tally_core::{update, Effect, Msg, PartialResult, PipelineState, Tally, WorkUnit};
use tally_logging::{tally_debug, tally_error};
use tokio::sync::{mpsc, watch, Notify};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("aggregator stopped before all units reported")]
    Closed,
    #[error("aggregators disagree: primary total {primary}, secondary total {secondary}")]
    Mismatch { primary: u64, secondary: u64 },
}

/// Shared sink for work-unit results.
///
/// `dispatched` must be called for a unit before its worker can call `report`,
/// and `report` exactly once per dispatched unit.
#[async_trait::async_trait]
pub trait Aggregator: Send + Sync {
    fn dispatched(&self, unit: &WorkUnit);

    fn report(&self, result: PartialResult);

    /// No further units will be dispatched. `error` carries the input failure, if any.
    fn input_ended(&self, error: Option<String>);

    /// Waits until input has ended and every dispatched unit has reported.
    async fn total(&self) -> Result<Tally, AggregateError>;
}

fn dispatch_msg(unit: &WorkUnit) -> Msg {
    Msg::UnitDispatched { seq: unit.seq() }
}

fn end_msg(error: Option<String>) -> Msg {
    match error {
        Some(message) => Msg::InputFailed { message },
        None => Msg::InputEnded,
    }
}

/// Single-consumer funnel: every event goes through an unbounded channel to
/// one accumulator task, which is the only writer of the state.
///
/// Must be created inside a tokio runtime.
pub struct ChannelAggregator {
    tx: mpsc::UnboundedSender<Msg>,
    finished: watch::Receiver<Option<Tally>>,
}

impl ChannelAggregator {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (finished_tx, finished) = watch::channel(None);
        tokio::spawn(accumulate(rx, finished_tx));
        Self { tx, finished }
    }

    fn send(&self, msg: Msg) {
        if self.tx.send(msg).is_err() {
            tally_error!("channel aggregator accumulator has stopped");
        }
    }
}

impl Default for ChannelAggregator {
    fn default() -> Self {
        Self::new()
    }
}

async fn accumulate(mut rx: mpsc::UnboundedReceiver<Msg>, finished: watch::Sender<Option<Tally>>) {
    let mut state = PipelineState::new();
    while let Some(msg) = rx.recv().await {
        let (next, effects) = update(state, msg);
        state = next;
        for effect in effects {
            match effect {
                Effect::Draining { outstanding } => {
                    tally_debug!(
                        "channel aggregator draining, {} of {} outstanding",
                        outstanding,
                        state.dispatched()
                    );
                }
                Effect::Finished(tally) => {
                    finished.send_replace(Some(tally));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Aggregator for ChannelAggregator {
    fn dispatched(&self, unit: &WorkUnit) {
        self.send(dispatch_msg(unit));
    }

    fn report(&self, result: PartialResult) {
        self.send(Msg::UnitReported(result));
    }

    fn input_ended(&self, error: Option<String>) {
        self.send(end_msg(error));
    }

    async fn total(&self) -> Result<Tally, AggregateError> {
        let mut finished = self.finished.clone();
        let tally = finished
            .wait_for(Option::is_some)
            .await
            .map_err(|_| AggregateError::Closed)?;
        tally.clone().ok_or(AggregateError::Closed)
    }
}

/// Lock-guarded state: each reporting worker applies its own update under an
/// exclusive lock.
#[derive(Default)]
pub struct LockedAggregator {
    state: Mutex<PipelineState>,
    done: Notify,
}

impl LockedAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&self, msg: Msg) {
        let effects = {
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let (next, effects) = update(std::mem::take(&mut *guard), msg);
            *guard = next;
            effects
        };
        for effect in effects {
            match effect {
                Effect::Draining { outstanding } => {
                    tally_debug!("locked aggregator draining, {} outstanding", outstanding);
                }
                Effect::Finished(_) => self.done.notify_waiters(),
            }
        }
    }

    fn finished(&self) -> Option<Tally> {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        guard.is_done().then(|| guard.tally())
    }
}

#[async_trait::async_trait]
impl Aggregator for LockedAggregator {
    fn dispatched(&self, unit: &WorkUnit) {
        self.apply(dispatch_msg(unit));
    }

    fn report(&self, result: PartialResult) {
        self.apply(Msg::UnitReported(result));
    }

    fn input_ended(&self, error: Option<String>) {
        self.apply(end_msg(error));
    }

    async fn total(&self) -> Result<Tally, AggregateError> {
        loop {
            let notified = self.done.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a finish between the check
            // and the await is not missed.
            notified.as_mut().enable();
            if let Some(tally) = self.finished() {
                return Ok(tally);
            }
            notified.await;
        }
    }
}

/// Feeds two aggregators the same events and only yields a total they agree on.
pub struct CrossCheckAggregator {
    primary: Arc<dyn Aggregator>,
    secondary: Arc<dyn Aggregator>,
}

impl CrossCheckAggregator {
    pub fn new(primary: Arc<dyn Aggregator>, secondary: Arc<dyn Aggregator>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait::async_trait]
impl Aggregator for CrossCheckAggregator {
    fn dispatched(&self, unit: &WorkUnit) {
        self.primary.dispatched(unit);
        self.secondary.dispatched(unit);
    }

    fn report(&self, result: PartialResult) {
        self.primary.report(result.clone());
        self.secondary.report(result);
    }

    fn input_ended(&self, error: Option<String>) {
        self.primary.input_ended(error.clone());
        self.secondary.input_ended(error);
    }

    async fn total(&self) -> Result<Tally, AggregateError> {
        let (primary, secondary) = tokio::join!(self.primary.total(), self.secondary.total());
        let (primary, secondary) = (primary?, secondary?);
        if primary.total != secondary.total {
            tally_error!(
                "aggregate mismatch: {} vs {}",
                primary.total,
                secondary.total
            );
            return Err(AggregateError::Mismatch {
                primary: primary.total,
                secondary: secondary.total,
            });
        }
        Ok(primary)
    }
}
