/// Completion protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Input is still being consumed.
    #[default]
    Reading,
    /// Input is closed, units are still outstanding.
    Draining,
    /// Input is closed and every dispatched unit has reported.
    Done,
}

/// Final (or in-progress) aggregate numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tally {
    pub total: u64,
    pub units: u64,
    pub failed: u64,
    pub input_error: Option<String>,
}

/// Aggregate state shared, behind a lock or a channel funnel, by every worker.
///
/// `total` only grows and equals the sum of the results reported so far.
/// It is final once the phase reaches [`Phase::Done`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineState {
    phase: Phase,
    dispatched: u64,
    reported: u64,
    total: u64,
    failed: u64,
    input_error: Option<String>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn outstanding(&self) -> u64 {
        self.dispatched - self.reported
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn tally(&self) -> Tally {
        Tally {
            total: self.total,
            units: self.reported,
            failed: self.failed,
            input_error: self.input_error.clone(),
        }
    }

    pub(crate) fn record_dispatch(&mut self) {
        self.dispatched += 1;
    }

    /// Folds one result in. Returns false if nothing was outstanding.
    pub(crate) fn record_report(&mut self, count: u64, failed: bool) -> bool {
        if self.outstanding() == 0 {
            return false;
        }
        self.reported += 1;
        self.total += count;
        if failed {
            self.failed += 1;
        }
        true
    }

    pub(crate) fn close_input(&mut self, error: Option<String>) {
        self.phase = Phase::Draining;
        self.input_error = error;
    }

    pub(crate) fn mark_done(&mut self) {
        self.phase = Phase::Done;
    }
}
