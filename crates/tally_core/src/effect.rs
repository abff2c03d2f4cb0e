use crate::Tally;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Input is closed but units are still outstanding.
    Draining { outstanding: u64 },
    /// Every dispatched unit has reported and input is closed. Emitted once.
    Finished(Tally),
}
