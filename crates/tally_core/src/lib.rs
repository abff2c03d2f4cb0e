//! Tally core: pure completion protocol and work-unit model.
mod effect;
mod input;
mod msg;
mod state;
mod unit;
mod update;

pub use effect::Effect;
pub use input::urls_in_line;
pub use msg::Msg;
pub use state::{Phase, PipelineState, Tally};
pub use unit::{PartialResult, Seq, UnitStatus, WorkUnit};
pub use update::update;
