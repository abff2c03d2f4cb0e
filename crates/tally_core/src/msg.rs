use crate::PartialResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The dispatcher admitted a unit through the gate.
    UnitDispatched { seq: crate::Seq },
    /// A worker finished a unit, successfully or not.
    UnitReported(PartialResult),
    /// The input stream reached its end; nothing more will be dispatched.
    InputEnded,
    /// Reading the input stream failed; nothing more will be dispatched.
    InputFailed { message: String },
}
