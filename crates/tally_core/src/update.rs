use crate::{Effect, Msg, Phase, PipelineState, UnitStatus};

/// Pure update function: applies a message to state and returns any effects.
///
/// Reports are folded into the total before the outstanding count drops, so
/// `Effect::Finished` can only be produced once every admitted unit is in the
/// total.
pub fn update(mut state: PipelineState, msg: Msg) -> (PipelineState, Vec<Effect>) {
    match msg {
        Msg::UnitDispatched { .. } => {
            // Dispatch after input closed is a caller bug; the unit would never
            // be waited for, so refuse to count it.
            if state.phase() != Phase::Reading {
                return (state, Vec::new());
            }
            state.record_dispatch();
            (state, Vec::new())
        }
        Msg::UnitReported(result) => {
            if state.is_done() {
                return (state, Vec::new());
            }
            let failed = result.status == UnitStatus::Failed;
            if !state.record_report(result.count, failed) {
                return (state, Vec::new());
            }
            let effects = finish_if_drained(&mut state);
            (state, effects)
        }
        Msg::InputEnded => close(state, None),
        Msg::InputFailed { message } => close(state, Some(message)),
    }
}

fn close(mut state: PipelineState, error: Option<String>) -> (PipelineState, Vec<Effect>) {
    if state.phase() != Phase::Reading {
        return (state, Vec::new());
    }
    state.close_input(error);
    let mut effects = finish_if_drained(&mut state);
    if effects.is_empty() {
        effects.push(Effect::Draining {
            outstanding: state.outstanding(),
        });
    }
    (state, effects)
}

fn finish_if_drained(state: &mut PipelineState) -> Vec<Effect> {
    if state.phase() == Phase::Draining && state.outstanding() == 0 {
        state.mark_done();
        vec![Effect::Finished(state.tally())]
    } else {
        Vec::new()
    }
}
