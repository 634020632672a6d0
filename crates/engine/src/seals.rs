//! Row-addressed seal ledger operations.

use rakeline_core::{SealAdd, WorkingState};
use tracing::debug;

use crate::error::EngineError;

/// Append an empty seal slot to row `index`. A rejected add is a normal UI
/// guard and is reported, not raised.
pub fn add_seal(state: &mut WorkingState, index: usize) -> Result<SealAdd, EngineError> {
    let row = state.row_mut(index)?;
    let outcome = row.seals.add();
    if outcome == SealAdd::Rejected {
        debug!(position = %row.position, "seal add rejected: trailing slot empty");
    }
    Ok(outcome)
}

pub fn update_seal(
    state: &mut WorkingState,
    index: usize,
    slot: usize,
    value: impl Into<String>,
) -> Result<(), EngineError> {
    state.row_mut(index)?.seals.update(slot, value)?;
    Ok(())
}

/// Returns whether the slot became confirmed.
pub fn confirm_seal_on_blur(
    state: &mut WorkingState,
    index: usize,
    slot: usize,
) -> Result<bool, EngineError> {
    Ok(state.row_mut(index)?.seals.confirm_on_blur(slot))
}

pub fn remove_seal(state: &mut WorkingState, index: usize, slot: usize) -> Result<(), EngineError> {
    state.row_mut(index)?.seals.remove(slot)?;
    Ok(())
}
