//! Completion status: AUTO rows follow the counter formula, OVERRIDDEN rows
//! keep whatever the user chose.

use rakeline_core::wire::CounterRow;
use rakeline_core::{CoreError, Position, WorkingState};
use tracing::debug;

/// Recompute `complete` for the row at `index` unless it is overridden.
/// Returns whether the flag changed.
pub fn refresh_row(state: &mut WorkingState, index: usize) -> Result<bool, CoreError> {
    let position = state.row(index)?.position;
    if state.is_overridden(position) {
        return Ok(false);
    }
    let row = state.row_mut(index)?;
    let derived = row.auto_complete();
    let changed = row.complete != derived;
    row.complete = derived;
    Ok(changed)
}

/// Recompute every AUTO row. Returns the positions whose flag changed.
pub fn refresh_all(state: &mut WorkingState) -> Vec<Position> {
    let mut changed = Vec::new();
    for index in 0..state.len() {
        if let Ok(true) = refresh_row(state, index) {
            changed.push(Position::from_index(index));
        }
    }
    changed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub position: Position,
    pub complete: bool,
    pub overridden: bool,
}

/// The user flipped the completion control.
///
/// Flipping to `true` makes the row OVERRIDDEN. Flipping to `false` returns
/// it to AUTO and re-applies the formula at once, so a row whose counters
/// already satisfy its target reads complete again.
pub fn toggle_complete(
    state: &mut WorkingState,
    index: usize,
    complete: bool,
) -> Result<ToggleOutcome, CoreError> {
    let position = state.row(index)?.position;
    if complete {
        state.set_override(position);
        state.row_mut(index)?.complete = true;
    } else {
        state.clear_override(position);
        refresh_row(state, index)?;
    }
    let outcome = ToggleOutcome {
        position,
        complete: state.row(index)?.complete,
        overridden: state.is_overridden(position),
    };
    debug!(%position, complete = outcome.complete, overridden = outcome.overridden, "completion toggled");
    Ok(outcome)
}

/// Result of folding one counter refresh into the working state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterFold {
    /// Rows whose counters or timestamps were written.
    pub updated: Vec<Position>,
    /// AUTO rows whose `complete` flag flipped.
    pub recomputed: Vec<Position>,
    /// Counter positions with no matching row.
    pub unknown_positions: Vec<u32>,
}

/// Fold polled counters into the rows they address.
///
/// Only a change in `loaded_count` triggers recomputation; timestamps are
/// informational. Overridden rows keep their flag.
pub fn apply_counters(state: &mut WorkingState, counters: &[CounterRow]) -> CounterFold {
    let mut fold = CounterFold::default();
    let len = state.len();
    for counter in counters {
        let index = match Position::new(counter.position) {
            Ok(p) if p.index() < len => p.index(),
            _ => {
                fold.unknown_positions.push(counter.position);
                continue;
            }
        };
        let Ok(row) = state.row_mut(index) else {
            fold.unknown_positions.push(counter.position);
            continue;
        };

        let start = counter.load_start_time.clone().filter(|s| !s.is_empty());
        let end = counter.load_end_time.clone().filter(|s| !s.is_empty());
        let loaded_changed = row.loaded_count != counter.loaded_count;
        let touched = loaded_changed
            || row.unloaded_count != counter.unloaded_count
            || row.load_start_time != start
            || row.load_end_time != end;

        row.loaded_count = counter.loaded_count;
        row.unloaded_count = counter.unloaded_count;
        row.load_start_time = start;
        row.load_end_time = end;

        if touched {
            fold.updated.push(row.position);
        }
        if loaded_changed {
            if let Ok(true) = refresh_row(state, index) {
                fold.recomputed.push(Position::from_index(index));
            }
        }
    }
    fold
}
