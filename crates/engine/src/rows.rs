//! Structural row operations. Every operation leaves positions contiguous
//! and keeps override membership attached to its row.

use rakeline_core::{Position, Row, SealSlots, Unit, WorkingState};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// A blank row prefilled the way a new row starts out in this unit: group
/// fields from the header in multi-group mode, and the fixed wagon type.
pub fn blank_row_for(unit: &Unit, position: Position, config: &EngineConfig) -> Row {
    let mut row = Row::blank(position);
    if !unit.modes.single_group {
        row.group_id = unit.header.group_id.clone();
        row.destination = unit.header.destination.clone();
        row.counterparty_id = unit.header.counterparty_id.clone();
    }
    if unit.modes.wagon_type_fixed {
        row.wagon_type = config.fixed_wagon_type.clone();
    }
    row
}

/// Append a blank row. Returns its position.
pub fn add_row(state: &mut WorkingState, config: &EngineConfig) -> Position {
    let position = Position::from_index(state.len());
    let row = blank_row_for(&state.unit, position, config);
    state.push_row(row);
    debug!(unit = %state.unit.key, %position, "row added");
    position
}

/// Insert a copy of row `index` directly after it. The copy keeps the
/// descriptive fields but starts with no identifier, seals, counters or
/// completion.
pub fn duplicate_row(state: &mut WorkingState, index: usize) -> Result<Position, EngineError> {
    let source = state.row(index)?;
    let mut copy = source.clone();
    copy.identifier.clear();
    copy.seals = SealSlots::new();
    copy.loaded_count = 0;
    copy.unloaded_count = 0;
    copy.load_start_time = None;
    copy.load_end_time = None;
    copy.split_serial = None;
    copy.complete = false;

    state.insert_row(index + 1, copy)?;
    let position = Position::from_index(index + 1);
    debug!(unit = %state.unit.key, source = index + 1, %position, "row duplicated");
    Ok(position)
}

/// Remove row `index`. The last remaining row cannot be removed.
pub fn delete_row(state: &mut WorkingState, index: usize) -> Result<Row, EngineError> {
    if state.len() <= 1 {
        return Err(EngineError::LastRow);
    }
    let removed = state.remove_row(index)?;
    debug!(unit = %state.unit.key, position = %removed.position, remaining = state.len(), "row deleted");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rakeline_core::{Header, LifecycleStatus, ModeFlags, SplitState, UnitId, UnitKey};

    use super::*;

    fn state(single_group: bool, n: usize) -> WorkingState {
        let unit = Unit {
            key: UnitKey::new(UnitId::new("2025-26/02/001")),
            header: Header {
                group_id: "IND-1".into(),
                destination: "PUNE".into(),
                ..Header::default()
            },
            modes: ModeFlags {
                single_group,
                wagon_type_fixed: true,
            },
            split_state: SplitState::Unasked,
            status: LifecycleStatus::Draft,
        };
        let rows = (0..n)
            .map(|i| {
                let mut row = Row::blank(Position::from_index(i));
                row.identifier = format!("W{}", i + 1);
                row
            })
            .collect();
        WorkingState::new(unit, rows, BTreeSet::new())
    }

    fn positions(state: &WorkingState) -> Vec<u32> {
        state.rows().iter().map(|r| r.position.get()).collect()
    }

    #[test]
    fn add_prefills_from_mode() {
        let config = EngineConfig::default();
        let mut ws = state(false, 1);
        let position = add_row(&mut ws, &config);
        assert_eq!(position.get(), 2);
        let row = &ws.rows()[1];
        assert_eq!(row.group_id, "IND-1");
        assert_eq!(row.destination, "PUNE");
        assert_eq!(row.wagon_type, "HL");

        let mut ws = state(true, 1);
        add_row(&mut ws, &config);
        assert_eq!(ws.rows()[1].group_id, "");
    }

    #[test]
    fn duplicate_resets_identity_and_counters() {
        let mut ws = state(true, 2);
        {
            let row = &mut ws.rows_mut()[0];
            row.commodity = "DAP".into();
            row.loaded_count = 9;
            row.complete = true;
            row.seals.update(0, "S1").unwrap();
        }
        ws.set_override(Position::from_index(0));

        let position = duplicate_row(&mut ws, 0).unwrap();
        assert_eq!(position.get(), 2);
        assert_eq!(positions(&ws), vec![1, 2, 3]);

        let copy = &ws.rows()[1];
        assert_eq!(copy.commodity, "DAP");
        assert_eq!(copy.identifier, "");
        assert_eq!(copy.loaded_count, 0);
        assert!(!copy.complete);
        assert!(!copy.seals.has_value());
        assert!(ws.is_overridden(Position::new(1).unwrap()));
        assert!(!ws.is_overridden(Position::new(2).unwrap()));
        assert_eq!(ws.rows()[2].identifier, "W2");
    }

    #[test]
    fn delete_renumbers_and_moves_overrides() {
        let mut ws = state(true, 3);
        ws.set_override(Position::new(3).unwrap());
        let removed = delete_row(&mut ws, 0).unwrap();
        assert_eq!(removed.identifier, "W1");
        assert_eq!(positions(&ws), vec![1, 2]);
        assert!(ws.is_overridden(Position::new(2).unwrap()));
        assert_eq!(ws.manual_override().len(), 1);
    }

    #[test]
    fn last_row_cannot_be_deleted() {
        let mut ws = state(true, 1);
        assert!(matches!(delete_row(&mut ws, 0), Err(EngineError::LastRow)));
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn contiguity_survives_mixed_operations() {
        let config = EngineConfig::default();
        let mut ws = state(false, 2);
        add_row(&mut ws, &config);
        duplicate_row(&mut ws, 1).unwrap();
        delete_row(&mut ws, 0).unwrap();
        duplicate_row(&mut ws, 2).unwrap();
        delete_row(&mut ws, 3).unwrap();
        add_row(&mut ws, &config);
        let n = ws.len() as u32;
        assert_eq!(positions(&ws), (1..=n).collect::<Vec<_>>());
    }
}
