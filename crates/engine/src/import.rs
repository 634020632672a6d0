//! Replace row contents from a spreadsheet producer's flat field maps.

use std::collections::BTreeMap;

use rakeline_core::{FieldValue, RowField, SealSlots, WorkingState};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::rows::blank_row_for;
use crate::status;

/// One imported row: the user-editable fields the producer filled in.
pub type ImportedRow = BTreeMap<RowField, String>;

/// Rewrite the working rows from `imported`.
///
/// The row count is padded or truncated to match. Each row's user-editable
/// fields are replaced; fields the producer left out are cleared, except the
/// group fields in single-group mode, which follow the header. Counters stay
/// with their position. An empty import is ignored.
pub fn apply_imported_rows(
    state: &mut WorkingState,
    imported: &[ImportedRow],
    config: &EngineConfig,
) -> Result<usize, EngineError> {
    if imported.is_empty() {
        return Ok(0);
    }
    // Validate counts first so a bad cell leaves the state untouched.
    for row in imported {
        if let Some(target) = row.get(&RowField::TargetCount) {
            FieldValue::text(target.as_str()).to_count(RowField::TargetCount.as_str())?;
        }
    }

    let unit = state.unit.clone();
    state.resize_rows(imported.len(), |p| blank_row_for(&unit, p, config));

    let single = unit.modes.single_group;
    let fixed = unit.modes.wagon_type_fixed;
    for (row, fields) in state.rows_mut().iter_mut().zip(imported) {
        for field in RowField::ALL {
            if single && field.is_group_scoped() {
                continue;
            }
            let value = fields.get(&field).cloned().unwrap_or_default();
            row.set(field, FieldValue::Text(value))?;
        }
        row.seals = SealSlots::new();
        if fixed {
            row.wagon_type = config.fixed_wagon_type.clone();
        }
    }
    status::refresh_all(state);

    info!(unit = %state.unit.key, rows = imported.len(), "rows imported");
    Ok(imported.len())
}
