//! Single-row edits, forward propagation to later rows, and header edits.

use rakeline_core::{FieldValue, HeaderField, ModeFlags, Position, RowField, WorkingState};
use tracing::debug;

use crate::error::EngineError;
use crate::status;

/// Fields whose edits carry forward into every later row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CascadeField {
    WagonType,
    Weight,
    TargetCount,
    Commodity,
    GroupId,
    Destination,
    CounterpartyId,
}

impl CascadeField {
    pub fn row_field(&self) -> RowField {
        match self {
            Self::WagonType => RowField::WagonType,
            Self::Weight => RowField::Weight,
            Self::TargetCount => RowField::TargetCount,
            Self::Commodity => RowField::Commodity,
            Self::GroupId => RowField::GroupId,
            Self::Destination => RowField::Destination,
            Self::CounterpartyId => RowField::CounterpartyId,
        }
    }

    pub fn from_row_field(field: RowField) -> Option<Self> {
        match field {
            RowField::WagonType => Some(Self::WagonType),
            RowField::Weight => Some(Self::Weight),
            RowField::TargetCount => Some(Self::TargetCount),
            RowField::Commodity => Some(Self::Commodity),
            RowField::GroupId => Some(Self::GroupId),
            RowField::Destination => Some(Self::Destination),
            RowField::CounterpartyId => Some(Self::CounterpartyId),
            RowField::Identifier | RowField::Remarks | RowField::StoppageNote => None,
        }
    }

    /// Group and counterparty only cascade when rows carry their own group.
    /// Destination cascades in both modes.
    fn multi_group_only(&self) -> bool {
        matches!(self, Self::GroupId | Self::CounterpartyId)
    }
}

/// The cascade-eligible fields for one pair of mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSet {
    single_group: bool,
}

impl CascadeSet {
    pub fn for_modes(modes: ModeFlags) -> Self {
        Self {
            single_group: modes.single_group,
        }
    }

    pub fn contains(&self, field: CascadeField) -> bool {
        !(self.single_group && field.multi_group_only())
    }

    pub fn resolve(&self, field: RowField) -> Option<CascadeField> {
        CascadeField::from_row_field(field).filter(|f| self.contains(*f))
    }
}

/// Rows affected by one edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// Rows whose edited field changed value.
    pub touched: Vec<Position>,
    /// Rows whose group-dependent fields were cleared.
    pub cleared: Vec<Position>,
    /// Rows whose `complete` flag was recomputed to a new value.
    pub status_changed: Vec<Position>,
}

impl EditOutcome {
    pub fn is_noop(&self) -> bool {
        self.touched.is_empty() && self.cleared.is_empty()
    }
}

/// Reject edits the unit's mode does not allow.
pub fn check_editable(modes: ModeFlags, field: RowField) -> Result<(), EngineError> {
    let locked = match field {
        RowField::WagonType => modes.wagon_type_fixed,
        RowField::GroupId | RowField::CounterpartyId => modes.single_group,
        _ => false,
    };
    if locked {
        debug!(field = field.as_str(), "edit rejected: field locked");
        return Err(EngineError::FieldLocked {
            field: field.as_str(),
        });
    }
    Ok(())
}

/// Set `field` on row `index` and, for cascade-eligible fields, on every
/// later row. Rows before `index` are never touched.
///
/// A row whose group id moves from one non-empty value to a different
/// non-empty value has its group-dependent fields cleared first.
pub fn apply_edit(
    state: &mut WorkingState,
    index: usize,
    field: RowField,
    value: FieldValue,
) -> Result<EditOutcome, EngineError> {
    check_editable(state.unit.modes, field)?;
    state.row(index)?;
    if field == RowField::TargetCount {
        value.to_count(field.as_str())?;
    }

    let end = match CascadeSet::for_modes(state.unit.modes).resolve(field) {
        Some(_) => state.len(),
        None => index + 1,
    };

    let mut outcome = EditOutcome::default();
    for i in index..end {
        let mut target_changed = false;
        {
            let row = state.row_mut(i)?;
            if field == RowField::GroupId && moves_group(&row.group_id, &value) {
                for dependent in RowField::GROUP_DEPENDENT {
                    if dependent == RowField::TargetCount {
                        target_changed |= row.target_count.is_some();
                    }
                    row.set(dependent, FieldValue::Null)?;
                }
                outcome.cleared.push(row.position);
            }
            if row.set(field, value.clone())? {
                outcome.touched.push(row.position);
                target_changed |= field == RowField::TargetCount;
            }
        }
        if target_changed && status::refresh_row(state, i)? {
            outcome.status_changed.push(Position::from_index(i));
        }
    }

    debug!(
        unit = %state.unit.key,
        field = field.as_str(),
        index,
        touched = outcome.touched.len(),
        cleared = outcome.cleared.len(),
        "row edit applied"
    );
    Ok(outcome)
}

fn moves_group(previous: &str, value: &FieldValue) -> bool {
    let previous = previous.trim();
    let FieldValue::Text(next) = value else {
        return false;
    };
    let next = next.trim();
    !previous.is_empty() && !next.is_empty() && previous != next
}

/// Edit one header field. In single-group mode a destination edit is
/// carried onto every row.
pub fn apply_header_edit(
    state: &mut WorkingState,
    field: HeaderField,
    value: impl Into<String>,
) -> Result<EditOutcome, EngineError> {
    let value = value.into();
    state.unit.header.set(field, value.clone());

    let mut outcome = EditOutcome::default();
    if state.unit.modes.single_group && field == HeaderField::Destination {
        for row in state.rows_mut() {
            if row.destination != value {
                row.destination = value.clone();
                outcome.touched.push(row.position);
            }
        }
    }
    debug!(unit = %state.unit.key, field = field.as_str(), rows = outcome.touched.len(), "header edit applied");
    Ok(outcome)
}
