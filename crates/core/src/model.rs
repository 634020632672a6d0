use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::completion::auto_complete;
use crate::error::CoreError;
use crate::field_value::{FieldValue, HeaderField, RowField};
use crate::ids::{Position, UnitKey};
use crate::seal::SealSlots;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub group_id: String,
    pub destination: String,
    pub counterparty_id: String,
    pub commodity: String,
}

impl Header {
    pub fn get(&self, field: HeaderField) -> &str {
        match field {
            HeaderField::GroupId => &self.group_id,
            HeaderField::Destination => &self.destination,
            HeaderField::CounterpartyId => &self.counterparty_id,
            HeaderField::Commodity => &self.commodity,
        }
    }

    pub fn set(&mut self, field: HeaderField, value: String) {
        match field {
            HeaderField::GroupId => self.group_id = value,
            HeaderField::Destination => self.destination = value,
            HeaderField::CounterpartyId => self.counterparty_id = value,
            HeaderField::Commodity => self.commodity = value,
        }
    }

    pub fn has_group(&self) -> bool {
        !self.group_id.trim().is_empty()
    }
}

/// Mode flags chosen when a unit is first opened and persisted thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFlags {
    /// One shared header for all rows.
    pub single_group: bool,
    /// A fixed wagon type is force-applied to every row.
    pub wagon_type_fixed: bool,
}

impl Default for ModeFlags {
    fn default() -> Self {
        Self {
            single_group: true,
            wagon_type_fixed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitState {
    Unasked,
    AnsweredYes,
    AnsweredNo,
}

impl SplitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unasked => "unasked",
            Self::AnsweredYes => "answered_yes",
            Self::AnsweredNo => "answered_no",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "unasked" => Ok(Self::Unasked),
            "answered_yes" => Ok(Self::AnsweredYes),
            "answered_no" => Ok(Self::AnsweredNo),
            _ => Err(CoreError::InvalidData(format!("unknown split state: {s}"))),
        }
    }

    /// Resolve the split state of a unit.
    ///
    /// An explicit server-side state always wins. Older records only carry a
    /// boolean that defaults to false, so "no" and "never asked" look alike;
    /// for those, a false flag on a unit whose rows already hold user data is
    /// read as an earlier "no".
    pub fn resolve(explicit: Option<SplitState>, legacy_flag: Option<bool>, rows_have_data: bool) -> Self {
        if let Some(state) = explicit {
            return state;
        }
        match legacy_flag {
            Some(true) => Self::AnsweredYes,
            Some(false) if rows_have_data => Self::AnsweredNo,
            _ => Self::Unasked,
        }
    }

    pub fn is_answered(&self) -> bool {
        !matches!(self, Self::Unasked)
    }
}

/// Lifecycle status; owned by the backend and carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    Other(String),
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "" | "DRAFT" => Self::Draft,
            "PENDING_APPROVAL" => Self::PendingApproval,
            "APPROVED" => Self::Approved,
            "REJECTED" => Self::Rejected,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub key: UnitKey,
    pub header: Header,
    pub modes: ModeFlags,
    pub split_state: SplitState,
    pub status: LifecycleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub position: Position,

    // User-editable.
    pub identifier: String,
    pub wagon_type: String,
    pub weight: String,
    pub target_count: Option<u32>,
    pub commodity: String,
    pub remarks: String,
    pub stoppage_note: String,
    pub group_id: String,
    pub destination: String,
    pub counterparty_id: String,
    pub seals: SealSlots,

    // Server-derived, read-only to the engine.
    pub loaded_count: u32,
    pub unloaded_count: u32,
    pub load_start_time: Option<String>,
    pub load_end_time: Option<String>,
    /// Serial assigned by a split; set only on child records.
    pub split_serial: Option<String>,

    pub complete: bool,
}

impl Row {
    pub fn blank(position: Position) -> Self {
        Self {
            position,
            identifier: String::new(),
            wagon_type: String::new(),
            weight: String::new(),
            target_count: None,
            commodity: String::new(),
            remarks: String::new(),
            stoppage_note: String::new(),
            group_id: String::new(),
            destination: String::new(),
            counterparty_id: String::new(),
            seals: SealSlots::new(),
            loaded_count: 0,
            unloaded_count: 0,
            load_start_time: None,
            load_end_time: None,
            split_serial: None,
            complete: false,
        }
    }

    pub fn get(&self, field: RowField) -> FieldValue {
        let text = match field {
            RowField::TargetCount => return self.target_count.into(),
            RowField::Identifier => &self.identifier,
            RowField::WagonType => &self.wagon_type,
            RowField::Weight => &self.weight,
            RowField::Commodity => &self.commodity,
            RowField::Remarks => &self.remarks,
            RowField::StoppageNote => &self.stoppage_note,
            RowField::GroupId => &self.group_id,
            RowField::Destination => &self.destination,
            RowField::CounterpartyId => &self.counterparty_id,
        };
        FieldValue::Text(text.clone())
    }

    /// Write one user-editable field. Returns whether the stored value changed.
    pub fn set(&mut self, field: RowField, value: FieldValue) -> Result<bool, CoreError> {
        let slot = match field {
            RowField::TargetCount => {
                let count = value.to_count(field.as_str())?;
                let changed = self.target_count != count;
                self.target_count = count;
                return Ok(changed);
            }
            RowField::Identifier => &mut self.identifier,
            RowField::WagonType => &mut self.wagon_type,
            RowField::Weight => &mut self.weight,
            RowField::Commodity => &mut self.commodity,
            RowField::Remarks => &mut self.remarks,
            RowField::StoppageNote => &mut self.stoppage_note,
            RowField::GroupId => &mut self.group_id,
            RowField::Destination => &mut self.destination,
            RowField::CounterpartyId => &mut self.counterparty_id,
        };
        let text = value.into_text();
        let changed = *slot != text;
        *slot = text;
        Ok(changed)
    }

    pub fn auto_complete(&self) -> bool {
        auto_complete(self.loaded_count, self.target_count)
    }

    /// True when any user-editable field or seal slot holds a value.
    pub fn has_user_data(&self) -> bool {
        RowField::ALL.iter().any(|&f| !self.get(f).is_empty()) || self.seals.has_value()
    }
}

/// The unit and rows currently being edited.
///
/// Row positions are kept contiguous (`1..=N`) by every structural
/// operation, and override membership travels with its row.
#[derive(Debug, Clone)]
pub struct WorkingState {
    pub unit: Unit,
    rows: Vec<Row>,
    manual_override: BTreeSet<Position>,
    baseline: [u8; 32],
}

impl WorkingState {
    pub fn new(unit: Unit, rows: Vec<Row>, manual_override: BTreeSet<Position>) -> Self {
        let mut state = Self {
            unit,
            rows,
            manual_override,
            baseline: [0; 32],
        };
        for (i, row) in state.rows.iter_mut().enumerate() {
            row.position = Position::from_index(i);
        }
        let len = state.rows.len();
        state.manual_override.retain(|p| p.index() < len);
        state.mark_clean();
        state
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Mutable access to row contents. Positions must not be rewritten
    /// through this; use the structural operations instead.
    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Result<&Row, CoreError> {
        let len = self.rows.len();
        self.rows
            .get(index)
            .ok_or_else(|| CoreError::InvalidData(format!("row {index} out of range ({len} rows)")))
    }

    pub fn row_mut(&mut self, index: usize) -> Result<&mut Row, CoreError> {
        let len = self.rows.len();
        self.rows
            .get_mut(index)
            .ok_or_else(|| CoreError::InvalidData(format!("row {index} out of range ({len} rows)")))
    }

    pub fn manual_override(&self) -> &BTreeSet<Position> {
        &self.manual_override
    }

    pub fn is_overridden(&self, position: Position) -> bool {
        self.manual_override.contains(&position)
    }

    pub fn set_override(&mut self, position: Position) {
        self.manual_override.insert(position);
    }

    pub fn clear_override(&mut self, position: Position) {
        self.manual_override.remove(&position);
    }

    pub fn insert_row(&mut self, index: usize, row: Row) -> Result<(), CoreError> {
        if index > self.rows.len() {
            return Err(CoreError::InvalidData(format!(
                "insert index {index} out of range ({} rows)",
                self.rows.len()
            )));
        }
        let mut flags = self.override_flags();
        self.rows.insert(index, row);
        flags.insert(index, false);
        self.renumber(flags);
        Ok(())
    }

    pub fn push_row(&mut self, row: Row) {
        let mut flags = self.override_flags();
        self.rows.push(row);
        flags.push(false);
        self.renumber(flags);
    }

    pub fn remove_row(&mut self, index: usize) -> Result<Row, CoreError> {
        self.row(index)?;
        let mut flags = self.override_flags();
        let removed = self.rows.remove(index);
        flags.remove(index);
        self.renumber(flags);
        Ok(removed)
    }

    /// Truncate to `len` rows or pad with rows built by `make`.
    pub fn resize_rows(&mut self, len: usize, mut make: impl FnMut(Position) -> Row) {
        let mut flags = self.override_flags();
        self.rows.truncate(len);
        flags.truncate(len);
        while self.rows.len() < len {
            self.rows.push(make(Position::from_index(self.rows.len())));
            flags.push(false);
        }
        self.renumber(flags);
    }

    fn override_flags(&self) -> Vec<bool> {
        self.rows
            .iter()
            .map(|r| self.manual_override.contains(&r.position))
            .collect()
    }

    fn renumber(&mut self, flags: Vec<bool>) {
        self.manual_override.clear();
        for (i, (row, overridden)) in self.rows.iter_mut().zip(flags).enumerate() {
            row.position = Position::from_index(i);
            if overridden {
                self.manual_override.insert(row.position);
            }
        }
    }

    /// Digest of everything the user can change: header, modes, editable row
    /// fields, seals and the override set.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        let mut put = |s: &str| {
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        };
        let header = &self.unit.header;
        put(&header.group_id);
        put(&header.destination);
        put(&header.counterparty_id);
        put(&header.commodity);
        put(if self.unit.modes.single_group { "single" } else { "multi" });
        put(if self.unit.modes.wagon_type_fixed { "fixed" } else { "free" });
        for row in &self.rows {
            put(&row.position.to_string());
            for field in RowField::ALL {
                put(&row.get(field).into_text());
            }
            for (i, slot) in row.seals.slots().iter().enumerate() {
                put(slot);
                put(if row.seals.is_confirmed(i) { "+" } else { "-" });
            }
            put(if row.complete { "1" } else { "0" });
        }
        for position in &self.manual_override {
            put(&position.to_string());
        }
        *hasher.finalize().as_bytes()
    }

    /// True when user-visible content differs from the last clean point.
    pub fn is_dirty(&self) -> bool {
        self.fingerprint() != self.baseline
    }

    /// Record the current content as persisted or submitted.
    pub fn mark_clean(&mut self) {
        self.baseline = self.fingerprint();
    }
}
