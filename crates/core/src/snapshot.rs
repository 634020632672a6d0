use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{DraftKey, SnapshotId};
use crate::model::{Header, ModeFlags, Row, WorkingState};
use crate::seal::SealSlots;

/// Returns the current wall-clock time as milliseconds since Unix epoch.
pub fn now_ms() -> Result<u64, CoreError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|_| CoreError::InvalidData("system clock before epoch".into()))
}

/// The user-editable slice of one row, as kept in a local draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRow {
    pub position: u32,
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
    pub seal_slots: Vec<String>,
    pub confirmed_seals: Vec<usize>,
}

impl DraftRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            position: row.position.get(),
            identifier: row.identifier.clone(),
            wagon_type: row.wagon_type.clone(),
            weight: row.weight.clone(),
            target_count: row.target_count,
            commodity: row.commodity.clone(),
            remarks: row.remarks.clone(),
            stoppage_note: row.stoppage_note.clone(),
            group_id: row.group_id.clone(),
            destination: row.destination.clone(),
            counterparty_id: row.counterparty_id.clone(),
            seal_slots: row.seals.slots().to_vec(),
            confirmed_seals: row.seals.confirmed().iter().copied().collect(),
        }
    }

    pub fn has_user_data(&self) -> bool {
        let texts = [
            &self.identifier,
            &self.wagon_type,
            &self.weight,
            &self.commodity,
            &self.remarks,
            &self.stoppage_note,
            &self.group_id,
            &self.destination,
            &self.counterparty_id,
        ];
        texts.iter().any(|s| !s.trim().is_empty())
            || self.target_count.is_some()
            || self.seal_slots.iter().any(|s| !s.trim().is_empty())
    }

    /// Overlay the drafted intent onto a row loaded from the server.
    ///
    /// Counters, timestamps, split serial and completion stay as the server
    /// reported them. Drafted seals replace the server's only when the draft
    /// actually holds a seal number.
    pub fn overlay_onto(&self, row: &mut Row) {
        row.identifier = self.identifier.clone();
        row.wagon_type = self.wagon_type.clone();
        row.weight = self.weight.clone();
        row.target_count = self.target_count;
        row.commodity = self.commodity.clone();
        row.remarks = self.remarks.clone();
        row.stoppage_note = self.stoppage_note.clone();
        row.group_id = self.group_id.clone();
        row.destination = self.destination.clone();
        row.counterparty_id = self.counterparty_id.clone();
        if self.seal_slots.iter().any(|s| !s.trim().is_empty()) {
            row.seals = SealSlots::from_parts(
                self.seal_slots.clone(),
                self.confirmed_seals.iter().copied(),
            );
        }
    }
}

/// A locally persisted copy of in-progress edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub snapshot_id: SnapshotId,
    pub key: DraftKey,
    pub saved_at_ms: u64,
    pub header: Header,
    pub modes: ModeFlags,
    pub rows: Vec<DraftRow>,
}

impl DraftSnapshot {
    pub fn capture(key: DraftKey, state: &WorkingState, saved_at_ms: u64) -> Self {
        Self {
            snapshot_id: SnapshotId::new(),
            key,
            saved_at_ms,
            header: state.unit.header.clone(),
            modes: state.unit.modes,
            rows: state.rows().iter().map(DraftRow::from_row).collect(),
        }
    }

    pub fn has_user_data(&self) -> bool {
        self.rows.iter().any(DraftRow::has_user_data)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, CoreError> {
        rmp_serde::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, CoreError> {
        rmp_serde::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}
