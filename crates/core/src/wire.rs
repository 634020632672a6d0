//! Request and response bodies exchanged with the backend.

use serde::{Deserialize, Serialize};

use crate::model::{ModeFlags, SplitState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerHeader {
    pub group_id: Option<String>,
    pub destination: Option<String>,
    pub counterparty_id: Option<String>,
    pub commodity: Option<String>,
    pub single_group: Option<bool>,
    pub wagon_type_fixed: Option<bool>,
    /// Explicit split decision, when the backend records one.
    pub split_state: Option<SplitState>,
    /// Older records only carry this boolean, which defaults to false.
    pub has_sequential_serials: Option<bool>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerRow {
    pub position: Option<u32>,
    pub identifier: Option<String>,
    pub wagon_type: Option<String>,
    pub weight: Option<String>,
    pub target_count: Option<u32>,
    pub commodity: Option<String>,
    pub remarks: Option<String>,
    pub stoppage_note: Option<String>,
    pub group_id: Option<String>,
    pub destination: Option<String>,
    pub counterparty_id: Option<String>,
    /// Comma-separated seal numbers.
    pub seal_number: Option<String>,
    pub loaded_count: Option<u32>,
    pub unloaded_count: Option<u32>,
    pub load_start_time: Option<String>,
    pub load_end_time: Option<String>,
    pub complete: Option<bool>,
    pub split_serial: Option<String>,
}

/// `GET unit` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerRecord {
    pub header: ServerHeader,
    pub rows: Vec<ServerRow>,
}

/// One row of a `GET counters` response. Carries no completion flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterRow {
    pub position: u32,
    pub loaded_count: u32,
    pub unloaded_count: u32,
    pub load_start_time: Option<String>,
    pub load_end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPayload {
    pub group_id: String,
    pub destination: String,
    pub counterparty_id: Option<String>,
    pub commodity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowPayload {
    pub position: u32,
    pub identifier: Option<String>,
    pub wagon_type: Option<String>,
    pub weight: Option<String>,
    /// Always present; `null` means unset, never zero.
    pub target_count: Option<u32>,
    pub commodity: Option<String>,
    pub remarks: Option<String>,
    pub stoppage_note: Option<String>,
    pub group_id: String,
    pub destination: String,
    pub counterparty_id: Option<String>,
    pub seal_number: Option<String>,
    /// Omitted unless the row's completion is user-asserted or earned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
}

/// `POST draft` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPayload {
    pub header: HeaderPayload,
    pub rows: Vec<RowPayload>,
    pub modes: ModeFlags,
}

/// `POST split` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRequest {
    pub group_ids: Vec<String>,
}

/// `POST split` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitResponse {
    pub primary_identifier: String,
}

/// `PUT row-status` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStatusUpdate {
    pub complete: bool,
}
