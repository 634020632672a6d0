use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use rakeline_core::wire::{
    CounterRow, DraftPayload, RowStatusUpdate, ServerRecord, ServerRow, SplitRequest,
    SplitResponse,
};
use rakeline_core::{Position, SplitState, UnitKey};
use rakeline_engine::{Backend, BackendError};

/// The backend calls an engine can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    FetchUnit,
    SubmitDraft,
    FetchCounters,
    Split,
    MarkDecided,
    PutRowStatus,
}

#[derive(Debug, Default)]
struct ServerState {
    units: BTreeMap<UnitKey, ServerRecord>,
    calls: Vec<(Endpoint, UnitKey)>,
    failing: BTreeSet<Endpoint>,
    submissions: Vec<serde_json::Value>,
    split_requests: Vec<Vec<String>>,
    /// Record split decisions only through the legacy boolean flag.
    legacy_split_flag: bool,
}

/// In-memory stand-in for the remote service. Clones share one server, so a
/// test can keep a handle while a session owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Rc<RefCell<ServerState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(key: UnitKey, record: ServerRecord) -> Self {
        let backend = Self::new();
        backend.put_unit(key, record);
        backend
    }

    pub fn put_unit(&self, key: UnitKey, record: ServerRecord) {
        self.state.borrow_mut().units.insert(key, record);
    }

    pub fn unit(&self, key: &UnitKey) -> Option<ServerRecord> {
        self.state.borrow().units.get(key).cloned()
    }

    /// Simulate loading progress on the server side.
    pub fn set_loaded(&self, key: &UnitKey, position: u32, loaded_count: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(row) = state
            .units
            .get_mut(key)
            .and_then(|u| u.rows.iter_mut().find(|r| r.position == Some(position)))
        {
            row.loaded_count = Some(loaded_count);
        }
    }

    pub fn use_legacy_split_flag(&self) {
        self.state.borrow_mut().legacy_split_flag = true;
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.state.borrow_mut().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.state.borrow_mut().failing.remove(&endpoint);
    }

    pub fn calls(&self) -> Vec<Endpoint> {
        self.state.borrow().calls.iter().map(|(e, _)| *e).collect()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state.borrow().calls.iter().filter(|(e, _)| *e == endpoint).count()
    }

    /// Draft bodies exactly as they went over the wire.
    pub fn submissions(&self) -> Vec<serde_json::Value> {
        self.state.borrow().submissions.clone()
    }

    pub fn split_requests(&self) -> Vec<Vec<String>> {
        self.state.borrow().split_requests.clone()
    }

    fn begin(&self, endpoint: Endpoint, key: &UnitKey) -> Result<(), BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push((endpoint, key.clone()));
        if state.failing.contains(&endpoint) {
            return Err(BackendError::Status {
                code: 503,
                message: format!("{endpoint:?} unavailable"),
            });
        }
        Ok(())
    }

    fn not_found(key: &UnitKey) -> BackendError {
        BackendError::Status {
            code: 404,
            message: format!("unit {key} not found"),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s.to_string()) }
}

/// The required-field check the service applies per unit mode.
fn check_required(payload: &DraftPayload) -> Result<(), BackendError> {
    let missing_group = if payload.modes.single_group {
        payload.header.group_id.trim().is_empty()
    } else {
        payload.rows.iter().any(|r| r.group_id.trim().is_empty())
    };
    if missing_group {
        return Err(BackendError::Status {
            code: 422,
            message: "group id required".into(),
        });
    }
    Ok(())
}

impl Backend for FakeBackend {
    fn fetch_unit(&mut self, key: &UnitKey) -> Result<ServerRecord, BackendError> {
        self.begin(Endpoint::FetchUnit, key)?;
        self.unit(key).ok_or_else(|| Self::not_found(key))
    }

    fn submit_draft(&mut self, key: &UnitKey, payload: &DraftPayload) -> Result<(), BackendError> {
        self.begin(Endpoint::SubmitDraft, key)?;
        let json = serde_json::to_value(payload).map_err(|e| BackendError::Decode(e.to_string()))?;
        let payload: DraftPayload =
            serde_json::from_value(json.clone()).map_err(|e| BackendError::Decode(e.to_string()))?;
        check_required(&payload)?;

        let mut state = self.state.borrow_mut();
        state.submissions.push(json);
        let record = state.units.entry(key.clone()).or_default();

        record.header.group_id = Some(payload.header.group_id.clone());
        record.header.destination = Some(payload.header.destination.clone());
        record.header.counterparty_id = payload.header.counterparty_id.clone();
        record.header.commodity = Some(payload.header.commodity.clone());
        record.header.single_group = Some(payload.modes.single_group);
        record.header.wagon_type_fixed = Some(payload.modes.wagon_type_fixed);

        // Counters and stored completion survive a resubmit at the same position.
        let previous: BTreeMap<u32, ServerRow> = record
            .rows
            .drain(..)
            .filter_map(|r| r.position.map(|p| (p, r)))
            .collect();
        record.rows = payload
            .rows
            .iter()
            .map(|p| {
                let before = previous.get(&p.position).cloned().unwrap_or_default();
                ServerRow {
                    position: Some(p.position),
                    identifier: p.identifier.clone(),
                    wagon_type: p.wagon_type.clone(),
                    weight: p.weight.clone(),
                    target_count: p.target_count,
                    commodity: p.commodity.clone(),
                    remarks: p.remarks.clone(),
                    stoppage_note: p.stoppage_note.clone(),
                    group_id: non_empty(&p.group_id),
                    destination: non_empty(&p.destination),
                    counterparty_id: p.counterparty_id.clone(),
                    seal_number: p.seal_number.clone(),
                    loaded_count: before.loaded_count,
                    unloaded_count: before.unloaded_count,
                    load_start_time: before.load_start_time,
                    load_end_time: before.load_end_time,
                    complete: p.complete.or(before.complete),
                    split_serial: before.split_serial,
                }
            })
            .collect();
        Ok(())
    }

    fn fetch_counters(&mut self, key: &UnitKey) -> Result<Vec<CounterRow>, BackendError> {
        self.begin(Endpoint::FetchCounters, key)?;
        let record = self.unit(key).ok_or_else(|| Self::not_found(key))?;
        Ok(record
            .rows
            .iter()
            .filter_map(|r| {
                Some(CounterRow {
                    position: r.position?,
                    loaded_count: r.loaded_count.unwrap_or(0),
                    unloaded_count: r.unloaded_count.unwrap_or(0),
                    load_start_time: r.load_start_time.clone(),
                    load_end_time: r.load_end_time.clone(),
                })
            })
            .collect())
    }

    fn split(&mut self, key: &UnitKey, request: &SplitRequest) -> Result<SplitResponse, BackendError> {
        self.begin(Endpoint::Split, key)?;
        let mut state = self.state.borrow_mut();
        state.split_requests.push(request.group_ids.clone());
        let legacy = state.legacy_split_flag;
        let record = state.units.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        if legacy {
            record.header.has_sequential_serials = Some(true);
        } else {
            record.header.split_state = Some(SplitState::AnsweredYes);
        }
        Ok(SplitResponse {
            primary_identifier: format!("{}-1", key.unit_id),
        })
    }

    fn mark_decided(&mut self, key: &UnitKey) -> Result<(), BackendError> {
        self.begin(Endpoint::MarkDecided, key)?;
        let mut state = self.state.borrow_mut();
        let legacy = state.legacy_split_flag;
        let record = state.units.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        if legacy {
            record.header.has_sequential_serials = Some(false);
        } else {
            record.header.split_state = Some(SplitState::AnsweredNo);
        }
        Ok(())
    }

    fn put_row_status(
        &mut self,
        key: &UnitKey,
        position: Position,
        update: RowStatusUpdate,
    ) -> Result<(), BackendError> {
        self.begin(Endpoint::PutRowStatus, key)?;
        let mut state = self.state.borrow_mut();
        let record = state.units.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        let row = record
            .rows
            .iter_mut()
            .find(|r| r.position == Some(position.get()))
            .ok_or_else(|| BackendError::Status {
                code: 404,
                message: format!("row {position} not found"),
            })?;
        row.complete = Some(update.complete);
        Ok(())
    }
}
