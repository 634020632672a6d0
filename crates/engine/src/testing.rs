use rakeline_core::wire::{
    CounterRow, DraftPayload, RowStatusUpdate, ServerRecord, SplitRequest, SplitResponse,
};
use rakeline_core::{Position, UnitKey};

use crate::backend::{Backend, BackendError};

/// Scripted backend for unit tests.
#[derive(Debug, Default)]
pub struct StubBackend {
    pub record: ServerRecord,
    pub counters: Vec<CounterRow>,
    pub submitted: Vec<DraftPayload>,
    pub split_calls: Vec<Vec<String>>,
    pub decided: usize,
    pub statuses: Vec<(Position, bool)>,
    pub fail: bool,
}

impl StubBackend {
    pub fn with_record(record: ServerRecord) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.fail {
            return Err(BackendError::Status {
                code: 503,
                message: "unavailable".into(),
            });
        }
        Ok(())
    }
}

impl Backend for StubBackend {
    fn fetch_unit(&mut self, _: &UnitKey) -> Result<ServerRecord, BackendError> {
        self.check()?;
        Ok(self.record.clone())
    }

    fn submit_draft(&mut self, _: &UnitKey, payload: &DraftPayload) -> Result<(), BackendError> {
        self.check()?;
        self.submitted.push(payload.clone());
        Ok(())
    }

    fn fetch_counters(&mut self, _: &UnitKey) -> Result<Vec<CounterRow>, BackendError> {
        self.check()?;
        Ok(self.counters.clone())
    }

    fn split(&mut self, key: &UnitKey, request: &SplitRequest) -> Result<SplitResponse, BackendError> {
        self.check()?;
        self.split_calls.push(request.group_ids.clone());
        Ok(SplitResponse {
            primary_identifier: format!("{}-A", key.unit_id),
        })
    }

    fn mark_decided(&mut self, _: &UnitKey) -> Result<(), BackendError> {
        self.decided += 1;
        self.check()
    }

    fn put_row_status(&mut self, _: &UnitKey, position: Position, update: RowStatusUpdate) -> Result<(), BackendError> {
        self.check()?;
        self.statuses.push((position, update.complete));
        Ok(())
    }
}
