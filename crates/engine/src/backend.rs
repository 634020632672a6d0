use rakeline_core::wire::{
    CounterRow, DraftPayload, RowStatusUpdate, ServerRecord, SplitRequest, SplitResponse,
};
use rakeline_core::{Position, UnitKey};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// The remote service holding authoritative unit records.
///
/// Every call is a single request/response; implementations own retries,
/// auth and transport.
pub trait Backend {
    /// `GET unit(unit_key, group_filter?)`
    fn fetch_unit(&mut self, key: &UnitKey) -> Result<ServerRecord, BackendError>;

    /// `POST draft(unit_key, payload)`
    fn submit_draft(&mut self, key: &UnitKey, payload: &DraftPayload) -> Result<(), BackendError>;

    /// `GET counters(unit_key)`
    fn fetch_counters(&mut self, key: &UnitKey) -> Result<Vec<CounterRow>, BackendError>;

    /// `POST split(unit_key, group_ids)`
    fn split(&mut self, key: &UnitKey, request: &SplitRequest) -> Result<SplitResponse, BackendError>;

    /// `POST mark-decided(unit_key)`
    fn mark_decided(&mut self, key: &UnitKey) -> Result<(), BackendError>;

    /// `PUT row-status(unit_key, position, { complete })`
    fn put_row_status(
        &mut self,
        key: &UnitKey,
        position: Position,
        update: RowStatusUpdate,
    ) -> Result<(), BackendError>;
}
