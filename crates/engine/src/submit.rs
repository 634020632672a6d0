//! Projection of the working state onto the draft payload, and submission.

use rakeline_core::wire::{DraftPayload, HeaderPayload, RowPayload};
use rakeline_core::{DraftKey, Row, WorkingState};
use rakeline_storage::DraftCache;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{EngineError, SaveFailure};

fn optional(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Whether the payload may carry the row's `complete` flag: only when the
/// user asserted it or the counters earned it. An unearned `false` would
/// overwrite a manual `true` held by the server.
fn sends_complete(state: &WorkingState, row: &Row) -> bool {
    state.is_overridden(row.position) || row.auto_complete()
}

pub fn project_payload(state: &WorkingState) -> DraftPayload {
    let header = &state.unit.header;
    let single = state.unit.modes.single_group;

    let rows = state
        .rows()
        .iter()
        .map(|row| {
            let (group_id, destination, counterparty_id) = if single {
                (&header.group_id, &header.destination, &header.counterparty_id)
            } else {
                (&row.group_id, &row.destination, &row.counterparty_id)
            };
            RowPayload {
                position: row.position.get(),
                identifier: optional(&row.identifier),
                wagon_type: optional(&row.wagon_type),
                weight: optional(&row.weight),
                target_count: row.target_count,
                commodity: optional(&row.commodity),
                remarks: optional(&row.remarks),
                stoppage_note: optional(&row.stoppage_note),
                group_id: group_id.trim().to_string(),
                destination: destination.trim().to_string(),
                counterparty_id: optional(counterparty_id),
                seal_number: row.seals.to_wire(),
                complete: sends_complete(state, row).then_some(row.complete),
            }
        })
        .collect();

    DraftPayload {
        header: HeaderPayload {
            group_id: header.group_id.trim().to_string(),
            destination: header.destination.trim().to_string(),
            counterparty_id: optional(&header.counterparty_id),
            commodity: header.commodity.trim().to_string(),
        },
        rows,
        modes: state.unit.modes,
    }
}

/// Send the working state to the backend. On success the cached draft is
/// cleared and the state marked clean; on failure both are left as they
/// were so the user can retry.
pub fn submit_draft<B, C>(
    backend: &mut B,
    cache: &mut C,
    draft_key: &DraftKey,
    state: &mut WorkingState,
) -> Result<(), EngineError>
where
    B: Backend + ?Sized,
    C: DraftCache + ?Sized,
{
    let key = state.unit.key.clone();
    let payload = project_payload(state);
    if let Err(source) = backend.submit_draft(&key, &payload) {
        warn!(unit = %key, error = %source, "draft rejected");
        return Err(SaveFailure {
            unit: key.to_string(),
            source,
        }
        .into());
    }

    if let Err(e) = cache.clear(draft_key) {
        warn!(draft = %draft_key, error = %e, "submitted but could not clear cached draft");
    }
    state.mark_clean();
    info!(unit = %key, rows = payload.rows.len(), "draft submitted");
    Ok(())
}
