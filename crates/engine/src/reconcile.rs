//! Merge of the server record with a locally cached draft.
//!
//! The cache wins for user intent and the server wins for facts: drafted
//! values overlay only user-editable fields, while counters, timestamps and
//! completion always come from the server record.

use std::collections::BTreeSet;

use rakeline_core::{DraftSnapshot, Position, Row, WorkingState};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::loader::LoadedRecord;
use crate::status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No cached draft existed.
    ServerOnly,
    /// The cached draft was overlaid onto the server record.
    MergedDraft,
    /// A cached draft existed but held no user data.
    DiscardedStale,
    /// The cached draft's row count no longer matches the server's.
    DiscardedConflict { cached_rows: usize, server_rows: usize },
}

impl ReconcileOutcome {
    /// Whether the cached entry should be cleared.
    pub fn discards_cache(&self) -> bool {
        matches!(self, Self::DiscardedStale | Self::DiscardedConflict { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServerOnly => "server_only",
            Self::MergedDraft => "merged_draft",
            Self::DiscardedStale => "discarded_stale",
            Self::DiscardedConflict { .. } => "discarded_conflict",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub state: WorkingState,
    pub outcome: ReconcileOutcome,
    /// The server already fixed the mode flags; they can no longer change.
    pub modes_persisted: bool,
}

/// A cached draft is worth restoring only when it has rows, the same number
/// of rows as the server, and at least one user-entered value.
pub fn is_meaningful(snapshot: &DraftSnapshot, server_rows: usize) -> bool {
    !snapshot.rows.is_empty() && snapshot.rows.len() == server_rows && snapshot.has_user_data()
}

/// Rows the server reports complete although the formula says otherwise
/// were completed by hand.
pub fn derive_overrides(rows: &[Row]) -> BTreeSet<Position> {
    rows.iter()
        .filter(|r| r.complete && !r.auto_complete())
        .map(|r| r.position)
        .collect()
}

pub fn reconcile(
    loaded: LoadedRecord,
    cached: Option<&DraftSnapshot>,
    config: &EngineConfig,
) -> Reconciled {
    let LoadedRecord {
        unit,
        rows,
        modes_persisted,
    } = loaded;
    let key = unit.key.clone();
    let server_rows = rows.len();

    let overrides = derive_overrides(&rows);
    let mut state = WorkingState::new(unit, rows, overrides);
    status::refresh_all(&mut state);
    // Dirty means "differs from the server", so the baseline is taken
    // before any drafted intent is applied.
    state.mark_clean();

    let outcome = match cached {
        None => ReconcileOutcome::ServerOnly,
        Some(snapshot) if is_meaningful(snapshot, server_rows) => {
            overlay(&mut state, snapshot, modes_persisted, config);
            ReconcileOutcome::MergedDraft
        }
        Some(snapshot) if snapshot.has_user_data() && snapshot.rows.len() != server_rows => {
            ReconcileOutcome::DiscardedConflict {
                cached_rows: snapshot.rows.len(),
                server_rows,
            }
        }
        Some(_) => ReconcileOutcome::DiscardedStale,
    };

    info!(
        unit = %key,
        rows = state.len(),
        overrides = state.manual_override().len(),
        outcome = outcome.as_str(),
        "reconciled working state"
    );
    Reconciled {
        state,
        outcome,
        modes_persisted,
    }
}

fn overlay(
    state: &mut WorkingState,
    snapshot: &DraftSnapshot,
    modes_persisted: bool,
    config: &EngineConfig,
) {
    state.unit.header = snapshot.header.clone();
    if !modes_persisted {
        state.unit.modes = snapshot.modes;
    }
    let fixed = state.unit.modes.wagon_type_fixed;

    for row in state.rows_mut() {
        let position = row.position.get();
        if let Some(drafted) = snapshot.rows.iter().find(|d| d.position == position) {
            drafted.overlay_onto(row);
        }
        if fixed {
            row.wagon_type = config.fixed_wagon_type.clone();
        }
    }
    // Drafted targets may differ from the server's.
    let changed = status::refresh_all(state);
    debug!(unit = %state.unit.key, recomputed = changed.len(), "draft overlaid");
}
