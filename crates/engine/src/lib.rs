pub mod backend;
pub mod cascade;
pub mod config;
pub mod error;
pub mod import;
pub mod loader;
pub mod reconcile;
pub mod rows;
pub mod schedule;
pub mod seals;
pub mod split;
pub mod status;
pub mod submit;
pub mod validate;

#[cfg(test)]
mod testing;

pub use backend::{Backend, BackendError};
pub use cascade::{CascadeField, CascadeSet, EditOutcome};
pub use config::EngineConfig;
pub use error::{EngineError, LoadFailure, OpenFailure, SaveFailure};
pub use import::ImportedRow;
pub use reconcile::ReconcileOutcome;
pub use split::{SplitDecision, SplitPhase};
pub use status::{CounterFold, ToggleOutcome};
pub use validate::{ValidationFailure, ValidationIssue};

use std::time::Instant;

use rakeline_core::snapshot::now_ms;
use rakeline_core::wire::RowStatusUpdate;
use rakeline_core::{
    DraftKey, DraftSnapshot, EditorRole, FieldValue, HeaderField, ModeFlags, Position, Row,
    RowField, SealAdd, UnitId, UnitKey, WorkingState,
};
use rakeline_storage::DraftCache;
use tracing::{debug, info, warn};

use crate::schedule::{Debouncer, PollTimer};
use crate::split::SplitNegotiator;

/// Where the caller should go after leaving the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub key: UnitKey,
    /// Whether every detail the next step expects is filled in.
    pub details_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProceedOutcome {
    Navigate(NavigationTarget),
    /// The draft is saved; ask the split question and call
    /// [`EditSession::answer_split`].
    PromptSplit,
}

/// What one [`EditSession::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub draft_saved: bool,
    pub counters: Option<CounterFold>,
}

/// One editor's ownership of a unit, from view entry to close.
///
/// Edits are synchronous. Cache writes are debounced and counter polls are
/// periodic; both run from [`tick`](Self::tick) with a caller-supplied clock.
pub struct EditSession<B: Backend, C: DraftCache> {
    backend: B,
    cache: C,
    config: EngineConfig,
    draft_key: DraftKey,
    state: WorkingState,
    outcome: ReconcileOutcome,
    modes_persisted: bool,
    negotiator: SplitNegotiator,
    debounce: Debouncer,
    poll: PollTimer,
    closed: bool,
}

impl<B: Backend, C: DraftCache> EditSession<B, C> {
    /// Load the unit, read any cached draft, and reconcile the two.
    ///
    /// A load failure produces no session; the backend and cache come back
    /// inside the [`OpenFailure`] with any cached draft untouched. An
    /// unreadable cache entry is treated as absent.
    pub fn open(
        mut backend: B,
        mut cache: C,
        key: UnitKey,
        role: EditorRole,
        config: EngineConfig,
        now: Instant,
    ) -> Result<Self, OpenFailure<B, C>> {
        let loaded = match config
            .validate()
            .and_then(|()| loader::load_record(&mut backend, &key, &config))
        {
            Ok(loaded) => loaded,
            Err(error) => return Err(OpenFailure { error, backend, cache }),
        };
        let draft_key = DraftKey::new(key.clone(), role);

        let cached = match cache.load(&draft_key) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(draft = %draft_key, error = %e, "ignoring unreadable cached draft");
                None
            }
        };

        let reconciled = reconcile::reconcile(loaded, cached.as_ref(), &config);
        if reconciled.outcome.discards_cache() {
            if let Err(e) = cache.clear(&draft_key) {
                warn!(draft = %draft_key, error = %e, "could not clear discarded draft");
            }
        }

        let negotiator = SplitNegotiator::for_state(&reconciled.state);
        info!(
            unit = %key,
            role = role.as_str(),
            split = negotiator.phase().as_str(),
            "edit session opened"
        );
        Ok(Self {
            backend,
            cache,
            debounce: Debouncer::new(config.draft_debounce()),
            poll: PollTimer::new(config.counter_poll(), now),
            config,
            draft_key,
            state: reconciled.state,
            outcome: reconciled.outcome,
            modes_persisted: reconciled.modes_persisted,
            negotiator,
            closed: false,
        })
    }

    pub fn state(&self) -> &WorkingState {
        &self.state
    }

    pub fn key(&self) -> &UnitKey {
        &self.state.unit.key
    }

    pub fn draft_key(&self) -> &DraftKey {
        &self.draft_key
    }

    pub fn role(&self) -> EditorRole {
        self.draft_key.role
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// How the cached draft was treated when the session opened.
    pub fn reconcile_outcome(&self) -> &ReconcileOutcome {
        &self.outcome
    }

    pub fn split_phase(&self) -> SplitPhase {
        self.negotiator.phase()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn has_pending_draft_write(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn details_complete(&self) -> bool {
        validate::details_complete(&self.state, self.role())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Give back the collaborators, e.g. to reopen the unit later.
    pub fn into_parts(self) -> (B, C) {
        (self.backend, self.cache)
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        Ok(())
    }

    // ---- edits ----

    pub fn set_field(
        &mut self,
        index: usize,
        field: RowField,
        value: impl Into<FieldValue>,
        now: Instant,
    ) -> Result<EditOutcome, EngineError> {
        self.ensure_open()?;
        let outcome = cascade::apply_edit(&mut self.state, index, field, value.into())?;
        self.debounce.touch(now);
        Ok(outcome)
    }

    pub fn set_header_field(
        &mut self,
        field: HeaderField,
        value: impl Into<String>,
        now: Instant,
    ) -> Result<EditOutcome, EngineError> {
        self.ensure_open()?;
        let outcome = cascade::apply_header_edit(&mut self.state, field, value)?;
        self.debounce.touch(now);
        Ok(outcome)
    }

    /// Pick the mode flags of a unit the server has not recorded modes for.
    pub fn choose_modes(&mut self, modes: ModeFlags, now: Instant) -> Result<(), EngineError> {
        self.ensure_open()?;
        if self.modes_persisted {
            return Err(EngineError::FieldLocked { field: "modes" });
        }
        self.state.unit.modes = modes;
        if modes.wagon_type_fixed {
            let fixed = self.config.fixed_wagon_type.clone();
            for row in self.state.rows_mut() {
                row.wagon_type = fixed.clone();
            }
        }
        self.negotiator = SplitNegotiator::for_state(&self.state);
        self.debounce.touch(now);
        debug!(unit = %self.key(), single_group = modes.single_group, fixed = modes.wagon_type_fixed, "modes chosen");
        Ok(())
    }

    pub fn add_row(&mut self, now: Instant) -> Result<Position, EngineError> {
        self.ensure_open()?;
        let position = rows::add_row(&mut self.state, &self.config);
        self.debounce.touch(now);
        Ok(position)
    }

    pub fn duplicate_row(&mut self, index: usize, now: Instant) -> Result<Position, EngineError> {
        self.ensure_open()?;
        let position = rows::duplicate_row(&mut self.state, index)?;
        self.debounce.touch(now);
        Ok(position)
    }

    pub fn delete_row(&mut self, index: usize, now: Instant) -> Result<Row, EngineError> {
        self.ensure_open()?;
        let removed = rows::delete_row(&mut self.state, index)?;
        self.debounce.touch(now);
        Ok(removed)
    }

    pub fn add_seal(&mut self, index: usize, now: Instant) -> Result<SealAdd, EngineError> {
        self.ensure_open()?;
        let outcome = seals::add_seal(&mut self.state, index)?;
        if outcome == SealAdd::Appended {
            self.debounce.touch(now);
        }
        Ok(outcome)
    }

    pub fn update_seal(
        &mut self,
        index: usize,
        slot: usize,
        value: impl Into<String>,
        now: Instant,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        seals::update_seal(&mut self.state, index, slot, value)?;
        self.debounce.touch(now);
        Ok(())
    }

    pub fn confirm_seal_on_blur(&mut self, index: usize, slot: usize, now: Instant) -> Result<bool, EngineError> {
        self.ensure_open()?;
        let confirmed = seals::confirm_seal_on_blur(&mut self.state, index, slot)?;
        if confirmed {
            self.debounce.touch(now);
        }
        Ok(confirmed)
    }

    pub fn remove_seal(&mut self, index: usize, slot: usize, now: Instant) -> Result<(), EngineError> {
        self.ensure_open()?;
        seals::remove_seal(&mut self.state, index, slot)?;
        self.debounce.touch(now);
        Ok(())
    }

    pub fn import_rows(&mut self, imported: &[ImportedRow], now: Instant) -> Result<usize, EngineError> {
        self.ensure_open()?;
        let n = import::apply_imported_rows(&mut self.state, imported, &self.config)?;
        if n > 0 {
            self.debounce.touch(now);
        }
        Ok(n)
    }

    /// Flip a row's completion control and write it through to the backend
    /// at once. A failed write-through is logged; the local change stands
    /// and travels with the next draft save.
    pub fn toggle_complete(
        &mut self,
        index: usize,
        complete: bool,
        now: Instant,
    ) -> Result<ToggleOutcome, EngineError> {
        self.ensure_open()?;
        let outcome = status::toggle_complete(&mut self.state, index, complete)?;
        let update = RowStatusUpdate {
            complete: outcome.complete,
        };
        let key = self.state.unit.key.clone();
        if let Err(e) = self.backend.put_row_status(&key, outcome.position, update) {
            warn!(unit = %key, position = %outcome.position, error = %e, "row status write-through failed");
        }
        self.debounce.touch(now);
        Ok(outcome)
    }

    // ---- timers ----

    /// Run whatever is due at `now`: a debounced draft write, a counter poll,
    /// or both. Failures are logged and retried on a later tick.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        if self.closed {
            return report;
        }

        if self.debounce.fire_if_due(now) {
            match self.persist_draft() {
                Ok(()) => report.draft_saved = true,
                Err(e) => {
                    warn!(draft = %self.draft_key, error = %e, "draft write failed");
                    self.debounce.touch(now);
                }
            }
        }

        if self.poll.fire_if_due(now) {
            let key = self.state.unit.key.clone();
            match self.backend.fetch_counters(&key) {
                Ok(counters) => {
                    let fold = status::apply_counters(&mut self.state, &counters);
                    debug!(
                        unit = %key,
                        updated = fold.updated.len(),
                        recomputed = fold.recomputed.len(),
                        "counters folded"
                    );
                    if !fold.unknown_positions.is_empty() {
                        warn!(unit = %key, positions = ?fold.unknown_positions, "counters for unknown rows");
                    }
                    report.counters = Some(fold);
                }
                Err(e) => warn!(unit = %key, error = %e, "counter poll failed"),
            }
        }
        report
    }

    fn persist_draft(&mut self) -> Result<(), EngineError> {
        let snapshot = DraftSnapshot::capture(self.draft_key.clone(), &self.state, now_ms()?);
        self.cache.save(&self.draft_key, &snapshot)?;
        Ok(())
    }

    /// Write the draft cache now instead of waiting for the debounce.
    pub fn flush_draft(&mut self) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.debounce.cancel();
        self.persist_draft()
    }

    // ---- leaving the editor ----

    /// Submit the working state. On failure nothing local changes.
    pub fn save_draft(&mut self) -> Result<(), EngineError> {
        self.ensure_open()?;
        submit::submit_draft(&mut self.backend, &mut self.cache, &self.draft_key, &mut self.state)?;
        // The cache was just cleared; a pending write would resurrect it.
        self.debounce.cancel();
        Ok(())
    }

    /// Validate, save, and decide where to go next. Validation runs before
    /// any network call.
    pub fn proceed(&mut self) -> Result<ProceedOutcome, EngineError> {
        self.ensure_open()?;
        validate::validate_proceed(&self.state, &self.config)?;
        self.save_draft()?;

        if matches!(self.negotiator.phase(), SplitPhase::Unasked | SplitPhase::Prompting) {
            self.negotiator.begin_prompt()?;
            info!(unit = %self.key(), "split question pending");
            return Ok(ProceedOutcome::PromptSplit);
        }
        Ok(ProceedOutcome::Navigate(NavigationTarget {
            key: self.state.unit.key.clone(),
            details_complete: self.details_complete(),
        }))
    }

    /// Answer the split question raised by [`proceed`](Self::proceed).
    pub fn answer_split(&mut self, split: bool) -> Result<NavigationTarget, EngineError> {
        self.ensure_open()?;
        let details_complete = self.details_complete();
        let key = if split {
            match self.negotiator.answer_yes(&mut self.backend, &mut self.state, &self.config)? {
                SplitDecision::Split { primary_identifier } => UnitKey::new(UnitId::new(primary_identifier)),
                SplitDecision::Declined => self.state.unit.key.clone(),
            }
        } else {
            self.negotiator.answer_no(&mut self.backend, &mut self.state)?;
            self.state.unit.key.clone()
        };
        Ok(NavigationTarget { key, details_complete })
    }

    /// Stop all timers. A closed session never writes again.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.debounce.cancel();
        self.poll.cancel();
        self.closed = true;
        info!(unit = %self.key(), dirty = self.state.is_dirty(), "edit session closed");
    }
}
