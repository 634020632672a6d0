//! One-shot negotiation of whether a multi-group unit is split into
//! sequential serials.
//!
//! ```text
//! Unasked -> Prompting -> AnsweredYes | AnsweredNo
//! ```
//!
//! Answered phases are terminal. Single-group units and child records never
//! enter the machine.

use rakeline_core::wire::SplitRequest;
use rakeline_core::{SplitState, WorkingState};
use tracing::{info, warn};

use crate::backend::Backend;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::validate::{distinct_groups, ValidationFailure, ValidationIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPhase {
    /// The decision does not belong to this unit.
    Bypassed,
    Unasked,
    /// The question is on screen, awaiting an answer.
    Prompting,
    AnsweredYes,
    AnsweredNo,
}

impl SplitPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bypassed => "bypassed",
            Self::Unasked => "unasked",
            Self::Prompting => "prompting",
            Self::AnsweredYes => "answered_yes",
            Self::AnsweredNo => "answered_no",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Bypassed | Self::AnsweredYes | Self::AnsweredNo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitDecision {
    /// The backend materialized serials; navigate to the primary one.
    Split { primary_identifier: String },
    Declined,
}

#[derive(Debug, Clone)]
pub struct SplitNegotiator {
    phase: SplitPhase,
}

impl SplitNegotiator {
    pub fn for_state(state: &WorkingState) -> Self {
        let bypassed = state.unit.modes.single_group
            || state.unit.key.is_child()
            || state.rows().iter().any(|r| r.split_serial.is_some());
        let phase = if bypassed {
            SplitPhase::Bypassed
        } else {
            match state.unit.split_state {
                SplitState::Unasked => SplitPhase::Unasked,
                SplitState::AnsweredYes => SplitPhase::AnsweredYes,
                SplitState::AnsweredNo => SplitPhase::AnsweredNo,
            }
        };
        Self { phase }
    }

    pub fn phase(&self) -> SplitPhase {
        self.phase
    }

    pub fn needs_prompt(&self) -> bool {
        self.phase == SplitPhase::Unasked
    }

    pub fn begin_prompt(&mut self) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.phase = SplitPhase::Prompting;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        match self.phase {
            SplitPhase::Unasked | SplitPhase::Prompting => Ok(()),
            SplitPhase::Bypassed => Err(EngineError::SplitUnavailable("unit does not own the split decision")),
            SplitPhase::AnsweredYes | SplitPhase::AnsweredNo => {
                Err(EngineError::SplitUnavailable("split already decided"))
            }
        }
    }

    /// Ask the backend to materialize sequential serials for every distinct
    /// group. A backend failure leaves the question open for retry.
    pub fn answer_yes<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        state: &mut WorkingState,
        config: &EngineConfig,
    ) -> Result<SplitDecision, EngineError> {
        self.ensure_open()?;
        let group_ids = distinct_groups(state.rows());
        if group_ids.len() < config.min_split_groups {
            return Err(ValidationFailure {
                issues: vec![ValidationIssue::TooFewGroups {
                    found: group_ids.len(),
                    required: config.min_split_groups,
                }],
            }
            .into());
        }

        let key = state.unit.key.clone();
        let groups = group_ids.len();
        let response = backend
            .split(&key, &SplitRequest { group_ids })
            .map_err(EngineError::Split)?;

        self.phase = SplitPhase::AnsweredYes;
        state.unit.split_state = SplitState::AnsweredYes;
        info!(unit = %key, groups, primary = %response.primary_identifier, "split accepted");
        Ok(SplitDecision::Split {
            primary_identifier: response.primary_identifier,
        })
    }

    /// Record "no". A failed mark-decided call is logged and the local
    /// answer stands, so the user is never blocked on it.
    pub fn answer_no<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        state: &mut WorkingState,
    ) -> Result<SplitDecision, EngineError> {
        self.ensure_open()?;
        let key = state.unit.key.clone();
        if let Err(e) = backend.mark_decided(&key) {
            warn!(unit = %key, error = %e, "mark-decided failed; keeping local answer");
        }
        self.phase = SplitPhase::AnsweredNo;
        state.unit.split_state = SplitState::AnsweredNo;
        info!(unit = %key, "split declined");
        Ok(SplitDecision::Declined)
    }
}
