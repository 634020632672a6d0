//! Checks run before leaving the editor.

use std::collections::BTreeSet;
use std::fmt;

use rakeline_core::{EditorRole, Row, WorkingState};
use thiserror::Error;

use crate::config::EngineConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A multi-group parent needs at least `required` distinct group ids.
    TooFewGroups { found: usize, required: usize },
    /// These groups have rows without an identifier.
    MissingIdentifiers { group_ids: Vec<String> },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewGroups { found, required } => {
                write!(f, "at least {required} distinct group ids required, found {found}")
            }
            Self::MissingIdentifiers { group_ids } => {
                write!(f, "rows without identifiers in groups: {}", group_ids.join(", "))
            }
        }
    }
}

/// Proceed is blocked; every problem found is listed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationFailure {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cannot proceed: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Distinct non-empty group ids across the rows, sorted.
pub fn distinct_groups(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|r| r.group_id.trim())
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Structural checks for proceeding out of a multi-group unit. Single-group
/// units always pass.
pub fn validate_proceed(state: &WorkingState, config: &EngineConfig) -> Result<(), ValidationFailure> {
    if state.unit.modes.single_group {
        return Ok(());
    }
    let mut issues = Vec::new();

    // Children hold a single group by construction.
    if !state.unit.key.is_child() {
        let found = distinct_groups(state.rows()).len();
        if found < config.min_split_groups {
            issues.push(ValidationIssue::TooFewGroups {
                found,
                required: config.min_split_groups,
            });
        }
    }

    let missing: BTreeSet<String> = state
        .rows()
        .iter()
        .filter(|r| !r.group_id.trim().is_empty() && r.identifier.trim().is_empty())
        .map(|r| r.group_id.trim().to_string())
        .collect();
    if !missing.is_empty() {
        issues.push(ValidationIssue::MissingIdentifiers {
            group_ids: missing.into_iter().collect(),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { issues })
    }
}

fn filled(s: &str) -> bool {
    !s.trim().is_empty()
}

fn filled_time(t: &Option<String>) -> bool {
    t.as_deref().is_some_and(|s| filled(s) && s.trim() != "-")
}

fn positive_number(s: &str) -> bool {
    s.trim().parse::<f64>().is_ok_and(|n| n > 0.0)
}

/// Whether every detail the downstream dispatch step expects is present.
/// Remarks are optional; everything else on the header and each row is not.
/// This never blocks proceeding; it is reported alongside the navigation.
pub fn details_complete(state: &WorkingState, role: EditorRole) -> bool {
    let header = &state.unit.header;
    let single = state.unit.modes.single_group;
    if !filled(&header.group_id) || !filled(&header.destination) {
        return false;
    }
    let counterparty_required = !single || role == EditorRole::Admin;
    if counterparty_required && !filled(&header.counterparty_id) {
        return false;
    }
    if state.is_empty() {
        return false;
    }
    state.rows().iter().all(|row| {
        filled(&row.identifier)
            && filled(&row.wagon_type)
            && positive_number(&row.weight)
            && filled(&row.commodity)
            && row.seals.has_value()
            && filled(&row.stoppage_note)
            && filled_time(&row.load_start_time)
            && filled_time(&row.load_end_time)
            && (single
                || (filled(&row.group_id) && filled(&row.destination) && filled(&row.counterparty_id)))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rakeline_core::{
        Header, LifecycleStatus, ModeFlags, Position, SplitState, Unit, UnitId, UnitKey,
    };

    use super::*;

    fn state(key: UnitKey, groups: &[(&str, &str)]) -> WorkingState {
        let unit = Unit {
            key,
            header: Header::default(),
            modes: ModeFlags {
                single_group: false,
                wagon_type_fixed: false,
            },
            split_state: SplitState::Unasked,
            status: LifecycleStatus::Draft,
        };
        let rows = groups
            .iter()
            .enumerate()
            .map(|(i, (group, identifier))| {
                let mut row = Row::blank(Position::from_index(i));
                row.group_id = group.to_string();
                row.identifier = identifier.to_string();
                row
            })
            .collect();
        WorkingState::new(unit, rows, BTreeSet::new())
    }

    fn parent() -> UnitKey {
        UnitKey::new(UnitId::new("2025-26/02/001"))
    }

    #[test]
    fn one_group_is_too_few() {
        let ws = state(parent(), &[("IND-1", "W1"), ("IND-1", "W2")]);
        let err = validate_proceed(&ws, &EngineConfig::default()).unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::TooFewGroups {
                found: 1,
                required: 2
            }]
        );
    }

    #[test]
    fn all_issues_are_enumerated() {
        let ws = state(parent(), &[("IND-1", ""), ("", "W2"), ("IND-1", "W3")]);
        let err = validate_proceed(&ws, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert_eq!(
            err.issues[1],
            ValidationIssue::MissingIdentifiers {
                group_ids: vec!["IND-1".into()]
            }
        );
        assert!(err.to_string().contains("IND-1"));
    }

    #[test]
    fn two_groups_with_identifiers_pass() {
        let ws = state(parent(), &[("IND-1", "W1"), ("IND-2", "W2")]);
        assert!(validate_proceed(&ws, &EngineConfig::default()).is_ok());
    }

    #[test]
    fn child_skips_group_count() {
        let key = UnitKey::with_group(UnitId::new("2025-26/02/001"), "IND-1");
        let ws = state(key, &[("IND-1", "W1")]);
        assert!(validate_proceed(&ws, &EngineConfig::default()).is_ok());
    }

    #[test]
    fn single_group_always_passes() {
        let mut ws = state(parent(), &[("", "")]);
        ws.unit.modes.single_group = true;
        assert!(validate_proceed(&ws, &EngineConfig::default()).is_ok());
    }

    #[test]
    fn distinct_groups_trims_and_sorts() {
        let ws = state(parent(), &[(" IND-2", "a"), ("IND-1", "b"), ("IND-2 ", "c")]);
        assert_eq!(distinct_groups(ws.rows()), vec!["IND-1", "IND-2"]);
    }

    #[test]
    fn details_complete_requires_every_field_but_remarks() {
        let mut ws = state(parent(), &[("IND-1", "W1")]);
        ws.unit.modes.single_group = true;
        ws.unit.header = Header {
            group_id: "IND-1".into(),
            destination: "PUNE".into(),
            counterparty_id: String::new(),
            commodity: "DAP".into(),
        };
        {
            let row = &mut ws.rows_mut()[0];
            row.wagon_type = "HL".into();
            row.weight = "61.5".into();
            row.commodity = "DAP".into();
            row.seals.update(0, "S1").unwrap();
            row.stoppage_note = "none".into();
            row.load_start_time = Some("2025-06-01T08:00".into());
            row.load_end_time = Some("2025-06-01T09:00".into());
        }
        assert!(details_complete(&ws, EditorRole::Reviewer));
        assert!(!details_complete(&ws, EditorRole::Admin), "admin needs a counterparty");

        ws.rows_mut()[0].load_end_time = Some("-".into());
        assert!(!details_complete(&ws, EditorRole::Reviewer));
        ws.rows_mut()[0].load_end_time = Some("2025-06-01T09:00".into());
        ws.rows_mut()[0].weight = "0".into();
        assert!(!details_complete(&ws, EditorRole::Reviewer));
    }
}
