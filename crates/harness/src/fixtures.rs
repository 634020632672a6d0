use rakeline_core::wire::{ServerHeader, ServerRecord, ServerRow};
use rakeline_core::{UnitId, UnitKey};

pub const UNIT_ID: &str = "2025-26/02/001";

pub fn unit_key() -> UnitKey {
    UnitKey::new(UnitId::new(UNIT_ID))
}

pub fn child_key(group_id: &str) -> UnitKey {
    UnitKey::with_group(UnitId::new(UNIT_ID), group_id)
}

pub fn row(position: u32, identifier: &str) -> ServerRow {
    ServerRow {
        position: Some(position),
        identifier: Some(identifier.to_string()),
        wagon_type: Some("BCN".into()),
        ..ServerRow::default()
    }
}

pub fn counted_row(position: u32, identifier: &str, loaded: u32, target: Option<u32>, complete: bool) -> ServerRow {
    ServerRow {
        loaded_count: Some(loaded),
        target_count: target,
        complete: Some(complete),
        ..row(position, identifier)
    }
}

/// A single-group unit with `n` identified rows.
pub fn single_group_record(n: u32) -> ServerRecord {
    ServerRecord {
        header: ServerHeader {
            group_id: Some("IND-1".into()),
            destination: Some("PUNE".into()),
            counterparty_id: Some("C-100".into()),
            commodity: Some("DAP".into()),
            single_group: Some(true),
            wagon_type_fixed: Some(false),
            ..ServerHeader::default()
        },
        rows: (1..=n).map(|p| row(p, &format!("W{p}"))).collect(),
    }
}

/// A multi-group unit whose rows carry the given `(group_id, identifier)`.
pub fn multi_group_record(rows: &[(&str, &str)]) -> ServerRecord {
    ServerRecord {
        header: ServerHeader {
            group_id: Some("IND-1".into()),
            destination: Some("PUNE".into()),
            single_group: Some(false),
            wagon_type_fixed: Some(false),
            ..ServerHeader::default()
        },
        rows: rows
            .iter()
            .enumerate()
            .map(|(i, (group, identifier))| ServerRow {
                group_id: Some(group.to_string()),
                destination: Some("PUNE".into()),
                ..row(i as u32 + 1, identifier)
            })
            .collect(),
    }
}
