use rakeline_core::wire::{ServerRecord, ServerRow};
use rakeline_core::{
    Header, LifecycleStatus, ModeFlags, Position, Row, SealSlots, SplitState, Unit, UnitKey,
};
use tracing::debug;

use crate::backend::Backend;
use crate::config::EngineConfig;
use crate::error::{EngineError, LoadFailure};

/// A unit and its rows exactly as the server holds them.
#[derive(Debug, Clone)]
pub struct LoadedRecord {
    pub unit: Unit,
    pub rows: Vec<Row>,
    /// Whether the server already recorded the unit's mode flags. When it
    /// has not, flags chosen in a local draft are kept.
    pub modes_persisted: bool,
}

/// Fetch the server-authoritative record for `key`.
pub fn load_record<B: Backend + ?Sized>(
    backend: &mut B,
    key: &UnitKey,
    config: &EngineConfig,
) -> Result<LoadedRecord, EngineError> {
    let record = backend.fetch_unit(key).map_err(|source| LoadFailure {
        unit: key.to_string(),
        source,
    })?;
    let loaded = from_server(key.clone(), record, config);
    debug!(unit = %key, rows = loaded.rows.len(), "record loaded");
    Ok(loaded)
}

/// Build a [`LoadedRecord`] from a decoded server response.
pub fn from_server(key: UnitKey, record: ServerRecord, config: &EngineConfig) -> LoadedRecord {
    let ServerRecord { header: raw, rows: raw_rows } = record;

    let header = Header {
        group_id: raw.group_id.unwrap_or_default(),
        destination: raw.destination.unwrap_or_default(),
        counterparty_id: raw.counterparty_id.unwrap_or_default(),
        commodity: raw.commodity.unwrap_or_default(),
    };
    let modes_persisted = raw.single_group.is_some() || header.has_group();
    let modes = ModeFlags {
        single_group: raw.single_group.unwrap_or(true),
        wagon_type_fixed: raw.wagon_type_fixed.unwrap_or(false),
    };

    let mut raw_rows = raw_rows;
    raw_rows.sort_by_key(|r| r.position.unwrap_or(u32::MAX));
    let mut rows: Vec<Row> = raw_rows
        .into_iter()
        .enumerate()
        .map(|(i, r)| row_from_server(Position::from_index(i), r))
        .collect();

    let rows_have_data = rows
        .iter()
        .any(|r| r.has_user_data() || r.loaded_count > 0 || r.unloaded_count > 0);
    let split_state = SplitState::resolve(raw.split_state, raw.has_sequential_serials, rows_have_data);

    if rows.is_empty() {
        let mut row = Row::blank(Position::from_index(0));
        if !modes.single_group {
            row.group_id = header.group_id.clone();
            row.destination = header.destination.clone();
            row.counterparty_id = header.counterparty_id.clone();
        }
        rows.push(row);
    }
    if modes.wagon_type_fixed {
        for row in &mut rows {
            row.wagon_type = config.fixed_wagon_type.clone();
        }
    }

    LoadedRecord {
        unit: Unit {
            key,
            header,
            modes,
            split_state,
            status: LifecycleStatus::parse(raw.status.as_deref().unwrap_or_default()),
        },
        rows,
        modes_persisted,
    }
}

fn row_from_server(position: Position, r: ServerRow) -> Row {
    Row {
        position,
        identifier: r.identifier.unwrap_or_default(),
        wagon_type: r.wagon_type.unwrap_or_default(),
        weight: r.weight.unwrap_or_default(),
        target_count: r.target_count,
        commodity: r.commodity.unwrap_or_default(),
        remarks: r.remarks.unwrap_or_default(),
        stoppage_note: r.stoppage_note.unwrap_or_default(),
        group_id: r.group_id.unwrap_or_default(),
        destination: r.destination.unwrap_or_default(),
        counterparty_id: r.counterparty_id.unwrap_or_default(),
        seals: SealSlots::from_wire(r.seal_number.as_deref()),
        loaded_count: r.loaded_count.unwrap_or(0),
        unloaded_count: r.unloaded_count.unwrap_or(0),
        load_start_time: r.load_start_time.filter(|s| !s.is_empty()),
        load_end_time: r.load_end_time.filter(|s| !s.is_empty()),
        split_serial: r.split_serial.filter(|s| !s.is_empty()),
        complete: r.complete.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use rakeline_core::wire::ServerHeader;
    use rakeline_core::UnitId;

    use super::*;

    fn key() -> UnitKey {
        UnitKey::new(UnitId::new("2025-26/02/001"))
    }

    #[test]
    fn empty_record_yields_one_blank_row() {
        let loaded = from_server(key(), ServerRecord::default(), &EngineConfig::default());
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.rows[0].position.get(), 1);
        assert!(!loaded.rows[0].has_user_data());
        assert!(loaded.unit.modes.single_group);
        assert!(!loaded.modes_persisted);
        assert_eq!(loaded.unit.split_state, SplitState::Unasked);
    }

    #[test]
    fn multi_group_blank_row_inherits_header() {
        let record = ServerRecord {
            header: ServerHeader {
                group_id: Some("IND-1".into()),
                destination: Some("PUNE".into()),
                single_group: Some(false),
                ..ServerHeader::default()
            },
            rows: Vec::new(),
        };
        let loaded = from_server(key(), record, &EngineConfig::default());
        assert_eq!(loaded.rows[0].group_id, "IND-1");
        assert_eq!(loaded.rows[0].destination, "PUNE");
        assert!(loaded.modes_persisted);
    }

    #[test]
    fn rows_sorted_and_renumbered() {
        let record = ServerRecord {
            header: ServerHeader::default(),
            rows: vec![
                ServerRow {
                    position: Some(5),
                    identifier: Some("B".into()),
                    ..ServerRow::default()
                },
                ServerRow {
                    position: Some(2),
                    identifier: Some("A".into()),
                    seal_number: Some("S1, S2".into()),
                    ..ServerRow::default()
                },
            ],
        };
        let loaded = from_server(key(), record, &EngineConfig::default());
        let ids: Vec<_> = loaded.rows.iter().map(|r| (r.position.get(), r.identifier.as_str())).collect();
        assert_eq!(ids, vec![(1, "A"), (2, "B")]);
        assert_eq!(loaded.rows[0].seals.slots(), ["S1", "S2"]);
        assert!(loaded.rows[0].seals.is_confirmed(1));
    }

    #[test]
    fn fixed_wagon_type_is_forced() {
        let record = ServerRecord {
            header: ServerHeader {
                wagon_type_fixed: Some(true),
                ..ServerHeader::default()
            },
            rows: vec![ServerRow {
                wagon_type: Some("BCN".into()),
                ..ServerRow::default()
            }],
        };
        let loaded = from_server(key(), record, &EngineConfig::default());
        assert_eq!(loaded.rows[0].wagon_type, "HL");
    }

    #[test]
    fn legacy_false_flag_with_data_reads_as_declined() {
        let record = ServerRecord {
            header: ServerHeader {
                has_sequential_serials: Some(false),
                ..ServerHeader::default()
            },
            rows: vec![ServerRow {
                identifier: Some("W1".into()),
                ..ServerRow::default()
            }],
        };
        let loaded = from_server(key(), record, &EngineConfig::default());
        assert_eq!(loaded.unit.split_state, SplitState::AnsweredNo);
    }
}
