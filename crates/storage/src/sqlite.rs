use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use rakeline_core::{DraftKey, DraftSnapshot, EditorRole, UnitId, UnitKey};

use crate::error::StorageError;
use crate::traits::DraftCache;

/// Draft cache backed by a SQLite file, one row per (unit, group, role).
pub struct SqliteDraftCache {
    conn: Connection,
}

impl SqliteDraftCache {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Absent group filters are stored as the empty string so the primary key
/// stays total.
fn group_column(key: &DraftKey) -> &str {
    key.unit.group_id.as_deref().unwrap_or("")
}

impl DraftCache for SqliteDraftCache {
    fn save(&mut self, key: &DraftKey, snapshot: &DraftSnapshot) -> Result<(), StorageError> {
        let payload = snapshot.to_msgpack()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO drafts (unit_id, group_id, role, snapshot_id, saved_at, payload) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                key.unit.unit_id.as_str(),
                group_column(key),
                key.role.as_str(),
                snapshot.snapshot_id.as_bytes().as_slice(),
                snapshot.saved_at_ms as i64,
                payload,
            ],
        )?;
        debug!(draft = %key, snapshot = %snapshot.snapshot_id, "draft saved");
        Ok(())
    }

    fn load(&self, key: &DraftKey) -> Result<Option<DraftSnapshot>, StorageError> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM drafts WHERE unit_id = ?1 AND group_id = ?2 AND role = ?3",
                rusqlite::params![key.unit.unit_id.as_str(), group_column(key), key.role.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(bytes) => Ok(Some(DraftSnapshot::from_msgpack(&bytes)?)),
            None => Ok(None),
        }
    }

    fn clear(&mut self, key: &DraftKey) -> Result<bool, StorageError> {
        let removed = self.conn.execute(
            "DELETE FROM drafts WHERE unit_id = ?1 AND group_id = ?2 AND role = ?3",
            rusqlite::params![key.unit.unit_id.as_str(), group_column(key), key.role.as_str()],
        )?;
        if removed > 0 {
            debug!(draft = %key, "draft cleared");
        }
        Ok(removed > 0)
    }

    fn keys(&self) -> Result<Vec<DraftKey>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT unit_id, group_id, role FROM drafts ORDER BY unit_id, group_id, role")?;
        let rows = stmt.query_map([], |row| {
            let unit_id: String = row.get(0)?;
            let group_id: String = row.get(1)?;
            let role: String = row.get(2)?;
            Ok((unit_id, group_id, role))
        })?;

        let mut keys = Vec::new();
        for row in rows {
            let (unit_id, group_id, role) = row?;
            let role = EditorRole::parse(&role)
                .map_err(|e| StorageError::Corrupt(format!("{unit_id}: {e}")))?;
            let unit = if group_id.is_empty() {
                UnitKey::new(UnitId::new(unit_id))
            } else {
                UnitKey::with_group(UnitId::new(unit_id), group_id)
            };
            keys.push(DraftKey::new(unit, role));
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rakeline_core::{
        Header, LifecycleStatus, ModeFlags, Position, Row, SplitState, Unit, WorkingState,
    };

    use super::*;

    fn key(group: Option<&str>, role: EditorRole) -> DraftKey {
        let unit_id = UnitId::new("2025-26/02/001");
        let unit = match group {
            Some(g) => UnitKey::with_group(unit_id, g),
            None => UnitKey::new(unit_id),
        };
        DraftKey::new(unit, role)
    }

    fn snapshot(key: &DraftKey, identifier: &str) -> DraftSnapshot {
        let unit = Unit {
            key: key.unit.clone(),
            header: Header::default(),
            modes: ModeFlags::default(),
            split_state: SplitState::Unasked,
            status: LifecycleStatus::Draft,
        };
        let mut row = Row::blank(Position::from_index(0));
        row.identifier = identifier.into();
        let state = WorkingState::new(unit, vec![row], BTreeSet::new());
        DraftSnapshot::capture(key.clone(), &state, 1_000)
    }

    #[test]
    fn save_overwrites_previous_draft() {
        let mut cache = SqliteDraftCache::open_in_memory().unwrap();
        let k = key(None, EditorRole::Reviewer);
        cache.save(&k, &snapshot(&k, "W1")).unwrap();
        cache.save(&k, &snapshot(&k, "W2")).unwrap();

        let loaded = cache.load(&k).unwrap().unwrap();
        assert_eq!(loaded.rows[0].identifier, "W2");
        assert_eq!(cache.keys().unwrap().len(), 1);
    }

    #[test]
    fn keys_are_isolated_by_group_and_role() {
        let mut cache = SqliteDraftCache::open_in_memory().unwrap();
        let parent = key(None, EditorRole::Reviewer);
        let child = key(Some("IND-2"), EditorRole::Reviewer);
        let operator = key(None, EditorRole::Operator);
        cache.save(&parent, &snapshot(&parent, "P")).unwrap();
        cache.save(&child, &snapshot(&child, "C")).unwrap();

        assert_eq!(cache.load(&child).unwrap().unwrap().rows[0].identifier, "C");
        assert!(cache.load(&operator).unwrap().is_none());

        let keys = cache.keys().unwrap();
        assert!(keys.contains(&parent));
        assert!(keys.contains(&child));
    }

    #[test]
    fn clear_reports_removal() {
        let mut cache = SqliteDraftCache::open_in_memory().unwrap();
        let k = key(None, EditorRole::Admin);
        assert!(!cache.clear(&k).unwrap());
        cache.save(&k, &snapshot(&k, "W1")).unwrap();
        assert!(cache.clear(&k).unwrap());
        assert!(cache.load(&k).unwrap().is_none());
    }

    #[test]
    fn drafts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.db");
        let path = path.to_str().unwrap();
        let k = key(Some("IND-1"), EditorRole::Operator);
        {
            let mut cache = SqliteDraftCache::open(path).unwrap();
            cache.save(&k, &snapshot(&k, "W7")).unwrap();
        }
        let cache = SqliteDraftCache::open(path).unwrap();
        assert_eq!(cache.load(&k).unwrap().unwrap().rows[0].identifier, "W7");
    }

    #[test]
    fn corrupt_payload_surfaces_error() {
        let cache = SqliteDraftCache::open_in_memory().unwrap();
        let k = key(None, EditorRole::Reviewer);
        cache
            .conn()
            .execute(
                "INSERT INTO drafts (unit_id, group_id, role, snapshot_id, saved_at, payload) VALUES (?1, '', 'reviewer', ?2, 0, ?3)",
                rusqlite::params![k.unit.unit_id.as_str(), [0u8; 16].as_slice(), vec![0xC1u8]],
            )
            .unwrap();
        assert!(matches!(cache.load(&k), Err(StorageError::Core(_))));
    }
}
