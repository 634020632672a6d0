use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::CoreError;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.0.to_string()[..8])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(SnapshotId);

/// Rake serial identifying one unit, e.g. `2025-26/02/001`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path-segment form: slashes become underscores.
    pub fn to_url_param(&self) -> String {
        self.0.replace('/', "_")
    }

    pub fn from_url_param(param: &str) -> Self {
        Self(param.replace('_', "/"))
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 1-based row position within a unit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position(u32);

impl Position {
    pub fn new(n: u32) -> Result<Self, CoreError> {
        if n == 0 {
            return Err(CoreError::InvalidData("position must be 1-based".into()));
        }
        Ok(Self(n))
    }

    /// Position of the row stored at `index` in a contiguous row list.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({})", self.0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EditorRole {
    Operator,
    Reviewer,
    Admin,
}

impl EditorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Reviewer => "reviewer",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "operator" => Ok(Self::Operator),
            "reviewer" => Ok(Self::Reviewer),
            "admin" => Ok(Self::Admin),
            _ => Err(CoreError::InvalidData(format!("unknown editor role: {s}"))),
        }
    }
}

/// A unit, optionally narrowed to one group (a child record after a split).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub unit_id: UnitId,
    pub group_id: Option<String>,
}

impl UnitKey {
    pub fn new(unit_id: UnitId) -> Self {
        Self { unit_id, group_id: None }
    }

    pub fn with_group(unit_id: UnitId, group_id: impl Into<String>) -> Self {
        Self {
            unit_id,
            group_id: Some(group_id.into()),
        }
    }

    /// A key filtered to one group addresses a child record.
    pub fn is_child(&self) -> bool {
        self.group_id.as_deref().is_some_and(|g| !g.is_empty())
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group_id {
            Some(group) => write!(f, "{}[{}]", self.unit_id, group),
            None => write!(f, "{}", self.unit_id),
        }
    }
}

/// Address of one cached draft: a unit key plus the role that edits it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DraftKey {
    pub unit: UnitKey,
    pub role: EditorRole,
}

impl DraftKey {
    pub fn new(unit: UnitKey, role: EditorRole) -> Self {
        Self { unit, role }
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.unit, self.role.as_str())
    }
}
