use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A value typed into an edit control or produced by an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Integer(_) => false,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s,
            Self::Integer(n) => n.to_string(),
        }
    }

    /// Interpret as a count. Blank input is "unset", never zero.
    pub fn to_count(&self, field: &'static str) -> Result<Option<u32>, CoreError> {
        match self {
            Self::Null => Ok(None),
            Self::Text(s) if s.trim().is_empty() => Ok(None),
            Self::Text(s) => s.trim().parse::<u32>().map(Some).map_err(|_| {
                CoreError::InvalidValue {
                    field,
                    value: s.clone(),
                }
            }),
            Self::Integer(n) => u32::try_from(*n).map(Some).map_err(|_| {
                CoreError::InvalidValue {
                    field,
                    value: n.to_string(),
                }
            }),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Option<u32>> for FieldValue {
    fn from(n: Option<u32>) -> Self {
        match n {
            Some(n) => Self::Integer(n as i64),
            None => Self::Null,
        }
    }
}

/// User-editable row fields. Server-derived counters and timestamps are
/// deliberately absent: nothing in the edit path can address them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RowField {
    Identifier,
    WagonType,
    Weight,
    TargetCount,
    Commodity,
    Remarks,
    StoppageNote,
    GroupId,
    Destination,
    CounterpartyId,
}

impl RowField {
    pub const ALL: [RowField; 10] = [
        Self::Identifier,
        Self::WagonType,
        Self::Weight,
        Self::TargetCount,
        Self::Commodity,
        Self::Remarks,
        Self::StoppageNote,
        Self::GroupId,
        Self::Destination,
        Self::CounterpartyId,
    ];

    /// Cleared on a row whose group id moves to a different group.
    pub const GROUP_DEPENDENT: [RowField; 5] = [
        Self::Destination,
        Self::CounterpartyId,
        Self::Weight,
        Self::TargetCount,
        Self::Commodity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::WagonType => "wagon_type",
            Self::Weight => "weight",
            Self::TargetCount => "target_count",
            Self::Commodity => "commodity",
            Self::Remarks => "remarks",
            Self::StoppageNote => "stoppage_note",
            Self::GroupId => "group_id",
            Self::Destination => "destination",
            Self::CounterpartyId => "counterparty_id",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| CoreError::InvalidData(format!("unknown row field: {s}")))
    }

    /// Row-level grouping fields only exist in multi-group mode.
    pub fn is_group_scoped(&self) -> bool {
        matches!(self, Self::GroupId | Self::Destination | Self::CounterpartyId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeaderField {
    GroupId,
    Destination,
    CounterpartyId,
    Commodity,
}

impl HeaderField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroupId => "group_id",
            Self::Destination => "destination",
            Self::CounterpartyId => "counterparty_id",
            Self::Commodity => "commodity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_count_is_unset() {
        assert_eq!(FieldValue::text("").to_count("target_count").unwrap(), None);
        assert_eq!(FieldValue::text("  ").to_count("target_count").unwrap(), None);
        assert_eq!(FieldValue::Null.to_count("target_count").unwrap(), None);
        assert_eq!(FieldValue::text("0").to_count("target_count").unwrap(), Some(0));
        assert_eq!(FieldValue::text(" 42 ").to_count("target_count").unwrap(), Some(42));
        assert_eq!(FieldValue::Integer(7).to_count("target_count").unwrap(), Some(7));
    }

    #[test]
    fn malformed_count_rejected() {
        match FieldValue::text("12a").to_count("target_count") {
            Err(CoreError::InvalidValue { field, value }) => {
                assert_eq!(field, "target_count");
                assert_eq!(value, "12a");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
        assert!(FieldValue::Integer(-1).to_count("target_count").is_err());
    }

    #[test]
    fn field_names_parse_back() {
        for field in RowField::ALL {
            assert_eq!(RowField::parse(field.as_str()).unwrap(), field);
        }
        assert!(RowField::parse("loaded_count").is_err());
    }
}
