pub mod completion;
pub mod error;
pub mod field_value;
pub mod ids;
pub mod model;
pub mod seal;
pub mod snapshot;
pub mod wire;

pub use error::CoreError;
pub use field_value::{FieldValue, HeaderField, RowField};
pub use ids::*;
pub use model::{Header, LifecycleStatus, ModeFlags, Row, SplitState, Unit, WorkingState};
pub use seal::{SealAdd, SealSlots};
pub use snapshot::{DraftRow, DraftSnapshot};
