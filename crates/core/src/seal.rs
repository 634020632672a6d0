use std::collections::BTreeSet;

use crate::CoreError;

/// Result of asking for a new seal slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealAdd {
    Appended,
    /// The trailing slot is still empty; nothing changed.
    Rejected,
}

/// Ordered seal-number slots for one row, with the set of confirmed indices.
///
/// Holds at least one slot, and never two consecutive empty slots at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealSlots {
    slots: Vec<String>,
    confirmed: BTreeSet<usize>,
}

impl Default for SealSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl SealSlots {
    pub fn new() -> Self {
        Self {
            slots: vec![String::new()],
            confirmed: BTreeSet::new(),
        }
    }

    /// Rebuild from a list of slots and confirmed indices, dropping indices
    /// that point past the end or at empty slots.
    pub fn from_parts(slots: Vec<String>, confirmed: impl IntoIterator<Item = usize>) -> Self {
        let mut slots = slots;
        if slots.is_empty() {
            slots.push(String::new());
        }
        let confirmed = confirmed
            .into_iter()
            .filter(|&i| slots.get(i).is_some_and(|s| !s.trim().is_empty()))
            .collect();
        let mut ledger = Self { slots, confirmed };
        ledger.collapse_trailing_empties();
        ledger
    }

    /// Parse the server's comma-separated form. Everything the server holds
    /// was saved, so every slot comes back confirmed.
    pub fn from_wire(value: Option<&str>) -> Self {
        let slots: Vec<String> = value
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let count = slots.len();
        Self::from_parts(slots, 0..count)
    }

    /// Comma-joined non-empty slots, or `None` when there are none.
    pub fn to_wire(&self) -> Option<String> {
        let values: Vec<&str> = self
            .slots
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn confirmed(&self) -> &BTreeSet<usize> {
        &self.confirmed
    }

    pub fn is_confirmed(&self, index: usize) -> bool {
        self.confirmed.contains(&index)
    }

    pub fn has_value(&self) -> bool {
        self.slots.iter().any(|s| !s.trim().is_empty())
    }

    fn trailing_index(&self) -> usize {
        self.slots.len() - 1
    }

    fn check_index(&self, index: usize) -> Result<(), CoreError> {
        if index >= self.slots.len() {
            return Err(CoreError::InvalidData(format!(
                "seal slot {index} out of range ({} slots)",
                self.slots.len()
            )));
        }
        Ok(())
    }

    /// Append an empty slot, confirming the current trailing slot.
    pub fn add(&mut self) -> SealAdd {
        let last = self.trailing_index();
        if self.slots[last].trim().is_empty() {
            return SealAdd::Rejected;
        }
        self.confirmed.insert(last);
        self.slots.push(String::new());
        SealAdd::Appended
    }

    pub fn update(&mut self, index: usize, value: impl Into<String>) -> Result<(), CoreError> {
        self.check_index(index)?;
        let value = value.into();
        if value.trim().is_empty() {
            self.confirmed.remove(&index);
        }
        self.slots[index] = value;
        self.collapse_trailing_empties();
        Ok(())
    }

    /// Blur confirms only the trailing slot, and only when it holds a value.
    pub fn confirm_on_blur(&mut self, index: usize) -> bool {
        if index != self.trailing_index() || self.slots[index].trim().is_empty() {
            return false;
        }
        self.confirmed.insert(index)
    }

    pub fn remove(&mut self, index: usize) -> Result<(), CoreError> {
        self.check_index(index)?;
        if self.slots.len() == 1 {
            self.slots[0].clear();
            self.confirmed.clear();
            return Ok(());
        }
        self.slots.remove(index);
        self.confirmed = self
            .confirmed
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();
        self.collapse_trailing_empties();
        Ok(())
    }

    fn collapse_trailing_empties(&mut self) {
        while self.slots.len() >= 2
            && self.slots[self.slots.len() - 1].trim().is_empty()
            && self.slots[self.slots.len() - 2].trim().is_empty()
        {
            self.slots.pop();
        }
    }
}
