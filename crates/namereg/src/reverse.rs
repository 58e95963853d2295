//! Reverse index: each holder's chosen primary name.
//!
//! A pointer is only a hint. It is cleared when the name leaves the holder,
//! and readers still re-check ownership before trusting it.

use std::collections::HashMap;

use namereg_core::{Address, Label};

#[derive(Debug, Default, Clone)]
pub struct ReverseIndex {
    primary: HashMap<Address, Label>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, holder: &Address) -> Option<&Label> {
        self.primary.get(holder)
    }

    pub fn set(&mut self, holder: Address, label: Label) -> Option<Label> {
        self.primary.insert(holder, label)
    }

    /// Clear `holder`'s pointer if it points at `label`.
    pub fn clear_if(&mut self, holder: &Address, label: &Label) -> bool {
        if self.primary.get(holder) == Some(label) {
            self.primary.remove(holder);
            true
        } else {
            false
        }
    }

    pub(crate) fn restore(&mut self, holder: Address, label: Option<Label>) {
        match label {
            Some(label) => self.primary.insert(holder, label),
            None => self.primary.remove(&holder),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_only_matching() {
        let holder = Address::from_bytes([1; 32]);
        let alice = Label::parse("alice").unwrap();
        let bobby = Label::parse("bobby").unwrap();

        let mut index = ReverseIndex::new();
        index.set(holder, alice.clone());

        assert!(!index.clear_if(&holder, &bobby));
        assert_eq!(index.get(&holder), Some(&alice));
        assert!(index.clear_if(&holder, &alice));
        assert_eq!(index.get(&holder), None);
    }
}
