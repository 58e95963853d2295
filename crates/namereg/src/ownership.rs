//! Ownership index.
//!
//! Keeps `label -> token`, `token -> label` and `holder -> [labels]` in step.
//! A label sits in exactly one holder's list at a time. List order is not
//! meaningful: removal swaps the last element into the hole.

use std::collections::HashMap;

use namereg_core::{Address, Label, TokenId};

#[derive(Debug, Default, Clone)]
pub struct OwnershipIndex {
    token_by_label: HashMap<Label, TokenId>,
    label_by_token: HashMap<TokenId, Label>,
    holdings: HashMap<Address, Vec<Label>>,
}

/// Prior values of the index entries an operation is about to touch.
#[derive(Debug, Clone)]
pub(crate) struct OwnershipCheckpoint {
    labels: Vec<(Label, Option<TokenId>)>,
    tokens: Vec<(TokenId, Option<Label>)>,
    holders: Vec<(Address, Option<Vec<Label>>)>,
}

impl OwnershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_of(&self, label: &Label) -> Option<TokenId> {
        self.token_by_label.get(label).copied()
    }

    pub fn label_of(&self, token: TokenId) -> Option<&Label> {
        self.label_by_token.get(&token)
    }

    /// Labels held by `holder`, in no particular order.
    pub fn names_of(&self, holder: &Address) -> &[Label] {
        self.holdings.get(holder).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bind a freshly minted `token` to `label` and give it to `holder`.
    pub fn mint(&mut self, label: &Label, token: TokenId, holder: Address) {
        self.token_by_label.insert(label.clone(), token);
        self.label_by_token.insert(token, label.clone());
        self.holdings.entry(holder).or_default().push(label.clone());
    }

    /// Move `label` from `from` to `to`.
    pub fn transfer(&mut self, label: &Label, from: &Address, to: Address) {
        self.detach(label, from);
        self.holdings.entry(to).or_default().push(label.clone());
    }

    /// Remove every entry for `label`, which `holder` currently holds.
    ///
    /// Returns the token that was bound to it.
    pub fn remove(&mut self, label: &Label, holder: &Address) -> Option<TokenId> {
        self.detach(label, holder);
        let token = self.token_by_label.remove(label)?;
        self.label_by_token.remove(&token);
        Some(token)
    }

    fn detach(&mut self, label: &Label, holder: &Address) {
        if let Some(list) = self.holdings.get_mut(holder) {
            if let Some(pos) = list.iter().position(|l| l == label) {
                list.swap_remove(pos);
            }
            if list.is_empty() {
                self.holdings.remove(holder);
            }
        }
    }

    pub(crate) fn checkpoint(
        &self,
        labels: &[&Label],
        tokens: &[TokenId],
        holders: &[Address],
    ) -> OwnershipCheckpoint {
        OwnershipCheckpoint {
            labels: labels
                .iter()
                .map(|l| ((*l).clone(), self.token_of(l)))
                .collect(),
            tokens: tokens
                .iter()
                .map(|t| (*t, self.label_of(*t).cloned()))
                .collect(),
            holders: holders
                .iter()
                .map(|h| (*h, self.holdings.get(h).cloned()))
                .collect(),
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: OwnershipCheckpoint) {
        for (label, token) in checkpoint.labels {
            match token {
                Some(token) => self.token_by_label.insert(label, token),
                None => self.token_by_label.remove(&label),
            };
        }
        for (token, label) in checkpoint.tokens {
            match label {
                Some(label) => self.label_by_token.insert(token, label),
                None => self.label_by_token.remove(&token),
            };
        }
        for (holder, list) in checkpoint.holders {
            match list {
                Some(list) => self.holdings.insert(holder, list),
                None => self.holdings.remove(&holder),
            };
        }
    }

    /// Check internal consistency. Used by tests.
    pub fn is_consistent(&self) -> bool {
        let forward = self
            .token_by_label
            .iter()
            .all(|(label, token)| self.label_by_token.get(token) == Some(label));
        let sizes = self.token_by_label.len() == self.label_by_token.len();

        let mut seen = 0usize;
        for list in self.holdings.values() {
            for label in list {
                if !self.token_by_label.contains_key(label) {
                    return false;
                }
                seen += 1;
            }
        }
        forward && sizes && seen == self.token_by_label.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 32])
    }

    #[test]
    fn test_mint_and_lookup() {
        let mut index = OwnershipIndex::new();
        index.mint(&label("alice"), TokenId(1), addr(1));

        assert_eq!(index.token_of(&label("alice")), Some(TokenId(1)));
        assert_eq!(index.label_of(TokenId(1)), Some(&label("alice")));
        assert_eq!(index.names_of(&addr(1)), &[label("alice")]);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_transfer_moves_between_lists() {
        let mut index = OwnershipIndex::new();
        index.mint(&label("alice"), TokenId(1), addr(1));
        index.mint(&label("bobby"), TokenId(2), addr(1));
        index.mint(&label("carol"), TokenId(3), addr(1));

        index.transfer(&label("alice"), &addr(1), addr(2));

        let mut left: Vec<_> = index.names_of(&addr(1)).to_vec();
        left.sort();
        assert_eq!(left, vec![label("bobby"), label("carol")]);
        assert_eq!(index.names_of(&addr(2)), &[label("alice")]);
        assert_eq!(index.token_of(&label("alice")), Some(TokenId(1)));
        assert!(index.is_consistent());
    }

    #[test]
    fn test_remove_clears_everything() {
        let mut index = OwnershipIndex::new();
        index.mint(&label("alice"), TokenId(1), addr(1));

        assert_eq!(index.remove(&label("alice"), &addr(1)), Some(TokenId(1)));
        assert_eq!(index.token_of(&label("alice")), None);
        assert_eq!(index.label_of(TokenId(1)), None);
        assert!(index.names_of(&addr(1)).is_empty());
        assert!(index.is_consistent());
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut index = OwnershipIndex::new();
        index.mint(&label("alice"), TokenId(1), addr(1));
        index.mint(&label("bobby"), TokenId(2), addr(1));

        let cp = index.checkpoint(
            &[&label("alice")],
            &[TokenId(1), TokenId(3)],
            &[addr(1), addr(2)],
        );
        index.remove(&label("alice"), &addr(1));
        index.mint(&label("alice"), TokenId(3), addr(2));
        index.restore(cp);

        assert_eq!(index.token_of(&label("alice")), Some(TokenId(1)));
        assert_eq!(index.label_of(TokenId(3)), None);
        assert_eq!(index.names_of(&addr(1)), &[label("alice"), label("bobby")]);
        assert!(index.names_of(&addr(2)).is_empty());
        assert!(index.is_consistent());
    }
}
