//! Outbound payments.
//!
//! The registry holds collected fees itself. Refunds and withdrawals leave
//! through a [`Payout`], which reports failure instead of losing funds.

use std::collections::{HashMap, HashSet};

use namereg_core::{Address, Amount};
use thiserror::Error;

/// Failure to deliver an outbound payment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutError {
    #[error("recipient {0} does not accept payments")]
    Rejected(Address),

    #[error("balance of {0} would overflow")]
    Overflow(Address),
}

/// The outbound payment boundary.
///
/// A payout either credits `to` with exactly `amount` or returns an error
/// and leaves no trace.
pub trait Payout {
    fn pay(&mut self, to: &Address, amount: Amount) -> Result<(), PayoutError>;
}

/// In-memory account ledger implementing [`Payout`].
///
/// Accounts can be blocked to simulate recipients that refuse payments.
#[derive(Debug, Default, Clone)]
pub struct LedgerPayout {
    balances: HashMap<Address, Amount>,
    blocked: HashSet<Address>,
}

impl LedgerPayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount received by `account` so far.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Make every future payment to `account` fail.
    pub fn block(&mut self, account: Address) {
        self.blocked.insert(account);
    }

    pub fn unblock(&mut self, account: &Address) {
        self.blocked.remove(account);
    }
}

impl Payout for LedgerPayout {
    fn pay(&mut self, to: &Address, amount: Amount) -> Result<(), PayoutError> {
        if self.blocked.contains(to) {
            return Err(PayoutError::Rejected(*to));
        }
        let balance = self.balances.entry(*to).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(PayoutError::Overflow(*to))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pay_and_block() {
        let alice = Address::from_bytes([1; 32]);
        let mut ledger = LedgerPayout::new();

        ledger.pay(&alice, 10).unwrap();
        ledger.pay(&alice, 5).unwrap();
        assert_eq!(ledger.balance_of(&alice), 15);

        ledger.block(alice);
        assert_eq!(ledger.pay(&alice, 1), Err(PayoutError::Rejected(alice)));
        assert_eq!(ledger.balance_of(&alice), 15);

        ledger.unblock(&alice);
        ledger.pay(&alice, 1).unwrap();
        assert_eq!(ledger.balance_of(&alice), 16);
    }

    #[test]
    fn test_overflow_is_reported() {
        let alice = Address::from_bytes([1; 32]);
        let mut ledger = LedgerPayout::new();
        ledger.pay(&alice, Amount::MAX).unwrap();
        assert_eq!(ledger.pay(&alice, 1), Err(PayoutError::Overflow(alice)));
        assert_eq!(ledger.balance_of(&alice), Amount::MAX);
    }
}
