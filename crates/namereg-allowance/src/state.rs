//! Allowance ledger state.
//!
//! Grants are indexed by id and by recipient. Remaining units are computed
//! from each grant's use count, revocation flag and conditions at query time.

use std::collections::HashMap;

use namereg_core::{Address, Label, Timestamp};

use crate::error::{AllowanceError, Result};
use crate::grant::{Conditions, GrantId, GrantPayload, RevokePayload};
use crate::Allowance;

/// State of a single grant.
#[derive(Debug, Clone)]
pub struct GrantState {
    /// The grant identifier.
    pub grant_id: GrantId,

    /// Who issued this grant.
    pub grantor: Address,

    /// Who received it.
    pub recipient: Address,

    /// Units issued.
    pub units: u32,

    /// Optional validity window.
    pub conditions: Option<Conditions>,

    /// When the grant was issued.
    pub issued_at: Timestamp,

    /// Whether this grant has been revoked.
    pub revoked: bool,

    /// When it was revoked (if revoked).
    pub revoked_at: Option<Timestamp>,

    /// Labels each consumed unit was spent on, in order.
    pub spent_on: Vec<Label>,
}

impl GrantState {
    /// Check if this grant is usable at `now`, ignoring remaining units.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        if self.revoked {
            return false;
        }
        match self.conditions {
            Some(ref conditions) => conditions.is_valid(now),
            None => true,
        }
    }

    /// Units still spendable at `now`.
    pub fn remaining(&self, now: Timestamp) -> u32 {
        if !self.is_valid(now) {
            return 0;
        }
        self.units.saturating_sub(self.used())
    }

    /// Units consumed so far.
    pub fn used(&self) -> u32 {
        u32::try_from(self.spent_on.len()).unwrap_or(u32::MAX)
    }
}

/// The in-process allowance service.
#[derive(Debug)]
pub struct AllowanceLedger {
    /// The only account allowed to issue and revoke grants.
    administrator: Address,

    /// All grants indexed by id.
    grants: HashMap<GrantId, GrantState>,

    /// Index: recipient -> grants, in issue order.
    by_recipient: HashMap<Address, Vec<GrantId>>,

    /// Issue counter feeding grant id derivation.
    nonce: u64,
}

impl AllowanceLedger {
    /// Create an empty ledger administered by `administrator`.
    pub fn new(administrator: Address) -> Self {
        Self {
            administrator,
            grants: HashMap::new(),
            by_recipient: HashMap::new(),
            nonce: 0,
        }
    }

    /// The administrator address.
    pub fn administrator(&self) -> Address {
        self.administrator
    }

    fn require_administrator(&self, caller: &Address) -> Result<()> {
        if *caller != self.administrator {
            return Err(AllowanceError::NotAdministrator(caller.to_string()));
        }
        Ok(())
    }

    /// Issue a grant.
    pub fn issue(
        &mut self,
        caller: &Address,
        payload: GrantPayload,
        now: Timestamp,
    ) -> Result<GrantId> {
        self.require_administrator(caller)?;
        if payload.units == 0 {
            return Err(AllowanceError::InvalidGrant("grant of zero units".into()));
        }

        let grant_id = GrantId::derive(caller, &payload.recipient, self.nonce);
        self.nonce += 1;

        let grant = GrantState {
            grant_id,
            grantor: *caller,
            recipient: payload.recipient,
            units: payload.units,
            conditions: payload.conditions,
            issued_at: now,
            revoked: false,
            revoked_at: None,
            spent_on: Vec::new(),
        };

        self.grants.insert(grant_id, grant);
        self.by_recipient
            .entry(payload.recipient)
            .or_default()
            .push(grant_id);

        tracing::debug!(grant = %grant_id, recipient = %payload.recipient, units = payload.units, "allowance granted");
        Ok(grant_id)
    }

    /// Issue a grant from its CBOR encoding.
    pub fn issue_bytes(&mut self, caller: &Address, bytes: &[u8], now: Timestamp) -> Result<GrantId> {
        let payload = GrantPayload::from_bytes(bytes)?;
        self.issue(caller, payload, now)
    }

    /// Revoke a grant.
    pub fn revoke(&mut self, caller: &Address, payload: RevokePayload, now: Timestamp) -> Result<()> {
        self.require_administrator(caller)?;
        let grant = self
            .grants
            .get_mut(&payload.grant_id)
            .ok_or_else(|| AllowanceError::GrantNotFound(payload.grant_id.to_string()))?;

        if grant.revoked {
            return Err(AllowanceError::GrantRevoked(payload.grant_id.to_string()));
        }

        grant.revoked = true;
        grant.revoked_at = Some(now);
        tracing::debug!(grant = %payload.grant_id, reason = ?payload.reason, "allowance revoked");
        Ok(())
    }

    /// Get a grant by id.
    pub fn get_grant(&self, grant_id: &GrantId) -> Option<&GrantState> {
        self.grants.get(grant_id)
    }

    /// List all grants for a recipient.
    pub fn grants_for(&self, recipient: &Address) -> Vec<&GrantState> {
        self.by_recipient
            .get(recipient)
            .map(|ids| ids.iter().filter_map(|id| self.grants.get(id)).collect())
            .unwrap_or_default()
    }

    /// Total spendable units for a recipient at `now`.
    pub fn remaining_for(&self, recipient: &Address, now: Timestamp) -> u32 {
        self.grants_for(recipient)
            .into_iter()
            .fold(0u32, |acc, g| acc.saturating_add(g.remaining(now)))
    }
}

impl Allowance for AllowanceLedger {
    fn can_waive(&self, caller: &Address, now: Timestamp) -> (bool, u32) {
        let remaining = self.remaining_for(caller, now);
        (remaining > 0, remaining)
    }

    fn consume(&mut self, caller: &Address, label: &Label, now: Timestamp) -> Result<GrantId> {
        // Spend from the oldest grant that still has a unit.
        let grant_id = self
            .by_recipient
            .get(caller)
            .and_then(|ids| {
                ids.iter()
                    .find(|id| self.grants.get(*id).map_or(false, |g| g.remaining(now) > 0))
            })
            .copied()
            .ok_or_else(|| AllowanceError::NoAllowance(caller.to_string()))?;

        let grant = self
            .grants
            .get_mut(&grant_id)
            .ok_or_else(|| AllowanceError::GrantNotFound(grant_id.to_string()))?;
        grant.spent_on.push(label.clone());

        tracing::debug!(grant = %grant_id, %label, "allowance consumed");
        Ok(grant_id)
    }

    fn release(&mut self, caller: &Address, grant_id: &GrantId, label: &Label) -> Result<()> {
        let grant = self
            .grants
            .get_mut(grant_id)
            .filter(|g| g.recipient == *caller)
            .ok_or_else(|| AllowanceError::GrantNotFound(grant_id.to_string()))?;
        let position = grant
            .spent_on
            .iter()
            .rposition(|spent| spent == label)
            .ok_or_else(|| {
                AllowanceError::GrantNotFound(format!("no unit of {grant_id} spent on {label}"))
            })?;
        grant.spent_on.remove(position);

        tracing::debug!(grant = %grant_id, %label, "allowance released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namereg_core::Keypair;

    fn admin() -> Address {
        Keypair::from_seed(&[0xaa; 32]).address()
    }

    fn user() -> Address {
        Keypair::from_seed(&[0xbb; 32]).address()
    }

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    #[test]
    fn test_issue_and_consume() {
        let mut ledger = AllowanceLedger::new(admin());
        let id = ledger.issue(&admin(), GrantPayload::new(user(), 2), 0).unwrap();

        assert_eq!(ledger.can_waive(&user(), 0), (true, 2));
        ledger.consume(&user(), &label("alice"), 0).unwrap();
        assert_eq!(ledger.can_waive(&user(), 0), (true, 1));
        ledger.consume(&user(), &label("bobby"), 0).unwrap();
        assert_eq!(ledger.can_waive(&user(), 0), (false, 0));

        assert!(matches!(
            ledger.consume(&user(), &label("carol"), 0),
            Err(AllowanceError::NoAllowance(_))
        ));
        assert_eq!(
            ledger.get_grant(&id).unwrap().spent_on,
            vec![label("alice"), label("bobby")]
        );
    }

    #[test]
    fn test_only_administrator_issues() {
        let mut ledger = AllowanceLedger::new(admin());
        assert!(matches!(
            ledger.issue(&user(), GrantPayload::new(user(), 1), 0),
            Err(AllowanceError::NotAdministrator(_))
        ));
    }

    #[test]
    fn test_zero_unit_grant_rejected() {
        let mut ledger = AllowanceLedger::new(admin());
        assert!(matches!(
            ledger.issue(&admin(), GrantPayload::new(user(), 0), 0),
            Err(AllowanceError::InvalidGrant(_))
        ));
    }

    #[test]
    fn test_revoke_removes_units() {
        let mut ledger = AllowanceLedger::new(admin());
        let id = ledger.issue(&admin(), GrantPayload::new(user(), 5), 0).unwrap();
        ledger.revoke(&admin(), RevokePayload::new(id), 1).unwrap();

        assert_eq!(ledger.can_waive(&user(), 2), (false, 0));
        assert!(matches!(
            ledger.revoke(&admin(), RevokePayload::new(id), 3),
            Err(AllowanceError::GrantRevoked(_))
        ));
    }

    #[test]
    fn test_expired_grant() {
        let mut ledger = AllowanceLedger::new(admin());
        let payload = GrantPayload::new(user(), 1).with_conditions(Conditions::expires_at(1000));
        ledger.issue(&admin(), payload, 0).unwrap();

        assert_eq!(ledger.can_waive(&user(), 500), (true, 1));
        assert_eq!(ledger.can_waive(&user(), 1500), (false, 0));
        assert!(ledger.consume(&user(), &label("alice"), 1500).is_err());
    }

    #[test]
    fn test_units_sum_across_grants_and_oldest_spent_first() {
        let mut ledger = AllowanceLedger::new(admin());
        let first = ledger.issue(&admin(), GrantPayload::new(user(), 1), 0).unwrap();
        let second = ledger.issue(&admin(), GrantPayload::new(user(), 3), 0).unwrap();
        assert_ne!(first, second);
        assert_eq!(ledger.can_waive(&user(), 0), (true, 4));

        ledger.consume(&user(), &label("alice"), 0).unwrap();
        assert_eq!(ledger.get_grant(&first).unwrap().used(), 1);
        assert_eq!(ledger.get_grant(&second).unwrap().used(), 0);
    }

    #[test]
    fn test_release_returns_unit() {
        let mut ledger = AllowanceLedger::new(admin());
        let id = ledger.issue(&admin(), GrantPayload::new(user(), 1), 0).unwrap();
        assert_eq!(ledger.consume(&user(), &label("alice"), 0).unwrap(), id);
        assert_eq!(ledger.can_waive(&user(), 0), (false, 0));

        ledger.release(&user(), &id, &label("alice")).unwrap();
        assert_eq!(ledger.can_waive(&user(), 0), (true, 1));
        assert!(ledger.release(&user(), &id, &label("alice")).is_err());
    }

    #[test]
    fn test_release_targets_the_grant_that_was_spent() {
        let mut ledger = AllowanceLedger::new(admin());
        let later = ledger
            .issue(
                &admin(),
                GrantPayload::new(user(), 1).with_conditions(Conditions::not_before(100)),
                0,
            )
            .unwrap();
        let early = ledger
            .issue(
                &admin(),
                GrantPayload::new(user(), 1).with_conditions(Conditions::expires_at(150)),
                0,
            )
            .unwrap();

        // At t=50 only `early` is usable; at t=120 `later` is the oldest usable grant.
        assert_eq!(ledger.consume(&user(), &label("alice"), 50).unwrap(), early);
        let spent = ledger.consume(&user(), &label("alice"), 120).unwrap();
        assert_eq!(spent, later);

        ledger.release(&user(), &spent, &label("alice")).unwrap();
        assert_eq!(ledger.get_grant(&later).unwrap().used(), 0);
        assert_eq!(ledger.get_grant(&early).unwrap().used(), 1);
        assert_eq!(ledger.can_waive(&user(), 200), (true, 1));
    }

    #[test]
    fn test_release_rejects_other_recipient() {
        let mut ledger = AllowanceLedger::new(admin());
        let id = ledger.issue(&admin(), GrantPayload::new(user(), 1), 0).unwrap();
        ledger.consume(&user(), &label("alice"), 0).unwrap();

        assert!(matches!(
            ledger.release(&admin(), &id, &label("alice")),
            Err(AllowanceError::GrantNotFound(_))
        ));
        assert_eq!(ledger.get_grant(&id).unwrap().used(), 1);
    }

    proptest::proptest! {
        #[test]
        fn prop_units_are_conserved(grants in proptest::collection::vec(1u32..5, 1..5), spend in 0usize..20) {
            let mut ledger = AllowanceLedger::new(admin());
            for units in &grants {
                ledger.issue(&admin(), GrantPayload::new(user(), *units), 0).unwrap();
            }
            let total: u32 = grants.iter().sum();

            let mut spent = 0u32;
            let mut last_grant = None;
            for i in 0..spend {
                if let Ok(id) = ledger.consume(&user(), &label(&format!("name{i}")), 0) {
                    spent += 1;
                    last_grant = Some(id);
                }
            }
            proptest::prop_assert_eq!(spent, total.min(spend as u32));
            proptest::prop_assert_eq!(ledger.remaining_for(&user(), 0), total - spent);

            if let Some(id) = last_grant {
                let last = label(&format!("name{}", spent - 1));
                ledger.release(&user(), &id, &last).unwrap();
                proptest::prop_assert_eq!(ledger.remaining_for(&user(), 0), total - spent + 1);
            }
        }
    }

    #[test]
    fn test_issue_from_bytes() {
        let mut ledger = AllowanceLedger::new(admin());
        let bytes = GrantPayload::new(user(), 1).to_bytes().unwrap();
        ledger.issue_bytes(&admin(), &bytes, 0).unwrap();
        assert_eq!(ledger.grants_for(&user()).len(), 1);
    }
}
