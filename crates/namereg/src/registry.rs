//! The Registry: the name lifecycle state machine.
//!
//! The registry owns every name record and index. It is the only component
//! that mutates them, and it finishes its own bookkeeping before handing
//! control to the allowance service or sending funds through the payout.
//!
//! Each operation either commits in full or leaves the registry exactly as
//! it found it. Operations that call outward take a checkpoint of every
//! entry they touch and restore it if the outward call fails.

use std::collections::HashMap;

use namereg_allowance::Allowance;
use namereg_core::{
    validate_duration, validate_label, Address, Amount, CommitmentHash, Label, NameState,
    RegistryConfig, RegistryEvent, Secret, Timestamp, TokenId,
};

use crate::commitments::CommitmentStore;
use crate::error::{RegistryError, Result};
use crate::ownership::{OwnershipCheckpoint, OwnershipIndex};
use crate::record::NameRecord;
use crate::resolver::RegistryView;
use crate::reverse::ReverseIndex;
use crate::treasury::Payout;

/// Who is calling, when, with how much value attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
    /// Payment attached to the call.
    pub value: Amount,
    /// Position of this operation in the execution order. Several operations
    /// may share a sequence number; it never decreases.
    pub sequence: u64,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self {
            caller,
            now,
            value: 0,
            sequence: 0,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}

/// Prior values of everything one operation may touch.
struct Checkpoint {
    label: Label,
    record: Option<NameRecord>,
    ownership: OwnershipCheckpoint,
    primaries: Vec<(Address, Option<Label>)>,
    commitment: Option<(CommitmentHash, Option<Timestamp>)>,
    rate_limit: Option<(Address, Option<u64>)>,
    next_token: TokenId,
    treasury: Amount,
    events: usize,
}

/// The registry state machine.
pub struct Registry<A: Allowance, P: Payout> {
    config: RegistryConfig,
    administrator: Address,

    records: HashMap<Label, NameRecord>,
    ownership: OwnershipIndex,
    reverse: ReverseIndex,
    commitments: CommitmentStore,
    /// Sequence number of each caller's last registration.
    last_registration: HashMap<Address, u64>,
    next_token: TokenId,
    treasury: Amount,

    allowance: A,
    payout: P,

    /// Events emitted since the last [`Registry::take_events`].
    events: Vec<RegistryEvent>,
}

impl<A: Allowance, P: Payout> Registry<A, P> {
    /// Create an empty registry.
    pub fn new(
        config: RegistryConfig,
        administrator: Address,
        allowance: A,
        payout: P,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            administrator,
            records: HashMap::new(),
            ownership: OwnershipIndex::new(),
            reverse: ReverseIndex::new(),
            commitments: CommitmentStore::new(),
            last_registration: HashMap::new(),
            next_token: TokenId::FIRST,
            treasury: 0,
            allowance,
            payout,
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn administrator(&self) -> Address {
        self.administrator
    }

    pub fn allowance(&self) -> &A {
        &self.allowance
    }

    /// The allowance service, for issuing and revoking grants.
    pub fn allowance_mut(&mut self) -> &mut A {
        &mut self.allowance
    }

    pub fn payout(&self) -> &P {
        &self.payout
    }

    pub fn payout_mut(&mut self) -> &mut P {
        &mut self.payout
    }

    /// Drain the events emitted by successful operations.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commit-reveal
    // ─────────────────────────────────────────────────────────────────────────

    /// Record an opaque commitment at `ctx.now`.
    ///
    /// Resubmitting the same hash restarts its clock.
    pub fn commit(&mut self, ctx: &CallContext, hash: CommitmentHash) -> Result<()> {
        reject_value(ctx)?;
        self.commitments.submit(hash, ctx.now);
        self.events.push(RegistryEvent::CommitmentSubmitted { hash, at: ctx.now });
        tracing::debug!(%hash, at = ctx.now, "commitment submitted");
        Ok(())
    }

    /// Register `raw_label` for `duration` periods, redeeming the caller's
    /// commitment to `(label, caller, secret)`.
    ///
    /// Returns the freshly minted token.
    pub fn register(
        &mut self,
        ctx: &CallContext,
        raw_label: &str,
        duration: u32,
        secret: &Secret,
        resolver: Option<Address>,
    ) -> Result<TokenId> {
        let label = validate_label(raw_label, &self.config.labels)?;
        validate_duration(duration, self.config.max_duration)?;

        let hash = CommitmentHash::derive(&label, &ctx.caller, secret);
        self.commitments.check(
            &hash,
            ctx.now,
            self.config.min_commitment_age,
            self.config.max_commitment_age,
        )?;

        let stale = match self.records.get(&label) {
            Some(record) if !record.state(self.config.grace_period, ctx.now).is_burnable() => {
                return Err(RegistryError::DomainTaken(label));
            }
            Some(record) => Some(record.clone()),
            None => None,
        };

        if let Some(&last) = self.last_registration.get(&ctx.caller) {
            let next_allowed = last.saturating_add(self.config.min_registration_spacing);
            if ctx.sequence < next_allowed {
                return Err(RegistryError::TooFast { next_allowed });
            }
        }

        let length = label.char_len();
        let fee = self
            .config
            .prices
            .fee(length, duration, self.config.max_duration)?;
        let waived = length >= self.config.waiver_min_length
            && self.allowance.can_waive(&ctx.caller, ctx.now).0;
        let charged = if waived { 0 } else { fee };
        if ctx.value < charged {
            return Err(RegistryError::InsufficientPayment {
                required: charged,
                offered: ctx.value,
            });
        }
        let excess = ctx.value - charged;

        let expires_at = self.expiry_after(ctx.now, duration)?;
        let token = self.next_token;
        let next_token = token.next().ok_or(RegistryError::TokenSpaceExhausted)?;
        let treasury = self
            .treasury
            .checked_add(charged)
            .ok_or(RegistryError::FeeOverflow)?;

        // Effects.
        let mut holders = vec![ctx.caller];
        let mut tokens = vec![token];
        if let Some(old) = &stale {
            holders.push(old.holder);
            tokens.push(old.token_id);
        }
        let checkpoint = self.checkpoint(&label, &holders, &tokens, Some(hash), Some(ctx.caller));

        self.commitments.remove(&hash);
        if let Some(old) = stale {
            self.clear_record(&old, ctx.now);
        }
        self.ownership.mint(&label, token, ctx.caller);
        self.records.insert(
            label.clone(),
            NameRecord {
                label: label.clone(),
                holder: ctx.caller,
                token_id: token,
                registered_at: ctx.now,
                expires_at,
                resolver,
            },
        );
        self.last_registration.insert(ctx.caller, ctx.sequence);
        self.next_token = next_token;
        self.treasury = treasury;

        self.events.push(RegistryEvent::Registered {
            label: label.clone(),
            holder: ctx.caller,
            token_id: token,
            expires_at,
            cost: charged,
        });
        if resolver.is_some() {
            self.events.push(RegistryEvent::ResolverChanged {
                label: label.clone(),
                token_id: token,
                resolver,
            });
        }

        // Interactions.
        let spent_grant = if waived {
            match self.allowance.consume(&ctx.caller, &label, ctx.now) {
                Ok(grant) => Some(grant),
                Err(err) => {
                    tracing::warn!(%label, error = %err, "allowance consume failed, rolling back registration");
                    self.restore(checkpoint);
                    return Err(RegistryError::AllowanceConsumeFailed(err));
                }
            }
        } else {
            None
        };
        if excess > 0 {
            if let Err(err) = self.payout.pay(&ctx.caller, excess) {
                tracing::warn!(%label, excess, error = %err, "refund failed, rolling back registration");
                if let Some(grant) = &spent_grant {
                    if let Err(release_err) = self.allowance.release(&ctx.caller, grant, &label) {
                        tracing::warn!(%label, error = %release_err, "allowance unit could not be released");
                    }
                }
                self.restore(checkpoint);
                return Err(RegistryError::RefundFailed(err));
            }
        }

        tracing::info!(%label, holder = %ctx.caller, %token, expires_at, cost = charged, waived, "name registered");
        Ok(token)
    }

    /// Extend `label` by `duration` periods.
    ///
    /// Anyone may renew an active name. During grace only the holder may.
    /// Returns the new expiry.
    pub fn renew(&mut self, ctx: &CallContext, label: &Label, duration: u32) -> Result<Timestamp> {
        validate_duration(duration, self.config.max_duration)?;

        let record = self
            .records
            .get(label)
            .ok_or_else(|| RegistryError::NameNotFound(label.clone()))?;
        match record.state(self.config.grace_period, ctx.now) {
            NameState::Active => {}
            NameState::Grace if record.holder == ctx.caller => {}
            NameState::Grace => return Err(RegistryError::GraceRestricted(label.clone())),
            NameState::Burnable => return Err(RegistryError::RenewalClosed(label.clone())),
        }

        let fee = self
            .config
            .prices
            .fee(label.char_len(), duration, self.config.max_duration)?;
        if ctx.value < fee {
            return Err(RegistryError::InsufficientPayment {
                required: fee,
                offered: ctx.value,
            });
        }
        let excess = ctx.value - fee;

        let expires_at = self.expiry_after(ctx.now.max(record.expires_at), duration)?;
        let token = record.token_id;
        let treasury = self
            .treasury
            .checked_add(fee)
            .ok_or(RegistryError::FeeOverflow)?;

        let checkpoint = self.checkpoint(label, &[], &[], None, None);
        if let Some(record) = self.records.get_mut(label) {
            record.expires_at = expires_at;
        }
        self.treasury = treasury;
        self.events.push(RegistryEvent::Renewed {
            label: label.clone(),
            token_id: token,
            expires_at,
            cost: fee,
        });

        if excess > 0 {
            if let Err(err) = self.payout.pay(&ctx.caller, excess) {
                tracing::warn!(%label, excess, error = %err, "refund failed, rolling back renewal");
                self.restore(checkpoint);
                return Err(RegistryError::RefundFailed(err));
            }
        }

        tracing::info!(%label, %token, expires_at, cost = fee, "name renewed");
        Ok(expires_at)
    }

    /// Hand an active name to `to`.
    pub fn transfer(&mut self, ctx: &CallContext, label: &Label, to: Address) -> Result<()> {
        reject_value(ctx)?;
        let token = self.require_active_holder(ctx, label)?.token_id;
        if to == ctx.caller {
            return Err(RegistryError::InvalidRecipient);
        }

        self.ownership.transfer(label, &ctx.caller, to);
        self.reverse.clear_if(&ctx.caller, label);
        if let Some(record) = self.records.get_mut(label) {
            record.holder = to;
        }
        self.events.push(RegistryEvent::Transferred {
            label: label.clone(),
            token_id: token,
            from: ctx.caller,
            to,
        });

        tracing::info!(%label, %token, from = %ctx.caller, %to, "name transferred");
        Ok(())
    }

    /// Clear a burnable name. Anyone may call this.
    pub fn burn(&mut self, ctx: &CallContext, label: &Label) -> Result<TokenId> {
        let record = self
            .records
            .get(label)
            .ok_or_else(|| RegistryError::NameNotFound(label.clone()))?;
        if !record.state(self.config.grace_period, ctx.now).is_burnable() {
            return Err(RegistryError::NotBurnable {
                label: label.clone(),
                burnable_at: record.burnable_at(self.config.grace_period),
            });
        }
        reject_value(ctx)?;

        let record = record.clone();
        self.clear_record(&record, ctx.now);
        tracing::info!(%label, token = %record.token_id, by = %ctx.caller, "name burned");
        Ok(record.token_id)
    }

    /// Point the caller's primary name at `label`.
    pub fn set_primary(&mut self, ctx: &CallContext, label: &Label) -> Result<()> {
        reject_value(ctx)?;
        self.require_active_holder(ctx, label)?;

        self.reverse.set(ctx.caller, label.clone());
        self.events.push(RegistryEvent::PrimarySet {
            holder: ctx.caller,
            label: label.clone(),
        });
        tracing::debug!(%label, holder = %ctx.caller, "primary name set");
        Ok(())
    }

    /// Set or clear the resolver of an active name the caller holds.
    pub fn set_resolver(
        &mut self,
        ctx: &CallContext,
        label: &Label,
        resolver: Option<Address>,
    ) -> Result<()> {
        reject_value(ctx)?;
        let token = self.require_active_holder(ctx, label)?.token_id;

        if let Some(record) = self.records.get_mut(label) {
            record.resolver = resolver;
        }
        self.events.push(RegistryEvent::ResolverChanged {
            label: label.clone(),
            token_id: token,
            resolver,
        });
        tracing::debug!(%label, ?resolver, "resolver changed");
        Ok(())
    }

    /// Pay the whole treasury balance to `recipient`. Administrator only.
    pub fn withdraw(&mut self, ctx: &CallContext, recipient: Address) -> Result<Amount> {
        if ctx.caller != self.administrator {
            return Err(RegistryError::NotAdministrator);
        }
        reject_value(ctx)?;
        if self.treasury == 0 {
            return Err(RegistryError::NothingToWithdraw);
        }

        let amount = std::mem::take(&mut self.treasury);
        if let Err(err) = self.payout.pay(&recipient, amount) {
            tracing::warn!(%recipient, amount, error = %err, "withdrawal failed, balance restored");
            self.treasury = amount;
            return Err(RegistryError::WithdrawalFailed(err));
        }

        self.events
            .push(RegistryEvent::FeesWithdrawn { recipient, amount });
        tracing::info!(%recipient, amount, "fees withdrawn");
        Ok(amount)
    }

    /// A bare payment outside register and renew. Always rejected.
    pub fn receive(&mut self, ctx: &CallContext) -> Result<()> {
        Err(RegistryError::DirectPaymentRejected(ctx.value))
    }

    /// Drop commitments that can no longer be redeemed.
    pub fn prune_commitments(&mut self, now: Timestamp) -> usize {
        let removed = self
            .commitments
            .prune(now, self.config.max_commitment_age);
        if removed > 0 {
            tracing::debug!(removed, "stale commitments pruned");
        }
        removed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Current holder of `label`, or `None` if absent or burnable.
    pub fn owner_of(&self, label: &Label, now: Timestamp) -> Option<Address> {
        self.records
            .get(label)
            .filter(|r| !r.state(self.config.grace_period, now).is_burnable())
            .map(|r| r.holder)
    }

    /// Whether `label` is past its expiry. Absent names count as expired.
    pub fn is_expired(&self, label: &Label, now: Timestamp) -> bool {
        self.name_state(label, now)
            .map_or(true, NameState::is_expired)
    }

    /// Whether `label` can be registered at `now`.
    pub fn is_available(&self, label: &Label, now: Timestamp) -> bool {
        self.name_state(label, now)
            .map_or(true, NameState::is_burnable)
    }

    pub fn name_state(&self, label: &Label, now: Timestamp) -> Option<NameState> {
        self.records
            .get(label)
            .map(|r| r.state(self.config.grace_period, now))
    }

    pub fn record(&self, label: &Label) -> Option<&NameRecord> {
        self.records.get(label)
    }

    pub fn label_of(&self, token: TokenId) -> Option<&Label> {
        self.ownership.label_of(token)
    }

    pub fn token_of(&self, label: &Label) -> Option<TokenId> {
        self.ownership.token_of(label)
    }

    /// Labels recorded against `holder`, including expired ones not yet
    /// burned. Order is unspecified.
    pub fn names_of(&self, holder: &Address) -> &[Label] {
        self.ownership.names_of(holder)
    }

    /// `holder`'s primary name, if they still actively hold it.
    pub fn primary_name(&self, holder: &Address, now: Timestamp) -> Option<&Label> {
        let label = self.reverse.get(holder)?;
        let record = self.records.get(label)?;
        let valid = record.holder == *holder
            && record.state(self.config.grace_period, now).is_active();
        valid.then_some(label)
    }

    /// Fee for registering or renewing `raw_label` for `duration` periods.
    pub fn quote(&self, raw_label: &str, duration: u32) -> Result<Amount> {
        let label = validate_label(raw_label, &self.config.labels)?;
        Ok(self
            .config
            .prices
            .fee(label.char_len(), duration, self.config.max_duration)?)
    }

    pub fn commitment_submitted_at(&self, hash: &CommitmentHash) -> Option<Timestamp> {
        self.commitments.submitted_at(hash)
    }

    pub fn commitment_count(&self) -> usize {
        self.commitments.len()
    }

    pub fn treasury_balance(&self) -> Amount {
        self.treasury
    }

    /// Number of live records, burnable ones included.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Whether the ownership index agrees with the records.
    pub fn is_consistent(&self) -> bool {
        self.ownership.is_consistent()
            && self.records.iter().all(|(label, record)| {
                self.ownership.token_of(label) == Some(record.token_id)
                    && self.ownership.names_of(&record.holder).contains(label)
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn require_active_holder(&self, ctx: &CallContext, label: &Label) -> Result<&NameRecord> {
        let record = self
            .records
            .get(label)
            .ok_or_else(|| RegistryError::NameNotFound(label.clone()))?;
        let state = record.state(self.config.grace_period, ctx.now);
        if state.is_burnable() || record.holder != ctx.caller {
            return Err(RegistryError::NotHolder(label.clone()));
        }
        if !state.is_active() {
            return Err(RegistryError::NameExpired(label.clone()));
        }
        Ok(record)
    }

    fn expiry_after(&self, from: Timestamp, duration: u32) -> Result<Timestamp> {
        self.config
            .period_length
            .checked_mul(u64::from(duration))
            .and_then(|span| from.checked_add(span))
            .ok_or(RegistryError::ExpiryOverflow)
    }

    /// Remove a record and every index entry pointing at it.
    fn clear_record(&mut self, record: &NameRecord, now: Timestamp) {
        self.records.remove(&record.label);
        self.ownership.remove(&record.label, &record.holder);
        self.reverse.clear_if(&record.holder, &record.label);
        self.events.push(RegistryEvent::Burned {
            label: record.label.clone(),
            token_id: record.token_id,
            at: now,
        });
    }

    fn checkpoint(
        &self,
        label: &Label,
        holders: &[Address],
        tokens: &[TokenId],
        commitment: Option<CommitmentHash>,
        registrant: Option<Address>,
    ) -> Checkpoint {
        Checkpoint {
            label: label.clone(),
            record: self.records.get(label).cloned(),
            ownership: self.ownership.checkpoint(&[label], tokens, holders),
            primaries: holders
                .iter()
                .map(|h| (*h, self.reverse.get(h).cloned()))
                .collect(),
            commitment: commitment.map(|h| (h, self.commitments.submitted_at(&h))),
            rate_limit: registrant.map(|a| (a, self.last_registration.get(&a).copied())),
            next_token: self.next_token,
            treasury: self.treasury,
            events: self.events.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        match checkpoint.record {
            Some(record) => self.records.insert(checkpoint.label, record),
            None => self.records.remove(&checkpoint.label),
        };
        self.ownership.restore(checkpoint.ownership);
        for (holder, label) in checkpoint.primaries {
            self.reverse.restore(holder, label);
        }
        if let Some((hash, submitted_at)) = checkpoint.commitment {
            self.commitments.restore(hash, submitted_at);
        }
        if let Some((caller, last)) = checkpoint.rate_limit {
            match last {
                Some(seq) => self.last_registration.insert(caller, seq),
                None => self.last_registration.remove(&caller),
            };
        }
        self.next_token = checkpoint.next_token;
        self.treasury = checkpoint.treasury;
        self.events.truncate(checkpoint.events);
    }
}

impl<A: Allowance, P: Payout> RegistryView for Registry<A, P> {
    fn owner_of(&self, label: &Label, now: Timestamp) -> Option<Address> {
        Registry::owner_of(self, label, now)
    }

    fn is_expired(&self, label: &Label, now: Timestamp) -> bool {
        Registry::is_expired(self, label, now)
    }
}

fn reject_value(ctx: &CallContext) -> Result<()> {
    if ctx.value > 0 {
        return Err(RegistryError::DirectPaymentRejected(ctx.value));
    }
    Ok(())
}
