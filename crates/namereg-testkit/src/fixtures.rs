//! Test fixtures and helpers.
//!
//! Common setup code for registry tests: deterministic accounts, a manual
//! clock, and a registry wired to an allowance ledger and a payout ledger.

use std::sync::Arc;

use namereg::{CallContext, Clock, LedgerPayout, ManualClock, Registry, RegistryService};
use namereg_allowance::{AllowanceLedger, GrantId, GrantPayload};
use namereg_core::{
    Address, Amount, CommitmentHash, Keypair, Label, RegistryConfig, Secret, Timestamp, TokenId,
};
use namereg_store::MemoryEventStore;

/// Start time used by every fixture: 2026-01-01T00:00:00Z.
pub const GENESIS: Timestamp = 1_767_225_600;

/// Registry type used by fixtures.
pub type TestRegistry = Registry<AllowanceLedger, LedgerPayout>;

/// Service type used by fixtures.
pub type TestService = RegistryService<MemoryEventStore, AllowanceLedger, LedgerPayout>;

/// Deterministic account for `index`.
pub fn account(index: u8) -> Address {
    let mut seed = [0u8; 32];
    seed[0] = index;
    seed[31] = 0xa5;
    Keypair::from_seed(&seed).address()
}

/// Deterministic commitment secret for `(who, label)`.
pub fn secret_for(who: &Address, label: &str) -> Secret {
    let mut bytes = *who.as_bytes();
    for (i, b) in label.bytes().enumerate() {
        bytes[i % 32] ^= b;
    }
    Secret::from_bytes(bytes)
}

/// A registry with a manual clock and an automatic operation counter.
pub struct TestFixture {
    pub admin: Address,
    pub registry: TestRegistry,
    pub clock: ManualClock,
    sequence: u64,
}

impl TestFixture {
    /// A fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let admin = account(0);
        let registry = Registry::new(config, admin, AllowanceLedger::new(admin), LedgerPayout::new())
            .unwrap_or_else(|e| panic!("fixture config rejected: {e}"));
        Self {
            admin,
            registry,
            clock: ManualClock::new(GENESIS),
            sequence: 0,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        self.registry.config()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn advance(&self, secs: u64) -> Timestamp {
        self.clock.advance(secs)
    }

    /// A context for `caller` at the current time, with the next sequence number.
    pub fn ctx(&mut self, caller: Address) -> CallContext {
        self.sequence += 1;
        CallContext::new(caller, self.clock.now()).with_sequence(self.sequence)
    }

    /// Submit `who`'s commitment for `label`.
    pub fn commit(&mut self, who: Address, label: &str) -> namereg::Result<CommitmentHash> {
        let parsed = Label::parse(label).map_err(namereg::RegistryError::from)?;
        let hash = CommitmentHash::derive(&parsed, &who, &secret_for(&who, label));
        let ctx = self.ctx(who);
        self.registry.commit(&ctx, hash)?;
        Ok(hash)
    }

    /// Reveal `who`'s commitment for `label` now, attaching `value`.
    pub fn reveal(
        &mut self,
        who: Address,
        label: &str,
        duration: u32,
        value: Amount,
    ) -> namereg::Result<TokenId> {
        let ctx = self.ctx(who).with_value(value);
        self.registry
            .register(&ctx, label, duration, &secret_for(&who, label), None)
    }

    /// Commit, wait out the minimum commitment age, and register.
    pub fn claim(
        &mut self,
        who: Address,
        label: &str,
        duration: u32,
        value: Amount,
    ) -> namereg::Result<TokenId> {
        self.commit(who, label)?;
        self.advance(self.config().min_commitment_age);
        self.reveal(who, label, duration, value)
    }

    /// [`TestFixture::claim`] paying exactly the quoted fee.
    pub fn claim_paid(&mut self, who: Address, label: &str, duration: u32) -> namereg::Result<TokenId> {
        let fee = self.registry.quote(label, duration)?;
        self.claim(who, label, duration, fee)
    }

    /// Give `who` fee-waiver units.
    pub fn grant(&mut self, who: Address, units: u32) -> GrantId {
        let (admin, now) = (self.admin, self.now());
        self.registry
            .allowance_mut()
            .issue(&admin, GrantPayload::new(who, units), now)
            .unwrap_or_else(|e| panic!("grant rejected: {e}"))
    }

    pub fn label(name: &str) -> Label {
        Label::parse(name).unwrap_or_else(|e| panic!("bad test label {name:?}: {e}"))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A journaling service over an in-memory store, with its clock.
pub async fn service_fixture(config: RegistryConfig) -> (TestService, ManualClock) {
    let admin = account(0);
    let clock = ManualClock::new(GENESIS);
    let registry = Registry::new(config, admin, AllowanceLedger::new(admin), LedgerPayout::new())
        .unwrap_or_else(|e| panic!("fixture config rejected: {e}"));
    let service = RegistryService::open(registry, MemoryEventStore::new(), Arc::new(clock.clone()))
        .await
        .unwrap_or_else(|e| panic!("service open failed: {e}"));
    (service, clock)
}

/// Accounts `1..=count` for multi-party tests.
pub fn multi_party_accounts(count: u8) -> Vec<Address> {
    (1..=count).map(account).collect()
}
