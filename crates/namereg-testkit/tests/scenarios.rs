//! End-to-end registry scenarios.

use namereg::{NameState, RegistryError, RegistryEvent};
use namereg_allowance::Allowance;
use namereg_core::{CommitmentHash, RegistryConfig, TokenId};
use namereg_store::EventStore;
use namereg_testkit::fixtures::{account, secret_for, service_fixture, TestFixture};
use namereg_testkit::generators::long_label;
use proptest::prelude::*;

fn label(s: &str) -> namereg::Label {
    TestFixture::label(s)
}

// =============================================================================
// Ownership after registration
// =============================================================================

#[test]
fn test_owner_holds_until_grace_elapses() {
    let mut fx = TestFixture::new();
    let alice = account(1);
    fx.claim_paid(alice, "alice", 1).unwrap();

    let l = label("alice");
    let expires_at = fx.registry.record(&l).unwrap().expires_at;
    let burnable_at = expires_at + fx.config().grace_period;

    for now in [fx.now(), expires_at - 1, expires_at, burnable_at - 1] {
        assert_eq!(fx.registry.owner_of(&l, now), Some(alice), "at {now}");
        assert!(!fx.registry.is_available(&l, now), "at {now}");
    }
    assert_eq!(fx.registry.owner_of(&l, burnable_at), None);
    assert!(fx.registry.is_available(&l, burnable_at));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_register_then_owner(name in long_label(), duration in 1u32..=10) {
        let mut fx = TestFixture::new();
        let alice = account(1);
        let token = fx.claim_paid(alice, &name, duration).unwrap();
        let l = label(&name);

        prop_assert_eq!(fx.registry.owner_of(&l, fx.now()), Some(alice));
        prop_assert_eq!(fx.registry.token_of(&l), Some(token));
        prop_assert!(!fx.registry.is_available(&l, fx.now()));
        prop_assert!(fx.registry.is_consistent());
    }
}

// =============================================================================
// Commit-reveal
// =============================================================================

#[test]
fn test_commitment_redeems_exactly_once() {
    let mut fx = TestFixture::new();
    let alice = account(1);
    let hash = fx.commit(alice, "alice").unwrap();
    fx.advance(fx.config().min_commitment_age);

    fx.reveal(alice, "alice", 1, 5_000).unwrap();
    assert_eq!(fx.registry.commitment_submitted_at(&hash), None);

    let err = fx.reveal(alice, "alice", 1, 5_000).unwrap_err();
    assert!(matches!(err, RegistryError::NoCommitment(h) if h == hash));
}

#[test]
fn test_commitment_window_boundaries() {
    let min = RegistryConfig::default().min_commitment_age;
    let max = RegistryConfig::default().max_commitment_age;
    let alice = account(1);

    // One second early.
    let mut fx = TestFixture::new();
    let submitted = fx.now();
    fx.commit(alice, "alice").unwrap();
    fx.advance(min - 1);
    assert!(matches!(
        fx.reveal(alice, "alice", 1, 5_000),
        Err(RegistryError::TooFresh { usable_at, .. }) if usable_at == submitted + min
    ));

    // Exactly at the minimum age.
    fx.advance(1);
    fx.reveal(alice, "alice", 1, 5_000).unwrap();

    // Exactly at the maximum age.
    let mut fx = TestFixture::new();
    fx.commit(alice, "alice").unwrap();
    fx.advance(max);
    fx.reveal(alice, "alice", 1, 5_000).unwrap();

    // One second late.
    let mut fx = TestFixture::new();
    let submitted = fx.now();
    fx.commit(alice, "alice").unwrap();
    fx.advance(max + 1);
    assert!(matches!(
        fx.reveal(alice, "alice", 1, 5_000),
        Err(RegistryError::CommitmentExpired { expired_at, .. }) if expired_at == submitted + max
    ));
}

#[test]
fn test_front_runner_cannot_use_observed_commitment() {
    let mut fx = TestFixture::new();
    let (alice, mallory) = (account(1), account(2));
    fx.commit(alice, "alice").unwrap();
    fx.advance(fx.config().min_commitment_age);

    // Mallory knows the label and even the secret, but the hash binds Alice.
    let ctx = fx.ctx(mallory).with_value(5_000);
    let err = fx
        .registry
        .register(&ctx, "alice", 1, &secret_for(&alice, "alice"), None)
        .unwrap_err();
    assert!(matches!(err, RegistryError::NoCommitment(_)));

    fx.reveal(alice, "alice", 1, 5_000).unwrap();
}

// =============================================================================
// Failed operations leave no trace
// =============================================================================

#[derive(Debug, PartialEq)]
struct Snapshot {
    records: usize,
    commitments: usize,
    treasury: u128,
    alice_names: Vec<namereg::Label>,
    alice_balance: u128,
    alice_units: u32,
    alice_primary: Option<namereg::Label>,
}

fn snapshot(fx: &TestFixture) -> Snapshot {
    let alice = account(1);
    Snapshot {
        records: fx.registry.record_count(),
        commitments: fx.registry.commitment_count(),
        treasury: fx.registry.treasury_balance(),
        alice_names: fx.registry.names_of(&alice).to_vec(),
        alice_balance: fx.registry.payout().balance_of(&alice),
        alice_units: fx.registry.allowance().can_waive(&alice, fx.now()).1,
        alice_primary: fx.registry.primary_name(&alice, fx.now()).cloned(),
    }
}

#[test]
fn test_rejected_operations_change_nothing() {
    let mut fx = TestFixture::new();
    let (alice, bob) = (account(1), account(2));
    fx.grant(alice, 1);
    fx.claim_paid(alice, "abc", 1).unwrap();
    fx.commit(alice, "alice").unwrap();
    fx.advance(fx.config().min_commitment_age);

    let before = snapshot(&fx);

    assert!(matches!(
        fx.reveal(alice, "Alice", 1, 0),
        Err(RegistryError::InvalidLabel(_))
    ));
    assert!(matches!(
        fx.reveal(alice, "alice", 0, 0),
        Err(RegistryError::InvalidDuration { .. })
    ));
    assert!(matches!(
        fx.reveal(alice, "alice", 11, 0),
        Err(RegistryError::InvalidDuration { .. })
    ));
    assert!(matches!(
        fx.claim(bob, "abc", 1, 640_000),
        Err(RegistryError::DomainTaken(_))
    ));
    let ctx = fx.ctx(bob);
    assert!(matches!(
        fx.registry.transfer(&ctx, &label("abc"), bob),
        Err(RegistryError::NotHolder(_))
    ));
    let ctx = fx.ctx(alice);
    assert!(matches!(
        fx.registry.burn(&ctx, &label("abc")),
        Err(RegistryError::NotBurnable { .. })
    ));

    // Bob's commitment for "abc" is the only addition; discount it.
    let mut after = snapshot(&fx);
    after.commitments -= 1;
    assert_eq!(before, after);
    assert!(fx.registry.is_consistent());
}

// =============================================================================
// Transfers and primary names
// =============================================================================

#[test]
fn test_transfer_moves_name_and_clears_primary() {
    let mut fx = TestFixture::new();
    let (alice, bob) = (account(1), account(2));
    fx.claim_paid(alice, "alice", 1).unwrap();
    fx.claim_paid(alice, "other", 1).unwrap();

    let l = label("alice");
    let ctx = fx.ctx(alice);
    fx.registry.set_primary(&ctx, &l).unwrap();
    assert_eq!(fx.registry.primary_name(&alice, fx.now()), Some(&l));

    let ctx = fx.ctx(alice);
    fx.registry.transfer(&ctx, &l, bob).unwrap();

    assert!(!fx.registry.names_of(&alice).contains(&l));
    assert!(fx.registry.names_of(&alice).contains(&label("other")));
    assert!(fx.registry.names_of(&bob).contains(&l));
    assert_eq!(fx.registry.primary_name(&alice, fx.now()), None);
    assert_eq!(fx.registry.primary_name(&bob, fx.now()), None);
    assert_eq!(fx.registry.owner_of(&l, fx.now()), Some(bob));
    assert!(fx.registry.is_consistent());
}

#[test]
fn test_transfer_keeps_other_primary() {
    let mut fx = TestFixture::new();
    let (alice, bob) = (account(1), account(2));
    fx.claim_paid(alice, "alice", 1).unwrap();
    fx.claim_paid(alice, "other", 1).unwrap();

    let ctx = fx.ctx(alice);
    fx.registry.set_primary(&ctx, &label("other")).unwrap();
    let ctx = fx.ctx(alice);
    fx.registry.transfer(&ctx, &label("alice"), bob).unwrap();

    assert_eq!(
        fx.registry.primary_name(&alice, fx.now()),
        Some(&label("other"))
    );
}

// =============================================================================
// Burn and re-registration
// =============================================================================

#[test]
fn test_burn_only_after_grace() {
    let mut fx = TestFixture::new();
    let (alice, bob, carol) = (account(1), account(2), account(3));
    let old = fx.claim_paid(alice, "alice", 1).unwrap();

    let l = label("alice");
    let expires_at = fx.registry.record(&l).unwrap().expires_at;
    let burnable_at = expires_at + fx.config().grace_period;

    fx.clock.set(burnable_at - 1);
    let ctx = fx.ctx(carol);
    assert!(matches!(
        fx.registry.burn(&ctx, &l),
        Err(RegistryError::NotBurnable { burnable_at: Some(at), .. }) if at == burnable_at
    ));

    fx.advance(1);
    let ctx = fx.ctx(carol);
    assert_eq!(fx.registry.burn(&ctx, &l).unwrap(), old);
    assert!(fx.registry.is_available(&l, fx.now()));
    assert!(fx.registry.names_of(&alice).is_empty());
    assert_eq!(fx.registry.label_of(old), None);

    let new = fx.claim_paid(bob, "alice", 1).unwrap();
    assert_ne!(new, old);
    let record = fx.registry.record(&l).unwrap();
    assert_eq!(record.holder, bob);
    assert_eq!(record.token_id, new);
    assert!(record.registered_at >= burnable_at);
    assert!(fx.registry.is_consistent());
}

#[test]
fn test_reregistration_over_lapsed_name_burns_old_token() {
    let mut fx = TestFixture::new();
    let (alice, bob) = (account(1), account(2));
    let old = fx.claim_paid(alice, "alice", 1).unwrap();

    let l = label("alice");
    let record = fx.registry.record(&l).unwrap().clone();
    fx.clock.set(record.expires_at + fx.config().grace_period);
    fx.registry.take_events();

    let new = fx.claim_paid(bob, "alice", 1).unwrap();
    let events = fx.registry.take_events();
    let kinds: Vec<_> = events
        .iter()
        .filter(|e| !matches!(e, RegistryEvent::CommitmentSubmitted { .. }))
        .collect();
    assert!(matches!(
        kinds.as_slice(),
        [RegistryEvent::Burned { token_id: b, .. }, RegistryEvent::Registered { token_id: r, .. }]
            if *b == old && *r == new
    ));
    assert!(fx.registry.names_of(&alice).is_empty());
    assert_eq!(fx.registry.names_of(&bob), &[l.clone()]);
}

#[test]
fn test_grace_renewal_only_by_holder() {
    let mut fx = TestFixture::new();
    let (alice, bob) = (account(1), account(2));
    fx.claim_paid(alice, "alice", 1).unwrap();

    let l = label("alice");
    let expires_at = fx.registry.record(&l).unwrap().expires_at;
    fx.clock.set(expires_at);
    assert_eq!(fx.registry.name_state(&l, fx.now()), Some(NameState::Grace));

    let ctx = fx.ctx(bob).with_value(5_000);
    assert!(matches!(
        fx.registry.renew(&ctx, &l, 1),
        Err(RegistryError::GraceRestricted(_))
    ));

    let ctx = fx.ctx(alice).with_value(5_000);
    let renewed = fx.registry.renew(&ctx, &l, 1).unwrap();
    assert_eq!(renewed, expires_at + fx.config().period_length);
    assert_eq!(fx.registry.name_state(&l, fx.now()), Some(NameState::Active));
}

// =============================================================================
// Pricing and allowance
// =============================================================================

#[test]
fn test_fee_tiers_and_refund() {
    let mut fx = TestFixture::new();
    let alice = account(1);
    let prices = fx.config().prices;

    assert_eq!(fx.registry.quote("abc", 1).unwrap(), prices.tier3);
    assert_eq!(fx.registry.quote("abcdef", 2).unwrap(), prices.tier5plus * 2);

    fx.claim(alice, "abcdef", 2, prices.tier5plus * 2 + 777).unwrap();
    assert_eq!(fx.registry.payout().balance_of(&alice), 777);
    assert_eq!(fx.registry.treasury_balance(), prices.tier5plus * 2);
}

#[test]
fn test_allowance_waives_standard_names_only() {
    let mut fx = TestFixture::new();
    let alice = account(1);
    fx.grant(alice, 2);

    fx.claim(alice, "alice", 1, 0).unwrap();
    assert_eq!(fx.registry.allowance().can_waive(&alice, fx.now()), (true, 1));
    assert_eq!(fx.registry.treasury_balance(), 0);

    let err = fx.claim(alice, "abc", 1, 0).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InsufficientPayment { required: 640_000, offered: 0 }
    ));
    assert_eq!(fx.registry.allowance().can_waive(&alice, fx.now()), (true, 1));
}

#[test]
fn test_failed_refund_returns_allowance_unit() {
    let mut fx = TestFixture::new();
    let alice = account(1);
    fx.grant(alice, 1);
    fx.registry.payout_mut().block(alice);

    // Waived, so the whole payment is excess and the refund fails.
    let err = fx.claim(alice, "alice", 1, 10).unwrap_err();
    assert!(matches!(err, RegistryError::RefundFailed(_)));
    assert_eq!(fx.registry.allowance().can_waive(&alice, fx.now()), (true, 1));
    assert_eq!(fx.registry.record_count(), 0);
    assert!(fx.registry.is_available(&label("alice"), fx.now()));
}

// =============================================================================
// Treasury
// =============================================================================

#[test]
fn test_withdraw_pays_admin_recipient() {
    let mut fx = TestFixture::new();
    let (alice, vault) = (account(1), account(9));
    fx.claim_paid(alice, "abc", 1).unwrap();

    let ctx = fx.ctx(alice);
    assert!(matches!(
        fx.registry.withdraw(&ctx, alice),
        Err(RegistryError::NotAdministrator)
    ));

    let admin = fx.admin;
    let ctx = fx.ctx(admin);
    assert_eq!(fx.registry.withdraw(&ctx, vault).unwrap(), 640_000);
    assert_eq!(fx.registry.payout().balance_of(&vault), 640_000);
    assert_eq!(fx.registry.treasury_balance(), 0);

    let ctx = fx.ctx(admin);
    assert!(matches!(
        fx.registry.withdraw(&ctx, vault),
        Err(RegistryError::NothingToWithdraw)
    ));
}

// =============================================================================
// Service and journal
// =============================================================================

#[tokio::test]
async fn test_service_journals_successful_operations() {
    let (svc, clock) = service_fixture(RegistryConfig::default()).await;
    let alice = account(1);
    let l = label("alice");
    let secret = secret_for(&alice, "alice");
    let hash = CommitmentHash::derive(&l, &alice, &secret);

    svc.commit(alice, hash).await.unwrap();
    let early = svc.register(alice, "alice", 1, &secret, 5_000, None).await;
    assert!(matches!(early, Err(RegistryError::TooFresh { .. })));

    clock.advance(60);
    let token = svc
        .register(alice, "alice", 1, &secret, 5_000, None)
        .await
        .unwrap();
    assert_eq!(token, TokenId::FIRST);
    assert_eq!(svc.owner_of(&l).await, Some(alice));

    let journal = svc.store().events_since(0, 100).await.unwrap();
    let seqs: Vec<u64> = journal.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 3]);
    assert!(matches!(journal[0].event, RegistryEvent::CommitmentSubmitted { .. }));
    assert!(matches!(journal[1].event, RegistryEvent::Registered { .. }));
}

#[tokio::test]
async fn test_service_burn_and_reclaim() {
    let (svc, clock) = service_fixture(RegistryConfig::default()).await;
    let (alice, bob) = (account(1), account(2));
    let l = label("alice");

    let secret = secret_for(&alice, "alice");
    svc.commit(alice, CommitmentHash::derive(&l, &alice, &secret))
        .await
        .unwrap();
    clock.advance(60);
    svc.register(alice, "alice", 1, &secret, 5_000, None)
        .await
        .unwrap();

    let config = RegistryConfig::default();
    clock.advance(config.period_length + config.grace_period);
    assert!(svc.is_available(&l).await);
    svc.burn(bob, &l).await.unwrap();

    let secret = secret_for(&bob, "alice");
    svc.commit(bob, CommitmentHash::derive(&l, &bob, &secret))
        .await
        .unwrap();
    clock.advance(60);
    let token = svc
        .register(bob, "alice", 1, &secret, 5_000, None)
        .await
        .unwrap();
    assert_eq!(token, TokenId(2));

    let history = svc.store().events_for_label(&l).await.unwrap();
    assert!(matches!(
        history.iter().map(|e| &e.event).collect::<Vec<_>>().as_slice(),
        [
            RegistryEvent::Registered { .. },
            RegistryEvent::Burned { .. },
            RegistryEvent::Registered { .. },
        ]
    ));
}
