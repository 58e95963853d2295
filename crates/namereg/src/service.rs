//! The service facade: one writer in front of the registry.
//!
//! Operations are serialized behind a mutex, stamped with the clock and the
//! next operation sequence number, and the events each successful operation
//! emits are appended to the journal under that sequence number.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use namereg_allowance::Allowance;
use namereg_core::{
    Address, Amount, CommitmentHash, Label, RegistryConfig, Secret, Timestamp, TokenId,
};
use namereg_store::{AppendResult, EventStore, EventStoreExt, SqliteEventStore};

use crate::clock::Clock;
use crate::error::{RegistryError, Result};
use crate::registry::{CallContext, Registry};
use crate::treasury::Payout;

/// Deployment configuration for a [`RegistryService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Hex-encoded administrator address.
    pub administrator: String,

    #[serde(default)]
    pub registry: RegistryConfig,

    /// SQLite journal location. In-memory when absent.
    #[serde(default)]
    pub journal_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading service config {}", path.display()))?;
        let config: ServiceConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing service config {}", path.display()))?;
        config.administrator()?;
        config
            .registry
            .validate()
            .context("invalid registry configuration")?;
        Ok(config)
    }

    pub fn administrator(&self) -> anyhow::Result<Address> {
        Address::from_hex(&self.administrator).context("invalid administrator address")
    }

    /// Open the configured journal.
    pub fn open_journal(&self) -> anyhow::Result<SqliteEventStore> {
        let store = match &self.journal_path {
            Some(path) => SqliteEventStore::open(path)
                .with_context(|| format!("opening journal {}", path.display()))?,
            None => SqliteEventStore::open_memory().context("opening in-memory journal")?,
        };
        Ok(store)
    }
}

struct Inner<A: Allowance, P: Payout> {
    registry: Registry<A, P>,
    sequence: u64,
}

/// Serializing, journaling front of a [`Registry`].
pub struct RegistryService<S, A, P>
where
    S: EventStore,
    A: Allowance,
    P: Payout,
{
    inner: Mutex<Inner<A, P>>,
    store: S,
    clock: Arc<dyn Clock>,
}

impl<A, P> RegistryService<SqliteEventStore, A, P>
where
    A: Allowance + Send,
    P: Payout + Send,
{
    /// Build a service from a loaded configuration.
    pub async fn from_config(
        config: &ServiceConfig,
        allowance: A,
        payout: P,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let registry = Registry::new(
            config.registry.clone(),
            config.administrator()?,
            allowance,
            payout,
        )?;
        let store = config.open_journal()?;
        Ok(Self::open(registry, store, clock).await?)
    }
}

impl<S, A, P> RegistryService<S, A, P>
where
    S: EventStore,
    A: Allowance + Send,
    P: Payout + Send,
{
    /// Wrap `registry`, continuing the journal's sequence numbering.
    pub async fn open(registry: Registry<A, P>, store: S, clock: Arc<dyn Clock>) -> Result<Self> {
        let sequence = store.latest_seq().await?;
        tracing::debug!(sequence, "registry service opened");
        Ok(Self {
            inner: Mutex::new(Inner { registry, sequence }),
            store,
            clock,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Run one state-changing operation and journal its events.
    async fn execute<T, F>(&self, caller: Address, value: Amount, op: F) -> Result<T>
    where
        F: FnOnce(&mut Registry<A, P>, &CallContext) -> Result<T> + Send,
    {
        let mut inner = self.inner.lock().await;
        inner.sequence = inner.sequence.saturating_add(1);
        let ctx = CallContext {
            caller,
            now: self.clock.now(),
            value,
            sequence: inner.sequence,
        };

        let result = op(&mut inner.registry, &ctx);
        let events = inner.registry.take_events();
        let output = result?;

        match self.store.append_all(ctx.sequence, ctx.now, &events).await {
            Ok(AppendResult::Appended) => Ok(output),
            Ok(_) => {
                tracing::warn!(seq = ctx.sequence, "journal already holds this sequence");
                Err(RegistryError::JournalConflict { seq: ctx.sequence })
            }
            Err(err) => {
                tracing::warn!(seq = ctx.sequence, error = %err, "journal append failed");
                Err(err.into())
            }
        }
    }

    /// Read registry state at the current time.
    pub async fn read<T>(&self, f: impl FnOnce(&Registry<A, P>, Timestamp) -> T) -> T {
        let inner = self.inner.lock().await;
        f(&inner.registry, self.clock.now())
    }

    /// Mutable access to the allowance service, for issuing and revoking grants.
    pub async fn with_allowance<T>(&self, f: impl FnOnce(&mut A, Timestamp) -> T) -> T {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();
        f(inner.registry.allowance_mut(), now)
    }

    pub async fn commit(&self, caller: Address, hash: CommitmentHash) -> Result<()> {
        self.execute(caller, 0, |r, ctx| r.commit(ctx, hash)).await
    }

    pub async fn register(
        &self,
        caller: Address,
        label: &str,
        duration: u32,
        secret: &Secret,
        value: Amount,
        resolver: Option<Address>,
    ) -> Result<TokenId> {
        self.execute(caller, value, |r, ctx| {
            r.register(ctx, label, duration, secret, resolver)
        })
        .await
    }

    pub async fn renew(
        &self,
        caller: Address,
        label: &Label,
        duration: u32,
        value: Amount,
    ) -> Result<Timestamp> {
        self.execute(caller, value, |r, ctx| r.renew(ctx, label, duration))
            .await
    }

    pub async fn transfer(&self, caller: Address, label: &Label, to: Address) -> Result<()> {
        self.execute(caller, 0, |r, ctx| r.transfer(ctx, label, to)).await
    }

    pub async fn burn(&self, caller: Address, label: &Label) -> Result<TokenId> {
        self.execute(caller, 0, |r, ctx| r.burn(ctx, label)).await
    }

    pub async fn set_primary(&self, caller: Address, label: &Label) -> Result<()> {
        self.execute(caller, 0, |r, ctx| r.set_primary(ctx, label))
            .await
    }

    pub async fn set_resolver(
        &self,
        caller: Address,
        label: &Label,
        resolver: Option<Address>,
    ) -> Result<()> {
        self.execute(caller, 0, |r, ctx| r.set_resolver(ctx, label, resolver))
            .await
    }

    pub async fn withdraw(&self, caller: Address, recipient: Address) -> Result<Amount> {
        self.execute(caller, 0, |r, ctx| r.withdraw(ctx, recipient))
            .await
    }

    pub async fn receive(&self, caller: Address, value: Amount) -> Result<()> {
        self.execute(caller, value, |r, ctx| r.receive(ctx)).await
    }

    pub async fn prune_commitments(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let now = self.clock.now();
        inner.registry.prune_commitments(now)
    }

    pub async fn owner_of(&self, label: &Label) -> Option<Address> {
        self.read(|r, now| r.owner_of(label, now)).await
    }

    pub async fn is_available(&self, label: &Label) -> bool {
        self.read(|r, now| r.is_available(label, now)).await
    }
}
