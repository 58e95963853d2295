//! The read-only boundary the resolver sees.
//!
//! A resolver keeps address and text records per name but never owns names.
//! Before accepting a record write it asks the registry who holds the name
//! and whether it has expired. Nothing else is exposed to it.

use namereg_core::{Address, Label, Timestamp};

/// Ownership queries the registry answers for a resolver.
pub trait RegistryView {
    /// Holder of `label`, or `None` once it is burnable or if it was never
    /// registered.
    fn owner_of(&self, label: &Label, now: Timestamp) -> Option<Address>;

    /// Whether `label` is past its expiry. Absent names are expired.
    fn is_expired(&self, label: &Label, now: Timestamp) -> bool;
}

/// Whether `caller` may write resolver records for `label` at `now`.
///
/// Requires an unexpired name held by the caller.
pub fn may_write_records<V: RegistryView + ?Sized>(
    view: &V,
    label: &Label,
    caller: &Address,
    now: Timestamp,
) -> bool {
    view.owner_of(label, now).as_ref() == Some(caller) && !view.is_expired(label, now)
}
