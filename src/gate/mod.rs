//! The per-resource gate.
//!
//! For each trigger the gate:
//!
//! 1. derives the resource's lock key;
//! 2. reads the work item's persisted state;
//! 3. if nothing is pending or running, releases the lock for this work item
//!    (self-heal after a crashed or aborted holder);
//! 4. tries once to acquire the lock;
//! 5. on contention returns [`Outcome::Later`] without invoking the delegate;
//! 6. otherwise invokes the delegate;
//! 7. on [`Decision::Empty`] releases the lock again;
//! 8. on [`Decision::Proceed`] keeps the lock held until a later pass sees
//!    the work item idle.
//!
//! Errors from the state source, the lock service or the delegate are
//! propagated unchanged. A failing delegate leaves the lock held.
//!
//! # Known race
//!
//! Between the self-heal release (3) and the acquire (4) another process may
//! take the lock. The lock service still guarantees that only one of them
//! runs the delegate; the race only decides which caller wins.
//!
//! # Concurrency
//!
//! The gate holds no lock handles and no per-key state, so any number of
//! gates may run concurrently, in one process or many. Triggers for the same
//! resource from a single caller are expected to arrive serially.
//!
//! [`Decision::Empty`]: crate::outcome::Decision::Empty
//! [`Decision::Proceed`]: crate::outcome::Decision::Proceed

#[cfg(test)]
mod tests;

use crate::delegate::Delegate;
use crate::error::Result;
use crate::key::{DEFAULT_KEY_PREFIX, LockKey, derive_key};
use crate::lock::LockService;
use crate::outcome::{Decision, Outcome};
use crate::state::StateSource;
use crate::trigger::Trigger;
use tracing::{debug, info};

/// Lock calls made while processing one trigger.
///
/// Filled in step by step, so it stays meaningful when processing fails
/// part way through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub key: Option<LockKey>,
    /// Work item name the lock was labelled with, once the state was read.
    pub holder: Option<String>,
    /// A self-heal release was issued before acquiring.
    pub self_healed: bool,
    /// The lock was acquired for this trigger.
    pub acquired: bool,
    /// The lock was busy.
    pub deferred: bool,
    /// The lock was released because the delegate returned `Empty`.
    pub released: bool,
}

/// Mutual-exclusion gate in front of a delegate.
#[derive(Debug)]
pub struct Gate<L, S, D> {
    locks: L,
    states: S,
    delegate: D,
    prefix: String,
}

impl<L, S, D> Gate<L, S, D>
where
    L: LockService,
    S: StateSource,
{
    /// Create a gate using the default key prefix.
    pub fn new(locks: L, states: S, delegate: D) -> Self {
        Self::with_prefix(locks, states, delegate, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(locks: L, states: S, delegate: D, prefix: impl Into<String>) -> Self {
        Self {
            locks,
            states,
            delegate,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Lock key this gate uses for a trigger's resource.
    pub fn key_for<T: Trigger>(&self, trigger: &T) -> LockKey {
        derive_key(&self.prefix, trigger.resource())
    }

    /// Process one trigger.
    pub fn process<T>(&self, trigger: &T) -> Result<Outcome<<D as Delegate<T>>::Payload>>
    where
        T: Trigger,
        D: Delegate<T>,
    {
        self.process_traced(trigger, &mut Trace::default())
    }

    /// Process one trigger, recording each lock call into `trace`.
    pub fn process_traced<T>(
        &self,
        trigger: &T,
        trace: &mut Trace,
    ) -> Result<Outcome<<D as Delegate<T>>::Payload>>
    where
        T: Trigger,
        D: Delegate<T>,
    {
        let resource = trigger.resource();
        let key = self.key_for(trigger);
        trace.key = Some(key.clone());
        let snapshot = self.states.read(trigger.work_item())?;
        let holder = snapshot.name;
        trace.holder = Some(holder.clone());

        if !snapshot.has_active_or_pending_work {
            self.locks.release(&key, &holder)?;
            trace.self_healed = true;
            info!(%resource, %key, %holder, "unlocked, no pending request or daemon");
        }

        if !self.locks.acquire(&key, &holder)? {
            trace.deferred = true;
            debug!(%resource, %key, %holder, "lock is busy, deferring");
            return Ok(Outcome::Later);
        }
        trace.acquired = true;
        info!(%resource, %key, %holder, "locked");

        let decision = self.delegate.invoke(trigger)?;
        if matches!(decision, Decision::Empty) {
            self.locks.release(&key, &holder)?;
            trace.released = true;
            info!(%resource, %key, %holder, "unlocked, nothing to do");
        }

        Ok(decision.into())
    }
}
