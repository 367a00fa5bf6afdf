//! Reference-counted interest tracking for one topic family.
//!
//! A [`Registry`] maps topic keys to ordered handler lists and derives the
//! desired interest set (the value transmitted to the server) on demand
//! from the live mapping, so it is correct by construction after any
//! mutation. The registry itself never talks to the network; [`add`] and
//! [`remove`] report whether a key's presence changed so the owning family
//! can trigger its synchronize.
//!
//! [`add`]: Registry::add
//! [`remove`]: Registry::remove

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{ControlLinkError, Result};

/// Handler invoked with a reference to each matching event.
pub type EventHandler<E> = Arc<dyn Fn(&E) + Send + Sync>;

// ── Topic keys ──────────────────────────────────────────────────────────────

/// Identifies what a listener subscribes to within a topic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKey {
    /// A concrete entity id. Must be positive; zero is rejected.
    Id(u32),
    /// Wildcard: every entity in the family.
    All,
    /// Master-level log lines. Only the slave-log family has this position.
    Master,
}

impl TopicKey {
    /// Map the nullable-id convention of the public API onto a key:
    /// `None` means the wildcard.
    pub fn from_id(id: Option<u32>) -> Self {
        match id {
            Some(id) => TopicKey::Id(id),
            None => TopicKey::All,
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicKey::Id(id) => write!(f, "{}", id),
            TopicKey::All => write!(f, "all"),
            TopicKey::Master => write!(f, "master"),
        }
    }
}

/// Which keys a topic family accepts at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Concrete ids only (instance status, save-list status).
    IdOnly,
    /// Concrete ids or the wildcard (slave status, instance logs).
    IdOrAll,
    /// Ids, the wildcard, or the master position (slave logs).
    IdAllOrMaster,
}

// ── Desired interest set ────────────────────────────────────────────────────

/// The full set of keys currently needed by local listeners in a family.
///
/// Always recomputed from the live registry, never cached. `ids` are sorted
/// so outgoing subscription messages are deterministic. `master` is only
/// ever set by the slave-log family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestSet {
    pub all: bool,
    pub master: bool,
    pub ids: Vec<u32>,
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Handler registry for one topic family.
///
/// Invariant: a key is present in the mapping if and only if its handler
/// list is non-empty. Handlers are kept in registration order; removal
/// targets the most recently registered occurrence that is pointer-identical
/// to the given handler.
pub struct Registry<E> {
    family: &'static str,
    policy: KeyPolicy,
    handlers: HashMap<TopicKey, Vec<EventHandler<E>>>,
}

impl<E> Registry<E> {
    pub fn new(family: &'static str, policy: KeyPolicy) -> Self {
        Self {
            family,
            policy,
            handlers: HashMap::new(),
        }
    }

    fn validate(&self, key: TopicKey) -> Result<()> {
        let allowed = match key {
            TopicKey::Id(0) => false,
            TopicKey::Id(_) => true,
            TopicKey::All => self.policy != KeyPolicy::IdOnly,
            TopicKey::Master => self.policy == KeyPolicy::IdAllOrMaster,
        };
        if allowed {
            Ok(())
        } else {
            Err(ControlLinkError::InvalidKey(format!(
                "'{}' is not a valid {} key",
                key, self.family
            )))
        }
    }

    /// Append `handler` to `key`'s list.
    ///
    /// Returns `true` when this registration made the key newly present
    /// (list went from absent to length one); the caller must then
    /// synchronize the family. The registration stands even if that
    /// synchronize later fails.
    pub fn add(&mut self, key: TopicKey, handler: EventHandler<E>) -> Result<bool> {
        self.validate(key)?;
        let list = self.handlers.entry(key).or_default();
        list.push(handler);
        Ok(list.len() == 1)
    }

    /// Remove the most recently registered occurrence of `handler` under
    /// `key` (pointer identity). A handler registered twice needs two
    /// removals.
    ///
    /// Returns `true` when the list emptied and the key was evicted; the
    /// caller must then synchronize the family. Fails with `NotRegistered`
    /// when the key has no handlers or the handler is not among them; no
    /// state is altered in that case.
    pub fn remove(&mut self, key: TopicKey, handler: &EventHandler<E>) -> Result<bool> {
        let list = self.handlers.get_mut(&key).ok_or_else(|| {
            ControlLinkError::NotRegistered(format!(
                "no handlers for {} {} exist",
                self.family, key
            ))
        })?;

        let index = list
            .iter()
            .rposition(|registered| Arc::ptr_eq(registered, handler))
            .ok_or_else(|| {
                ControlLinkError::NotRegistered(format!(
                    "given handler is not registered for {} {}",
                    self.family, key
                ))
            })?;

        list.remove(index);
        if list.is_empty() {
            self.handlers.remove(&key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Invoke every handler registered for `key`, synchronously, in
    /// registration order. Wildcard listeners fire first, then the specific
    /// key's listeners; a wildcard entry is not exclusive of specific-id
    /// matches. Returns the number of handlers invoked.
    ///
    /// Each invocation is isolated: a panicking handler is caught and logged
    /// without aborting delivery to the handlers after it.
    pub fn dispatch(&self, key: TopicKey, event: &E) -> usize {
        let mut invoked = 0;
        if key != TopicKey::All {
            invoked += self.run_list(TopicKey::All, event);
        }
        invoked + self.run_list(key, event)
    }

    fn run_list(&self, key: TopicKey, event: &E) -> usize {
        let Some(list) = self.handlers.get(&key) else {
            return 0;
        };
        for handler in list {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = payload.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                };
                log::error!("{} handler for {} panicked: {}", self.family, key, info);
            }
        }
        list.len()
    }

    /// Compute the desired interest set from the live mapping.
    pub fn interests(&self) -> InterestSet {
        let mut ids: Vec<u32> = self
            .handlers
            .keys()
            .filter_map(|key| match key {
                TopicKey::Id(id) => Some(*id),
                _ => None,
            })
            .collect();
        ids.sort_unstable();
        InterestSet {
            all: self.handlers.contains_key(&TopicKey::All),
            master: self.handlers.contains_key(&TopicKey::Master),
            ids,
        }
    }

    pub fn has(&self, key: TopicKey) -> bool {
        self.handlers.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Total handlers across all keys.
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

impl<E> fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("family", &self.family)
            .field("policy", &self.policy)
            .field("keys", &self.handlers.len())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn registry(policy: KeyPolicy) -> Registry<u32> {
        Registry::new("test", policy)
    }

    fn counting_handler(counter: Arc<AtomicUsize>) -> EventHandler<u32> {
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    // ── key validation ────────────────────────────────────────────────────

    #[test]
    fn rejects_zero_id() {
        let mut reg = registry(KeyPolicy::IdOrAll);
        let err = reg.add(TopicKey::Id(0), Arc::new(|_| {})).unwrap_err();
        assert!(matches!(err, ControlLinkError::InvalidKey(_)));
        assert!(reg.is_empty());
    }

    #[test]
    fn rejects_all_when_policy_is_id_only() {
        let mut reg = registry(KeyPolicy::IdOnly);
        let err = reg.add(TopicKey::All, Arc::new(|_| {})).unwrap_err();
        assert!(matches!(err, ControlLinkError::InvalidKey(_)));
    }

    #[test]
    fn rejects_master_unless_policy_allows_it() {
        for policy in [KeyPolicy::IdOnly, KeyPolicy::IdOrAll] {
            let mut reg = registry(policy);
            assert!(reg.add(TopicKey::Master, Arc::new(|_| {})).is_err());
        }
        let mut reg = registry(KeyPolicy::IdAllOrMaster);
        assert!(reg.add(TopicKey::Master, Arc::new(|_| {})).unwrap());
    }

    // ── presence and sync triggers ────────────────────────────────────────

    #[test]
    fn first_handler_reports_newly_present() {
        let mut reg = registry(KeyPolicy::IdOrAll);
        assert!(reg.add(TopicKey::Id(7), Arc::new(|_| {})).unwrap());
        assert!(!reg.add(TopicKey::Id(7), Arc::new(|_| {})).unwrap());
        assert!(reg.add(TopicKey::Id(8), Arc::new(|_| {})).unwrap());
    }

    #[test]
    fn removing_last_handler_evicts_key() {
        let mut reg = registry(KeyPolicy::IdOrAll);
        let a: EventHandler<u32> = Arc::new(|_| {});
        let b: EventHandler<u32> = Arc::new(|_| {});
        reg.add(TopicKey::Id(7), a.clone()).unwrap();
        reg.add(TopicKey::Id(7), b.clone()).unwrap();

        assert!(!reg.remove(TopicKey::Id(7), &a).unwrap());
        assert!(reg.has(TopicKey::Id(7)));
        assert!(reg.remove(TopicKey::Id(7), &b).unwrap());
        assert!(!reg.has(TopicKey::Id(7)));
        assert!(reg.is_empty());
    }

    #[test]
    fn duplicate_registration_requires_two_removals() {
        let mut reg = registry(KeyPolicy::IdOrAll);
        let handler: EventHandler<u32> = Arc::new(|_| {});
        reg.add(TopicKey::Id(3), handler.clone()).unwrap();
        reg.add(TopicKey::Id(3), handler.clone()).unwrap();

        assert!(!reg.remove(TopicKey::Id(3), &handler).unwrap());
        assert_eq!(reg.handler_count(), 1);
        assert!(reg.remove(TopicKey::Id(3), &handler).unwrap());
    }

    #[test]
    fn remove_unknown_key_fails_without_side_effects() {
        let mut reg = registry(KeyPolicy::IdOrAll);
        reg.add(TopicKey::Id(1), Arc::new(|_| {})).unwrap();

        let stranger: EventHandler<u32> = Arc::new(|_| {});
        let err = reg.remove(TopicKey::Id(2), &stranger).unwrap_err();
        assert!(matches!(err, ControlLinkError::NotRegistered(_)));
        assert!(reg.has(TopicKey::Id(1)));
        assert_eq!(reg.handler_count(), 1);
    }

    #[test]
    fn remove_unknown_handler_fails() {
        let mut reg = registry(KeyPolicy::IdOrAll);
        reg.add(TopicKey::Id(1), Arc::new(|_| {})).unwrap();

        let stranger: EventHandler<u32> = Arc::new(|_| {});
        let err = reg.remove(TopicKey::Id(1), &stranger).unwrap_err();
        assert!(matches!(err, ControlLinkError::NotRegistered(_)));
        assert_eq!(reg.handler_count(), 1);
    }

    #[test]
    fn identity_comparison_distinguishes_equal_closures() {
        // Two separately allocated handlers with identical behavior must not
        // be interchangeable for removal.
        let mut reg = registry(KeyPolicy::IdOrAll);
        let a: EventHandler<u32> = Arc::new(|_| {});
        let b: EventHandler<u32> = Arc::new(|_| {});
        reg.add(TopicKey::Id(5), a.clone()).unwrap();

        assert!(reg.remove(TopicKey::Id(5), &b).is_err());
        assert!(reg.remove(TopicKey::Id(5), &a).unwrap());
    }

    // ── interest sets ─────────────────────────────────────────────────────

    #[test]
    fn interests_track_live_mapping_exactly() {
        let mut reg = registry(KeyPolicy::IdAllOrMaster);
        assert_eq!(
            reg.interests(),
            InterestSet { all: false, master: false, ids: vec![] }
        );

        let h: EventHandler<u32> = Arc::new(|_| {});
        reg.add(TopicKey::Id(9), h.clone()).unwrap();
        reg.add(TopicKey::Id(2), Arc::new(|_| {})).unwrap();
        reg.add(TopicKey::All, Arc::new(|_| {})).unwrap();
        reg.add(TopicKey::Master, Arc::new(|_| {})).unwrap();
        assert_eq!(
            reg.interests(),
            InterestSet { all: true, master: true, ids: vec![2, 9] }
        );

        reg.remove(TopicKey::Id(9), &h).unwrap();
        assert_eq!(
            reg.interests(),
            InterestSet { all: true, master: true, ids: vec![2] }
        );
    }

    // ── dispatch ──────────────────────────────────────────────────────────

    #[test]
    fn dispatch_fires_wildcard_and_specific_listeners() {
        let mut reg = registry(KeyPolicy::IdOrAll);
        let order = Arc::new(Mutex::new(Vec::new()));

        let all_order = order.clone();
        reg.add(
            TopicKey::All,
            Arc::new(move |_| all_order.lock().unwrap().push("all")),
        )
        .unwrap();
        let id_order = order.clone();
        reg.add(
            TopicKey::Id(7),
            Arc::new(move |_| id_order.lock().unwrap().push("id")),
        )
        .unwrap();

        assert_eq!(reg.dispatch(TopicKey::Id(7), &7), 2);
        assert_eq!(*order.lock().unwrap(), vec!["all", "id"]);
    }

    #[test]
    fn dispatch_preserves_registration_order() {
        let mut reg = registry(KeyPolicy::IdOnly);
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            reg.add(TopicKey::Id(1), Arc::new(move |_| order.lock().unwrap().push(tag)))
                .unwrap();
        }

        reg.dispatch(TopicKey::Id(1), &1);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn dispatch_to_unregistered_key_is_a_no_op() {
        let reg = registry(KeyPolicy::IdOrAll);
        assert_eq!(reg.dispatch(TopicKey::Id(42), &42), 0);
    }

    #[test]
    fn panicking_handler_does_not_abort_fan_out() {
        let mut reg = registry(KeyPolicy::IdOnly);
        let counter = Arc::new(AtomicUsize::new(0));

        reg.add(TopicKey::Id(1), counting_handler(counter.clone())).unwrap();
        reg.add(TopicKey::Id(1), Arc::new(|_| panic!("boom"))).unwrap();
        reg.add(TopicKey::Id(1), counting_handler(counter.clone())).unwrap();

        assert_eq!(reg.dispatch(TopicKey::Id(1), &1), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispatch_under_master_includes_wildcard() {
        let mut reg = registry(KeyPolicy::IdAllOrMaster);
        let counter = Arc::new(AtomicUsize::new(0));
        reg.add(TopicKey::All, counting_handler(counter.clone())).unwrap();
        reg.add(TopicKey::Master, counting_handler(counter.clone())).unwrap();

        assert_eq!(reg.dispatch(TopicKey::Master, &0), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
