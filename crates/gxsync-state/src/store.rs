//! DataStore - the shared table of current variable values
//!
//! Writes go through the arbitration rule in `exchange`. A rejected write is
//! parked in a per-name queue and re-attempted whenever the stored variable
//! of that name changes status, so a client value that arrived while the sim
//! held the slot lands as soon as the sim's update is acknowledged.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gxsync_core::{DataStatus, GxError, GxResult, Registry, Trigger};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::exchange::{admit, Admission};
use crate::Variable;

/// Read/write access to stored variables, as the block codec needs it
pub trait VariableStore {
    /// Upsert a variable
    fn store(&self, variable: Variable) -> GxResult<StoreOutcome>;

    /// Copy of the stored variable, `None` when nothing is stored yet
    fn try_get(&self, name: &str) -> GxResult<Option<Variable>>;
}

/// Result of a `store` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Written to the store
    Stored,
    /// Same bytes already stored
    Unchanged,
    /// Lost arbitration, waiting in the queue
    Queued,
}

/// Which copy of a variable an operation addresses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Stored,
    Queued,
}

/// Store configuration
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Maximum number of names with a queued write
    pub max_queued: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { max_queued: 64 }
    }
}

/// A status change seen by observers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub name: String,
    pub slot: Slot,
    pub from: DataStatus,
    pub to: DataStatus,
}

/// Receives status changes made through the store
pub trait StatusObserver: Send + Sync {
    fn status_changed(&self, change: &StatusChange);
}

/// Handle returned by `subscribe`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
struct StoreState {
    stored: HashMap<String, Variable>,
    queued: BTreeMap<String, Variable>,
}

impl StoreState {
    fn slot_mut(&mut self, slot: Slot, name: &str) -> GxResult<&mut Variable> {
        let found = match slot {
            Slot::Stored => self.stored.get_mut(name),
            Slot::Queued => self.queued.get_mut(name),
        };
        found.ok_or_else(|| GxError::VariableNotFound(name.to_owned()))
    }
}

/// Thread-safe variable store
pub struct DataStore {
    registry: Arc<Registry>,
    config: StoreConfig,
    state: RwLock<StoreState>,
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn StatusObserver>)>>,
    next_subscription: AtomicU64,
}

impl DataStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, StoreConfig::default())
    }

    pub fn with_config(registry: Arc<Registry>, config: StoreConfig) -> Self {
        DataStore {
            registry,
            config,
            state: RwLock::new(StoreState::default()),
            observers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Arm a trigger on the variable in `slot`
    pub fn set_trigger(&self, slot: Slot, name: &str, trigger: Trigger) -> GxResult<()> {
        let mut state = self.state.write();
        state.slot_mut(slot, name)?.set_trigger(trigger)
    }

    /// Fire the armed trigger of the variable in `slot` and arm `next`
    ///
    /// Observers see the change once the store lock is released; the queued
    /// write for `name`, if any, is re-attempted afterwards.
    pub fn change_status(&self, slot: Slot, name: &str, next: Trigger) -> GxResult<DataStatus> {
        let change = {
            let mut state = self.state.write();
            let variable = state.slot_mut(slot, name)?;
            let from = variable.status();
            let to = variable.change_status(next)?;
            StatusChange {
                name: variable.name().to_owned(),
                slot,
                from,
                to,
            }
        };

        self.notify(&change);
        self.retry(name)?;
        Ok(change.to)
    }

    /// Re-attempt every queued write, returning how many landed
    pub fn retry_queued(&self) -> GxResult<usize> {
        let mut state = self.state.write();
        let names: Vec<String> = state.queued.keys().cloned().collect();

        let mut landed = 0;
        for name in names {
            if let Some(variable) = state.queued.remove(&name) {
                if self.upsert(&mut state, variable)? == StoreOutcome::Stored {
                    landed += 1;
                }
            }
        }
        Ok(landed)
    }

    pub fn subscribe(&self, observer: Arc<dyn StatusObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    /// Copy of the queued write for `name`
    pub fn queued(&self, name: &str) -> Option<Variable> {
        self.state.read().queued.get(name).cloned()
    }

    /// Number of stored variables
    pub fn len(&self) -> usize {
        self.state.read().stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().stored.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.state.read().queued.len()
    }

    fn retry(&self, name: &str) -> GxResult<()> {
        let mut state = self.state.write();
        if let Some(variable) = state.queued.remove(name) {
            self.upsert(&mut state, variable)?;
        }
        Ok(())
    }

    fn notify(&self, change: &StatusChange) {
        let observers: Vec<Arc<dyn StatusObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer.status_changed(change);
        }
    }

    fn upsert(&self, state: &mut StoreState, variable: Variable) -> GxResult<StoreOutcome> {
        let attrs = self.registry.find(variable.name())?;

        let admission = match state.stored.get(variable.name()) {
            Some(existing) => admit(existing, &variable, attrs)?,
            None => Admission::Accept,
        };

        match admission {
            Admission::Unchanged => {
                debug!(name = variable.name(), "value unchanged");
                Ok(StoreOutcome::Unchanged)
            }
            Admission::Accept => {
                debug!(name = variable.name(), status = ?variable.status(), "variable stored");
                state.queued.remove(variable.name());
                state.stored.insert(variable.name().to_owned(), variable);
                Ok(StoreOutcome::Stored)
            }
            Admission::Reject => {
                if !state.queued.contains_key(variable.name())
                    && state.queued.len() >= self.config.max_queued
                {
                    warn!(name = variable.name(), max = self.config.max_queued, "write queue full");
                    return Err(GxError::QueueFull(self.config.max_queued));
                }
                warn!(name = variable.name(), status = ?variable.status(), "write rejected, queued");
                state.queued.insert(variable.name().to_owned(), variable);
                Ok(StoreOutcome::Queued)
            }
        }
    }
}

impl VariableStore for DataStore {
    fn store(&self, variable: Variable) -> GxResult<StoreOutcome> {
        let mut state = self.state.write();
        self.upsert(&mut state, variable)
    }

    fn try_get(&self, name: &str) -> GxResult<Option<Variable>> {
        if name.trim().is_empty() {
            return Err(GxError::InvalidArgument(
                "variable name may not be blank".into(),
            ));
        }
        Ok(self.state.read().stored.get(name).cloned())
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("config", &self.config)
            .field("state", &*self.state.read())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gxsync_core::{VariableAttributes, VariableType, FIRST_LONG, FIRST_MESSAGE, FIRST_NUMBER};
    use parking_lot::Mutex;

    fn store() -> DataStore {
        DataStore::new(Arc::new(Registry::builtin()))
    }

    fn number(status: DataStatus, value: i32) -> Variable {
        Variable::int32(&Registry::builtin(), FIRST_NUMBER, status, value).unwrap()
    }

    fn long(status: DataStatus, value: i64) -> Variable {
        Variable::int64(&Registry::builtin(), FIRST_LONG, status, value).unwrap()
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<StatusChange>>);

    impl StatusObserver for Recorder {
        fn status_changed(&self, change: &StatusChange) {
            self.0.lock().push(change.clone());
        }
    }

    #[test]
    fn test_store_and_get() {
        let store = store();
        assert!(store.is_empty());

        assert_eq!(store.store(number(DataStatus::FromSimToClient, 42)).unwrap(), StoreOutcome::Stored);
        let got = store.try_get(FIRST_NUMBER).unwrap().unwrap();
        assert_eq!(got.value().unwrap().as_i32(), Some(42));
        assert_eq!(got.status(), DataStatus::FromSimToClient);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_try_get_missing_and_blank() {
        let store = store();
        assert_eq!(store.try_get(FIRST_MESSAGE).unwrap(), None);
        assert!(matches!(store.try_get(""), Err(GxError::InvalidArgument(_))));
        assert!(matches!(store.try_get("   "), Err(GxError::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let other = Registry::new(
            vec![VariableAttributes::new("Other", VariableType::Int32, 4, 1, 4, false)],
            1,
        )
        .unwrap();
        let stranger = Variable::int32(&other, "Other", DataStatus::Synchronized, 1).unwrap();

        assert_eq!(
            store().store(stranger),
            Err(GxError::VariableNotFound("Other".into()))
        );
    }

    #[test]
    fn test_same_bytes_is_noop() {
        let store = store();
        store.store(number(DataStatus::FromSimToClient, 7)).unwrap();

        assert_eq!(
            store.store(number(DataStatus::FromClientToSim, 7)).unwrap(),
            StoreOutcome::Unchanged
        );
        let got = store.try_get(FIRST_NUMBER).unwrap().unwrap();
        assert_eq!(got.status(), DataStatus::FromSimToClient);
        assert_eq!(store.queue_len(), 0);
    }

    #[test]
    fn test_non_boss_arbitration() {
        let store = store();

        // Sim value holds against the client
        store.store(number(DataStatus::FromSimToClient, 1)).unwrap();
        assert_eq!(store.store(number(DataStatus::FromClientToSim, 2)).unwrap(), StoreOutcome::Queued);
        assert_eq!(store.try_get(FIRST_NUMBER).unwrap().unwrap().value().unwrap().as_i32(), Some(1));

        // Client value gives way to the sim
        let store = self::store();
        store.store(number(DataStatus::FromClientToSim, 1)).unwrap();
        assert_eq!(store.store(number(DataStatus::FromSimToClient, 2)).unwrap(), StoreOutcome::Stored);
    }

    #[test]
    fn test_boss_arbitration() {
        let store = store();

        store.store(long(DataStatus::FromClientToSim, 1)).unwrap();
        assert_eq!(store.store(long(DataStatus::FromSimToClient, 2)).unwrap(), StoreOutcome::Queued);
        assert_eq!(store.queued(FIRST_LONG).unwrap().value().unwrap().as_i64(), Some(2));

        let store = self::store();
        store.store(long(DataStatus::FromSimToClient, 1)).unwrap();
        assert_eq!(store.store(long(DataStatus::FromClientToSim, 2)).unwrap(), StoreOutcome::Stored);
    }

    #[test]
    fn test_queued_write_lands_after_acknowledge() {
        let store = store();
        store.store(number(DataStatus::FromSimToClient, 1)).unwrap();
        store.store(number(DataStatus::FromClientToSim, 2)).unwrap();

        store.set_trigger(Slot::Stored, FIRST_NUMBER, Trigger::SimSendsUpdate).unwrap();
        assert_eq!(
            store.change_status(Slot::Stored, FIRST_NUMBER, Trigger::ClientAcknowledged).unwrap(),
            DataStatus::FromSimToClientInProgress
        );
        assert_eq!(store.queue_len(), 1);

        assert_eq!(
            store.change_status(Slot::Stored, FIRST_NUMBER, Trigger::SimSendsUpdate).unwrap(),
            DataStatus::Synchronized
        );
        assert_eq!(store.queue_len(), 0);

        let got = store.try_get(FIRST_NUMBER).unwrap().unwrap();
        assert_eq!(got.value().unwrap().as_i32(), Some(2));
        assert_eq!(got.status(), DataStatus::FromClientToSim);
    }

    #[test]
    fn test_newer_rejected_write_replaces_queued() {
        let store = store();
        store.store(number(DataStatus::FromSimToClient, 1)).unwrap();
        store.store(number(DataStatus::FromClientToSim, 2)).unwrap();
        store.store(number(DataStatus::FromClientToSim, 3)).unwrap();

        assert_eq!(store.queue_len(), 1);
        assert_eq!(store.queued(FIRST_NUMBER).unwrap().value().unwrap().as_i32(), Some(3));
    }

    #[test]
    fn test_accepted_write_drops_queued() {
        let store = store();
        store.store(number(DataStatus::FromSimToClient, 1)).unwrap();
        store.store(number(DataStatus::FromClientToSim, 2)).unwrap();

        assert_eq!(store.store(number(DataStatus::FromSimToClient, 5)).unwrap(), StoreOutcome::Stored);
        assert_eq!(store.queue_len(), 0);
        assert!(store.queued(FIRST_NUMBER).is_none());
    }

    #[test]
    fn test_queue_full() {
        let store = DataStore::with_config(
            Arc::new(Registry::builtin()),
            StoreConfig { max_queued: 1 },
        );
        store.store(number(DataStatus::FromSimToClient, 1)).unwrap();
        store.store(long(DataStatus::FromClientToSim, 1)).unwrap();

        assert_eq!(store.store(number(DataStatus::FromClientToSim, 2)).unwrap(), StoreOutcome::Queued);
        assert_eq!(store.store(long(DataStatus::FromSimToClient, 2)), Err(GxError::QueueFull(1)));

        // Replacing the entry already queued does not need room
        assert_eq!(store.store(number(DataStatus::FromClientToSim, 3)).unwrap(), StoreOutcome::Queued);
    }

    #[test]
    fn test_retry_queued() {
        let store = store();
        store.store(number(DataStatus::FromSimToClient, 1)).unwrap();
        store.store(number(DataStatus::FromClientToSim, 2)).unwrap();

        assert_eq!(store.retry_queued().unwrap(), 0);
        assert_eq!(store.queue_len(), 1);

        store.set_trigger(Slot::Stored, FIRST_NUMBER, Trigger::SimSendsUpdate).unwrap();
        store.change_status(Slot::Stored, FIRST_NUMBER, Trigger::ClientAcknowledged).unwrap();
        store.set_trigger(Slot::Queued, FIRST_NUMBER, Trigger::ClientSendsUpdate).unwrap();
        store
            .change_status(Slot::Queued, FIRST_NUMBER, Trigger::SimAcknowledged)
            .unwrap();

        // Both copies in flight, the queued one still loses
        assert_eq!(store.queue_len(), 1);
    }

    #[test]
    fn test_empty_slot() {
        let store = store();
        assert_eq!(
            store.set_trigger(Slot::Stored, FIRST_NUMBER, Trigger::SimSendsUpdate),
            Err(GxError::VariableNotFound(FIRST_NUMBER.into()))
        );
        assert!(store
            .change_status(Slot::Queued, FIRST_NUMBER, Trigger::SimSendsUpdate)
            .is_err());
    }

    #[test]
    fn test_illegal_trigger_leaves_store_untouched() {
        let store = store();
        store.store(number(DataStatus::Synchronized, 1)).unwrap();

        assert!(store
            .set_trigger(Slot::Stored, FIRST_NUMBER, Trigger::ClientAcknowledged)
            .is_err());
        assert!(store
            .change_status(Slot::Stored, FIRST_NUMBER, Trigger::SimSendsUpdate)
            .is_err());
        assert_eq!(
            store.try_get(FIRST_NUMBER).unwrap().unwrap().status(),
            DataStatus::Synchronized
        );
    }

    #[test]
    fn test_observers() {
        let store = store();
        let recorder = Arc::new(Recorder::default());
        let id = store.subscribe(recorder.clone());

        store.store(number(DataStatus::StatusNotSet, 1)).unwrap();
        store.set_trigger(Slot::Stored, FIRST_NUMBER, Trigger::SimSendsUpdate).unwrap();
        store
            .change_status(Slot::Stored, FIRST_NUMBER, Trigger::SimSendsUpdate)
            .unwrap();

        assert_eq!(
            recorder.0.lock().as_slice(),
            &[StatusChange {
                name: FIRST_NUMBER.into(),
                slot: Slot::Stored,
                from: DataStatus::StatusNotSet,
                to: DataStatus::FromSimToClient,
            }]
        );

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));

        store
            .change_status(Slot::Stored, FIRST_NUMBER, Trigger::ClientAcknowledged)
            .unwrap();
        assert_eq!(recorder.0.lock().len(), 1);
    }

    #[test]
    fn test_store_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DataStore>();

        let store = Arc::new(store());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.store(number(DataStatus::FromSimToClient, i)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 1);
    }
}
