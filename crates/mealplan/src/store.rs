use std::{
    collections::{HashMap, HashSet},
    future::{Future, IntoFuture},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::BoxFuture;
use imkitchen_shared::mealplan::{DateRange, MealPlanEntry, RecipeSummary, SlotKey};
use validator::Validate;

use crate::{MealPlanError, MealPlanRemote, Result};

struct Slot {
    entry: MealPlanEntry,
    ticket: u64,
}

#[derive(Default)]
struct State {
    slots: HashMap<SlotKey, Slot>,
    next_ticket: u64,
    /// Tickets of pending writes the user removed before they resolved.
    removed: HashSet<u64>,
}

impl State {
    fn put(&mut self, key: SlotKey, entry: MealPlanEntry) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.slots.insert(key, Slot { entry, ticket });
        ticket
    }

    fn owns(&self, key: &SlotKey, ticket: u64) -> bool {
        self.slots.get(key).is_some_and(|s| s.ticket == ticket)
    }
}

/// How a pending assignment resolved once the backend answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// The optimistic entry was promoted with its association id.
    Confirmed(MealPlanEntry),
    /// A later assignment replaced the entry before the backend answered.
    /// Creates replace by slot, so there is nothing to clean up.
    Superseded { association_id: String },
    /// The user removed the entry before the backend answered; the orphaned
    /// association is deleted.
    Discarded { association_id: String },
    /// The board was reset before the backend answered. The association
    /// stays persisted and shows up on the next load.
    Detached { association_id: String },
}

/// Remote half of an [`MealPlanStore::assign`]. The local entry already
/// exists when this is returned; awaiting it confirms or rolls it back.
#[must_use = "the assignment is only persisted when this future is awaited or spawned"]
pub struct PendingAssign {
    slot: SlotKey,
    fut: BoxFuture<'static, Result<AssignOutcome>>,
}

impl PendingAssign {
    pub fn slot(&self) -> SlotKey {
        self.slot
    }
}

impl IntoFuture for PendingAssign {
    type Output = Result<AssignOutcome>;
    type IntoFuture = BoxFuture<'static, Result<AssignOutcome>>;

    fn into_future(self) -> Self::IntoFuture {
        self.fut
    }
}

/// In-memory board for one user, reconciled with the remote plan.
#[derive(Clone)]
pub struct MealPlanStore {
    user_id: String,
    remote: Arc<dyn MealPlanRemote>,
    state: Arc<Mutex<State>>,
}

impl MealPlanStore {
    pub fn new(user_id: impl Into<String>, remote: Arc<dyn MealPlanRemote>) -> Self {
        Self {
            user_id: user_id.into(),
            remote,
            state: Default::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub(crate) fn remote(&self) -> &Arc<dyn MealPlanRemote> {
        &self.remote
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    pub fn get(&self, slot: &SlotKey) -> Option<MealPlanEntry> {
        self.lock().slots.get(slot).map(|s| s.entry.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    /// Entries inside `range`, ordered by day then meal.
    pub fn entries_in(&self, range: &DateRange) -> Vec<(SlotKey, MealPlanEntry)> {
        let mut entries = self
            .lock()
            .slots
            .iter()
            .filter(|(key, _)| range.contains(key.date))
            .map(|(key, slot)| (*key, slot.entry.clone()))
            .collect::<Vec<_>>();
        entries.sort_by_key(|(key, _)| *key);
        entries
    }

    /// Writes a pending entry immediately, replacing whatever the slot held,
    /// and returns the remote write. The entry is promoted when the write
    /// succeeds and removed when it fails.
    pub fn assign(&self, slot: SlotKey, recipe: RecipeSummary) -> Result<PendingAssign> {
        if self.user_id.is_empty() {
            imkitchen_shared::bail!("no authenticated user for this board");
        }
        recipe.validate()?;

        let ticket = self.lock().put(slot, MealPlanEntry::pending(&recipe));
        tracing::debug!(%slot, recipe_id = %recipe.recipe_id, ticket, "optimistic assign");

        let fut = confirm(
            self.user_id.to_owned(),
            self.remote.clone(),
            self.state.clone(),
            slot,
            recipe.recipe_id,
            ticket,
        );

        Ok(PendingAssign {
            slot,
            fut: Box::pin(fut),
        })
    }

    /// Clears the slot right away, pending or not. A persisted association is
    /// deleted in the background; a failed delete is only logged.
    pub fn remove(&self, slot: &SlotKey) -> Option<MealPlanEntry> {
        let removed = {
            let mut state = self.lock();
            let slot = state.slots.remove(slot)?;
            if slot.entry.is_pending {
                state.removed.insert(slot.ticket);
            }
            slot.entry
        };

        if let Some(association_id) = removed.remote_association_id.to_owned() {
            spawn_delete(self.remote.clone(), association_id);
        }

        Some(removed)
    }

    /// Merges fetched entries. Slots with a write in flight keep their
    /// pending entry.
    pub fn bulk_load(&self, entries: impl IntoIterator<Item = (SlotKey, MealPlanEntry)>) {
        let mut state = self.lock();
        let mut loaded = 0usize;
        for (key, entry) in entries {
            if state.slots.get(&key).is_some_and(|s| s.entry.is_pending) {
                tracing::debug!(slot = %key, "keeping pending entry over fetched one");
                continue;
            }

            state.put(key, entry);
            loaded += 1;
        }

        tracing::debug!(user_id = %self.user_id, loaded, "bulk load");
    }

    /// Forgets every slot without touching the backend. Writes still in
    /// flight resolve as [`AssignOutcome::Detached`].
    pub fn clear(&self) {
        self.lock().slots.clear();
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn confirm(
    user_id: String,
    remote: Arc<dyn MealPlanRemote>,
    state: Arc<Mutex<State>>,
    slot: SlotKey,
    recipe_id: String,
    ticket: u64,
) -> impl Future<Output = Result<AssignOutcome>> + Send + 'static {
    async move {
        let created = remote.create_association(&user_id, slot, &recipe_id).await;

        let mut guard = lock(&state);
        let removed = guard.removed.remove(&ticket);
        let association_id = match created {
            Ok(id) => id,
            Err(err) => {
                if guard.owns(&slot, ticket) {
                    guard.slots.remove(&slot);
                    tracing::warn!(%slot, %recipe_id, err = %err, "assign failed, rolled back");
                } else {
                    tracing::debug!(%slot, err = %err, "stale assign failed");
                }

                return Err(MealPlanError::Remote(err));
            }
        };

        if let Some(current) = guard.slots.get_mut(&slot).filter(|s| s.ticket == ticket) {
            current.entry.confirm(association_id);
            return Ok(AssignOutcome::Confirmed(current.entry.clone()));
        }

        if removed {
            drop(guard);
            tracing::warn!(%slot, %association_id, "removed while assigning, deleting association");
            spawn_delete(remote, association_id.to_owned());

            return Ok(AssignOutcome::Discarded { association_id });
        }

        if guard.slots.contains_key(&slot) {
            tracing::debug!(%slot, %association_id, "assign superseded by a newer one");
            return Ok(AssignOutcome::Superseded { association_id });
        }

        tracing::debug!(%slot, %association_id, "board reset while assigning, keeping association");

        Ok(AssignOutcome::Detached { association_id })
    }
}

fn spawn_delete(remote: Arc<dyn MealPlanRemote>, association_id: String) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(%association_id, "no runtime to delete association");
        return;
    };

    handle.spawn(async move {
        if let Err(err) = remote.delete_association(&association_id).await {
            tracing::warn!(%association_id, err = %err, "failed to delete association");
        }
    });
}
