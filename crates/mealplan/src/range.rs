use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{AbortHandle, Abortable, Aborted};
use imkitchen_shared::mealplan::DateRange;
use time::Date;

use crate::{MealPlanStore, RemoteEntry, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeLoad {
    /// The same range was already requested; nothing was fetched.
    Skipped,
    Loaded { entries: usize },
    /// A newer range superseded this fetch.
    Cancelled,
}

struct Flight {
    generation: u64,
    abort: AbortHandle,
}

#[derive(Default)]
struct State {
    last: Option<String>,
    in_flight: Option<Flight>,
    generation: u64,
}

/// Hydrates a [`MealPlanStore`] one date window at a time.
///
/// Only the most recently requested range is remembered: a window nested in
/// a wider one fetched earlier is fetched again. The key is recorded before
/// the fetch starts so a duplicate call made while it is in flight is
/// skipped, and it stays recorded when the fetch fails.
pub struct RangeFetchCoordinator {
    store: MealPlanStore,
    state: Mutex<State>,
}

impl RangeFetchCoordinator {
    pub fn new(store: MealPlanStore) -> Self {
        Self {
            store,
            state: Default::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_range(&self) -> Option<String> {
        self.lock().last.to_owned()
    }

    pub async fn ensure_range_loaded(
        &self,
        user_id: &str,
        start: Date,
        end: Date,
    ) -> Result<RangeLoad> {
        if user_id.is_empty() || user_id != self.store.user_id() {
            imkitchen_shared::bail!("range requested for user '{user_id}' outside its board");
        }

        let range = DateRange::new(start, end)?;
        let key = range.key();

        let (registration, generation) = {
            let mut state = self.lock();
            if state.last.as_deref() == Some(key.as_str()) {
                tracing::debug!(user_id, range = %key, "range already loaded");
                return Ok(RangeLoad::Skipped);
            }

            state.last = Some(key.to_owned());

            if let Some(previous) = state.in_flight.take() {
                tracing::debug!(user_id, generation = previous.generation, "cancelling range fetch");
                previous.abort.abort();
            }

            state.generation += 1;
            let (abort, registration) = AbortHandle::new_pair();
            state.in_flight = Some(Flight {
                generation: state.generation,
                abort,
            });

            (registration, state.generation)
        };

        let remote = self.store.remote();
        let fetched = Abortable::new(remote.list_entries(user_id, range), registration).await;
        let current = self.finish(generation);

        let rows = match fetched {
            Err(Aborted) => return Ok(RangeLoad::Cancelled),
            Ok(_) if !current => return Ok(RangeLoad::Cancelled),
            Ok(Err(err)) => {
                tracing::warn!(user_id, range = %key, err = %err, "range fetch failed");
                return Err(err.into());
            }
            Ok(Ok(rows)) => rows,
        };

        let entries = rows.len();
        self.store
            .bulk_load(rows.into_iter().map(RemoteEntry::into_entry));
        tracing::info!(user_id, range = %key, entries, "range loaded");

        Ok(RangeLoad::Loaded { entries })
    }

    /// Forgets the last range and fetches `start..=end` again.
    pub async fn refresh(&self, user_id: &str, start: Date, end: Date) -> Result<RangeLoad> {
        self.lock().last = None;
        self.ensure_range_loaded(user_id, start, end).await
    }

    /// Drops the remembered range and cancels any fetch in flight.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.last = None;
        if let Some(flight) = state.in_flight.take() {
            flight.abort.abort();
        }
    }

    fn finish(&self, generation: u64) -> bool {
        let mut state = self.lock();
        match state.in_flight.as_ref() {
            Some(flight) if flight.generation == generation => {
                state.in_flight = None;
                true
            }
            _ => false,
        }
    }
}
