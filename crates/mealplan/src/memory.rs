use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use imkitchen_shared::mealplan::{DateRange, RecipeSummary, SlotKey};
use time::Date;
use tokio::sync::watch;
use ulid::Ulid;

use crate::{MealPlanRemote, RemoteEntry, RemoteError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    List {
        user_id: String,
        range: DateRange,
    },
    Create {
        user_id: String,
        slot: SlotKey,
        recipe_id: String,
    },
    Delete {
        association_id: String,
    },
    CreatePlan {
        user_id: String,
        date: Date,
    },
}

/// Holds calls of one kind in flight until opened.
pub struct Gate(watch::Sender<bool>);

impl Gate {
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

#[derive(Default)]
struct Inner {
    rows: Vec<(String, RemoteEntry)>,
    recipes: HashMap<String, RecipeSummary>,
    plans: HashSet<(String, Date)>,
    require_plans: bool,
    association_ids: VecDeque<String>,
    list_failures: VecDeque<RemoteError>,
    create_failures: VecDeque<RemoteError>,
    delete_failures: VecDeque<RemoteError>,
    list_gate: Option<watch::Receiver<bool>>,
    create_gate: Option<watch::Receiver<bool>>,
    calls: Vec<RemoteCall>,
}

/// Process-local backend. Records every call and supports injected failures.
#[derive(Default)]
pub struct InMemoryRemote {
    inner: Mutex<Inner>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, user_id: impl Into<String>, entry: RemoteEntry) {
        let mut inner = self.lock();
        let user_id = user_id.into();
        inner
            .rows
            .retain(|(user, row)| !(user == &user_id && row.slot() == entry.slot()));
        inner.plans.insert((user_id.to_owned(), entry.date));
        inner.rows.push((user_id, entry));
    }

    pub fn with_entries(
        self,
        user_id: impl Into<String>,
        entries: impl IntoIterator<Item = RemoteEntry>,
    ) -> Self {
        let user_id = user_id.into();
        for entry in entries {
            self.insert(user_id.to_owned(), entry);
        }
        self
    }

    /// Registers a recipe so created associations carry its title and image.
    pub fn with_recipe(self, recipe: RecipeSummary) -> Self {
        self.lock()
            .recipes
            .insert(recipe.recipe_id.to_owned(), recipe);
        self
    }

    /// Makes `create_association` fail with `PlanMissing` until the plan for
    /// that date is created.
    pub fn require_plans(self) -> Self {
        self.lock().require_plans = true;
        self
    }

    pub fn queue_association_id(&self, id: impl Into<String>) {
        self.lock().association_ids.push_back(id.into());
    }

    pub fn fail_next_list(&self, err: RemoteError) {
        self.lock().list_failures.push_back(err);
    }

    pub fn fail_next_create(&self, err: RemoteError) {
        self.lock().create_failures.push_back(err);
    }

    pub fn fail_next_delete(&self, err: RemoteError) {
        self.lock().delete_failures.push_back(err);
    }

    pub fn hold_lists(&self) -> Gate {
        let (tx, rx) = watch::channel(false);
        self.lock().list_gate = Some(rx);
        Gate(tx)
    }

    pub fn hold_creates(&self) -> Gate {
        let (tx, rx) = watch::channel(false);
        self.lock().create_gate = Some(rx);
        Gate(tx)
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.to_vec()
    }

    pub fn list_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, RemoteCall::List { .. }))
            .count()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::Delete { association_id } => Some(association_id.to_owned()),
                _ => None,
            })
            .collect()
    }

    pub fn rows(&self, user_id: &str) -> Vec<RemoteEntry> {
        self.lock()
            .rows
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, row)| row.clone())
            .collect()
    }

    async fn wait(gate: Option<watch::Receiver<bool>>) {
        let Some(mut gate) = gate else {
            return;
        };

        // A dropped gate lets the call through.
        let _ = gate.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl MealPlanRemote for InMemoryRemote {
    async fn list_entries(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        let gate = {
            let mut inner = self.lock();
            inner.calls.push(RemoteCall::List {
                user_id: user_id.to_owned(),
                range,
            });
            inner.list_gate.clone()
        };

        Self::wait(gate).await;

        let mut inner = self.lock();
        if let Some(err) = inner.list_failures.pop_front() {
            return Err(err);
        }

        let mut rows = inner
            .rows
            .iter()
            .filter(|(user, row)| user == user_id && range.contains(row.date))
            .map(|(_, row)| row.clone())
            .collect::<Vec<_>>();
        rows.sort_by_key(|row| row.slot());

        Ok(rows)
    }

    async fn create_association(
        &self,
        user_id: &str,
        slot: SlotKey,
        recipe_id: &str,
    ) -> Result<String, RemoteError> {
        let gate = {
            let mut inner = self.lock();
            inner.calls.push(RemoteCall::Create {
                user_id: user_id.to_owned(),
                slot,
                recipe_id: recipe_id.to_owned(),
            });
            inner.create_gate.clone()
        };

        Self::wait(gate).await;

        let mut inner = self.lock();
        if let Some(err) = inner.create_failures.pop_front() {
            return Err(err);
        }

        if inner.require_plans && !inner.plans.contains(&(user_id.to_owned(), slot.date)) {
            return Err(RemoteError::PlanMissing { date: slot.date });
        }

        let association_id = inner
            .association_ids
            .pop_front()
            .unwrap_or_else(|| Ulid::new().to_string());

        let recipe = inner.recipes.get(recipe_id).cloned();
        let entry = RemoteEntry {
            date: slot.date,
            meal_type: slot.meal_type,
            recipe_id: recipe_id.to_owned(),
            recipe_display_name: recipe
                .as_ref()
                .map(|r| r.title.to_owned())
                .unwrap_or_else(|| recipe_id.to_owned()),
            recipe_image_url: recipe.and_then(|r| r.image_url),
            association_id: association_id.to_owned(),
        };

        inner
            .rows
            .retain(|(user, row)| !(user == user_id && row.slot() == slot));
        inner.rows.push((user_id.to_owned(), entry));

        Ok(association_id)
    }

    async fn delete_association(&self, association_id: &str) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Delete {
            association_id: association_id.to_owned(),
        });

        if let Some(err) = inner.delete_failures.pop_front() {
            return Err(err);
        }

        let before = inner.rows.len();
        inner
            .rows
            .retain(|(_, row)| row.association_id != association_id);

        if inner.rows.len() == before {
            return Err(RemoteError::NotFound(association_id.to_owned()));
        }

        Ok(())
    }

    async fn create_plan(&self, user_id: &str, date: Date) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::CreatePlan {
            user_id: user_id.to_owned(),
            date,
        });
        inner.plans.insert((user_id.to_owned(), date));

        Ok(())
    }
}
