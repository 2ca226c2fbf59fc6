use std::sync::Arc;

use async_trait::async_trait;
use imkitchen_shared::mealplan::{DateRange, MealPlanEntry, MealType, SlotKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("No meal plan exists for {date}")]
    PlanMissing { date: Date },

    #[error("Association not found: {0}")]
    NotFound(String),

    #[error("Rejected by backend: {0}")]
    Rejected(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Row returned by a range listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RemoteEntry {
    pub date: Date,
    pub meal_type: MealType,
    pub recipe_id: String,
    pub recipe_display_name: String,
    pub recipe_image_url: Option<String>,
    pub association_id: String,
}

impl RemoteEntry {
    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.date, self.meal_type)
    }

    pub fn into_entry(self) -> (SlotKey, MealPlanEntry) {
        let slot = self.slot();
        let entry = MealPlanEntry {
            recipe_id: self.recipe_id,
            display_name: self.recipe_display_name,
            image_url: self.recipe_image_url,
            remote_association_id: Some(self.association_id),
            is_pending: false,
        };

        (slot, entry)
    }
}

/// Persistence backend holding the durable meal plan.
#[async_trait]
pub trait MealPlanRemote: Send + Sync {
    /// Lists associations whose date falls inside the inclusive range.
    async fn list_entries(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Returns the new association id. A slot holds one association, so
    /// this replaces whatever the user had in `slot`. Fails with
    /// [`RemoteError::PlanMissing`] when the user has no plan for that date
    /// yet.
    async fn create_association(
        &self,
        user_id: &str,
        slot: SlotKey,
        recipe_id: &str,
    ) -> Result<String, RemoteError>;

    async fn delete_association(&self, association_id: &str) -> Result<(), RemoteError>;

    /// Creates the per-date plan container. Must be idempotent.
    async fn create_plan(&self, user_id: &str, date: Date) -> Result<(), RemoteError>;
}

#[async_trait]
impl<R: MealPlanRemote + ?Sized> MealPlanRemote for Arc<R> {
    async fn list_entries(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        (**self).list_entries(user_id, range).await
    }

    async fn create_association(
        &self,
        user_id: &str,
        slot: SlotKey,
        recipe_id: &str,
    ) -> Result<String, RemoteError> {
        (**self).create_association(user_id, slot, recipe_id).await
    }

    async fn delete_association(&self, association_id: &str) -> Result<(), RemoteError> {
        (**self).delete_association(association_id).await
    }

    async fn create_plan(&self, user_id: &str, date: Date) -> Result<(), RemoteError> {
        (**self).create_plan(user_id, date).await
    }
}

/// Creates the missing plan container on demand, then retries the
/// association once.
pub struct LazyPlanRemote<R> {
    inner: R,
}

impl<R: MealPlanRemote> LazyPlanRemote<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: MealPlanRemote> MealPlanRemote for LazyPlanRemote<R> {
    async fn list_entries(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.inner.list_entries(user_id, range).await
    }

    async fn create_association(
        &self,
        user_id: &str,
        slot: SlotKey,
        recipe_id: &str,
    ) -> Result<String, RemoteError> {
        match self.inner.create_association(user_id, slot, recipe_id).await {
            Err(RemoteError::PlanMissing { date }) => {
                tracing::debug!(user_id, %date, "creating meal plan container");
                self.inner.create_plan(user_id, date).await?;
                self.inner.create_association(user_id, slot, recipe_id).await
            }
            res => res,
        }
    }

    async fn delete_association(&self, association_id: &str) -> Result<(), RemoteError> {
        self.inner.delete_association(association_id).await
    }

    async fn create_plan(&self, user_id: &str, date: Date) -> Result<(), RemoteError> {
        self.inner.create_plan(user_id, date).await
    }
}
