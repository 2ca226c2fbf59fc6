#![allow(dead_code)]

use std::sync::Arc;

use imkitchen_mealplan::{InMemoryRemote, MealPlanRemote, MealPlanStore, RemoteEntry};
use imkitchen_shared::mealplan::{MealType, RecipeSummary};
use time::Date;

pub const USER: &str = "john";

pub struct TestState {
    pub remote: Arc<InMemoryRemote>,
    pub store: MealPlanStore,
}

pub fn setup_test_state(remote: InMemoryRemote) -> TestState {
    let remote = Arc::new(remote);
    let store = MealPlanStore::new(USER, remote.clone() as Arc<dyn MealPlanRemote>);

    TestState { remote, store }
}

pub fn recipe(id: &str, title: &str) -> RecipeSummary {
    RecipeSummary::new(id, title)
}

pub fn row(date: Date, meal_type: MealType, recipe_id: &str, association_id: &str) -> RemoteEntry {
    RemoteEntry {
        date,
        meal_type,
        recipe_id: recipe_id.to_owned(),
        recipe_display_name: format!("recipe {recipe_id}"),
        recipe_image_url: None,
        association_id: association_id.to_owned(),
    }
}

/// Lets spawned background work run to completion.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
