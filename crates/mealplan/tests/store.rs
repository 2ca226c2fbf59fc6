use std::future::IntoFuture;

use imkitchen_mealplan::{AssignOutcome, InMemoryRemote, MealPlanError, RemoteCall, RemoteError};
use imkitchen_shared::mealplan::{DateRange, MealPlanEntry, MealType, SlotKey};
use time::macros::date;

use crate::helpers::{USER, recipe, row, settle, setup_test_state};

mod helpers;

#[tokio::test]
async fn test_assign_is_pending_until_confirmed() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state.remote.queue_association_id("a1");
    let slot = SlotKey::new(date!(2024-05-01), MealType::Lunch);

    let pending = state.store.assign(slot, recipe("r1", "Soto"))?;

    let entry = state.store.get(&slot).expect("optimistic entry");
    assert!(entry.is_pending);
    assert_eq!(entry.remote_association_id, None);
    assert!(state.remote.calls().is_empty());

    let outcome = pending.await?;

    let entry = state.store.get(&slot).expect("confirmed entry");
    assert!(!entry.is_pending);
    assert_eq!(entry.remote_association_id.as_deref(), Some("a1"));
    assert_eq!(outcome, AssignOutcome::Confirmed(entry));

    Ok(())
}

#[tokio::test]
async fn test_failed_assign_rolls_back() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state
        .remote
        .fail_next_create(RemoteError::Unavailable("offline".to_owned()));
    let slot = SlotKey::new(date!(2024-05-01), MealType::Dinner);

    let pending = state.store.assign(slot, recipe("r1", "Soto"))?;
    assert!(state.store.get(&slot).is_some());

    let err = pending.await.unwrap_err();

    assert!(matches!(err, MealPlanError::Remote(RemoteError::Unavailable(_))));
    assert_eq!(state.store.get(&slot), None);

    Ok(())
}

#[tokio::test]
async fn test_failed_reassign_removes_the_slot() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    let slot = SlotKey::new(date!(2024-05-01), MealType::Dinner);
    state.store.assign(slot, recipe("r1", "Soto"))?.await?;

    state
        .remote
        .fail_next_create(RemoteError::Rejected("quota".to_owned()));
    let res = state.store.assign(slot, recipe("r2", "Rendang"))?.await;

    assert!(res.is_err());
    assert_eq!(state.store.get(&slot), None);

    Ok(())
}

#[tokio::test]
async fn test_last_assign_wins() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state.remote.queue_association_id("a1");
    state.remote.queue_association_id("a2");
    state.remote.queue_association_id("a3");
    let slot = SlotKey::new(date!(2024-05-01), MealType::Breakfast);

    let first = state.store.assign(slot, recipe("r1", "Soto"))?;
    let second = state.store.assign(slot, recipe("r2", "Rendang"))?;
    let third = state.store.assign(slot, recipe("r3", "Gado-gado"))?;

    assert_eq!(state.store.len(), 1);
    assert_eq!(state.store.get(&slot).map(|e| e.recipe_id), Some("r3".to_owned()));

    assert_eq!(
        first.await?,
        AssignOutcome::Superseded {
            association_id: "a1".to_owned()
        }
    );
    assert!(matches!(second.await?, AssignOutcome::Superseded { .. }));
    assert!(matches!(third.await?, AssignOutcome::Confirmed(_)));

    let entry = state.store.get(&slot).expect("slot entry");
    assert_eq!(entry.recipe_id, "r3");
    assert_eq!(entry.display_name, "Gado-gado");
    assert_eq!(entry.remote_association_id.as_deref(), Some("a3"));

    let rows = state.remote.rows(USER);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].association_id, "a3");
    assert!(state.remote.deleted().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_stale_failure_keeps_newer_assignment() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state
        .remote
        .fail_next_create(RemoteError::Unavailable("timeout".to_owned()));
    let slot = SlotKey::new(date!(2024-05-01), MealType::Lunch);

    let first = state.store.assign(slot, recipe("r1", "Soto"))?;
    let second = state.store.assign(slot, recipe("r2", "Rendang"))?;

    assert!(first.await.is_err());
    assert_eq!(state.store.get(&slot).map(|e| e.recipe_id), Some("r2".to_owned()));

    second.await?;
    assert!(!state.store.get(&slot).expect("slot entry").is_pending);

    Ok(())
}

#[tokio::test]
async fn test_assign_validates_before_remote_call() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    let slot = SlotKey::new(date!(2024-05-01), MealType::Lunch);

    let err = state.store.assign(slot, recipe("", "Nothing")).err().expect("validation error");

    assert!(err.is_validation());
    assert_eq!(state.store.get(&slot), None);
    assert!(state.remote.calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_remove_deletes_association() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state.remote.queue_association_id("a1");
    let slot = SlotKey::new(date!(2024-05-02), MealType::Dinner);
    state.store.assign(slot, recipe("r1", "Soto"))?.await?;

    let removed = state.store.remove(&slot);

    assert_eq!(removed.map(|e| e.recipe_id), Some("r1".to_owned()));
    assert_eq!(state.store.get(&slot), None);

    settle().await;
    assert_eq!(state.remote.deleted(), vec!["a1".to_owned()]);
    assert!(state.remote.rows(USER).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_remove_is_not_rolled_back() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    let slot = SlotKey::new(date!(2024-05-02), MealType::Dinner);
    state.store.assign(slot, recipe("r1", "Soto"))?.await?;
    state
        .remote
        .fail_next_delete(RemoteError::Unavailable("offline".to_owned()));

    state.store.remove(&slot);
    settle().await;

    assert_eq!(state.remote.deleted().len(), 1);
    assert_eq!(state.store.get(&slot), None);
    assert_eq!(state.remote.rows(USER).len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_remove_while_pending_discards_created_association() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state.remote.queue_association_id("a1");
    let slot = SlotKey::new(date!(2024-05-03), MealType::Lunch);

    let pending = state.store.assign(slot, recipe("r1", "Soto"))?;
    state.store.remove(&slot);
    settle().await;
    assert!(state.remote.deleted().is_empty());

    let outcome = pending.await?;
    settle().await;

    assert_eq!(
        outcome,
        AssignOutcome::Discarded {
            association_id: "a1".to_owned()
        }
    );
    assert_eq!(state.store.get(&slot), None);
    assert_eq!(state.remote.deleted(), vec!["a1".to_owned()]);

    Ok(())
}

#[tokio::test]
async fn test_clear_while_pending_keeps_created_association() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state.remote.queue_association_id("a1");
    let slot = SlotKey::new(date!(2024-05-03), MealType::Lunch);

    let pending = state.store.assign(slot, recipe("r1", "Soto"))?;
    state.store.clear();

    let outcome = pending.await?;
    settle().await;

    assert_eq!(
        outcome,
        AssignOutcome::Detached {
            association_id: "a1".to_owned()
        }
    );
    assert_eq!(state.store.get(&slot), None);
    assert!(state.remote.deleted().is_empty());
    assert_eq!(state.remote.rows(USER).len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_remove_then_reassign_discards_only_removed_write() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state.remote.queue_association_id("a1");
    state.remote.queue_association_id("a2");
    let slot = SlotKey::new(date!(2024-05-03), MealType::Dinner);

    let first = state.store.assign(slot, recipe("r1", "Soto"))?;
    state.store.remove(&slot);
    let second = state.store.assign(slot, recipe("r2", "Rendang"))?;

    assert!(matches!(first.await?, AssignOutcome::Discarded { .. }));
    assert!(matches!(second.await?, AssignOutcome::Confirmed(_)));
    settle().await;

    assert_eq!(state.remote.deleted(), vec!["a1".to_owned()]);
    assert_eq!(
        state.store.get(&slot).and_then(|e| e.remote_association_id),
        Some("a2".to_owned())
    );

    Ok(())
}

#[tokio::test]
async fn test_concurrent_assigns_on_different_slots() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    let gate = state.remote.hold_creates();
    let lunch = SlotKey::new(date!(2024-05-01), MealType::Lunch);
    let dinner = SlotKey::new(date!(2024-05-01), MealType::Dinner);

    let lunch_task = tokio::spawn(state.store.assign(lunch, recipe("r1", "Soto"))?.into_future());
    let dinner_task = tokio::spawn(state.store.assign(dinner, recipe("r2", "Rendang"))?.into_future());
    settle().await;

    assert_eq!(state.remote.calls().len(), 2);
    assert!(state.store.get(&lunch).expect("lunch").is_pending);
    assert!(state.store.get(&dinner).expect("dinner").is_pending);

    gate.open();
    dinner_task.await??;
    lunch_task.await??;

    assert!(!state.store.get(&lunch).expect("lunch").is_pending);
    assert!(!state.store.get(&dinner).expect("dinner").is_pending);

    Ok(())
}

#[tokio::test]
async fn test_bulk_load_keeps_pending_entries() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    let gate = state.remote.hold_creates();
    let lunch = SlotKey::new(date!(2024-05-01), MealType::Lunch);
    let dinner = SlotKey::new(date!(2024-05-01), MealType::Dinner);

    let task = tokio::spawn(state.store.assign(lunch, recipe("r1", "Soto"))?.into_future());

    state.store.bulk_load([
        row(date!(2024-05-01), MealType::Lunch, "r9", "old").into_entry(),
        row(date!(2024-05-01), MealType::Dinner, "r2", "a2").into_entry(),
    ]);

    assert_eq!(state.store.get(&lunch).map(|e| e.recipe_id), Some("r1".to_owned()));
    assert_eq!(
        state.store.get(&dinner),
        Some(MealPlanEntry {
            recipe_id: "r2".to_owned(),
            display_name: "recipe r2".to_owned(),
            image_url: None,
            remote_association_id: Some("a2".to_owned()),
            is_pending: false,
        })
    );

    gate.open();
    task.await??;
    assert!(!state.store.get(&lunch).expect("lunch").is_pending);

    Ok(())
}

#[tokio::test]
async fn test_entries_in_range_are_ordered() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    state.store.bulk_load([
        row(date!(2024-05-02), MealType::Breakfast, "r3", "a3").into_entry(),
        row(date!(2024-05-01), MealType::Dinner, "r2", "a2").into_entry(),
        row(date!(2024-05-01), MealType::Breakfast, "r1", "a1").into_entry(),
        row(date!(2024-05-09), MealType::Lunch, "r4", "a4").into_entry(),
    ]);

    let range = DateRange::new(date!(2024-05-01), date!(2024-05-07))?;
    let ids = state
        .store
        .entries_in(&range)
        .into_iter()
        .map(|(_, e)| e.recipe_id)
        .collect::<Vec<_>>();

    assert_eq!(ids, vec!["r1", "r2", "r3"]);

    Ok(())
}

#[tokio::test]
async fn test_create_call_carries_slot() -> anyhow::Result<()> {
    let state = setup_test_state(InMemoryRemote::new());
    let slot = SlotKey::new(date!(2024-05-01), MealType::Lunch);

    state.store.assign(slot, recipe("r1", "Soto"))?.await?;

    assert_eq!(
        state.remote.calls(),
        vec![RemoteCall::Create {
            user_id: USER.to_owned(),
            slot,
            recipe_id: "r1".to_owned(),
        }]
    );

    Ok(())
}
