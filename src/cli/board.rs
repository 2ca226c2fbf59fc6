use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use imkitchen_mealplan::{Board, BoardView, InMemoryRemote, LazyPlanRemote, RemoteEntry};
use imkitchen_shared::mealplan::{MealType, SlotKey, format_date, parse_date};
use strum::VariantArray;

/// Hydrates a board from a seed file and prints its visible window.
pub async fn show(
    config: crate::Config,
    user: String,
    date: Option<String>,
    view: Option<BoardView>,
    seed: Option<PathBuf>,
) -> Result<()> {
    let anchor = match date {
        Some(date) => parse_date(&date)?,
        None => imkitchen_mealplan::today(&config.board.timezone),
    };
    let view = view.unwrap_or(config.board.view);

    let mut remote = InMemoryRemote::new();
    if let Some(seed) = seed {
        let rows: Vec<RemoteEntry> = serde_json::from_str(&std::fs::read_to_string(&seed)?)?;
        tracing::debug!(seed = %seed.display(), rows = rows.len(), "seeding board");
        remote = remote.with_entries(user.to_owned(), rows);
    }

    let mut board = Board::new(
        user,
        Arc::new(LazyPlanRemote::new(remote)),
        config.drag,
        anchor,
    );
    let loaded = board.show(view, anchor).await?;
    tracing::info!(user = board.user_id(), ?loaded, %view, "board loaded");

    let visible = board.visible();
    println!(
        "{} {}..{}",
        board.user_id(),
        format_date(visible.start),
        format_date(visible.end)
    );

    for day in visible.days() {
        println!("{} ({})", format_date(day), day.weekday());

        for meal_type in MealType::VARIANTS {
            let slot = SlotKey::new(day, *meal_type);
            let assigned = board
                .store()
                .get(&slot)
                .map(|entry| format!("{} [{}]", entry.display_name, entry.recipe_id))
                .unwrap_or_else(|| "-".to_string());

            println!("  {:<10} {assigned}", meal_type.as_ref());
        }
    }

    Ok(())
}

pub fn slot_key(date: String, meal_type: MealType) -> Result<()> {
    println!(
        "{}",
        imkitchen_shared::mealplan::slot_key(parse_date(&date)?, meal_type)
    );

    Ok(())
}
