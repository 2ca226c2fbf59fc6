use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use imkitchen::cli::board;
use imkitchen_mealplan::BoardView;
use imkitchen_shared::mealplan::MealType;

/// imkitchen - Meal planning board
#[derive(Parser)]
#[command(name = "imkitchen")]
#[command(about = "Plan meals on a calendar board", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a board from a seed file and print the visible window
    Board {
        /// User owning the board
        #[arg(long)]
        user: String,

        /// Day the window is anchored on, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// daily or weekly (overrides config file)
        #[arg(long)]
        view: Option<BoardView>,

        /// JSON array of plan entries to serve as the backend
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Print the slot key of a day and meal
    SlotKey {
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// breakfast, lunch or dinner
        #[arg(long)]
        meal: MealType,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = imkitchen::config::Config::load(cli.config.clone())?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    imkitchen::observability::init_observability(
        "imkitchen",
        env!("CARGO_PKG_VERSION"),
        &config.observability.log_level,
    )?;

    match cli.command {
        Commands::Board {
            user,
            date,
            view,
            seed,
        } => board::show(config, user, date, view, seed).await,
        Commands::SlotKey { date, meal } => board::slot_key(date, meal),
    }
}
