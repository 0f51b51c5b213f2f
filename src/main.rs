use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use mealscan::capture::{CaptureController, SubmitOutcome};
use mealscan::config::AppConfig;
use mealscan::images::{FileImageSource, ImageSourceKind};
use mealscan::inference::AnalysisOutcome;
use mealscan::manual::MacroField;
use mealscan::meals::MealType;
use mealscan::state::AppState;

#[derive(Parser)]
#[command(name = "mealscan", about = "Log meals from a photo or a description")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a photo of a meal and log it
    Photo {
        path: PathBuf,

        /// BREAKFAST, LUNCH, DINNER, SNACK or OTHER (default: from time of day)
        #[arg(long)]
        meal_type: Option<MealType>,

        /// Log without asking for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Log a meal from a text description
    Describe {
        text: String,

        #[arg(long)]
        calories: Option<String>,
        #[arg(long)]
        protein: Option<String>,
        #[arg(long)]
        carbs: Option<String>,
        #[arg(long)]
        fat: Option<String>,

        /// Fill the numbers from an AI estimate before submitting
        #[arg(long)]
        estimate: bool,

        #[arg(long)]
        meal_type: Option<MealType>,

        /// Log estimated numbers without asking for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Show today's logged meals and totals
    Logs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mealscan=debug,reqwest=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    // stdout carries results, logs go to stderr
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let library = match &cli.command {
        Commands::Photo { path, .. } => Some(path.clone()),
        _ => None,
    };
    let app_state = AppState::init(config, Arc::new(FileImageSource::new(library)))?;
    let controller = CaptureController::new(&app_state);

    match cli.command {
        Commands::Photo {
            meal_type, yes, ..
        } => photo(&controller, meal_type, yes).await,
        Commands::Describe {
            text,
            calories,
            protein,
            carbs,
            fat,
            estimate,
            meal_type,
            yes,
        } => {
            let macros = [
                (MacroField::Calories, calories),
                (MacroField::Protein, protein),
                (MacroField::Carbs, carbs),
                (MacroField::Fat, fat),
            ];
            describe(&controller, &text, macros, estimate, meal_type, yes).await
        }
        Commands::Logs => {
            let daily = controller.today().await?;
            print_json(&daily)
        }
    }
}

async fn photo(
    controller: &CaptureController,
    meal_type: Option<MealType>,
    yes: bool,
) -> anyhow::Result<()> {
    controller.acquire_image(ImageSourceKind::Gallery).await?;
    if let Some(meal_type) = meal_type {
        controller.select_meal_type(meal_type).await?;
    }

    let outcome = controller.analyze().await?;
    print_json(&outcome)?;

    match outcome {
        AnalysisOutcome::Analyzed(_) if yes => {
            let submitted = controller.submit().await?;
            print_json(&submitted)
        }
        AnalysisOutcome::Analyzed(_) => {
            eprintln!("not logged; re-run with --yes to save this analysis");
            Ok(())
        }
        AnalysisOutcome::Unclear(unclear) => {
            eprintln!("{}", unclear.suggestion);
            eprintln!("try `mealscan describe \"...\"` to enter it manually");
            Ok(())
        }
    }
}

async fn describe(
    controller: &CaptureController,
    text: &str,
    macros: [(MacroField, Option<String>); 4],
    estimate: bool,
    meal_type: Option<MealType>,
    yes: bool,
) -> anyhow::Result<()> {
    controller.enter_manual_entry().await?;
    if let Some(meal_type) = meal_type {
        controller.select_meal_type(meal_type).await?;
    }
    controller.edit_description(text).await?;
    for (field, input) in macros {
        if let Some(input) = input {
            controller
                .edit_macro(field, &input)
                .await
                .with_context(|| format!("invalid --{}", field.label()))?;
        }
    }

    if estimate {
        let draft = controller.estimate_from_text(text).await?;
        print_json(&draft)?;
        if !yes {
            eprintln!("not logged; re-run with --yes to save these numbers");
            return Ok(());
        }
    }

    match controller.submit().await? {
        SubmitOutcome::Saved(saved) => print_json(&saved),
        SubmitOutcome::NeedsConfirmation(draft) => {
            print_json(&draft)?;
            if !yes {
                eprintln!("calories were estimated; re-run with --yes to save");
                return Ok(());
            }
            let submitted = controller.submit().await?;
            print_json(&submitted)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
