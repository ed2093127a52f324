//! roomlock CLI — the presentation collaborator around `roomlock-core`.
//!
//! Fetches the catalog once at startup, walks the four selection steps
//! with interactive prompts, confirms, and waits for the feedback
//! animation to finish. All invariants live in the library crates;
//! this binary only renders state and forwards intents.

mod cli;

use std::sync::Arc;

use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};
use miette::{IntoDiagnostic, Result, miette};
use tokio::sync::mpsc;
use tracing::info;

use roomlock_api::CatalogClient;
use roomlock_core::{CatalogStore, SelectionEngine, SelectionState, refresh_catalog};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.log_filter())
        .with_writer(std::io::stderr)
        .init();

    let transport = args.transport().into_diagnostic()?;
    let client = CatalogClient::new(args.backend.clone(), &transport).into_diagnostic()?;

    let store = Arc::new(CatalogStore::new());
    refresh_catalog(&client, &store).await.into_diagnostic()?;

    let (unlock_tx, mut unlock_rx) = mpsc::channel(4);
    let engine = SelectionEngine::new(Arc::clone(&store), unlock_tx);

    // Unlock submission collaborator. What "unlocking" does downstream
    // of an accepted request is not this client's business; the token
    // is just handed over and logged.
    tokio::spawn(async move {
        while let Some(token) = unlock_rx.recv().await {
            info!(
                building = %token.building,
                level = token.level,
                device = %token.device_id,
                "unlock request submitted"
            );
        }
    });

    run_selection(&engine).await
}

async fn run_selection(engine: &SelectionEngine) -> Result<()> {
    let theme = ColorfulTheme::default();

    loop {
        let catalog = engine.store().current();
        let state = engine.state();

        match state.step {
            0 => {
                let names: Vec<String> = catalog
                    .buildings
                    .iter()
                    .map(|b| b.building.clone())
                    .collect();
                if names.is_empty() {
                    return Err(miette!("the backend reported no buildings"));
                }
                let idx = Select::with_theme(&theme)
                    .with_prompt("Which building?")
                    .items(&names)
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                engine.set_building(&names[idx]);
                engine.advance().into_diagnostic()?;
            }
            1 => {
                let building = state
                    .building
                    .ok_or_else(|| miette!("no building selected"))?;
                let levels: Vec<i64> = catalog
                    .building(&building)
                    .map(|b| b.levels.iter().map(|l| l.level).collect())
                    .unwrap_or_default();
                if levels.is_empty() {
                    return Err(miette!("building {building} has no levels"));
                }
                let labels: Vec<String> = levels.iter().map(ToString::to_string).collect();
                let idx = Select::with_theme(&theme)
                    .with_prompt("Which level?")
                    .items(&labels)
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                engine.set_level(levels[idx]).into_diagnostic()?;
                engine.advance().into_diagnostic()?;
            }
            2 => {
                let building = state
                    .building
                    .ok_or_else(|| miette!("no building selected"))?;
                let level = state.level.ok_or_else(|| miette!("no level selected"))?;
                let devices = catalog.devices(&building, level);
                if devices.is_empty() {
                    return Err(miette!("no devices on {building} level {level}"));
                }
                let labels: Vec<String> = devices
                    .iter()
                    .map(|d| format!("{} (room {})", d.name, d.room))
                    .collect();
                let idx = Select::with_theme(&theme)
                    .with_prompt("Which device?")
                    .items(&labels)
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                engine.set_device(&devices[idx].id).into_diagnostic()?;
                engine.advance().into_diagnostic()?;
            }
            _ => {
                let building = state.building.as_deref().unwrap_or("?");
                let level = state.level.unwrap_or_default();
                let confirmed = Confirm::with_theme(&theme)
                    .with_prompt(format!("Unlock the device in {building}.{level} now?"))
                    .interact()
                    .into_diagnostic()?;
                if !confirmed {
                    engine.retreat();
                    continue;
                }

                let token = engine.confirm().into_diagnostic()?;
                println!(
                    "Unlock requested for {}.{} ({})",
                    token.building, token.level, token.device_id
                );

                // Cosmetic feedback: the run completes on its own and
                // resets the selection; just wait it out.
                let mut rx = engine.subscribe();
                rx.wait_for(|s| *s == SelectionState::default())
                    .await
                    .into_diagnostic()?;
                println!("Done. The device may take a few minutes to unlock.");
                return Ok(());
            }
        }
    }
}
