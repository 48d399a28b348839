use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use clap::Parser;
use opal_core::{Error, Vault, WatcherEvent, setup_watcher};
use tracing::{debug, error, info};

mod cli;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    // A missing .env is fine; flags and the environment still apply
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let vault = Vault::open(cli.vault_config())?;

    run(&vault, &cli)?;

    if cli.watch {
        watch(vault)?;
    }

    Ok(())
}

fn run(vault: &Vault, cli: &Cli) -> anyhow::Result<()> {
    let naming = vault.validate_names()?;
    if naming.is_clean() {
        info!("💎 {} files named correctly", naming.total);
    } else {
        error!(
            "💎 there were {} misnamed files: \n{}",
            naming.misnamed.len(),
            naming.misnamed.join("\n")
        );
    }

    let report = vault.normalize()?;
    for note in &report.frontmatter_updated {
        debug!(note = %note, "frontmatter updated");
    }
    for note in &report.titles_inserted {
        info!(note = %note, "title inserted");
    }

    vault.flag_small_subgraphs()?;

    if cli.check_duplicates {
        match vault.validate_duplicates() {
            Ok(_) => info!("💎 no duplicate notes"),
            Err(Error::DuplicateNotes { groups }) => {
                for group in &groups {
                    error!("identical notes: {}", group.join(", "));
                }
                return Err(Error::DuplicateNotes { groups }.into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    match vault.validate_orphans() {
        Ok(_) => info!("💎 no orphan notes"),
        Err(Error::OrphanNotesPresent { count, notes }) => {
            for note in &notes {
                error!(note = %note, "orphan note");
            }
            return Err(Error::OrphanNotesPresent { count, notes }.into());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn watch(vault: Vault) -> anyhow::Result<()> {
    let root = vault.config().root.clone();
    let vault = Arc::new(Mutex::new(vault));
    let (tx, rx) = mpsc::channel();

    let _watcher = setup_watcher(Arc::clone(&vault), move |event| {
        // Receiver only goes away when main is exiting
        let _ = tx.send(event);
    })?;

    info!("watching {} for changes", root.display());

    for event in rx {
        match event {
            WatcherEvent::NoteNormalized {
                note,
                changed: true,
            } => info!(note = %note, "normalized"),
            WatcherEvent::NoteNormalized {
                note,
                changed: false,
            } => debug!(note = %note, "already normalized"),
            WatcherEvent::NormalizeFailed { note, error: reason } => {
                error!(note = %note, "normalization failed: {}", reason)
            }
        }
    }

    Ok(())
}
