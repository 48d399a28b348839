use std::sync::{Arc, Mutex, PoisonError};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

use crate::error::Result;
use crate::vault::Vault;

/// Event type emitted by the vault watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEvent {
    /// A note was normalized after it changed on disk; `changed` is false when
    /// it was already normalized.
    NoteNormalized { note: String, changed: bool },
    /// Normalizing a changed note failed.
    NormalizeFailed { note: String, error: String },
}

/// Watches the vault root and re-normalizes notes as they are created or
/// edited.
///
/// Only files directly inside the vault with the note extension are handled,
/// so the ledger database and subdirectories are ignored. Rewrites made by
/// normalization trigger one more event each, which finds the note already
/// normalized and leaves it alone.
///
/// The returned watcher must be kept alive for as long as watching should
/// continue.
///
/// # Example
///
/// ```no_run
/// use opal_core::{Vault, VaultConfig, setup_watcher};
/// use std::sync::{Arc, Mutex};
///
/// let vault = Vault::open(VaultConfig::new("/path/to/vault"))?;
/// let vault = Arc::new(Mutex::new(vault));
/// let _watcher = setup_watcher(Arc::clone(&vault), |event| println!("{:?}", event))?;
/// // Keep _watcher alive while you want to monitor the vault
/// # Ok::<(), opal_core::Error>(())
/// ```
pub fn setup_watcher<F>(vault: Arc<Mutex<Vault>>, on_event: F) -> Result<RecommendedWatcher>
where
    F: Fn(WatcherEvent) + Send + 'static,
{
    let vault_root = {
        let vault = vault.lock().unwrap_or_else(PoisonError::into_inner);
        vault.filesystem().root_path().to_path_buf()
    };

    let mut watcher = RecommendedWatcher::new(
        move |result: std::result::Result<Event, notify::Error>| match result {
            Ok(event) => {
                if !should_normalize(&event.kind) {
                    return;
                }

                let vault = vault.lock().unwrap_or_else(PoisonError::into_inner);
                for path in &event.paths {
                    // Renamed away or deleted since the event was queued
                    if !path.is_file() {
                        continue;
                    }
                    let Some(note) = vault.filesystem().note_name_for(path) else {
                        continue;
                    };

                    match vault.normalize_note(&note) {
                        Ok(changed) => on_event(WatcherEvent::NoteNormalized { note, changed }),
                        Err(e) => on_event(WatcherEvent::NormalizeFailed {
                            note,
                            error: e.to_string(),
                        }),
                    }
                }
            }
            Err(e) => warn!("Filesystem watcher error: {:?}", e),
        },
        Config::default(),
    )?;

    watcher.watch(&vault_root, RecursiveMode::NonRecursive)?;

    Ok(watcher)
}

fn should_normalize(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}
