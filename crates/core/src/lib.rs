pub mod config;
pub mod error;
pub mod filesystem;
pub mod frontmatter;
pub mod identity;
pub mod ledger;
pub mod note;
pub mod tags;
pub mod title;
pub mod vault;
pub mod watcher;

// Re-export main types for convenience
pub use config::VaultConfig;
pub use error::{Error, Result};
pub use filesystem::VaultFilesystem;
pub use frontmatter::{DerivedMetadata, Frontmatter, FrontmatterBlock, FrontmatterError};
pub use identity::NoteIdentity;
pub use ledger::Ledger;
pub use note::Note;
pub use title::Title;
pub use vault::{DuplicateReport, NamingReport, NormalizeReport, OrphanReport, Vault};
pub use watcher::{WatcherEvent, setup_watcher};
