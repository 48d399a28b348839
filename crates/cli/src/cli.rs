//! Command-line arguments for `opal`.

use std::path::PathBuf;

use clap::Parser;
use opal_core::VaultConfig;
use opal_core::config::DEFAULT_MAX_FRONTMATTER_END;

#[derive(Parser, Debug)]
#[clap(
    name = "opal",
    version = env!("CARGO_PKG_VERSION"),
    about = "Validates note names, normalizes frontmatter and titles, and flags orphan notes in a vault."
)]
pub(crate) struct Cli {
    /// Vault directory containing the notes.
    #[clap(env = "OPAL_VAULT")]
    pub vault: PathBuf,
    /// Reject frontmatter closing past this many non-blank lines.
    #[clap(long, env = "OPAL_MAX_FRONTMATTER_END", default_value_t = DEFAULT_MAX_FRONTMATTER_END)]
    pub max_frontmatter_end: usize,
    /// Skip notes unchanged since the last run (tracked in the vault's .opal.db).
    #[clap(long, env = "OPAL_INCREMENTAL")]
    pub incremental: bool,
    /// Fail when several notes have identical content.
    #[clap(long)]
    pub check_duplicates: bool,
    /// Keep running and normalize notes as they change.
    #[clap(long)]
    pub watch: bool,
}

impl Cli {
    pub fn vault_config(&self) -> VaultConfig {
        VaultConfig::new(&self.vault)
            .with_max_frontmatter_end(self.max_frontmatter_end)
            .with_incremental(self.incremental)
    }
}
