use std::path::{Path, PathBuf};

pub const DEFAULT_NOTE_EXTENSION: &str = "md";

/// Frontmatter closing further down than this (counted over non-blank lines)
/// is taken as a misparse rather than metadata.
pub const DEFAULT_MAX_FRONTMATTER_END: usize = 7;

/// Ledger database, kept in the vault root.
pub const LEDGER_FILE_NAME: &str = ".opal.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub root: PathBuf,
    pub extension: String,
    pub max_frontmatter_end: usize,
    /// Skip notes whose content is unchanged since they were last normalized.
    pub incremental: bool,
}

impl VaultConfig {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: DEFAULT_NOTE_EXTENSION.to_string(),
            max_frontmatter_end: DEFAULT_MAX_FRONTMATTER_END,
            incremental: false,
        }
    }

    pub fn with_max_frontmatter_end(mut self, max_frontmatter_end: usize) -> Self {
        self.max_frontmatter_end = max_frontmatter_end;
        self
    }

    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE_NAME)
    }
}
