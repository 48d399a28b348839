use crate::frontmatter::FrontmatterError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("ledger database is corrupted")]
    DatabaseCorrupted,
    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),
    #[error("misformatted name {0}")]
    MalformedName(String),
    #[error("frontmatter in {note} closes at line {end}, past the limit of {limit}")]
    UnexpectedFrontmatterExtent {
        note: String,
        end: usize,
        limit: usize,
    },
    #[error("invalid frontmatter in {note}: {source}")]
    InvalidFrontmatter {
        note: String,
        #[source]
        source: FrontmatterError,
    },
    #[error("there were {count} orphans")]
    OrphanNotesPresent { count: usize, notes: Vec<String> },
    #[error("{} groups of notes share identical content", groups.len())]
    DuplicateNotes { groups: Vec<Vec<String>> },
}

pub type Result<T> = std::result::Result<T, Error>;
