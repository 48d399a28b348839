use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Record of the content hash each note had when it was last normalized.
///
/// Lets a run skip notes that have not changed since. Normalization is
/// idempotent, so the ledger only saves work and never changes results.
pub struct Ledger {
    db: Connection,
}

impl Ledger {
    /// Opens (creating if needed) the ledger database at `db_path`, runs
    /// migrations and verifies the schema.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db = Connection::open(db_path)?;

        run_migrations(&db)?;
        verify_schema(&db)?;

        Ok(Self { db })
    }

    /// True unless `content` hashes to what was recorded for `file_name`.
    pub fn is_changed(&self, file_name: &str, content: &str) -> Result<bool> {
        let processed: Option<String> = self
            .db
            .query_row(
                "SELECT content_hash FROM processed WHERE file_name = ?1",
                params![file_name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(processed.as_deref() != Some(compute_hash(content).as_str()))
    }

    pub fn mark_processed(&self, file_name: &str, content: &str) -> Result<()> {
        self.db.execute(
            "INSERT INTO processed (file_name, content_hash) VALUES (?1, ?2)
             ON CONFLICT(file_name) DO UPDATE SET content_hash = excluded.content_hash",
            params![file_name, compute_hash(content)],
        )?;
        Ok(())
    }

    /// Deletes entries for notes that are not in `existing`, returning their
    /// file names.
    pub fn prune_missing(&self, existing: &[String]) -> Result<Vec<String>> {
        let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();

        let recorded: Vec<String> = self
            .db
            .prepare("SELECT file_name FROM processed ORDER BY file_name")?
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut pruned = Vec::new();
        for file_name in recorded {
            if !existing.contains(file_name.as_str()) {
                self.db.execute(
                    "DELETE FROM processed WHERE file_name = ?1",
                    params![file_name],
                )?;
                pruned.push(file_name);
            }
        }

        Ok(pruned)
    }
}

pub(crate) fn compute_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

fn get_schema_version(conn: &Connection) -> SqlResult<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

fn run_migrations(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version < 1 {
        conn.execute_batch(
            "CREATE TABLE processed (
                file_name TEXT PRIMARY KEY NOT NULL,
                content_hash TEXT NOT NULL
            );",
        )?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}

fn verify_schema(conn: &Connection) -> Result<()> {
    let processed_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='processed'",
        [],
        |row| Ok(row.get::<_, i32>(0)? > 0),
    )?;

    if !processed_exists {
        return Err(Error::DatabaseCorrupted);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_new_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(".opal.db");
        let ledger = Ledger::open(&db_path).unwrap();

        assert!(db_path.exists());
        assert_eq!(get_schema_version(&ledger.db).unwrap(), 1);
    }

    #[test]
    fn test_reopen_existing_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(".opal.db");

        let ledger = Ledger::open(&db_path).unwrap();
        ledger.mark_processed("a.md", "content").unwrap();
        drop(ledger);

        let ledger = Ledger::open(&db_path).unwrap();
        assert!(!ledger.is_changed("a.md", "content").unwrap());
    }

    #[test]
    fn test_corrupted_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(".opal.db");
        std::fs::write(&db_path, b"corrupted data").unwrap();

        assert!(Ledger::open(&db_path).is_err());
    }

    #[test]
    fn test_ledger_with_missing_table() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(".opal.db");

        let conn = Connection::open(&db_path).unwrap();
        conn.execute("CREATE TABLE wrong_table (id INTEGER)", [])
            .unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();
        drop(conn);

        let result = Ledger::open(&db_path);
        if let Err(Error::DatabaseCorrupted) = result {
            // Expected error type
        } else {
            panic!("Expected DatabaseCorrupted error");
        }
    }

    #[test]
    fn test_is_changed_tracks_content() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::open(temp_dir.path().join(".opal.db")).unwrap();

        assert!(ledger.is_changed("a.md", "one").unwrap());

        ledger.mark_processed("a.md", "one").unwrap();
        assert!(!ledger.is_changed("a.md", "one").unwrap());
        assert!(ledger.is_changed("a.md", "two").unwrap());

        ledger.mark_processed("a.md", "two").unwrap();
        assert!(!ledger.is_changed("a.md", "two").unwrap());
    }

    #[test]
    fn test_prune_missing() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::open(temp_dir.path().join(".opal.db")).unwrap();

        ledger.mark_processed("keep.md", "k").unwrap();
        ledger.mark_processed("gone.md", "g").unwrap();

        let pruned = ledger.prune_missing(&["keep.md".to_string()]).unwrap();
        assert_eq!(pruned, vec!["gone.md"]);
        assert!(ledger.is_changed("gone.md", "g").unwrap());
        assert!(!ledger.is_changed("keep.md", "k").unwrap());
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(
            compute_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
