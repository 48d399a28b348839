use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::VaultConfig;
use crate::error::{Error, Result};
use crate::filesystem::VaultFilesystem;
use crate::ledger::{Ledger, compute_hash};
use crate::note::Note;

static NOTE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{12} - ").unwrap());

/// Files whose names do not follow `<12-digit-date> - <title>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingReport {
    pub total: usize,
    pub misnamed: Vec<String>,
}

impl NamingReport {
    pub fn is_clean(&self) -> bool {
        self.misnamed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Notes the passes ran over.
    pub processed: Vec<String>,
    /// Notes left alone because the ledger shows them unchanged.
    pub skipped: Vec<String>,
    pub frontmatter_updated: Vec<String>,
    pub titles_inserted: Vec<String>,
    /// Ledger entries dropped because their note no longer exists.
    pub pruned: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanReport {
    pub orphans: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateReport {
    /// Groups of notes with identical non-empty content.
    pub groups: Vec<Vec<String>>,
}

pub struct Vault {
    fs: VaultFilesystem,
    config: VaultConfig,
    ledger: Option<Ledger>,
}

impl Vault {
    /// Opens the vault at `config.root`. The ledger is only opened (and
    /// created) in incremental mode.
    pub fn open(config: VaultConfig) -> Result<Self> {
        let fs = VaultFilesystem::new(&config.root, &config.extension)?;
        let ledger = if config.incremental {
            Some(Ledger::open(config.ledger_path())?)
        } else {
            None
        };

        Ok(Self { fs, config, ledger })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn filesystem(&self) -> &VaultFilesystem {
        &self.fs
    }

    /// Checks every note file name against the naming convention. Violations
    /// are reported, not raised.
    pub fn validate_names(&self) -> Result<NamingReport> {
        let file_names = self.fs.list_notes()?;
        let misnamed = file_names
            .iter()
            .filter(|name| !NOTE_NAME_RE.is_match(name))
            .cloned()
            .collect();

        Ok(NamingReport {
            total: file_names.len(),
            misnamed,
        })
    }

    /// Every note in the vault. Fails on the first file name that cannot be
    /// parsed.
    pub fn notes(&self) -> Result<Vec<Note>> {
        self.fs
            .list_notes()?
            .iter()
            .map(|file_name| Note::new(file_name))
            .collect()
    }

    /// Runs the frontmatter pass and then the title pass over the vault.
    ///
    /// In incremental mode unchanged notes are skipped and the ledger is
    /// updated afterwards. The first failing note aborts the run.
    pub fn normalize(&self) -> Result<NormalizeReport> {
        let notes = self.notes()?;
        let file_names: Vec<String> = notes.iter().map(|n| n.file_name().to_string()).collect();

        let (pending, skipped) = self.partition_pending(notes)?;
        let frontmatter_updated = self.fix_frontmatter(&pending)?;
        let titles_inserted = self.fix_titles(&pending)?;
        self.mark_processed(&pending)?;

        let pruned = match &self.ledger {
            Some(ledger) => ledger.prune_missing(&file_names)?,
            None => Vec::new(),
        };
        for file_name in &pruned {
            warn!(note = %file_name, "ledger entry for missing note removed");
        }

        info!(
            processed = pending.len(),
            skipped = skipped.len(),
            frontmatter_updated = frontmatter_updated.len(),
            titles_inserted = titles_inserted.len(),
            "normalized vault"
        );

        Ok(NormalizeReport {
            processed: pending.iter().map(|n| n.file_name().to_string()).collect(),
            skipped,
            frontmatter_updated,
            titles_inserted,
            pruned,
        })
    }

    /// Normalizes a single note. Returns whether its file changed.
    pub fn normalize_note(&self, file_name: &str) -> Result<bool> {
        let note = Note::new(file_name)?;

        if let Some(ledger) = &self.ledger {
            let content = self.fs.read_note(file_name)?;
            if !ledger.is_changed(file_name, &content)? {
                return Ok(false);
            }
        }

        let frontmatter_changed = note.fix_frontmatter(&self.fs, self.config.max_frontmatter_end)?;
        let title_changed = note.fix_title(&self.fs)?;
        self.mark_processed(std::slice::from_ref(&note))?;

        Ok(frontmatter_changed || title_changed)
    }

    /// Ensures every note has frontmatter with tags and a title alias.
    /// Returns the notes that were rewritten.
    pub fn fix_frontmatter(&self, notes: &[Note]) -> Result<Vec<String>> {
        let mut updated = Vec::new();
        for note in notes {
            if note.fix_frontmatter(&self.fs, self.config.max_frontmatter_end)? {
                updated.push(note.file_name().to_string());
            }
        }
        Ok(updated)
    }

    /// Adds a heading to notes that lack one. Returns the notes that were
    /// rewritten.
    pub fn fix_titles(&self, notes: &[Note]) -> Result<Vec<String>> {
        let mut updated = Vec::new();
        for note in notes {
            if note.fix_title(&self.fs)? {
                updated.push(note.file_name().to_string());
            }
        }
        Ok(updated)
    }

    /// Placeholder for a check on small disconnected groups of notes. It only
    /// loads every note, so misnamed files fail here like in the other passes.
    pub fn flag_small_subgraphs(&self) -> Result<()> {
        let notes = self.notes()?;
        debug!(notes = notes.len(), "subgraph check has nothing to flag");
        Ok(())
    }

    /// Notes containing no wikilinks.
    pub fn find_orphans(&self) -> Result<OrphanReport> {
        let mut orphans = Vec::new();
        for note in self.notes()? {
            if note.wikilink_count(&self.fs)? == 0 {
                orphans.push(note.file_name().to_string());
            }
        }
        Ok(OrphanReport { orphans })
    }

    /// Like [`Vault::find_orphans`], but any orphan is an error.
    pub fn validate_orphans(&self) -> Result<OrphanReport> {
        let report = self.find_orphans()?;
        if !report.orphans.is_empty() {
            return Err(Error::OrphanNotesPresent {
                count: report.orphans.len(),
                notes: report.orphans,
            });
        }
        Ok(report)
    }

    /// Groups notes whose content is byte-identical. Empty notes are ignored.
    pub fn find_duplicates(&self) -> Result<DuplicateReport> {
        let mut by_hash: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for file_name in self.fs.list_notes()? {
            let content = self.fs.read_note(&file_name)?;
            if content.is_empty() {
                continue;
            }
            by_hash
                .entry(compute_hash(&content))
                .or_default()
                .push(file_name);
        }

        let mut groups: Vec<Vec<String>> = by_hash
            .into_values()
            .filter(|names| names.len() > 1)
            .collect();
        groups.sort();

        Ok(DuplicateReport { groups })
    }

    /// Like [`Vault::find_duplicates`], but any duplicate group is an error.
    pub fn validate_duplicates(&self) -> Result<DuplicateReport> {
        let report = self.find_duplicates()?;
        if !report.groups.is_empty() {
            return Err(Error::DuplicateNotes {
                groups: report.groups,
            });
        }
        Ok(report)
    }

    fn partition_pending(&self, notes: Vec<Note>) -> Result<(Vec<Note>, Vec<String>)> {
        let Some(ledger) = &self.ledger else {
            return Ok((notes, Vec::new()));
        };

        let mut pending = Vec::new();
        let mut skipped = Vec::new();
        for note in notes {
            let content = self.fs.read_note(note.file_name())?;
            if ledger.is_changed(note.file_name(), &content)? {
                pending.push(note);
            } else {
                skipped.push(note.file_name().to_string());
            }
        }

        Ok((pending, skipped))
    }

    fn mark_processed(&self, notes: &[Note]) -> Result<()> {
        let Some(ledger) = &self.ledger else {
            return Ok(());
        };

        for note in notes {
            let content = self.fs.read_note(note.file_name())?;
            ledger.mark_processed(note.file_name(), &content)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault_with(notes: &[(&str, &str)], incremental: bool) -> (TempDir, Vault) {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in notes {
            std::fs::write(temp_dir.path().join(name), content).unwrap();
        }
        let config = VaultConfig::new(temp_dir.path()).with_incremental(incremental);
        let vault = Vault::open(config).unwrap();
        (temp_dir, vault)
    }

    fn read(dir: &TempDir, name: &str) -> String {
        std::fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_validate_names() {
        let (_dir, vault) = vault_with(
            &[
                ("202401010000 - Good.md", ""),
                ("2024 - Short date.md", ""),
                ("Untitled.md", ""),
                ("notes.txt", ""),
            ],
            false,
        );

        let report = vault.validate_names().unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.misnamed, vec!["2024 - Short date.md", "Untitled.md"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_normalize_reaches_fixed_point() {
        let (dir, vault) = vault_with(
            &[
                ("202401010000 - Hello.md", "# Hello\nSome text with [[Link]]."),
                ("202401020000 - My Note.md", "Some text\ntags: #x, #y"),
                (
                    "202401030000 - Busy.md",
                    "---\ncreated: 2024\nsource: web\nstatus: draft\ntags: a\n---\n# Busy\ntags: #b, #c, #d, #e\nbody",
                ),
            ],
            false,
        );

        let report = vault.normalize().unwrap();
        assert_eq!(report.processed.len(), 3);
        assert_eq!(report.frontmatter_updated.len(), 3);
        assert_eq!(report.titles_inserted, vec!["202401020000 - My Note.md"]);

        let hello = read(&dir, "202401010000 - Hello.md");
        let my_note = read(&dir, "202401020000 - My Note.md");
        let busy = read(&dir, "202401030000 - Busy.md");
        assert!(busy.contains("tags: [a, b, c, d, e]\naliases: [busy]\n---\n"));
        assert!(my_note.contains("\n---\n# My Note\n---\nSome text\n"));

        let report = vault.normalize().unwrap();
        assert!(report.frontmatter_updated.is_empty());
        assert!(report.titles_inserted.is_empty());
        assert_eq!(read(&dir, "202401010000 - Hello.md"), hello);
        assert_eq!(read(&dir, "202401020000 - My Note.md"), my_note);
        assert_eq!(read(&dir, "202401030000 - Busy.md"), busy);
    }

    #[test]
    fn test_normalize_fails_on_malformed_name() {
        let (dir, vault) = vault_with(
            &[("202401010000 - Fine.md", "Body"), ("Untitled.md", "Body")],
            false,
        );

        assert!(matches!(vault.normalize(), Err(Error::MalformedName(_))));
        assert_eq!(read(&dir, "202401010000 - Fine.md"), "Body");
    }

    #[test]
    fn test_incremental_skips_unchanged_notes() {
        let (dir, vault) = vault_with(&[("202401010000 - A.md", "Body [[B]]")], true);

        let first = vault.normalize().unwrap();
        assert_eq!(first.processed, vec!["202401010000 - A.md"]);
        assert!(dir.path().join(".opal.db").exists());

        let second = vault.normalize().unwrap();
        assert!(second.processed.is_empty());
        assert_eq!(second.skipped, vec!["202401010000 - A.md"]);

        let edited = format!("{}\nMore text", read(&dir, "202401010000 - A.md"));
        std::fs::write(dir.path().join("202401010000 - A.md"), edited).unwrap();

        let third = vault.normalize().unwrap();
        assert_eq!(third.processed, vec!["202401010000 - A.md"]);
    }

    #[test]
    fn test_incremental_prunes_deleted_notes() {
        let (dir, vault) = vault_with(
            &[("202401010000 - A.md", "A"), ("202401020000 - B.md", "B")],
            true,
        );
        vault.normalize().unwrap();

        std::fs::remove_file(dir.path().join("202401020000 - B.md")).unwrap();
        let report = vault.normalize().unwrap();
        assert_eq!(report.pruned, vec!["202401020000 - B.md"]);
    }

    #[test]
    fn test_normalize_note() {
        let (dir, vault) = vault_with(&[("202401010000 - Solo.md", "Body")], false);

        assert!(vault.normalize_note("202401010000 - Solo.md").unwrap());
        assert!(!vault.normalize_note("202401010000 - Solo.md").unwrap());
        assert_eq!(
            read(&dir, "202401010000 - Solo.md"),
            "---\ntags: []\naliases: [solo]\n---\n# Solo\n---\nBody"
        );
    }

    #[test]
    fn test_validate_orphans() {
        let (_dir, vault) = vault_with(
            &[
                ("202401010000 - Linked.md", "See [[Other]]"),
                ("202401020000 - Lonely.md", "No links"),
            ],
            false,
        );

        match vault.validate_orphans() {
            Err(Error::OrphanNotesPresent { count, notes }) => {
                assert_eq!(count, 1);
                assert_eq!(notes, vec!["202401020000 - Lonely.md"]);
            }
            other => panic!("Expected OrphanNotesPresent, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_orphans_when_all_linked() {
        let (_dir, vault) = vault_with(&[("202401010000 - Linked.md", "See [[Other]]")], false);

        let report = vault.validate_orphans().unwrap();
        assert!(report.orphans.is_empty());
    }

    #[test]
    fn test_find_duplicates() {
        let (_dir, vault) = vault_with(
            &[
                ("202401010000 - A.md", "same"),
                ("202401020000 - B.md", "same"),
                ("202401030000 - C.md", "different"),
                ("202401040000 - D.md", ""),
                ("202401050000 - E.md", ""),
            ],
            false,
        );

        let report = vault.find_duplicates().unwrap();
        assert_eq!(
            report.groups,
            vec![vec!["202401010000 - A.md", "202401020000 - B.md"]]
        );
        assert!(matches!(
            vault.validate_duplicates(),
            Err(Error::DuplicateNotes { .. })
        ));
    }

    #[test]
    fn test_flag_small_subgraphs() {
        let (_dir, vault) = vault_with(&[("202401010000 - A.md", "A")], false);
        assert!(vault.flag_small_subgraphs().is_ok());
    }
}
