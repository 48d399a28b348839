use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::filesystem::VaultFilesystem;
use crate::frontmatter::{
    DerivedMetadata, FrontmatterBlock, FrontmatterError, merge_frontmatter, read_frontmatter,
    render_frontmatter,
};
use crate::identity::NoteIdentity;
use crate::tags::extract_tags;
use crate::title::{find_title, render_title};

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[.+\]\]").unwrap());

/// A note file in a vault, identified by its file name.
///
/// Holds no document state: every operation re-reads the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    file_name: String,
    identity: NoteIdentity,
}

impl Note {
    pub fn new(file_name: &str) -> Result<Self> {
        Ok(Self {
            file_name: file_name.to_string(),
            identity: NoteIdentity::parse(file_name)?,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn identity(&self) -> &NoteIdentity {
        &self.identity
    }

    /// Merges inline tags and the title alias into the note's frontmatter,
    /// creating the block if the note has none.
    ///
    /// Fails with `UnexpectedFrontmatterExtent` when the existing block, or the
    /// block that would be written, closes after `max_end` non-blank lines.
    /// Nothing is written in that case. Returns whether the file changed.
    pub fn fix_frontmatter(&self, fs: &VaultFilesystem, max_end: usize) -> Result<bool> {
        let content = fs.read_note(&self.file_name)?;
        let block = self.read_frontmatter(&content)?;

        let derived = DerivedMetadata {
            tags: extract_tags(&content).map(str::to_string).collect(),
            title: find_title(&content, &self.identity).text,
        };

        self.check_extent(block.as_ref(), max_end)?;

        let close_line = block.as_ref().map(|block| block.close_line);
        let merged = merge_frontmatter(block.map(|block| block.data), &derived);
        let updated = render_frontmatter(&merged, &content, close_line)
            .map_err(|source| self.invalid_frontmatter(source))?;

        // A block written past the bound would fail the next run
        self.check_extent(self.read_frontmatter(&updated)?.as_ref(), max_end)?;

        self.write_if_changed(fs, &content, &updated)
    }

    /// Inserts a heading derived from the file name when the note has none.
    /// Returns whether the file changed.
    pub fn fix_title(&self, fs: &VaultFilesystem) -> Result<bool> {
        let content = fs.read_note(&self.file_name)?;
        let title = find_title(&content, &self.identity);

        if title.has_heading {
            return Ok(false);
        }

        let close_line = self
            .read_frontmatter(&content)?
            .map(|block| block.close_line);
        let updated = render_title(&title.text, &content, close_line);

        self.write_if_changed(fs, &content, &updated)
    }

    /// Number of lines containing a `[[wikilink]]`.
    pub fn wikilink_count(&self, fs: &VaultFilesystem) -> Result<usize> {
        let content = fs.read_note(&self.file_name)?;
        Ok(content
            .split('\n')
            .filter(|line| WIKILINK_RE.is_match(line))
            .count())
    }

    fn read_frontmatter(&self, content: &str) -> Result<Option<FrontmatterBlock>> {
        read_frontmatter(content).map_err(|source| self.invalid_frontmatter(source))
    }

    fn check_extent(&self, block: Option<&FrontmatterBlock>, max_end: usize) -> Result<()> {
        match block {
            Some(block) if block.end > max_end => Err(Error::UnexpectedFrontmatterExtent {
                note: self.file_name.clone(),
                end: block.end,
                limit: max_end,
            }),
            _ => Ok(()),
        }
    }

    fn invalid_frontmatter(&self, source: FrontmatterError) -> Error {
        Error::InvalidFrontmatter {
            note: self.file_name.clone(),
            source,
        }
    }

    fn write_if_changed(&self, fs: &VaultFilesystem, old: &str, new: &str) -> Result<bool> {
        if old == new {
            return Ok(false);
        }

        debug!(note = %self.file_name, "rewriting note");
        fs.write_note(&self.file_name, new)?;
        Ok(true)
    }
}
