//! Reading, merging and writing the YAML frontmatter block of a note.
//!
//! A block is recognised by a line-based scan rather than a markdown parser:
//! the first non-blank line must be a `---` marker, and the block ends at the
//! next `---` marker. Without a closing marker the opening line was only a
//! divider and the note has no frontmatter.

use std::collections::BTreeSet;
use std::iter;

use serde_yaml::{Mapping, Value};

const MARKER: &str = "---";
const TAGS_KEY: &str = "tags";
const ALIASES_KEY: &str = "aliases";
const FLOW_INDICATORS: [char; 5] = [',', '[', ']', '{', '}'];

#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("frontmatter is not a key-value mapping")]
    NotAMapping,
    #[error("`{0}` must be a string or a list of strings")]
    UnsupportedValue(&'static str),
}

/// Parsed frontmatter: the two managed sets plus every other key, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    pub tags: BTreeSet<String>,
    pub aliases: BTreeSet<String>,
    pub extra: Mapping,
}

/// A frontmatter block located in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterBlock {
    pub data: Frontmatter,
    /// Index of the closing marker among the document's non-blank lines.
    pub end: usize,
    /// Index of the closing marker among all `\n`-separated lines. Writers
    /// splice here.
    pub close_line: usize,
}

/// Data derived from a note body that gets merged into its frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedMetadata {
    pub tags: Vec<String>,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingOpen,
    InsideBlock,
}

impl Frontmatter {
    fn from_mapping(mapping: Mapping) -> Result<Self, FrontmatterError> {
        let mut tags = None;
        let mut aliases = None;
        let mut extra = Mapping::new();

        for (key, value) in mapping {
            match key.as_str() {
                Some(TAGS_KEY) => tags = Some(value),
                Some(ALIASES_KEY) => aliases = Some(value),
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        Ok(Self {
            tags: string_set(tags, TAGS_KEY)?,
            aliases: string_set(aliases, ALIASES_KEY)?,
            extra,
        })
    }

    /// Passthrough keys in their original order as block YAML, then `tags`
    /// and `aliases` as one flow sequence line each.
    fn render_lines(&self) -> Result<Vec<String>, FrontmatterError> {
        let mut lines = Vec::new();

        if !self.extra.is_empty() {
            let yaml = serde_yaml::to_string(&self.extra)?;
            lines.extend(
                yaml.split('\n')
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_string),
            );
        }

        lines.push(flow_sequence(TAGS_KEY, &self.tags)?);
        lines.push(flow_sequence(ALIASES_KEY, &self.aliases)?);
        Ok(lines)
    }
}

/// Locates and parses the frontmatter block at the top of `content`.
///
/// Blank lines are skipped both when looking for the opening marker and
/// inside the block. Returns `Ok(None)` when the document has no block.
pub fn read_frontmatter(content: &str) -> Result<Option<FrontmatterBlock>, FrontmatterError> {
    let mut state = ScanState::SeekingOpen;
    let mut block_lines: Vec<&str> = Vec::new();

    let non_blank = content
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .enumerate();

    for (end, (close_line, line)) in non_blank {
        match state {
            ScanState::SeekingOpen => {
                if !is_marker(line) {
                    return Ok(None);
                }
                state = ScanState::InsideBlock;
            }
            ScanState::InsideBlock => {
                if is_marker(line) {
                    let data = parse_block(&block_lines.join("\n"))?;
                    return Ok(Some(FrontmatterBlock {
                        data,
                        end,
                        close_line,
                    }));
                }
                block_lines.push(line);
            }
        }
    }

    Ok(None)
}

/// Unions derived tags and the title alias into existing frontmatter.
///
/// Aliases are lowercased so re-running with the same title is a no-op.
pub fn merge_frontmatter(existing: Option<Frontmatter>, derived: &DerivedMetadata) -> Frontmatter {
    let mut merged = existing.unwrap_or_default();

    merged.tags.extend(
        derived
            .tags
            .iter()
            .filter(|tag| !tag.is_empty())
            .cloned(),
    );

    let existing_aliases = std::mem::take(&mut merged.aliases);
    merged.aliases = iter::once(derived.title.as_str())
        .chain(existing_aliases.iter().map(String::as_str))
        .filter(|alias| !alias.is_empty())
        .map(str::to_lowercase)
        .collect();

    merged
}

/// Renders `frontmatter` as a block and splices it into `content`.
///
/// The managed sets always take one line each, so a rewrite grows the block
/// by at most two lines over its passthrough keys.
///
/// With `close_line` the existing block (lines `0..=close_line`) is replaced;
/// otherwise the block is prepended. Everything after it is kept verbatim.
pub fn render_frontmatter(
    frontmatter: &Frontmatter,
    content: &str,
    close_line: Option<usize>,
) -> Result<String, FrontmatterError> {
    let block = frontmatter.render_lines()?;
    let lines: Vec<&str> = content.split('\n').collect();

    let body = match close_line {
        Some(end) => &lines[(end + 1).min(lines.len())..],
        None => &lines[..],
    };

    let new_lines: Vec<&str> = iter::once(MARKER)
        .chain(block.iter().map(String::as_str))
        .chain(iter::once(MARKER))
        .chain(body.iter().copied())
        .collect();

    Ok(new_lines.join("\n"))
}

fn is_marker(line: &str) -> bool {
    line.trim_end() == MARKER
}

fn parse_block(text: &str) -> Result<Frontmatter, FrontmatterError> {
    if text.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    match serde_yaml::from_str::<Value>(text)? {
        Value::Mapping(mapping) => Frontmatter::from_mapping(mapping),
        Value::Null => Ok(Frontmatter::default()),
        _ => Err(FrontmatterError::NotAMapping),
    }
}

fn string_set(value: Option<Value>, key: &'static str) -> Result<BTreeSet<String>, FrontmatterError> {
    match value {
        None => Ok(BTreeSet::new()),
        Some(Value::Sequence(items)) => {
            let mut set = BTreeSet::new();
            for item in items {
                if let Some(text) = scalar_string(item, key)? {
                    set.insert(text);
                }
            }
            Ok(set)
        }
        Some(scalar) => Ok(scalar_string(scalar, key)?.into_iter().collect()),
    }
}

fn scalar_string(value: Value, key: &'static str) -> Result<Option<String>, FrontmatterError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        _ => Err(FrontmatterError::UnsupportedValue(key)),
    }
}

fn flow_sequence(key: &str, values: &BTreeSet<String>) -> Result<String, FrontmatterError> {
    let items = values
        .iter()
        .map(|value| flow_scalar(value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("{key}: [{}]", items.join(", ")))
}

/// Renders `text` as a scalar that is valid inside a flow sequence.
///
/// serde_yaml picks the style, which quotes anything that would read back as
/// a number, bool or null. Plain scalars may carry flow indicators in block
/// context, and multi-line strings come back as block literals, so both are
/// re-quoted here.
fn flow_scalar(text: &str) -> Result<String, FrontmatterError> {
    let rendered = serde_yaml::to_string(text)?;
    let rendered = rendered.trim_end_matches('\n');

    if rendered.contains('\n') {
        return Ok(double_quoted(text));
    }

    let plain = !rendered.starts_with(['\'', '"']);
    if plain && rendered.contains(FLOW_INDICATORS) {
        return Ok(format!("'{}'", text.replace('\'', "''")));
    }

    Ok(rendered.to_string())
}

fn double_quoted(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
