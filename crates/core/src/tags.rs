use std::sync::LazyLock;

use regex::Regex;

const TAG_PREFIX: &str = "tags: ";

static TAG_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^tags: #.+").unwrap());

/// Yields tags declared with the legacy inline `tags: #a, #b` convention.
///
/// Every matching line contributes all of its tags. Each tag is trimmed and
/// loses its leading `#`.
pub fn extract_tags(content: &str) -> impl Iterator<Item = &str> {
    content
        .split('\n')
        .filter(|line| TAG_LINE_RE.is_match(line))
        .flat_map(|line| {
            line.strip_prefix(TAG_PREFIX)
                .unwrap_or(line)
                .split(", ")
                .map(str::trim)
                .map(|tag| tag.strip_prefix('#').unwrap_or(tag))
                .filter(|tag| !tag.is_empty())
        })
}
