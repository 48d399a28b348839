use crate::identity::NoteIdentity;

const HEADING_PREFIX: &str = "# ";
const DIVIDER: &str = "---";

/// A note's display title and whether it came from a heading in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub text: String,
    pub has_heading: bool,
}

/// Finds the first `# ` heading, falling back to the file's display name.
pub fn find_title(content: &str, identity: &NoteIdentity) -> Title {
    let heading = content
        .split('\n')
        .find_map(|line| line.strip_prefix(HEADING_PREFIX));

    match heading {
        Some(text) => Title {
            text: text.trim_end().to_string(),
            has_heading: true,
        },
        None => Title {
            text: identity.display_name().to_string(),
            has_heading: false,
        },
    }
}

/// Inserts a `# title` heading followed by a divider.
///
/// With `close_line` (the raw line index of the frontmatter's closing marker)
/// the heading goes directly after the frontmatter; otherwise it is prepended.
/// `Some(0)` counts as present.
pub fn render_title(title: &str, content: &str, close_line: Option<usize>) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let heading = format!("{HEADING_PREFIX}{title}");
    let title_lines = [heading.as_str(), DIVIDER];

    let new_lines: Vec<&str> = match close_line {
        Some(end) => {
            let split = (end + 1).min(lines.len());
            lines[..split]
                .iter()
                .chain(title_lines.iter())
                .chain(lines[split..].iter())
                .copied()
                .collect()
        }
        None => title_lines.iter().chain(lines.iter()).copied().collect(),
    };

    new_lines.join("\n")
}
