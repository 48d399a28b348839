use crate::error::{Error, Result};

/// Separator between the date and the display name of a note file.
pub const NAME_SEPARATOR: &str = " - ";

/// Date and display name parsed from a note's file name.
///
/// `202401010000 - My Note.md` has date `202401010000` and name `My Note.md`.
/// Everything after the first separator is kept verbatim, including further
/// separators and the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteIdentity {
    pub date: u64,
    pub name: String,
}

impl NoteIdentity {
    pub fn parse(file_name: &str) -> Result<Self> {
        let (date, name) = file_name
            .split_once(NAME_SEPARATOR)
            .ok_or_else(|| Error::MalformedName(file_name.to_string()))?;

        let date = date
            .parse::<u64>()
            .map_err(|_| Error::MalformedName(file_name.to_string()))?;

        Ok(Self {
            date,
            name: name.to_string(),
        })
    }

    /// Name with a trailing `.md` removed, used when a note has no heading.
    pub fn display_name(&self) -> &str {
        self.name.strip_suffix(".md").unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_name() {
        let identity = NoteIdentity::parse("202401010000 - My Note.md").unwrap();
        assert_eq!(identity.date, 202401010000);
        assert_eq!(identity.name, "My Note.md");
        assert_eq!(identity.display_name(), "My Note");
    }

    #[test]
    fn test_parse_keeps_later_separators() {
        let identity = NoteIdentity::parse("202312312359 - Rust - Ownership.md").unwrap();
        assert_eq!(identity.date, 202312312359);
        assert_eq!(identity.name, "Rust - Ownership.md");
    }

    #[test]
    fn test_parse_without_separator() {
        let result = NoteIdentity::parse("My Note.md");
        match result {
            Err(Error::MalformedName(name)) => assert_eq!(name, "My Note.md"),
            other => panic!("Expected MalformedName, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_non_numeric_date() {
        assert!(matches!(
            NoteIdentity::parse("yesterday - My Note.md"),
            Err(Error::MalformedName(_))
        ));
    }

    #[test]
    fn test_display_name_without_extension() {
        let identity = NoteIdentity::parse("202401010000 - Draft").unwrap();
        assert_eq!(identity.display_name(), "Draft");
    }
}
