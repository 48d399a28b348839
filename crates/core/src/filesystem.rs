use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Flat directory of note files.
#[derive(Debug)]
pub struct VaultFilesystem {
    root_path: PathBuf,
    extension: String,
}

impl VaultFilesystem {
    pub fn new<P: AsRef<Path>>(root_path: P, extension: &str) -> io::Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        if !root_path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Vault directory does not exist: {}", root_path.display()),
            ));
        }
        Ok(Self {
            root_path,
            extension: extension.to_string(),
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn note_path(&self, file_name: &str) -> PathBuf {
        self.root_path.join(file_name)
    }

    pub fn read_note(&self, file_name: &str) -> io::Result<String> {
        fs::read_to_string(self.note_path(file_name))
    }

    pub fn write_note(&self, file_name: &str, content: &str) -> io::Result<()> {
        fs::write(self.note_path(file_name), content)
    }

    /// File names of the notes directly inside the vault, sorted.
    ///
    /// Subdirectories are not descended into.
    pub fn list_notes(&self) -> io::Result<Vec<String>> {
        let mut notes = Vec::new();

        for entry in fs::read_dir(&self.root_path)? {
            let entry = entry?;
            if !entry.metadata()?.is_file() {
                continue;
            }

            let path = entry.path();
            if self.has_note_extension(&path) {
                notes.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        notes.sort();
        Ok(notes)
    }

    /// Maps a filesystem path back to a note file name, if it names a note
    /// directly inside the vault.
    pub fn note_name_for(&self, path: &Path) -> Option<String> {
        if path.parent()? != self.root_path.as_path() || !self.has_note_extension(path) {
            return None;
        }
        path.file_name().map(|name| name.to_string_lossy().to_string())
    }

    fn has_note_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}
