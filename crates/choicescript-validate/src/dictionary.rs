//! The persisted user dictionary.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors loading or saving dictionaries.
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// Reading or writing a dictionary file failed.
    #[error("dictionary file {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A word list contained no words.
    #[error("dictionary file {} contains no words", .0.display())]
    Empty(PathBuf),
}

/// Words the user has accepted, persisted one per line.
///
/// An in-memory user dictionary (no path) accepts words but never writes them.
#[derive(Debug, Clone, Default)]
pub struct UserDictionary {
    path: Option<PathBuf>,
    words: BTreeSet<String>,
}

impl UserDictionary {
    /// The default location: `<config dir>/choicescript/user_dictionary.txt`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("choicescript").join("user_dictionary.txt"))
    }

    /// A user dictionary that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the user dictionary at `path`. A missing file is an empty dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DictionaryError> {
        let path = path.into();
        let words = match std::fs::read_to_string(&path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_lowercase)
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(source) => return Err(DictionaryError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), words = words.len(), "loaded user dictionary");
        Ok(Self {
            path: Some(path),
            words,
        })
    }

    /// Where the dictionary is persisted, if anywhere.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a word is present (case-insensitive).
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    /// The words, sorted.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Add a word and persist the dictionary.
    ///
    /// Adding a word that is already present is a no-op and returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written. The word is then
    /// not added, so a later call retries the write.
    pub fn add(&mut self, word: &str) -> Result<bool, DictionaryError> {
        let key = word.to_lowercase();
        if !self.words.insert(key.clone()) {
            return Ok(false);
        }
        if let Err(err) = self.save() {
            self.words.remove(&key);
            return Err(err);
        }
        Ok(true)
    }

    /// Write the words to a temporary file next to the dictionary, then
    /// rename it over the dictionary.
    fn save(&self) -> Result<(), DictionaryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| DictionaryError::Io {
            path: path.clone(),
            source,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(io_err)?;

        let mut text = String::new();
        for word in &self.words {
            text.push_str(word);
            text.push('\n');
        }
        let mut file = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
        file.write_all(text.as_bytes()).map_err(io_err)?;
        file.persist(path).map_err(|err| io_err(err.error))?;
        Ok(())
    }
}
