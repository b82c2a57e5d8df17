//! Dictionary-backed spell checking of scene prose.
//!
//! Words are checked against three word sets: the main [`Dictionary`] (built
//! in, or loaded from a local word list), the session dictionary kept in
//! memory, and the persisted [`UserDictionary`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use choicescript_parser::{OccurrenceKind, Scene, Span};
use serde::{Deserialize, Serialize};

use crate::dictionary::{DictionaryError, UserDictionary};
use crate::{ErrorCode, ValidationError};

/// Most suggestions returned for one word.
pub const MAX_SUGGESTIONS: usize = 8;

/// Largest edit distance a suggestion may have.
pub const MAX_DISTANCE: usize = 2;

const EN_US_WORDS: &str = include_str!("../data/en_US.txt");
const EN_GB_VARIANTS: &str = include_str!("../data/en_GB.txt");

/// Suffixes stripped when looking up inflected forms.
const SUFFIXES: &[&str] = &["'s", "s", "es", "ies", "ed", "d", "ied", "ing", "ly", "er", "est"];

/// Which built-in dictionary to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DictionaryLanguage {
    /// American English.
    #[default]
    #[serde(rename = "en_US")]
    EnUs,
    /// British English.
    #[serde(rename = "en_GB")]
    EnGb,
}

/// Spell checking settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpellcheckOptions {
    /// Whether prose is spell checked.
    pub enabled: bool,
    /// Built-in dictionary to use.
    pub dictionary: DictionaryLanguage,
    /// A local word list replacing the built-in dictionary.
    pub dictionary_path: Option<PathBuf>,
    /// Where the user dictionary is persisted.
    pub user_dictionary_path: Option<PathBuf>,
}

impl Default for SpellcheckOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            dictionary: DictionaryLanguage::default(),
            dictionary_path: None,
            user_dictionary_path: None,
        }
    }
}

/// A frequency-ordered word list.
///
/// Lookups are case-insensitive. A word's rank is its position in the list,
/// so common words rank first.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    ranks: HashMap<String, usize>,
    words: Vec<String>,
}

impl Dictionary {
    /// The built-in dictionary for a language.
    #[must_use]
    pub fn builtin(language: DictionaryLanguage) -> Self {
        let mut dictionary = Self::from_word_list(EN_US_WORDS);
        if language == DictionaryLanguage::EnGb {
            for line in EN_GB_VARIANTS.lines() {
                if line.starts_with('#') {
                    continue;
                }
                if let Some((american, british)) = line.split_once(char::is_whitespace) {
                    dictionary.replace(american.trim(), british.trim());
                }
            }
        }
        dictionary
    }

    /// Parse a word list, one word per line, most frequent first.
    ///
    /// Hunspell `.dic` files are accepted: a leading word count is skipped and
    /// `/FLAGS` suffixes are stripped.
    #[must_use]
    pub fn from_word_list(text: &str) -> Self {
        let mut dictionary = Self::default();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if i == 0 && line.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let word = line.split('/').next().unwrap_or(line);
            dictionary.insert(word);
        }
        dictionary
    }

    /// Load a word list from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains no words.
    pub fn load(path: &Path) -> Result<Self, DictionaryError> {
        let text = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dictionary = Self::from_word_list(&text);
        if dictionary.is_empty() {
            return Err(DictionaryError::Empty(path.to_path_buf()));
        }
        tracing::debug!(path = %path.display(), words = dictionary.len(), "loaded dictionary");
        Ok(dictionary)
    }

    /// The dictionary selected by the options.
    ///
    /// # Errors
    ///
    /// Returns an error if `dictionary_path` is set and cannot be loaded.
    pub fn for_options(options: &SpellcheckOptions) -> Result<Self, DictionaryError> {
        match &options.dictionary_path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin(options.dictionary)),
        }
    }

    /// Number of words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the dictionary has no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Add a word at the lowest rank. Returns `false` if it was already present.
    pub fn insert(&mut self, word: &str) -> bool {
        let key = normalize(word);
        if key.is_empty() || self.ranks.contains_key(&key) {
            return false;
        }
        self.ranks.insert(key.clone(), self.words.len());
        self.words.push(key);
        true
    }

    /// Replace a word, keeping its rank.
    fn replace(&mut self, old: &str, new: &str) {
        let old = normalize(old);
        let new = normalize(new);
        if self.ranks.contains_key(&new) {
            self.ranks.remove(&old);
            return;
        }
        match self.ranks.remove(&old) {
            Some(rank) => {
                self.words[rank].clone_from(&new);
                self.ranks.insert(new, rank);
            }
            None => {
                self.insert(&new);
            }
        }
    }

    /// Whether the exact word is present (case-insensitive).
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.ranks.contains_key(&normalize(word))
    }

    /// Whether the word or one of its inflection stems is present.
    #[must_use]
    pub fn contains_inflected(&self, word: &str) -> bool {
        let key = normalize(word);
        self.ranks.contains_key(&key)
            || stems(&key).iter().any(|stem| self.ranks.contains_key(stem))
    }

    /// Suggest corrections, closest first, then most frequent first.
    #[must_use]
    pub fn suggest(&self, word: &str, limit: usize) -> Vec<String> {
        let key = normalize(word);
        let key_len = key.chars().count();

        let mut candidates: Vec<(usize, usize, &str)> = self
            .words
            .iter()
            .enumerate()
            // words replaced by a variant keep their slot but lose their rank entry
            .filter(|(rank, candidate)| self.ranks.get(candidate.as_str()) == Some(rank))
            .filter(|(_, candidate)| candidate.chars().count().abs_diff(key_len) <= MAX_DISTANCE)
            .filter_map(|(rank, candidate)| {
                let distance = osa_distance(&key, candidate);
                (distance > 0 && distance <= MAX_DISTANCE)
                    .then_some((distance, rank, candidate.as_str()))
            })
            .collect();
        candidates.sort_unstable();

        candidates
            .into_iter()
            .take(limit)
            .map(|(_, _, candidate)| match_case(word, candidate))
            .collect()
    }
}

/// Optimal string alignment distance: Levenshtein plus adjacent transpositions.
#[must_use]
pub fn osa_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let width = b.len() + 1;
    let mut d = vec![0usize; (a.len() + 1) * width];

    for i in 0..=a.len() {
        d[i * width] = i;
    }
    for j in 0..=b.len() {
        d[j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[(i - 1) * width + j] + 1)
                .min(d[i * width + j - 1] + 1)
                .min(d[(i - 1) * width + j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[(i - 2) * width + j - 2] + 1);
            }
            d[i * width + j] = best;
        }
    }

    d[a.len() * width + b.len()]
}

/// A word found in prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'a> {
    /// Byte offset within the scanned text.
    pub offset: usize,
    /// The word.
    pub text: &'a str,
    /// Whether the word starts a sentence.
    pub sentence_start: bool,
}

/// Split prose into words: runs of letters, digits and apostrophes.
///
/// `sentence_start` says whether the text itself begins a sentence.
#[must_use]
pub fn words(text: &str, sentence_start: bool) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    let mut at_sentence_start = sentence_start;
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
        if is_word_char(c) {
            start.get_or_insert(i);
            continue;
        }

        if let Some(s) = start.take() {
            let raw = &text[s..i];
            let trimmed = raw.trim_start_matches(is_apostrophe);
            let word = trimmed.trim_end_matches(is_apostrophe);
            if !word.is_empty() {
                out.push(Word {
                    offset: s + (raw.len() - trimmed.len()),
                    text: word,
                    sentence_start: at_sentence_start,
                });
            }
            at_sentence_start = false;
        }

        match c {
            '.' | '!' | '?' => at_sentence_start = true,
            '"' | '“' | '”' | '‘' | '(' | ')' | '-' | '—' => {}
            _ if c.is_whitespace() => {}
            _ => at_sentence_start = false,
        }
    }

    out
}

/// Whether a word should be spell checked at all.
#[must_use]
pub fn should_check(word: &Word<'_>) -> bool {
    let mut chars = word.text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if word.text.chars().count() < 2 || word.text.chars().any(|c| c.is_numeric()) {
        return false;
    }
    // ALLCAPS, mixed case and mid-sentence proper nouns
    if chars.any(char::is_uppercase) {
        return false;
    }
    !(first.is_uppercase() && !word.sentence_start)
}

/// Checks prose against the dictionaries and suggests corrections.
#[derive(Debug)]
pub struct SpellChecker {
    dictionary: Dictionary,
    session: HashSet<String>,
    user: UserDictionary,
}

impl SpellChecker {
    /// Create a spell checker.
    #[must_use]
    pub fn new(dictionary: Dictionary, user: UserDictionary) -> Self {
        Self {
            dictionary,
            session: HashSet::new(),
            user,
        }
    }

    /// The main dictionary.
    #[must_use]
    pub const fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Swap the main dictionary, keeping session and user words.
    pub fn set_dictionary(&mut self, dictionary: Dictionary) {
        self.dictionary = dictionary;
    }

    /// The user dictionary.
    #[must_use]
    pub const fn user_dictionary(&self) -> &UserDictionary {
        &self.user
    }

    /// Swap the user dictionary.
    pub fn set_user_dictionary(&mut self, user: UserDictionary) {
        self.user = user;
    }

    /// Whether a word is in any dictionary.
    #[must_use]
    pub fn is_known(&self, word: &str) -> bool {
        let key = normalize(word);
        self.dictionary.contains_inflected(&key)
            || self.session.contains(&key)
            || self.user.contains(&key)
    }

    /// Spell check every text run of a scene.
    #[must_use]
    pub fn check(&self, scene: &Scene) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for occ in scene.occurrences_of(OccurrenceKind::Text) {
            let sentence_start = begins_sentence(scene, occ.span.start);
            for word in words(&occ.name, sentence_start) {
                if should_check(&word) && !self.is_known(word.text) {
                    errors.push(ValidationError::new(
                        ErrorCode::BadSpelling,
                        format!("Unknown word '{}'", word.text),
                        Span::at(occ.span.start + word.offset, word.text.len()),
                    ));
                }
            }
        }

        errors
    }

    /// Suggestions for one word.
    #[must_use]
    pub fn suggest(&self, word: &str) -> Vec<String> {
        self.dictionary.suggest(word, MAX_SUGGESTIONS)
    }

    /// Suggestions for each word, in input order. An empty list means no suggestions.
    #[must_use]
    pub fn suggest_spelling(&self, words: &[&str]) -> Vec<Vec<String>> {
        words.iter().map(|word| self.suggest(word)).collect()
    }

    /// Accept a word until the process exits. Returns `false` if it was already accepted.
    pub fn ignore_for_session(&mut self, word: &str) -> bool {
        self.session.insert(normalize(word))
    }

    /// Add a word to the persisted user dictionary. Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the user dictionary cannot be written.
    pub fn add_to_user_dictionary(&mut self, word: &str) -> Result<bool, DictionaryError> {
        self.user.add(&normalize(word))
    }
}

/// Whether a text run starts a sentence, judged from what precedes it on its line.
fn begins_sentence(scene: &Scene, offset: usize) -> bool {
    let index = &scene.line_index;
    let line_start = index.line_start(index.line_of(offset)).unwrap_or(0);
    let before = scene
        .source()
        .get(line_start..offset)
        .unwrap_or("")
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '“' | '‘' | '#'));
    before.is_empty() || before.ends_with(['.', '!', '?'])
}

fn is_apostrophe(c: char) -> bool {
    matches!(c, '\'' | '’')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_apostrophe(c)
}

/// Lowercase with typographic apostrophes folded to ASCII.
fn normalize(word: &str) -> String {
    word.chars()
        .map(|c| if c == '’' { '\'' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Candidate stems of an inflected word.
fn stems(word: &str) -> Vec<String> {
    let mut out = Vec::new();
    for suffix in SUFFIXES {
        let Some(stem) = word.strip_suffix(suffix) else {
            continue;
        };
        if stem.chars().count() < 2 {
            continue;
        }
        out.push(stem.to_string());
        match *suffix {
            "ies" | "ied" => out.push(format!("{stem}y")),
            "ing" | "ed" | "er" | "est" => {
                out.push(format!("{stem}e"));
                // running -> run
                let mut chars = stem.chars().rev();
                if let (Some(last), Some(prev)) = (chars.next(), chars.next()) {
                    if last == prev {
                        out.push(stem[..stem.len() - last.len_utf8()].to_string());
                    }
                }
            }
            "ly" => out.push(format!("{stem}le")),
            _ => {}
        }
    }
    out
}

/// Give a suggestion the capitalization of the misspelled word.
fn match_case(original: &str, suggestion: &str) -> String {
    let mut original_chars = original.chars();
    let first_upper = original_chars.next().is_some_and(char::is_uppercase);
    if !first_upper {
        return suggestion.to_string();
    }
    let all_upper = original.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase);
    if all_upper && original.chars().count() > 1 {
        return suggestion.to_uppercase();
    }
    let mut chars = suggestion.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> SpellChecker {
        SpellChecker::new(
            Dictionary::builtin(DictionaryLanguage::EnUs),
            UserDictionary::in_memory(),
        )
    }

    #[test]
    fn test_osa_distance() {
        assert_eq!(osa_distance("teh", "the"), 1);
        assert_eq!(osa_distance("kitten", "sitting"), 3);
        assert_eq!(osa_distance("", "abc"), 3);
        assert_eq!(osa_distance("same", "same"), 0);
    }

    #[test]
    fn test_suggest_teh() {
        let suggestions = checker().suggest("teh");
        assert_eq!(suggestions.first().map(String::as_str), Some("the"));
        assert!(suggestions.len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn test_suggest_matches_case() {
        let suggestions = checker().suggest("Teh");
        assert_eq!(suggestions.first().map(String::as_str), Some("The"));
    }

    #[test]
    fn test_suggest_nothing_close() {
        assert!(checker().suggest("zzzzqqqqxxxx").is_empty());
    }

    #[test]
    fn test_words_and_sentence_starts() {
        let found = words("The dragon's lair. Alex ran, Bob hid.", true);
        let texts: Vec<_> = found.iter().map(|w| (w.text, w.sentence_start)).collect();
        assert_eq!(
            texts,
            vec![
                ("The", true),
                ("dragon's", false),
                ("lair", false),
                ("Alex", true),
                ("ran", false),
                ("Bob", false),
                ("hid", false),
            ]
        );
        assert_eq!(found[1].offset, 4);
    }

    #[test]
    fn test_should_check() {
        let word = |text, sentence_start| Word {
            offset: 0,
            text,
            sentence_start,
        };
        assert!(should_check(&word("teh", false)));
        assert!(should_check(&word("Teh", true)));
        assert!(!should_check(&word("Bob", false)));
        assert!(!should_check(&word("NASA", true)));
        assert!(!should_check(&word("a", true)));
        assert!(!should_check(&word("4th", false)));
        assert!(!should_check(&word("iPhone", false)));
    }

    #[test]
    fn test_inflections_are_known() {
        let checker = checker();
        assert!(checker.is_known("walked"));
        assert!(checker.is_known("running"));
        assert!(checker.is_known("stories"));
        assert!(checker.is_known("dragon's"));
        assert!(!checker.is_known("teh"));
    }

    #[test]
    fn test_session_dictionary_is_idempotent() {
        let mut checker = checker();
        assert!(!checker.is_known("grimdark"));
        assert!(checker.ignore_for_session("Grimdark"));
        assert!(!checker.ignore_for_session("grimdark"));
        assert!(checker.is_known("GRIMDARK"));
    }

    #[test]
    fn test_british_variants() {
        let gb = Dictionary::builtin(DictionaryLanguage::EnGb);
        assert!(gb.contains("colour"));
        assert!(!gb.contains("color"));
        let us = Dictionary::builtin(DictionaryLanguage::EnUs);
        assert!(us.contains("color"));
    }

    #[test]
    fn test_hunspell_word_list() {
        let dictionary = Dictionary::from_word_list("3\nhello/MS\nworld\n# comment\nhello\n");
        assert_eq!(dictionary.len(), 2);
        assert!(dictionary.contains("HELLO"));
    }

    #[test]
    fn test_options_deserialize() {
        let options: SpellcheckOptions =
            serde_json::from_str(r#"{"dictionary": "en_GB", "enabled": false}"#).unwrap();
        assert!(!options.enabled);
        assert_eq!(options.dictionary, DictionaryLanguage::EnGb);
        assert_eq!(options.dictionary_path, None);
    }
}
