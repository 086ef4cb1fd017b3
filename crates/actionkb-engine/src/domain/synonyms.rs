//! Verb synonym table
//!
//! Maps canonical verbs to the words testers use for them. The table is used
//! to widen mined keyword sets, to canonicalize query words before search, and
//! to generate phrase variants for learned patterns.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::text::search_tokens;

const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("click", &["tap", "press", "select", "hit", "push"]),
    ("navigate", &["go", "goto", "visit", "browse"]),
    ("open", &["launch", "start", "load"]),
    ("close", &["dismiss", "exit", "quit"]),
    ("enter", &["type", "input", "fill"]),
    ("verify", &["check", "assert", "validate", "confirm", "ensure"]),
    ("scroll", &["pan"]),
    ("swipe", &["slide", "fling"]),
    ("wait", &["await", "hold", "sleep"]),
    ("play", &["resume", "watch", "stream"]),
    ("pause", &["halt", "freeze"]),
    ("skip", &["bypass", "jump", "forward"]),
    ("search", &["find", "lookup", "query"]),
    ("login", &["signin", "authenticate", "logon"]),
    ("logout", &["signout", "logoff"]),
];

/// Canonical verb → synonyms mapping with a reverse index
#[derive(Debug, Clone)]
pub struct SynonymTable {
    entries: BTreeMap<String, Vec<String>>,
    canonical_by_word: HashMap<String, String>,
}

impl SynonymTable {
    /// Empty table
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            canonical_by_word: HashMap::new(),
        }
    }

    /// Add or extend a canonical entry
    ///
    /// A word already claimed by another canonical verb keeps its first owner.
    pub fn with_entry<I, S>(mut self, canonical: &str, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical = canonical.trim().to_lowercase();
        self.canonical_by_word
            .entry(canonical.clone())
            .or_insert_with(|| canonical.clone());

        let list = self.entries.entry(canonical.clone()).or_default();
        for synonym in synonyms {
            let synonym = synonym.as_ref().trim().to_lowercase();
            if synonym.is_empty() || synonym == canonical || list.contains(&synonym) {
                continue;
            }
            if self.canonical_by_word.contains_key(&synonym) {
                continue;
            }
            self.canonical_by_word.insert(synonym.clone(), canonical.clone());
            list.push(synonym);
        }
        self
    }

    /// Synonyms of a canonical verb
    pub fn synonyms_of(&self, canonical: &str) -> &[String] {
        self.entries.get(canonical).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Canonical verb for a word, if the word is in the table
    pub fn canonical_of(&self, word: &str) -> Option<&str> {
        self.canonical_by_word.get(word).map(String::as_str)
    }

    /// Canonical verb followed by its synonyms
    fn group(&self, word: &str) -> Option<impl Iterator<Item = &String>> {
        let canonical = self.canonical_by_word.get(word)?;
        Some(std::iter::once(canonical).chain(self.synonyms_of(canonical)))
    }

    /// Keywords plus the synonym group of every keyword found in the table
    pub fn expand_keywords<I, S>(&self, keywords: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut expanded = BTreeSet::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().to_lowercase();
            if let Some(group) = self.group(&keyword) {
                expanded.extend(group.cloned());
            }
            expanded.insert(keyword);
        }
        expanded
    }

    /// Replace every synonym in `text` with its canonical verb
    ///
    /// `"tap play"` → `"click play"`.
    pub fn canonicalize(&self, text: &str) -> String {
        search_tokens(text)
            .into_iter()
            .map(|token| match self.canonical_of(&token) {
                Some(canonical) => canonical.to_string(),
                None => token,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Canonical phrase plus one phrase per verb synonym
    ///
    /// `("tap", "play button")` → `click play button`, `tap play button`,
    /// `press play button`, ...
    pub fn phrase_variants(&self, verb: &str, target: &str) -> BTreeSet<String> {
        let verb = verb.trim().to_lowercase();
        let target = target.trim().to_lowercase();
        let render = |v: &str| format!("{} {}", v, target).trim().to_string();

        let mut phrases = BTreeSet::new();
        match self.group(&verb) {
            Some(group) => phrases.extend(group.map(|v| render(v.as_str()))),
            None => {
                phrases.insert(render(&verb));
            }
        }
        phrases
    }

    /// Number of canonical verbs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        DEFAULT_SYNONYMS
            .iter()
            .fold(Self::empty(), |table, (canonical, synonyms)| {
                table.with_entry(canonical, synonyms.iter())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_synonyms() {
        let table = SynonymTable::default();
        let synonyms = table.synonyms_of("click");
        for word in ["tap", "press", "select", "hit"] {
            assert!(synonyms.iter().any(|s| s == word), "missing {}", word);
        }
        assert_eq!(table.canonical_of("tap"), Some("click"));
        assert_eq!(table.canonical_of("click"), Some("click"));
        assert_eq!(table.canonical_of("button"), None);
    }

    #[test]
    fn test_expand_keywords() {
        let table = SynonymTable::default();
        let expanded = table.expand_keywords(["click", "play", "button"]);

        assert!(expanded.contains("tap"));
        assert!(expanded.contains("press"));
        assert!(expanded.contains("resume"));
        assert!(expanded.contains("button"));
    }

    #[test]
    fn test_expand_from_synonym_pulls_in_canonical() {
        let table = SynonymTable::default();
        let expanded = table.expand_keywords(["tap"]);
        assert!(expanded.contains("click"));
        assert!(expanded.contains("hit"));
    }

    #[test]
    fn test_canonicalize() {
        let table = SynonymTable::default();
        assert_eq!(table.canonicalize("Tap Play"), "click play");
        assert_eq!(table.canonicalize("bypass intro"), "skip intro");
    }

    #[test]
    fn test_phrase_variants() {
        let table = SynonymTable::default();
        let phrases = table.phrase_variants("click", "play button");

        assert!(phrases.contains("click play button"));
        assert!(phrases.contains("tap play button"));
        assert_eq!(phrases.len(), 1 + table.synonyms_of("click").len());

        let unknown = table.phrase_variants("rewind", "video");
        assert_eq!(unknown.into_iter().collect::<Vec<_>>(), vec!["rewind video"]);
    }

    #[test]
    fn test_first_owner_keeps_word() {
        let table = SynonymTable::default().with_entry("activate", ["tap", "enable"]);
        assert_eq!(table.canonical_of("tap"), Some("click"));
        assert_eq!(table.canonical_of("enable"), Some("activate"));
    }
}
