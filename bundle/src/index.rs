// SPDX-License-Identifier: MIT
//! Name-to-entry index over a fixed set of entries

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::decode::EntryReader;
use crate::entry::{DecodeMode, Entry};
use crate::error::{BundleError, BundleResult};

/// Immutable lookup structure built once from a bundle's entries.
///
/// Build it at start-up and share it by reference (or `Arc`); it is never
/// mutated afterwards, so concurrent readers need no locking.
#[derive(Debug, Clone, Default)]
pub struct Index {
    entries: HashMap<Cow<'static, str>, Entry>,
}

impl Index {
    /// Build the index. When two entries share a name the later one wins.
    pub fn build(entries: impl IntoIterator<Item = Entry>) -> Self {
        let entries = entries.into_iter();
        let mut map = HashMap::with_capacity(entries.size_hint().0);

        for entry in entries {
            let key = entry.name_cow().clone();
            if let Some(previous) = map.insert(key, entry) {
                warn!(
                    name = previous.name(),
                    "duplicate bundle entry, keeping the later one"
                );
            }
        }

        debug!(entries = map.len(), "bundle index built");
        Self { entries: map }
    }

    /// Build the index over a compiled-in entry table
    pub fn from_static(bundle: &'static [Entry]) -> Self {
        Self::build(bundle.iter().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Entries whose names start with `prefix`, sorted byte-wise by name.
    /// An empty prefix lists everything.
    pub fn directory(&self, prefix: &str) -> Vec<&Entry> {
        let mut dir: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| e.name().starts_with(prefix))
            .collect();
        dir.sort_unstable_by(|a, b| a.name().as_bytes().cmp(b.name().as_bytes()));
        dir
    }

    /// All entries, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Open a streaming reader over the named entry
    pub fn open(&self, name: &str, mode: DecodeMode) -> BundleResult<EntryReader<'_>> {
        self.lookup(name)
            .ok_or_else(|| BundleError::NotFound(name.to_string()))?
            .open(mode)
    }

    /// Decode the named entry into a buffer
    pub fn decode(&self, name: &str, mode: DecodeMode) -> BundleResult<Vec<u8>> {
        self.lookup(name)
            .ok_or_else(|| BundleError::NotFound(name.to_string()))?
            .decode(mode)
    }
}

impl FromIterator<Entry> for Index {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Self::build(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    static FIXTURE: &[Entry] = &[
        Entry::from_static("b/two.txt", 3, false, "\nYmJi\n"),
        Entry::from_static("a.txt", 3, false, "\nYWFh\n"),
        Entry::from_static("b/one.txt", 3, false, "\nb25l\n"),
        Entry::from_static("B.txt", 0, false, "\n"),
    ];

    fn names(dir: &[&Entry]) -> Vec<String> {
        dir.iter().map(|e| e.name().to_string()).collect()
    }

    #[test]
    fn test_lookup_totality() {
        let index = Index::from_static(FIXTURE);
        assert_eq!(index.len(), FIXTURE.len());
        for entry in FIXTURE {
            assert!(index.has(entry.name()));
            assert_eq!(index.lookup(entry.name()), Some(entry));
        }
        assert!(!index.has("missing.txt"));
        assert!(index.lookup("missing.txt").is_none());
    }

    #[test]
    fn test_directory_all_sorted() {
        let index = Index::from_static(FIXTURE);
        let dir = index.directory("");
        assert_eq!(dir.len(), index.len());
        // Byte-wise: uppercase sorts before lowercase
        assert_eq!(names(&dir), ["B.txt", "a.txt", "b/one.txt", "b/two.txt"]);
    }

    #[test]
    fn test_directory_prefix() {
        let index = Index::from_static(FIXTURE);
        assert_eq!(names(&index.directory("b/")), ["b/one.txt", "b/two.txt"]);
        assert!(index.directory("zzz").is_empty());
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let index = Index::build([
            Entry::from_static("dup", 1, false, "YQ=="),
            Entry::from_static("dup", 1, false, "Yg=="),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.decode("dup", DecodeMode::Decompress).unwrap(), b"b");
    }

    #[test]
    fn test_open_not_found() {
        let index = Index::from_static(FIXTURE);
        let err = index.open("nope", DecodeMode::Decompress).unwrap_err();
        assert!(matches!(err, BundleError::NotFound(name) if name == "nope"));
    }

    #[test]
    fn test_open_and_read() {
        let index = Index::from_static(FIXTURE);
        let mut reader = index.open("b/one.txt", DecodeMode::Decompress).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        reader.close().unwrap();
        assert_eq!(out, "one");
    }

    #[test]
    fn test_from_iterator() {
        let index: Index = FIXTURE.iter().cloned().collect();
        assert_eq!(index.len(), 4);
        assert_eq!(index.iter().count(), 4);
    }
}
