//! Per-request lookup tables over the planogram.

use std::collections::HashMap;

use crate::types::{normalize_key, ReferenceEntry};

/// Name and shelf indexes built once per request.
///
/// When two rows share a normalized name, the first row in table order wins,
/// matching a scan-and-take-first lookup.
#[derive(Debug)]
pub struct ReferenceIndex<'a> {
    by_key: HashMap<String, &'a ReferenceEntry>,
    by_shelf: HashMap<&'a str, Vec<&'a ReferenceEntry>>,
}

impl<'a> ReferenceIndex<'a> {
    pub fn new(reference: &'a [ReferenceEntry]) -> Self {
        let mut by_key: HashMap<String, &'a ReferenceEntry> = HashMap::with_capacity(reference.len());
        let mut by_shelf: HashMap<&'a str, Vec<&'a ReferenceEntry>> = HashMap::new();

        for entry in reference {
            by_key.entry(entry.key()).or_insert(entry);
            by_shelf.entry(entry.shelf.as_str()).or_default().push(entry);
        }

        Self { by_key, by_shelf }
    }

    /// Entry whose normalized name equals `key` (already normalized).
    pub fn get(&self, key: &str) -> Option<&'a ReferenceEntry> {
        self.by_key.get(key).copied()
    }

    /// Entry matching a raw detector label or product name.
    pub fn lookup(&self, name: &str) -> Option<&'a ReferenceEntry> {
        self.get(&normalize_key(name))
    }

    /// All entries of a shelf, in table order.
    pub fn shelf(&self, shelf: &str) -> &[&'a ReferenceEntry] {
        self.by_shelf.get(shelf).map_or(&[], Vec::as_slice)
    }
}

/// Lookup restricted to one shelf's entries.
#[derive(Debug)]
pub struct ShelfIndex<'a> {
    by_key: HashMap<String, &'a ReferenceEntry>,
}

impl<'a> ShelfIndex<'a> {
    pub fn new(entries: &[&'a ReferenceEntry]) -> Self {
        let mut by_key = HashMap::with_capacity(entries.len());
        for entry in entries {
            by_key.entry(entry.key()).or_insert(*entry);
        }
        Self { by_key }
    }

    pub fn get(&self, key: &str) -> Option<&'a ReferenceEntry> {
        self.by_key.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }
}
