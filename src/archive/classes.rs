use bytes::Bytes;
use std::collections::hash_map;
use std::collections::HashMap;

/// One compiled class recovered from the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Archive-internal path, `/`-separated
    pub name: String,
    pub data: Bytes,
}

/// Class name to bytecode mapping produced by the decoding pipeline.
///
/// Names are unique in practice; inserting a duplicate replaces the earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    classes: HashMap<String, Bytes>,
}

impl ClassMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            classes: HashMap::with_capacity(capacity),
        }
    }

    /// Insert an entry, returning the data it replaced, if any.
    pub fn insert(&mut self, entry: ClassEntry) -> Option<Bytes> {
        self.classes.insert(entry.name, entry.data)
    }

    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Total bytecode size across all classes
    pub fn total_bytes(&self) -> usize {
        self.classes.values().map(Bytes::len).sum()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.classes.iter().map(|(name, data)| (name.as_str(), data))
    }

    /// Entries sorted by name, for deterministic output
    pub fn sorted(&self) -> Vec<(&str, &Bytes)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl FromIterator<ClassEntry> for ClassMap {
    fn from_iter<I: IntoIterator<Item = ClassEntry>>(iter: I) -> Self {
        let mut map = ClassMap::new();
        for entry in iter {
            map.insert(entry);
        }
        map
    }
}

impl IntoIterator for ClassMap {
    type Item = ClassEntry;
    type IntoIter = std::iter::Map<hash_map::IntoIter<String, Bytes>, fn((String, Bytes)) -> ClassEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.classes
            .into_iter()
            .map(to_entry as fn((String, Bytes)) -> ClassEntry)
    }
}

fn to_entry((name, data): (String, Bytes)) -> ClassEntry {
    ClassEntry { name, data }
}
