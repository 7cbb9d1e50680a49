//! Insertion-ordered associative container for group-by bucketing.
//!
//! Verbs that group records (`count -g`, `head -g`, the join engine's buckets)
//! need deterministic iteration: groups come out in the order their keys were
//! first seen. [`OrderedGroupMap`] keeps entries in a `Vec` and a side index
//! from key to slot.

use std::collections::HashMap;

/// String-keyed map iterating in first-insertion order.
#[derive(Clone, Debug)]
pub struct OrderedGroupMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedGroupMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedGroupMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Insert or overwrite. An existing key keeps its original position.
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Some(&i) = self.index.get(&key) {
            self.entries[i].1 = value;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
        }
    }

    /// Fetch the payload for `key`, creating it on first sight.
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.index.insert(key.to_string(), i);
                self.entries.push((key.to_string(), make()));
                i
            }
        };
        &mut self.entries[i].1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V> IntoIterator for OrderedGroupMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_in_first_insertion_order() {
        let mut m = OrderedGroupMap::new();
        m.put("pan", 1);
        m.put("eks", 2);
        m.put("wye", 3);
        m.put("pan", 10);
        assert_eq!(m.len(), 3);
        assert_eq!(
            m.iter().map(|(k, v)| (k.to_string(), *v)).collect::<Vec<_>>(),
            vec![("pan".into(), 10), ("eks".into(), 2), ("wye".into(), 3)]
        );
    }

    #[test]
    fn get_or_insert_with_creates_once() {
        let mut m: OrderedGroupMap<Vec<u32>> = OrderedGroupMap::new();
        m.get_or_insert_with("a", Vec::new).push(1);
        m.get_or_insert_with("b", Vec::new).push(2);
        m.get_or_insert_with("a", Vec::new).push(3);
        assert_eq!(m.get("a"), Some(&vec![1, 3]));
        assert!(m.has("b"));
        assert!(!m.has("c"));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
