//! Records, their side-channel context, and the items that flow between stages.
//!
//! A [`Record`] is an ordered field→value map. Field order is significant and is
//! preserved on output; lookups go through a side index so `get` is O(1) on
//! average while iteration stays in insertion order.
//!
//! Every item on a stage queue is a [`RecordAndContext`]: a record with the
//! [`Context`] it was read under, a free-standing text line, or the single
//! end-of-stream marker that carries the final context.

use crate::value::Value;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Separator used when flattening nested JSON input into dotted field names.
pub const DEFAULT_FLATTEN_SEPARATOR: &str = ".";

/// Delimiter between values inside a grouping/join key.
///
/// A control character keeps `("a,b", "c")` and `("a", "b,c")` distinct.
pub const GROUPING_KEY_SEPARATOR: char = '\u{1f}';

/// One row of the stream: unique keys, insertion-ordered.
#[derive(Clone, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.fields[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.fields[i].1),
            None => None,
        }
    }

    /// Overwrite in place if `key` exists, else append at the end.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(&i) = self.index.get(&key) {
            self.fields[i].1 = value;
        } else {
            self.index.insert(key.clone(), self.fields.len());
            self.fields.push((key, value));
        }
    }

    /// Overwrite in place if `key` exists, else insert as the first field.
    pub fn put_at_front(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(&i) = self.index.get(&key) {
            self.fields[i].1 = value;
            return;
        }
        self.fields.insert(0, (key, value));
        self.reindex_from(0);
    }

    /// Remove a field; remaining fields keep their relative order.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.fields.remove(i);
        self.reindex_from(i);
        Some(value)
    }

    /// Rename a field in place. If `new` already exists elsewhere it is dropped
    /// and the renamed field keeps the old field's position.
    pub fn rename(&mut self, old: &str, new: &str) {
        if old == new || !self.contains_key(old) {
            return;
        }
        if self.contains_key(new) {
            self.remove(new);
        }
        if let Some(i) = self.index.remove(old) {
            self.fields[i].0 = new.to_string();
            self.index.insert(new.to_string(), i);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Values at `names`, in that order; `None` if any is absent.
    #[must_use]
    pub fn selected_values(&self, names: &[String]) -> Option<Vec<&Value>> {
        names.iter().map(|n| self.get(n)).collect()
    }

    /// Rendered values at `names` joined into one grouping key; `None` if any is absent.
    #[must_use]
    pub fn selected_values_joined(&self, names: &[String]) -> Option<String> {
        let mut key = String::new();
        for (i, name) in names.iter().enumerate() {
            let v = self.get(name)?;
            if i > 0 {
                key.push(GROUPING_KEY_SEPARATOR);
            }
            key.push_str(&v.to_string());
        }
        Some(key)
    }

    /// Rendered values at `names`; `None` if any is absent.
    #[must_use]
    pub fn selected_strings(&self, names: &[String]) -> Option<Vec<String>> {
        names
            .iter()
            .map(|n| self.get(n).map(ToString::to_string))
            .collect()
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, (k, _)) in self.fields.iter().enumerate().skip(start) {
            self.index.insert(k.clone(), i);
        }
    }
}

impl PartialEq for Record {
    /// Order-sensitive comparison.
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut rec = Self::new();
        for (k, v) in iter {
            rec.put(k, v);
        }
        rec
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut rec = Record::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
            flatten_into(&mut rec, key, value);
        }
        Ok(rec)
    }
}

/// Nested objects become `a.b`, arrays become `a.1`, `a.2`, ...
fn flatten_into(rec: &mut Record, prefix: String, value: serde_json::Value) {
    match value {
        serde_json::Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten_into(rec, format!("{prefix}{DEFAULT_FLATTEN_SEPARATOR}{k}"), v);
            }
        }
        serde_json::Value::Array(items) if !items.is_empty() => {
            for (i, v) in items.into_iter().enumerate() {
                flatten_into(rec, format!("{prefix}{DEFAULT_FLATTEN_SEPARATOR}{}", i + 1), v);
            }
        }
        other => rec.put(prefix, Value::from(other)),
    }
}

/// Input and output separators in effect for a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separators {
    pub ifs: String,
    pub ips: String,
    pub irs: String,
    pub ofs: String,
    pub ops: String,
    pub ors: String,
    pub flatsep: String,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            ifs: ",".into(),
            ips: "=".into(),
            irs: "\n".into(),
            ofs: ",".into(),
            ops: "=".into(),
            ors: "\n".into(),
            flatsep: DEFAULT_FLATTEN_SEPARATOR.into(),
        }
    }
}

/// Per-record bookkeeping: where the record came from and where it sits in the run.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Context {
    pub filename: String,
    /// 1-based index of the current file; 0 before the first file opens.
    pub filenum: u64,
    /// 1-based record number across all files.
    pub nr: u64,
    /// 1-based record number within the current file.
    pub fnr: u64,
    pub separators: Separators,
}

impl Context {
    #[must_use]
    pub fn new(separators: Separators) -> Self {
        Self {
            separators,
            ..Self::default()
        }
    }

    pub fn update_for_start_of_file(&mut self, filename: &str) {
        self.filename = filename.to_string();
        self.filenum += 1;
        self.fnr = 0;
    }

    pub fn update_for_input_record(&mut self) {
        self.nr += 1;
        self.fnr += 1;
    }
}

/// One item on a stage queue.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordAndContext {
    Record { record: Record, context: Context },
    /// The unique stream terminator, carrying the final context.
    EndOfStream(Context),
}

impl RecordAndContext {
    #[must_use]
    pub const fn new(record: Record, context: Context) -> Self {
        Self::Record { record, context }
    }

    #[must_use]
    pub const fn end_of_stream(context: Context) -> Self {
        Self::EndOfStream(context)
    }

    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream(_))
    }

    #[must_use]
    pub const fn record(&self) -> Option<&Record> {
        match self {
            Self::Record { record, .. } => Some(record),
            Self::EndOfStream(_) => None,
        }
    }

    #[must_use]
    pub const fn context(&self) -> &Context {
        match self {
            Self::Record { context, .. } | Self::EndOfStream(context) => context,
        }
    }

    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Record { record, .. } => Some(record),
            Self::EndOfStream(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Record {
        [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect()
    }

    #[test]
    fn put_overwrites_in_place() {
        let mut r = abc();
        r.put("b", "x");
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(r.get("b"), Some(&Value::from("x")));
    }

    #[test]
    fn put_at_front_prepends_new_keys_only() {
        let mut r = abc();
        r.put_at_front("z", 0i64);
        r.put_at_front("c", 9i64);
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["z", "a", "b", "c"]);
        assert_eq!(r.get("c"), Some(&Value::Int(9)));
        assert_eq!(r.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut r = abc();
        assert_eq!(r.remove("a"), Some(Value::Int(1)));
        assert_eq!(r.get("c"), Some(&Value::Int(3)));
        r.put("d", "4");
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["b", "c", "d"]);
        assert_eq!(r.remove("missing"), None);
    }

    #[test]
    fn rename_keeps_position() {
        let mut r = abc();
        r.rename("a", "c");
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["c", "b"]);
        assert_eq!(r.get("c"), Some(&Value::Int(1)));
    }

    #[test]
    fn joined_key_requires_all_fields() {
        let r = abc();
        let names = vec!["c".to_string(), "a".to_string()];
        assert_eq!(r.selected_values_joined(&names), Some("3\u{1f}1".to_string()));
        let missing = vec!["a".to_string(), "q".to_string()];
        assert_eq!(r.selected_values_joined(&missing), None);
    }

    #[test]
    fn json_round_trip_preserves_order_and_flattens() {
        let r: Record = serde_json::from_str(r#"{"z":1,"a":{"b":2,"c":[3,4]}}"#).unwrap();
        assert_eq!(
            r.keys().collect::<Vec<_>>(),
            vec!["z", "a.b", "a.c.1", "a.c.2"]
        );
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"z":1,"a.b":2,"a.c.1":3,"a.c.2":4}"#);
    }

    #[test]
    fn nested_objects_keep_input_field_order() {
        let r: Record = serde_json::from_str(r#"{"a":{"z":1,"b":{"y":2,"c":3}},"x":4}"#).unwrap();
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a.z", "a.b.y", "a.b.c", "x"]);
    }
}
