use std::cmp::Ordering;
use std::fmt::Display;
use std::vec;

/// A (key,value) pair as read from an input source.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Record {
        Record {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A (key,[value]) pair; typically used as input to a reducer function.
/// Can be easily iterated over, e.g. in a `for` loop.
///
/// Equality and ordering only look at the key.
#[derive(Debug)]
pub struct MultiRecord<K, V> {
    key: K,
    values: Vec<V>,
}

impl<K, V> MultiRecord<K, V> {
    pub fn new(key: K, values: Vec<V>) -> MultiRecord<K, V> {
        MultiRecord {
            key: key,
            values: values,
        }
    }

    /// Retrieves the key of the record.
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends the values of `other`, which is expected to carry the same key.
    pub fn absorb(&mut self, other: MultiRecord<K, V>) {
        self.values.extend(other.values);
    }

    pub fn into_parts(self) -> (K, Vec<V>) {
        (self.key, self.values)
    }
}

impl<K: PartialEq, V> PartialEq for MultiRecord<K, V> {
    fn eq(&self, other: &MultiRecord<K, V>) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for MultiRecord<K, V> {}

impl<K: Ord, V> PartialOrd for MultiRecord<K, V> {
    fn partial_cmp(&self, other: &MultiRecord<K, V>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V> Ord for MultiRecord<K, V> {
    fn cmp(&self, other: &MultiRecord<K, V>) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<K, V> IntoIterator for MultiRecord<K, V> {
    type Item = V;
    type IntoIter = vec::IntoIter<V>;
    /// Allows iterating over all the values.
    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Emitter type used in the mapper phase; used to emit (key,value) pairs.
pub struct MEmitter<K, V> {
    r: Vec<(K, V)>,
}

impl<K, V> Default for MEmitter<K, V> {
    fn default() -> MEmitter<K, V> {
        MEmitter::new()
    }
}

impl<K, V> MEmitter<K, V> {
    pub fn new() -> MEmitter<K, V> {
        MEmitter { r: Vec::new() }
    }
    pub fn emit(&mut self, key: K, val: V) {
        self.r.push((key, val))
    }
    pub fn len(&self) -> usize {
        self.r.len()
    }
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
    pub fn _get(self) -> Vec<(K, V)> {
        self.r
    }
}

/// Emitter used in the reducer phase; used to emit output lines.
#[derive(Default)]
pub struct REmitter {
    r: Vec<String>,
}

impl REmitter {
    pub fn new() -> REmitter {
        REmitter { r: Vec::new() }
    }
    /// Emits one raw output line (without trailing newline).
    pub fn emit(&mut self, line: String) {
        self.r.push(line)
    }
    /// Emits `key<TAB>value`, the format read back by `KeyValueRecordIterator`.
    pub fn emit_kv<K: Display + ?Sized, V: Display>(&mut self, key: &K, value: V) {
        self.r.push(format!("{}\t{}", key, value))
    }
    pub fn _get(self) -> Vec<String> {
        self.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multirecord_orders_by_key_only() {
        let a = MultiRecord::new(String::from("apple"), vec![3, 1]);
        let b = MultiRecord::new(String::from("apple"), vec![2]);
        let c = MultiRecord::new(String::from("banana"), vec![0]);

        assert_eq!(a, b);
        assert!(b < c);

        let mut a = a;
        a.absorb(b);
        assert_eq!(a.values(), &[3, 1, 2]);
        assert_eq!(a.into_iter().sum::<i32>(), 6);
    }

    #[test]
    fn test_remitter_kv_format() {
        let mut e = REmitter::new();
        e.emit_kv("(Apple, Banana)", 4);
        e.emit(String::from("Total Pairs: 1"));
        assert_eq!(e._get(), vec!["(Apple, Banana)\t4", "Total Pairs: 1"]);
    }
}
