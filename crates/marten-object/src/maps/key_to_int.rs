use super::table::{RawTable, TableKey};

/// Map from keys to `i32` values.
#[derive(Clone, Debug)]
pub struct KeyToIntMap<K> {
    table: RawTable<K, i32>,
}

impl<K: TableKey> Default for KeyToIntMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TableKey> KeyToIntMap<K> {
    /// Create an empty map. No buckets are allocated until the first insert.
    pub fn new() -> Self {
        Self {
            table: RawTable::new(),
        }
    }

    /// Create a map sized for `n` keys.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            table: RawTable::with_capacity(n),
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when the map holds no keys
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Number of allocated buckets
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Whether `key` is present
    pub fn has(&self, key: &K) -> bool {
        self.table.find(key).is_some()
    }

    /// Value stored for `key`
    pub fn get(&self, key: &K) -> Option<i32> {
        self.table.get(key).copied()
    }

    /// Value stored for `key`, or `default`
    pub fn get_or(&self, key: &K, default: i32) -> i32 {
        self.get(key).unwrap_or(default)
    }

    /// Insert or replace. Returns the previous value.
    pub fn put(&mut self, key: K, value: i32) -> Option<i32> {
        self.table.insert(key, value).1
    }

    /// Remove `key`. Returns its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<i32> {
        self.table.remove(key)
    }

    /// Return the stored key equal to `key` and reset its value to 0, inserting
    /// it if absent.
    ///
    /// Handing back the canonical instance lets callers share one allocation per
    /// distinct key.
    pub fn intern(&mut self, key: K) -> &K {
        let index = match self.table.find(&key) {
            Some(index) => {
                if let Some(v) = self.table.value_at_mut(index) {
                    *v = 0;
                }
                index
            }
            None => self.table.insert(key, 0).0,
        };
        match self.table.key_at(index) {
            Some(k) => k,
            None => unreachable!("bucket {index} was just located or filled"),
        }
    }

    /// Add `delta` to the value under `key` (absent keys start at 0). Returns the
    /// new value.
    pub fn add(&mut self, key: K, delta: i32) -> i32 {
        let index = match self.table.find(&key) {
            Some(index) => index,
            None => self.table.insert(key, 0).0,
        };
        match self.table.value_at_mut(index) {
            Some(v) => {
                *v = v.wrapping_add(delta);
                *v
            }
            None => unreachable!("bucket {index} was just located or filled"),
        }
    }

    /// Remove every key and release the buckets
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Iterate live entries in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (&K, i32)> {
        self.table.iter().map(|(k, v)| (k, *v))
    }

    /// Iterate live keys in bucket order
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.table.iter().map(|(k, _)| k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_put_get_remove() {
        let mut map: KeyToIntMap<Arc<str>> = KeyToIntMap::new();
        assert!(!map.has(&Arc::from("a")));
        assert_eq!(map.put(Arc::from("a"), 1), None);
        assert_eq!(map.put(Arc::from("a"), 2), Some(1));
        assert_eq!(map.get(&Arc::from("a")), Some(2));
        assert_eq!(map.get_or(&Arc::from("b"), -1), -1);
        assert_eq!(map.remove(&Arc::from("a")), Some(2));
        assert!(!map.has(&Arc::from("a")));
        assert!(map.is_empty());
    }

    #[test]
    fn test_intern_returns_canonical_key() {
        let mut map: KeyToIntMap<Arc<str>> = KeyToIntMap::new();
        let first: Arc<str> = Arc::from("length");
        let canonical = map.intern(first.clone()).clone();
        assert!(Arc::ptr_eq(&canonical, &first));

        let again = map.intern(Arc::from("length")).clone();
        assert!(Arc::ptr_eq(&again, &first));
        assert_eq!(map.get(&first), Some(0));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_intern_resets_existing_value() {
        let mut map: KeyToIntMap<&'static str> = KeyToIntMap::new();
        map.put("k", 7);
        assert_eq!(*map.intern("k"), "k");
        assert_eq!(map.get(&"k"), Some(0));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_add_counts() {
        let mut map: KeyToIntMap<&'static str> = KeyToIntMap::new();
        map.add("x", 2);
        assert_eq!(map.add("x", 3), 5);
        assert_eq!(map.add("y", -1), -1);
    }

    #[test]
    fn test_growth_keeps_entries() {
        let mut map: KeyToIntMap<String> = KeyToIntMap::new();
        for i in 0..1000 {
            map.put(format!("k{i}"), i);
        }
        assert_eq!(map.len(), 1000);
        for i in 0..1000 {
            assert_eq!(map.get(&format!("k{i}")), Some(i));
        }
        assert!(map.capacity().is_power_of_two());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(u8, i32),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<u8>(), any::<i32>()).prop_map(|(k, v)| Op::Put(k, v)),
            any::<u8>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_std_hashmap(ops in prop::collection::vec(op(), 0..300)) {
            let mut map: KeyToIntMap<String> = KeyToIntMap::new();
            let mut model: HashMap<String, i32> = HashMap::new();
            for op in ops {
                match op {
                    Op::Put(k, v) => {
                        prop_assert_eq!(map.put(k.to_string(), v), model.insert(k.to_string(), v));
                    }
                    Op::Remove(k) => {
                        prop_assert_eq!(map.remove(&k.to_string()), model.remove(&k.to_string()));
                        prop_assert!(!map.has(&k.to_string()));
                    }
                }
            }
            prop_assert_eq!(map.len(), model.len());
            for (k, v) in &model {
                prop_assert_eq!(map.get(k), Some(*v));
            }
            let distinct: std::collections::HashSet<&String> = map.keys().collect();
            prop_assert_eq!(distinct.len(), model.len());
        }
    }
}
