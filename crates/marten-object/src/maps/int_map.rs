use super::table::RawTable;

/// Map from `u32` keys to values, used for indexed properties.
#[derive(Clone, Debug)]
pub struct IntMap<V> {
    table: RawTable<u32, V>,
}

impl<V> Default for IntMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntMap<V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            table: RawTable::new(),
        }
    }

    /// Create a map sized for `n` keys
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

    /// Whether `key` is present
    pub fn has(&self, key: u32) -> bool {
        self.table.find(&key).is_some()
    }

    /// Value stored under `key`
    pub fn get(&self, key: u32) -> Option<&V> {
        self.table.get(&key)
    }

    /// Mutable value stored under `key`
    pub fn get_mut(&mut self, key: u32) -> Option<&mut V> {
        self.table.get_mut(&key)
    }

    /// Insert or replace. Returns the previous value.
    pub fn put(&mut self, key: u32, value: V) -> Option<V> {
        self.table.insert(key, value).1
    }

    /// Remove `key`, returning its value
    pub fn remove(&mut self, key: u32) -> Option<V> {
        self.table.remove(&key)
    }

    /// Remove every key
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Live keys in bucket order
    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.table.iter().map(|(k, _)| *k)
    }

    /// Live keys in ascending order
    pub fn sorted_keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.keys().collect();
        keys.sort_unstable();
        keys
    }

    /// Iterate live entries in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &V)> {
        self.table.iter().map(|(k, v)| (*k, v))
    }
}

impl<V: Copy> IntMap<V> {
    /// Value under `key`, or `default`
    pub fn get_or(&self, key: u32, default: V) -> V {
        self.get(key).copied().unwrap_or(default)
    }
}
