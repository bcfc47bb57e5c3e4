//! Open-addressing table shared by [`KeyToIntMap`](super::KeyToIntMap) and
//! [`IntMap`](super::IntMap).
//!
//! Capacity is a power of two. The initial probe comes from a golden-ratio
//! multiplicative hash; collisions step by an odd stride taken from other bits of
//! the same product, so every probe sequence visits the whole table.

use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

use rustc_hash::FxHasher;

/// 2^32 / phi
const GOLDEN: u32 = 0x9e37_79b9;

/// Smallest allocated table: 4 buckets.
const MIN_POWER: u32 = 2;

/// Keys stored in an open-addressing table.
pub trait TableKey: Eq + Clone {
    /// 32-bit hash code fed to the multiplicative hash.
    fn hash_code(&self) -> u32;
}

impl TableKey for u32 {
    #[inline]
    fn hash_code(&self) -> u32 {
        *self
    }
}

impl TableKey for Arc<str> {
    #[inline]
    fn hash_code(&self) -> u32 {
        fx_hash(self.as_ref())
    }
}

impl TableKey for String {
    #[inline]
    fn hash_code(&self) -> u32 {
        fx_hash(self.as_str())
    }
}

impl TableKey for &'static str {
    #[inline]
    fn hash_code(&self) -> u32 {
        fx_hash(*self)
    }
}

fn fx_hash<T: Hash + ?Sized>(value: &T) -> u32 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}

/// A bucket. `Empty` and `Tombstone` are private markers that no key can equal,
/// which is what a null-key sentinel provides in a nullable world.
#[derive(Clone, Debug)]
pub(crate) enum Bucket<K, V> {
    Empty,
    Tombstone,
    Live(K, V),
}

#[derive(Clone, Debug)]
pub(crate) struct RawTable<K, V> {
    buckets: Vec<Bucket<K, V>>,
    /// log2(capacity); zero while unallocated
    power: u32,
    /// Live entries
    live: usize,
    /// Live entries plus tombstones
    occupied: usize,
}

enum Probe {
    Found(usize),
    Vacant(usize),
}

impl<K: TableKey, V> RawTable<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            buckets: Vec::new(),
            power: 0,
            live: 0,
            occupied: 0,
        }
    }

    /// Pre-size for `n` keys without triggering a rehash.
    pub(crate) fn with_capacity(n: usize) -> Self {
        let mut table = Self::new();
        if n > 0 {
            let mut power = MIN_POWER;
            while n * 4 >= (3usize << power) {
                power += 1;
            }
            table.allocate(power);
        }
        table
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[cfg(test)]
    pub(crate) fn occupied(&self) -> usize {
        self.occupied
    }

    fn allocate(&mut self, power: u32) {
        self.buckets = (0..1usize << power).map(|_| Bucket::Empty).collect();
        self.power = power;
        self.live = 0;
        self.occupied = 0;
    }

    #[inline]
    fn step(fraction: u32, mask: u32, power: u32) -> u32 {
        let shift = 32 - 2 * power as i32;
        if shift >= 0 {
            ((fraction >> shift) & mask) | 1
        } else {
            (fraction & (mask >> -shift)) | 1
        }
    }

    /// Locate `key`, or the bucket a new entry for it should use (the first
    /// tombstone on the probe path, else the terminating empty bucket).
    fn probe(&self, key: &K) -> Option<Probe> {
        if self.power == 0 {
            return None;
        }
        let fraction = key.hash_code().wrapping_mul(GOLDEN);
        let mask = (1u32 << self.power) - 1;
        let mut index = fraction >> (32 - self.power);
        let mut first_tombstone = None;
        let mut step = 0;
        loop {
            match &self.buckets[index as usize] {
                Bucket::Empty => {
                    return Some(Probe::Vacant(first_tombstone.unwrap_or(index as usize)));
                }
                Bucket::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index as usize);
                    }
                }
                Bucket::Live(k, _) if k == key => return Some(Probe::Found(index as usize)),
                Bucket::Live(..) => {}
            }
            if step == 0 {
                step = Self::step(fraction, mask, self.power);
            }
            index = (index + step) & mask;
        }
    }

    pub(crate) fn find(&self, key: &K) -> Option<usize> {
        match self.probe(key)? {
            Probe::Found(i) => Some(i),
            Probe::Vacant(_) => None,
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        let index = self.find(key)?;
        match &self.buckets[index] {
            Bucket::Live(_, v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.find(key)?;
        match &mut self.buckets[index] {
            Bucket::Live(_, v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn key_at(&self, index: usize) -> Option<&K> {
        match self.buckets.get(index)? {
            Bucket::Live(k, _) => Some(k),
            _ => None,
        }
    }

    pub(crate) fn value_at_mut(&mut self, index: usize) -> Option<&mut V> {
        match self.buckets.get_mut(index)? {
            Bucket::Live(_, v) => Some(v),
            _ => None,
        }
    }

    /// Insert or replace. Returns the bucket index and the previous value.
    pub(crate) fn insert(&mut self, key: K, value: V) -> (usize, Option<V>) {
        match self.probe(&key) {
            Some(Probe::Found(i)) => {
                let previous = match &mut self.buckets[i] {
                    Bucket::Live(_, v) => Some(mem::replace(v, value)),
                    _ => None,
                };
                (i, previous)
            }
            Some(Probe::Vacant(i)) if !self.needs_rehash() => (self.fill(i, key, value), None),
            _ => {
                self.rehash();
                (self.insert_fresh(key, value), None)
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.find(key)?;
        match mem::replace(&mut self.buckets[index], Bucket::Tombstone) {
            Bucket::Live(_, v) => {
                self.live -= 1;
                Some(v)
            }
            other => {
                self.buckets[index] = other;
                None
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.power = 0;
        self.live = 0;
        self.occupied = 0;
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets.iter().filter_map(|b| match b {
            Bucket::Live(k, v) => Some((k, v)),
            _ => None,
        })
    }

    #[inline]
    fn needs_rehash(&self) -> bool {
        self.occupied * 4 >= (3usize << self.power)
    }

    fn fill(&mut self, index: usize, key: K, value: V) -> usize {
        if matches!(self.buckets[index], Bucket::Empty) {
            self.occupied += 1;
        }
        self.buckets[index] = Bucket::Live(key, value);
        self.live += 1;
        index
    }

    /// Insert a key known to be absent into a table without tombstones.
    fn insert_fresh(&mut self, key: K, value: V) -> usize {
        match self.probe(&key) {
            Some(Probe::Vacant(i)) => self.fill(i, key, value),
            // Only reachable if the caller broke the "known absent" contract.
            Some(Probe::Found(i)) => {
                self.buckets[i] = Bucket::Live(key, value);
                i
            }
            None => {
                self.allocate(MIN_POWER);
                self.insert_fresh(key, value)
            }
        }
    }

    /// Drop tombstones; grow only when live entries are at least half of the
    /// occupied buckets.
    fn rehash(&mut self) {
        let grew = self.power == 0 || self.live * 2 >= self.occupied;
        let power = match self.power {
            0 => MIN_POWER,
            p if grew => p + 1,
            p => p,
        };
        let old = mem::take(&mut self.buckets);
        let tombstones = self.occupied - self.live;
        self.allocate(power);
        for bucket in old {
            if let Bucket::Live(k, v) = bucket {
                self.insert_fresh(k, v);
            }
        }
        tracing::trace!(
            target: "marten::maps",
            capacity = self.capacity(),
            live = self.live,
            tombstones,
            grew,
            "rehashed open-addressing table"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_is_odd() {
        for power in MIN_POWER..20 {
            let mask = (1u32 << power) - 1;
            for fraction in [0u32, 1, 0xdead_beef, u32::MAX] {
                assert_eq!(RawTable::<u32, ()>::step(fraction, mask, power) & 1, 1);
            }
        }
    }

    #[test]
    fn test_rehash_compacts_without_growing() {
        let mut table: RawTable<u32, u32> = RawTable::new();
        for i in 0..3 {
            table.insert(i, i);
        }
        // Churn: every insert is immediately removed, leaving tombstones.
        for i in 100..200 {
            table.insert(i, i);
            table.remove(&i);
        }
        assert_eq!(table.len(), 3);
        // Once tombstones outnumber live keys, rehashing compacts in place.
        assert!(table.capacity() <= 16);
        assert!(table.occupied() * 4 < table.capacity() * 3);
        for i in 0..3 {
            assert_eq!(table.get(&i), Some(&i));
        }
    }

    #[test]
    fn test_with_capacity_avoids_rehash() {
        let mut table: RawTable<u32, ()> = RawTable::with_capacity(10);
        let capacity = table.capacity();
        for i in 0..10 {
            table.insert(i, ());
        }
        assert_eq!(table.capacity(), capacity);
    }
}
