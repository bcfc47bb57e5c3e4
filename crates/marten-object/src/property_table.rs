//! Generic per-object slot storage
//!
//! Named slots live in an insertion-ordered vector indexed through a
//! [`KeyToIntMap`]; indexed slots live in an [`IntMap`]. Enumeration yields
//! indices in ascending order, then names in insertion order.

use std::sync::Arc;

use crate::maps::{IntMap, KeyToIntMap};
use crate::property::{Attributes, PropertyKey, Slot};
use crate::value::Value;

/// Per-object property storage.
#[derive(Clone, Debug, Default)]
pub struct PropertyTable {
    /// name -> position in `ordered`
    names: KeyToIntMap<Arc<str>>,
    ordered: Vec<Option<(Arc<str>, Slot)>>,
    /// Number of `None` holes in `ordered`
    holes: usize,
    indexed: IntMap<Slot>,
}

impl PropertyTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.names.len() + self.indexed.len()
    }

    /// True when no slot is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` has a slot
    pub fn has(&self, key: &PropertyKey) -> bool {
        match key {
            PropertyKey::Name(name) => self.names.has(name),
            PropertyKey::Index(i) => self.indexed.has(*i),
        }
    }

    /// Slot stored under `key`
    pub fn get(&self, key: &PropertyKey) -> Option<&Slot> {
        match key {
            PropertyKey::Name(name) => {
                let pos = self.names.get(name)? as usize;
                self.ordered.get(pos)?.as_ref().map(|(_, slot)| slot)
            }
            PropertyKey::Index(i) => self.indexed.get(*i),
        }
    }

    /// Mutable slot stored under `key`
    pub fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut Slot> {
        match key {
            PropertyKey::Name(name) => {
                let pos = self.names.get(name)? as usize;
                self.ordered.get_mut(pos)?.as_mut().map(|(_, slot)| slot)
            }
            PropertyKey::Index(i) => self.indexed.get_mut(*i),
        }
    }

    /// Store `slot`, replacing any existing slot in place (enumeration order is
    /// kept). Returns the previous slot.
    pub fn insert(&mut self, key: PropertyKey, slot: Slot) -> Option<Slot> {
        match key {
            PropertyKey::Name(name) => {
                if let Some(existing) = self.get_mut(&PropertyKey::Name(name.clone())) {
                    return Some(std::mem::replace(existing, slot));
                }
                let pos = self.ordered.len() as i32;
                self.ordered.push(Some((name.clone(), slot)));
                self.names.put(name, pos);
                None
            }
            PropertyKey::Index(i) => self.indexed.put(i, slot),
        }
    }

    /// Store a data value. An existing slot keeps its attributes.
    pub fn set_value(&mut self, key: PropertyKey, value: Value, attributes: Attributes) {
        match self.get_mut(&key) {
            Some(slot) => slot.value = crate::property::SlotValue::Data(value),
            None => {
                self.insert(key, Slot::data(value, attributes));
            }
        }
    }

    /// Delete honoring PERMANENT. Returns false if the slot is permanent;
    /// deleting an absent key succeeds.
    pub fn delete(&mut self, key: &PropertyKey) -> bool {
        match self.get(key) {
            Some(slot) if !slot.attributes.is_configurable() => false,
            Some(_) => {
                self.remove(key);
                true
            }
            None => true,
        }
    }

    /// Unconditionally remove the slot under `key`.
    pub fn remove(&mut self, key: &PropertyKey) -> Option<Slot> {
        match key {
            PropertyKey::Name(name) => {
                let pos = self.names.remove(name)? as usize;
                let removed = self.ordered.get_mut(pos)?.take().map(|(_, slot)| slot);
                self.holes += 1;
                if self.holes > self.names.len() {
                    self.compact();
                }
                removed
            }
            PropertyKey::Index(i) => self.indexed.remove(*i),
        }
    }

    fn compact(&mut self) {
        self.ordered.retain(Option::is_some);
        self.holes = 0;
        for (pos, entry) in self.ordered.iter().enumerate() {
            if let Some((name, _)) = entry {
                self.names.put(name.clone(), pos as i32);
            }
        }
    }

    /// Attribute bits of `key`
    pub fn get_attributes(&self, key: &PropertyKey) -> Option<Attributes> {
        self.get(key).map(|slot| slot.attributes)
    }

    /// Replace the attribute bits of `key`. Returns false if absent.
    pub fn set_attributes(&mut self, key: &PropertyKey, attributes: Attributes) -> bool {
        match self.get_mut(key) {
            Some(slot) => {
                slot.attributes = attributes;
                true
            }
            None => false,
        }
    }

    /// Keys in enumeration order: indices ascending, then names by insertion.
    pub fn get_ids(&self, include_non_enumerable: bool) -> Vec<PropertyKey> {
        let visible = |slot: &Slot| include_non_enumerable || slot.attributes.is_enumerable();
        let mut ids: Vec<PropertyKey> = self
            .indexed
            .sorted_keys()
            .into_iter()
            .filter(|i| self.indexed.get(*i).is_some_and(visible))
            .map(PropertyKey::Index)
            .collect();
        ids.extend(
            self.ordered
                .iter()
                .flatten()
                .filter(|(_, slot)| visible(slot))
                .map(|(name, _)| PropertyKey::Name(name.clone())),
        );
        ids
    }

    /// All slots, in enumeration order.
    pub fn slots(&self) -> impl Iterator<Item = (PropertyKey, &Slot)> {
        let indexed = self
            .indexed
            .sorted_keys()
            .into_iter()
            .filter_map(|i| self.indexed.get(i).map(|slot| (PropertyKey::Index(i), slot)));
        let named = self
            .ordered
            .iter()
            .flatten()
            .map(|(name, slot)| (PropertyKey::Name(name.clone()), slot));
        indexed.chain(named)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: f64) -> Slot {
        Slot::data(Value::Number(n), Attributes::EMPTY)
    }

    #[test]
    fn test_enumeration_order() {
        let mut table = PropertyTable::new();
        table.insert(PropertyKey::name("b"), data(1.0));
        table.insert(PropertyKey::index(2), data(2.0));
        table.insert(PropertyKey::name("a"), data(3.0));
        table.insert(PropertyKey::index(0), data(4.0));
        let ids: Vec<String> = table.get_ids(false).iter().map(|k| k.to_string()).collect();
        assert_eq!(ids, ["0", "2", "b", "a"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut table = PropertyTable::new();
        table.insert(PropertyKey::name("a"), data(1.0));
        table.insert(PropertyKey::name("b"), data(2.0));
        table.insert(PropertyKey::name("a"), data(3.0));
        let ids: Vec<String> = table.get_ids(true).iter().map(|k| k.to_string()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(
            table.get(&PropertyKey::name("a")).and_then(Slot::data_value),
            Some(&Value::Number(3.0))
        );
    }

    #[test]
    fn test_permanent_blocks_delete() {
        let mut table = PropertyTable::new();
        table.insert(
            PropertyKey::name("p"),
            Slot::data(Value::Null, Attributes::PERMANENT),
        );
        assert!(!table.delete(&PropertyKey::name("p")));
        assert!(table.has(&PropertyKey::name("p")));
        assert!(table.delete(&PropertyKey::name("missing")));
    }

    #[test]
    fn test_dontenum_hidden_from_enumeration() {
        let mut table = PropertyTable::new();
        table.insert(
            PropertyKey::name("hidden"),
            Slot::data(Value::Null, Attributes::DONTENUM),
        );
        table.insert(PropertyKey::name("shown"), data(0.0));
        assert_eq!(table.get_ids(false), vec![PropertyKey::name("shown")]);
        assert_eq!(table.get_ids(true).len(), 2);
    }

    #[test]
    fn test_compaction_after_many_removals() {
        let mut table = PropertyTable::new();
        for i in 0..50 {
            table.insert(PropertyKey::name(format!("k{i}")), data(i as f64));
        }
        for i in 0..45 {
            table.remove(&PropertyKey::name(format!("k{i}")));
        }
        table.insert(PropertyKey::name("late"), data(-1.0));
        let ids: Vec<String> = table.get_ids(true).iter().map(|k| k.to_string()).collect();
        assert_eq!(ids, ["k45", "k46", "k47", "k48", "k49", "late"]);
        assert_eq!(
            table.get(&PropertyKey::name("k47")).and_then(Slot::data_value),
            Some(&Value::Number(47.0))
        );
    }
}
