//! Indexed class-value maps
//!
//! A built-in class exports a fixed catalog of properties addressed by small
//! integer ids (`1..=max_id`). The catalog is the only source of truth for
//! names and initial values; a [`ClassValueMap`] is the shared, lazily filled
//! backing store over it. Nothing is allocated until the first non-trivial
//! access, and each id is initialized at most once.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{VmError, VmResult};
use crate::object::ObjectRef;
use crate::property::{Attributes, PropertyKey, Slot, SlotValue};
use crate::value::Value;

/// A class's catalog: its name→id function and per-id initializer.
pub trait ClassCatalog: Send + Sync {
    /// Class name, for diagnostics
    fn class_name(&self) -> &str;

    /// Highest id in the catalog. Ids are `1..=max_id`.
    fn max_id(&self) -> u32;

    /// Map a property name to its id
    fn find_id(&self, name: &str) -> Option<u32>;

    /// Populate `id` by calling [`IdInitializer::init_value`] (or
    /// [`IdInitializer::init_accessor`]) for it. Returning without doing so is
    /// an internal error detected by the map.
    fn init_id(&self, id: u32, init: &mut IdInitializer<'_>) -> VmResult<()>;
}

/// Collects the entries produced by [`ClassCatalog::init_id`].
pub struct IdInitializer<'a> {
    catalog: &'a dyn ClassCatalog,
    pending: Vec<(u32, Arc<str>, Slot)>,
}

impl<'a> IdInitializer<'a> {
    fn new(catalog: &'a dyn ClassCatalog) -> Self {
        Self {
            catalog,
            pending: Vec::new(),
        }
    }

    /// Record the initial data value of `id`.
    pub fn init_value(
        &mut self,
        id: u32,
        name: &str,
        value: Value,
        attributes: Attributes,
    ) -> VmResult<()> {
        let name = validate_id(self.catalog, id, name)?;
        self.pending.push((id, name, Slot::data(value, attributes)));
        Ok(())
    }

    /// Record an accessor pair for `id`.
    pub fn init_accessor(
        &mut self,
        id: u32,
        name: &str,
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
        attributes: Attributes,
    ) -> VmResult<()> {
        let name = validate_id(self.catalog, id, name)?;
        self.pending
            .push((id, name, Slot::accessor(getter, setter, attributes)));
        Ok(())
    }
}

fn validate_id(catalog: &dyn ClassCatalog, id: u32, name: &str) -> VmResult<Arc<str>> {
    if id == 0 || id > catalog.max_id() || catalog.find_id(name) != Some(id) {
        return Err(VmError::internal(format!(
            "{}: id {id} does not map back from name {name:?}",
            catalog.class_name()
        )));
    }
    Ok(Arc::from(name))
}

#[derive(Clone, Debug)]
enum IdEntry {
    Uninit,
    Live { name: Arc<str>, slot: Slot },
    Removed,
}

/// Shared, lazily materialized values of a class catalog.
pub struct ClassValueMap {
    catalog: Arc<dyn ClassCatalog>,
    /// `None` until first materialization; entry `i` holds id `i + 1`
    backing: RwLock<Option<Vec<IdEntry>>>,
}

impl ClassValueMap {
    /// Wrap a catalog. No backing storage is allocated yet.
    pub fn new(catalog: Arc<dyn ClassCatalog>) -> Self {
        Self {
            catalog,
            backing: RwLock::new(None),
        }
    }

    /// The catalog this map materializes
    pub fn catalog(&self) -> &Arc<dyn ClassCatalog> {
        &self.catalog
    }

    /// Name of the exporting class
    pub fn class_name(&self) -> &str {
        self.catalog.class_name()
    }

    /// Id for `name`
    pub fn find_id(&self, name: &str) -> Option<u32> {
        self.catalog
            .find_id(name)
            .filter(|id| *id >= 1 && *id <= self.catalog.max_id())
    }

    /// Id for a property key; indexed keys never name catalog entries.
    pub fn find_key(&self, key: &PropertyKey) -> Option<u32> {
        key.as_name().and_then(|name| self.find_id(name))
    }

    /// Whether the backing storage has been allocated
    pub fn is_materialized(&self) -> bool {
        self.backing.read().is_some()
    }

    /// Number of ids initialized so far (removed ids included)
    pub fn materialized_count(&self) -> usize {
        self.backing.read().as_ref().map_or(0, |entries| {
            entries
                .iter()
                .filter(|e| !matches!(e, IdEntry::Uninit))
                .count()
        })
    }

    /// Whether `id` is present. Never materializes: an id that has not been
    /// initialized yet is present by definition.
    pub fn has(&self, id: u32) -> bool {
        if id == 0 || id > self.catalog.max_id() {
            return false;
        }
        match self.backing.read().as_ref() {
            None => true,
            Some(entries) => !matches!(entries[(id - 1) as usize], IdEntry::Removed),
        }
    }

    /// Slot of `id`, materializing it first. `None` once deleted.
    pub fn slot(&self, id: u32) -> VmResult<Option<Slot>> {
        self.ensure_id(id)?;
        Ok(match self.entry(id) {
            Some(IdEntry::Live { slot, .. }) => Some(slot),
            _ => None,
        })
    }

    /// Value of `id`: the data value, or the accessor pair.
    pub fn get(&self, id: u32) -> VmResult<Option<SlotValue>> {
        Ok(self.slot(id)?.map(|slot| slot.value))
    }

    /// Store a data value under `id`. Returns false if the entry is read-only,
    /// an accessor, or deleted.
    pub fn set(&self, id: u32, value: Value) -> VmResult<bool> {
        self.ensure_id(id)?;
        let mut guard = self.backing.write();
        let Some(IdEntry::Live { slot, .. }) = guard
            .as_mut()
            .and_then(|entries| entries.get_mut((id - 1) as usize))
        else {
            return Ok(false);
        };
        if slot.value.is_accessor() || !slot.attributes.is_writable() {
            return Ok(false);
        }
        slot.value = SlotValue::Data(value);
        Ok(true)
    }

    /// Replace the whole slot of a live `id` (descriptor redefinition).
    pub fn replace(&self, id: u32, new_slot: Slot) -> VmResult<bool> {
        self.ensure_id(id)?;
        let mut guard = self.backing.write();
        match guard
            .as_mut()
            .and_then(|entries| entries.get_mut((id - 1) as usize))
        {
            Some(IdEntry::Live { slot, .. }) => {
                *slot = new_slot;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Delete `id` honoring PERMANENT.
    pub fn delete(&self, id: u32) -> VmResult<bool> {
        if !self.has(id) {
            return Ok(true);
        }
        self.ensure_id(id)?;
        let mut guard = self.backing.write();
        let Some(entry) = guard
            .as_mut()
            .and_then(|entries| entries.get_mut((id - 1) as usize))
        else {
            return Ok(true);
        };
        if let IdEntry::Live { slot, .. } = entry {
            if !slot.attributes.is_configurable() {
                return Ok(false);
            }
        }
        *entry = IdEntry::Removed;
        Ok(true)
    }

    /// Attribute bits of `id`
    pub fn get_attributes(&self, id: u32) -> VmResult<Option<Attributes>> {
        Ok(self.slot(id)?.map(|slot| slot.attributes))
    }

    /// Replace the attribute bits of `id`. Returns false if absent.
    pub fn set_attributes(&self, id: u32, attributes: Attributes) -> VmResult<bool> {
        self.ensure_id(id)?;
        let mut guard = self.backing.write();
        match guard
            .as_mut()
            .and_then(|entries| entries.get_mut((id - 1) as usize))
        {
            Some(IdEntry::Live { slot, .. }) => {
                slot.attributes = attributes;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Names of live entries, after `extra`. Names already in `extra` are not
    /// repeated. Enumerating attributes materializes every id.
    pub fn get_names(
        &self,
        include_all: bool,
        extra: Vec<PropertyKey>,
    ) -> VmResult<Vec<PropertyKey>> {
        self.get_names_filtered(include_all, extra, |_| true)
    }

    pub(crate) fn get_names_filtered(
        &self,
        include_all: bool,
        mut extra: Vec<PropertyKey>,
        visible: impl Fn(u32) -> bool,
    ) -> VmResult<Vec<PropertyKey>> {
        self.ensure_all()?;
        let guard = self.backing.read();
        let Some(entries) = guard.as_ref() else {
            return Ok(extra);
        };
        for (i, entry) in entries.iter().enumerate() {
            let IdEntry::Live { name, slot } = entry else {
                continue;
            };
            if !visible(i as u32 + 1) || (!include_all && !slot.attributes.is_enumerable()) {
                continue;
            }
            let key = PropertyKey::Name(name.clone());
            if !extra.contains(&key) {
                extra.push(key);
            }
        }
        Ok(extra)
    }

    /// Bootstrap-time definition of `id`, used by the closing pass that wires
    /// entries depending on objects created after the catalog (such as
    /// `constructor`). Overwrites any earlier value.
    pub fn init_value(
        &self,
        id: u32,
        name: &str,
        value: Value,
        attributes: Attributes,
    ) -> VmResult<()> {
        let name = validate_id(self.catalog.as_ref(), id, name)?;
        let mut guard = self.backing.write();
        let entries = guard.get_or_insert_with(|| self.allocate());
        entries[(id - 1) as usize] = IdEntry::Live {
            name,
            slot: Slot::data(value, attributes),
        };
        Ok(())
    }

    /// Materialize every id.
    pub fn ensure_all(&self) -> VmResult<()> {
        for id in 1..=self.catalog.max_id() {
            self.ensure_id(id)?;
        }
        Ok(())
    }

    fn allocate(&self) -> Vec<IdEntry> {
        vec![IdEntry::Uninit; self.catalog.max_id() as usize]
    }

    fn entry(&self, id: u32) -> Option<IdEntry> {
        let guard = self.backing.read();
        guard.as_ref()?.get((id.checked_sub(1)?) as usize).cloned()
    }

    fn ensure_id(&self, id: u32) -> VmResult<()> {
        if id == 0 || id > self.catalog.max_id() {
            return Err(VmError::internal(format!(
                "{}: id {id} out of range",
                self.class_name()
            )));
        }
        let index = (id - 1) as usize;
        if let Some(entries) = self.backing.read().as_ref() {
            if !matches!(entries[index], IdEntry::Uninit) {
                return Ok(());
            }
        }

        // The initializer runs unlocked: it may create function objects or
        // read other catalogs. Racing initializers produce equivalent entries
        // and only the first one is kept.
        let mut init = IdInitializer::new(self.catalog.as_ref());
        self.catalog.init_id(id, &mut init)?;

        let mut guard = self.backing.write();
        let entries = guard.get_or_insert_with(|| self.allocate());
        for (pending_id, name, slot) in init.pending {
            let entry = &mut entries[(pending_id - 1) as usize];
            if matches!(entry, IdEntry::Uninit) {
                *entry = IdEntry::Live { name, slot };
            }
        }
        if matches!(entries[index], IdEntry::Uninit) {
            return Err(VmError::internal(format!(
                "{}: initializer did not populate id {id}",
                self.class_name()
            )));
        }
        tracing::trace!(
            target: "marten::class_map",
            class = self.class_name(),
            id,
            "materialized class map entry"
        );
        Ok(())
    }
}

impl fmt::Debug for ClassValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassValueMap")
            .field("class", &self.class_name())
            .field("max_id", &self.catalog.max_id())
            .field("materialized", &self.materialized_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Catalog {1: "a" = 10, 2: "b" = 20 (readonly), 3: "broken"}.
    struct Sample {
        init_calls: AtomicUsize,
    }

    impl ClassCatalog for Sample {
        fn class_name(&self) -> &str {
            "Sample"
        }

        fn max_id(&self) -> u32 {
            3
        }

        fn find_id(&self, name: &str) -> Option<u32> {
            match name {
                "a" => Some(1),
                "b" => Some(2),
                "broken" => Some(3),
                _ => None,
            }
        }

        fn init_id(&self, id: u32, init: &mut IdInitializer<'_>) -> VmResult<()> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            match id {
                1 => init.init_value(1, "a", Value::Number(10.0), Attributes::EMPTY),
                2 => init.init_value(2, "b", Value::Number(20.0), Attributes::READONLY),
                _ => Ok(()),
            }
        }
    }

    fn sample() -> (Arc<Sample>, ClassValueMap) {
        let catalog = Arc::new(Sample {
            init_calls: AtomicUsize::new(0),
        });
        let map = ClassValueMap::new(catalog.clone());
        (catalog, map)
    }

    #[test]
    fn test_has_does_not_materialize() {
        let (_, map) = sample();
        assert!(map.has(1));
        assert!(!map.has(4));
        assert!(!map.is_materialized());
    }

    #[test]
    fn test_each_id_initialized_once() {
        let (catalog, map) = sample();
        assert!(matches!(map.get(1), Ok(Some(SlotValue::Data(Value::Number(n)))) if n == 10.0));
        assert!(map.get(1).is_ok());
        assert_eq!(catalog.init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(map.materialized_count(), 1);
    }

    #[test]
    fn test_readonly_set_is_refused() {
        let (_, map) = sample();
        assert!(!map.set(2, Value::Null).unwrap());
        assert!(map.set(1, Value::Null).unwrap());
        assert!(matches!(map.get(1), Ok(Some(SlotValue::Data(Value::Null)))));
    }

    #[test]
    fn test_missing_initialization_is_internal() {
        let (_, map) = sample();
        let err = map.get(3).unwrap_err();
        assert!(!err.is_catchable());
        assert!(err.to_string().contains("did not populate id 3"));
    }

    #[test]
    fn test_init_value_validates_name() {
        let (_, map) = sample();
        assert!(map.init_value(2, "a", Value::Null, Attributes::EMPTY).is_err());
        assert!(map.init_value(3, "broken", Value::Null, Attributes::EMPTY).is_ok());
        assert!(map.get(3).is_ok());
    }

    #[test]
    fn test_delete_then_names() {
        let (_, map) = sample();
        map.init_value(3, "broken", Value::Null, Attributes::DONTENUM)
            .unwrap();
        assert!(map.delete(1).unwrap());
        assert!(!map.has(1));
        let names = map.get_names(false, vec![PropertyKey::name("own")]).unwrap();
        assert_eq!(names, vec![PropertyKey::name("own"), PropertyKey::name("b")]);
        let all = map.get_names(true, Vec::new()).unwrap();
        assert_eq!(all.len(), 2);
    }
}
