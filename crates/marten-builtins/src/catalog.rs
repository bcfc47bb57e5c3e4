//! Built-in class catalogs
//!
//! Every built-in prototype, constructor and namespace object keeps its
//! methods in a [`BuiltinCatalog`]: an ordered name→entry table whose ids are
//! the 1-based insertion positions. Function objects for methods are created
//! the first time their id is touched, so a realm that never reads
//! `String.prototype.trim` never allocates it.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use marten_object::{
    Attributes, ClassCatalog, IdInitializer, NativeFn, NativeFunction, ObjectRef, Value,
    VmError, VmResult, WeakObjectRef,
};

/// Name of the entry populated by the closing pass.
pub const CONSTRUCTOR: &str = "constructor";

/// One catalog entry.
#[derive(Clone)]
pub enum CatalogEntry {
    /// Native method, non-enumerable
    Method {
        /// Body
        func: NativeFn,
        /// Declared arity (`length`)
        length: u32,
    },
    /// Data property with fixed initial value
    Value {
        /// Initial value
        value: Value,
        /// Attribute bits
        attributes: Attributes,
    },
    /// Getter/setter pair built from native bodies
    Accessor {
        /// Getter body
        getter: Option<NativeFn>,
        /// Setter body
        setter: Option<NativeFn>,
    },
    /// `constructor` back-link, written by the closing pass once the
    /// constructor function exists
    Constructor,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogEntry::Method { length, .. } => write!(f, "Method(length={length})"),
            CatalogEntry::Value { value, attributes } => {
                write!(f, "Value({value:?}, {attributes:?})")
            }
            CatalogEntry::Accessor { getter, setter } => write!(
                f,
                "Accessor(get={}, set={})",
                getter.is_some(),
                setter.is_some()
            ),
            CatalogEntry::Constructor => f.write_str("Constructor"),
        }
    }
}

/// Catalog of one built-in object.
pub struct BuiltinCatalog {
    class_name: Arc<str>,
    entries: IndexMap<Arc<str>, CatalogEntry>,
    /// `[[Prototype]]` of the function objects created for methods
    function_prototype: Option<WeakObjectRef>,
}

impl BuiltinCatalog {
    /// Empty catalog for `class_name`.
    pub fn new(class_name: &str, function_prototype: Option<&ObjectRef>) -> Self {
        Self {
            class_name: Arc::from(class_name),
            entries: IndexMap::new(),
            function_prototype: function_prototype.map(ObjectRef::downgrade),
        }
    }

    /// Append an entry. A repeated name keeps its id and takes the new entry.
    pub fn push(&mut self, name: &str, entry: CatalogEntry) -> u32 {
        let (index, _) = self.entries.insert_full(Arc::from(name), entry);
        index as u32 + 1
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id of the `constructor` entry, if the catalog has one
    pub fn constructor_id(&self) -> Option<u32> {
        self.find_id(CONSTRUCTOR)
    }

    /// Entry names in id order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_ref())
    }

    fn make_function(&self, name: &str, func: NativeFn, length: u32) -> VmResult<ObjectRef> {
        let proto = self.function_prototype.as_ref().and_then(WeakObjectRef::upgrade);
        NativeFunction::create(name, length, func, proto)
    }
}

impl ClassCatalog for BuiltinCatalog {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn max_id(&self) -> u32 {
        self.entries.len() as u32
    }

    fn find_id(&self, name: &str) -> Option<u32> {
        self.entries.get_index_of(name).map(|i| i as u32 + 1)
    }

    fn init_id(&self, id: u32, init: &mut IdInitializer<'_>) -> VmResult<()> {
        let Some((name, entry)) = id
            .checked_sub(1)
            .and_then(|i| self.entries.get_index(i as usize))
        else {
            return Err(VmError::internal(format!(
                "{}: no catalog entry for id {id}",
                self.class_name
            )));
        };
        match entry {
            CatalogEntry::Method { func, length } => {
                let function = self.make_function(name, func.clone(), *length)?;
                init.init_value(id, name, Value::Object(function), Attributes::DONTENUM)
            }
            CatalogEntry::Value { value, attributes } => {
                init.init_value(id, name, value.clone(), *attributes)
            }
            CatalogEntry::Accessor { getter, setter } => {
                let getter = getter
                    .clone()
                    .map(|g| self.make_function(&format!("get {name}"), g, 0))
                    .transpose()?;
                let setter = setter
                    .clone()
                    .map(|s| self.make_function(&format!("set {name}"), s, 1))
                    .transpose()?;
                init.init_accessor(id, name, getter, setter, Attributes::DONTENUM)
            }
            // Left for the closing pass; reading it earlier is reported by the map.
            CatalogEntry::Constructor => Ok(()),
        }
    }
}

impl fmt::Debug for BuiltinCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marten_object::{ClassValueMap, OrdinaryObject, PropertyKey};

    fn sample() -> BuiltinCatalog {
        let mut catalog = BuiltinCatalog::new("Sample", None);
        catalog.push(
            "answer",
            CatalogEntry::Method {
                func: Arc::new(|_: &Value, _: &[Value]| Ok(Value::from(42))),
                length: 0,
            },
        );
        catalog.push(
            "LIMIT",
            CatalogEntry::Value {
                value: Value::from(7),
                attributes: Attributes::READONLY | Attributes::DONTENUM | Attributes::PERMANENT,
            },
        );
        catalog.push(CONSTRUCTOR, CatalogEntry::Constructor);
        catalog
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let catalog = sample();
        assert_eq!(catalog.find_id("answer"), Some(1));
        assert_eq!(catalog.find_id("LIMIT"), Some(2));
        assert_eq!(catalog.constructor_id(), Some(3));
        assert_eq!(catalog.find_id("missing"), None);
        assert_eq!(catalog.max_id(), 3);
    }

    #[test]
    fn test_repeated_name_keeps_id() {
        let mut catalog = sample();
        let id = catalog.push(
            "LIMIT",
            CatalogEntry::Value {
                value: Value::from(8),
                attributes: Attributes::EMPTY,
            },
        );
        assert_eq!(id, 2);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_methods_materialize_as_functions() {
        let map = Arc::new(ClassValueMap::new(Arc::new(sample())));
        let owner = ObjectRef::new(OrdinaryObject::new("Sample", None));
        owner.core().attach_class_map(map.clone()).unwrap();

        let Value::Object(f) = owner.get_value(&PropertyKey::name("answer")).unwrap() else {
            panic!("method did not materialize as an object");
        };
        assert!(f.is_callable());
        assert_eq!(f.call(&Value::Undefined, &[]).unwrap(), Value::from(42));
        assert_eq!(
            f.get_value(&PropertyKey::name("name")).unwrap(),
            Value::from("answer")
        );
        assert_eq!(map.materialized_count(), 1);

        let desc = owner
            .get_own_property(&PropertyKey::name("answer"))
            .unwrap()
            .unwrap();
        assert_eq!(desc.enumerable, Some(false));
        assert_eq!(desc.writable, Some(true));
    }

    #[test]
    fn test_constructor_requires_closing_pass() {
        let map = ClassValueMap::new(Arc::new(sample()));
        assert!(map.get(3).is_err());
        map.init_value(3, CONSTRUCTOR, Value::Null, Attributes::DONTENUM)
            .unwrap();
        assert!(map.get(3).is_ok());
    }
}
