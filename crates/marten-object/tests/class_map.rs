//! Class value maps: lazy materialization, per-instance shadowing, owner writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use marten_object::{
    Attributes, ClassCatalog, ClassValueMap, IdInitializer, ObjectRef, OrdinaryObject,
    PropertyKey, Value, VmResult,
};

const ID_X: u32 = 1;
const ID_Y: u32 = 2;
const ID_CONSTRUCTOR: u32 = 3;

/// Catalog {1: "x", 2: "y", 3: "constructor"} with x and y defaulting to 0.
/// `constructor` is populated by the closing pass, never by `init_id`.
#[derive(Default)]
struct PointCatalog {
    inits: AtomicUsize,
}

impl ClassCatalog for PointCatalog {
    fn class_name(&self) -> &str {
        "Point"
    }

    fn max_id(&self) -> u32 {
        3
    }

    fn find_id(&self, name: &str) -> Option<u32> {
        match name {
            "x" => Some(ID_X),
            "y" => Some(ID_Y),
            "constructor" => Some(ID_CONSTRUCTOR),
            _ => None,
        }
    }

    fn init_id(&self, id: u32, init: &mut IdInitializer<'_>) -> VmResult<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        match id {
            ID_X => init.init_value(ID_X, "x", Value::from(0), Attributes::EMPTY),
            ID_Y => init.init_value(ID_Y, "y", Value::from(0), Attributes::EMPTY),
            _ => Ok(()),
        }
    }
}

fn point_map() -> (Arc<PointCatalog>, Arc<ClassValueMap>) {
    let catalog = Arc::new(PointCatalog::default());
    let map = Arc::new(ClassValueMap::new(catalog.clone()));
    (catalog, map)
}

fn point_instance(map: &Arc<ClassValueMap>) -> ObjectRef {
    let obj = ObjectRef::new(OrdinaryObject::new("Point", None));
    obj.core().share_class_map(map.clone()).unwrap();
    obj
}

fn key(s: &str) -> PropertyKey {
    PropertyKey::name(s)
}

#[test]
fn test_point_scenario() {
    let (_, map) = point_map();
    let p1 = point_instance(&map);

    assert!(p1.has(&key("x")));
    assert!(!p1.core().has_table());
    assert!(!map.is_materialized());

    assert_eq!(p1.get_value(&key("x")).unwrap(), Value::from(0));
    assert!(!p1.core().has_table());

    p1.put(&key("x"), Value::from(5)).unwrap();
    assert!(p1.core().has_table());
    assert_eq!(p1.get_value(&key("x")).unwrap(), Value::from(5));

    let p2 = point_instance(&map);
    assert_eq!(p2.get_value(&key("x")).unwrap(), Value::from(0));
}

#[test]
fn test_shadow_survives_class_default_change() {
    let (_, map) = point_map();
    let owner = ObjectRef::new(OrdinaryObject::new("Point", None));
    owner.core().attach_class_map(map.clone()).unwrap();
    let p1 = point_instance(&map);
    let p2 = point_instance(&map);

    p1.put(&key("y"), Value::from(3)).unwrap();
    // The owner writes the shared default itself.
    owner.put(&key("y"), Value::from(100)).unwrap();

    assert_eq!(p1.get_value(&key("y")).unwrap(), Value::from(3));
    assert_eq!(p2.get_value(&key("y")).unwrap(), Value::from(100));
    assert!(!owner.core().has_table());
}

#[test]
fn test_entries_initialize_once_across_instances() {
    let (catalog, map) = point_map();
    let instances: Vec<ObjectRef> = (0..10).map(|_| point_instance(&map)).collect();
    for p in &instances {
        p.get_value(&key("x")).unwrap();
    }
    assert_eq!(catalog.inits.load(Ordering::SeqCst), 1);
    assert_eq!(map.materialized_count(), 1);
}

#[test]
fn test_unpopulated_constructor_is_fatal() {
    let (_, map) = point_map();
    let p = point_instance(&map);
    let err = p.get(&key("constructor")).unwrap_err();
    assert!(!err.is_catchable());
}

#[test]
fn test_closing_pass_populates_constructor() {
    let (_, map) = point_map();
    let ctor = OrdinaryObject::create(None);
    map.init_value(
        ID_CONSTRUCTOR,
        "constructor",
        Value::Object(ctor.clone()),
        Attributes::DONTENUM,
    )
    .unwrap();

    let p = point_instance(&map);
    match p.get_value(&key("constructor")).unwrap() {
        Value::Object(c) => assert!(c.ptr_eq(&ctor)),
        other => panic!("unexpected constructor {other:?}"),
    }
    let enumerable = p.get_ids(false).unwrap();
    assert_eq!(enumerable, vec![key("x"), key("y")]);
}

#[test]
fn test_init_value_rejects_mismatched_name() {
    let (_, map) = point_map();
    let err = map
        .init_value(ID_X, "y", Value::Null, Attributes::EMPTY)
        .unwrap_err();
    assert!(!err.is_catchable());
}

#[test]
fn test_instance_delete_hides_default_for_that_instance_only() {
    let (_, map) = point_map();
    let p1 = point_instance(&map);
    let p2 = point_instance(&map);

    assert!(p1.delete(&key("x")).unwrap());
    assert!(!p1.has(&key("x")));
    assert!(p2.has(&key("x")));

    p2.put(&key("y"), Value::from(1)).unwrap();
    assert!(p2.delete(&key("y")).unwrap());
    assert!(!p2.has(&key("y")));
}

#[test]
fn test_owner_redefinition_in_place() {
    let (_, map) = point_map();
    let owner = ObjectRef::new(OrdinaryObject::new("Point", None));
    owner.core().attach_class_map(map.clone()).unwrap();
    map.init_value(ID_CONSTRUCTOR, "constructor", Value::Null, Attributes::DONTENUM)
        .unwrap();
    owner.freeze().unwrap();

    assert!(owner.is_frozen().unwrap());
    let desc = owner.get_own_property(&key("x")).unwrap().unwrap();
    assert_eq!(desc.writable, Some(false));
    assert_eq!(desc.configurable, Some(false));
    assert!(!owner.core().has_table());

    let p = point_instance(&map);
    assert!(!p.put(&key("x"), Value::from(9)).unwrap());
}

#[test]
fn test_double_attach_is_internal_error() {
    let (_, map) = point_map();
    let obj = point_instance(&map);
    assert!(obj.core().attach_class_map(map).is_err());
}
