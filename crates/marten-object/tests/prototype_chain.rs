//! Resolution over the prototype chain: fallback, receivers, write placement,
//! attribute enforcement.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use marten_object::{
    Attributes, NativeFunction, ObjectRef, OrdinaryObject, PropertyKey, Strictness, Value,
    VmError,
};

fn key(s: &str) -> PropertyKey {
    PropertyKey::name(s)
}

#[test]
fn test_inherited_get_matches_prototype_with_receiver() {
    let proto = OrdinaryObject::create(None);
    proto.put(&key("greeting"), Value::from("hi")).unwrap();
    let obj = OrdinaryObject::create(Some(proto.clone()));

    assert_eq!(
        obj.get(&key("greeting")).unwrap(),
        proto.get_with_receiver(&key("greeting"), &obj).unwrap()
    );
    assert!(obj.has(&key("greeting")));
    assert!(!obj.has_own(&key("greeting")));
}

#[test]
fn test_getter_sees_original_receiver() {
    let proto = OrdinaryObject::create(None);
    let getter = NativeFunction::from_fn("get tag", 0, None, |this, _| {
        let Value::Object(this) = this else {
            return Err(VmError::type_error("no receiver"));
        };
        this.get_value(&PropertyKey::name("tag"))
    })
    .unwrap();
    proto
        .define_accessor("describe", Some(getter), None, Attributes::EMPTY)
        .unwrap();
    proto.put(&key("tag"), Value::from("proto")).unwrap();

    let obj = OrdinaryObject::create(Some(proto));
    obj.put(&key("tag"), Value::from("child")).unwrap();
    assert_eq!(obj.get_value(&key("describe")).unwrap(), Value::from("child"));
}

#[test]
fn test_write_lands_on_receiver_not_prototype() {
    let proto = OrdinaryObject::create(None);
    proto.put(&key("x"), Value::from(1)).unwrap();
    let obj = OrdinaryObject::create(Some(proto.clone()));

    obj.put(&key("x"), Value::from(2)).unwrap();
    assert_eq!(obj.get_value(&key("x")).unwrap(), Value::from(2));
    assert_eq!(proto.get_value(&key("x")).unwrap(), Value::from(1));
    assert!(obj.has_own(&key("x")));
}

#[test]
fn test_inherited_readonly_blocks_write() {
    let proto = OrdinaryObject::create(None);
    proto
        .define_value("x", Value::from(1), Attributes::READONLY)
        .unwrap();
    let obj = OrdinaryObject::create(Some(proto));

    assert!(!obj.put(&key("x"), Value::from(2)).unwrap());
    assert!(!obj.has_own(&key("x")));
    assert!(
        obj.put_checked(&key("x"), Value::from(2), Strictness::Strict)
            .is_err()
    );
}

#[test]
fn test_inherited_setter_runs_with_receiver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let setter = NativeFunction::from_fn("set x", 1, None, move |this, args| {
        seen.fetch_add(1, Ordering::SeqCst);
        if let Value::Object(this) = this {
            this.define_value("shadow", args[0].clone(), Attributes::EMPTY)?;
        }
        Ok(Value::Undefined)
    })
    .unwrap();
    let proto = OrdinaryObject::create(None);
    proto
        .define_accessor("x", None, Some(setter), Attributes::EMPTY)
        .unwrap();
    let obj = OrdinaryObject::create(Some(proto.clone()));

    obj.put(&key("x"), Value::from(5)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(obj.get_value(&key("shadow")).unwrap(), Value::from(5));
    assert!(!proto.has_own(&key("shadow")));
    assert!(!obj.has_own(&key("x")));
}

#[test]
fn test_getter_only_write_is_ignored() {
    let getter = NativeFunction::from_fn("get x", 0, None, |_, _| Ok(Value::from(7))).unwrap();
    let obj = OrdinaryObject::create(None);
    obj.define_accessor("x", Some(getter), None, Attributes::EMPTY)
        .unwrap();

    assert!(!obj.put(&key("x"), Value::from(1)).unwrap());
    assert_eq!(obj.get_value(&key("x")).unwrap(), Value::from(7));

    let child = OrdinaryObject::create(Some(obj));
    assert!(!child.put(&key("x"), Value::from(1)).unwrap());
    assert!(!child.has_own(&key("x")));
}

#[test]
fn test_readonly_put_keeps_value_and_permanent_survives_delete() {
    let obj = OrdinaryObject::create(None);
    obj.define_value("ro", Value::from(1), Attributes::READONLY)
        .unwrap();
    obj.define_value("perm", Value::from(2), Attributes::PERMANENT)
        .unwrap();

    obj.put(&key("ro"), Value::from(99)).unwrap();
    assert_eq!(obj.get_value(&key("ro")).unwrap(), Value::from(1));

    assert!(!obj.delete(&key("perm")).unwrap());
    assert!(obj.has(&key("perm")));
    assert!(
        obj.delete_checked(&key("perm"), Strictness::Strict)
            .is_err()
    );
}

#[test]
fn test_non_extensible_receiver_rejects_new_property() {
    let proto = OrdinaryObject::create(None);
    proto.put(&key("x"), Value::from(1)).unwrap();
    let obj = OrdinaryObject::create(Some(proto));
    obj.prevent_extensions();

    assert!(!obj.put(&key("x"), Value::from(2)).unwrap());
    assert_eq!(obj.get_value(&key("x")).unwrap(), Value::from(1));
}

#[test]
fn test_index_and_numeric_string_are_one_key() {
    let obj = OrdinaryObject::create(None);
    obj.put(&PropertyKey::index(3), Value::from("three")).unwrap();
    assert_eq!(obj.get_value(&key("3")).unwrap(), Value::from("three"));
    let ids = obj.get_ids(false).unwrap();
    assert_eq!(ids, vec![PropertyKey::Index(3)]);
}

#[test]
fn test_enumerate_all_skips_shadowed_and_hidden() {
    let proto = OrdinaryObject::create(None);
    proto.put(&key("a"), Value::from(1)).unwrap();
    proto.put(&key("b"), Value::from(2)).unwrap();
    let obj: ObjectRef = OrdinaryObject::create(Some(proto));
    obj.define_value("a", Value::from(3), Attributes::DONTENUM)
        .unwrap();
    obj.put(&key("c"), Value::from(4)).unwrap();

    let keys = obj.enumerate_all().unwrap();
    assert_eq!(keys, vec![key("c"), key("b")]);
}

#[test]
fn test_default_value_order() {
    let obj = OrdinaryObject::create(None);
    let value_of = NativeFunction::from_fn("valueOf", 0, None, |_, _| Ok(Value::from(10))).unwrap();
    let to_string =
        NativeFunction::from_fn("toString", 0, None, |_, _| Ok(Value::from("ten"))).unwrap();
    obj.define_value("valueOf", Value::Object(value_of), Attributes::DONTENUM)
        .unwrap();
    obj.define_value("toString", Value::Object(to_string), Attributes::DONTENUM)
        .unwrap();

    assert_eq!(obj.default_value(None).unwrap(), Value::from(10));
    assert_eq!(
        obj.default_value(Some(marten_object::PreferredType::String))
            .unwrap(),
        Value::from("ten")
    );

    let bare = OrdinaryObject::create(None);
    assert!(bare.default_value(None).is_err());
}
