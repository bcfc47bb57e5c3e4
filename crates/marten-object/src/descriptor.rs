//! Property descriptors and the validate-and-apply step of `[[DefineOwnProperty]]`

use crate::error::{VmError, VmResult};
use crate::object::ObjectRef;
use crate::property::{Attributes, PropertyKey, Slot, SlotValue};
use crate::value::{Value, same_value};

/// A property descriptor. Every field is optional; absent fields are left
/// unchanged by a redefinition or defaulted to `false`/`undefined` on creation.
///
/// `get`/`set` use a nested option: `Some(None)` is an explicit `undefined`.
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    /// `[[Value]]`
    pub value: Option<Value>,
    /// `[[Writable]]`
    pub writable: Option<bool>,
    /// `[[Get]]`
    pub get: Option<Option<ObjectRef>>,
    /// `[[Set]]`
    pub set: Option<Option<ObjectRef>>,
    /// `[[Enumerable]]`
    pub enumerable: Option<bool>,
    /// `[[Configurable]]`
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// Fully-populated data descriptor
    pub fn data(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    /// Fully-populated data descriptor from attribute bits
    pub fn with_attributes(value: Value, attributes: Attributes) -> Self {
        Self::data(
            value,
            attributes.is_writable(),
            attributes.is_enumerable(),
            attributes.is_configurable(),
        )
    }

    /// Fully-populated accessor descriptor
    pub fn accessor(
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    /// Descriptor with only `[[Value]]`
    pub fn value_only(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    /// Synthesize the descriptor of a stored slot.
    pub fn from_slot(slot: &Slot) -> Self {
        let attrs = slot.attributes;
        match &slot.value {
            SlotValue::Data(v) => Self::with_attributes(v.clone(), attrs),
            SlotValue::Accessor { getter, setter } => Self::accessor(
                getter.clone(),
                setter.clone(),
                attrs.is_enumerable(),
                attrs.is_configurable(),
            ),
        }
    }

    /// IsAccessorDescriptor
    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// IsDataDescriptor
    pub fn is_data(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// IsGenericDescriptor
    pub fn is_generic(&self) -> bool {
        !self.is_accessor() && !self.is_data()
    }

    /// Whether any field is present
    pub fn has_fields(&self) -> bool {
        !self.is_generic() || self.enumerable.is_some() || self.configurable.is_some()
    }

    /// Reject descriptors mixing data and accessor fields.
    ///
    /// Engine code building such a descriptor is a bug; script-supplied
    /// descriptors are screened by [`PropertyDescriptor::from_object`] first.
    pub fn validate_shape(&self) -> VmResult<()> {
        if self.is_accessor() && self.is_data() {
            return Err(VmError::internal(
                "malformed property descriptor: both accessor and data fields",
            ));
        }
        Ok(())
    }

    /// ToPropertyDescriptor
    pub fn from_object(value: &Value) -> VmResult<Self> {
        let Some(obj) = value.as_object() else {
            return Err(VmError::type_error(format!(
                "Property description must be an object: {}",
                crate::convert::to_string(value)?
            )));
        };
        let mut desc = Self::default();
        let field = |name: &str| -> VmResult<Option<Value>> {
            let key = PropertyKey::name(name);
            if obj.has(&key) {
                Ok(Some(obj.get_value(&key)?))
            } else {
                Ok(None)
            }
        };
        if let Some(v) = field("enumerable")? {
            desc.enumerable = Some(crate::convert::to_boolean(&v));
        }
        if let Some(v) = field("configurable")? {
            desc.configurable = Some(crate::convert::to_boolean(&v));
        }
        if let Some(v) = field("value")? {
            desc.value = Some(v);
        }
        if let Some(v) = field("writable")? {
            desc.writable = Some(crate::convert::to_boolean(&v));
        }
        if let Some(v) = field("get")? {
            desc.get = Some(accessor_function("Getter", v)?);
        }
        if let Some(v) = field("set")? {
            desc.set = Some(accessor_function("Setter", v)?);
        }
        if desc.is_accessor() && desc.is_data() {
            return Err(VmError::type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    /// FromPropertyDescriptor: copy the present fields onto `target` as
    /// ordinary enumerable properties.
    pub fn fill_object(&self, target: &ObjectRef) -> VmResult<()> {
        let put = |name: &str, value: Value| -> VmResult<()> {
            target.define_value(PropertyKey::name(name), value, Attributes::EMPTY)
        };
        if let Some(v) = &self.value {
            put("value", v.clone())?;
        }
        if let Some(w) = self.writable {
            put("writable", Value::Boolean(w))?;
        }
        if let Some(g) = &self.get {
            put("get", g.clone().map(Value::Object).unwrap_or_default())?;
        }
        if let Some(s) = &self.set {
            put("set", s.clone().map(Value::Object).unwrap_or_default())?;
        }
        if let Some(e) = self.enumerable {
            put("enumerable", Value::Boolean(e))?;
        }
        if let Some(c) = self.configurable {
            put("configurable", Value::Boolean(c))?;
        }
        Ok(())
    }

    /// Build the slot produced by applying this descriptor to `current`
    /// (or to nothing, for a fresh property).
    pub fn apply_to(&self, current: Option<&Slot>) -> Slot {
        let Some(current) = current else {
            return self.to_new_slot();
        };
        let enumerable = self
            .enumerable
            .unwrap_or_else(|| current.attributes.is_enumerable());
        let configurable = self
            .configurable
            .unwrap_or_else(|| current.attributes.is_configurable());
        let base = Attributes::EMPTY
            .with(Attributes::DONTENUM, !enumerable)
            .with(Attributes::PERMANENT, !configurable);

        match (&current.value, self.is_accessor(), self.is_data()) {
            // Data -> accessor: writable is dropped, missing halves are undefined.
            (SlotValue::Data(_), true, _) => Slot::accessor(
                self.get.clone().flatten(),
                self.set.clone().flatten(),
                base,
            ),
            // Accessor -> data: writable defaults to false.
            (SlotValue::Accessor { .. }, _, true) => Slot::data(
                self.value.clone().unwrap_or_default(),
                base.with(Attributes::READONLY, !self.writable.unwrap_or(false)),
            ),
            (SlotValue::Data(old), _, _) => {
                let writable = self
                    .writable
                    .unwrap_or_else(|| current.attributes.is_writable());
                Slot::data(
                    self.value.clone().unwrap_or_else(|| old.clone()),
                    base.with(Attributes::READONLY, !writable),
                )
            }
            (SlotValue::Accessor { getter, setter }, _, _) => Slot::accessor(
                self.get.clone().unwrap_or_else(|| getter.clone()),
                self.set.clone().unwrap_or_else(|| setter.clone()),
                base,
            ),
        }
    }

    /// Slot for a brand-new property: absent booleans default to `false`.
    pub fn to_new_slot(&self) -> Slot {
        let base = Attributes::EMPTY
            .with(Attributes::DONTENUM, !self.enumerable.unwrap_or(false))
            .with(Attributes::PERMANENT, !self.configurable.unwrap_or(false));
        if self.is_accessor() {
            Slot::accessor(
                self.get.clone().flatten(),
                self.set.clone().flatten(),
                base,
            )
        } else {
            Slot::data(
                self.value.clone().unwrap_or_default(),
                base.with(Attributes::READONLY, !self.writable.unwrap_or(false)),
            )
        }
    }
}

fn accessor_function(which: &str, value: Value) -> VmResult<Option<ObjectRef>> {
    match value {
        Value::Undefined => Ok(None),
        Value::Object(o) if o.is_callable() => Ok(Some(o)),
        other => Err(VmError::type_error(format!(
            "{which} must be a function: {}",
            crate::convert::to_string(&other)?
        ))),
    }
}

fn same_function(a: &Option<ObjectRef>, b: &Option<ObjectRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// The validation half of ValidateAndApplyPropertyDescriptor.
///
/// `current` is the existing own slot, if any. Returns a TypeError describing
/// the rejected change.
pub fn check_property_change(
    key: &PropertyKey,
    current: Option<&Slot>,
    desc: &PropertyDescriptor,
    extensible: bool,
) -> VmResult<()> {
    let Some(current) = current else {
        if !extensible {
            return Err(VmError::type_error(format!(
                "Cannot add property {key}, object is not extensible"
            )));
        }
        return Ok(());
    };
    if !desc.has_fields() || current.attributes.is_configurable() {
        return Ok(());
    }

    let redefine = || Err(VmError::type_error(format!("Cannot redefine property: {key}")));

    if desc.configurable == Some(true) {
        return redefine();
    }
    if desc
        .enumerable
        .is_some_and(|e| e != current.attributes.is_enumerable())
    {
        return redefine();
    }
    if desc.is_generic() {
        return Ok(());
    }
    match &current.value {
        SlotValue::Accessor { getter, setter } => {
            if desc.is_data() {
                return redefine();
            }
            if desc.get.as_ref().is_some_and(|g| !same_function(g, getter))
                || desc.set.as_ref().is_some_and(|s| !same_function(s, setter))
            {
                return redefine();
            }
        }
        SlotValue::Data(value) => {
            if desc.is_accessor() {
                return redefine();
            }
            if !current.attributes.is_writable() {
                if desc.writable == Some(true) {
                    return redefine();
                }
                if desc.value.as_ref().is_some_and(|v| !same_value(v, value)) {
                    return redefine();
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PropertyKey {
        PropertyKey::name("x")
    }

    #[test]
    fn test_new_slot_defaults_to_false() {
        let slot = PropertyDescriptor::value_only(Value::Number(1.0)).to_new_slot();
        assert_eq!(
            slot.attributes,
            Attributes::READONLY | Attributes::DONTENUM | Attributes::PERMANENT
        );
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let current = Slot::data(Value::Number(1.0), Attributes::DONTENUM);
        let desc = PropertyDescriptor {
            writable: Some(false),
            ..Default::default()
        };
        let slot = desc.apply_to(Some(&current));
        assert_eq!(slot.attributes, Attributes::DONTENUM | Attributes::READONLY);
        assert_eq!(slot.data_value(), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_non_configurable_rejections() {
        let frozen = Slot::data(
            Value::Number(1.0),
            Attributes::READONLY | Attributes::PERMANENT,
        );
        let make_configurable = PropertyDescriptor {
            configurable: Some(true),
            ..Default::default()
        };
        assert!(check_property_change(&key(), Some(&frozen), &make_configurable, true).is_err());

        let same_value = PropertyDescriptor::value_only(Value::Number(1.0));
        assert!(check_property_change(&key(), Some(&frozen), &same_value, true).is_ok());

        let other_value = PropertyDescriptor::value_only(Value::Number(2.0));
        let err = check_property_change(&key(), Some(&frozen), &other_value, true).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Cannot redefine property: x");

        let to_accessor = PropertyDescriptor::accessor(None, None, true, false);
        assert!(check_property_change(&key(), Some(&frozen), &to_accessor, true).is_err());
    }

    #[test]
    fn test_writable_non_configurable_may_change_value() {
        let sealed = Slot::data(Value::Number(1.0), Attributes::PERMANENT);
        let desc = PropertyDescriptor {
            value: Some(Value::Number(5.0)),
            writable: Some(false),
            ..Default::default()
        };
        assert!(check_property_change(&key(), Some(&sealed), &desc, true).is_ok());
    }

    #[test]
    fn test_not_extensible_rejects_creation() {
        let desc = PropertyDescriptor::value_only(Value::Undefined);
        assert!(check_property_change(&key(), None, &desc, false).is_err());
        assert!(check_property_change(&key(), None, &desc, true).is_ok());
    }

    #[test]
    fn test_malformed_shape_is_internal() {
        let desc = PropertyDescriptor {
            value: Some(Value::Null),
            get: Some(None),
            ..Default::default()
        };
        let err = desc.validate_shape().unwrap_err();
        assert!(!err.is_catchable());
    }
}
